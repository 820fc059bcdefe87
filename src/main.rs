mod domain;
mod clients;

mod app_system;

#[cfg(test)]
mod mock_framework;
#[cfg(test)]
mod integration_tests;

mod actor_framework;
mod cart_actor;
mod gateway;
mod order_actor;
mod product_actor;
mod reconciliation;
mod user_actor;

use tracing::{error, info, Instrument};
use crate::app_system::{setup_tracing, AppConfig, OrderSystem};
use crate::domain::{Caller, ProductCreate, Role, UserCreate};

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = AppConfig::from_env();
    // Setup tracing once for the entire application
    setup_tracing(&config);

    info!("Starting storefront order system");

    // Create the entire order system (starts all actors and the worker)
    let system = OrderSystem::new(config).map_err(|e| e.to_string())?;

    let span = tracing::info_span!("user_creation");
    let (buyer_id, seller_id) = async {
        info!("Creating demo users");
        let buyer = system
            .user_client
            .create_user(UserCreate {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                role: Role::Shopper,
            })
            .await
            .map_err(|e| e.to_string())?;
        let seller = system
            .user_client
            .create_user(UserCreate {
                name: "Mug Works".into(),
                email: "sales@mugworks.example".into(),
                role: Role::Seller,
            })
            .await
            .map_err(|e| e.to_string())?;
        Ok::<_, String>((buyer, seller))
    }
    .instrument(span)
    .await?;

    info!(buyer_id = %buyer_id, seller_id = %seller_id, "Users created successfully");

    let seller = Caller::seller(seller_id.clone());
    let buyer = Caller::shopper(buyer_id);

    let product_id = system
        .product_client
        .create_product(
            &seller,
            ProductCreate {
                seller_id,
                name: "Stoneware Mug".into(),
                price: 12_000,
                category: Some("kitchen".into()),
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    let large = system
        .product_client
        .add_option(&seller, product_id.clone(), "Large".into(), 3_000)
        .await
        .map_err(|e| e.to_string())?;

    info!(product_id = %product_id, "Product created successfully");

    let item = system
        .cart_client
        .add_item(&buyer, product_id, Some(large.id), 2)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "cart row vanished".to_string())?;

    // Checkout flows through the user, cart, catalog and order actors
    let span = tracing::info_span!("order_processing");
    let order_result = async {
        info!("Processing order through order system");
        system.order_client.create_from_cart(&buyer, vec![item.id]).await
    }
    .instrument(span)
    .await;

    match order_result {
        Ok(order_id) => {
            info!(order_id = %order_id, "Order processed successfully");
            match system.payment_client.create_payment(&buyer, order_id).await {
                Ok(payment) => info!(
                    payment_uid = %payment.uid,
                    amount = payment.desired_amount,
                    "Payment ready for the gateway"
                ),
                Err(e) => error!(error = %e, "Payment creation failed"),
            }
        }
        Err(e) => {
            error!(error = %e, "Order processing failed")
        }
    }

    // Shutdown system gracefully
    system.shutdown().await.map_err(|e| e.to_string())?;

    info!("Application completed successfully");
    Ok(())
}

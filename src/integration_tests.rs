#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::actor_framework::ResourceActor;
    use crate::app_system::{AppConfig, OrderSystem};
    use crate::cart_actor::{CartAction, CartActionResult, CartError};
    use crate::clients::{BuyerQuery, CartClient, OrderClient, ProductClient, UserClient};
    use crate::domain::{
        Caller, Cart, LineSnapshot, LineStatus, Order, OrderCreate, OrderPayment, OrderStatus, PayStatus, Product,
        ProductCreate, ProductOption, ProductStatus, Role, User, UserCreate,
    };
    use crate::gateway::mock::MockGateway;
    use crate::gateway::{CancelConflict, GatewayError, GatewayPayment};
    use crate::mock_framework::{create_mock_client, expect_action, expect_create, expect_get};
    use crate::order_actor::{OrderAction, OrderError};
    use crate::reconciliation::{CancellationQueue, PaymentError, WebhookError};

    // --- Client orchestration against mocked actors ---

    struct MockedOrderClient {
        client: OrderClient,
        user_rx: tokio::sync::mpsc::Receiver<crate::actor_framework::ResourceRequest<User>>,
        product_rx: tokio::sync::mpsc::Receiver<crate::actor_framework::ResourceRequest<Product>>,
        cart_rx: tokio::sync::mpsc::Receiver<crate::actor_framework::ResourceRequest<Cart>>,
        order_rx: tokio::sync::mpsc::Receiver<crate::actor_framework::ResourceRequest<Order>>,
    }

    fn mocked_order_client() -> MockedOrderClient {
        let (user_client_inner, user_rx) = create_mock_client::<User>(10);
        let (product_client_inner, product_rx) = create_mock_client::<Product>(10);
        let (cart_client_inner, cart_rx) = create_mock_client::<Cart>(10);
        let (order_client_inner, order_rx) = create_mock_client::<Order>(10);
        let (queue, _queue_rx) = CancellationQueue::channel(10);

        let user_client = UserClient::new(user_client_inner);
        let product_client = ProductClient::new(product_client_inner);
        let cart_client = CartClient::new(cart_client_inner, product_client.clone());
        let client = OrderClient::new(order_client_inner, cart_client, product_client, user_client, queue);
        MockedOrderClient {
            client,
            user_rx,
            product_rx,
            cart_rx,
            order_rx,
        }
    }

    fn mug() -> Product {
        let mut product = Product::new("product_1", "seller_1", "Mug", 12_000);
        product.options.push(ProductOption {
            id: 1,
            name: "Large".into(),
            additional_price: 3_000,
        });
        product
    }

    /// Answers the user, cart and product lookups that precede the cart take.
    async fn answer_checkout_lookups(mocks: &mut MockedOrderClient) {
        let (user_id, responder) = expect_get(&mut mocks.user_rx).await.expect("Expected User Get");
        assert_eq!(user_id, "user_1");
        let mut user = User::new("Alice", "alice@example.com");
        user.id = "user_1".into();
        responder.send(Ok(Some(user))).unwrap();

        let (cart_id, responder) = expect_get(&mut mocks.cart_rx).await.expect("Expected Cart Get");
        assert_eq!(cart_id, "user_1");
        let mut cart = Cart::new("user_1");
        cart.adjust("product_1", Some(1), 2).unwrap();
        responder.send(Ok(Some(cart))).unwrap();

        let (product_id, responder) = expect_get(&mut mocks.product_rx).await.expect("Expected Product Get");
        assert_eq!(product_id, "product_1");
        responder.send(Ok(Some(mug()))).unwrap();
    }

    #[tokio::test]
    async fn test_order_creation_flow() {
        let mut mocks = mocked_order_client();
        let client = mocks.client.clone();
        let order_task =
            tokio::spawn(async move { client.create_from_cart(&Caller::shopper("user_1"), vec![1]).await });

        answer_checkout_lookups(&mut mocks).await;

        // Expect the selected rows to be taken from the cart
        let (cart_id, action, responder) = expect_action(&mut mocks.cart_rx).await.expect("Expected Cart Action");
        assert_eq!(cart_id, "user_1");
        let taken = match action {
            CartAction::Take(ids) => {
                assert_eq!(ids, vec![1]);
                let mut cart = Cart::new("user_1");
                cart.adjust("product_1", Some(1), 2).unwrap();
                cart.take(&ids).unwrap()
            }
            other => panic!("Unexpected action: {:?}", other),
        };
        responder.send(Ok(CartActionResult::Taken(taken))).unwrap();

        // Expect Order Create with priced snapshots
        let (payload, responder) = expect_create(&mut mocks.order_rx).await.expect("Expected Order Create");
        assert_eq!(payload.user_id, "user_1");
        assert_eq!(payload.lines.len(), 1);
        assert_eq!(payload.lines[0].price, 15_000);
        assert_eq!(payload.lines[0].quantity, 2);
        assert_eq!(payload.lines[0].seller_id, "seller_1");
        responder.send(Ok("order_1".to_string())).unwrap();

        let result = order_task.await.unwrap();
        assert_eq!(result, Ok("order_1".to_string()));
    }

    #[tokio::test]
    async fn test_failed_order_creation_restores_cart() {
        let mut mocks = mocked_order_client();
        let client = mocks.client.clone();
        let order_task =
            tokio::spawn(async move { client.create_from_cart(&Caller::shopper("user_1"), vec![1]).await });

        answer_checkout_lookups(&mut mocks).await;

        let (_, action, responder) = expect_action(&mut mocks.cart_rx).await.expect("Expected Cart Take");
        let taken = match action {
            CartAction::Take(ids) => {
                let mut cart = Cart::new("user_1");
                cart.adjust("product_1", Some(1), 2).unwrap();
                cart.take(&ids).unwrap()
            }
            other => panic!("Unexpected action: {:?}", other),
        };
        responder.send(Ok(CartActionResult::Taken(taken.clone()))).unwrap();

        let (_, responder) = expect_create(&mut mocks.order_rx).await.expect("Expected Order Create");
        responder
            .send(Err(OrderError::ValidationError("store rejected order".into())))
            .unwrap();

        let (cart_id, action, responder) = expect_action(&mut mocks.cart_rx).await.expect("Expected Cart Restore");
        assert_eq!(cart_id, "user_1");
        match action {
            CartAction::Restore(items) => assert_eq!(items, taken),
            other => panic!("Unexpected action: {:?}", other),
        }
        responder.send(Ok(CartActionResult::Restored)).unwrap();

        let result = order_task.await.unwrap();
        assert_eq!(result, Err(OrderError::ValidationError("store rejected order".into())));
    }

    #[tokio::test]
    async fn test_unqueued_cancellation_is_reported() {
        let (order_actor, orders) = ResourceActor::<Order>::new(8, || "order_1".to_string());
        tokio::spawn(order_actor.run());
        let order_id = orders
            .create(OrderCreate {
                user_id: "user_1".into(),
                lines: vec![LineSnapshot {
                    product_id: "product_1".into(),
                    option_id: None,
                    seller_id: "seller_1".into(),
                    name: "Mug".into(),
                    price: 12_000,
                    quantity: 1,
                }],
            })
            .await
            .unwrap();
        let payment = OrderPayment::new("Mug", 12_000, "Alice", "alice@example.com");
        let payment_uid = payment.uid;
        orders
            .perform_action(
                order_id.clone(),
                OrderAction::AddPayment {
                    caller: Caller::shopper("user_1"),
                    payment,
                },
            )
            .await
            .unwrap();
        let report = GatewayPayment::from_json(serde_json::json!({
            "status": "PAID",
            "amount": { "total": 12_000 }
        }))
        .unwrap();
        orders
            .perform_action(order_id.clone(), OrderAction::ApplyVerification { payment_uid, report })
            .await
            .unwrap();

        // The worker is gone, so nothing can be queued
        let (queue, queue_rx) = CancellationQueue::channel(1);
        drop(queue_rx);
        let (user_inner, _user_rx) = create_mock_client::<User>(1);
        let (product_inner, _product_rx) = create_mock_client::<Product>(1);
        let (cart_inner, _cart_rx) = create_mock_client::<Cart>(1);
        let product_client = ProductClient::new(product_inner);
        let client = OrderClient::new(
            orders,
            CartClient::new(cart_inner, product_client.clone()),
            product_client,
            UserClient::new(user_inner),
            queue,
        );

        let buyer = Caller::shopper("user_1");
        client.cancel(&buyer, order_id.clone(), "changed my mind").await.unwrap();
        let err = client
            .approve_cancellation(&Caller::seller("seller_1"), order_id.clone(), "changed my mind")
            .await
            .unwrap_err();
        match err {
            OrderError::ActorCommunicationError(message) => assert!(message.contains(&payment_uid.to_string())),
            other => panic!("Unexpected error: {:?}", other),
        }

        let order = client.get_order(&buyer, order_id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.payment(&payment_uid).unwrap().pay_status(), PayStatus::Paid);
    }

    // --- Whole system against an in-memory gateway ---

    const WEBHOOK_IP: &str = "52.78.100.19";

    struct Shop {
        system: OrderSystem,
        gateway: Arc<MockGateway>,
        buyer: Caller,
        seller: Caller,
        product_id: String,
    }

    async fn open_shop() -> Shop {
        let config = AppConfig {
            allowed_webhook_ips: vec![WEBHOOK_IP.parse().unwrap()],
            cancellation_backoff: Duration::from_millis(10),
            ..AppConfig::default()
        };
        let gateway = Arc::new(MockGateway::new());
        let system = OrderSystem::with_gateway(config, gateway.clone());

        let buyer_id = system
            .user_client
            .create_user(UserCreate {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                role: Role::Shopper,
            })
            .await
            .unwrap();
        let seller_id = system
            .user_client
            .create_user(UserCreate {
                name: "Mug Works".into(),
                email: "sales@mugworks.example".into(),
                role: Role::Seller,
            })
            .await
            .unwrap();
        let seller = Caller::seller(seller_id.clone());

        let product_id = system
            .product_client
            .create_product(
                &seller,
                ProductCreate {
                    seller_id,
                    name: "Stoneware Mug".into(),
                    price: 12_000,
                    category: None,
                },
            )
            .await
            .unwrap();

        Shop {
            system,
            gateway,
            buyer: Caller::shopper(buyer_id),
            seller,
            product_id,
        }
    }

    impl Shop {
        async fn checkout(&self, quantity: i64) -> String {
            let item = self
                .system
                .cart_client
                .add_item(&self.buyer, self.product_id.clone(), None, quantity)
                .await
                .unwrap()
                .unwrap();
            self.system
                .order_client
                .create_from_cart(&self.buyer, vec![item.id])
                .await
                .unwrap()
        }

        async fn pay(&self, order_id: &str) -> uuid::Uuid {
            let payment = self
                .system
                .payment_client
                .create_payment(&self.buyer, order_id.to_string())
                .await
                .unwrap();
            self.gateway
                .set_payment(&payment.merchant_uid(), PayStatus::Paid, payment.desired_amount);
            let verification = self.system.payment_client.portone_check(payment.uid).await.unwrap();
            assert!(verification.paid_ok);
            payment.uid
        }

        /// Lists a second product from the same seller.
        async fn list_product(&self, name: &str, price: u64) -> String {
            self.system
                .product_client
                .create_product(
                    &self.seller,
                    ProductCreate {
                        seller_id: self.seller.user_id.clone(),
                        name: name.into(),
                        price,
                        category: None,
                    },
                )
                .await
                .unwrap()
        }

        async fn order(&self, order_id: &str) -> Order {
            self.system
                .order_client
                .get_order(&self.buyer, order_id.to_string())
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_checkout_pay_fulfil_and_return() {
        let shop = open_shop().await;
        let order_id = shop.checkout(3).await;

        let order = shop.order(&order_id).await;
        assert_eq!(order.total_amount, 36_000);
        assert_eq!(order.status(), OrderStatus::Requested);
        let cart = shop.system.cart_client.get_cart(shop.buyer.user_id.clone()).await.unwrap().unwrap();
        assert!(cart.items().is_empty());

        shop.pay(&order_id).await;
        assert_eq!(shop.order(&order_id).await.status(), OrderStatus::Paid);

        let orders = &shop.system.order_client;
        assert_eq!(
            orders.mark_as_prepared(&shop.seller, order_id.clone()).await,
            Ok(OrderStatus::PreparedProduct)
        );
        assert_eq!(
            orders.mark_as_shipped(&shop.seller, order_id.clone()).await,
            Ok(OrderStatus::Shipped)
        );
        assert_eq!(
            orders.mark_as_delivered(&shop.seller, order_id.clone()).await,
            Ok(OrderStatus::Delivered)
        );

        assert_eq!(orders.request_return(&shop.buyer, order_id.clone()).await, Ok(vec![1]));
        let line = orders.process_line_return(&shop.seller, order_id.clone(), 1).await.unwrap();
        assert_eq!(line.status(), LineStatus::Returned);
        let line = orders.process_line_refund(&shop.seller, order_id.clone(), 1).await.unwrap();
        assert_eq!(line.status(), LineStatus::Refunded);

        shop.system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_fulfillment_requires_payment() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;

        let err = shop
            .system
            .order_client
            .mark_as_prepared(&shop.seller, order_id.clone())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Requested,
                action: "mark_as_prepared"
            }
        );
        assert_eq!(shop.order(&order_id).await.status(), OrderStatus::Requested);
    }

    #[tokio::test]
    async fn test_repeated_verification_keeps_single_payment() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;

        let abandoned = shop
            .system
            .payment_client
            .create_payment(&shop.buyer, order_id.clone())
            .await
            .unwrap();
        let payment_uid = shop.pay(&order_id).await;
        let again = shop.system.payment_client.portone_check(payment_uid).await.unwrap();
        assert!(again.paid_ok);

        let order = shop.order(&order_id).await;
        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.payments().len(), 1);
        assert_eq!(order.payments()[0].uid, payment_uid);
        assert!(order.payment(&abandoned.uid).is_none());
    }

    #[tokio::test]
    async fn test_underpaid_payment_is_not_paid_ok() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        let payment = shop
            .system
            .payment_client
            .create_payment(&shop.buyer, order_id.clone())
            .await
            .unwrap();
        shop.gateway.set_payment(&payment.merchant_uid(), PayStatus::Paid, 1);

        let verification = shop.system.payment_client.portone_check(payment.uid).await.unwrap();
        assert!(!verification.paid_ok);
        assert_eq!(verification.status, PayStatus::Paid);
        assert_eq!(shop.order(&order_id).await.status(), OrderStatus::Requested);
    }

    #[tokio::test]
    async fn test_webhook_confirms_payment() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        let payment = shop
            .system
            .payment_client
            .create_payment(&shop.buyer, order_id.clone())
            .await
            .unwrap();
        shop.gateway
            .set_payment(&payment.merchant_uid(), PayStatus::Paid, payment.desired_amount);

        let ip: IpAddr = WEBHOOK_IP.parse().unwrap();
        let body = format!(r#"{{"type":"Transaction.Paid","data":{{"paymentId":"{}"}}}}"#, payment.uid);
        let reply = shop.system.webhook.handle(ip, &body).await.unwrap();
        assert_eq!(reply.status, "ok");
        assert!(reply.is_paid);

        // Duplicate delivery is harmless
        assert!(shop.system.webhook.handle(ip, &body).await.unwrap().is_paid);
        assert_eq!(shop.order(&order_id).await.status(), OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_webhook_rejections() {
        let shop = open_shop().await;
        let webhook = &shop.system.webhook;
        let allowed: IpAddr = WEBHOOK_IP.parse().unwrap();
        let stranger: IpAddr = "10.0.0.1".parse().unwrap();

        let err = webhook.handle(stranger, r#"{"data":{}}"#).await.unwrap_err();
        assert_eq!(err.http_status(), 403);

        let err = webhook.handle(allowed, r#"{"data":{}}"#).await.unwrap_err();
        assert_eq!(err.http_status(), 400);

        let err = webhook
            .handle(allowed, r#"{"data":{"paymentId":"not-a-uuid"}}"#)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);

        let unknown = format!(r#"{{"data":{{"paymentId":"{}"}}}}"#, uuid::Uuid::new_v4());
        let err = webhook.handle(allowed, &unknown).await.unwrap_err();
        assert!(matches!(err, WebhookError::NotFound(_)));
        assert_eq!(err.body()["error"], err.to_string());
    }

    #[tokio::test]
    async fn test_approved_cancellation_cancels_payment() {
        let shop = open_shop().await;
        let order_id = shop.checkout(2).await;
        let payment_uid = shop.pay(&order_id).await;

        let orders = &shop.system.order_client;
        assert_eq!(
            orders.cancel(&shop.buyer, order_id.clone(), "changed my mind").await,
            Ok(OrderStatus::CancelRequested)
        );
        let queued = orders
            .approve_cancellation(&shop.seller, order_id.clone(), "changed my mind")
            .await
            .unwrap();
        assert_eq!(queued, vec![payment_uid]);

        let order = shop.order(&order_id).await;
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.line_items().iter().all(|line| line.status() == LineStatus::Cancelled));

        let mut cancelled = false;
        for _ in 0..100 {
            let payment = shop
                .system
                .payment_client
                .get_payment(&shop.buyer, payment_uid)
                .await
                .unwrap();
            if payment.pay_status() == PayStatus::Cancelled {
                cancelled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(cancelled, "worker never cancelled the payment");
        assert_eq!(
            shop.gateway.cancel_calls(),
            vec![(payment_uid.to_string(), "changed my mind".to_string())]
        );

        shop.system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_after_shipping_is_rejected() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        shop.pay(&order_id).await;

        let orders = &shop.system.order_client;
        orders.mark_as_prepared(&shop.seller, order_id.clone()).await.unwrap();
        orders.mark_as_shipped(&shop.seller, order_id.clone()).await.unwrap();

        let err = orders.cancel(&shop.buyer, order_id.clone(), "too late").await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Shipped,
                ..
            }
        ));
        assert_eq!(shop.order(&order_id).await.status(), OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_empty_selection_creates_nothing() {
        let shop = open_shop().await;
        let orders = &shop.system.order_client;

        let err = orders.create_from_cart(&shop.buyer, vec![]).await.unwrap_err();
        assert!(matches!(err, OrderError::ValidationError(_)));

        shop.system
            .cart_client
            .add_item(&shop.buyer, shop.product_id.clone(), None, 1)
            .await
            .unwrap();
        let err = orders.create_from_cart(&shop.buyer, vec![999]).await.unwrap_err();
        assert!(matches!(err, OrderError::ValidationError(_)));

        assert!(orders.list_orders(&shop.buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_product_blocks_checkout() {
        let shop = open_shop().await;
        let item = shop
            .system
            .cart_client
            .add_item(&shop.buyer, shop.product_id.clone(), None, 1)
            .await
            .unwrap()
            .unwrap();
        shop.system
            .product_client
            .set_status(&shop.seller, shop.product_id.clone(), ProductStatus::SoldOut)
            .await
            .unwrap();

        let err = shop
            .system
            .order_client
            .create_from_cart(&shop.buyer, vec![item.id])
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidProduct(_)));

        let cart = shop.system.cart_client.get_cart(shop.buyer.user_id.clone()).await.unwrap().unwrap();
        assert_eq!(cart.items().len(), 1);
    }

    #[tokio::test]
    async fn test_permissions() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        let orders = &shop.system.order_client;
        let stranger = Caller::shopper("user_99");
        let other_seller = Caller::seller("user_98");

        let err = orders.get_order(&stranger, order_id.clone()).await.unwrap_err();
        assert!(matches!(err, OrderError::PermissionDenied(_)));

        let err = shop
            .system
            .payment_client
            .create_payment(&other_seller, order_id.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::reconciliation::PaymentError::Order(OrderError::PermissionDenied(_))));

        let payment_uid = shop.pay(&order_id).await;
        let err = orders.mark_as_prepared(&other_seller, order_id.clone()).await.unwrap_err();
        assert!(matches!(err, OrderError::PermissionDenied(_)));
        let err = orders.request_return(&shop.seller, order_id.clone()).await.unwrap_err();
        assert!(matches!(err, OrderError::PermissionDenied(_)));

        // Admins may act on any order
        let admin = Caller::admin("root");
        assert_eq!(
            orders.mark_as_prepared(&admin, order_id.clone()).await,
            Ok(OrderStatus::PreparedProduct)
        );
        assert!(shop.system.payment_client.get_payment(&admin, payment_uid).await.is_ok());
    }

    #[tokio::test]
    async fn test_seller_search_by_buyer() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        let orders = &shop.system.order_client;

        let by_email = orders
            .search_seller_orders(&shop.seller, BuyerQuery::Email("alice@example.com".into()))
            .await
            .unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, order_id);

        let by_id = orders
            .search_seller_orders(&shop.seller, BuyerQuery::UserId(shop.buyer.user_id.clone()))
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);

        let elsewhere = orders
            .search_seller_orders(&Caller::seller("user_98"), BuyerQuery::UserId(shop.buyer.user_id.clone()))
            .await
            .unwrap();
        assert!(elsewhere.is_empty());

        let seller_view = orders.list_orders(&shop.seller).await.unwrap();
        assert_eq!(seller_view.len(), 1);
    }

    #[tokio::test]
    async fn test_cart_merges_and_rejects_foreign_options() {
        let shop = open_shop().await;
        let carts = &shop.system.cart_client;

        carts.add_item(&shop.buyer, shop.product_id.clone(), None, 2).await.unwrap();
        let merged = carts
            .add_item(&shop.buyer, shop.product_id.clone(), None, 3)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.quantity, 5);

        let removed = carts.add_item(&shop.buyer, shop.product_id.clone(), None, -5).await.unwrap();
        assert_eq!(removed, None);

        let err = carts
            .add_item(&shop.buyer, shop.product_id.clone(), Some(42), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::cart_actor::CartError::ValidationError(_)));

        let duplicate = shop
            .system
            .user_client
            .create_user(UserCreate {
                name: "Alice Again".into(),
                email: "alice@example.com".into(),
                role: Role::Shopper,
            })
            .await;
        assert!(matches!(duplicate, Err(crate::user_actor::UserError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_sold_out_product_cannot_be_added() {
        let shop = open_shop().await;
        let carts = &shop.system.cart_client;
        carts.add_item(&shop.buyer, shop.product_id.clone(), None, 2).await.unwrap();
        shop.system
            .product_client
            .set_status(&shop.seller, shop.product_id.clone(), ProductStatus::SoldOut)
            .await
            .unwrap();

        let err = carts
            .add_item(&shop.buyer, shop.product_id.clone(), None, 1)
            .await
            .unwrap_err();
        match err {
            CartError::ValidationError(message) => assert!(message.contains("sold_out")),
            other => panic!("Unexpected error: {:?}", other),
        }

        // Existing rows can still be cleared
        let cleared = carts.add_item(&shop.buyer, shop.product_id.clone(), None, -2).await.unwrap();
        assert_eq!(cleared, None);
    }

    #[tokio::test]
    async fn test_direct_cancel_requires_paid_payment() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        let payment = shop
            .system
            .payment_client
            .create_payment(&shop.buyer, order_id.clone())
            .await
            .unwrap();

        let err = shop
            .system
            .payment_client
            .cancel_payment(payment.uid, "never paid")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Order(OrderError::InvalidPaymentTransition {
                from: PayStatus::Ready,
                ..
            })
        ));
        assert!(shop.gateway.cancel_calls().is_empty());
    }

    #[tokio::test]
    async fn test_direct_cancel_surfaces_gateway_conflict() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        let payment_uid = shop.pay(&order_id).await;
        shop.gateway
            .push_cancel_reply(Err(GatewayError::Conflict(CancelConflict::PaymentAlreadyCancelled)));

        let payments = &shop.system.payment_client;
        let err = payments.cancel_payment(payment_uid, "duplicate").await.unwrap_err();
        assert_eq!(
            err,
            PaymentError::Gateway(GatewayError::Conflict(CancelConflict::PaymentAlreadyCancelled))
        );
        let order = shop.order(&order_id).await;
        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.payment(&payment_uid).unwrap().pay_status(), PayStatus::Paid);

        // The next attempt goes through and cancels the order
        payments.cancel_payment(payment_uid, "retry").await.unwrap();
        let order = shop.order(&order_id).await;
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.payment(&payment_uid).unwrap().pay_status(), PayStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_requested_cancellation_runs_in_background() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        let payment_uid = shop.pay(&order_id).await;

        shop.system
            .payment_client
            .request_cancellation(payment_uid, "out of stock")
            .await
            .unwrap();

        let mut status = OrderStatus::Paid;
        for _ in 0..100 {
            status = shop.order(&order_id).await.status();
            if status == OrderStatus::Cancelled {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, OrderStatus::Cancelled);
        assert_eq!(
            shop.gateway.cancel_calls(),
            vec![(payment_uid.to_string(), "out of stock".to_string())]
        );

        shop.system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_line_cancel_partially_refunds_order() {
        let shop = open_shop().await;
        let saucer_id = shop.list_product("Saucer", 4_000).await;
        let carts = &shop.system.cart_client;
        let mug = carts
            .add_item(&shop.buyer, shop.product_id.clone(), None, 1)
            .await
            .unwrap()
            .unwrap();
        let saucer = carts.add_item(&shop.buyer, saucer_id, None, 2).await.unwrap().unwrap();
        let orders = &shop.system.order_client;
        let order_id = orders
            .create_from_cart(&shop.buyer, vec![mug.id, saucer.id])
            .await
            .unwrap();
        shop.pay(&order_id).await;

        let line = orders.request_line_cancel(&shop.buyer, order_id.clone(), 2).await.unwrap();
        assert_eq!(line.status(), LineStatus::CancelRequested);
        let err = orders
            .request_line_cancel(&shop.seller, order_id.clone(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::PermissionDenied(_)));

        let line = orders.cancel_line(&shop.seller, order_id.clone(), 2).await.unwrap();
        assert_eq!(line.status(), LineStatus::Cancelled);

        let order = shop.order(&order_id).await;
        assert_eq!(order.status(), OrderStatus::PartialRefunded);
        assert_eq!(order.line(1).unwrap().status(), LineStatus::Ordered);

        // Cancelling the last line cancels the whole order
        orders.cancel_line(&shop.seller, order_id.clone(), 1).await.unwrap();
        assert_eq!(shop.order(&order_id).await.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_line_return_after_delivery() {
        let shop = open_shop().await;
        let order_id = shop.checkout(1).await;
        shop.pay(&order_id).await;
        let orders = &shop.system.order_client;

        let err = orders.request_line_return(&shop.buyer, order_id.clone(), 1).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidLineTransition { line_id: 1, .. }));

        orders.mark_as_prepared(&shop.seller, order_id.clone()).await.unwrap();
        orders.mark_as_shipped(&shop.seller, order_id.clone()).await.unwrap();
        orders.mark_as_delivered(&shop.seller, order_id.clone()).await.unwrap();

        let err = orders.request_line_cancel(&shop.buyer, order_id.clone(), 1).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidLineTransition {
                from: LineStatus::Delivered,
                ..
            }
        ));

        let line = orders.request_line_return(&shop.buyer, order_id.clone(), 1).await.unwrap();
        assert_eq!(line.status(), LineStatus::ReturnRequested);
        assert_eq!(shop.order(&order_id).await.status(), OrderStatus::Delivered);
    }
}

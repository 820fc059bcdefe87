use crate::actor_framework::Entity;
use crate::domain::{Cart, CartCreate};
use super::actions::{CartAction, CartActionResult};
use super::error::CartError;

impl Entity for Cart {
    type Id = String;
    type CreateParams = CartCreate;
    type Update = ();
    type Action = CartAction;
    type ActionResult = CartActionResult;
    type Error = CartError;

    fn id(&self) -> &String {
        &self.user_id
    }

    /// A cart is keyed by its owner.
    fn natural_id(params: &CartCreate) -> Option<String> {
        Some(params.user_id.clone())
    }

    fn from_create_params(id: String, _params: CartCreate) -> Result<Self, CartError> {
        Ok(Cart::new(id))
    }

    fn on_update(&mut self, _update: ()) -> Result<(), CartError> {
        Ok(())
    }

    fn handle_action(&mut self, action: CartAction) -> Result<CartActionResult, CartError> {
        match action {
            CartAction::Adjust {
                product_id,
                option_id,
                delta,
            } => Ok(CartActionResult::Adjusted(self.adjust(&product_id, option_id, delta)?)),
            CartAction::Remove(item_id) => Ok(CartActionResult::Removed(self.remove(item_id)?)),
            CartAction::Take(item_ids) => Ok(CartActionResult::Taken(self.take(&item_ids)?)),
            CartAction::Restore(items) => {
                self.restore(items);
                Ok(CartActionResult::Restored)
            }
        }
    }
}

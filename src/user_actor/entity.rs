use crate::actor_framework::Entity;
use crate::domain::{User, UserCreate, UserUpdate};
use super::error::UserError;

fn validate_email(email: &str) -> Result<(), UserError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(UserError::ValidationError(format!("Invalid email: {}", email))),
    }
}

impl Entity for User {
    type Id = String;
    type CreateParams = UserCreate;
    type Update = UserUpdate;
    type Action = ();
    type ActionResult = ();
    type Error = UserError;

    fn id(&self) -> &String {
        &self.id
    }

    /// Emails are unique across the store.
    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }

    /// Creates a new User from creation parameters.
    ///
    /// # Arguments
    /// * `id` - Unique identifier for the user
    /// * `params` - User creation parameters containing name, email and role
    fn from_create_params(id: String, params: UserCreate) -> Result<Self, UserError> {
        validate_email(&params.email)?;
        Ok(Self {
            id,
            name: params.name,
            email: params.email,
            role: params.role,
        })
    }

    /// Updates the user's profile information.
    ///
    /// # Fields Updated
    /// - `name`: User's display name
    /// - `email`: User's email address
    /// - `role`: shopper, seller or admin
    fn on_update(&mut self, update: UserUpdate) -> Result<(), UserError> {
        if let Some(email) = update.email {
            validate_email(&email)?;
            self.email = email;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        Ok(())
    }

    /// Users have no custom actions.
    fn handle_action(&mut self, _action: ()) -> Result<(), UserError> {
        Ok(())
    }
}

use tracing::{debug, instrument, warn};
use crate::domain::{User, UserCreate, UserUpdate};
use crate::user_actor::UserError;
use crate::actor_framework::ResourceClient;

/// Client for interacting with the User actor.
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceClient<User>,
}

impl_basic_client!(UserClient, User, UserError, user);

impl UserClient {
    /// Registers a user. The store rejects an email that is already taken
    /// with `AlreadyExists`.
    #[instrument(skip(self))]
    pub async fn create_user(&self, params: UserCreate) -> Result<String, UserError> {
        debug!("Sending request");
        self.inner.create(params).await.map_err(|e| {
            if let UserError::AlreadyExists(email) = &e {
                warn!(email = %email, "Email already registered");
            }
            e
        })
    }

    #[instrument(skip(self))]
    pub async fn update_user(&self, id: String, update: UserUpdate) -> Result<User, UserError> {
        debug!("Sending request");
        self.inner.update(id, update).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let email = email.to_string();
        let users = self.inner.query(move |user: &User| user.email == email).await?;
        Ok(users.into_iter().next())
    }
}

use super::Role;

/// An already-authenticated principal acting on the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn shopper(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Shopper)
    }

    pub fn seller(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Seller)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

use crate::{
    bbe_api::order_objects::UserPatch,
    db_types::{NewUser, User},
    traits::MarketplaceError,
};

/// Read and plain-write queries over the user store.
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    async fn insert_user(&self, user: NewUser) -> Result<User, MarketplaceError>;

    /// Fetches a user by id. `None` if they do not exist.
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, MarketplaceError>;

    /// Applies a partial update (role, ban flag, discount flag and so on) and returns the new row.
    async fn update_user(&self, user_id: i64, patch: UserPatch) -> Result<User, MarketplaceError>;
}

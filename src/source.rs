// Remote source port.
// The sync engine talks to GitHub only through this trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Item, UserProfile};

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Every starred repository, without README bodies.
    async fn list_all(&self) -> Result<Vec<Item>>;

    /// README text for one repository.
    async fn fetch_detail(&self, owner: &str, repo: &str) -> Result<String>;

    /// The account the credential belongs to.
    async fn current_user(&self) -> Result<UserProfile>;
}

use async_trait::async_trait;

use crate::error::HostError;

/// Host notification primitive (fire-and-forget for callers)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str) -> Result<(), HostError>;
}

use async_trait::async_trait;

use crate::command::Command;
use crate::error::HostError;

/// Identifier of a browser tab (page context)
pub type TabId = u32;

/// A page context known to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: TabId,
    pub url: Option<String>,
}

/// Messaging primitive between the background and page contexts
///
/// Implementations:
/// - Extension runtime: `tabs.query` + `tabs.sendMessage`
/// - Simulated: in-process tabs with optional overlay listeners
#[async_trait]
pub trait Tabs: Send + Sync {
    /// Active tab of the focused window, if any
    async fn active_tab(&self) -> Result<Option<Tab>, HostError>;

    /// Deliver a command to the listener registered in `tab`
    ///
    /// Fails with [`HostError::NoReceiver`] when no listener is registered.
    async fn send_message(&self, tab: TabId, command: &Command) -> Result<(), HostError>;
}

use tracing::{debug, info};

use super::relay::{ControlPlaneRouter, Origin, RelayReport};
use crate::command::{Command, RuntimeMessage, Shortcut};
use crate::error::Error;
use crate::host::TabId;

/// Background context entry points
///
/// Dispatches runtime messages, keyboard shortcuts and toolbar clicks to the
/// router.
pub struct Background {
    router: ControlPlaneRouter,
}

impl Background {
    pub fn new(router: ControlPlaneRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &ControlPlaneRouter {
        &self.router
    }

    /// Handle a runtime message. Returns the relay report when the message
    /// was a request to forward.
    ///
    /// `sender_tab` is set when the message came from a page context.
    pub async fn handle_runtime_message(
        &self,
        message: RuntimeMessage,
        sender_tab: Option<TabId>,
    ) -> Option<RelayReport> {
        match message {
            RuntimeMessage::Popup(request) => {
                let command = request.into_command();
                let origin = sender_tab.map_or(Origin::Popup, Origin::Page);
                info!("Forwarding {} from {:?}", command, origin);
                Some(self.router.relay(&command, origin).await)
            }
            RuntimeMessage::Overlay(event) => {
                debug!("Overlay event from tab {:?}: {:?}", sender_tab, event);
                None
            }
        }
    }

    /// Keyboard shortcuts go to the active tab once, without retries
    pub async fn handle_shortcut(&self, shortcut: Shortcut) -> RelayReport {
        let command = shortcut.into_command();
        match self.router.active_tab_id().await {
            Some(tab) => self.router.relay(&command, Origin::Page(tab)).await,
            None => {
                debug!("No active tab for shortcut {:?}", shortcut);
                RelayReport::failed(Error::NoActiveTab)
            }
        }
    }

    /// Toolbar clicks open the overlay in the clicked tab
    pub async fn handle_toolbar_click(&self, tab: Option<TabId>) -> RelayReport {
        match tab {
            Some(tab) => {
                self.router
                    .relay(&Command::ShowOverlay, Origin::Page(tab))
                    .await
            }
            None => RelayReport::failed(Error::NoActiveTab),
        }
    }
}

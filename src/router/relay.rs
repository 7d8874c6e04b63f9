use std::sync::Arc;
use tokio::time;
use tracing::{debug, info, warn};

use super::config::RouterConfig;
use super::fallback::{injection_pipeline, FallbackReport, FallbackRunner};
use crate::command::Command;
use crate::error::{Error, HostError};
use crate::host::{Notifier, PageScript, Scripting, TabId, Tabs};

const NO_ACTIVE_TAB_MESSAGE: &str = "Could not open overlay: no active tab detected";
const DELIVERY_FAILED_MESSAGE: &str = "Failed to open overlay in the current tab";

/// Where a command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The popup, which has no tab of its own; the active tab is targeted
    Popup,
    /// A page context; delivered back to that tab once
    Page(TabId),
}

/// Result of a single send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    NoReceiver,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub tab: TabId,
    /// Zero-based attempt index; the post-injection attempt follows the direct ones
    pub retry: u32,
    pub outcome: DeliveryOutcome,
}

/// Everything the router did for one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub tab: Option<TabId>,
    pub attempts: Vec<DeliveryAttempt>,
    pub injection: Option<FallbackReport>,
    pub banner_shown: bool,
    pub error: Option<Error>,
}

impl RelayReport {
    pub fn failed(error: Error) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> bool {
        self.attempts
            .last()
            .map_or(false, |a| a.outcome == DeliveryOutcome::Delivered)
    }
}

/// Relays commands from the popup and shortcuts into page contexts
///
/// Direct delivery is retried with a fixed backoff. When every attempt finds
/// no listener the overlay program is injected, and one more send follows
/// after a settle delay. Failures end in a user notification; nothing is
/// surfaced to the caller except the report.
pub struct ControlPlaneRouter {
    tabs: Arc<dyn Tabs>,
    scripting: Arc<dyn Scripting>,
    notifier: Arc<dyn Notifier>,
    injection: FallbackRunner,
    config: RouterConfig,
}

impl ControlPlaneRouter {
    pub fn new(
        tabs: Arc<dyn Tabs>,
        scripting: Arc<dyn Scripting>,
        notifier: Arc<dyn Notifier>,
        config: RouterConfig,
    ) -> Self {
        let injection = injection_pipeline(Arc::clone(&scripting), &config);
        Self {
            tabs,
            scripting,
            notifier,
            injection,
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Id of the focused window's active tab
    pub async fn active_tab_id(&self) -> Option<TabId> {
        match self.tabs.active_tab().await {
            Ok(tab) => tab.map(|t| t.id),
            Err(e) => {
                warn!("Failed to query active tab: {}", e);
                None
            }
        }
    }

    /// Deliver `command` according to its origin
    pub async fn relay(&self, command: &Command, origin: Origin) -> RelayReport {
        match origin {
            Origin::Page(tab) => self.relay_to_tab(command, tab).await,
            Origin::Popup => self.relay_to_active_tab(command).await,
        }
    }

    async fn relay_to_tab(&self, command: &Command, tab: TabId) -> RelayReport {
        let mut report = RelayReport {
            tab: Some(tab),
            ..RelayReport::default()
        };

        let attempt = self.attempt(tab, command, 0).await;
        let delivered = attempt.outcome == DeliveryOutcome::Delivered;
        report.attempts.push(attempt);

        if delivered {
            debug!("Delivered {} to tab {}", command, tab);
        } else {
            warn!("Could not deliver {} to tab {}", command, tab);
            report.error = Some(Error::DeliveryFailure {
                command: command.to_string(),
                tab,
            });
        }

        report
    }

    async fn relay_to_active_tab(&self, command: &Command) -> RelayReport {
        let Some(tab) = self.active_tab_id().await else {
            warn!("No active tab found to forward {}", command);
            self.notify(NO_ACTIVE_TAB_MESSAGE).await;
            return RelayReport::failed(Error::NoActiveTab);
        };

        let mut report = RelayReport {
            tab: Some(tab),
            ..RelayReport::default()
        };

        for retry in 0..self.config.retry_attempts {
            let attempt = self.attempt(tab, command, retry).await;
            let delivered = attempt.outcome == DeliveryOutcome::Delivered;
            report.attempts.push(attempt);

            if delivered {
                info!("Delivered {} to tab {} (attempt {})", command, tab, retry + 1);
                return report;
            }

            time::sleep(self.config.retry_backoff()).await;
        }

        info!(
            "No listener in tab {} after {} attempts, injecting overlay",
            tab, self.config.retry_attempts
        );
        report.injection = Some(self.injection.run(tab).await);

        time::sleep(self.config.settle_delay()).await;

        let attempt = self
            .attempt(tab, command, self.config.retry_attempts)
            .await;
        let delivered = attempt.outcome == DeliveryOutcome::Delivered;
        report.attempts.push(attempt);

        report.banner_shown = self.show_banner(tab).await;

        if delivered {
            info!("Delivered {} to tab {} after injection", command, tab);
        } else {
            warn!("Failed to deliver {} to tab {} after injection", command, tab);
            self.notify(DELIVERY_FAILED_MESSAGE).await;
            report.error = Some(Error::DeliveryFailure {
                command: command.to_string(),
                tab,
            });
        }

        report
    }

    async fn attempt(&self, tab: TabId, command: &Command, retry: u32) -> DeliveryAttempt {
        let send = self.tabs.send_message(tab, command);
        let outcome = match time::timeout(self.config.send_timeout(), send).await {
            Ok(Ok(())) => DeliveryOutcome::Delivered,
            Ok(Err(HostError::Timeout(_))) => DeliveryOutcome::Timeout,
            Ok(Err(e)) => {
                debug!("Send to tab {} failed: {}", tab, e);
                DeliveryOutcome::NoReceiver
            }
            Err(_) => {
                debug!(
                    "Send to tab {} timed out after {}ms",
                    tab, self.config.send_timeout_ms
                );
                DeliveryOutcome::Timeout
            }
        };

        DeliveryAttempt {
            tab,
            retry,
            outcome,
        }
    }

    /// Best effort; a failed banner never affects delivery
    async fn show_banner(&self, tab: TabId) -> bool {
        let banner = PageScript::FeedbackBanner {
            element_id: self.config.banner_element_id.clone(),
            text: self.config.banner_text.clone(),
            lifetime: self.config.banner_lifetime(),
        };

        match self.scripting.inject_function(tab, &banner).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Could not show banner in tab {}: {}", tab, e);
                false
            }
        }
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self
            .notifier
            .notify(&self.config.notification_title, message)
            .await
        {
            warn!("Failed to show notification: {}", e);
        }
    }
}

//! Control-plane routing
//!
//! Runs in the background context and relays commands from the popup,
//! keyboard shortcuts and the toolbar button into page contexts. When no
//! overlay listener answers, the overlay program is injected through a
//! chain of fallbacks and delivery is tried once more.

mod background;
mod config;
mod fallback;
mod relay;

pub use background::Background;
pub use config::{
    RouterConfig, BANNER_ELEMENT_ID, BANNER_LIFETIME, CONTENT_SCRIPT_PATH, INJECTION_SETTLE,
    LOADER_MARKER_ID, RETRY_ATTEMPTS, RETRY_BACKOFF, SEND_TIMEOUT,
};
pub use fallback::{
    injection_pipeline, FallbackReport, FallbackRunner, FallbackStep, FileInjection,
    LegacyInjection, ScriptTagInjection,
};
pub use relay::{ControlPlaneRouter, DeliveryAttempt, DeliveryOutcome, Origin, RelayReport};

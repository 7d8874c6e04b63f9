pub mod messages;

pub use messages::{
    Command, OverlayEvent, OverlayReason, PopupRequest, RuntimeMessage, Shortcut,
};

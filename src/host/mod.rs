//! Host primitives
//!
//! Traits for everything the browser provides to the extension:
//! - Messaging between contexts (`Tabs`)
//! - Code injection (`Scripting`)
//! - Notifications (`Notifier`)
//! - Media devices and encoding (`MediaDevices`, `MediaEncoder`)
//!
//! `simulated` implements all of them in-process for the CLI and tests.

pub mod media;
pub mod notify;
pub mod scripting;
pub mod simulated;
pub mod tabs;

pub use media::{
    CameraConstraints, CameraDevice, DisplayConstraints, EncoderFactory, MediaDevices,
    MediaEncoder,
};
pub use notify::Notifier;
pub use scripting::{PageScript, Scripting};
pub use simulated::{HostCall, PageProgram, PickerResponse, SimulatedBrowser, SimulatedEncoder};
pub use tabs::{Tab, TabId, Tabs};

//! vmstate - Inspect the state of locally managed virtual machine instances
//!
//! Each instance lives in its own directory under the store home and is
//! described by a configuration document, pid files for its supervisor and
//! hypervisor driver, and the supervisor's control socket. Inspection reads
//! all of these and reconciles them into a single [`core::Status`].

pub mod core;
pub mod platform;
pub mod report;
pub mod template;

/// Application name constant
pub const APP_NAME: &str = "vmstate";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

//! Created-state lifecycle controller for the runm container shim.
//!
//! The entry point is [`init::InitProcess`]. Its collaborators sit behind
//! traits so each can be substituted:
//! - [`broker::PortBroker`]: obtains a host port for the sandbox.
//! - [`launcher::Launcher`]: starts the auxiliary service process.
//! - [`signal::Signaller`]: delivers signals on `kill`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod broker;
pub mod bundle;
pub mod context;
pub mod error;
pub mod init;
pub mod launcher;
pub mod lifecycle;
pub mod marker;
pub mod record;
pub mod signal;

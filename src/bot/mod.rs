//! Discord front end.
//!
//! - `support`: ticket creation and message screening, platform independent
//! - `discord`: serenity event handler and client bootstrap

pub mod discord;
pub mod support;

pub use discord::Handler;
pub use support::{MessageOutcome, Responder, SupportChannel, SupportDesk};

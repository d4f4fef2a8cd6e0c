//! Discord interaction router for the issue bot.
//!
//! Receives slash/message commands, select menus, buttons and modal submits
//! from the gateway and drives the registry store, the session manager and
//! the tracker client. All user-facing text is rendered in this crate; the
//! core crates only return typed errors.

mod discord_runtime;

pub use discord_runtime::{DiscordHandler, CMD_CREATE_BUG, CMD_CREATE_FEATURE, CMD_MANAGE};

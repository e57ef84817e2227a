//! nvrbot - NVR-to-Telegram Notification Bridge
//!
//! ## Architecture (5 Components)
//!
//! 1. StateStore - per-chat notification preferences, persisted to disk
//! 2. FrigateClient - NVR event source adapter
//! 3. EventPoller - fetch + seen-id deduplication
//! 4. Notifier - delivery fan-out honoring enabled/silent flags
//! 5. CommandHandler - inbound chat commands over the update long-poll
//!
//! ## Design Principles
//!
//! - StateStore is the only shared mutable state; tasks coordinate
//!   exclusively through it
//! - Collaborator failures are caught at each component boundary and
//!   logged; only a bad credential at startup is fatal
//! - An event id is delivered to an enabled chat at most once per window

pub mod chat_state;
pub mod command_handler;
pub mod error;
pub mod event_poller;
pub mod event_source;
pub mod notifier;
pub mod state;
pub mod telegram;

pub use error::{Error, Result};
pub use state::{AppConfig, AppState};

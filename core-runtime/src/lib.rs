//! Runtime plumbing shared by the playback crates: host bridge wiring
//! ([`config`]), the event channel ([`events`]) and subscriber setup
//! ([`logging`]).

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};

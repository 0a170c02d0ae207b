//! Workspace facade crate.
//!
//! This crate exposes shared feature flags that map to the individual
//! workspace crates (`core-runtime`, `core-playback`, the desktop bridges and
//! the signed-URL provider) and a one-call bootstrap for host applications.
//! Hosts can depend on `rehearsal-workspace` and enable the documented
//! features without wiring each crate individually.

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

#[cfg(feature = "signed-url")]
pub use provider_signed_url;

use anyhow::Context;
use core_playback::{PlaybackConfig, PlaybackCoordinator};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Sweep period used when the sweeper is enabled but no interval is set.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A running playback engine.
///
/// Dropping it stops the cache sweeper; clones of the coordinator keep
/// working.
pub struct Engine {
    pub coordinator: PlaybackCoordinator,
    pub events: EventBus,
    sweeper: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn has_sweeper(&self) -> bool {
        self.sweeper.is_some()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

/// Build the coordinator and its event bus from host bridges.
///
/// Starts the periodic cache sweeper when `enable_cache_sweeper` is set,
/// which requires a running Tokio runtime.
pub fn start_engine(core: &CoreConfig, playback: PlaybackConfig) -> anyhow::Result<Engine> {
    core.validate().context("invalid core configuration")?;

    let events = EventBus::default();
    let sweep_interval = playback.sweep_interval.unwrap_or(DEFAULT_SWEEP_INTERVAL);
    let coordinator = PlaybackCoordinator::new(core, playback, Some(events.clone()))
        .context("failed to build playback coordinator")?;

    let sweeper = if core.features.enable_cache_sweeper {
        tokio::runtime::Handle::try_current()
            .context("the cache sweeper needs a running Tokio runtime")?;
        coordinator.spawn_sweeper(Some(sweep_interval))
    } else {
        None
    };

    info!(sweeper = sweeper.is_some(), "Playback engine started");

    Ok(Engine {
        coordinator,
        events,
        sweeper,
    })
}

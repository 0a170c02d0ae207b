//! # Engine Events
//!
//! Typed notifications published by the playback coordinator and the
//! fresh-link service over a `tokio::sync::broadcast` channel. Hosts
//! subscribe to drive UI state (which line is playing, whether a link was
//! refreshed) and diagnostics.
//!
//! ```text
//!   PlaybackCoordinator ──┐                ┌──> UI subscriber
//!                         ├──> EventBus ───┤
//!   FreshLinkService ─────┘                └──> diagnostics
//! ```
//!
//! Publishing never blocks and never fails the caller: emitters ignore the
//! `SendError` returned when nobody is listening. A subscriber that falls
//! more than the bus capacity behind gets `RecvError::Lagged(n)` once and then
//! continues with newer events; `RecvError::Closed` means every bus handle
//! was dropped.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! let _ = bus.emit(CoreEvent::Playback(PlaybackEvent::Cancelled {
//!     session_id: "session-1".to_string(),
//! }));
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.session_id(), Some("session-1"));
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Capacity used by [`EventBus::default`].
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Everything the engine publishes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback session events
    Playback(PlaybackEvent),
    /// Signed link maintenance events
    Link(LinkEvent),
}

impl CoreEvent {
    /// Short label for logs.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Link(e) => e.description(),
        }
    }

    /// Session the event belongs to, for playback events that have one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Playback(
                PlaybackEvent::Started { session_id, .. }
                | PlaybackEvent::StrategyFailed { session_id, .. }
                | PlaybackEvent::Completed { session_id, .. }
                | PlaybackEvent::Cancelled { session_id }
                | PlaybackEvent::Failed { session_id, .. },
            ) => Some(session_id),
            _ => None,
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Link(LinkEvent::PersistFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::StrategyFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Preloaded { success: false, .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Playback(PlaybackEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Link(LinkEvent::Refreshed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Events related to playback sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new session began.
    Started {
        /// Session identifier.
        session_id: String,
        /// URL requested by the caller.
        url: String,
    },
    /// A single backend strategy failed.
    StrategyFailed {
        session_id: String,
        /// Backend that failed (e.g. `buffered_stream`).
        backend: String,
        /// Classified failure kind (e.g. `forbidden`).
        kind: String,
        message: String,
        /// 0 for a preloaded handle, 1 for the first chain pass, 2 after a
        /// link refresh.
        pass: u8,
    },
    /// Clip played to its end.
    Completed {
        session_id: String,
        /// URL that actually played (fresh link after a refresh).
        url: String,
        backend: String,
        /// Whether a refreshed link was used.
        refreshed: bool,
    },
    /// Session was stopped or superseded by a newer `play()`.
    Cancelled {
        session_id: String,
    },
    /// Every strategy failed.
    Failed {
        session_id: String,
        url: String,
        /// Number of strategy attempts made across all passes.
        attempts: u32,
        message: String,
    },
    /// A preload attempt settled.
    Preloaded {
        url: String,
        success: bool,
        /// Whether the handle came from a refreshed link.
        refreshed: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::StrategyFailed { .. } => "Playback strategy failed",
            PlaybackEvent::Completed { .. } => "Clip completed",
            PlaybackEvent::Cancelled { .. } => "Playback cancelled",
            PlaybackEvent::Failed { .. } => "All playback strategies failed",
            PlaybackEvent::Preloaded { .. } => "Preload settled",
        }
    }
}

/// Events related to signed link refresh and persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LinkEvent {
    /// A fresh link was minted.
    Refreshed {
        /// Stable object-storage path.
        storage_path: String,
        /// Newly minted signed URL.
        url: String,
    },
    /// The fresh link was written to the script document and local cache.
    Persisted {
        script_id: String,
        line_index: u32,
    },
    /// Background persistence failed.
    PersistFailed {
        script_id: String,
        line_index: u32,
        message: String,
    },
}

impl LinkEvent {
    fn description(&self) -> &str {
        match self {
            LinkEvent::Refreshed { .. } => "Fresh link minted",
            LinkEvent::Persisted { .. } => "Fresh link persisted",
            LinkEvent::PersistFailed { .. } => "Fresh link persistence failed",
        }
    }
}

/// Cloneable publishing handle; every clone feeds the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` is how far a subscriber may fall behind before it lags.
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publish to every current subscriber, returning how many there were.
    ///
    /// Errors only when there are no subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New receiver seeing events emitted from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Receiver that only yields events matching `keep`.
    pub fn subscribe_filtered<F>(&self, keep: F) -> EventStream
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        EventStream::new(self.subscribe()).filter(keep)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver with an optional predicate; non-matching events are skipped.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity};
///
/// let bus = EventBus::default();
/// let problems = bus.subscribe_filtered(|e| e.severity() >= EventSeverity::Warning);
/// let links = bus.subscribe_filtered(|e| matches!(e, CoreEvent::Link(_)));
/// # drop((problems, links));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<Predicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    /// Replace the predicate.
    pub fn filter<F>(mut self, keep: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(keep));
        self
    }

    fn wants(&self, event: &CoreEvent) -> bool {
        self.predicate.as_ref().map_or(true, |keep| keep(event))
    }

    /// Wait for the next matching event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already queued, or `None`.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.wants(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}

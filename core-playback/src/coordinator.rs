//! # Playback Coordinator
//!
//! Owns the single active playback session and drives every `play()` through
//! the preload cache, the strategy chain and at most one fresh-link retry.
//!
//! ## Session lifecycle
//!
//! ```text
//! Loading -> Playing -> Ended
//!    |          |-> Failed   (every strategy on every pass failed)
//!    '----------'-> Cancelled (stop() or a newer play())
//! ```
//!
//! Starting a session always stops the previous one and waits for its backend
//! teardown before the first strategy attempt of the new session.

use crate::backends::default_chain;
use crate::config::PlaybackConfig;
use crate::error::{BackendError, BackendResult, PlaybackError, Result};
use crate::fresh_link::FreshLinkService;
use crate::preload::{PreloadCache, PreloadedHandle};
use crate::traits::{teardown, BackendStrategy, ClipEnd, LoadedClip};
use crate::types::{
    AudioItem, BackendKind, PlaybackMetadata, PlaybackOutcome, RefreshContext, RefreshRequest,
    SessionId, SessionState,
};
use bridge_traits::time::Clock;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::redact_url;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

struct ActiveSession {
    id: SessionId,
    url: String,
    cancel: CancellationToken,
    clip: Option<Arc<dyn LoadedClip>>,
    /// Whether the session must release `clip` on teardown. Clips shared with
    /// the preload cache are only halted.
    owned: bool,
    state: SessionState,
}

/// What a `play()` call needs to talk to its own session.
struct SessionTicket {
    id: SessionId,
    cancel: CancellationToken,
}

enum ChainOutcome {
    Finished(Arc<dyn LoadedClip>),
    Cancelled,
    Exhausted,
}

struct Inner {
    strategies: Vec<Arc<dyn BackendStrategy>>,
    preload_cache: PreloadCache,
    fresh_links: Option<Arc<FreshLinkService>>,
    config: PlaybackConfig,
    event_bus: Option<EventBus>,
    active: Mutex<Option<ActiveSession>>,
    history: Mutex<VecDeque<(SessionId, SessionState)>>,
    teardowns: Mutex<Vec<Shared<BoxFuture<'static, ()>>>>,
}

impl Inner {
    /// Cancel a session that lost the slot and hand back its backend
    /// teardown, if it had a clip attached.
    fn retire(&self, session: ActiveSession) -> Option<BoxFuture<'static, ()>> {
        session.cancel.cancel();
        self.record(session.id, SessionState::Cancelled);
        self.emit(PlaybackEvent::Cancelled {
            session_id: session.id.to_string(),
        });
        info!(session = %session.id, url = %redact_url(&session.url), "Playback stopped");

        let clip = session.clip?;
        let owned = session.owned;
        Some(
            async move {
                if owned {
                    teardown(clip.as_ref()).await;
                } else {
                    clip.halt().await;
                }
            }
            .boxed(),
        )
    }

    /// Queue a teardown that later sessions wait on. Spawned when a runtime
    /// is present, otherwise driven by whoever awaits it.
    fn schedule_teardown(&self, work: BoxFuture<'static, ()>) {
        let work = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(work);
                async move {
                    if let Err(e) = task.await {
                        error!(error = %e, "Backend teardown task failed");
                    }
                }
                .boxed()
            }
            Err(_) => work,
        };
        self.teardowns.lock().push(work.shared());
    }

    async fn await_teardowns(&self) {
        let pending = self.teardowns.lock().clone();
        if pending.is_empty() {
            return;
        }
        join_all(pending).await;
        self.teardowns.lock().retain(|task| task.peek().is_none());
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }

    fn record(&self, id: SessionId, state: SessionState) {
        let mut history = self.history.lock();
        history.push_back((id, state));
        while history.len() > self.config.session_history {
            history.pop_front();
        }
    }

    async fn release_all(&self, handles: Vec<PreloadedHandle>) {
        for handle in handles {
            handle.clip.release().await;
        }
    }

    async fn sweep_expired(&self) -> usize {
        let swept = self.preload_cache.sweep_expired();
        let count = swept.len();
        self.release_all(swept).await;

        let links = match &self.fresh_links {
            Some(links) => links.sweep_expired().await,
            None => 0,
        };

        if count + links > 0 {
            debug!(preloads = count, links, "Swept expired cache entries");
        }
        count + links
    }
}

/// Resilient clip player.
///
/// Cheap to clone; clones share the same session slot and caches.
#[derive(Clone)]
pub struct PlaybackCoordinator {
    inner: Arc<Inner>,
}

impl PlaybackCoordinator {
    /// Build a coordinator from the host bridges.
    ///
    /// The strategy chain contains every strategy the injected bridges can
    /// support. The fresh-link service is created when link refresh is
    /// enabled in the feature flags.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidConfig`] for an invalid `config` and
    /// [`PlaybackError::NoBackends`] when no strategy can be built.
    pub fn new(
        core: &CoreConfig,
        config: PlaybackConfig,
        event_bus: Option<EventBus>,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        let strategies = default_chain(core, &config);
        let fresh_links = if core.features.enable_link_refresh {
            let mut service = FreshLinkService::new(
                core.object_storage.clone(),
                core.document_store.clone(),
                core.local_cache_store.clone(),
                core.clock.clone(),
                config.url_cache_ttl,
            )
            .with_persistence(core.features.enable_link_persistence);
            if let Some(bus) = &event_bus {
                service = service.with_event_bus(bus.clone());
            }
            Some(Arc::new(service))
        } else {
            None
        };

        Self::from_parts(strategies, fresh_links, core.clock.clone(), config, event_bus)
    }

    /// Build a coordinator from explicit parts. Strategies are tried in the
    /// order given.
    pub fn from_parts(
        strategies: Vec<Arc<dyn BackendStrategy>>,
        fresh_links: Option<Arc<FreshLinkService>>,
        clock: Arc<dyn Clock>,
        config: PlaybackConfig,
        event_bus: Option<EventBus>,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;
        if strategies.is_empty() {
            return Err(PlaybackError::NoBackends(
                "no playback output (adapter or audio sink) is available".to_string(),
            ));
        }

        info!(
            backends = ?strategies.iter().map(|s| s.kind()).collect::<Vec<_>>(),
            link_refresh = fresh_links.is_some(),
            "Playback coordinator ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                strategies,
                preload_cache: PreloadCache::new(config.preload_ttl, clock),
                fresh_links,
                config,
                event_bus,
                active: Mutex::new(None),
                history: Mutex::new(VecDeque::new()),
                teardowns: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn fresh_links(&self) -> Option<&Arc<FreshLinkService>> {
        self.inner.fresh_links.as_ref()
    }

    pub fn preload_cache(&self) -> &PreloadCache {
        &self.inner.preload_cache
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }

    // ========================================================================
    // Preload
    // ========================================================================

    /// Load upcoming clips ahead of time.
    ///
    /// Items are loaded concurrently with the primary strategy. A failed load
    /// is retried once with a fresh link when the item carries a storage path
    /// and line index and `context` names the script and user. Never fails;
    /// the map reports which URLs ended up cached.
    #[instrument(skip(self, items, context), fields(items = items.len()))]
    pub async fn preload(
        &self,
        items: &[AudioItem],
        context: Option<&RefreshContext>,
    ) -> HashMap<String, bool> {
        let mut seen = HashSet::new();
        let unique: Vec<&AudioItem> = items
            .iter()
            .filter(|item| seen.insert(item.url.as_str()))
            .collect();

        let results = join_all(unique.into_iter().map(|item| async move {
            let success = self.preload_one(item, context).await;
            (item.url.clone(), success)
        }))
        .await;

        self.inner
            .release_all(self.inner.preload_cache.take_evicted())
            .await;

        let loaded = results.iter().filter(|(_, ok)| *ok).count();
        debug!(loaded, total = results.len(), "Preload settled");
        results.into_iter().collect()
    }

    async fn preload_one(&self, item: &AudioItem, context: Option<&RefreshContext>) -> bool {
        if self.inner.preload_cache.contains(&item.url) {
            debug!(url = %redact_url(&item.url), "Already preloaded");
            return true;
        }

        let Some(primary) = self.inner.strategies.first() else {
            return false;
        };

        let err = match self.load_bounded(primary.as_ref(), &item.url).await {
            Ok(clip) => {
                self.cache_clip(&item.url, clip).await;
                self.emit_preloaded(&item.url, true, false);
                return true;
            }
            Err(err) => err,
        };

        debug!(url = %redact_url(&item.url), error = %err, "Preload failed");

        let request = match (context, &self.inner.fresh_links) {
            (Some(context), Some(_)) => RefreshRequest::for_item(item, context),
            _ => None,
        };
        let (Some(request), Some(links)) = (request, &self.inner.fresh_links) else {
            self.emit_preloaded(&item.url, false, false);
            return false;
        };

        let fresh_url = match links.refresh_url(&request).await {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %redact_url(&item.url), error = %e, "Preload could not refresh link");
                self.emit_preloaded(&item.url, false, false);
                return false;
            }
        };

        match self.load_bounded(primary.as_ref(), &fresh_url).await {
            Ok(clip) => {
                self.cache_clip(&item.url, clip.clone()).await;
                if fresh_url != item.url {
                    self.cache_clip(&fresh_url, clip).await;
                }
                self.emit_preloaded(&item.url, true, true);
                true
            }
            Err(err) => {
                warn!(url = %redact_url(&fresh_url), error = %err, "Preload failed with fresh link");
                self.emit_preloaded(&item.url, false, true);
                false
            }
        }
    }

    fn emit_preloaded(&self, url: &str, success: bool, refreshed: bool) {
        self.inner.emit(PlaybackEvent::Preloaded {
            url: url.to_string(),
            success,
            refreshed,
        });
    }

    /// Insert `clip` for `url`, releasing whatever it replaced.
    async fn cache_clip(&self, url: &str, clip: Arc<dyn LoadedClip>) {
        if let Some(replaced) = self.inner.preload_cache.insert(url, clip.clone()) {
            if !Arc::ptr_eq(&replaced.clip, &clip) {
                replaced.clip.release().await;
            }
        }
    }

    /// Release named preloaded handles, or all of them, and forget every
    /// fresh link.
    pub async fn clear_preload_cache(&self, urls: Option<&[String]>) {
        let drained = self.inner.preload_cache.drain(urls);
        debug!(count = drained.len(), "Clearing preload cache");
        self.inner.release_all(drained).await;

        if let Some(links) = &self.inner.fresh_links {
            links.clear();
        }
    }

    /// Remove expired preloads and fresh links. Returns how many entries
    /// were dropped.
    pub async fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired().await
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval` (or the
    /// configured `sweep_interval`) until the coordinator is dropped.
    ///
    /// Returns `None` when no interval is configured.
    pub fn spawn_sweeper(&self, interval: Option<Duration>) -> Option<JoinHandle<()>> {
        let period = interval.or(self.inner.config.sweep_interval)?;
        if period.is_zero() {
            return None;
        }
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("Coordinator dropped, stopping cache sweeper");
                    break;
                };
                inner.sweep_expired().await;
            }
        }))
    }

    // ========================================================================
    // Play / Stop
    // ========================================================================

    /// Play `url`, replacing any session in progress.
    ///
    /// Tries the preloaded handle first, then every strategy in order. When a
    /// first-pass failure looks like a dead link and `metadata` is complete,
    /// one fresh link is minted and the chain runs once more against it.
    ///
    /// A session superseded by `stop()` or another `play()` settles with
    /// [`SessionState::Cancelled`] in the returned outcome.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::AllStrategiesFailed`] once every attempt is
    /// exhausted. No other error is returned.
    #[instrument(skip(self, url, metadata), fields(url = %redact_url(url)))]
    pub async fn play(
        &self,
        url: &str,
        metadata: Option<PlaybackMetadata>,
    ) -> Result<PlaybackOutcome> {
        let ticket = self.begin_session(url).await;
        if ticket.cancel.is_cancelled() {
            // Another play() claimed the slot while teardowns drained.
            return Ok(self.cancelled(&ticket, url, false).await);
        }

        let mut attempts: Vec<BackendError> = Vec::new();

        if let Some(clip) = self.inner.preload_cache.get(url) {
            debug!(backend = %clip.backend(), "Playing preloaded handle");
            match self.run_clip(&ticket, clip.clone(), false).await {
                Ok(ClipEnd::Finished) => {
                    self.detach(&ticket, &clip);
                    self.consume_preloaded(url, &clip).await;
                    return Ok(self.finish(&ticket, url, clip.backend(), false));
                }
                Ok(ClipEnd::Cancelled) => return Ok(self.cancelled(&ticket, url, false).await),
                Err(err) => {
                    self.detach(&ticket, &clip);
                    self.evict_preloaded(url, &clip).await;
                    if ticket.cancel.is_cancelled() {
                        return Ok(self.cancelled(&ticket, url, false).await);
                    }
                    self.strategy_failed(&ticket, &err, 0);
                    attempts.push(err);
                }
            }
        }
        self.inner
            .release_all(self.inner.preload_cache.take_evicted())
            .await;

        let first_pass = attempts.len();
        match self.run_chain(&ticket, url, 1, &mut attempts).await {
            ChainOutcome::Finished(clip) => {
                self.detach(&ticket, &clip);
                clip.release().await;
                return Ok(self.finish(&ticket, url, clip.backend(), false));
            }
            ChainOutcome::Cancelled => return Ok(self.cancelled(&ticket, url, false).await),
            ChainOutcome::Exhausted => {}
        }

        let link_expired = attempts[first_pass..]
            .iter()
            .any(BackendError::is_link_expired);
        let request = metadata.as_ref().and_then(PlaybackMetadata::refresh_request);

        let (Some(links), Some(request)) = (&self.inner.fresh_links, request) else {
            return self.fail(&ticket, url, attempts);
        };
        if !link_expired {
            debug!("No link-expired failure, skipping fresh-link retry");
            return self.fail(&ticket, url, attempts);
        }

        info!(storage_path = %request.storage_path, "Retrying with a fresh link");
        let refreshed = tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => {
                return Ok(self.cancelled(&ticket, url, false).await);
            }
            refreshed = links.refresh_url(&request) => refreshed,
        };

        let fresh_url = match refreshed {
            Ok(fresh_url) => fresh_url,
            Err(e) => {
                warn!(error = %e, "Fresh link unavailable");
                return self.fail(&ticket, url, attempts);
            }
        };

        match self.run_chain(&ticket, &fresh_url, 2, &mut attempts).await {
            ChainOutcome::Finished(clip) => {
                self.detach(&ticket, &clip);
                // Keep the working clip for replays of this line.
                if let Some(stale) = self.inner.preload_cache.remove(url) {
                    if !Arc::ptr_eq(&stale.clip, &clip) {
                        stale.clip.release().await;
                    }
                }
                self.cache_clip(&fresh_url, clip.clone()).await;
                Ok(self.finish(&ticket, &fresh_url, clip.backend(), true))
            }
            ChainOutcome::Cancelled => Ok(self.cancelled(&ticket, &fresh_url, true).await),
            ChainOutcome::Exhausted => self.fail(&ticket, url, attempts),
        }
    }

    /// Stop the active session, if any.
    ///
    /// Marks it cancelled immediately and tears its backend down in the
    /// background; the next `play()` waits for that teardown. Idempotent.
    pub fn stop(&self) {
        let Some(active) = self.inner.active.lock().take() else {
            return;
        };
        let Some(work) = self.inner.retire(active) else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(_) => self.inner.schedule_teardown(work),
            Err(_) => futures::executor::block_on(work),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// State of a session, if it is active or among the recently settled.
    pub fn session_state(&self, id: SessionId) -> Option<SessionState> {
        if let Some(active) = self.inner.active.lock().as_ref() {
            if active.id == id {
                return Some(active.state);
            }
        }
        self.inner
            .history
            .lock()
            .iter()
            .rev()
            .find(|(session, _)| *session == id)
            .map(|(_, state)| *state)
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.inner.active.lock().as_ref().map(|active| active.id)
    }

    /// Whether a clip is audibly playing right now.
    pub fn is_playing(&self) -> bool {
        self.inner
            .active
            .lock()
            .as_ref()
            .map(|active| active.state == SessionState::Playing)
            .unwrap_or(false)
    }

    // ========================================================================
    // Session plumbing
    // ========================================================================

    /// Claim the slot, retiring whoever held it, then wait for every
    /// teardown still in flight. The returned ticket is already cancelled
    /// when a later `play()` claimed the slot during that wait.
    async fn begin_session(&self, url: &str) -> SessionTicket {
        let ticket = SessionTicket {
            id: SessionId::new(),
            cancel: CancellationToken::new(),
        };

        {
            let mut active = self.inner.active.lock();
            let previous = active.replace(ActiveSession {
                id: ticket.id,
                url: url.to_string(),
                cancel: ticket.cancel.clone(),
                clip: None,
                owned: false,
                state: SessionState::Loading,
            });
            if let Some(work) = previous.and_then(|session| self.inner.retire(session)) {
                self.inner.schedule_teardown(work);
            }
            self.inner.emit(PlaybackEvent::Started {
                session_id: ticket.id.to_string(),
                url: url.to_string(),
            });
        }

        self.inner.await_teardowns().await;
        debug!(session = %ticket.id, "Session started");
        ticket
    }

    /// Walk the strategy chain once for `url`.
    async fn run_chain(
        &self,
        ticket: &SessionTicket,
        url: &str,
        pass: u8,
        attempts: &mut Vec<BackendError>,
    ) -> ChainOutcome {
        for strategy in &self.inner.strategies {
            if ticket.cancel.is_cancelled() {
                return ChainOutcome::Cancelled;
            }

            let loaded = tokio::select! {
                biased;
                _ = ticket.cancel.cancelled() => return ChainOutcome::Cancelled,
                loaded = self.load_bounded(strategy.as_ref(), url) => loaded,
            };

            let clip = match loaded {
                Ok(clip) => clip,
                Err(err) => {
                    self.strategy_failed(ticket, &err, pass);
                    attempts.push(err);
                    continue;
                }
            };

            match self.run_clip(ticket, clip.clone(), true).await {
                Ok(ClipEnd::Finished) => return ChainOutcome::Finished(clip),
                Ok(ClipEnd::Cancelled) => return ChainOutcome::Cancelled,
                Err(err) => {
                    if self.detach(ticket, &clip) {
                        teardown(clip.as_ref()).await;
                    }
                    if ticket.cancel.is_cancelled() {
                        return ChainOutcome::Cancelled;
                    }
                    self.strategy_failed(ticket, &err, pass);
                    attempts.push(err);
                }
            }
        }

        ChainOutcome::Exhausted
    }

    async fn load_bounded(
        &self,
        strategy: &dyn BackendStrategy,
        url: &str,
    ) -> BackendResult<Arc<dyn LoadedClip>> {
        let limit = self.inner.config.attempt_timeout;
        match tokio::time::timeout(limit, strategy.load(url)).await {
            Ok(loaded) => loaded,
            Err(_) => Err(BackendError::timeout(strategy.kind(), limit)),
        }
    }

    /// Attach `clip` to the session and play it. A session that was stopped
    /// before the clip could attach reports `Cancelled` and releases an owned
    /// clip.
    async fn run_clip(
        &self,
        ticket: &SessionTicket,
        clip: Arc<dyn LoadedClip>,
        owned: bool,
    ) -> BackendResult<ClipEnd> {
        let attached = {
            let mut active = self.inner.active.lock();
            match active.as_mut() {
                Some(session) if session.id == ticket.id && !ticket.cancel.is_cancelled() => {
                    session.clip = Some(clip.clone());
                    session.owned = owned;
                    session.state = SessionState::Playing;
                    true
                }
                _ => false,
            }
        };

        if !attached {
            if owned {
                teardown(clip.as_ref()).await;
            }
            return Ok(ClipEnd::Cancelled);
        }

        debug!(session = %ticket.id, backend = %clip.backend(), "Clip attached");
        clip.play(ticket.cancel.clone()).await
    }

    /// Take `clip` back from the session. Returns `false` when `stop()`
    /// already took it.
    fn detach(&self, ticket: &SessionTicket, clip: &Arc<dyn LoadedClip>) -> bool {
        let mut active = self.inner.active.lock();
        match active.as_mut() {
            Some(session) if session.id == ticket.id => {
                let ours = session
                    .clip
                    .as_ref()
                    .map(|attached| Arc::ptr_eq(attached, clip))
                    .unwrap_or(false);
                if ours {
                    session.clip = None;
                    session.owned = false;
                    session.state = SessionState::Loading;
                }
                ours
            }
            _ => false,
        }
    }

    /// Drop the handle a play just used up. A newer clip cached for `url` in
    /// the meantime stays.
    async fn consume_preloaded(&self, url: &str, clip: &Arc<dyn LoadedClip>) {
        match self.inner.preload_cache.remove(url) {
            Some(handle) if !Arc::ptr_eq(&handle.clip, clip) => {
                self.inner.preload_cache.insert(handle.url.clone(), handle.clip);
            }
            _ => {}
        }
        clip.release().await;
    }

    async fn evict_preloaded(&self, url: &str, clip: &Arc<dyn LoadedClip>) {
        let evicted = match self.inner.preload_cache.remove(url) {
            Some(handle) if Arc::ptr_eq(&handle.clip, clip) => Some(handle),
            Some(newer) => {
                self.inner.preload_cache.insert(newer.url.clone(), newer.clip);
                None
            }
            None => None,
        };
        if evicted.is_some() {
            debug!(url = %redact_url(url), "Evicted failing preloaded handle");
        }
        teardown(clip.as_ref()).await;
    }

    fn strategy_failed(&self, ticket: &SessionTicket, err: &BackendError, pass: u8) {
        warn!(
            session = %ticket.id,
            backend = %err.backend,
            kind = %err.kind,
            pass,
            error = %err.message,
            "Playback strategy failed"
        );
        self.inner.emit(PlaybackEvent::StrategyFailed {
            session_id: ticket.id.to_string(),
            backend: err.backend.to_string(),
            kind: err.kind.to_string(),
            message: err.message.clone(),
            pass,
        });
    }

    /// Remove the session from the slot if it still holds it, recording
    /// `state`. Returns `None` when `stop()` got there first.
    fn settle(&self, ticket: &SessionTicket, state: SessionState) -> Option<ActiveSession> {
        let mut active = self.inner.active.lock();
        let ours = active
            .as_ref()
            .map(|session| session.id == ticket.id)
            .unwrap_or(false);
        if !ours {
            return None;
        }
        let session = active.take();
        drop(active);
        self.inner.record(ticket.id, state);
        session
    }

    fn finish(
        &self,
        ticket: &SessionTicket,
        url: &str,
        backend: BackendKind,
        refreshed: bool,
    ) -> PlaybackOutcome {
        let state = if self.settle(ticket, SessionState::Ended).is_some() {
            info!(session = %ticket.id, backend = %backend, refreshed, "Clip completed");
            self.inner.emit(PlaybackEvent::Completed {
                session_id: ticket.id.to_string(),
                url: url.to_string(),
                backend: backend.to_string(),
                refreshed,
            });
            SessionState::Ended
        } else {
            SessionState::Cancelled
        };

        PlaybackOutcome {
            session: ticket.id,
            state,
            url: url.to_string(),
            backend: Some(backend),
            refreshed,
        }
    }

    /// Settle a session whose playback ended early. When the host stopped
    /// the clip on its own the session is still in the slot and is torn
    /// down here.
    async fn cancelled(
        &self,
        ticket: &SessionTicket,
        url: &str,
        refreshed: bool,
    ) -> PlaybackOutcome {
        if let Some(session) = self.settle(ticket, SessionState::Cancelled) {
            session.cancel.cancel();
            self.inner.emit(PlaybackEvent::Cancelled {
                session_id: ticket.id.to_string(),
            });
            if let Some(clip) = session.clip {
                if session.owned {
                    teardown(clip.as_ref()).await;
                } else {
                    clip.halt().await;
                }
            }
        }
        debug!(session = %ticket.id, "Session cancelled");

        PlaybackOutcome {
            session: ticket.id,
            state: SessionState::Cancelled,
            url: url.to_string(),
            backend: None,
            refreshed,
        }
    }

    /// Settle as `Failed` and build the terminal error. A session stopped
    /// in the meantime settles as cancelled instead.
    fn fail(
        &self,
        ticket: &SessionTicket,
        url: &str,
        attempts: Vec<BackendError>,
    ) -> Result<PlaybackOutcome> {
        let err = PlaybackError::AllStrategiesFailed {
            url: url.to_string(),
            attempts,
        };
        if self.settle(ticket, SessionState::Failed).is_none() {
            debug!(session = %ticket.id, "Session stopped before failing");
            return Ok(PlaybackOutcome {
                session: ticket.id,
                state: SessionState::Cancelled,
                url: url.to_string(),
                backend: None,
                refreshed: false,
            });
        }

        error!(session = %ticket.id, error = %err, "Playback failed");
        self.inner.emit(PlaybackEvent::Failed {
            session_id: ticket.id.to_string(),
            url: url.to_string(),
            attempts: err.attempts().len() as u32,
            message: err.to_string(),
        });
        Err(err)
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field(
                "strategies",
                &self
                    .inner
                    .strategies
                    .iter()
                    .map(|s| s.kind())
                    .collect::<Vec<_>>(),
            )
            .field("preloaded", &self.inner.preload_cache.len())
            .field("current_session", &self.current_session())
            .finish()
    }
}

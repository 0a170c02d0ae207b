//! Playback coordinator behavior against scripted strategies.
//!
//! Covers:
//! - Preload idempotence, expiry and fresh-link retry
//! - The refresh-once pass over the strategy chain
//! - Persistence isolation
//! - Cancellation and the single active session

mod support;

use bridge_desktop::InMemoryDocumentStore;
use bridge_traits::storage::{LineRecord, ScriptDocument};
use bridge_traits::time::ManualClock;
use core_playback::{
    AudioItem, BackendKind, BackendStrategy, FailureKind, FreshLinkService, PlaybackConfig,
    PlaybackCoordinator, PlaybackError, PlaybackMetadata, RefreshContext, SessionState,
};
use core_runtime::events::{CoreEvent, EventBus, LinkEvent, PlaybackEvent, Receiver};
use std::sync::Arc;
use std::time::Duration;
use support::{FakeStorage, FakeStrategy, Journal, LoadScript, MemoryCacheStore, PlayScript};

const FRESH_P1: &str = "https://fresh.test/p1?v=1";

struct Harness {
    coordinator: PlaybackCoordinator,
    strategies: Vec<Arc<FakeStrategy>>,
    storage: Arc<FakeStorage>,
    documents: Arc<InMemoryDocumentStore>,
    clock: Arc<ManualClock>,
    bus: EventBus,
}

impl Harness {
    fn strategy(&self, kind: BackendKind) -> &FakeStrategy {
        self.strategies
            .iter()
            .find(|s| s.kind() == kind)
            .expect("strategy in chain")
    }
}

fn build(strategies: Vec<FakeStrategy>, storage: FakeStorage, config: PlaybackConfig) -> Harness {
    let strategies: Vec<Arc<FakeStrategy>> = strategies.into_iter().map(Arc::new).collect();
    let storage = Arc::new(storage);
    let documents = Arc::new(InMemoryDocumentStore::new());
    let clock = Arc::new(ManualClock::default());
    let bus = EventBus::new(256);

    let links = FreshLinkService::new(
        storage.clone(),
        documents.clone(),
        Arc::new(MemoryCacheStore::default()),
        clock.clone(),
        config.url_cache_ttl,
    )
    .with_event_bus(bus.clone());

    let chain: Vec<Arc<dyn BackendStrategy>> = strategies
        .iter()
        .map(|s| s.clone() as Arc<dyn BackendStrategy>)
        .collect();

    let coordinator = PlaybackCoordinator::from_parts(
        chain,
        Some(Arc::new(links)),
        clock.clone(),
        config,
        Some(bus.clone()),
    )
    .unwrap();

    Harness {
        coordinator,
        strategies,
        storage,
        documents,
        clock,
        bus,
    }
}

/// Four strategies that fail with 403 everywhere except where overridden.
fn forbidden_chain(journal: &Journal) -> Vec<FakeStrategy> {
    BackendKind::CHAIN
        .iter()
        .map(|kind| {
            FakeStrategy::new(
                *kind,
                LoadScript::Fail(FailureKind::Forbidden, "HTTP 403: Request has expired"),
                journal.clone(),
            )
        })
        .collect()
}

fn p1_metadata() -> PlaybackMetadata {
    PlaybackMetadata::complete("p1", "s1", "u1", 3)
}

async fn next_link_event(rx: &mut Receiver<CoreEvent>) -> LinkEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let CoreEvent::Link(event) = rx.recv().await.unwrap() {
                return event;
            }
        }
    })
    .await
    .expect("link event")
}

fn drain_playback_events(rx: &mut Receiver<CoreEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Playback(event) = event {
            events.push(event);
        }
    }
    events
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached");
}

// ============================================================================
// Preload
// ============================================================================

#[tokio::test]
async fn preload_twice_does_not_reload() {
    let journal = Journal::default();
    let h = build(
        vec![FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );
    let items = vec![AudioItem::new("A"), AudioItem::new("B")];

    let first = h.coordinator.preload(&items, None).await;
    assert_eq!(first.len(), 2);
    assert!(first["A"]);
    assert!(first["B"]);

    let second = h.coordinator.preload(&items, None).await;
    assert_eq!(first, second);
    assert_eq!(h.strategy(BackendKind::BufferedStream).loads(), 2);
}

#[tokio::test]
async fn preload_failure_is_reported_not_raised() {
    let journal = Journal::default();
    let strategy = FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())
        .with("B", LoadScript::Fail(FailureKind::Decode, "not audio"));
    let h = build(vec![strategy], FakeStorage::default(), PlaybackConfig::default());

    let result = h
        .coordinator
        .preload(&[AudioItem::new("A"), AudioItem::new("B")], None)
        .await;

    assert!(result["A"]);
    assert!(!result["B"]);
    assert!(!h.coordinator.preload_cache().contains("B"));
}

#[tokio::test]
async fn expired_preload_is_loaded_again() {
    let journal = Journal::default();
    let h = build(
        vec![FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );
    let items = vec![AudioItem::new("A")];

    h.coordinator.preload(&items, None).await;
    h.clock.advance(chrono::Duration::minutes(20));
    assert!(!h.coordinator.preload_cache().contains("A"));

    assert!(h.coordinator.preload(&items, None).await["A"]);
    assert_eq!(h.strategy(BackendKind::BufferedStream).loads(), 2);
    assert_eq!(journal.count("release:buffered_stream:A"), 1);
}

#[tokio::test]
async fn preload_retries_with_fresh_link() {
    let journal = Journal::default();
    let strategy = FakeStrategy::new(
        BackendKind::BufferedStream,
        LoadScript::Fail(FailureKind::Forbidden, "403"),
        journal.clone(),
    )
    .with(FRESH_P1, LoadScript::Load(PlayScript::Finish(Duration::ZERO)));
    let h = build(vec![strategy], FakeStorage::default(), PlaybackConfig::default());
    let item = AudioItem::new("old").with_storage_path("p1").with_line_index(3);
    let context = RefreshContext::new("s1", "u1");

    let result = h.coordinator.preload(&[item], Some(&context)).await;

    assert!(result["old"]);
    assert_eq!(h.storage.paths(), vec!["p1".to_string()]);
    assert!(h.coordinator.preload_cache().contains("old"));
    assert!(h.coordinator.preload_cache().contains(FRESH_P1));
}

#[tokio::test]
async fn preload_without_context_does_not_refresh() {
    let journal = Journal::default();
    let strategy = FakeStrategy::new(
        BackendKind::BufferedStream,
        LoadScript::Fail(FailureKind::Forbidden, "403"),
        journal,
    );
    let h = build(vec![strategy], FakeStorage::default(), PlaybackConfig::default());
    let item = AudioItem::new("old").with_storage_path("p1").with_line_index(3);

    let result = h.coordinator.preload(&[item], None).await;

    assert!(!result["old"]);
    assert_eq!(h.storage.calls(), 0);
}

#[tokio::test]
async fn play_consumes_preloaded_handle() {
    let journal = Journal::default();
    let h = build(
        vec![
            FakeStrategy::ok(BackendKind::BufferedStream, journal.clone()),
            FakeStrategy::ok(BackendKind::NativeElement, journal.clone()),
        ],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    h.coordinator.preload(&[AudioItem::new("A")], None).await;
    let outcome = h.coordinator.play("A", None).await.unwrap();

    assert_eq!(outcome.state, SessionState::Ended);
    assert_eq!(outcome.backend, Some(BackendKind::BufferedStream));
    assert_eq!(h.strategy(BackendKind::BufferedStream).loads(), 1);
    assert_eq!(h.strategy(BackendKind::NativeElement).loads(), 0);
    assert_eq!(journal.count("play:buffered_stream:A"), 1);

    // The handle is used up: released and gone from the cache.
    assert!(!h.coordinator.preload_cache().contains("A"));
    assert_eq!(journal.count("release:buffered_stream:A"), 1);

    let replay = h.coordinator.play("A", None).await.unwrap();
    assert_eq!(replay.state, SessionState::Ended);
    assert_eq!(h.strategy(BackendKind::BufferedStream).loads(), 2);
}

#[tokio::test]
async fn failing_preloaded_handle_is_evicted() {
    let journal = Journal::default();
    let h = build(
        vec![
            FakeStrategy::ok(BackendKind::BufferedStream, journal.clone()).with(
                "A",
                LoadScript::Load(PlayScript::Fail(FailureKind::PlayBlocked, "NotAllowedError")),
            ),
            FakeStrategy::ok(BackendKind::DecodeGraph, journal.clone()),
        ],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    h.coordinator.preload(&[AudioItem::new("A")], None).await;
    let outcome = h.coordinator.play("A", None).await.unwrap();

    assert_eq!(outcome.backend, Some(BackendKind::DecodeGraph));
    assert!(!h.coordinator.preload_cache().contains("A"));
    // Preloaded clip plus the chain's own attempt.
    assert_eq!(journal.count("play:buffered_stream:A"), 2);
}

#[tokio::test]
async fn clear_preload_cache_releases_and_forgets_links() {
    let journal = Journal::default();
    let h = build(
        vec![FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );
    h.coordinator
        .preload(&[AudioItem::new("A"), AudioItem::new("B")], None)
        .await;
    let links = h.coordinator.fresh_links().unwrap().clone();
    links
        .refresh_url(&p1_metadata().refresh_request().unwrap())
        .await
        .unwrap();

    h.coordinator
        .clear_preload_cache(Some(&["A".to_string()]))
        .await;
    assert!(!h.coordinator.preload_cache().contains("A"));
    assert!(h.coordinator.preload_cache().contains("B"));
    assert_eq!(journal.count("release:buffered_stream:A"), 1);
    assert!(links.cached_url("p1").is_none());

    h.coordinator.clear_preload_cache(None).await;
    assert!(h.coordinator.preload_cache().is_empty());
    assert_eq!(journal.count("release:buffered_stream:B"), 1);
}

#[tokio::test]
async fn sweeper_drops_expired_preloads() {
    let journal = Journal::default();
    let h = build(
        vec![FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );
    h.coordinator.preload(&[AudioItem::new("A")], None).await;
    assert!(h.coordinator.spawn_sweeper(None).is_none());

    let sweeper = h
        .coordinator
        .spawn_sweeper(Some(Duration::from_millis(10)))
        .unwrap();
    h.clock.advance(chrono::Duration::minutes(25));

    let cache = h.coordinator.clone();
    wait_for(move || cache.preload_cache().is_empty()).await;
    wait_for(|| journal.count("release:buffered_stream:A") == 1).await;
    sweeper.abort();
}

// ============================================================================
// Fresh-link retry
// ============================================================================

#[tokio::test]
async fn forbidden_first_pass_refreshes_once_and_succeeds_on_native_element() {
    let journal = Journal::default();
    let chain = forbidden_chain(&journal)
        .into_iter()
        .map(|s| {
            if s.kind() == BackendKind::NativeElement {
                s.with(FRESH_P1, LoadScript::Load(PlayScript::Finish(Duration::ZERO)))
            } else {
                s
            }
        })
        .collect();
    let h = build(chain, FakeStorage::default(), PlaybackConfig::default());
    let mut rx = h.bus.subscribe();

    let outcome = h
        .coordinator
        .play("expired-url", Some(p1_metadata()))
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Ended);
    assert_eq!(outcome.backend, Some(BackendKind::NativeElement));
    assert!(outcome.refreshed);
    assert_eq!(outcome.url, FRESH_P1);
    assert_eq!(h.storage.paths(), vec!["p1".to_string()]);

    assert_eq!(h.strategy(BackendKind::BufferedStream).loads(), 2);
    assert_eq!(h.strategy(BackendKind::DecodeGraph).loads(), 2);
    assert_eq!(h.strategy(BackendKind::NativeElement).loads(), 2);
    assert_eq!(h.strategy(BackendKind::BlobElement).loads(), 1);

    // Subsequent plays of the line reuse the working clip.
    assert!(h.coordinator.preload_cache().contains(FRESH_P1));
    assert!(!h.coordinator.preload_cache().contains("expired-url"));

    let events = drain_playback_events(&mut rx);
    let passes: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::StrategyFailed { pass, .. } => Some(*pass),
            _ => None,
        })
        .collect();
    assert_eq!(passes, vec![1, 1, 1, 1, 2, 2]);
    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::Completed { refreshed: true, backend, .. } if backend == "native_element"
    )));
}

#[tokio::test]
async fn exhausted_second_pass_fails_with_every_attempt() {
    let journal = Journal::default();
    let h = build(
        forbidden_chain(&journal),
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    let err = h
        .coordinator
        .play("expired-url", Some(p1_metadata()))
        .await
        .unwrap_err();

    match &err {
        PlaybackError::AllStrategiesFailed { url, attempts } => {
            assert_eq!(url, "expired-url");
            assert_eq!(attempts.len(), 8);
            assert!(attempts.iter().all(|a| a.kind == FailureKind::Forbidden));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.storage.calls(), 1);
    assert!(h.coordinator.current_session().is_none());
}

#[tokio::test]
async fn missing_metadata_skips_refresh() {
    let journal = Journal::default();
    let h = build(
        forbidden_chain(&journal),
        FakeStorage::default(),
        PlaybackConfig::default(),
    );
    let partial = PlaybackMetadata {
        storage_path: Some("p1".into()),
        ..PlaybackMetadata::default()
    };

    let err = h
        .coordinator
        .play("expired-url", Some(partial))
        .await
        .unwrap_err();

    assert_eq!(err.attempts().len(), 4);
    assert_eq!(h.storage.calls(), 0);
}

#[tokio::test]
async fn decode_failures_do_not_refresh() {
    let journal = Journal::default();
    let chain = BackendKind::CHAIN
        .iter()
        .map(|kind| {
            FakeStrategy::new(
                *kind,
                LoadScript::Fail(FailureKind::Decode, "unsupported format"),
                journal.clone(),
            )
        })
        .collect();
    let h = build(chain, FakeStorage::default(), PlaybackConfig::default());

    let err = h
        .coordinator
        .play("broken", Some(p1_metadata()))
        .await
        .unwrap_err();

    assert_eq!(err.attempts().len(), 4);
    assert_eq!(h.storage.calls(), 0);
}

#[tokio::test]
async fn storage_failure_during_refresh_fails_play() {
    let journal = Journal::default();
    let h = build(
        forbidden_chain(&journal),
        FakeStorage::failing(),
        PlaybackConfig::default(),
    );

    let err = h
        .coordinator
        .play("expired-url", Some(p1_metadata()))
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::AllStrategiesFailed { .. }));
    assert_eq!(err.attempts().len(), 4);
    assert_eq!(h.storage.calls(), 1);
}

#[tokio::test]
async fn persistence_failure_does_not_fail_play() {
    let journal = Journal::default();
    let chain = forbidden_chain(&journal)
        .into_iter()
        .map(|s| s.with(FRESH_P1, LoadScript::Load(PlayScript::Finish(Duration::ZERO))))
        .collect();
    // No document exists for s1, so the write-back fails.
    let h = build(chain, FakeStorage::default(), PlaybackConfig::default());
    let mut rx = h.bus.subscribe();

    let outcome = h
        .coordinator
        .play("expired-url", Some(p1_metadata()))
        .await
        .unwrap();
    assert_eq!(outcome.state, SessionState::Ended);

    loop {
        match next_link_event(&mut rx).await {
            LinkEvent::PersistFailed {
                script_id,
                line_index,
                ..
            } => {
                assert_eq!(script_id, "s1");
                assert_eq!(line_index, 3);
                break;
            }
            LinkEvent::Persisted { .. } => panic!("persistence should have failed"),
            LinkEvent::Refreshed { .. } => continue,
        }
    }
}

#[tokio::test]
async fn refreshed_link_is_persisted() {
    let journal = Journal::default();
    let chain = forbidden_chain(&journal)
        .into_iter()
        .map(|s| s.with(FRESH_P1, LoadScript::Load(PlayScript::Finish(Duration::ZERO))))
        .collect();
    let h = build(chain, FakeStorage::default(), PlaybackConfig::default());
    h.documents.insert(
        "u1",
        "s1",
        ScriptDocument::new(vec![LineRecord::new(3).with_tts_url("expired-url")]),
    );
    let mut rx = h.bus.subscribe();

    h.coordinator
        .play("expired-url", Some(p1_metadata()))
        .await
        .unwrap();

    assert!(matches!(
        next_link_event(&mut rx).await,
        LinkEvent::Refreshed { ref url, .. } if url == FRESH_P1
    ));
    assert!(matches!(
        next_link_event(&mut rx).await,
        LinkEvent::Persisted { line_index: 3, .. }
    ));
    let doc = h.documents.snapshot("u1", "s1").unwrap();
    assert_eq!(doc.script[0].tts_url.as_deref(), Some(FRESH_P1));
    assert!(doc.script[0].tts_url_refreshed_at.is_some());
}

// ============================================================================
// Cancellation and the single active session
// ============================================================================

#[tokio::test]
async fn stop_during_load_abandons_chain() {
    let journal = Journal::default();
    let h = build(
        vec![
            FakeStrategy::new(BackendKind::BufferedStream, LoadScript::Hang, journal.clone()),
            FakeStrategy::ok(BackendKind::DecodeGraph, journal.clone()),
        ],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    let player = h.coordinator.clone();
    let play = tokio::spawn(async move { player.play("x", None).await });
    wait_for(|| journal.position("load:buffered_stream:x").is_some()).await;

    h.coordinator.stop();
    let outcome = play.await.unwrap().unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.backend, None);
    assert_eq!(h.strategy(BackendKind::DecodeGraph).loads(), 0);
    assert_eq!(
        h.coordinator.session_state(outcome.session),
        Some(SessionState::Cancelled)
    );
}

#[tokio::test]
async fn stop_tears_down_playing_clip() {
    let journal = Journal::default();
    let h = build(
        vec![FakeStrategy::new(
            BackendKind::NativeElement,
            LoadScript::Load(PlayScript::UntilCancelled),
            journal.clone(),
        )],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    let player = h.coordinator.clone();
    let play = tokio::spawn(async move { player.play("x", None).await });
    let probe = h.coordinator.clone();
    wait_for(move || probe.is_playing()).await;

    h.coordinator.stop();
    h.coordinator.stop();
    assert!(!h.coordinator.is_playing());
    assert!(play.await.unwrap().unwrap().is_cancelled());

    wait_for(|| journal.count("release:native_element:x") == 1).await;
    assert_eq!(journal.count("halt:native_element:x"), 1);
}

#[tokio::test]
async fn stop_without_session_is_noop() {
    let journal = Journal::default();
    let h = build(
        vec![FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    h.coordinator.stop();
    assert!(h.coordinator.current_session().is_none());
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn second_play_wins_the_session() {
    let journal = Journal::default();
    let h = build(
        vec![FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())
            .with("a", LoadScript::Load(PlayScript::UntilCancelled))],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    let player = h.coordinator.clone();
    let first = tokio::spawn(async move { player.play("a", None).await });
    let probe = h.coordinator.clone();
    wait_for(move || probe.is_playing()).await;

    let second = h.coordinator.play("b", None).await.unwrap();
    let first = first.await.unwrap().unwrap();

    assert_eq!(first.state, SessionState::Cancelled);
    assert_eq!(second.state, SessionState::Ended);
    assert_eq!(
        h.coordinator.session_state(first.session),
        Some(SessionState::Cancelled)
    );
    assert_eq!(
        h.coordinator.session_state(second.session),
        Some(SessionState::Ended)
    );

    // The first clip was torn down before the second load began.
    let halted = journal.position("halt:buffered_stream:a").unwrap();
    let released = journal.position("release:buffered_stream:a").unwrap();
    let loaded = journal.position("load:buffered_stream:b").unwrap();
    assert!(halted < loaded);
    assert!(released < loaded);
}

#[tokio::test]
async fn concurrent_plays_settle_first_as_cancelled() {
    let journal = Journal::default();
    let h = build(
        vec![
            FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())
                .with_load_delay(Duration::from_millis(20)),
            FakeStrategy::ok(BackendKind::DecodeGraph, journal.clone()),
        ],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    let (a, b) = tokio::join!(h.coordinator.play("a", None), h.coordinator.play("b", None));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.state, SessionState::Cancelled);
    assert_eq!(b.state, SessionState::Ended);
    assert_eq!(journal.count("load:decode_graph:a"), 0);
    assert_eq!(journal.count("play:buffered_stream:a"), 0);
    assert_eq!(h.coordinator.session_state(a.session), Some(SessionState::Cancelled));
    assert_eq!(h.coordinator.session_state(b.session), Some(SessionState::Ended));
}

#[tokio::test]
async fn racing_plays_wait_for_previous_teardown() {
    let journal = Journal::default();
    let h = build(
        vec![FakeStrategy::ok(BackendKind::BufferedStream, journal.clone())
            .with("x", LoadScript::Load(PlayScript::UntilCancelled))],
        FakeStorage::default(),
        PlaybackConfig::default(),
    );

    let player = h.coordinator.clone();
    let playing = tokio::spawn(async move { player.play("x", None).await });
    let watcher = h.coordinator.clone();
    wait_for(move || watcher.is_playing()).await;

    let (a, b) = tokio::join!(h.coordinator.play("a", None), h.coordinator.play("b", None));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(playing.await.unwrap().unwrap().is_cancelled());

    assert_eq!(a.state, SessionState::Cancelled);
    assert_eq!(b.state, SessionState::Ended);
    assert_eq!(journal.count("load:buffered_stream:a"), 0);

    let halted = journal.position("halt:buffered_stream:x").unwrap();
    let released = journal.position("release:buffered_stream:x").unwrap();
    let loaded = journal.position("load:buffered_stream:b").unwrap();
    assert!(halted < loaded);
    assert!(released < loaded);
    assert_eq!(journal.count("halt:buffered_stream:x"), 1);
}

#[tokio::test]
async fn hung_load_times_out_and_chain_moves_on() {
    let journal = Journal::default();
    let h = build(
        vec![
            FakeStrategy::new(BackendKind::BufferedStream, LoadScript::Hang, journal.clone()),
            FakeStrategy::ok(BackendKind::DecodeGraph, journal.clone()),
        ],
        FakeStorage::default(),
        PlaybackConfig::default().with_attempt_timeout(Duration::from_millis(50)),
    );
    let mut rx = h.bus.subscribe();

    let outcome = h.coordinator.play("x", None).await.unwrap();

    assert_eq!(outcome.backend, Some(BackendKind::DecodeGraph));
    assert!(drain_playback_events(&mut rx).iter().any(|e| matches!(
        e,
        PlaybackEvent::StrategyFailed { kind, backend, .. }
            if kind == "timeout" && backend == "buffered_stream"
    )));
}

#[tokio::test]
async fn empty_chain_is_rejected() {
    let result = PlaybackCoordinator::from_parts(
        Vec::new(),
        None,
        Arc::new(ManualClock::default()),
        PlaybackConfig::default(),
        None,
    );
    assert!(matches!(result, Err(PlaybackError::NoBackends(_))));
}

//! Shared fakes for the playback integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::storage::{LocalCacheStore, ObjectStorage};
use bytes::Bytes;
use core_playback::{
    BackendError, BackendKind, BackendResult, BackendStrategy, ClipEnd, FailureKind, LoadedClip,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Ordered record of everything the fakes did, e.g. `load:native_element:a`.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }
}

/// How a fake clip behaves when played.
#[derive(Clone, Debug)]
pub enum PlayScript {
    /// Finish after the given delay.
    Finish(Duration),
    /// Fail immediately.
    Fail(FailureKind, &'static str),
    /// Keep playing until cancelled.
    UntilCancelled,
}

/// How a fake strategy treats one URL.
#[derive(Clone, Debug)]
pub enum LoadScript {
    Load(PlayScript),
    Fail(FailureKind, &'static str),
    /// Never finish loading.
    Hang,
}

pub struct FakeClip {
    backend: BackendKind,
    url: String,
    script: PlayScript,
    journal: Journal,
    released: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl LoadedClip for FakeClip {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    async fn play(&self, cancel: CancellationToken) -> BackendResult<ClipEnd> {
        self.journal.push(format!("play:{}:{}", self.backend, self.url));
        if self.released.load(Ordering::SeqCst) {
            return Err(BackendError::new(self.backend, FailureKind::Other, "released"));
        }
        match &self.script {
            PlayScript::Finish(after) => {
                tokio::select! {
                    _ = cancel.cancelled() => Ok(ClipEnd::Cancelled),
                    _ = tokio::time::sleep(*after) => Ok(ClipEnd::Finished),
                }
            }
            PlayScript::Fail(kind, message) => {
                Err(BackendError::new(self.backend, *kind, *message))
            }
            PlayScript::UntilCancelled => {
                cancel.cancelled().await;
                Ok(ClipEnd::Cancelled)
            }
        }
    }

    async fn halt(&self) {
        self.journal.push(format!("halt:{}:{}", self.backend, self.url));
    }

    async fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.journal
                .push(format!("release:{}:{}", self.backend, self.url));
        }
    }
}

/// Strategy whose behavior is scripted per URL.
pub struct FakeStrategy {
    kind: BackendKind,
    scripts: Mutex<HashMap<String, LoadScript>>,
    fallback: LoadScript,
    load_delay: Duration,
    loads: AtomicUsize,
    journal: Journal,
}

impl FakeStrategy {
    pub fn new(kind: BackendKind, fallback: LoadScript, journal: Journal) -> Self {
        Self {
            kind,
            scripts: Mutex::new(HashMap::new()),
            fallback,
            load_delay: Duration::from_millis(1),
            loads: AtomicUsize::new(0),
            journal,
        }
    }

    pub fn ok(kind: BackendKind, journal: Journal) -> Self {
        Self::new(kind, LoadScript::Load(PlayScript::Finish(Duration::ZERO)), journal)
    }

    pub fn with(self, url: &str, script: LoadScript) -> Self {
        self.scripts.lock().insert(url.to_string(), script);
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendStrategy for FakeStrategy {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn load(&self, url: &str) -> BackendResult<Arc<dyn LoadedClip>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.journal.push(format!("load:{}:{}", self.kind, url));
        tokio::time::sleep(self.load_delay).await;

        let script = self
            .scripts
            .lock()
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());

        match script {
            LoadScript::Load(play) => Ok(Arc::new(FakeClip {
                backend: self.kind,
                url: url.to_string(),
                script: play,
                journal: self.journal.clone(),
                released: std::sync::atomic::AtomicBool::new(false),
            })),
            LoadScript::Fail(kind, message) => Err(BackendError::new(self.kind, kind, message)),
            LoadScript::Hang => std::future::pending().await,
        }
    }
}

/// Object storage minting `https://fresh.test/<path>?v=<n>`.
#[derive(Default)]
pub struct FakeStorage {
    calls: AtomicUsize,
    paths: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn get_download_url(&self, storage_path: &str) -> BridgeResult<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.paths.lock().push(storage_path.to_string());
        if self.fail {
            return Err(BridgeError::NotFound(storage_path.to_string()));
        }
        Ok(format!("https://fresh.test/{}?v={}", storage_path, n))
    }
}

/// Local cache store kept in memory.
#[derive(Default)]
pub struct MemoryCacheStore {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl LocalCacheStore for MemoryCacheStore {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// 16-bit mono PCM WAV file.
pub fn wav_bytes(sample_rate: u32, samples: &[i16]) -> Bytes {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    Bytes::from(out)
}

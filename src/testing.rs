//! In-memory collaborators for unit tests.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{
        atomic::{AtomicU32, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use image::{Rgb, RgbImage};
use serde_json::Value;

use crate::{
    error::{CaptureError, InferenceError, PersistError},
    export::{DocumentId, DocumentStore},
    models::RawPrediction,
    sensing::{Classifier, Frame, FrameSource},
};

#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.documents
            .lock()
            .unwrap()
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
    }

    fn put(&self, collection: &str, key: &str, document: Value) -> DocumentId {
        self.documents
            .lock()
            .unwrap()
            .insert((collection.to_string(), key.to_string()), document);
        DocumentId {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn upsert(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> impl Future<Output = Result<DocumentId, PersistError>> + Send {
        let id = self.put(collection, key, document);
        async move { Ok(id) }
    }
}

/// Reports `Unreachable` for the first `n` calls, then behaves like `MemoryStore`.
pub struct FlakyStore {
    inner: MemoryStore,
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl FlakyStore {
    pub fn failing_times(n: u32) -> Self {
        Self {
            inner: MemoryStore::default(),
            failures_left: AtomicU32::new(n),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentStore for FlakyStore {
    fn upsert(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> impl Future<Output = Result<DocumentId, PersistError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        let outcome = if failed {
            Err(PersistError::Unreachable("network down".into()))
        } else {
            Ok(self.inner.put(collection, key, document))
        };
        async move { outcome }
    }
}

/// Plays back queued answers, then repeats `fallback` forever.
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<Vec<RawPrediction>, InferenceError>>>,
    fallback: Vec<RawPrediction>,
}

impl ScriptedClassifier {
    pub fn new(
        script: Vec<Result<Vec<RawPrediction>, InferenceError>>,
        fallback: Vec<RawPrediction>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
        }
    }

    pub fn repeating(frame: Vec<RawPrediction>) -> Self {
        Self::new(Vec::new(), frame)
    }
}

impl Classifier for ScriptedClassifier {
    fn predict(&self, _frame: &Frame) -> Result<Vec<RawPrediction>, InferenceError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Sleeps on every call and records how many calls overlapped.
pub struct SlowClassifier {
    delay: Duration,
    frame: Vec<RawPrediction>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowClassifier {
    pub fn new(delay: Duration, frame: Vec<RawPrediction>) -> Self {
        Self {
            delay,
            frame,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Classifier for SlowClassifier {
    fn predict(&self, _frame: &Frame) -> Result<Vec<RawPrediction>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        std::thread::sleep(self.delay);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.frame.clone())
    }
}

/// Hands out a tiny solid frame once started.
pub struct StaticFrameSource {
    started: bool,
    broken: bool,
    unavailable_for: u32,
}

impl StaticFrameSource {
    pub fn new() -> Self {
        Self {
            started: false,
            broken: false,
            unavailable_for: 0,
        }
    }

    pub fn started() -> Self {
        Self {
            started: true,
            ..Self::new()
        }
    }

    /// A camera that refuses to open.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new()
        }
    }

    pub fn unavailable_for(mut self, frames: u32) -> Self {
        self.unavailable_for = frames;
        self
    }
}

impl FrameSource for StaticFrameSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.broken {
            return Err(CaptureError::Unavailable("no camera attached".into()));
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        if !self.started {
            return Err(CaptureError::NotStarted);
        }
        if self.unavailable_for > 0 {
            self.unavailable_for -= 1;
            return Err(CaptureError::Unavailable("camera warming up".into()));
        }
        Ok(RgbImage::from_pixel(2, 2, Rgb([128, 128, 128])))
    }
}

//! Lazily-populated cache of anchor vectors.
//!
//! The first call to [`AnchorCache::load`] fans out one embedding request per
//! example utterance. Each request runs as its own task; a shared pending
//! counter flips the readiness flag once every attempt has finished, whether
//! it succeeded or not. Vectors are never mutated after insertion.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use parley_core::error::{ParleyError, Result};
use parley_core::types::IntentKind;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::catalogue::{prepare_keywords, AnchorDefinition};
use crate::embedding::DynEmbeddingService;

/// Loaded vectors and gating keywords for one intent.
#[derive(Debug, Clone)]
pub struct AnchorSet {
    pub intent: IntentKind,
    pub positive_vectors: Vec<Vec<f32>>,
    pub negative_vectors: Vec<Vec<f32>>,
    pub required_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub ambiguous_keywords: Vec<String>,
}

impl AnchorSet {
    fn from_definition(def: &AnchorDefinition) -> Self {
        Self {
            intent: def.intent,
            positive_vectors: Vec::with_capacity(def.positive_examples.len()),
            negative_vectors: Vec::with_capacity(def.negative_examples.len()),
            required_keywords: prepare_keywords(&def.required_keywords),
            negative_keywords: prepare_keywords(&def.negative_keywords),
            ambiguous_keywords: prepare_keywords(&def.ambiguous_keywords),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Positive,
    Negative,
}

struct CacheInner {
    embedder: Arc<dyn DynEmbeddingService>,
    definitions: Vec<AnchorDefinition>,
    sets: RwLock<BTreeMap<IntentKind, AnchorSet>>,
    started: AtomicBool,
    pending: AtomicUsize,
    loaded: AtomicUsize,
    failed: AtomicUsize,
    ready: watch::Sender<bool>,
}

impl CacheInner {
    fn insert(&self, intent: IntentKind, polarity: Polarity, vector: Vec<f32>) {
        let mut sets = self.sets.write().unwrap_or_else(|e| e.into_inner());
        if let Some(set) = sets.get_mut(&intent) {
            match polarity {
                Polarity::Positive => set.positive_vectors.push(vector),
                Polarity::Negative => set.negative_vectors.push(vector),
            }
        }
    }

    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.ready.send_replace(true);
            info!(
                loaded = self.loaded.load(Ordering::Relaxed),
                failed = self.failed.load(Ordering::Relaxed),
                "Anchor cache ready"
            );
        }
    }
}

/// Shared, cheaply clonable anchor cache with an injected embedding client.
#[derive(Clone)]
pub struct AnchorCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for AnchorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorCache")
            .field("definitions", &self.inner.definitions.len())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl AnchorCache {
    pub fn new(embedder: Arc<dyn DynEmbeddingService>, definitions: Vec<AnchorDefinition>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(CacheInner {
                embedder,
                definitions,
                sets: RwLock::new(BTreeMap::new()),
                started: AtomicBool::new(false),
                pending: AtomicUsize::new(0),
                loaded: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                ready,
            }),
        }
    }

    /// The embedding client used for anchors; queries must use the same one.
    pub fn embedder(&self) -> &Arc<dyn DynEmbeddingService> {
        &self.inner.embedder
    }

    /// Start loading every anchor vector. Only the first call does any work.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load(&self) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| ParleyError::Config(format!("anchor loading needs a runtime: {}", e)))?;

        if self.inner.started.swap(true, Ordering::AcqRel) {
            debug!("Anchor cache load already started");
            return Ok(());
        }

        let total: usize = self
            .inner
            .definitions
            .iter()
            .map(AnchorDefinition::example_count)
            .sum();

        {
            let mut sets = self.inner.sets.write().unwrap_or_else(|e| e.into_inner());
            for def in &self.inner.definitions {
                sets.insert(def.intent, AnchorSet::from_definition(def));
            }
        }

        if total == 0 {
            self.inner.ready.send_replace(true);
            return Ok(());
        }

        self.inner.pending.store(total, Ordering::Release);
        info!(examples = total, "Loading anchor vectors");

        for def in &self.inner.definitions {
            let examples = def
                .positive_examples
                .iter()
                .map(|t| (t, Polarity::Positive))
                .chain(def.negative_examples.iter().map(|t| (t, Polarity::Negative)));

            for (text, polarity) in examples {
                let inner = Arc::clone(&self.inner);
                let intent = def.intent;
                let text = text.clone();
                handle.spawn(async move {
                    match inner.embedder.embed_boxed(&text).await {
                        Ok(vector) => {
                            inner.insert(intent, polarity, vector);
                            inner.loaded.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            inner.failed.fetch_add(1, Ordering::Relaxed);
                            warn!(intent = %intent, example = %text, error = %e, "Anchor embedding failed");
                        }
                    }
                    inner.finish_one();
                });
            }
        }
        Ok(())
    }

    /// Start loading (if needed) and wait until every attempt has completed.
    pub async fn load_and_wait(&self) -> Result<()> {
        self.load()?;
        self.wait_ready().await;
        Ok(())
    }

    /// True once every anchor fetch has completed.
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Wait for the cache to become ready. Returns immediately if it already is.
    pub async fn wait_ready(&self) {
        let mut rx = self.inner.ready.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Number of examples that produced a vector.
    pub fn loaded_count(&self) -> usize {
        self.inner.loaded.load(Ordering::Relaxed)
    }

    /// Number of examples whose embedding request failed.
    pub fn failed_count(&self) -> usize {
        self.inner.failed.load(Ordering::Relaxed)
    }

    /// Read access to the loaded sets, keyed by intent.
    pub fn sets(&self) -> RwLockReadGuard<'_, BTreeMap<IntentKind, AnchorSet>> {
        self.inner.sets.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Owned copy of the loaded sets.
    pub fn snapshot(&self) -> Vec<AnchorSet> {
        self.sets().values().cloned().collect()
    }
}

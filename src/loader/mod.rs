//! Progressive batch loading.
//!
//! The [`BatchLoader`] pulls developer batches from a [`DataSource`] into the
//! shared [`DeveloperStore`] and remembers which batch indices it has merged.
//!
//! # Loading rules
//!
//! - Batches are fetched one at a time in ascending index order, with a pacing
//!   delay between consecutive fetches. Indices are never skipped: a batch that
//!   failed earlier is retried the next time a larger target is requested.
//! - Merging is first-write-wins; see [`DeveloperStore::insert_if_absent`].
//! - When a batch is *not found* and nothing has been loaded yet, the loader
//!   makes a single attempt at the consolidated file and, if that works, treats
//!   it as a complete substitute for the batch system. Further requests are
//!   then no-ops.
//! - Any other failure is logged and the batch is skipped.
//!
//! # Zoom-driven expansion
//!
//! [`LoaderSettings::target_for_zoom`] maps a map zoom level to a batch count:
//! nothing below `min_zoom`, then `batches_per_zoom_level` more batches for each
//! whole zoom level above it, capped by `max_batches` and by the index's
//! `total_batches`.

use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::constants;
use crate::core::DevmapError;
use crate::models::BatchIndex;
use crate::source::DataSource;
use crate::store::DeveloperStore;

/// Tuning knobs for batch loading.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    /// Batches fetched by the initial load.
    pub initial_batches: u32,
    /// Zoom level below which no extra batches are loaded.
    pub min_zoom: f64,
    /// Extra batches per whole zoom level at or above `min_zoom`.
    pub batches_per_zoom_level: u32,
    /// Hard ceiling on the number of batches.
    pub max_batches: u32,
    /// Pause between consecutive batch fetches.
    pub batch_delay: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            initial_batches: constants::INITIAL_BATCHES,
            min_zoom: constants::MIN_EXPANSION_ZOOM,
            batches_per_zoom_level: constants::BATCHES_PER_ZOOM_LEVEL,
            max_batches: constants::MAX_BATCHES,
            batch_delay: constants::BATCH_PACING_DELAY,
        }
    }
}

impl LoaderSettings {
    /// Target batch count for `zoom`, or `None` below the expansion threshold.
    ///
    /// The result never decreases as `zoom` grows.
    #[must_use]
    pub fn target_for_zoom(&self, zoom: f64, total_batches: Option<u32>) -> Option<u32> {
        if !zoom.is_finite() || zoom < self.min_zoom {
            return None;
        }

        let levels = (zoom - self.min_zoom).floor() as u32 + 1;
        let target = self
            .initial_batches
            .saturating_add(levels.saturating_mul(self.batches_per_zoom_level))
            .min(self.max_batches);

        Some(total_batches.map_or(target, |total| target.min(total)))
    }
}

/// What a call to the loader did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Batch indices fetched and merged, in fetch order.
    pub loaded: Vec<u32>,
    /// Batch indices whose fetch failed and were skipped.
    pub failed: Vec<u32>,
    /// Developers newly added to the store.
    pub added: usize,
    /// Whether the consolidated file replaced the batch system during this call.
    pub used_fallback: bool,
}

#[derive(Debug, Default)]
struct LoaderState {
    loaded: BTreeSet<u32>,
    index: Option<BatchIndex>,
    consolidated: bool,
    fallback_attempted: bool,
    fetches: u64,
    /// Bumped by [`BatchLoader::reset`]; results fetched under an older
    /// generation are discarded.
    generation: u64,
}

enum BatchOutcome {
    AlreadyLoaded,
    Loaded(usize),
    Fallback(usize),
    NotFound,
    Failed,
    Stale,
}

/// Fetches batches into a [`DeveloperStore`]; see the module documentation.
///
/// Fetches are serialized by their own lock. The bookkeeping lock is only held
/// between awaits, so counts and [`BatchLoader::reset`] never wait on a slow
/// source.
pub struct BatchLoader<S> {
    source: S,
    settings: LoaderSettings,
    fetch_lock: Mutex<()>,
    state: Mutex<LoaderState>,
}

impl<S: DataSource> BatchLoader<S> {
    pub fn new(source: S, settings: LoaderSettings) -> Self {
        Self {
            source,
            settings,
            fetch_lock: Mutex::new(()),
            state: Mutex::new(LoaderState::default()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the batch index; a failure is logged and leaves the total unknown.
    pub async fn load_index(&self) -> Option<BatchIndex> {
        let generation = self.state.lock().await.generation;
        match self.source.fetch_index().await {
            Ok(index) => {
                info!(
                    "Batch index: {} developers in {} batches",
                    index.total_developers, index.total_batches
                );
                let mut state = self.state.lock().await;
                if state.generation == generation {
                    state.index = Some(index.clone());
                }
                Some(index)
            }
            Err(e) => {
                warn!("Could not load batch index from {}: {}", self.source.location(), e);
                None
            }
        }
    }

    /// Load a single batch (no-op when already loaded).
    pub async fn load_batch(&self, index: u32, store: &RwLock<DeveloperStore>) -> LoadReport {
        let _fetching = self.fetch_lock.lock().await;
        let mut report = LoadReport::default();
        if self.using_consolidated().await {
            return report;
        }

        let outcome = self.fetch_one(index, store).await;
        record(&mut report, index, outcome);
        report
    }

    /// Make sure batches `0..target` are loaded (capped by the index total).
    pub async fn ensure_loaded(&self, target: u32, store: &RwLock<DeveloperStore>) -> LoadReport {
        let _fetching = self.fetch_lock.lock().await;
        let mut report = LoadReport::default();

        let target = {
            let state = self.state.lock().await;
            if state.consolidated {
                debug!("Consolidated data in use; ignoring request for {} batches", target);
                return report;
            }
            match &state.index {
                Some(index) => target.min(index.total_batches),
                None => target,
            }
        };

        for n in 0..target {
            let outcome = self.fetch_one(n, store).await;
            let stop = match outcome {
                BatchOutcome::Fallback(_) | BatchOutcome::Stale => true,
                // Without an index a missing batch marks the end of the data.
                BatchOutcome::NotFound => self.total_batches().await.is_none(),
                _ => false,
            };
            record(&mut report, n, outcome);
            if stop {
                break;
            }
        }

        if !report.loaded.is_empty() || report.used_fallback {
            info!(
                "Loaded {} batch(es), {} new developer(s); {} batch(es) in memory",
                report.loaded.len(),
                report.added,
                self.loaded_count().await
            );
        }
        report
    }

    /// Load whatever `zoom` calls for; nothing below the expansion threshold.
    pub async fn load_for_zoom(&self, zoom: f64, store: &RwLock<DeveloperStore>) -> LoadReport {
        let total = self.total_batches().await;
        match self.settings.target_for_zoom(zoom, total) {
            Some(target) => self.ensure_loaded(target, store).await,
            None => {
                debug!("Zoom {} is below {}; not expanding", zoom, self.settings.min_zoom);
                LoadReport::default()
            }
        }
    }

    /// Index plus the initial batches.
    ///
    /// Fails with [`DevmapError::NoDevelopers`] when neither the batches nor the
    /// consolidated file produce a single developer.
    pub async fn initial_load(&self, store: &RwLock<DeveloperStore>) -> Result<LoadReport, DevmapError> {
        self.load_index().await;
        let mut report = self.ensure_loaded(self.settings.initial_batches, store).await;

        if store.read().await.is_empty() {
            let _fetching = self.fetch_lock.lock().await;
            let attempted = self.state.lock().await.fallback_attempted;
            if !attempted {
                if let Some(added) = self.fallback(store).await {
                    report.added += added;
                    report.used_fallback = true;
                }
            }
        }

        if store.read().await.is_empty() {
            return Err(DevmapError::NoDevelopers {
                source_location: self.source.location(),
            });
        }
        Ok(report)
    }

    /// Forget every loaded batch and the index.
    ///
    /// Does not wait for a fetch in flight; its result is dropped when it lands.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        let generation = state.generation + 1;
        *state = LoaderState {
            generation,
            ..LoaderState::default()
        };
    }

    /// Number of batches merged so far.
    pub async fn loaded_count(&self) -> usize {
        self.state.lock().await.loaded.len()
    }

    /// Batch indices merged so far, ascending.
    pub async fn loaded_batches(&self) -> Vec<u32> {
        self.state.lock().await.loaded.iter().copied().collect()
    }

    /// Total batches reported by the index, if it was loaded.
    pub async fn total_batches(&self) -> Option<u32> {
        self.state.lock().await.index.as_ref().map(|index| index.total_batches)
    }

    /// Whether the consolidated file replaced the batch system.
    pub async fn using_consolidated(&self) -> bool {
        self.state.lock().await.consolidated
    }

    /// Caller holds `fetch_lock`.
    async fn fetch_one(&self, index: u32, store: &RwLock<DeveloperStore>) -> BatchOutcome {
        let (generation, pace, filename) = {
            let mut state = self.state.lock().await;
            if state.loaded.contains(&index) {
                return BatchOutcome::AlreadyLoaded;
            }
            let pace = state.fetches > 0;
            state.fetches += 1;
            let filename = state.index.as_ref().and_then(|i| i.filename_for(index)).map(str::to_string);
            (state.generation, pace, filename)
        };

        if pace && !self.settings.batch_delay.is_zero() {
            tokio::time::sleep(self.settings.batch_delay).await;
        }
        debug!("Fetching batch {}", index);

        let fetched = self.source.fetch_batch(index, filename.as_deref()).await;

        let (current, may_fall_back) = {
            let state = self.state.lock().await;
            (state.generation, state.loaded.is_empty() && !state.fallback_attempted)
        };
        if current != generation {
            debug!("Discarding batch {} fetched before a reset", index);
            return BatchOutcome::Stale;
        }

        match fetched {
            Ok(batch) => {
                if batch.batch_index != index {
                    debug!("Batch file {} reports index {}", index, batch.batch_index);
                }
                let count = batch.developers.len();
                // Store before state, the order readers take them in.
                let mut store = store.write().await;
                let mut state = self.state.lock().await;
                if state.generation != generation {
                    return BatchOutcome::Stale;
                }
                let added = store.merge(batch.developers);
                state.loaded.insert(index);
                debug!("Batch {}: {} developer(s), {} new", index, count, added);
                BatchOutcome::Loaded(added)
            }
            Err(e) if e.is_not_found() && may_fall_back => {
                warn!("Batch {} not found, trying consolidated data: {}", index, e);
                match self.fallback(store).await {
                    Some(added) => BatchOutcome::Fallback(added),
                    None => BatchOutcome::NotFound,
                }
            }
            Err(e) if e.is_not_found() => {
                debug!("Batch {} not found: {}", index, e);
                BatchOutcome::NotFound
            }
            Err(e) => {
                warn!("Skipping batch {}: {}", index, e);
                BatchOutcome::Failed
            }
        }
    }

    /// Caller holds `fetch_lock`.
    async fn fallback(&self, store: &RwLock<DeveloperStore>) -> Option<usize> {
        let generation = {
            let mut state = self.state.lock().await;
            state.fallback_attempted = true;
            state.generation
        };

        match self.source.fetch_consolidated().await {
            Ok(developers) => {
                let mut store = store.write().await;
                let mut state = self.state.lock().await;
                if state.generation != generation {
                    debug!("Discarding consolidated data fetched before a reset");
                    return None;
                }
                let added = store.merge(developers);
                state.consolidated = true;
                info!("Loaded {} developer(s) from consolidated data", added);
                Some(added)
            }
            Err(e) => {
                warn!("Consolidated data unavailable at {}: {}", self.source.location(), e);
                None
            }
        }
    }
}

fn record(report: &mut LoadReport, index: u32, outcome: BatchOutcome) {
    match outcome {
        BatchOutcome::AlreadyLoaded | BatchOutcome::Stale => {}
        BatchOutcome::Loaded(added) => {
            report.loaded.push(index);
            report.added += added;
        }
        BatchOutcome::Fallback(added) => {
            report.added += added;
            report.used_fallback = true;
        }
        BatchOutcome::NotFound | BatchOutcome::Failed => report.failed.push(index),
    }
}

//! Trending carousel
//!
//! A bounded random sample of the catalog shown three at a time. The window
//! starts at a rotating index and wraps around the sequence; the middle slot
//! is the highlighted one. A background timer advances the index while the
//! sequence holds at least three entries.

use crate::catalog::CatalogStore;
use crate::client::DirectoryService;
use crate::config::TrendingConfig;
use crate::error::Result;
use crate::lock::lock;
use crate::types::{Expert, TrendingDomain};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Slots visible at once
pub const WINDOW_SIZE: usize = 3;
/// Slot offset of the highlighted entry
pub const HIGHLIGHT_OFFSET: usize = 1;

/// One visible carousel slot
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSlot<T> {
    pub item: T,
    pub highlighted: bool,
}

struct Rotation<T> {
    items: Vec<T>,
    start: usize,
    /// Bumped on every load; a timer only advances the rotation it was started for
    generation: u64,
}

impl<T> Rotation<T> {
    /// Rotation only moves while the sequence fills the window
    fn advance(&mut self) {
        if self.items.len() >= WINDOW_SIZE {
            self.start = (self.start + 1) % self.items.len();
        }
    }
}

pub struct TrendingRotator<T> {
    rotation: Arc<Mutex<Rotation<T>>>,
    tick_interval: Duration,
    sequence_limit: usize,
    rng: Mutex<StdRng>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<T> TrendingRotator<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(config: &TrendingConfig) -> Self {
        Self {
            rotation: Arc::new(Mutex::new(Rotation {
                items: Vec::new(),
                start: 0,
                generation: 0,
            })),
            tick_interval: config.tick_interval(),
            sequence_limit: config.sequence_limit,
            rng: Mutex::new(StdRng::from_entropy()),
            ticker: Mutex::new(None),
        }
    }

    /// Fix the shuffle seed, for reproducible sequences
    pub fn with_seed(self, seed: u64) -> Self {
        *lock(&self.rng) = StdRng::seed_from_u64(seed);
        self
    }

    /// Replace the sequence with a shuffled sample of `items`
    ///
    /// Resets the rotation to the first entry and restarts the timer. Must be
    /// called from within a tokio runtime for the timer to start.
    pub fn load(&self, mut items: Vec<T>) {
        items.shuffle(&mut *lock(&self.rng));
        items.truncate(self.sequence_limit);

        let (len, generation) = {
            let mut rotation = lock(&self.rotation);
            rotation.items = items;
            rotation.start = 0;
            rotation.generation += 1;
            (rotation.items.len(), rotation.generation)
        };
        debug!(len, generation, "Trending sequence loaded");

        self.stop();
        if len >= WINDOW_SIZE {
            self.spawn_ticker(generation);
        }
    }

    /// Advance the rotation by one; a no-op below three entries
    pub fn tick(&self) {
        lock(&self.rotation).advance();
    }

    /// The visible slots, wrapping around the sequence
    ///
    /// Empty when the sequence is empty. Shorter sequences repeat entries.
    pub fn window(&self) -> Vec<WindowSlot<T>> {
        let rotation = lock(&self.rotation);
        let len = rotation.items.len();
        if len == 0 {
            return Vec::new();
        }
        (0..WINDOW_SIZE)
            .map(|k| WindowSlot {
                item: rotation.items[(rotation.start + k) % len].clone(),
                highlighted: k == HIGHLIGHT_OFFSET,
            })
            .collect()
    }

    /// The highlighted entry
    pub fn highlighted(&self) -> Option<T> {
        self.window()
            .into_iter()
            .find(|slot| slot.highlighted)
            .map(|slot| slot.item)
    }

    pub fn items(&self) -> Vec<T> {
        lock(&self.rotation).items.clone()
    }

    pub fn start_index(&self) -> usize {
        lock(&self.rotation).start
    }

    pub fn len(&self) -> usize {
        lock(&self.rotation).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        lock(&self.ticker)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Resume the timer for the current sequence if it is not running
    pub fn start(&self) {
        if self.is_running() {
            return;
        }
        let (len, generation) = {
            let rotation = lock(&self.rotation);
            (rotation.items.len(), rotation.generation)
        };
        if len >= WINDOW_SIZE {
            self.spawn_ticker(generation);
            debug!(len, "Trending timer started");
        }
    }

    /// Cancel the timer; the rotation stays where it is
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
            debug!("Trending timer stopped");
        }
    }

    fn spawn_ticker(&self, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime available, trending timer not started");
            return;
        };
        let rotation = Arc::clone(&self.rotation);
        let period = self.tick_interval;

        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let current = {
                    let mut rotation = lock(&rotation);
                    let current = rotation.generation == generation;
                    if current {
                        rotation.advance();
                    }
                    current
                };
                if !current {
                    break;
                }
            }
        });
        *lock(&self.ticker) = Some(handle);
    }
}

impl TrendingRotator<Expert> {
    /// Load the sequence from the session catalog
    pub async fn load_from_catalog(
        &self,
        catalog: &CatalogStore,
        service: &dyn DirectoryService,
    ) -> Result<()> {
        let experts = catalog.ensure_loaded(service).await?;
        self.load(experts.as_ref().clone());
        info!(len = self.len(), "Trending experts ready");
        Ok(())
    }
}

impl<T> Drop for TrendingRotator<T> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }
    }
}

/// Fetch the trending domain list; a failure yields an empty list
pub async fn load_trending_domains(service: &dyn DirectoryService) -> Vec<TrendingDomain> {
    match service.trending_domains().await {
        Ok(domains) => {
            debug!(count = domains.len(), "Trending domains loaded");
            domains
        }
        Err(e) => {
            warn!(error = %e, "Failed to load trending domains");
            Vec::new()
        }
    }
}

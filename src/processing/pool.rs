//! Shared codec pool lifecycle.
//!
//! One engine pool is shared by every in-flight file. It is created on the
//! first [`ResourcePoolManager::acquire`], kept alive while any [`PoolLease`]
//! exists, and closed once no lease has been held for the idle timeout. A new
//! acquire after teardown creates a fresh pool.
//!
//! The reference count, the handle and the teardown timer live behind one
//! mutex that is never held across an await. A timer only tears down if, when
//! it fires, the count is still zero and no newer timer has been armed since.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::PipelineConfig;
use crate::engine::{CodecEngine, EnginePool};
use crate::processing::defaults::DefaultEncodeOptions;
use crate::utils::EngineResult;

#[derive(Default)]
struct PoolState {
    handle: Option<Arc<dyn EnginePool>>,
    ref_count: usize,
    teardown: Option<JoinHandle<()>>,
    // Bumped on every acquire and every arm; a timer holding an older value is stale.
    epoch: u64,
}

impl PoolState {
    fn cancel_teardown(&mut self) {
        if let Some(timer) = self.teardown.take() {
            timer.abort();
        }
        self.epoch += 1;
    }
}

struct ManagerInner {
    engine: Arc<dyn CodecEngine>,
    defaults: DefaultEncodeOptions,
    workers: usize,
    idle_timeout: Duration,
    max_concurrent_files: usize,
    state: Mutex<PoolState>,
}

/// Owns the shared engine pool. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct ResourcePoolManager {
    inner: Arc<ManagerInner>,
}

impl ResourcePoolManager {
    /// Creates a manager; the engine's encoder list is read here, once.
    pub fn new(engine: Arc<dyn CodecEngine>, config: &PipelineConfig) -> Self {
        let defaults = DefaultEncodeOptions::from_encoders(&engine.encoders());
        let workers = config.pool_workers();
        debug!(
            "Pool manager ready ({} workers, idle timeout {:?}, formats: {})",
            workers,
            config.idle_timeout(),
            defaults.extensions().collect::<Vec<_>>().join(" ")
        );

        Self {
            inner: Arc::new(ManagerInner {
                engine,
                defaults,
                workers,
                idle_timeout: config.idle_timeout(),
                max_concurrent_files: config.max_concurrent_files(),
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Default encoder table derived from the engine.
    pub fn default_options(&self) -> &DefaultEncodeOptions {
        &self.inner.defaults
    }

    /// File concurrency configured alongside this pool; the default cap of
    /// transformers built on this manager.
    pub fn max_concurrent_files(&self) -> usize {
        self.inner.max_concurrent_files
    }

    /// Takes a reference on the shared pool, creating it if absent.
    ///
    /// Cancels any pending teardown. On creation failure nothing is retained
    /// and the next call tries again.
    pub fn acquire(&self) -> EngineResult<PoolLease> {
        let mut state = self.inner.state.lock();
        state.cancel_teardown();

        let pool = match state.handle.clone() {
            Some(pool) => pool,
            None => {
                let pool = self.inner.engine.create_pool(self.inner.workers)?;
                info!("Codec pool created with {} workers", self.inner.workers);
                state.handle = Some(Arc::clone(&pool));
                pool
            }
        };
        state.ref_count += 1;
        debug!("Pool acquired (references: {})", state.ref_count);

        Ok(PoolLease {
            manager: self.clone(),
            pool,
            released: false,
        })
    }

    fn release(&self) {
        let mut state = self.inner.state.lock();
        debug_assert!(state.ref_count > 0, "pool released more often than acquired");
        state.ref_count = state.ref_count.saturating_sub(1);
        debug!("Pool released (references: {})", state.ref_count);

        if state.ref_count == 0 {
            self.arm_teardown(&mut state);
        }
    }

    fn arm_teardown(&self, state: &mut PoolState) {
        state.cancel_teardown();
        let epoch = state.epoch;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // No runtime to run the timer or the async close on.
            if state.handle.take().is_some() {
                warn!("No async runtime at pool release; dropping codec pool without close");
            }
            return;
        };

        let manager = self.clone();
        let idle_timeout = self.inner.idle_timeout;
        state.teardown = Some(runtime.spawn(async move {
            tokio::time::sleep(idle_timeout).await;
            manager.teardown_if_idle(Some(epoch)).await;
        }));
    }

    /// Closes the pool if it is still idle. `epoch` ties a timer to the state
    /// it was armed in; `None` tears down regardless of pending timers.
    async fn teardown_if_idle(&self, epoch: Option<u64>) {
        let pool = {
            let mut state = self.inner.state.lock();
            if state.ref_count > 0 || epoch.is_some_and(|armed| armed != state.epoch) {
                return;
            }
            if epoch.is_some() {
                // This task is the armed timer; forget its handle before closing
                // so a later acquire cannot abort the close midway.
                state.teardown = None;
            } else {
                state.cancel_teardown();
            }
            state.ref_count = 0;
            state.handle.take()
        };

        if let Some(pool) = pool {
            match pool.close().await {
                Ok(()) => info!("Codec pool closed after idle timeout"),
                Err(e) => warn!("Codec pool close failed: {}", e),
            }
        }
    }

    /// Tears the pool down now if no lease is held.
    pub async fn flush(&self) {
        self.teardown_if_idle(None).await;
    }

    /// Number of leases currently held.
    pub fn ref_count(&self) -> usize {
        self.inner.state.lock().ref_count
    }

    /// Whether an engine pool currently exists.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().handle.is_some()
    }
}

impl fmt::Debug for ResourcePoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ResourcePoolManager")
            .field("workers", &self.inner.workers)
            .field("idle_timeout", &self.inner.idle_timeout)
            .field("active", &state.handle.is_some())
            .field("ref_count", &state.ref_count)
            .finish()
    }
}

/// A reference on the shared pool. Released exactly once: explicitly via
/// [`release`](Self::release) or when dropped.
pub struct PoolLease {
    manager: ResourcePoolManager,
    pool: Arc<dyn EnginePool>,
    released: bool,
}

impl PoolLease {
    pub fn pool(&self) -> &dyn EnginePool {
        self.pool.as_ref()
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.manager.release();
        }
    }
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.release_once();
    }
}

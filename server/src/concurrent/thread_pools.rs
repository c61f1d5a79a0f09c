// zone_engine_core/server/src/concurrent/thread_pools.rs
use crate::core::config::ThreadPoolConfig;
use crate::core::error::{ServerError, ServerResult};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::{info, warn};

/// Worker pools used by the tick. Zone-parallel work runs on `simulation_pool`.
pub struct ThreadPoolSystem {
    pub simulation_pool: Arc<ThreadPool>,
}

impl ThreadPoolSystem {
    pub fn new(config: &ThreadPoolConfig) -> ServerResult<Self> {
        let simulation_pool = Self::create_pool("simulation", config.simulation_threads)?;
        info!("Simulation pool ready with {} threads", simulation_pool.current_num_threads());
        Ok(ThreadPoolSystem { simulation_pool: Arc::new(simulation_pool) })
    }

    fn create_pool(name_str: &str, num_threads: usize) -> ServerResult<ThreadPool> {
        let name_for_thread_name = name_str.to_string();
        let num_threads = if num_threads == 0 {
            warn!("Thread pool '{}' configured with 0 threads. Creating a minimal pool.", name_str);
            1
        } else {
            num_threads
        };

        ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |i| format!("{}-{}", name_for_thread_name, i))
            .build()
            .map_err(|e| ServerError::Internal(format!("Failed to build {} pool: {}", name_str, e)))
    }
}

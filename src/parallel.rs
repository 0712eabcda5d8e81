//! Parallel processing configuration
//!
//! Element-wise physics and frame rendering run on Rayon's global pool; this
//! module sizes that pool from the `--threads` flag.

use crate::errors::{PapaError, Result};
use rayon::ThreadPoolBuilder;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Set up the global Rayon thread pool.
    ///
    /// The global pool can only be built once per process, so a second call
    /// with an explicit thread count fails with [`PapaError::ThreadPoolError`].
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(PapaError::ThreadPoolError(
                "thread count must be at least 1".to_string(),
            )),
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build_global()
                    .map_err(|e| {
                        PapaError::ThreadPoolError(format!(
                            "Failed to initialize thread pool with {} threads: {}",
                            num_threads, e
                        ))
                    })?;
                log::info!("configured parallel processing with {} threads", num_threads);
                Ok(())
            }
            None => {
                log::debug!(
                    "using default thread pool ({} threads)",
                    rayon::current_num_threads()
                );
                Ok(())
            }
        }
    }

    /// Number of threads in the current Rayon pool
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }

    /// Use every available CPU core
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
    pub available_parallelism: usize,
}

pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
        available_parallelism: std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    }
}

impl ParallelInfo {
    pub fn print_info(&self) {
        println!("📊 Parallel Processing Information:");
        println!("   Current threads: {}", self.current_threads);
        println!("   Available CPU cores: {}", self.available_cores);
        println!("   Available parallelism: {}", self.available_parallelism);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        let config = ParallelConfig::with_threads(0);
        assert!(matches!(
            config.setup_global_pool(),
            Err(PapaError::ThreadPoolError(_))
        ));
    }

    #[test]
    fn default_config_leaves_pool_alone() {
        let config = ParallelConfig::default();
        assert!(config.num_threads.is_none());
        assert!(config.setup_global_pool().is_ok());
        assert!(config.current_threads() > 0);
    }
}

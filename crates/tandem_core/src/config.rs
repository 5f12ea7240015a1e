//! # Scheduler Configuration
//!
//! Loaded once at startup from TOML, never consulted on the dispatch path.
//!
//! ```toml
//! threads = 8               # omit for hardware concurrency
//! wait_strategy = "yield"   # "spin" | "yield" | "block"
//! spin_limit = 256
//! thread_name = "physics"
//! ```

use std::env;
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{ParallelError, ParallelResult};
use crate::sync::{WaitStrategy, DEFAULT_SPIN_LIMIT};

/// Environment variable that overrides the configured thread count.
pub const THREADS_ENV_VAR: &str = "TANDEM_NUM_THREADS";

/// Configuration for a [`BarrierScheduler`](crate::BarrierScheduler).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Number of participants, the calling thread included.
    /// `None` means hardware concurrency.
    pub threads: Option<usize>,
    /// How waiting threads behave at the barriers and while idle.
    pub wait_strategy: WaitStrategy,
    /// Polls before `yield`/`block` back off.
    pub spin_limit: u32,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: None,
            wait_strategy: WaitStrategy::Spin,
            spin_limit: DEFAULT_SPIN_LIMIT,
            thread_name: String::from("tandem-worker"),
        }
    }
}

impl SchedulerConfig {
    /// Config with an explicit thread count and default everything else.
    #[must_use]
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Self::default()
        }
    }

    /// Sets the wait strategy.
    #[must_use]
    pub fn wait_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.wait_strategy = strategy;
        self
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::InvalidConfig`] on malformed TOML, unknown
    /// keys, or a zero thread count.
    pub fn from_toml_str(source: &str) -> ParallelResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ParallelError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::ConfigIo`] if the file cannot be read, and
    /// the errors of [`from_toml_str`](Self::from_toml_str) otherwise.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ParallelResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ParallelError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Applies `TANDEM_NUM_THREADS` if it holds a positive integer.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        match env::var(THREADS_ENV_VAR).ok().map(|raw| raw.trim().parse::<usize>()) {
            Some(Ok(threads @ 1..)) => {
                tracing::debug!(threads, "thread count taken from {}", THREADS_ENV_VAR);
                self.threads = Some(threads);
            }
            Some(_) => {
                tracing::debug!("ignoring unusable {} value", THREADS_ENV_VAR);
            }
            None => {}
        }
        self
    }

    /// Checks values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::InvalidConfig`] for a zero thread count or an
    /// empty thread name.
    pub fn validate(&self) -> ParallelResult<()> {
        if self.threads == Some(0) {
            return Err(ParallelError::InvalidConfig(
                "threads must be at least 1".into(),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(ParallelError::InvalidConfig(
                "thread_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolves the participant count.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::InvalidThreadCount`] for an explicit zero.
    pub fn resolved_threads(&self) -> ParallelResult<usize> {
        match self.threads {
            Some(0) => Err(ParallelError::InvalidThreadCount(0)),
            Some(threads) => Ok(threads),
            None => Ok(hardware_concurrency()),
        }
    }
}

/// Returns the number of hardware threads, or 1 if it cannot be queried.
#[must_use]
pub fn hardware_concurrency() -> usize {
    match thread::available_parallelism().map(NonZeroUsize::get) {
        Ok(threads) => {
            tracing::debug!(threads, "available_parallelism reported");
            threads
        }
        Err(error) => {
            tracing::debug!(%error, "available_parallelism unavailable, using 1");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.threads, None);
        assert_eq!(config.wait_strategy, WaitStrategy::Spin);
        assert_eq!(config.spin_limit, DEFAULT_SPIN_LIMIT);
        assert!(config.resolved_threads().unwrap() >= 1);
    }

    #[test]
    fn test_parse_full_config() {
        let config = SchedulerConfig::from_toml_str(
            r#"
            threads = 4
            wait_strategy = "block"
            spin_limit = 32
            thread_name = "physics"
            "#,
        )
        .unwrap();

        assert_eq!(config.threads, Some(4));
        assert_eq!(config.wait_strategy, WaitStrategy::Block);
        assert_eq!(config.spin_limit, 32);
        assert_eq!(config.thread_name, "physics");
        assert_eq!(config.resolved_threads().unwrap(), 4);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = SchedulerConfig::from_toml_str("wait_strategy = \"yield\"").unwrap();
        assert_eq!(config.wait_strategy, WaitStrategy::Yield);
        assert_eq!(config.threads, None);
        assert_eq!(config.thread_name, "tandem-worker");
    }

    #[test]
    fn test_rejects_unknown_keys_and_zero_threads() {
        let unknown = SchedulerConfig::from_toml_str("workers = 3");
        assert!(matches!(unknown, Err(ParallelError::InvalidConfig(_))));

        let zero = SchedulerConfig::from_toml_str("threads = 0");
        assert!(matches!(zero, Err(ParallelError::InvalidConfig(_))));

        let strategy = SchedulerConfig::from_toml_str("wait_strategy = \"sleep\"");
        assert!(matches!(strategy, Err(ParallelError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_threads_is_invalid_count() {
        let config = SchedulerConfig::with_threads(0);
        assert!(matches!(
            config.resolved_threads(),
            Err(ParallelError::InvalidThreadCount(0))
        ));
    }

    #[test]
    fn test_from_file_and_missing_file() {
        let path = std::env::temp_dir().join(format!(
            "tandem_config_{}.toml",
            std::process::id()
        ));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "threads = 2").unwrap();
        }

        let config = SchedulerConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.threads, Some(2));
        std::fs::remove_file(&path).ok();

        let missing = SchedulerConfig::from_toml_file(&path);
        assert!(matches!(missing, Err(ParallelError::ConfigIo { .. })));
    }

    #[test]
    fn test_env_override() {
        env::set_var(THREADS_ENV_VAR, "3");
        let config = SchedulerConfig::with_threads(8).with_env_overrides();
        assert_eq!(config.threads, Some(3));

        env::set_var(THREADS_ENV_VAR, "0");
        let config = SchedulerConfig::with_threads(8).with_env_overrides();
        assert_eq!(config.threads, Some(8));

        env::set_var(THREADS_ENV_VAR, "many");
        let config = SchedulerConfig::with_threads(8).with_env_overrides();
        assert_eq!(config.threads, Some(8));

        env::remove_var(THREADS_ENV_VAR);
    }
}

//! Binary runner utilities
//!
//! Shared start/stop banners and timing knobs for long-running clients.

use std::time::Duration;
use tracing::info;

const RULE: &str = "========================================";

/// Timing and naming for a long-running client
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub name: String,
    /// How often the client logs its status line
    pub status_interval: Duration,
    /// Period of the client's own recurring work, if it has any
    pub work_interval: Option<Duration>,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status_interval: Duration::from_secs(300),
            work_interval: None,
        }
    }

    pub fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval.max(Duration::from_secs(1));
        self
    }

    /// A zero interval disables the recurring work
    pub fn with_work_interval(mut self, interval: Duration) -> Self {
        self.work_interval = (!interval.is_zero()).then_some(interval);
        self
    }
}

/// A client binary driven through [`BinaryRunner::execute`]
#[allow(async_fn_in_trait)]
pub trait BinaryRunner {
    async fn run(&mut self) -> anyhow::Result<()>;

    fn config(&self) -> &RunConfig;

    /// One-line summary logged when the client stops
    fn stats(&self) -> Option<String> {
        None
    }

    /// Log the banners around `run()` and hand back its result
    async fn execute(&mut self) -> anyhow::Result<()> {
        let name = self.config().name.clone();
        info!("{}", RULE);
        info!("Starting {} (Ctrl+C to stop)", name);
        info!("{}", RULE);

        let result = self.run().await;

        info!("{}", RULE);
        match &result {
            Ok(()) => info!("{} stopped gracefully", name),
            Err(e) => info!("{} stopped with error: {:#}", name, e),
        }
        if let Some(stats) = self.stats() {
            info!("{}", stats);
        }
        info!("{}", RULE);
        result
    }
}

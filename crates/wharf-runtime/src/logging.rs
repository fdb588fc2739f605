//! Tracing setup, following `alloy-runtime::logging`'s `LoggingBuilder` —
//! an `EnvFilter` defaulting to `info`, a `fmt` layer, and an optional
//! rotating file appender via `tracing-appender` for long-running hosts.

use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Builds and installs the global tracing subscriber. Panics if a
/// subscriber is already set — this is only ever called once, from
/// `main`.
#[derive(Default)]
pub struct LoggingBuilder {
    directive: Option<String>,
    log_dir: Option<PathBuf>,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the default `info` filter directive (still subordinate
    /// to `RUST_LOG` if that's set).
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    /// Also writes daily-rotated logs under `dir`, in addition to stdout.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let base = self.directive.as_deref().unwrap_or("info");
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base))
    }

    /// Installs the subscriber. Returns the file appender's guard when
    /// `log_dir` was set — the caller must hold it for the process
    /// lifetime or buffered lines are dropped on exit.
    pub fn init(self) -> Option<tracing_appender::non_blocking::WorkerGuard> {
        let filter = self.build_filter();

        match self.log_dir {
            None => {
                tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
                None
            }
            Some(dir) => {
                let file_appender = tracing_appender::rolling::daily(dir, "wharf.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                tracing_subscriber::registry()
                    .with(fmt::layer())
                    .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                    .with(filter)
                    .init();
                Some(guard)
            }
        }
    }
}

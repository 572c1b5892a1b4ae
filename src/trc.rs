//! Tracing configuration and initialization.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

enum TrcMode {
    Foreground,
    Daemon,
}

pub struct Trc {
    mode: TrcMode,
    env_filter: EnvFilter,
}

impl Default for Trc {
    fn default() -> Self {
        // SVN_FS_LOG takes precedence over RUST_LOG; with neither set we
        // default to the info level.
        let env_filter = EnvFilter::try_from_env("SVN_FS_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));
        Self {
            mode: TrcMode::Foreground,
            env_filter,
        }
    }
}

impl Trc {
    /// Switch to daemon output: no ANSI colors, no span events, suitable for
    /// redirection into a log file.
    #[must_use]
    pub fn for_daemon(mut self) -> Self {
        self.mode = TrcMode::Daemon;
        self
    }

    pub fn init(self) -> Result<(), TryInitError> {
        match self.mode {
            TrcMode::Foreground => tracing_subscriber::fmt()
                .with_env_filter(self.env_filter)
                .with_span_events(FmtSpan::CLOSE)
                .finish()
                .try_init(),
            TrcMode::Daemon => tracing_subscriber::fmt()
                .with_env_filter(self.env_filter)
                .with_ansi(false)
                .finish()
                .try_init(),
        }
    }
}

//! Diagnostics for airide.
//!
//! Logs go to stderr so the ride progress printed on stdout stays
//! readable. The HTTP client stack is kept at `warn` unless tracing is
//! asked for explicitly; its per-request chatter otherwise drowns the
//! tracker's own events during a ride.

use std::fmt;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Targets of the HTTP client stack under the navigation backend.
const HTTP_TARGETS: [&str; 3] = ["reqwest", "hyper", "hyper_util"];

/// How much the binary logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Trip milestones: route ready, sent, completed.
    #[default]
    Normal,
    /// Every state change and fix.
    Verbose,
    /// Everything, including the HTTP client.
    Trace,
}

impl Verbosity {
    /// Map the `-q` / `-v` command-line flags. `quiet` wins.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Level for airide's own events.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    /// Level for the HTTP client stack.
    fn http_level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal | Self::Verbose => LevelFilter::WARN,
            Self::Trace => LevelFilter::DEBUG,
        }
    }

    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[must_use]
    pub fn filter_directives(self) -> String {
        std::iter::once(directive("airide", self.level()))
            .chain(HTTP_TARGETS.iter().map(|target| directive(target, self.http_level())))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn directive(target: &str, level: LevelFilter) -> String {
    format!("{target}={}", level.to_string().to_lowercase())
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Quiet => "quiet",
            Self::Normal => "normal",
            Self::Verbose => "verbose",
            Self::Trace => "trace",
        };
        f.write_str(s)
    }
}

/// Install the stderr subscriber.
///
/// `RUST_LOG` overrides the directives derived from `verbosity`. Event
/// targets are shown from [`Verbosity::Verbose`] up. Calling this again
/// is a no-op.
///
/// ```no_run
/// use airide::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directives()));

    let layer = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= Verbosity::Verbose);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!(%verbosity, "Logging initialized");
    }
}

/// Route warnings and errors into the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("airide=warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(4, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(2, true), Verbosity::Quiet);
    }

    #[test]
    fn test_http_stack_capped_below_trace() {
        assert_eq!(
            Verbosity::Verbose.filter_directives(),
            "airide=debug,reqwest=warn,hyper=warn,hyper_util=warn"
        );
        assert_eq!(
            Verbosity::Trace.filter_directives(),
            "airide=trace,reqwest=debug,hyper=debug,hyper_util=debug"
        );
        assert!(Verbosity::Quiet
            .filter_directives()
            .split(',')
            .all(|d| d.ends_with("=error")));
    }

    #[test]
    fn test_directives_parse_as_env_filter() {
        for verbosity in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::Trace,
        ] {
            assert!(EnvFilter::try_new(verbosity.filter_directives()).is_ok(), "{verbosity}");
        }
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(Verbosity::Normal);
        init_logging(Verbosity::Trace);
        init_test_logging();
    }
}

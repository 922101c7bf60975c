//! Tracing setup and metric names
//!
//! Metrics go through the `metrics` facade; no recorder is installed here,
//! so counters are no-ops unless the embedding process installs one.

use tracing_subscriber::EnvFilter;

/// Requests that passed admission
pub const REQUESTS_ADMITTED: &str = "cuescope_requests_admitted_total";

/// Requests refused at admission, labelled by `reason`
pub const REQUESTS_REFUSED: &str = "cuescope_requests_refused_total";

/// Compiler runs, labelled by `mode` and `outcome`
pub const EVALUATIONS: &str = "cuescope_evaluations_total";

/// Compiler runs killed at the deadline
pub const TIMEOUTS: &str = "cuescope_timeouts_total";

/// Install the global subscriber writing to stderr
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Calling this more
/// than once keeps the first subscriber.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(err) = result {
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }
}

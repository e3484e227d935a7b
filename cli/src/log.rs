//! Logging setup. The engine logs through [tracing]; this installs the
//! subscriber that prints those events to stderr.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Crates whose events `--verbose` raises to debug.
const OUR_CRATES: &[&str] = &["tagscript", "tagscript_engine"];

/// Install a stderr subscriber. `RUST_LOG`, when set, replaces the default
/// filter of warnings (plus debug for our crates with `verbose`).
pub(crate) fn install_tracing(verbose: bool, no_color: bool) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_level(true)
        .with_target(verbose)
        .without_time()
        .compact();

    match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .init(),
        Err(_) => {
            let mut targets = Targets::new().with_default(LevelFilter::WARN);
            if verbose {
                for target in OUR_CRATES {
                    targets = targets.with_target(*target, LevelFilter::DEBUG);
                }
            }
            tracing_subscriber::registry()
                .with(layer.with_filter(targets))
                .init();
        }
    }
}

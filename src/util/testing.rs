//! Test support: one tracing subscriber per test binary.

use std::env;
use std::sync::Once;

use tracing::info;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

static TEST_SETUP: Once = Once::new();

/// Default filter when neither `CHAINTREE_TEST_LOG` nor `RUST_LOG` is set.
const DEFAULT_TEST_FILTER: &str = "chaintree=debug";

/// Install the test subscriber. Safe to call from every test.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if setup_test_logging() {
            info!("test logging ready");
        }
    });
}

fn test_filter() -> EnvFilter {
    env::var("CHAINTREE_TEST_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_TEST_FILTER))
}

/// Returns false when another subscriber was installed first.
fn setup_test_logging() -> bool {
    // HTTP client internals drown the controller spans
    let quiet = filter_fn(|metadata| {
        !["hyper", "reqwest", "rustls", "h2"]
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(quiet)
                .with_filter(test_filter()),
        )
        .try_init()
        .is_ok()
}

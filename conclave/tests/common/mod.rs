#![allow(dead_code)]

use tracing_subscriber::filter::LevelFilter;

/// Routes the crate's logs to the test harness output.
///
/// Safe to call from every test: only the first call installs the
/// subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

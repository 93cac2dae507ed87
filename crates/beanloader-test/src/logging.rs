//! Test logging utilities
//!
//! Installs a `tracing` subscriber writing through the test harness, so log
//! output only shows for failing tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests (call once)
///
/// Safe to call from every test; only the first call installs the
/// subscriber, and an already installed global subscriber is left alone.
///
/// # Examples
///
/// ```
/// use beanloader_test::logging::init_test_logging;
///
/// init_test_logging();
/// init_test_logging();
/// ```
pub fn init_test_logging() {
	INIT.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_test_writer()
			.with_max_level(tracing::Level::TRACE)
			.try_init();
	});
}

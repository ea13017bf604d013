pub mod config;
pub mod core;
pub mod models;
pub mod utils;

use tracing_subscriber::EnvFilter;

/// One-time `tracing-subscriber` init, grounded on the teacher's
/// `tracing`/`tracing-subscriber` wiring (there wired through
/// `tauri-plugin-log`; here there is no GUI host so it is called
/// directly by binaries and integration tests). Safe to call more
/// than once; only the first call installs the global subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

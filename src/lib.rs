pub mod backend;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod fixtures;
pub mod gate;
pub mod i18n;
pub mod identity;
pub mod pool;
pub mod proxy;
pub mod storage_paths;

pub use config::ProxyConfig;
pub use context::{ContextBuilder, RequestContext};
pub use environment::Environment;
pub use error::{ProxyError, ProxyResult};
pub use proxy::{BackendProxy, ScheduledProxy, DEFAULT_SOURCE_IP};

// Test-only printing helper: expands to eprintln! during tests and debug builds and is absent otherwise.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}

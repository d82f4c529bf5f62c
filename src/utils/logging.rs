//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! The periodic tasks run at display-refresh rate, so their diagnostics are
//! noisy enough that each module decides for itself whether they reach the
//! `log` facade.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = false;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("scan cycler activated with {} handles", pool.len());
//! ```

/// Info-level logging, emitted only when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level logging, emitted only when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Debug-level logging for per-frame chatter.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

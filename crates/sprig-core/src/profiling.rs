//! Profiling utilities based on the `puffin` crate.
//!
//! With the `profiling` feature disabled, [`profile_function`] and
//! [`profile_scope`] expand to nothing so call sites never need `cfg` guards.

use crate::config::ProfilingMode;

#[cfg(feature = "profiling")]
pub use puffin::{profile_function, profile_scope};

#[cfg(not(feature = "profiling"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __sprig_profile_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "profiling"))]
pub use crate::__sprig_profile_noop as profile_function;
#[cfg(not(feature = "profiling"))]
pub use crate::__sprig_profile_noop as profile_scope;

/// Profiling backend options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Send profiling data to puffin_viewer via HTTP.
    PuffinHttp,
}

#[cfg(feature = "profiling")]
static PROFILING_SERVER: std::sync::OnceLock<puffin_http::Server> = std::sync::OnceLock::new();

/// Initialize profiling with the specified backend.
///
/// # Example
/// ```no_run
/// use sprig_core::profiling::{init_profiling, ProfilingBackend};
///
/// init_profiling(ProfilingBackend::PuffinHttp);
/// ```
#[cfg(feature = "profiling")]
pub fn init_profiling(backend: ProfilingBackend) {
    match backend {
        ProfilingBackend::PuffinHttp => {
            puffin::set_scopes_on(true);

            match puffin_http::Server::new("0.0.0.0:8585") {
                Ok(server) => {
                    tracing::info!("Puffin profiler server started on http://0.0.0.0:8585");
                    // Dropping the server stops it.
                    let _ = PROFILING_SERVER.set(server);
                }
                Err(e) => {
                    tracing::error!("Failed to start puffin server: {}", e);
                }
            }
        }
    }
}

#[cfg(not(feature = "profiling"))]
pub fn init_profiling(backend: ProfilingBackend) {
    tracing::warn!(
        "Profiling backend {:?} requested but sprig-core was built without the `profiling` feature",
        backend
    );
}

/// Apply a [`ProfilingMode`] from the runtime configuration.
pub fn apply_mode(mode: ProfilingMode) {
    match mode {
        ProfilingMode::Off => {
            #[cfg(feature = "profiling")]
            puffin::set_scopes_on(false);
        }
        ProfilingMode::On => {
            #[cfg(feature = "profiling")]
            puffin::set_scopes_on(true);
            #[cfg(not(feature = "profiling"))]
            tracing::warn!("Profiling enabled in config but the `profiling` feature is off");
        }
        ProfilingMode::WithWebserver => init_profiling(ProfilingBackend::PuffinHttp),
    }
}

/// Mark the start of a new frame for profiling.
///
/// Call this once per frame so scopes are grouped by frame in the viewer.
#[inline]
pub fn new_frame() {
    #[cfg(feature = "profiling")]
    puffin::GlobalProfiler::lock().new_frame();
}

//! Turn termination signals into cancellation.
//!
//! Interrupting a flow mid-step must still run its cleanup guard, so the
//! handler only flips the registered [`CancelToken`]. The running step sees
//! the token (the child usually died from the same signal), returns an
//! error, and the guard releases resources while the stack unwinds.

use std::io;
use std::sync::OnceLock;

use super::types::CancelToken;

static TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Route SIGINT, SIGTERM and SIGHUP to `cancel`.
///
/// Only the first registered token is used; later calls keep it.
pub fn install(cancel: &CancelToken) -> io::Result<()> {
    let _ = TOKEN.set(cancel.clone());
    imp::install()
}

#[cfg(unix)]
mod imp {
    use std::io;

    use super::TOKEN;

    extern "C" fn on_signal(_: libc::c_int) {
        // Atomic load + atomic store only.
        if let Some(token) = TOKEN.get() {
            token.cancel();
        }
    }

    pub(super) fn install() -> io::Result<()> {
        for sig in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP] {
            // SAFETY: `on_signal` is an `extern "C"` fn that only touches atomics.
            let previous = unsafe {
                libc::signal(sig, on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t)
            };
            if previous == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod imp {
    pub(super) fn install() -> std::io::Result<()> {
        Ok(())
    }
}

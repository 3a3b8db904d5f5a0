//! C ABI for the fetch engine
//!
//! Every entry point is a self-contained synchronous call: it reads its
//! arguments, runs the engine on a fresh current-thread runtime and collapses
//! any failure (including a panic) to `0` or an empty string.

#![warn(unsafe_op_in_unsafe_fn)]

use std::ffi::{c_char, c_int, CString};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::Context;
use engine::{FetchError, Fetcher, Resolved};
use tracing::warn;

pub mod logging;
mod strings;

use strings::{empty_c_string, into_c_string, read_c_str};

/// Separates the final URL from the filename in `fetchshim_get_redirect_info`
pub const RESULT_DELIMITER: char = '|';

/// Downloads `url` to `save_path`, creating parent directories
///
/// Returns `1` on success and `0` on any failure.
///
/// # Safety
///
/// `url` and `save_path` must each be NULL or point to a NUL-terminated
/// string that stays valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn fetchshim_download_file(url: *const c_char, save_path: *const c_char) -> c_int {
    let outcome = guarded("fetchshim_download_file", || {
        // SAFETY: forwarded caller contract
        let url = unsafe { read_c_str(url, "url")? };
        let save_path = unsafe { read_c_str(save_path, "save_path")? };

        block_on(download(url, Path::new(save_path)))?
            .with_context(|| format!("download of {url} to {save_path} failed"))
    });

    c_int::from(outcome.is_some())
}

/// Follows the redirects of `url` and names the target
///
/// Returns a newly allocated `"<final_url>|<filename>"`, or an empty string on
/// failure. Either way the result must be released with
/// `fetchshim_string_free`.
///
/// # Safety
///
/// `url` must be NULL or point to a NUL-terminated string that stays valid for
/// the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn fetchshim_get_redirect_info(url: *const c_char) -> *mut c_char {
    let outcome = guarded("fetchshim_get_redirect_info", || {
        // SAFETY: forwarded caller contract
        let url = unsafe { read_c_str(url, "url")? };

        let resolved = block_on(resolve(url))?.with_context(|| format!("resolving {url} failed"))?;
        into_c_string(delimited(&resolved))
    });

    outcome.unwrap_or_else(empty_c_string)
}

/// Releases a string returned by this library; NULL is ignored
///
/// # Safety
///
/// `ptr` must be NULL or a pointer previously returned by
/// `fetchshim_get_redirect_info` that has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn fetchshim_string_free(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: allocated by CString::into_raw in this crate
    drop(unsafe { CString::from_raw(ptr) });
}

/// Enables stderr logging filtered by `FETCHSHIM_LOG`
#[no_mangle]
pub extern "C" fn fetchshim_init_logging() {
    let _ = panic::catch_unwind(logging::init);
}

fn delimited(resolved: &Resolved) -> String {
    format!("{}{RESULT_DELIMITER}{}", resolved.final_url, resolved.filename)
}

async fn download(url: &str, path: &Path) -> Result<u64, FetchError> {
    Fetcher::new()?.download(url, path).await
}

async fn resolve(url: &str) -> Result<Resolved, FetchError> {
    Fetcher::new()?.resolve(url).await
}

fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    Ok(runtime.block_on(future))
}

/// Runs `op`, logging and swallowing both errors and panics
fn guarded<T>(entry: &'static str, op: impl FnOnce() -> anyhow::Result<T>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            warn!(entry, error = %format_args!("{err:#}"), "call failed");
            None
        }
        Err(_) => {
            warn!(entry, "call panicked");
            None
        }
    }
}

//! C string marshaling

use std::ffi::{c_char, CStr, CString};

use anyhow::{bail, Context};

/// Borrows a NUL-terminated UTF-8 string handed in by the host
///
/// # Safety
///
/// `ptr` must be NULL or point to a NUL-terminated string that stays valid
/// and unmodified for `'a`.
pub(crate) unsafe fn read_c_str<'a>(ptr: *const c_char, arg: &'static str) -> anyhow::Result<&'a str> {
    if ptr.is_null() {
        bail!("{arg} is NULL");
    }
    // SAFETY: non-null and NUL-terminated per the caller contract
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str()
        .with_context(|| format!("{arg} is not valid UTF-8"))
}

/// Hands ownership of `value` to the host; released by `fetchshim_string_free`
pub(crate) fn into_c_string(value: String) -> anyhow::Result<*mut c_char> {
    let owned = CString::new(value).context("result contains an interior NUL byte")?;
    Ok(owned.into_raw())
}

pub(crate) fn empty_c_string() -> *mut c_char {
    CString::default().into_raw()
}

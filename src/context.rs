use crate::cstring_array::CStringArray;
use crate::errno::Errno;
use libc::{c_char, c_int, c_void};
use std::ffi::{CStr, NulError};
use std::path::Path;
use std::ptr;

/// PROJ thread context
///
/// Shared through `Rc` by every object one builder creates, so it never leaves its thread.
/// PROJ's diagnostic output is forwarded to the `log` facade under the `proj` target.
pub struct ThreadContext(ptr::NonNull<proj_sys::PJ_CONTEXT>);

impl ThreadContext {
    pub fn new() -> Self {
        // Safety: `proj_context_create` always returns a valid pointer to a thread context.
        let ctx = unsafe {
            let ctx_ptr = proj_sys::proj_context_create();
            ThreadContext::from_raw(ctx_ptr)
        };
        ctx.forward_log();
        ctx
    }

    /// # Safety
    ///
    /// Must provide a non-null pointer to a PROJ thread context.
    unsafe fn from_raw(ctx_ptr: *mut proj_sys::PJ_CONTEXT) -> Self {
        debug_assert!(!ctx_ptr.is_null());
        ThreadContext(unsafe { ptr::NonNull::new_unchecked(ctx_ptr) })
    }

    pub fn as_ptr(&self) -> *mut proj_sys::PJ_CONTEXT {
        self.0.as_ptr()
    }

    /// The error code of the most recent failed call made through this context.
    pub fn errno(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_context_errno(self.as_ptr()) })
    }

    /// Replace the directories PROJ searches for `proj.db` and grid files.
    pub fn set_search_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<(), NulError> {
        let c_paths = CStringArray::from_strings(
            paths.iter().map(|path| path.as_ref().to_string_lossy().into_owned()),
        )?;
        unsafe {
            proj_sys::proj_context_set_search_paths(
                self.as_ptr(),
                c_paths.len() as c_int,
                c_paths.as_ptr(),
            );
        }
        Ok(())
    }

    fn forward_log(&self) {
        let level = if log::log_enabled!(target: "proj", log::Level::Trace) {
            proj_sys::PJ_LOG_LEVEL_PJ_LOG_TRACE
        } else if log::log_enabled!(target: "proj", log::Level::Debug) {
            proj_sys::PJ_LOG_LEVEL_PJ_LOG_DEBUG
        } else {
            proj_sys::PJ_LOG_LEVEL_PJ_LOG_ERROR
        };
        unsafe {
            proj_sys::proj_log_func(self.as_ptr(), ptr::null_mut(), Some(log_callback));
            proj_sys::proj_log_level(self.as_ptr(), level);
        }
    }
}

impl Default for ThreadContext {
    fn default() -> Self {
        ThreadContext::new()
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        // Safety: The pointer being provided to `proj_context_destroy` will always be a valid
        // thread context, so long as the same `ThreadContext` doesn't get dropped twice.
        unsafe { proj_sys::proj_context_destroy(self.0.as_ptr()) };
    }
}

unsafe extern "C" fn log_callback(_app_data: *mut c_void, level: c_int, message: *const c_char) {
    let Some(message) = (unsafe { string_from_ptr(message) }) else {
        return;
    };
    match level {
        // PROJ errors surface again through our own error values
        1 | 2 => log::debug!(target: "proj", "{}", message),
        _ => log::trace!(target: "proj", "{}", message),
    }
}

/// Copy a C string owned by PROJ into an owned `String`.
///
/// # Safety
///
/// `raw_ptr` must be null or point to a valid nul-terminated string.
pub(crate) unsafe fn string_from_ptr(raw_ptr: *const c_char) -> Option<String> {
    if raw_ptr.is_null() {
        return None;
    }
    let c_str = unsafe { CStr::from_ptr(raw_ptr) };
    Some(c_str.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_has_no_error() {
        let ctx = ThreadContext::new();
        assert!(ctx.errno().is_ok());
    }

    #[test]
    fn search_paths_reject_nul_bytes() {
        let ctx = ThreadContext::new();
        assert!(ctx.set_search_paths(&["bad\0path"]).is_err());
    }

    #[test]
    fn null_pointer_is_no_string() {
        assert_eq!(unsafe { string_from_ptr(ptr::null()) }, None);
    }
}

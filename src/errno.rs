use crate::context::{ThreadContext, string_from_ptr};

/// A PROJ error code, as returned by `proj_errno` or `proj_context_errno`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Errno(pub libc::c_int);

impl Errno {
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }

    /// PROJ's description of this code, falling back to the bare number.
    pub fn message(&self, context: &ThreadContext) -> String {
        let message = unsafe {
            string_from_ptr(proj_sys::proj_context_errno_string(context.as_ptr(), self.0))
        };
        match message {
            Some(message) if !message.is_empty() => message,
            _ => format!("PROJ error code {}", self.0),
        }
    }
}

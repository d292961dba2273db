use crate::context::{ThreadContext, string_from_ptr};
use crate::cstring_array::CStringArray;
use crate::errno::Errno;
use std::{ffi, ptr, rc};
use thiserror::Error;

/// A safe wrapper around `proj_sys::PJ`.
///
/// The object keeps its thread context alive; objects combined into one pipeline must share
/// the same context.
pub(crate) struct Pj {
    pj: ptr::NonNull<proj_sys::PJ>,
    ctx: rc::Rc<ThreadContext>,
}

impl Pj {
    /// Create a PROJ object (CRS, operation or pipeline) from any definition PROJ accepts.
    pub fn from_definition(
        ctx: rc::Rc<ThreadContext>,
        definition: &str,
    ) -> Result<Self, PjCreateError> {
        let definition = ffi::CString::new(definition).map_err(PjCreateError::ArgumentNulError)?;
        let pj_ptr = unsafe { proj_sys::proj_create(ctx.as_ptr(), definition.as_ptr()) };
        Pj::from_pj_ptr(ctx, pj_ptr)
    }

    /// Build the best available operation from `source` to `target`.
    pub fn crs_to_crs(
        source: &Pj,
        target: &Pj,
        options: &CStringArray,
    ) -> Result<Self, PjCreateError> {
        if !rc::Rc::ptr_eq(&source.ctx, &target.ctx) {
            return Err(PjCreateError::ContextMismatch);
        }
        let ctx = rc::Rc::clone(&source.ctx);
        let pj_ptr = unsafe {
            proj_sys::proj_create_crs_to_crs_from_pj(
                ctx.as_ptr(),
                source.as_ptr(),
                target.as_ptr(),
                ptr::null_mut(),
                options.as_ptr(),
            )
        };
        Pj::from_pj_ptr(ctx, pj_ptr)
    }

    /// Return an equivalent operation whose input and output axis order is
    /// longitude/easting first.
    pub fn normalize_for_visualization(&self) -> Result<Self, PjCreateError> {
        let pj_ptr =
            unsafe { proj_sys::proj_normalize_for_visualization(self.ctx.as_ptr(), self.as_ptr()) };
        Pj::from_pj_ptr(rc::Rc::clone(&self.ctx), pj_ptr)
    }

    fn from_pj_ptr(
        ctx: rc::Rc<ThreadContext>,
        pj_ptr: *mut proj_sys::PJconsts,
    ) -> Result<Self, PjCreateError> {
        match ptr::NonNull::new(pj_ptr) {
            Some(pj) => Ok(Pj { pj, ctx }),
            None => Err(PjCreateError::ProjError(ctx.errno().message(&ctx))),
        }
    }

    pub fn as_ptr(&self) -> *mut proj_sys::PJ {
        self.pj.as_ptr()
    }

    pub fn context(&self) -> &rc::Rc<ThreadContext> {
        &self.ctx
    }

    pub fn is_crs(&self) -> bool {
        unsafe { proj_sys::proj_is_crs(self.as_ptr()) != 0 }
    }

    /// PROJ's human readable name for the object, if it has one.
    pub fn name(&self) -> Option<String> {
        unsafe { string_from_ptr(proj_sys::proj_get_name(self.as_ptr())) }
    }

    /// The first registry identifier of the object, as `AUTHORITY:CODE`.
    pub fn identifier(&self) -> Option<String> {
        let (authority, code) = unsafe {
            (
                string_from_ptr(proj_sys::proj_get_id_auth_name(self.as_ptr(), 0)),
                string_from_ptr(proj_sys::proj_get_id_code(self.as_ptr(), 0)),
            )
        };
        Some(format!("{}:{}", authority?, code?))
    }

    pub fn errno_reset(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_errno_reset(self.as_ptr()) })
    }

    pub fn errno(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_errno(self.as_ptr()) })
    }

    pub fn errno_message(&self, errno: Errno) -> String {
        errno.message(&self.ctx)
    }

    pub fn trans_forward(&self, coord: proj_sys::PJ_COORD) -> proj_sys::PJ_COORD {
        unsafe { proj_sys::proj_trans(self.as_ptr(), proj_sys::PJ_DIRECTION_PJ_FWD, coord) }
    }
}

impl Drop for Pj {
    fn drop(&mut self) {
        unsafe {
            proj_sys::proj_destroy(self.as_ptr());
        }
    }
}

#[derive(Error, Debug)]
pub enum PjCreateError {
    #[error("a nul byte was found in the PROJ definition: {0}")]
    ArgumentNulError(ffi::NulError),
    #[error("{0}")]
    ProjError(String),
    #[error("PROJ objects were created in different thread contexts")]
    ContextMismatch,
}

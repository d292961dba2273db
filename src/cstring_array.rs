use libc::c_char;
use std::ffi::{CString, NulError};
use std::{iter, ptr};

/// Owned strings laid out as the NULL terminated `char* const*` PROJ takes for
/// `proj_create_crs_to_crs_from_pj` options and `proj_context_set_search_paths`.
///
/// The array is fixed once built. Moving it does not move the string buffers, so the
/// pointers stay valid for as long as the array lives.
pub(crate) struct CStringArray {
    strings: Vec<CString>,
    /// One pointer per string, then NULL.
    pointers: Vec<*const c_char>,
}

impl CStringArray {
    #[cfg(test)]
    pub fn empty() -> Self {
        CStringArray {
            strings: Vec::new(),
            pointers: vec![ptr::null()],
        }
    }

    /// Fails on the first string holding an interior nul byte.
    pub fn from_strings<I, S>(strings: I) -> Result<Self, NulError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let strings = strings
            .into_iter()
            .map(|s| CString::new(s.into()))
            .collect::<Result<Vec<_>, _>>()?;
        let pointers = strings
            .iter()
            .map(|s| s.as_ptr())
            .chain(iter::once(ptr::null()))
            .collect();
        Ok(CStringArray { strings, pointers })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// NULL when there are no strings, which PROJ documents as "no options".
    pub fn as_ptr(&self) -> *const *const c_char {
        if self.is_empty() {
            ptr::null()
        } else {
            self.pointers.as_ptr()
        }
    }
}

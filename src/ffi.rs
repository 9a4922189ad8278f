//! C-ABI Foreign Function Interface for mdtree.
//!
//! This module provides C-compatible bindings for rendering Markdown from
//! C, C++, C#, Python, and any language with C FFI support.
//!
//! # Memory Management
//!
//! All strings returned by this library must be freed using `mdtree_free_string`.
//!
//! # Error Handling
//!
//! Functions that can fail return a null pointer on error. Use `mdtree_last_error`
//! to retrieve the error message.
//!
//! # Example (C)
//!
//! ```c
//! #include <stdio.h>
//! #include "mdtree.h"
//!
//! int main() {
//!     char* md = mdtree_render_markdown("Some *emphasis*", 72, MDTREE_FLAG_FULL_MARKERS);
//!     if (!md) {
//!         fprintf(stderr, "Error: %s\n", mdtree_last_error());
//!         return 1;
//!     }
//!     printf("%s\n", md);
//!     mdtree_free_string(md);
//!     return 0;
//! }
//! ```

use std::cell::RefCell;
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::catch_unwind;
use std::ptr;

use crate::render::{to_json, JsonFormat, OutputGrammar, RenderSettings};

// Thread-local storage for the last error message.
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message.
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message.
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Flags for markdown rendering.
pub const MDTREE_FLAG_GFM: c_int = 1;
pub const MDTREE_FLAG_FULL_MARKERS: c_int = 2;
pub const MDTREE_FLAG_DISPLAY_WIDTH: c_int = 4;

/// JSON format options.
pub const MDTREE_JSON_PRETTY: c_int = 0;
pub const MDTREE_JSON_COMPACT: c_int = 1;

fn settings_from_flags(width: c_int, flags: c_int) -> RenderSettings {
    let select = |flag: c_int, on: &str, off: &str| {
        let chosen = if flags & flag != 0 { on } else { off };
        chosen.to_string()
    };
    RenderSettings {
        line_width: i64::from(width),
        grammar: select(MDTREE_FLAG_GFM, "gfm", "commonmark"),
        markers: select(MDTREE_FLAG_FULL_MARKERS, "full", "minimal"),
        column_mode: select(MDTREE_FLAG_DISPLAY_WIDTH, "display", "chars"),
    }
}

/// Read a C string argument, recording an error when it is unusable.
unsafe fn str_arg<'a>(s: *const c_char, name: &str) -> Option<&'a str> {
    if s.is_null() {
        set_last_error(&format!("{} is null", name));
        return None;
    }
    match CStr::from_ptr(s).to_str() {
        Ok(s) => Some(s),
        Err(e) => {
            set_last_error(&format!("{} is not valid UTF-8: {}", name, e));
            None
        }
    }
}

fn into_c_string(result: std::result::Result<String, String>) -> *mut c_char {
    match result.and_then(|s| CString::new(s).map_err(|e| e.to_string())) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

/// Get the version of the library.
///
/// # Safety
///
/// Returns a static string that must not be freed.
#[no_mangle]
pub extern "C" fn mdtree_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Get the last error message.
///
/// # Safety
///
/// Returns a pointer to a thread-local error string. The pointer is valid until
/// the next call to any mdtree function on the same thread.
#[no_mangle]
pub extern "C" fn mdtree_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Parse Markdown source and render it again.
///
/// `width` is the wrap width (0 = no wrapping, negative is an error).
/// `flags` is a combination of the `MDTREE_FLAG_*` constants.
///
/// # Safety
///
/// - `src` must be a valid null-terminated UTF-8 string.
/// - Returns null on error. Use `mdtree_last_error` to get the error message.
/// - The returned string must be freed with `mdtree_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mdtree_render_markdown(
    src: *const c_char,
    width: c_int,
    flags: c_int,
) -> *mut c_char {
    clear_last_error();

    let Some(source) = str_arg(src, "source") else {
        return ptr::null_mut();
    };

    let result = catch_unwind(|| {
        let settings = settings_from_flags(width, flags);
        crate::render_markdown_with_settings(source, &settings).map_err(|e| e.to_string())
    });

    match result {
        Ok(rendered) => into_c_string(rendered),
        Err(_) => {
            set_last_error("panic occurred during rendering");
            ptr::null_mut()
        }
    }
}

/// Parse Markdown source and dump the node tree as JSON.
///
/// # Safety
///
/// - `src` must be a valid null-terminated UTF-8 string.
/// - `format`: 0 = pretty, 1 = compact
/// - Returns null on error. Use `mdtree_last_error` to get the error message.
/// - The returned string must be freed with `mdtree_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mdtree_tree_json(src: *const c_char, format: c_int) -> *mut c_char {
    clear_last_error();

    let Some(source) = str_arg(src, "source") else {
        return ptr::null_mut();
    };

    let json_format = if format == MDTREE_JSON_COMPACT {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let result = catch_unwind(|| {
        let tree = crate::parse::parse(source, OutputGrammar::Gfm);
        to_json(&tree, json_format).map_err(|e| e.to_string())
    });

    match result {
        Ok(json) => into_c_string(json),
        Err(_) => {
            set_last_error("panic occurred during JSON serialization");
            ptr::null_mut()
        }
    }
}

/// Free a string allocated by this library.
///
/// # Safety
///
/// - `s` must be a pointer returned by an mdtree function, or null.
/// - After calling this function, the pointer is invalid and must not be used.
#[no_mangle]
pub unsafe extern "C" fn mdtree_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

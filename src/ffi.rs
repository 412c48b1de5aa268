//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Buffers returned by `motto_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `motto_free_buffer` / `motto_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error):
//!   1 = null pointer, 2 = invalid UTF-8, 3 = invalid data, 4 = render failure.
//! - Error details can be retrieved via `motto_last_error`.
//!
//! ## Fonts
//! Fonts registered with `motto_add_font` go into the process-wide registry
//! and are available to every later `motto_render_pdf` call.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -lmotto_html
//! // #include <stdint.h>
//! // extern int motto_render_pdf(const uint8_t* tpl, uint32_t tpl_len,
//! //                             const uint8_t* data, uint32_t data_len,
//! //                             uint8_t** out_buf, uint32_t* out_len);
//! // extern void motto_free_buffer(uint8_t* buf, uint32_t len);
//! // extern const char* motto_last_error();
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use serde_json::Value;

use crate::builder::DocumentBuilder;
use crate::error::Error;
use crate::fonts::FontRegistry;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Hand `bytes` to the caller as a heap buffer.
///
/// # Safety
/// `out_buf` and `out_len` must be valid for writes.
unsafe fn export_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
}

fn render(template: &str, data: Option<Value>) -> Result<Vec<u8>, (c_int, Error)> {
    let mut builder = DocumentBuilder::new();
    builder
        .load_template_from_str(template)
        .map_err(|e| (3, e))?;
    if let Some(data) = data {
        builder.merge_json(data).map_err(|e| (3, e))?;
    }
    builder.render_pdf().map_err(|e| (4, e))
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Merge a JSON object into a template and render the result to PDF.
///
/// # Parameters
/// - `template_ptr`, `template_len`: UTF-8 Handlebars template (not necessarily
///   null-terminated)
/// - `data_ptr`, `data_len`: UTF-8 JSON object of merge values; `NULL` or an
///   empty buffer merges nothing
/// - `out_buf`: on success, receives a pointer to heap-allocated PDF bytes
/// - `out_len`: on success, receives the length of the PDF buffer
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `motto_last_error`.
///
/// # Safety
/// - `template_ptr` must point to `template_len` valid bytes.
/// - `data_ptr`, if non-null, must point to `data_len` valid bytes.
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `motto_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn motto_render_pdf(
    template_ptr: *const u8,
    template_len: u32,
    data_ptr: *const u8,
    data_len: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if template_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let template_bytes = slice::from_raw_parts(template_ptr, template_len as usize);
    let template = match std::str::from_utf8(template_bytes) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8 in template: {e}"));
            return 2;
        }
    };

    let data = if data_ptr.is_null() || data_len == 0 {
        None
    } else {
        let data_bytes = slice::from_raw_parts(data_ptr, data_len as usize);
        if let Err(e) = std::str::from_utf8(data_bytes) {
            set_last_error(&format!("Invalid UTF-8 in data: {e}"));
            return 2;
        }
        match serde_json::from_slice::<Value>(data_bytes) {
            Ok(v) => Some(v),
            Err(e) => {
                set_last_error(&format!("Invalid data JSON: {e}"));
                return 3;
            }
        }
    };

    match render(template, data) {
        Ok(pdf_bytes) => {
            export_buffer(pdf_bytes, out_buf, out_len);
            0
        }
        Err((code, e)) => {
            set_last_error(&e.to_string());
            code
        }
    }
}

/// Register a font file with the process-wide registry.
///
/// `path` may carry a `,<index>` suffix to select a face from a TrueType
/// collection.
///
/// # Safety
/// `path` must be a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn motto_add_font(path: *const c_char) -> c_int {
    if path.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let spec = match CStr::from_ptr(path).to_str() {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8 in font path: {e}"));
            return 2;
        }
    };
    match FontRegistry::global().add_font(spec) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            3
        }
    }
}

/// Registered font families as a JSON array string.
///
/// # Safety
/// `out_json_ptr` must be a valid pointer. Free the result with
/// `motto_free_string`.
#[no_mangle]
pub unsafe extern "C" fn motto_list_font_families(out_json_ptr: *mut *mut c_char) -> c_int {
    if out_json_ptr.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let families = FontRegistry::global().list_font_family();
    let json = Value::from(families).to_string();
    match CString::new(json) {
        Ok(cs) => {
            *out_json_ptr = cs.into_raw();
            0
        }
        Err(_) => {
            set_last_error("JSON contained null byte");
            3
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `motto_render_pdf`.
///
/// # Safety
/// `buf` must have been returned by a previous `motto_render_pdf` call, and
/// `len` must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn motto_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a string returned by `motto_list_font_families`.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn motto_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `motto_*` call on the same
/// thread. The caller should **not** free this pointer – it is managed
/// internally.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn motto_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn motto_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn last_error() -> String {
        let p = motto_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string()
    }

    #[test]
    fn ffi_render_pdf() {
        let template = b"<html><body><h1>Hello {{name}}</h1></body></html>";
        let data = br#"{"name": "FFI"}"#;
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            motto_render_pdf(
                template.as_ptr(),
                template.len() as u32,
                data.as_ptr(),
                data.len() as u32,
                &mut out_buf,
                &mut out_len,
            )
        };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        assert!(out_len > 100);

        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");

        unsafe { motto_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_render_without_data() {
        let template = b"<p>static</p>";
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            motto_render_pdf(
                template.as_ptr(),
                template.len() as u32,
                ptr::null(),
                0,
                &mut out_buf,
                &mut out_len,
            )
        };

        assert_eq!(rc, 0);
        unsafe { motto_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            motto_render_pdf(ptr::null(), 0, ptr::null(), 0, &mut out_buf, &mut out_len)
        };

        assert_eq!(rc, 1);
        assert!(out_buf.is_null());
    }

    #[test]
    fn ffi_invalid_utf8() {
        let template = [0xff, 0xfe];
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            motto_render_pdf(template.as_ptr(), 2, ptr::null(), 0, &mut out_buf, &mut out_len)
        };

        assert_eq!(rc, 2);
        assert!(last_error().contains("UTF-8"));
    }

    #[test]
    fn ffi_bad_data_and_template() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let template = b"<p>{{x}}</p>";
        let data = b"[1, 2]";
        let rc = unsafe {
            motto_render_pdf(
                template.as_ptr(),
                template.len() as u32,
                data.as_ptr(),
                data.len() as u32,
                &mut out_buf,
                &mut out_len,
            )
        };
        assert_eq!(rc, 3);

        let broken = b"{{#each rows}}";
        let rc = unsafe {
            motto_render_pdf(
                broken.as_ptr(),
                broken.len() as u32,
                ptr::null(),
                0,
                &mut out_buf,
                &mut out_len,
            )
        };
        assert_eq!(rc, 3);
        assert!(last_error().contains("template"));
    }

    #[test]
    fn ffi_add_missing_font() {
        let path = CString::new("/definitely/not/here.ttf").unwrap();
        let rc = unsafe { motto_add_font(path.as_ptr()) };
        assert_eq!(rc, 3);
        assert!(last_error().starts_with("I/O error"));
        assert_eq!(unsafe { motto_add_font(ptr::null()) }, 1);
    }

    #[test]
    fn ffi_list_font_families() {
        let mut json_ptr: *mut c_char = ptr::null_mut();
        let rc = unsafe { motto_list_font_families(&mut json_ptr) };
        assert_eq!(rc, 0);
        let json = unsafe { CStr::from_ptr(json_ptr) }.to_str().unwrap();
        assert!(serde_json::from_str::<Vec<String>>(json).is_ok());
        unsafe { motto_free_string(json_ptr) };
    }

    #[test]
    fn ffi_version() {
        let v = motto_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}

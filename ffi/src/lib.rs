/*
 * lib.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte, a cross-platform email client.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Tagliacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Tagliacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! C FFI for the tagliacarte header store. A store is an opaque handle created by
//! tagliacarte_headers_new or tagliacarte_headers_parse and released with tagliacarte_headers_free.
//! All string parameters are UTF-8 NUL-terminated. Functions returning c_int return 0 on
//! success and -1 on error (see tagliacarte_headers_last_error).

use libc::{c_char, c_int, c_void, size_t};
use once_cell::sync::OnceCell;
use std::ffi::{CStr, CString};
use std::ptr;
use tagliacarte_headers::{HeaderConfig, HeaderStore};

/// Opaque store handle. Keeps the continuation state for tagliacarte_headers_add_line.
pub struct TagliacarteHeaders {
    store: HeaderStore,
    last_header_name: Option<String>,
}

/// Callback for tagliacarte_headers_foreach: name, value, user_data.
type OnHeader = extern "C" fn(*const c_char, *const c_char, *mut c_void);

/// Process-wide settings, set at most once by tagliacarte_headers_configure.
static CONFIG: OnceCell<HeaderConfig> = OnceCell::new();

fn config() -> HeaderConfig {
    CONFIG.get().copied().unwrap_or_default()
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
}

fn set_last_error(msg: impl Into<String>) {
    let msg = CString::new(msg.into()).unwrap_or_else(|_| CString::new("(error)").unwrap());
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn ptr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok() }
}

/// String param that must be present; records last error otherwise.
fn required_str<'a>(ptr: *const c_char, what: &str) -> Option<&'a str> {
    let s = ptr_to_str(ptr);
    if s.is_none() {
        set_last_error(format!("{} is null or not valid UTF-8", what));
    }
    s
}

fn handle_mut<'a>(h: *mut TagliacarteHeaders) -> Option<&'a mut TagliacarteHeaders> {
    if h.is_null() {
        set_last_error("header store handle is null");
        return None;
    }
    Some(unsafe { &mut *h })
}

fn handle_ref<'a>(h: *const TagliacarteHeaders) -> Option<&'a TagliacarteHeaders> {
    if h.is_null() {
        set_last_error("header store handle is null");
        return None;
    }
    Some(unsafe { &*h })
}

fn into_c_string(s: &str) -> *mut c_char {
    // Header values parsed from bytes may contain NUL; cut there.
    let s = s.split('\0').next().unwrap_or("");
    CString::new(s).map(CString::into_raw).unwrap_or(ptr::null_mut())
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn tagliacarte_headers_version() -> *const c_char {
    b"0.1.0\0".as_ptr() as *const c_char
}

/// Last error message from a failed call on this thread. Valid until next FFI call. Do not free.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Set process-wide store settings from JSON (e.g. {"space_after_colon": true}).
/// Only the first successful call takes effect; later calls fail.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_configure(json: *const c_char) -> c_int {
    clear_last_error();
    let Some(json) = required_str(json, "json") else {
        return -1;
    };
    let parsed = match HeaderConfig::from_json(json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(format!("invalid header config: {}", e));
            return -1;
        }
    };
    if CONFIG.set(parsed).is_err() {
        set_last_error("header config already set");
        return -1;
    }
    0
}

/// New empty store with the RFC 822 fields pre-registered (unless configured otherwise).
#[no_mangle]
pub extern "C" fn tagliacarte_headers_new() -> *mut TagliacarteHeaders {
    clear_last_error();
    Box::into_raw(Box::new(TagliacarteHeaders {
        store: HeaderStore::with_config(config()),
        last_header_name: None,
    }))
}

/// Parse the header block at the start of data. If body_offset is non-NULL it receives the
/// offset of the first body byte. Returns NULL only if data is NULL with non-zero len.
#[no_mangle]
pub unsafe extern "C" fn tagliacarte_headers_parse(
    data: *const u8,
    data_len: size_t,
    body_offset: *mut size_t,
) -> *mut TagliacarteHeaders {
    clear_last_error();
    if data.is_null() && data_len > 0 {
        set_last_error("data is null");
        return ptr::null_mut();
    }
    let raw: &[u8] = if data_len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(data, data_len)
    };
    let cfg = HeaderConfig {
        canonical_order: false,
        ..config()
    };
    let (store, consumed) = HeaderStore::parse_with_config(raw, cfg);
    if !body_offset.is_null() {
        *body_offset = consumed;
    }
    Box::into_raw(Box::new(TagliacarteHeaders {
        store,
        last_header_name: None,
    }))
}

/// Free a store. No-op if h is NULL.
#[no_mangle]
pub unsafe extern "C" fn tagliacarte_headers_free(h: *mut TagliacarteHeaders) {
    if !h.is_null() {
        let _ = Box::from_raw(h);
    }
}

/// Append a value for name.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_add(
    h: *mut TagliacarteHeaders,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    clear_last_error();
    let Some(h) = handle_mut(h) else { return -1 };
    let Some(name) = required_str(name, "name") else { return -1 };
    let Some(value) = required_str(value, "value") else { return -1 };
    h.store.add_header(name, value);
    0
}

/// Replace all values for name with value.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_set(
    h: *mut TagliacarteHeaders,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    clear_last_error();
    let Some(h) = handle_mut(h) else { return -1 };
    let Some(name) = required_str(name, "name") else { return -1 };
    let Some(value) = required_str(value, "value") else { return -1 };
    h.store.set_header(name, value);
    0
}

/// Remove all values for name. Unknown names are not an error.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_remove(h: *mut TagliacarteHeaders, name: *const c_char) -> c_int {
    clear_last_error();
    let Some(h) = handle_mut(h) else { return -1 };
    let Some(name) = required_str(name, "name") else { return -1 };
    h.store.remove_header(name);
    0
}

/// Add one raw header line (no CRLF). Lines starting with whitespace continue the header
/// added by the previous call on this handle.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_add_line(h: *mut TagliacarteHeaders, line: *const c_char) -> c_int {
    clear_last_error();
    let Some(h) = handle_mut(h) else { return -1 };
    let Some(line) = required_str(line, "line") else { return -1 };
    let mut session = h.store.resume_line_session(h.last_header_name.take());
    session.add_header_line(line);
    h.last_header_name = session.finish();
    0
}

/// Values for name joined with delimiter (NULL delimiter: first value only). Returns a newly
/// allocated string (free with tagliacarte_headers_free_string), or NULL if name was never
/// registered (last error stays clear) or on error.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_get(
    h: *const TagliacarteHeaders,
    name: *const c_char,
    delimiter: *const c_char,
) -> *mut c_char {
    clear_last_error();
    let Some(h) = handle_ref(h) else { return ptr::null_mut() };
    let Some(name) = required_str(name, "name") else { return ptr::null_mut() };
    let delimiter = if delimiter.is_null() {
        None
    } else {
        let Some(d) = required_str(delimiter, "delimiter") else { return ptr::null_mut() };
        Some(d)
    };
    match h.store.get_header_joined(name, delimiter) {
        Some(v) => into_c_string(&v),
        None => ptr::null_mut(),
    }
}

/// Number of header fields in the store.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_count(h: *const TagliacarteHeaders) -> size_t {
    handle_ref(h).map(|h| h.store.len()).unwrap_or(0)
}

/// Call on_header for every header in store order. Strings are valid only during the callback.
#[no_mangle]
pub extern "C" fn tagliacarte_headers_foreach(
    h: *const TagliacarteHeaders,
    on_header: OnHeader,
    user_data: *mut c_void,
) -> c_int {
    clear_last_error();
    let Some(h) = handle_ref(h) else { return -1 };
    for header in h.store.all_headers() {
        let name = CString::new(header.name().replace('\0', "")).unwrap_or_default();
        let value = CString::new(header.value().replace('\0', "")).unwrap_or_default();
        on_header(name.as_ptr(), value.as_ptr(), user_data);
    }
    0
}

/// Serialize the store as `Name:Value` CRLF lines, skipping the ignore_len names in ignore
/// (may be NULL when ignore_len is 0). Writes the length to out_len and returns a buffer to
/// free with tagliacarte_headers_free_bytes, or NULL on error.
#[no_mangle]
pub unsafe extern "C" fn tagliacarte_headers_serialize(
    h: *const TagliacarteHeaders,
    ignore: *const *const c_char,
    ignore_len: size_t,
    out_len: *mut size_t,
) -> *mut u8 {
    clear_last_error();
    let Some(h) = handle_ref(h) else { return ptr::null_mut() };
    if out_len.is_null() {
        set_last_error("out_len is null");
        return ptr::null_mut();
    }
    let mut names: Vec<&str> = Vec::with_capacity(ignore_len);
    if ignore_len > 0 {
        if ignore.is_null() {
            set_last_error("ignore is null");
            return ptr::null_mut();
        }
        for &p in std::slice::from_raw_parts(ignore, ignore_len) {
            let Some(name) = required_str(p, "ignore entry") else {
                return ptr::null_mut();
            };
            names.push(name);
        }
    }
    let bytes = h.store.to_bytes(&names).to_vec().into_boxed_slice();
    *out_len = bytes.len();
    Box::into_raw(bytes) as *mut u8
}

/// Free a buffer returned by tagliacarte_headers_serialize. No-op if ptr is NULL.
#[no_mangle]
pub unsafe extern "C" fn tagliacarte_headers_free_bytes(ptr: *mut u8, len: size_t) {
    if !ptr.is_null() {
        let _ = Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len));
    }
}

/// Free a string returned by tagliacarte_headers_get. No-op if ptr is NULL.
#[no_mangle]
pub unsafe extern "C" fn tagliacarte_headers_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take_string(p: *mut c_char) -> Option<String> {
        if p.is_null() {
            return None;
        }
        let s = CStr::from_ptr(p).to_string_lossy().into_owned();
        tagliacarte_headers_free_string(p);
        Some(s)
    }

    #[test]
    fn parse_get_and_body_offset() {
        let raw = b"To: a@x\r\nTo: b@x\r\nSubject: Hi\r\n there\r\n\r\nbody";
        let mut offset: size_t = 0;
        unsafe {
            let h = tagliacarte_headers_parse(raw.as_ptr(), raw.len(), &mut offset);
            assert!(!h.is_null());
            assert_eq!(&raw[offset..], b"body");
            let sep = c(", ");
            let to = take_string(tagliacarte_headers_get(h, c("to").as_ptr(), sep.as_ptr()));
            assert_eq!(to.as_deref(), Some("a@x, b@x"));
            let first = take_string(tagliacarte_headers_get(h, c("TO").as_ptr(), ptr::null()));
            assert_eq!(first.as_deref(), Some("a@x"));
            let subject = take_string(tagliacarte_headers_get(h, c("subject").as_ptr(), ptr::null()));
            assert_eq!(subject.as_deref(), Some("Hithere"));
            assert!(tagliacarte_headers_get(h, c("date").as_ptr(), ptr::null()).is_null());
            assert!(tagliacarte_headers_last_error().is_null());
            assert_eq!(tagliacarte_headers_count(h), 3);
            tagliacarte_headers_free(h);
        }
    }

    #[test]
    fn mutate_and_serialize() {
        unsafe {
            let h = tagliacarte_headers_new();
            assert_eq!(tagliacarte_headers_add(h, c("Subject").as_ptr(), c("s").as_ptr()), 0);
            assert_eq!(tagliacarte_headers_add(h, c("Date").as_ptr(), c("d").as_ptr()), 0);
            assert_eq!(tagliacarte_headers_add(h, c("Bcc").as_ptr(), c("x@y").as_ptr()), 0);
            assert_eq!(tagliacarte_headers_set(h, c("subject").as_ptr(), c("t").as_ptr()), 0);
            assert_eq!(tagliacarte_headers_remove(h, c("Unknown").as_ptr()), 0);
            let bcc = c("bcc");
            let ignore = [bcc.as_ptr()];
            let mut len: size_t = 0;
            let buf = tagliacarte_headers_serialize(h, ignore.as_ptr(), 1, &mut len);
            assert!(!buf.is_null());
            assert_eq!(std::slice::from_raw_parts(buf, len), b"Date:d\r\nsubject:t\r\n");
            tagliacarte_headers_free_bytes(buf, len);
            tagliacarte_headers_free(h);
        }
    }

    #[test]
    fn add_line_folds_continuations_per_handle() {
        unsafe {
            let h = tagliacarte_headers_new();
            assert_eq!(tagliacarte_headers_add_line(h, c("Subject: Hello").as_ptr()), 0);
            assert_eq!(tagliacarte_headers_add_line(h, c(" World").as_ptr()), 0);
            let s = take_string(tagliacarte_headers_get(h, c("subject").as_ptr(), ptr::null()));
            assert_eq!(s.as_deref(), Some("HelloWorld"));
            tagliacarte_headers_free(h);
        }
    }

    extern "C" fn collect(name: *const c_char, value: *const c_char, user_data: *mut c_void) {
        let out = unsafe { &mut *(user_data as *mut Vec<String>) };
        let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
        let value = unsafe { CStr::from_ptr(value) }.to_string_lossy();
        out.push(format!("{}={}", name, value));
    }

    #[test]
    fn foreach_visits_headers_in_order() {
        let raw = b"B: 2\r\nA: 1\r\nB: 3\r\n\r\n";
        let mut seen: Vec<String> = Vec::new();
        unsafe {
            let h = tagliacarte_headers_parse(raw.as_ptr(), raw.len(), ptr::null_mut());
            let rc = tagliacarte_headers_foreach(h, collect, &mut seen as *mut Vec<String> as *mut c_void);
            assert_eq!(rc, 0);
            tagliacarte_headers_free(h);
        }
        assert_eq!(seen, vec!["B=2", "B=3", "A=1"]);
    }

    #[test]
    fn null_arguments_set_last_error() {
        unsafe {
            assert_eq!(tagliacarte_headers_add(ptr::null_mut(), c("A").as_ptr(), c("1").as_ptr()), -1);
            let err = CStr::from_ptr(tagliacarte_headers_last_error()).to_string_lossy().into_owned();
            assert_eq!(err, "header store handle is null");

            let h = tagliacarte_headers_new();
            assert_eq!(tagliacarte_headers_set(h, ptr::null(), c("1").as_ptr()), -1);
            let err = CStr::from_ptr(tagliacarte_headers_last_error()).to_string_lossy().into_owned();
            assert_eq!(err, "name is null or not valid UTF-8");
            tagliacarte_headers_free(h);
        }
    }

    #[test]
    fn invalid_delimiter_is_an_error() {
        let raw = b"To: a@x\r\nTo: b@x\r\n\r\n";
        let bad = [0xffu8, 0];
        unsafe {
            let h = tagliacarte_headers_parse(raw.as_ptr(), raw.len(), ptr::null_mut());
            let v = tagliacarte_headers_get(h, c("to").as_ptr(), bad.as_ptr() as *const c_char);
            assert!(v.is_null());
            let err = CStr::from_ptr(tagliacarte_headers_last_error()).to_string_lossy().into_owned();
            assert_eq!(err, "delimiter is null or not valid UTF-8");
            tagliacarte_headers_free(h);
        }
    }

    #[test]
    fn parse_skips_line_without_colon() {
        let raw = b"Bogus\r\n\r\nBody: x\r\n";
        let mut offset: size_t = 0;
        unsafe {
            let h = tagliacarte_headers_parse(raw.as_ptr(), raw.len(), &mut offset);
            assert_eq!(tagliacarte_headers_count(h), 0);
            assert_eq!(&raw[offset..], b"Body: x\r\n");
            tagliacarte_headers_free(h);
        }
    }

    #[test]
    fn configure_rejects_bad_json() {
        assert_eq!(tagliacarte_headers_configure(c("not json").as_ptr()), -1);
        assert!(!tagliacarte_headers_last_error().is_null());
    }
}

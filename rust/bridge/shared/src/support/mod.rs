//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::ffi::{c_char, CStr};

use crate::jni::BridgeLayerError;

/// Produces a human-readable message from a caught panic payload.
#[allow(clippy::borrowed_box)]
pub fn describe_panic(any: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = any.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.to_string()
    } else {
        "(break on rust_panic to debug)".to_string()
    }
}

/// Borrows a NUL-terminated UTF-8 string passed in from host B.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer that outlives `'a`.
pub unsafe fn c_str_arg<'a>(
    ptr: *const c_char,
    name: &'static str,
) -> Result<&'a str, BridgeLayerError> {
    if ptr.is_null() {
        return Err(BridgeLayerError::NullPointer(Some(name)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| BridgeLayerError::BadArgument(format!("{name} is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn describes_string_panics() {
        let payload = std::panic::catch_unwind(|| panic!("{}", String::from("owned"))).unwrap_err();
        assert_eq!(describe_panic(&payload), "owned");

        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(describe_panic(&payload), "static");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(17)).unwrap_err();
        assert_eq!(describe_panic(&payload), "(break on rust_panic to debug)");
    }

    #[test]
    fn c_str_arg_borrows_utf8() {
        let name = c"java/lang/String";
        let borrowed = unsafe { c_str_arg(name.as_ptr(), "name") }.expect("valid");
        assert_eq!(borrowed, "java/lang/String");
    }

    #[test]
    fn c_str_arg_rejects_null() {
        assert_matches!(
            unsafe { c_str_arg(std::ptr::null(), "signature") },
            Err(BridgeLayerError::NullPointer(Some("signature")))
        );
    }

    #[test]
    fn c_str_arg_rejects_invalid_utf8() {
        let bytes = b"caf\xe9\0";
        assert_matches!(
            unsafe { c_str_arg(bytes.as_ptr().cast(), "className") },
            Err(BridgeLayerError::BadArgument(message)) if message.starts_with("className")
        );
    }
}

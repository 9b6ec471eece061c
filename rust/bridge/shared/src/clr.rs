//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Entering host B.

use std::path::{Path, PathBuf};

use crate::dispatch::CallTable;
use crate::exports::{
    ConstructInstanceFn, HostExports, LookupClassFn, LookupMethodFn, ResolveReturnTypeFn,
};
use crate::jni::JicError;

/// Host B's entry point. Receives the exported functions in this order and runs to completion.
pub type ClrMainFn = unsafe extern "C" fn(
    LookupClassFn,
    ConstructInstanceFn,
    LookupMethodFn,
    *const CallTable,
    ResolveReturnTypeFn,
);

/// The symbol host B's library exports [`ClrMainFn`] under.
pub const CLR_ENTRY_POINT: &[u8] = b"ClrMain\0";

/// Something that can hand the exported functions to host B.
pub trait HostBootstrap {
    fn enter(&self, exports: &HostExports) -> Result<(), JicError>;
}

/// A host B entry point that is already linked into the process.
#[derive(Clone, Copy, Debug)]
pub struct LinkedEntryPoint(pub ClrMainFn);

impl HostBootstrap for LinkedEntryPoint {
    fn enter(&self, exports: &HostExports) -> Result<(), JicError> {
        // SAFETY: the caller vouched for the function when constructing this value.
        unsafe { enter_with(self.0, exports) };
        Ok(())
    }
}

unsafe fn enter_with(entry: ClrMainFn, exports: &HostExports) {
    entry(
        exports.lookup_class,
        exports.construct_instance,
        exports.lookup_method,
        exports.call_table,
        exports.resolve_return_type,
    )
}

/// Host B's native library, loaded from disk.
#[derive(Debug)]
pub struct ClrLibrary {
    path: PathBuf,
    entry: ClrMainFn,
    // Keeps `entry` mapped.
    _library: libloading::Library,
}

impl ClrLibrary {
    /// Loads the library at `path` (bare file names use the platform search path) and resolves
    /// its [`CLR_ENTRY_POINT`].
    pub fn load(path: &Path) -> Result<Self, JicError> {
        let load_error = |source| JicError::ClrLibrary {
            path: path.to_owned(),
            source,
        };
        // SAFETY: loading a library runs its initializers; host B's library is trusted.
        let library = unsafe { libloading::Library::new(path) }.map_err(load_error)?;
        // SAFETY: ClrMainFn is the entry point's documented signature.
        let entry = unsafe { library.get::<ClrMainFn>(CLR_ENTRY_POINT) }
            .map(|symbol| *symbol)
            .map_err(load_error)?;
        log::info!("loaded host runtime library {}", path.display());
        Ok(Self {
            path: path.to_owned(),
            entry,
            _library: library,
        })
    }
}

impl HostBootstrap for ClrLibrary {
    fn enter(&self, exports: &HostExports) -> Result<(), JicError> {
        log::debug!("entering {}", self.path.display());
        // SAFETY: `entry` was resolved from the still-loaded library.
        unsafe { enter_with(self.entry, exports) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::c_char;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use jni::sys::{jclass, jint, jmethodID, jobject, jvalue};

    use super::*;
    use crate::dispatch::CALL_TABLE;

    static RECEIVED_TABLE: AtomicUsize = AtomicUsize::new(0);
    static RECEIVED_RESOLVER: AtomicUsize = AtomicUsize::new(0);
    static RECEIVED_LOOKUP_CLASS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn fake_clr_main(
        lookup_class: unsafe extern "C" fn(*const c_char) -> jclass,
        _construct_instance: unsafe extern "C" fn(jclass, jmethodID, jint, *const jvalue) -> jobject,
        _lookup_method: unsafe extern "C" fn(
            jclass,
            *const c_char,
            *const c_char,
            *const c_char,
        ) -> jmethodID,
        call_table: *const CallTable,
        resolve_return_type: unsafe extern "C" fn(
            *const c_char,
            *const c_char,
            *const c_char,
        ) -> *mut c_char,
    ) {
        RECEIVED_LOOKUP_CLASS.store(lookup_class as usize, Ordering::SeqCst);
        RECEIVED_TABLE.store(call_table as usize, Ordering::SeqCst);
        RECEIVED_RESOLVER.store(resolve_return_type as usize, Ordering::SeqCst);
    }

    #[test]
    fn linked_entry_point_receives_exports_in_order() {
        let exports = HostExports::new();
        LinkedEntryPoint(fake_clr_main)
            .enter(&exports)
            .expect("fake entry point cannot fail");
        assert_eq!(
            RECEIVED_TABLE.load(Ordering::SeqCst),
            &CALL_TABLE as *const CallTable as usize
        );
        assert_eq!(
            RECEIVED_LOOKUP_CLASS.load(Ordering::SeqCst),
            exports.lookup_class as usize
        );
        assert_eq!(
            RECEIVED_RESOLVER.load(Ordering::SeqCst),
            exports.resolve_return_type as usize
        );
    }

    #[test]
    fn missing_library_is_reported_with_its_path() {
        let path = Path::new("/nonexistent/libJICNE-missing.so");
        assert_matches!(
            ClrLibrary::load(path),
            Err(JicError::ClrLibrary { path: p, .. }) if p == path
        );
    }
}

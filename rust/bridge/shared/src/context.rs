//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Process-wide bridge state.
//!
//! Host B calls the exported functions through bare C function pointers, so they have nowhere to
//! carry a context argument. Instead the state captured at initialization lives in a single global
//! slot, installed once by `clrMain`.

use std::panic::UnwindSafe;
use std::sync::Arc;

use jni::JavaVM;
use parking_lot::RwLock;

use crate::config::BridgeConfig;
use crate::jni::*;
use crate::resolve::{CachedSignatureMethod, JvmSignatureOracle};

/// Everything the exported functions need from host A.
pub struct BridgeContext {
    vm: JavaVM,
    signature_method: CachedSignatureMethod,
}

impl BridgeContext {
    pub fn new(env: &mut JNIEnv<'_>, config: &BridgeConfig) -> Result<Self, BridgeLayerError> {
        let vm = env.get_java_vm().expect_no_exceptions()?;
        let signature_method =
            CachedSignatureMethod::new(env, ClassName(&config.oracle_class))?;
        Ok(Self {
            vm,
            signature_method,
        })
    }

    /// The environment of the calling thread, which must already be attached to the JVM.
    ///
    /// Host B only calls back into the bridge from within `ClrMain`, i.e. on a thread the JVM
    /// entered the bridge on.
    pub fn env(&self) -> Result<JNIEnv<'_>, BridgeLayerError> {
        self.vm.get_env().expect_no_exceptions()
    }

    pub fn signature_oracle<'a, 'local>(
        &'a self,
        env: &'a mut JNIEnv<'local>,
    ) -> JvmSignatureOracle<'a, 'local> {
        JvmSignatureOracle::new(env, &self.signature_method)
    }
}

/// A slot that can hold one value at a time, shared by every thread.
pub struct InstallSlot<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> InstallSlot<T> {
    pub const fn new() -> Self {
        Self {
            slot: parking_lot::const_rwlock(None),
        }
    }

    /// Fails with [`BridgeLayerError::AlreadyInitialized`] if a value is already installed.
    pub fn install(&self, value: T) -> Result<Arc<T>, BridgeLayerError> {
        let mut slot = self.slot.write();
        if slot.is_some() {
            return Err(BridgeLayerError::AlreadyInitialized);
        }
        let value = Arc::new(value);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    pub fn get(&self) -> Result<Arc<T>, BridgeLayerError> {
        self.slot
            .read()
            .clone()
            .ok_or(BridgeLayerError::NotInitialized)
    }

    /// Clears the slot. Holders of the old value keep it alive until they drop it.
    pub fn uninstall(&self) -> Option<Arc<T>> {
        self.slot.write().take()
    }
}

impl<T> Default for InstallSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

static INSTALLED: InstallSlot<BridgeContext> = InstallSlot::new();

pub fn install(context: BridgeContext) -> Result<Arc<BridgeContext>, BridgeLayerError> {
    INSTALLED.install(context)
}

pub fn installed() -> Result<Arc<BridgeContext>, BridgeLayerError> {
    INSTALLED.get()
}

pub fn uninstall() -> Option<Arc<BridgeContext>> {
    let previous = INSTALLED.uninstall();
    if previous.is_some() {
        log::info!("bridge context uninstalled");
    }
    previous
}

/// Runs `f` with the installed context and the calling thread's environment.
///
/// This is the entry point for every function host B calls. Errors become pending Java exceptions
/// (see [`run_ffi_safe`]) and `R::default()` is returned. If there is no context, or no
/// environment to throw into, the failure can only be logged.
pub fn run_with_installed_context<R, F>(f: F) -> R
where
    F: FnOnce(&mut JNIEnv<'_>, &BridgeContext) -> Result<R, JicError> + UnwindSafe,
    R: Default,
{
    let context = match installed() {
        Ok(context) => context,
        Err(e) => {
            log::error!("{e}");
            return R::default();
        }
    };
    let mut env = match context.env() {
        Ok(env) => env,
        Err(e) => {
            log::error!("cannot call into the JVM from this thread: {e}");
            return R::default();
        }
    };
    run_ffi_safe(&mut env, |env| f(env, &context))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn install_once() {
        let slot = InstallSlot::<u32>::new();
        assert_matches!(slot.get(), Err(BridgeLayerError::NotInitialized));

        let installed = slot.install(5).expect("first install");
        assert_eq!(*installed, 5);
        assert_eq!(*slot.get().expect("installed"), 5);

        assert_matches!(slot.install(6), Err(BridgeLayerError::AlreadyInitialized));
        assert_eq!(*slot.get().expect("still installed"), 5);
    }

    #[test]
    fn uninstall_allows_reinstall() {
        let slot = InstallSlot::<&str>::default();
        assert!(slot.uninstall().is_none());

        let first = slot.install("first").expect("install");
        let removed = slot.uninstall().expect("was installed");
        assert!(Arc::ptr_eq(&first, &removed));
        assert_matches!(slot.get(), Err(BridgeLayerError::NotInitialized));

        // Earlier holders are unaffected by the swap.
        slot.install("second").expect("reinstall");
        assert_eq!(*first, "first");
        assert_eq!(*slot.get().expect("installed"), "second");
    }

    #[test]
    fn concurrent_installs_admit_exactly_one() {
        let slot = &InstallSlot::<usize>::new();
        let successes = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| scope.spawn(move || slot.install(i).is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("no panic"))
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(successes, 1);
    }

    #[test]
    fn nothing_runs_without_a_context() {
        // No test in this crate installs a real context.
        let result: i32 = run_with_installed_context(|_env, _context| -> Result<i32, JicError> {
            panic!("must not be called")
        });
        assert_eq!(result, 0);
    }
}

//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

#![allow(clippy::missing_safety_doc)]
#![deny(clippy::unwrap_used)]

use jic_bridge::jni::*;
use jic_bridge::{initialize, BridgeConfig, ClrLibrary};
use once_cell::sync::OnceCell;

pub mod logging;

/// Host B's library, kept loaded for the rest of the process once entered.
static CLR_LIBRARY: OnceCell<ClrLibrary> = OnceCell::new();

/// Initializes the bridge and runs host B's main loop on the calling thread.
///
/// The host runtime library and the signature oracle class come from the environment (see
/// [`BridgeConfig::from_env`]). Returns when host B's entry point returns. A second call throws
/// `IllegalStateException` without entering host B again.
#[no_mangle]
pub unsafe extern "C" fn Java_me_ddayo_jic_JIC_clrMain<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    run_ffi_safe(&mut env, |env| {
        if jic_bridge::installed().is_ok() {
            return Err(BridgeLayerError::AlreadyInitialized.into());
        }
        let config = BridgeConfig::from_env();
        let library = CLR_LIBRARY.get_or_try_init(|| ClrLibrary::load(&config.clr_library))?;
        initialize(env, &config, library)
    })
}

//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//
pub use jni::objects::{AutoLocal, GlobalRef, JClass, JMethodID, JObject, JString, JThrowable};
pub use jni::sys::{jboolean, jint, jlong};
pub use jni::JNIEnv;
use jni::objects::JValue;

#[macro_use]
mod args;

mod class_lookup;
pub use class_lookup::*;

mod error;
pub use error::*;

fn exception_class_for(error: &JicError) -> ClassName<'static> {
    match error {
        JicError::Bridge(BridgeLayerError::NotInitialized)
        | JicError::Bridge(BridgeLayerError::AlreadyInitialized)
        | JicError::Bridge(BridgeLayerError::OracleUnavailable(_)) => {
            ClassName("java.lang.IllegalStateException")
        }
        JicError::Bridge(BridgeLayerError::NullPointer(_)) => {
            ClassName("java.lang.NullPointerException")
        }
        JicError::Bridge(BridgeLayerError::BadArgument(_))
        | JicError::Bridge(BridgeLayerError::BadDescriptor(_)) => {
            ClassName("java.lang.IllegalArgumentException")
        }
        JicError::ClrLibrary { .. } => ClassName("java.lang.UnsatisfiedLinkError"),
        JicError::Bridge(BridgeLayerError::UnexpectedPanic(_))
        | JicError::Bridge(BridgeLayerError::UnexpectedJniResultType(_, _)) => {
            ClassName("java.lang.AssertionError")
        }
        JicError::Bridge(BridgeLayerError::Jni(_))
        | JicError::Bridge(BridgeLayerError::CallbackException(_, _)) => {
            ClassName("java.lang.RuntimeException")
        }
    }
}

fn new_throwable<'env>(
    env: &mut JNIEnv<'env>,
    error: &JicError,
) -> Result<JThrowable<'env>, BridgeLayerError> {
    let class_name = exception_class_for(error);
    let message = env
        .new_string(error.to_string())
        .check_exceptions(env, "throw_error")?;
    let message = AutoLocal::new(message, env);
    let class = AutoLocal::new(find_platform_class(env, class_name)?, env);
    // java.lang.AssertionError has no String constructor, only Object.
    let signature = if class_name.0 == "java.lang.AssertionError" {
        jni_signature!((java.lang.Object) -> void)
    } else {
        jni_signature!((java.lang.String) -> void)
    };
    let throwable = env
        .new_object(&*class, signature, &[JValue::Object(&message)])
        .check_exceptions(env, class_name.0)?;
    Ok(throwable.into())
}

/// Translates errors into Java exceptions.
///
/// Exceptions thrown by Java code the bridge called will be rethrown, as will an exception that is
/// still pending; all other errors will be mapped to an appropriate Java exception class and
/// thrown.
fn throw_error(env: &mut JNIEnv, error: JicError) {
    if env.exception_check().unwrap_or(false) {
        log::warn!("leaving pending Java exception in place of: {error}");
        return;
    }

    let throwable = match &error {
        JicError::Bridge(BridgeLayerError::CallbackException(_, exception)) => env
            .new_local_ref(exception.as_obj())
            .expect_no_exceptions()
            .map(JThrowable::from),
        _ => new_throwable(env, &error),
    };

    match throwable {
        Err(failure) => log::error!("failed to create exception for {}: {}", error, failure),
        Ok(throwable) => {
            // The pending exception keeps the throwable alive; the local is no longer needed.
            let throwable = AutoLocal::new(throwable, env);
            if let Err(failure) = env.throw(&throwable) {
                log::error!("failed to throw exception for {}: {}", error, failure);
            }
        }
    }
}

/// Runs `f`, converting errors and panics into Java exceptions.
///
/// On failure the default value of `R` is returned (null for references, zero for primitives), so
/// host A or host B sees a sentinel while the JVM sees a pending exception.
#[inline(always)]
pub fn run_ffi_safe<'local, F, R>(env: &mut JNIEnv<'local>, f: F) -> R
where
    F: for<'a> FnOnce(&'a mut JNIEnv<'local>) -> Result<R, JicError> + std::panic::UnwindSafe,
    R: Default,
{
    // This AssertUnwindSafe is not technically safe.
    // If we get a panic downstream, it is entirely possible the Java environment won't be usable anymore.
    // But if that's the case, we've got bigger problems!
    // So if we want to catch panics, we have to allow this.
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(env))) {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            throw_error(env, e);
            R::default()
        }
        Err(r) => {
            throw_error(env, BridgeLayerError::UnexpectedPanic(r).into());
            R::default()
        }
    }
}

//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Class, method, and instance lookups on behalf of host B.

use jni::sys::jvalue;

use crate::jni::*;

/// Throwables that `GetMethodID` uses to report a method that does not exist.
const METHOD_NOT_FOUND: [ClassName<'static>; 1] = [ClassName("java.lang.NoSuchMethodError")];

/// Looks up a class by binary (`java.lang.String`) or JNI (`java/lang/String`) name.
///
/// A missing class is `Ok(None)` and leaves no exception pending.
pub fn lookup_class<'local>(
    env: &mut JNIEnv<'local>,
    name: &str,
) -> Result<Option<JClass<'local>>, BridgeLayerError> {
    log::debug!("looking up class {name}");
    find_class(env, ClassName(name))
}

/// Looks up an instance method on `class`.
///
/// `class_name` is only used for diagnostics; `class` alone determines where the method is found.
/// A missing method is `Ok(None)` and leaves no exception pending.
pub fn lookup_method(
    env: &mut JNIEnv<'_>,
    class: &JClass<'_>,
    class_name: &str,
    name: &str,
    signature: &str,
) -> Result<Option<JMethodID>, BridgeLayerError> {
    if class.is_null() {
        return Err(BridgeLayerError::NullPointer(Some("class")));
    }
    log::trace!("looking up {class_name}.{name}{signature}");
    match env
        .get_method_id(class, name, signature)
        .check_exceptions(env, "GetMethodID")
    {
        Ok(method) => Ok(Some(method)),
        Err(BridgeLayerError::CallbackException(context, exception)) => {
            if exception.is_instance_of_any(env, &METHOD_NOT_FOUND)? {
                log::debug!("no method {class_name}.{name}{signature}");
                Ok(None)
            } else {
                Err(BridgeLayerError::CallbackException(context, exception))
            }
        }
        Err(BridgeLayerError::Jni(jni::errors::Error::MethodNotFound { .. })) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Runs `constructor` on a fresh instance of `class`.
///
/// Any exception the constructor throws is returned as [`BridgeLayerError::CallbackException`].
///
/// # Safety
///
/// `constructor` must be a constructor of `class`, and `args` must match its parameter types.
pub unsafe fn construct_instance<'local>(
    env: &mut JNIEnv<'local>,
    class: &JClass<'_>,
    constructor: JMethodID,
    args: &[jvalue],
) -> Result<JObject<'local>, BridgeLayerError> {
    if class.is_null() {
        return Err(BridgeLayerError::NullPointer(Some("class")));
    }
    env.new_object_unchecked(class, constructor, args)
        .check_exceptions(env, "NewObjectA")
}

//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The C-ABI functions handed to host B, and the initializer that hands them over.
//!
//! Every function here returns null or zero on failure. Unless the failure was a class or method
//! that simply does not exist, a Java exception describing it is left pending in the JVM.

use std::ffi::{c_char, CString};
use std::ptr;

use jni::sys::{jclass, jmethodID, jobject, jvalue};

use crate::accessors::{construct_instance, lookup_class, lookup_method};
use crate::clr::HostBootstrap;
use crate::config::BridgeConfig;
use crate::context::{install, run_with_installed_context, BridgeContext};
use crate::descriptor::MethodDescriptor;
use crate::dispatch::{argument_slice, method_id_from_raw, CallTable, CALL_TABLE};
use crate::jni::*;
use crate::resolve::resolve_return_type;
use crate::support::c_str_arg;

pub type LookupClassFn = unsafe extern "C" fn(*const c_char) -> jclass;
pub type ConstructInstanceFn =
    unsafe extern "C" fn(jclass, jmethodID, jint, *const jvalue) -> jobject;
pub type LookupMethodFn =
    unsafe extern "C" fn(jclass, *const c_char, *const c_char, *const c_char) -> jmethodID;
pub type ResolveReturnTypeFn =
    unsafe extern "C" fn(*const c_char, *const c_char, *const c_char) -> *mut c_char;

/// The five values host B's entry point receives.
#[derive(Clone, Copy, Debug)]
pub struct HostExports {
    pub lookup_class: LookupClassFn,
    pub construct_instance: ConstructInstanceFn,
    pub lookup_method: LookupMethodFn,
    pub call_table: *const CallTable,
    pub resolve_return_type: ResolveReturnTypeFn,
}

impl HostExports {
    pub fn new() -> Self {
        Self {
            lookup_class: jic_lookup_class,
            construct_instance: jic_construct_instance,
            lookup_method: jic_lookup_method,
            call_table: &CALL_TABLE,
            resolve_return_type: jic_resolve_return_type,
        }
    }
}

impl Default for HostExports {
    fn default() -> Self {
        Self::new()
    }
}

/// Captures the bridge state and runs host B's entry point until it returns.
///
/// Fails with [`BridgeLayerError::AlreadyInitialized`] if the bridge was initialized before.
pub fn initialize(
    env: &mut JNIEnv<'_>,
    config: &BridgeConfig,
    bootstrap: &impl HostBootstrap,
) -> Result<(), JicError> {
    let context = BridgeContext::new(env, config)?;
    install(context)?;
    log::info!("bridge initialized; entering host runtime");
    bootstrap.enter(&HostExports::new())?;
    log::info!("host runtime returned");
    Ok(())
}

/// Looks up a class by name, returning a local reference or null if it does not exist.
///
/// # Safety
///
/// `name` must be null or a NUL-terminated string.
pub unsafe extern "C" fn jic_lookup_class(name: *const c_char) -> jclass {
    run_with_installed_context(move |env, _context| {
        let name = c_str_arg(name, "class name")?;
        Ok(lookup_class(env, name)?.map(|class| JObject::from(class).into_raw()))
    })
    .unwrap_or(ptr::null_mut())
}

/// Constructs an instance of `class`, returning a local reference or null on failure.
///
/// # Safety
///
/// `class` must be a class reference, `constructor` one of its constructors, and `args` must
/// match the constructor's parameters. `args` must also hold at least `arg_count` values.
pub unsafe extern "C" fn jic_construct_instance(
    class: jclass,
    constructor: jmethodID,
    arg_count: jint,
    args: *const jvalue,
) -> jobject {
    run_with_installed_context(move |env, _context| {
        let class = JClass::from_raw(class);
        let constructor = method_id_from_raw(constructor)?;
        let args = argument_slice(arg_count, args);
        let instance = construct_instance(env, &class, constructor, args)?;
        Ok(Some(instance.into_raw()))
    })
    .unwrap_or(ptr::null_mut())
}

/// Looks up an instance method of `class`, returning null if it does not exist.
///
/// `class_name` is only used for logging.
///
/// # Safety
///
/// `class` must be a class reference; the strings must be null or NUL-terminated.
pub unsafe extern "C" fn jic_lookup_method(
    class: jclass,
    class_name: *const c_char,
    name: *const c_char,
    signature: *const c_char,
) -> jmethodID {
    run_with_installed_context(move |env, _context| {
        let class = JClass::from_raw(class);
        let class_name = if class_name.is_null() {
            "<unnamed>"
        } else {
            c_str_arg(class_name, "class name")?
        };
        let name = c_str_arg(name, "method name")?;
        let signature = c_str_arg(signature, "method signature")?;
        let method = lookup_method(env, &class, class_name, name, signature)?;
        Ok(method.map(JMethodID::into_raw))
    })
    .unwrap_or(ptr::null_mut())
}

/// Asks host A's signature oracle for a method's full descriptor.
///
/// Returns a newly allocated NUL-terminated string, or null if no method matches. The caller owns
/// the string and should release it with [`jic_descriptor_free`].
///
/// # Safety
///
/// The strings must be null or NUL-terminated.
pub unsafe extern "C" fn jic_resolve_return_type(
    class_name: *const c_char,
    method_name: *const c_char,
    signature: *const c_char,
) -> *mut c_char {
    run_with_installed_context(move |env, context| {
        let class_name = c_str_arg(class_name, "class name")?;
        let method_name = c_str_arg(method_name, "method name")?;
        let signature = c_str_arg(signature, "method signature")?;
        let mut oracle = context.signature_oracle(env);
        let descriptor = resolve_return_type(&mut oracle, class_name, method_name, signature)?;
        Ok(descriptor.map(descriptor_into_raw).transpose()?)
    })
    .unwrap_or(ptr::null_mut())
}

fn descriptor_into_raw(descriptor: MethodDescriptor) -> Result<*mut c_char, BridgeLayerError> {
    CString::new(descriptor.into_string())
        .map(CString::into_raw)
        .map_err(|e| BridgeLayerError::BadDescriptor(String::from_utf8_lossy(&e.into_vec()).into()))
}

/// Releases a descriptor returned by [`jic_resolve_return_type`]. Null is ignored.
///
/// # Safety
///
/// `descriptor` must be null or a pointer returned by `jic_resolve_return_type` that has not
/// already been freed.
#[no_mangle]
pub unsafe extern "C" fn jic_descriptor_free(descriptor: *mut c_char) {
    if !descriptor.is_null() {
        drop(CString::from_raw(descriptor));
    }
}

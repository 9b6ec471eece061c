//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Return-type resolution through host A's reflective signature oracle.

use jni::objects::{JStaticMethodID, JValue};
use jni::signature::ReturnType;

use crate::descriptor::MethodDescriptor;
use crate::jni::*;

pub const SIGNATURE_METHOD_NAME: &str = "getSignature";
pub const SIGNATURE_METHOD_SIGNATURE: &str =
    jni_signature!((java.lang.String, java.lang.String, java.lang.String) -> java.lang.String);

/// Answers "what is the descriptor of method `name` on `class_name` taking `signature`?"
///
/// `signature` lists parameter descriptors only (`ILjava/lang/String;`); the answer is a full
/// method descriptor, or an empty string when no method matches.
pub trait SignatureOracle {
    /// Returns the oracle's answer verbatim, or `None` if it answered `null`.
    fn query(
        &mut self,
        class_name: &str,
        method_name: &str,
        signature: &str,
    ) -> Result<Option<String>, BridgeLayerError>;
}

/// Resolves the declared return type of a method before any handle to it exists.
///
/// `Ok(None)` means the oracle knows no such method; `Err` means asking it failed.
pub fn resolve_return_type(
    oracle: &mut impl SignatureOracle,
    class_name: &str,
    method_name: &str,
    signature: &str,
) -> Result<Option<MethodDescriptor>, BridgeLayerError> {
    let answer = oracle.query(class_name, method_name, signature)?;
    match answer {
        Some(answer) if !answer.is_empty() => {
            log::trace!("{class_name}.{method_name}({signature}) resolved to {answer}");
            MethodDescriptor::parse(answer).map(Some)
        }
        _ => {
            log::debug!("no method {class_name}.{method_name} matching ({signature})");
            Ok(None)
        }
    }
}

/// The static `getSignature` method on the oracle class, resolved once at initialization.
#[derive(Debug)]
pub struct CachedSignatureMethod {
    class: GlobalRef,
    method: JStaticMethodID,
}

impl CachedSignatureMethod {
    pub fn new(env: &mut JNIEnv<'_>, class_name: ClassName<'_>) -> Result<Self, BridgeLayerError> {
        let class = find_class(env, class_name)?
            .ok_or_else(|| BridgeLayerError::OracleUnavailable(class_name.to_string()))?;
        let method = env
            .get_static_method_id(&class, SIGNATURE_METHOD_NAME, SIGNATURE_METHOD_SIGNATURE)
            .check_exceptions(env, SIGNATURE_METHOD_NAME)?;
        let class = env.new_global_ref(class).expect_no_exceptions()?;
        log::debug!("cached {class_name}.{SIGNATURE_METHOD_NAME}");
        Ok(Self { class, method })
    }
}

/// A [`SignatureOracle`] that calls the cached `getSignature` method.
pub struct JvmSignatureOracle<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
    method: &'a CachedSignatureMethod,
}

impl<'a, 'local> JvmSignatureOracle<'a, 'local> {
    pub fn new(env: &'a mut JNIEnv<'local>, method: &'a CachedSignatureMethod) -> Self {
        Self { env, method }
    }
}

impl SignatureOracle for JvmSignatureOracle<'_, '_> {
    fn query(
        &mut self,
        class_name: &str,
        method_name: &str,
        signature: &str,
    ) -> Result<Option<String>, BridgeLayerError> {
        let env = &mut *self.env;
        let class_name = AutoLocal::new(
            env.new_string(class_name)
                .check_exceptions(env, SIGNATURE_METHOD_NAME)?,
            env,
        );
        let method_name = AutoLocal::new(
            env.new_string(method_name)
                .check_exceptions(env, SIGNATURE_METHOD_NAME)?,
            env,
        );
        let signature = AutoLocal::new(
            env.new_string(signature)
                .check_exceptions(env, SIGNATURE_METHOD_NAME)?,
            env,
        );

        // SAFETY: the method was looked up with SIGNATURE_METHOD_SIGNATURE, which the argument
        // and return types here match.
        let result = unsafe {
            env.call_static_method_unchecked(
                &self.method.class,
                self.method.method,
                ReturnType::Object,
                &[
                    JValue::Object(&*class_name).as_jni(),
                    JValue::Object(&*method_name).as_jni(),
                    JValue::Object(&*signature).as_jni(),
                ],
            )
        };
        // The argument strings are released whether or not the call succeeded.
        drop((class_name, method_name, signature));

        let result = result.check_exceptions(env, SIGNATURE_METHOD_NAME)?;
        let type_name = result.type_name();
        let answer = result.l().map_err(|_| {
            BridgeLayerError::UnexpectedJniResultType(SIGNATURE_METHOD_NAME, type_name)
        })?;
        let answer = AutoLocal::new(JString::from(answer), env);
        if answer.is_null() {
            return Ok(None);
        }
        let answer: String = env
            .get_string(&answer)
            .check_exceptions(env, SIGNATURE_METHOD_NAME)?
            .into();
        Ok(Some(answer))
    }
}

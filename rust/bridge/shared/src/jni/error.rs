//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//
use std::fmt;
use std::path::PathBuf;

use jni::objects::{AutoLocal, GlobalRef, JObject, JString, JThrowable};
use jni::{JNIEnv, JavaVM};

use super::*;
use crate::support::describe_panic;

/// The top-level error type for when something goes wrong.
#[derive(Debug, thiserror::Error, derive_more::From)]
pub enum JicError {
    #[error("{0}")]
    Bridge(BridgeLayerError),
    #[from(skip)]
    #[error("failed to load host runtime library {}: {source}", path.display())]
    ClrLibrary {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
}

/// Subset of errors that can happen in the bridge layer.
///
/// These errors will always be converted to RuntimeExceptions or Errors, i.e. unchecked throwables,
/// except for the [`Self::CallbackException`] case, which is rethrown.
#[derive(Debug)]
pub enum BridgeLayerError {
    Jni(jni::errors::Error),
    BadArgument(String),
    BadDescriptor(String),
    UnexpectedJniResultType(&'static str, &'static str),
    NullPointer(Option<&'static str>),
    CallbackException(&'static str, ThrownException),
    NotInitialized,
    AlreadyInitialized,
    OracleUnavailable(String),
    UnexpectedPanic(std::boxed::Box<dyn std::any::Any + std::marker::Send>),
}

impl fmt::Display for BridgeLayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jni(s) => write!(f, "JNI error {}", s),
            Self::NullPointer(None) => write!(f, "unexpected null"),
            Self::NullPointer(Some(expected)) => {
                write!(f, "got null where {expected} is expected")
            }
            Self::BadArgument(m) => write!(f, "{}", m),
            Self::BadDescriptor(d) => write!(f, "malformed type descriptor '{}'", d),
            Self::UnexpectedJniResultType(m, t) => {
                write!(f, "calling {} returned unexpected type {}", m, t)
            }
            Self::CallbackException(callback_name, exception) => {
                write!(f, "exception in method call '{callback_name}': {exception}")
            }
            Self::NotInitialized => write!(f, "bridge used before clrMain initialized it"),
            Self::AlreadyInitialized => {
                write!(f, "bridge already initialized; clrMain may only run once")
            }
            Self::OracleUnavailable(class_name) => {
                write!(f, "signature oracle class {class_name} not found")
            }
            Self::UnexpectedPanic(e) => {
                write!(f, "unexpected panic: {}", describe_panic(e))
            }
        }
    }
}

impl std::error::Error for BridgeLayerError {}

/// A lifetime-less reference to a thrown Java exception that can be used as an [`Error`].
///
/// `ThrownException` allows a Java exception to be safely persisted past the lifetime of a
/// particular call.
///
/// Ideally, `ThrownException` should be Dropped on the thread the JVM is running on; see
/// [`jni::objects::GlobalRef`] for more details.
///
/// [`Error`]: std::error::Error
pub struct ThrownException {
    // GlobalRef already carries a JavaVM reference, but it's not accessible to us.
    jvm: JavaVM,
    exception_ref: GlobalRef,
}

impl ThrownException {
    /// Gets the wrapped exception as a live object with a lifetime.
    pub fn as_obj(&self) -> &JThrowable<'static> {
        self.exception_ref.as_obj().into()
    }

    /// Persists the given throwable.
    pub fn new<'a>(
        env: &JNIEnv<'a>,
        throwable: impl AsRef<JThrowable<'a>>,
    ) -> Result<Self, BridgeLayerError> {
        assert!(!throwable.as_ref().is_null());
        Ok(Self {
            jvm: env.get_java_vm().expect_no_exceptions()?,
            exception_ref: env
                .new_global_ref(throwable.as_ref())
                .expect_no_exceptions()?,
        })
    }

    /// Checks whether the exception is an instance of any of the given platform classes.
    pub fn is_instance_of_any(
        &self,
        env: &mut JNIEnv,
        class_names: &[ClassName<'static>],
    ) -> Result<bool, BridgeLayerError> {
        for &class_name in class_names {
            let class = find_platform_class(env, class_name)?;
            let matches = env
                .is_instance_of(self.exception_ref.as_obj(), &class)
                .expect_no_exceptions()?;
            env.delete_local_ref(class).expect_no_exceptions()?;
            if matches {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn class_name(&self, env: &mut JNIEnv) -> Result<String, BridgeLayerError> {
        let class_type = env
            .get_object_class(self.exception_ref.as_obj())
            .check_exceptions(env, "ThrownException::class_name")?;
        let class_name = call_no_arg_string_method(env, &class_type, "getName")?;
        env.delete_local_ref(class_type).expect_no_exceptions()?;
        Ok(class_name.unwrap_or_default())
    }

    pub fn message(&self, env: &mut JNIEnv) -> Result<Option<String>, BridgeLayerError> {
        call_no_arg_string_method(env, self.exception_ref.as_obj(), "getMessage")
    }
}

/// Calls a `String foo()` method, mapping a `null` result to `None`.
fn call_no_arg_string_method(
    env: &mut JNIEnv,
    obj: &JObject,
    fn_name: &'static str,
) -> Result<Option<String>, BridgeLayerError> {
    let result = env
        .call_method(obj, fn_name, jni_signature!(() -> java.lang.String), &[])
        .check_exceptions(env, fn_name)?;
    let type_name = result.type_name();
    let string = JString::from(
        result
            .l()
            .map_err(|_| BridgeLayerError::UnexpectedJniResultType(fn_name, type_name))?,
    );
    if string.is_null() {
        return Ok(None);
    }
    let value = env
        .get_string(&string)
        .check_exceptions(env, fn_name)?
        .into();
    env.delete_local_ref(string).expect_no_exceptions()?;
    Ok(Some(value))
}

impl fmt::Display for ThrownException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = &mut self.jvm.attach_current_thread().map_err(|_| fmt::Error)?;

        let exn_type = self.class_name(env);
        let exn_type = exn_type.as_deref().unwrap_or("<unknown>");

        if let Ok(Some(message)) = self.message(env) {
            write!(f, "exception {} \"{}\"", exn_type, message)
        } else {
            write!(f, "exception {}", exn_type)
        }
    }
}

impl fmt::Debug for ThrownException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = &mut self.jvm.attach_current_thread().map_err(|_| fmt::Error)?;

        let exn_type = self.class_name(env);
        let exn_type = exn_type.as_deref().unwrap_or("<unknown>");

        let obj_addr = **self.exception_ref.as_obj();

        if let Ok(Some(message)) = self.message(env) {
            write!(f, "exception {} ({:p}) \"{}\"", exn_type, obj_addr, message)
        } else {
            write!(f, "exception {} ({:p})", exn_type, obj_addr)
        }
    }
}

impl std::error::Error for ThrownException {}

pub trait HandleJniError<T> {
    fn check_exceptions(
        self,
        env: &mut JNIEnv<'_>,
        context: &'static str,
    ) -> Result<T, BridgeLayerError>;

    fn expect_no_exceptions(self) -> Result<T, BridgeLayerError>;
}

impl<T> HandleJniError<T> for Result<T, jni::errors::Error> {
    fn check_exceptions(
        self,
        env: &mut JNIEnv<'_>,
        context: &'static str,
    ) -> Result<T, BridgeLayerError> {
        // Do the bulk of the work in a non-generic helper function.
        fn check_error(
            e: jni::errors::Error,
            env: &mut JNIEnv<'_>,
            context: &'static str,
        ) -> BridgeLayerError {
            if matches!(e, jni::errors::Error::JavaException) {
                let throwable = match env.exception_occurred().expect_no_exceptions() {
                    Ok(throwable) => throwable,
                    Err(e) => return e,
                };
                if !throwable.is_null() {
                    if let Err(e) = env.exception_clear().expect_no_exceptions() {
                        return e;
                    }
                    // Host B's calls share one long-lived native frame, so the local must not
                    // outlive the global ref taken here.
                    let throwable = AutoLocal::new(throwable, env);
                    return match ThrownException::new(env, &*throwable) {
                        Ok(exception) => BridgeLayerError::CallbackException(context, exception),
                        Err(e) => e,
                    };
                }
                log::warn!(
                    "'{context}' produced a Java exception, but it has already been cleared from the JVM state"
                );
            }
            BridgeLayerError::Jni(e)
        }

        self.map_err(|e| check_error(e, env, context))
    }

    fn expect_no_exceptions(self) -> Result<T, BridgeLayerError> {
        self.map_err(|e| {
            assert!(
                !matches!(e, jni::errors::Error::JavaException),
                "catching Java exceptions is not supported here"
            );
            BridgeLayerError::Jni(e)
        })
    }
}

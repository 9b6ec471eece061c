//
// Copyright 2024 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//
use jni::objects::JClass;
use jni::JNIEnv;

use crate::jni::{BridgeLayerError, HandleJniError as _};

/// Wrapper type for a Java class name.
///
/// Both [binary names] (`me.ddayo.jic.JIC`) and JNI names (`me/ddayo/jic/JIC`) are accepted; host B
/// hands over the latter, while the signature oracle is keyed by the former.
///
/// [binary names]: https://docs.oracle.com/javase/8/docs/api/java/lang/ClassLoader.html#name
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ClassName<'a>(pub &'a str);

impl ClassName<'_> {
    /// The name with package separators in JNI form, as `FindClass` expects.
    pub fn to_jni_name(self) -> String {
        jni_name_from_binary_name(self)
    }
}

impl std::fmt::Display for ClassName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.0, f)
    }
}

/// Throwables that `FindClass` uses to report a class that does not exist.
const CLASS_NOT_FOUND: [ClassName<'static>; 2] = [
    ClassName("java.lang.NoClassDefFoundError"),
    ClassName("java.lang.ClassNotFoundException"),
];

/// Looks up a class by name.
///
/// A class the JVM cannot find is reported as `Ok(None)`, and the exception the JVM raised for it
/// is cleared. Any other exception (a `ClassFormatError` from a broken class file, say) is
/// returned as [`BridgeLayerError::CallbackException`].
pub fn find_class<'output>(
    env: &mut JNIEnv<'output>,
    class_name: ClassName<'_>,
) -> Result<Option<JClass<'output>>, BridgeLayerError> {
    let jni_name = class_name.to_jni_name();
    match real_jni_find_class(env, &jni_name).check_exceptions(env, "FindClass") {
        Ok(class) => Ok(Some(class)),
        Err(BridgeLayerError::CallbackException(context, exception)) => {
            if exception.is_instance_of_any(env, &CLASS_NOT_FOUND)? {
                log::debug!("class {class_name} not found");
                Ok(None)
            } else {
                Err(BridgeLayerError::CallbackException(context, exception))
            }
        }
        Err(e) => Err(e),
    }
}

/// Looks up a class that is part of the Java platform and therefore must exist.
pub fn find_platform_class<'output>(
    env: &mut JNIEnv<'output>,
    class_name: ClassName<'_>,
) -> Result<JClass<'output>, BridgeLayerError> {
    real_jni_find_class(env, &class_name.to_jni_name()).check_exceptions(env, "FindClass")
}

/// Equivalent to [`JNIEnv::find_class`].
///
/// That function is marked as disallowed because it leaves a pending exception behind when the
/// class is missing. In most cases, the [`find_class`] function in this module should be used
/// instead, since it reports a missing class as `None`.
#[allow(clippy::disallowed_methods)]
fn real_jni_find_class<'output>(
    env: &mut JNIEnv<'output>,
    name: &str,
) -> Result<JClass<'output>, jni::errors::Error> {
    env.find_class(name)
}

fn jni_name_from_binary_name(ClassName(name): ClassName<'_>) -> String {
    name.replace('.', "/")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn binary_name_conversion() {
        assert_eq!(
            &jni_name_from_binary_name(ClassName("me.ddayo.jic.JIC")),
            "me/ddayo/jic/JIC"
        );
        assert_eq!(
            &jni_name_from_binary_name(ClassName("java.util.Map$Entry")),
            "java/util/Map$Entry"
        );
    }

    #[test]
    fn jni_names_pass_through() {
        assert_eq!(
            ClassName("java/lang/StringBuilder").to_jni_name(),
            "java/lang/StringBuilder"
        );
        assert_eq!(ClassName("Unpackaged").to_jni_name(), "Unpackaged");
    }
}

//
// Copyright 2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Forwards the bridge's log records to a Java logger.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::abort;

use jic_bridge::{describe_panic, jni_signature};
use jni::objects::{AutoLocal, GlobalRef, JClass, JStaticMethodID, JValue};
use jni::sys::jint;
use jni::{JNIEnv, JavaVM};

const LOG_METHOD_NAME: &str = "logFromNative";

// Keep this in sync with the levels the Java side passes to initializeLogger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JavaLogLevel {
    Verbose = 2,
    Debug = 3,
    Info = 4,
    Warn = 5,
    Error = 6,
    Assert = 7,
}

impl JavaLogLevel {
    fn from_jint(level: jint) -> Option<Self> {
        Some(match level {
            2 => Self::Verbose,
            3 => Self::Debug,
            4 => Self::Info,
            5 => Self::Warn,
            6 => Self::Error,
            7 => Self::Assert,
            _ => return None,
        })
    }
}

impl From<log::Level> for JavaLogLevel {
    fn from(level: log::Level) -> Self {
        use log::Level::*;
        match level {
            Error => Self::Error,
            Warn => Self::Warn,
            Info => Self::Info,
            Debug => Self::Debug,
            Trace => Self::Verbose,
        }
    }
}

impl From<JavaLogLevel> for jint {
    fn from(level: JavaLogLevel) -> Self {
        level as jint
    }
}

impl From<JavaLogLevel> for log::Level {
    fn from(level: JavaLogLevel) -> Self {
        use JavaLogLevel::*;
        match level {
            Error | Assert => Self::Error,
            Warn => Self::Warn,
            Info => Self::Info,
            Debug => Self::Debug,
            Verbose => Self::Trace,
        }
    }
}

struct JniLogger {
    vm: JavaVM,
    logger_class: GlobalRef,
    logger_method: JStaticMethodID,
}

impl JniLogger {
    fn new(env: &mut JNIEnv, logger_class: &JClass) -> jni::errors::Result<Self> {
        Ok(Self {
            vm: env.get_java_vm()?,
            logger_class: env.new_global_ref(logger_class)?,
            logger_method: env.get_static_method_id(
                logger_class,
                LOG_METHOD_NAME,
                jni_signature!((int, java.lang.String) -> void),
            )?,
        })
    }

    fn log_impl(&self, record: &log::Record) -> jni::errors::Result<()> {
        // Host B calls back on the JVM's own threads, so this normally finds an attached env.
        let mut env = self.vm.attach_current_thread()?;
        let level: JavaLogLevel = record.level().into();
        let message = format!(
            "{}:{}: {}",
            record.file().unwrap_or("<unknown>"),
            record.line().unwrap_or(0),
            record.args(),
        );
        let message = AutoLocal::new(env.new_string(message)?, &env);
        let result = unsafe {
            env.call_static_method_unchecked(
                &self.logger_class,
                self.logger_method,
                jni::signature::ReturnType::Primitive(jni::signature::Primitive::Void),
                &[
                    JValue::Int(level.into()).as_jni(),
                    JValue::Object(&*message).as_jni(),
                ],
            )
        };

        // A logger that throws must not leave the exception for the code being logged.
        if env.exception_check()? {
            env.exception_clear()?;
            return Ok(());
        }
        result.map(|_| ())
    }
}

impl log::Log for JniLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        jic_bridge::logging::log_enabled_for_bridge(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if self.log_impl(record).is_err() {
            // Drop the error; it's not like we can log it!
        }
    }

    fn flush(&self) {}
}

/// A low-level version of `run_ffi_safe` that just aborts on errors.
///
/// Logging may itself happen inside `run_ffi_safe`, so a failure here cannot be reported as a
/// Java exception.
fn abort_on_panic(f: impl FnOnce()) {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|e| {
        eprintln!("fatal error: {}", describe_panic(&e));
        abort();
    });
}

fn set_max_level_from_java_level(max_level: jint) {
    match JavaLogLevel::from_jint(max_level) {
        Some(level) => log::set_max_level(log::Level::from(level).to_level_filter()),
        None => log::warn!("ignoring invalid log level {max_level}"),
    }
}

/// Installs the Java-backed logger and a panic hook that logs through it.
///
/// `logger_class` must declare `static void logFromNative(int, String)`. Later calls only log a
/// warning.
#[no_mangle]
pub unsafe extern "C" fn Java_me_ddayo_jic_JIC_initializeLogger<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    max_level: jint,
    logger_class: JClass<'local>,
) {
    abort_on_panic(|| {
        let logger = match JniLogger::new(&mut env, &logger_class) {
            Ok(logger) => logger,
            Err(e) => {
                // Leave the NoSuchMethodError (if any) for the caller.
                eprintln!("could not initialize logging: {e}");
                return;
            }
        };

        match log::set_logger(Box::leak(Box::new(logger))) {
            Ok(_) => {
                set_max_level_from_java_level(max_level);
                log::info!(
                    "Initializing jic bridge version:{}",
                    env!("CARGO_PKG_VERSION")
                );
                let backtrace_mode = {
                    cfg_if::cfg_if! {
                        if #[cfg(target_os = "android")] {
                            log_panics::BacktraceMode::Unresolved
                        } else {
                            log_panics::BacktraceMode::Resolved
                        }
                    }
                };
                log_panics::Config::new()
                    .backtrace_mode(backtrace_mode)
                    .install_panic_hook();
            }
            Err(_) => {
                log::warn!("logging already initialized for the jic bridge; ignoring later call");
            }
        }
    });
}

#[no_mangle]
pub unsafe extern "C" fn Java_me_ddayo_jic_JIC_setMaxLogLevel(
    _env: JNIEnv,
    _class: JClass,
    max_level: jint,
) {
    abort_on_panic(|| set_max_level_from_java_level(max_level));
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(2, log::Level::Trace)]
    #[test_case(3, log::Level::Debug)]
    #[test_case(4, log::Level::Info)]
    #[test_case(5, log::Level::Warn)]
    #[test_case(6, log::Level::Error)]
    #[test_case(7, log::Level::Error)]
    fn java_levels(java: jint, expected: log::Level) {
        let level = JavaLogLevel::from_jint(java).expect("valid level");
        assert_eq!(jint::from(level), java);
        assert_eq!(log::Level::from(level), expected);
    }

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(8)]
    #[test_case(-4)]
    fn invalid_java_levels(java: jint) {
        assert_eq!(JavaLogLevel::from_jint(java), None);
    }

    #[test]
    fn rust_levels_round_trip_where_lossless() {
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            assert_eq!(log::Level::from(JavaLogLevel::from(level)), level);
        }
    }
}

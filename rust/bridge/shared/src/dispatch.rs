//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Typed method invocation, and the per-return-type trampolines host B calls.
//!
//! JNI has a distinct `Call<Type>MethodA` for each return type, and host B has no way to call a
//! Rust generic. So host B is handed a [`CallTable`] of ten C-ABI functions, one per
//! [`ReturnCategory`], and picks the slot matching the descriptor it resolved earlier.

use std::ptr;

use jni::objects::JValueOwned;
use jni::sys::{jbyte, jchar, jdouble, jfloat, jmethodID, jobject, jshort, jvalue};

use crate::context::run_with_installed_context;
use crate::descriptor::ReturnCategory;
use crate::jni::*;

/// The result of calling a Java method, tagged by return category.
#[derive(Debug)]
pub enum JavaValue<'local> {
    Int(jint),
    Long(jlong),
    Boolean(bool),
    Float(jfloat),
    Byte(jbyte),
    Char(jchar),
    Double(jdouble),
    Short(jshort),
    Object(JObject<'local>),
    Void,
}

impl JavaValue<'_> {
    pub fn category(&self) -> ReturnCategory {
        match self {
            Self::Int(_) => ReturnCategory::Int,
            Self::Long(_) => ReturnCategory::Long,
            Self::Boolean(_) => ReturnCategory::Boolean,
            Self::Float(_) => ReturnCategory::Float,
            Self::Byte(_) => ReturnCategory::Byte,
            Self::Char(_) => ReturnCategory::Char,
            Self::Double(_) => ReturnCategory::Double,
            Self::Short(_) => ReturnCategory::Short,
            Self::Object(_) => ReturnCategory::Object,
            Self::Void => ReturnCategory::Void,
        }
    }
}

impl<'local> From<JValueOwned<'local>> for JavaValue<'local> {
    fn from(value: JValueOwned<'local>) -> Self {
        match value {
            JValueOwned::Object(object) => Self::Object(object),
            JValueOwned::Byte(v) => Self::Byte(v),
            JValueOwned::Char(v) => Self::Char(v),
            JValueOwned::Short(v) => Self::Short(v),
            JValueOwned::Int(v) => Self::Int(v),
            JValueOwned::Long(v) => Self::Long(v),
            JValueOwned::Bool(v) => Self::Boolean(v != 0),
            JValueOwned::Float(v) => Self::Float(v),
            JValueOwned::Double(v) => Self::Double(v),
            JValueOwned::Void => Self::Void,
        }
    }
}

/// Calls the instance method `method` on `this`, expecting a result of `category`.
///
/// An exception thrown by the method is returned as [`BridgeLayerError::CallbackException`].
///
/// # Safety
///
/// `method` must be an instance method of `this`'s class whose return type falls in `category`,
/// and `args` must match its parameter types.
pub unsafe fn invoke<'local>(
    env: &mut JNIEnv<'local>,
    this: &JObject<'_>,
    method: JMethodID,
    category: ReturnCategory,
    args: &[jvalue],
) -> Result<JavaValue<'local>, BridgeLayerError> {
    if this.is_null() {
        return Err(BridgeLayerError::NullPointer(Some("receiver")));
    }
    log::trace!("invoking {category} method with {} arguments", args.len());
    env.call_method_unchecked(this, method, category.into(), args)
        .check_exceptions(env, "Call<Type>MethodA")
        .map(JavaValue::from)
}

/// Views host B's argument array.
///
/// `arg_count` is advisory: JNI reads as many arguments as the method declares. A non-null `args`
/// is always passed through as-is, even if `arg_count` is zero or negative.
///
/// # Safety
///
/// `args` must be null or point to at least `arg_count` initialized values, and to at least as
/// many values as the target method declares. Host B owns the array; a count larger than the
/// array makes the returned slice invalid even if JNI never reads past the declared parameters.
pub(crate) unsafe fn argument_slice<'a>(arg_count: jint, args: *const jvalue) -> &'a [jvalue] {
    if args.is_null() {
        return &[];
    }
    std::slice::from_raw_parts(args, usize::try_from(arg_count).unwrap_or(0))
}

pub(crate) unsafe fn method_id_from_raw(method: jmethodID) -> Result<JMethodID, BridgeLayerError> {
    if method.is_null() {
        return Err(BridgeLayerError::NullPointer(Some("method")));
    }
    Ok(JMethodID::from_raw(method))
}

unsafe fn invoke_raw<'local>(
    env: &mut JNIEnv<'local>,
    this: jobject,
    method: jmethodID,
    category: ReturnCategory,
    arg_count: jint,
    args: *const jvalue,
) -> Result<JavaValue<'local>, BridgeLayerError> {
    let this = JObject::from_raw(this);
    let method = method_id_from_raw(method)?;
    invoke(env, &this, method, category, argument_slice(arg_count, args))
}

fn unexpected_result(category: ReturnCategory, value: &JavaValue<'_>) -> BridgeLayerError {
    BridgeLayerError::UnexpectedJniResultType(
        match category {
            ReturnCategory::Int => "CallIntMethodA",
            ReturnCategory::Long => "CallLongMethodA",
            ReturnCategory::Boolean => "CallBooleanMethodA",
            ReturnCategory::Float => "CallFloatMethodA",
            ReturnCategory::Byte => "CallByteMethodA",
            ReturnCategory::Char => "CallCharMethodA",
            ReturnCategory::Double => "CallDoubleMethodA",
            ReturnCategory::Short => "CallShortMethodA",
            ReturnCategory::Object => "CallObjectMethodA",
            ReturnCategory::Void => "CallVoidMethodA",
        },
        value.category().name(),
    )
}

/// The signature every trampoline shares: receiver, method, argument count, argument array.
pub type Trampoline<T> = unsafe extern "C" fn(jobject, jmethodID, jint, *const jvalue) -> T;

macro_rules! trampoline {
    ($(#[$meta:meta])* $name:ident -> $ret:ty, $category:ident $(($value:ident))? => $convert:expr) => {
        $(#[$meta])*
        ///
        /// On failure an exception is left pending in the JVM and a zero/null value is returned.
        ///
        /// # Safety
        ///
        /// Only host B should call this, with arguments obtained from the other exported
        /// functions. `args` must hold at least `arg_count` values and at least as many as the
        /// method declares. The method's return type must fall in this trampoline's category;
        /// nothing here checks that.
        pub unsafe extern "C" fn $name(
            this: jobject,
            method: jmethodID,
            arg_count: jint,
            args: *const jvalue,
        ) -> $ret {
            run_with_installed_context(move |env, _context| {
                let category = ReturnCategory::$category;
                match invoke_raw(env, this, method, category, arg_count, args)? {
                    JavaValue::$category $(($value))? => Ok($convert),
                    other => Err(unexpected_result(category, &other).into()),
                }
            })
        }
    };
}

trampoline!(
    /// Calls an `int`-returning method.
    call_int_method -> jint, Int(v) => v
);
trampoline!(
    /// Calls a `long`-returning method.
    call_long_method -> jlong, Long(v) => v
);
trampoline!(
    /// Calls a `boolean`-returning method.
    call_boolean_method -> jboolean, Boolean(v) => jboolean::from(v)
);
trampoline!(
    /// Calls a `float`-returning method.
    call_float_method -> jfloat, Float(v) => v
);
trampoline!(
    /// Calls a `byte`-returning method.
    call_byte_method -> jbyte, Byte(v) => v
);
trampoline!(
    /// Calls a `char`-returning method.
    call_char_method -> jchar, Char(v) => v
);
trampoline!(
    /// Calls a `double`-returning method.
    call_double_method -> jdouble, Double(v) => v
);
trampoline!(
    /// Calls a `short`-returning method.
    call_short_method -> jshort, Short(v) => v
);
trampoline!(
    /// Calls a method returning any reference type, arrays included.
    ///
    /// The result is a local reference owned by the current JVM frame.
    call_object_method -> RawObject, Object(v) => RawObject(v.into_raw())
);
trampoline!(
    /// Calls a `void` method.
    call_void_method -> (), Void => ()
);

/// A raw object reference that defaults to null, so it can be a trampoline result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct RawObject(pub jobject);

impl Default for RawObject {
    fn default() -> Self {
        Self(ptr::null_mut())
    }
}

/// The ten trampolines, laid out as host B indexes them.
///
/// The slot for each category is [`ReturnCategory::slot`].
#[derive(Debug)]
#[repr(C)]
pub struct CallTable {
    pub int: Trampoline<jint>,
    pub long: Trampoline<jlong>,
    pub boolean: Trampoline<jboolean>,
    pub float: Trampoline<jfloat>,
    pub byte: Trampoline<jbyte>,
    pub char: Trampoline<jchar>,
    pub double: Trampoline<jdouble>,
    pub short: Trampoline<jshort>,
    pub object: Trampoline<RawObject>,
    pub void: Trampoline<()>,
}

impl CallTable {
    /// The address stored in `category`'s slot.
    pub fn slot_address(&self, category: ReturnCategory) -> usize {
        match category {
            ReturnCategory::Int => self.int as usize,
            ReturnCategory::Long => self.long as usize,
            ReturnCategory::Boolean => self.boolean as usize,
            ReturnCategory::Float => self.float as usize,
            ReturnCategory::Byte => self.byte as usize,
            ReturnCategory::Char => self.char as usize,
            ReturnCategory::Double => self.double as usize,
            ReturnCategory::Short => self.short as usize,
            ReturnCategory::Object => self.object as usize,
            ReturnCategory::Void => self.void as usize,
        }
    }
}

pub static CALL_TABLE: CallTable = CallTable {
    int: call_int_method,
    long: call_long_method,
    boolean: call_boolean_method,
    float: call_float_method,
    byte: call_byte_method,
    char: call_char_method,
    double: call_double_method,
    short: call_short_method,
    object: call_object_method,
    void: call_void_method,
};

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn table_is_ten_pointers_in_category_order() {
        assert_eq!(
            std::mem::size_of::<CallTable>(),
            ReturnCategory::ALL.len() * std::mem::size_of::<usize>()
        );
        let base = &CALL_TABLE as *const CallTable as *const usize;
        for category in ReturnCategory::ALL {
            // SAFETY: CallTable is repr(C) and made up of exactly ALL.len() pointers.
            let stored = unsafe { *base.add(category.slot()) };
            assert_eq!(stored, CALL_TABLE.slot_address(category), "{category}");
        }
    }

    #[test]
    fn table_points_at_the_matching_trampolines() {
        assert_eq!(
            CALL_TABLE.slot_address(ReturnCategory::Int),
            call_int_method as usize
        );
        assert_eq!(
            CALL_TABLE.slot_address(ReturnCategory::Object),
            call_object_method as usize
        );
        assert_eq!(
            CALL_TABLE.slot_address(ReturnCategory::Void),
            call_void_method as usize
        );
    }

    #[test]
    fn trampolines_return_sentinels_before_initialization() {
        // No test in this crate installs a context, so every call fails before touching JNI.
        unsafe {
            assert_eq!(call_int_method(ptr::null_mut(), ptr::null_mut(), 0, ptr::null()), 0);
            assert_eq!(call_long_method(ptr::null_mut(), ptr::null_mut(), 0, ptr::null()), 0);
            assert_eq!(call_boolean_method(ptr::null_mut(), ptr::null_mut(), 0, ptr::null()), 0);
            assert_eq!(call_double_method(ptr::null_mut(), ptr::null_mut(), 0, ptr::null()), 0.0);
            assert_eq!(
                call_object_method(ptr::null_mut(), ptr::null_mut(), 0, ptr::null()),
                RawObject::default()
            );
            call_void_method(ptr::null_mut(), ptr::null_mut(), 0, ptr::null());
        }
    }

    #[test]
    fn argument_slice_passes_pointer_through() {
        let args = [jvalue { i: 1 }, jvalue { i: 2 }];
        let slice = unsafe { argument_slice(2, args.as_ptr()) };
        assert_eq!(slice.len(), 2);
        assert_eq!(slice.as_ptr(), args.as_ptr());

        // The count is advisory; JNI still sees host B's pointer.
        let slice = unsafe { argument_slice(0, args.as_ptr()) };
        assert!(slice.is_empty());
        assert_eq!(slice.as_ptr(), args.as_ptr());
        let slice = unsafe { argument_slice(-3, args.as_ptr()) };
        assert_eq!(slice.as_ptr(), args.as_ptr());

        assert!(unsafe { argument_slice(5, ptr::null()) }.is_empty());
    }

    #[test]
    fn null_method_is_rejected() {
        assert_matches!(
            unsafe { method_id_from_raw(ptr::null_mut()) },
            Err(BridgeLayerError::NullPointer(Some("method")))
        );
    }

    #[test]
    fn values_know_their_category() {
        assert_eq!(JavaValue::from(JValueOwned::Int(3)).category(), ReturnCategory::Int);
        assert_eq!(JavaValue::from(JValueOwned::Void).category(), ReturnCategory::Void);
        assert_matches!(
            JavaValue::from(JValueOwned::Bool(1)),
            JavaValue::Boolean(true)
        );
        assert_matches!(
            JavaValue::from(JValueOwned::Object(JObject::null())),
            JavaValue::Object(o) if o.is_null()
        );
    }
}

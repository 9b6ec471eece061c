//
// Copyright 2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! JVM type descriptors, as produced by the signature oracle.

use std::fmt;

use jni::signature::{Primitive, ReturnType};

use crate::jni::BridgeLayerError;

/// The return-type categories the call table distinguishes, in slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ReturnCategory {
    Int = 0,
    Long = 1,
    Boolean = 2,
    Float = 3,
    Byte = 4,
    Char = 5,
    Double = 6,
    Short = 7,
    Object = 8,
    Void = 9,
}

impl ReturnCategory {
    pub const ALL: [Self; 10] = [
        Self::Int,
        Self::Long,
        Self::Boolean,
        Self::Float,
        Self::Byte,
        Self::Char,
        Self::Double,
        Self::Short,
        Self::Object,
        Self::Void,
    ];

    /// Index of this category's trampoline in [`CallTable`](crate::dispatch::CallTable).
    pub fn slot(self) -> usize {
        self as usize
    }

    /// The descriptor character for this category; `L` stands for every reference type.
    pub fn descriptor_char(self) -> char {
        match self {
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Boolean => 'Z',
            Self::Float => 'F',
            Self::Byte => 'B',
            Self::Char => 'C',
            Self::Double => 'D',
            Self::Short => 'S',
            Self::Object => 'L',
            Self::Void => 'V',
        }
    }

    /// The Java keyword for this category; `object` for every reference type.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Short => "short",
            Self::Object => "object",
            Self::Void => "void",
        }
    }

    /// Classifies a single field descriptor (`I`, `Ljava/lang/String;`, `[J`, ...) or `V`.
    pub fn from_field_descriptor(descriptor: &str) -> Result<Self, BridgeLayerError> {
        let bad = || BridgeLayerError::BadDescriptor(descriptor.to_owned());
        let category = match descriptor {
            "I" => Self::Int,
            "J" => Self::Long,
            "Z" => Self::Boolean,
            "F" => Self::Float,
            "B" => Self::Byte,
            "C" => Self::Char,
            "D" => Self::Double,
            "S" => Self::Short,
            "V" => Self::Void,
            _ => {
                validate_reference(descriptor).ok_or_else(bad)?;
                Self::Object
            }
        };
        Ok(category)
    }
}

impl From<ReturnCategory> for ReturnType {
    fn from(category: ReturnCategory) -> Self {
        match category {
            ReturnCategory::Int => ReturnType::Primitive(Primitive::Int),
            ReturnCategory::Long => ReturnType::Primitive(Primitive::Long),
            ReturnCategory::Boolean => ReturnType::Primitive(Primitive::Boolean),
            ReturnCategory::Float => ReturnType::Primitive(Primitive::Float),
            ReturnCategory::Byte => ReturnType::Primitive(Primitive::Byte),
            ReturnCategory::Char => ReturnType::Primitive(Primitive::Char),
            ReturnCategory::Double => ReturnType::Primitive(Primitive::Double),
            ReturnCategory::Short => ReturnType::Primitive(Primitive::Short),
            ReturnCategory::Object => ReturnType::Object,
            ReturnCategory::Void => ReturnType::Primitive(Primitive::Void),
        }
    }
}

impl fmt::Display for ReturnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks a reference field descriptor (`L...;` or an array), returning its length.
fn validate_reference(descriptor: &str) -> Option<usize> {
    let element = descriptor.trim_start_matches('[');
    let dimensions = descriptor.len() - element.len();
    match element.as_bytes().first()? {
        b'L' => {
            let end = element.find(';')?;
            // An empty class name (`L;`) is as malformed as a missing terminator.
            (end > 1 && end + 1 == element.len()).then_some(descriptor.len())
        }
        b'I' | b'J' | b'Z' | b'F' | b'B' | b'C' | b'D' | b'S'
            if dimensions > 0 && element.len() == 1 =>
        {
            Some(descriptor.len())
        }
        _ => None,
    }
}

/// A method descriptor returned by the signature oracle.
///
/// The oracle answers `(<params>)<return>`; bare return descriptors such as `V` are accepted too.
/// Class names may use either `.` or `/` as the package separator, since the oracle reports
/// `Class.getTypeName()` for reference returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    descriptor: String,
    return_start: usize,
    category: ReturnCategory,
}

impl MethodDescriptor {
    pub fn parse(descriptor: impl Into<String>) -> Result<Self, BridgeLayerError> {
        let descriptor = descriptor.into();
        let return_start = if descriptor.starts_with('(') {
            descriptor
                .find(')')
                .ok_or_else(|| BridgeLayerError::BadDescriptor(descriptor.clone()))?
                + 1
        } else {
            0
        };
        let category = ReturnCategory::from_field_descriptor(&descriptor[return_start..])
            .map_err(|_| BridgeLayerError::BadDescriptor(descriptor.clone()))?;
        Ok(Self {
            descriptor,
            return_start,
            category,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.descriptor
    }

    pub fn into_string(self) -> String {
        self.descriptor
    }

    /// The category whose trampoline must be used to call this method.
    pub fn return_category(&self) -> ReturnCategory {
        self.category
    }

    pub fn return_descriptor(&self) -> &str {
        &self.descriptor[self.return_start..]
    }

    /// The parameter descriptors, without parentheses; empty for a bare return descriptor.
    pub fn parameters(&self) -> &str {
        if self.return_start == 0 {
            ""
        } else {
            &self.descriptor[1..self.return_start - 1]
        }
    }

    /// The class of a non-array reference return, in JNI form (`java/lang/String`).
    pub fn return_class_name(&self) -> Option<String> {
        self.return_descriptor()
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .map(|name| name.replace('.', "/"))
    }

    /// The descriptor with `/` package separators, as `GetMethodID` expects.
    pub fn to_jni_form(&self) -> String {
        self.descriptor.replace('.', "/")
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use test_case::test_case;

    use super::*;

    #[test]
    fn slots_follow_declaration_order() {
        for (index, category) in ReturnCategory::ALL.into_iter().enumerate() {
            assert_eq!(category.slot(), index, "{category}");
        }
    }

    #[test_case("(I)I", ReturnCategory::Int)]
    #[test_case("()J", ReturnCategory::Long)]
    #[test_case("(Ljava/lang/Object;)Z", ReturnCategory::Boolean)]
    #[test_case("(FF)F", ReturnCategory::Float)]
    #[test_case("()B", ReturnCategory::Byte)]
    #[test_case("(I)C", ReturnCategory::Char)]
    #[test_case("(DD)D", ReturnCategory::Double)]
    #[test_case("()S", ReturnCategory::Short)]
    #[test_case("(I)Ljava.lang.StringBuilder;", ReturnCategory::Object)]
    #[test_case("(I)V", ReturnCategory::Void)]
    #[test_case("V", ReturnCategory::Void; "bare void")]
    #[test_case("Ljava/lang/String;", ReturnCategory::Object; "bare object")]
    fn categorizes(descriptor: &str, expected: ReturnCategory) {
        let parsed = MethodDescriptor::parse(descriptor).expect("valid");
        assert_eq!(parsed.return_category(), expected);
        assert_eq!(parsed.as_str(), descriptor);
    }

    #[test_case("()[I"; "primitive array")]
    #[test_case("()[[D"; "nested primitive array")]
    #[test_case("()[Ljava.lang.String;"; "object array")]
    fn arrays_are_objects(descriptor: &str) {
        let parsed = MethodDescriptor::parse(descriptor).expect("valid");
        assert_eq!(parsed.return_category(), ReturnCategory::Object);
        assert_eq!(parsed.return_class_name(), None);
    }

    #[test]
    fn bare_void_descriptor_is_one_character() {
        let parsed = MethodDescriptor::parse("V").expect("valid");
        assert_eq!(parsed.as_str(), "V");
        assert_eq!(parsed.as_str().len(), 1);
        assert_eq!(parsed.parameters(), "");
        assert_eq!(parsed.return_descriptor(), "V");
    }

    #[test]
    fn splits_parameters_and_return() {
        let parsed = MethodDescriptor::parse("(ILjava.lang.String;)Ljava.lang.StringBuilder;")
            .expect("valid");
        assert_eq!(parsed.parameters(), "ILjava.lang.String;");
        assert_eq!(parsed.return_descriptor(), "Ljava.lang.StringBuilder;");
        assert_eq!(
            parsed.return_class_name().as_deref(),
            Some("java/lang/StringBuilder")
        );
        assert_eq!(
            parsed.to_jni_form(),
            "(ILjava/lang/String;)Ljava/lang/StringBuilder;"
        );
    }

    #[test]
    fn nested_class_names_keep_dollar() {
        let parsed = MethodDescriptor::parse("()Ljava.util.Map$Entry;").expect("valid");
        assert_eq!(
            parsed.return_class_name().as_deref(),
            Some("java/util/Map$Entry")
        );
    }

    #[test_case(""; "empty")]
    #[test_case("(I"; "unclosed parameters")]
    #[test_case("(I)"; "missing return")]
    #[test_case("(I)Q"; "unknown primitive")]
    #[test_case("()Ljava/lang/String"; "unterminated class")]
    #[test_case("()L;"; "empty class name")]
    #[test_case("()II"; "two return types")]
    #[test_case("()["; "array without element")]
    #[test_case("()[V"; "array of void")]
    fn rejects_malformed(descriptor: &str) {
        assert_matches!(
            MethodDescriptor::parse(descriptor),
            Err(BridgeLayerError::BadDescriptor(d)) if d == descriptor
        );
    }

    #[test]
    fn converts_to_jni_return_types() {
        assert!(matches!(
            ReturnType::from(ReturnCategory::Object),
            ReturnType::Object
        ));
        assert!(matches!(
            ReturnType::from(ReturnCategory::Void),
            ReturnType::Primitive(Primitive::Void)
        ));
        assert!(matches!(
            ReturnType::from(ReturnCategory::Char),
            ReturnType::Primitive(Primitive::Char)
        ));
    }
}

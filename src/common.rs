// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    XmlDeserialization,
    InvalidXmlStructure,
    UnknownTypeCode,
    BadDefaultValue,
    BadChoiceValue,
    UnknownField,
    TypeMismatch,
    MissingRequiredField,
    ConflictingFields,
    UnknownSchemaVersion,
    Generic,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            XmlDeserialization => "xml_deserialization",
            InvalidXmlStructure => "invalid_xml_structure",
            UnknownTypeCode => "unknown_type_code",
            BadDefaultValue => "bad_default_value",
            BadChoiceValue => "bad_choice_value",
            UnknownField => "unknown_field",
            TypeMismatch => "type_mismatch",
            MissingRequiredField => "missing_required_field",
            ConflictingFields => "conflicting_fields",
            UnknownSchemaVersion => "unknown_schema_version",
            Generic => "generic",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Import,
    Schema,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Import => "ImportError",
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Model => "ModelError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! import_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Import, ErrorCode::$code, Some($str)))
    }}
);

#[macro_export]
macro_rules! schema_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Schema, ErrorCode::$code, Some($str)))
    }}
);

#[macro_export]
macro_rules! model_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Model, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Model, ErrorCode::$code, None))
    }};
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Import,
        ErrorCode::InvalidXmlStructure,
        Some("parameter 'num_wann' is missing a type element".to_owned()),
    );
    let display = format!("{err}");
    assert!(display.starts_with("ImportError"));
    assert!(display.contains("invalid_xml_structure"));
    assert!(display.contains("num_wann"));

    let err = Error::new(ErrorKind::Model, ErrorCode::ConflictingFields, None);
    assert_eq!("ModelError{conflicting_fields}", format!("{err}"));
}

// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Serde document model for Wannier90's `parameters.xml`.
//!
//! Every child of a `<parameter>` element is optional at this layer:
//! structural validation happens in [`crate::convert`], so malformed
//! elements belonging to other tools deserialize without error.

use std::io::BufRead;

use serde::Deserialize;

use crate::common::Result;
use crate::import_err;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename = "parameters")]
pub struct ParameterFile {
    #[serde(rename = "parameter", default)]
    pub parameters: Vec<Parameter>,
}

/// One `<parameter>` element as it appears in the source document.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Parameter {
    #[serde(rename = "@tool", default)]
    pub tool: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub description: Option<String>,
    pub choices: Option<Choices>,
    pub default: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Choices {
    #[serde(rename = "choice", default)]
    pub values: Vec<String>,
}

impl Parameter {
    /// Trimmed choice literals, empty when no `<choices>` element is present.
    pub fn choice_values(&self) -> Vec<&str> {
        match self.choices {
            Some(ref choices) => choices.values.iter().map(|c| c.trim()).collect(),
            None => Vec::new(),
        }
    }
}

pub fn parameters_from_reader(reader: &mut dyn BufRead) -> Result<ParameterFile> {
    use quick_xml::de;
    match de::from_reader(reader) {
        Ok(file) => Ok(file),
        Err(err) => import_err!(XmlDeserialization, err.to_string()),
    }
}

pub fn parameters_from_str(input: &str) -> Result<ParameterFile> {
    use quick_xml::de;
    match de::from_str(input) {
        Ok(file) => Ok(file),
        Err(err) => import_err!(XmlDeserialization, err.to_string()),
    }
}

#[test]
fn test_parse_parameter_file() {
    let input = "<parameters>
        <parameter tool=\"w90\">
          <name>num_wann</name>
          <type>I</type>
          <description>Number of Wannier functions</description>
        </parameter>
        <parameter tool=\"w90\">
          <name>spin</name>
          <type>S</type>
          <description>Spin channel</description>
          <choices>
            <choice>up</choice>
            <choice>down</choice>
          </choices>
          <default>up</default>
        </parameter>
        <parameter tool=\"postw90\">
          <name>kmesh</name>
        </parameter>
      </parameters>";

    let file = parameters_from_str(input).unwrap();
    assert_eq!(3, file.parameters.len());

    let num_wann = &file.parameters[0];
    assert_eq!("w90", num_wann.tool);
    assert_eq!(Some("num_wann".to_owned()), num_wann.name);
    assert_eq!(Some("I".to_owned()), num_wann.type_code);
    assert!(num_wann.choices.is_none());
    assert!(num_wann.default.is_none());

    let spin = &file.parameters[1];
    assert_eq!(vec!["up", "down"], spin.choice_values());
    assert_eq!(Some("up".to_owned()), spin.default);

    // foreign-tool parameters may be arbitrarily incomplete
    let kmesh = &file.parameters[2];
    assert_eq!("postw90", kmesh.tool);
    assert!(kmesh.type_code.is_none());
    assert!(kmesh.description.is_none());
}

#[test]
fn test_parse_bad_xml() {
    use crate::common::{ErrorCode, ErrorKind};

    let input = "<parameters><parameter tool=\"w90\"><name>num_wann";
    let err = parameters_from_str(input).unwrap_err();
    assert_eq!(ErrorKind::Import, err.kind);
    assert_eq!(ErrorCode::XmlDeserialization, err.code);
}

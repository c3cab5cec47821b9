// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Schema converter: walks a parsed `parameters.xml` document and
//! produces a [`SchemaDescription`] under a set of declarative override
//! rules.
//!
//! Rule precedence: exclusion > field override > type/default override >
//! XML-derived inference.  A field override fully short-circuits XML
//! inspection for that field.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::common::Result;
use crate::params_xml::{Parameter, ParameterFile};
use crate::schema::{BaseType, FieldDefinition, SchemaDescription, TypeExpr, Value};
use crate::{import_err, schema_err};

/// Parameters carrying any other `tool` attribute are skipped before
/// structural validation.
pub const TARGET_TOOL: &str = "w90";

/// Hand-authored exceptions to XML-derived field generation.
#[derive(Clone, Debug, Default)]
pub struct OverrideRules {
    /// Drop these fields entirely; exclusion pre-empts structural checks.
    pub exclude: HashSet<String>,
    /// Complete replacement definitions, consumed verbatim.  Entries that
    /// never match a document parameter are appended as injected fields.
    pub field_overrides: HashMap<String, FieldDefinition>,
    /// Replacement type expressions.
    pub type_overrides: HashMap<String, TypeExpr>,
    /// Replacement default values.
    pub default_overrides: HashMap<String, Value>,
    /// Fields whose absence is meaningful: with no document default the
    /// default becomes none and a scalar type gains a none variant.
    pub allow_none: HashSet<String>,
}

/// Non-fatal diagnostics emitted during conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    DuplicateField { name: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Warning::DuplicateField { name } => {
                write!(
                    f,
                    "duplicate field name '{name}' in XML document; keeping the first definition"
                )
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Conversion {
    pub schema: SchemaDescription,
    pub warnings: Vec<Warning>,
}

fn text_of(field: &Option<String>) -> Option<&str> {
    match field {
        Some(s) => {
            let s = s.trim();
            if s.is_empty() { None } else { Some(s) }
        }
        None => None,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim_matches('.').to_ascii_lowercase().as_str() {
        "true" | "t" => Some(true),
        "false" | "f" => Some(false),
        _ => None,
    }
}

fn parse_scalar(text: &str, base: BaseType) -> Option<Value> {
    match base {
        BaseType::Integer => text.parse::<i64>().ok().map(Value::Int),
        BaseType::Float => text.parse::<f64>().ok().map(Value::Float),
        BaseType::Boolean => parse_bool(text).map(Value::Bool),
        BaseType::String => Some(Value::Str(text.to_owned())),
    }
}

/// Convert a parsed parameter document into a schema description.
///
/// Fails with `invalid_xml_structure` when any retained parameter is
/// missing a `name`, `type`, or `description` element (or the element
/// has no text); the error names the offending parameter.  Duplicate
/// names warn and keep the first definition.
pub fn convert(doc: &ParameterFile, rules: &OverrideRules, version: &str) -> Result<Conversion> {
    let mut fields: Vec<FieldDefinition> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut warnings: Vec<Warning> = Vec::new();
    let mut pending_overrides = rules.field_overrides.clone();

    for (i, parameter) in doc.parameters.iter().enumerate() {
        // the foreign-tool filter runs before any structural check, so
        // malformed parameters belonging to other tools never raise
        if parameter.tool != TARGET_TOOL {
            continue;
        }

        let name = match text_of(&parameter.name) {
            Some(name) => name.to_owned(),
            None => {
                return import_err!(
                    InvalidXmlStructure,
                    format!("parameter {} is missing a name element", i + 1)
                );
            }
        };

        if rules.exclude.contains(&name) {
            continue;
        }

        if seen.contains(&name) {
            warnings.push(Warning::DuplicateField { name });
            continue;
        }
        seen.insert(name.clone());

        if let Some(def) = pending_overrides.remove(&name) {
            fields.push(def);
            continue;
        }

        fields.push(derive_field(parameter, &name, rules)?);
    }

    // overrides that never matched a document parameter become injected
    // fields, appended after everything document-derived
    let mut injected: Vec<FieldDefinition> = pending_overrides
        .into_values()
        .filter(|def| !rules.exclude.contains(&def.name) && !seen.contains(&def.name))
        .collect();
    injected.sort_by(|a, b| a.name.cmp(&b.name));
    fields.extend(injected);

    Ok(Conversion {
        schema: SchemaDescription::new(version, fields),
        warnings,
    })
}

/// XML-derived inference for a single retained, non-overridden parameter.
fn derive_field(
    parameter: &Parameter,
    name: &str,
    rules: &OverrideRules,
) -> Result<FieldDefinition> {
    let code = match text_of(&parameter.type_code) {
        Some(code) => code,
        None => {
            return import_err!(
                InvalidXmlStructure,
                format!("parameter '{name}' is missing a type element")
            );
        }
    };
    let description = match text_of(&parameter.description) {
        Some(description) => description.to_owned(),
        None => {
            return import_err!(
                InvalidXmlStructure,
                format!("parameter '{name}' is missing a description element")
            );
        }
    };

    let base = match BaseType::from_code(code) {
        Some(base) => base,
        None => {
            return schema_err!(
                UnknownTypeCode,
                format!("parameter '{name}' has unknown type code '{code}'")
            );
        }
    };

    let choice_texts = parameter.choice_values();
    let allow_none = rules.allow_none.contains(name);

    let mut ty = if let Some(override_ty) = rules.type_overrides.get(name) {
        override_ty.clone()
    } else if !choice_texts.is_empty() {
        let mut choices = Vec::with_capacity(choice_texts.len());
        for &text in &choice_texts {
            match parse_scalar(text, base) {
                Some(value) => choices.push(value),
                None => {
                    return schema_err!(
                        BadChoiceValue,
                        format!("parameter '{name}': cannot parse choice '{text}' as {base}")
                    );
                }
            }
        }
        TypeExpr::Literal {
            base,
            choices,
            allow_none,
        }
    } else {
        TypeExpr::Scalar(base)
    };

    let default = if let Some(value) = rules.default_overrides.get(name) {
        Some(value.clone())
    } else if let Some(text) = text_of(&parameter.default) {
        match parse_scalar(text, base) {
            Some(value) => Some(value),
            None => {
                return schema_err!(
                    BadDefaultValue,
                    format!("parameter '{name}': cannot parse default '{text}' as {base}")
                );
            }
        }
    } else if allow_none {
        // with no document default the field becomes unset-by-default;
        // a plain scalar type additionally gains a none variant (choices
        // carry theirs on the Literal itself)
        if let TypeExpr::Scalar(base) = ty {
            ty = TypeExpr::Optional(base);
        }
        Some(Value::None)
    } else {
        None
    };

    Ok(FieldDefinition::new(name, ty, default, &description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ErrorCode, ErrorKind};
    use crate::params_xml::parameters_from_str;
    use crate::schema::SeqKind;

    const VALID_XML: &str = "<parameters>
        <parameter tool=\"w90\">
          <name>num_wann</name>
          <type>I</type>
          <description>Number of Wannier functions</description>
        </parameter>
        <parameter tool=\"w90\">
          <name>title</name>
          <type>S</type>
          <description>Title of the calculation</description>
          <default>untitled</default>
        </parameter>
        <parameter tool=\"postw90\">
          <name>berry_task</name>
        </parameter>
      </parameters>";

    fn convert_str(input: &str, rules: &OverrideRules) -> Result<Conversion> {
        convert(&parameters_from_str(input).unwrap(), rules, "latest")
    }

    #[test]
    fn converts_valid_document() {
        let conversion = convert_str(VALID_XML, &OverrideRules::default()).unwrap();
        assert!(conversion.warnings.is_empty());

        let schema = &conversion.schema;
        assert_eq!(2, schema.len());
        assert_eq!("num_wann", schema.fields()[0].name);
        assert_eq!("title", schema.fields()[1].name);

        let num_wann = schema.get("num_wann").unwrap();
        assert_eq!(TypeExpr::Scalar(BaseType::Integer), num_wann.ty);
        assert!(num_wann.is_required());

        let title = schema.get("title").unwrap();
        assert_eq!(TypeExpr::Scalar(BaseType::String), title.ty);
        assert_eq!(Some(Value::Str("untitled".to_owned())), title.default);

        // foreign-tool parameters never make it into the schema
        assert!(!schema.contains("berry_task"));
    }

    #[test]
    fn missing_elements_raise() {
        let cases = [
            (
                "<parameters><parameter tool=\"w90\">
                   <type>I</type><description>d</description>
                 </parameter></parameters>",
                "parameter 1",
            ),
            (
                "<parameters><parameter tool=\"w90\">
                   <name>num_wann</name><description>d</description>
                 </parameter></parameters>",
                "num_wann",
            ),
            (
                "<parameters><parameter tool=\"w90\">
                   <name>num_wann</name><type>I</type>
                 </parameter></parameters>",
                "num_wann",
            ),
            // present but empty text is also a structural error
            (
                "<parameters><parameter tool=\"w90\">
                   <name> </name><type>I</type><description>d</description>
                 </parameter></parameters>",
                "parameter 1",
            ),
        ];

        for (input, needle) in cases {
            let err = convert_str(input, &OverrideRules::default()).unwrap_err();
            assert_eq!(ErrorKind::Import, err.kind);
            assert_eq!(ErrorCode::InvalidXmlStructure, err.code);
            assert!(
                err.get_details().unwrap().contains(needle),
                "details should identify the parameter: {err}"
            );
        }
    }

    #[test]
    fn foreign_tool_malformed_is_skipped() {
        // structurally hopeless, but belongs to postw90
        let input = "<parameters><parameter tool=\"postw90\"></parameter></parameters>";
        let conversion = convert_str(input, &OverrideRules::default()).unwrap();
        assert!(conversion.schema.is_empty());
    }

    #[test]
    fn exclusion_preempts_structural_errors() {
        let input = "<parameters><parameter tool=\"w90\">
            <name>devel_flag</name>
          </parameter></parameters>";

        let mut rules = OverrideRules::default();
        rules.exclude.insert("devel_flag".to_owned());

        let conversion = convert_str(input, &rules).unwrap();
        assert!(!conversion.schema.contains("devel_flag"));
        assert!(conversion.schema.is_empty());
    }

    #[test]
    fn duplicates_warn_and_keep_first() {
        let input = "<parameters>
            <parameter tool=\"w90\">
              <name>num_wann</name>
              <type>I</type>
              <description>first definition</description>
            </parameter>
            <parameter tool=\"w90\">
              <name>num_wann</name>
              <type>R</type>
              <description>second definition</description>
            </parameter>
          </parameters>";

        let conversion = convert_str(input, &OverrideRules::default()).unwrap();
        assert_eq!(
            vec![Warning::DuplicateField {
                name: "num_wann".to_owned()
            }],
            conversion.warnings
        );
        assert_eq!(1, conversion.schema.len());
        let field = conversion.schema.get("num_wann").unwrap();
        assert_eq!(TypeExpr::Scalar(BaseType::Integer), field.ty);
        assert_eq!("first definition", field.description);
    }

    #[test]
    fn choices_narrow_to_literal() {
        let input = "<parameters>
            <parameter tool=\"w90\">
              <name>spin</name>
              <type>S</type>
              <description>Spin channel</description>
              <choices><choice>up</choice><choice>down</choice></choices>
              <default>up</default>
            </parameter>
            <parameter tool=\"w90\">
              <name>search_shells</name>
              <type>I</type>
              <description>Shell search depth</description>
              <choices><choice>12</choice><choice>24</choice><choice>36</choice></choices>
            </parameter>
          </parameters>";

        let mut rules = OverrideRules::default();
        rules.allow_none.insert("search_shells".to_owned());

        let conversion = convert_str(input, &rules).unwrap();
        let spin = conversion.schema.get("spin").unwrap();
        assert_eq!(
            TypeExpr::Literal {
                base: BaseType::String,
                choices: vec![Value::Str("up".to_owned()), Value::Str("down".to_owned())],
                allow_none: false,
            },
            spin.ty
        );
        assert_eq!(Some(Value::Str("up".to_owned())), spin.default);

        // numeric choices are coerced, and allow_none adds the none
        // variant on the enumeration rather than wrapping in Optional
        let shells = conversion.schema.get("search_shells").unwrap();
        assert_eq!(
            TypeExpr::Literal {
                base: BaseType::Integer,
                choices: vec![Value::Int(12), Value::Int(24), Value::Int(36)],
                allow_none: true,
            },
            shells.ty
        );
        assert_eq!(Some(Value::None), shells.default);
    }

    #[test]
    fn allow_none_scalar_becomes_optional() {
        let input = "<parameters><parameter tool=\"w90\">
            <name>num_bands</name>
            <type>I</type>
            <description>Number of bands</description>
          </parameter></parameters>";

        let mut rules = OverrideRules::default();
        rules.allow_none.insert("num_bands".to_owned());

        let conversion = convert_str(input, &rules).unwrap();
        let field = conversion.schema.get("num_bands").unwrap();
        assert_eq!(TypeExpr::Optional(BaseType::Integer), field.ty);
        assert_eq!(Some(Value::None), field.default);
    }

    #[test]
    fn allow_none_defers_to_document_default() {
        let input = "<parameters><parameter tool=\"w90\">
            <name>fermi_energy</name>
            <type>R</type>
            <description>Fermi level</description>
            <default>0.0</default>
          </parameter></parameters>";

        let mut rules = OverrideRules::default();
        rules.allow_none.insert("fermi_energy".to_owned());

        let conversion = convert_str(input, &rules).unwrap();
        let field = conversion.schema.get("fermi_energy").unwrap();
        assert_eq!(TypeExpr::Scalar(BaseType::Float), field.ty);
        assert_eq!(Some(Value::Float(0.0)), field.default);
    }

    #[test]
    fn type_and_default_overrides_win() {
        let input = "<parameters><parameter tool=\"w90\">
            <name>mp_grid</name>
            <type>I</type>
            <description>Monkhorst-Pack grid dimensions</description>
          </parameter></parameters>";

        let mut rules = OverrideRules::default();
        rules
            .type_overrides
            .insert("mp_grid".to_owned(), TypeExpr::List(SeqKind::Int));
        rules
            .default_overrides
            .insert("mp_grid".to_owned(), Value::IntList(Vec::new()));

        let conversion = convert_str(input, &rules).unwrap();
        let field = conversion.schema.get("mp_grid").unwrap();
        assert_eq!(TypeExpr::List(SeqKind::Int), field.ty);
        assert_eq!(Some(Value::IntList(Vec::new())), field.default);
        assert_eq!("Monkhorst-Pack grid dimensions", field.description);
    }

    #[test]
    fn field_override_bypasses_xml_inspection() {
        // parameter has a name but neither type nor description;
        // the override makes that irrelevant
        let input = "<parameters><parameter tool=\"w90\">
            <name>projections</name>
          </parameter></parameters>";

        let mut rules = OverrideRules::default();
        rules.field_overrides.insert(
            "projections".to_owned(),
            FieldDefinition::new(
                "projections",
                TypeExpr::List(SeqKind::Projection),
                Some(Value::Projections(Vec::new())),
                "Initial orbital projections",
            ),
        );

        let conversion = convert_str(input, &rules).unwrap();
        let field = conversion.schema.get("projections").unwrap();
        assert_eq!(TypeExpr::List(SeqKind::Projection), field.ty);
        assert_eq!("Initial orbital projections", field.description);
    }

    #[test]
    fn leftover_overrides_are_injected_after_document_fields() {
        let mut rules = OverrideRules::default();
        rules.field_overrides.insert(
            "kpoint_path".to_owned(),
            FieldDefinition::new(
                "kpoint_path",
                TypeExpr::List(SeqKind::PathSegment),
                Some(Value::Path(Vec::new())),
                "High-symmetry path",
            ),
        );

        let conversion = convert_str(VALID_XML, &rules).unwrap();
        let names: Vec<&str> = conversion
            .schema
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(vec!["num_wann", "title", "kpoint_path"], names);
    }

    #[test]
    fn excluded_override_is_not_injected() {
        let mut rules = OverrideRules::default();
        rules.exclude.insert("kpoint_path".to_owned());
        rules.field_overrides.insert(
            "kpoint_path".to_owned(),
            FieldDefinition::new(
                "kpoint_path",
                TypeExpr::List(SeqKind::PathSegment),
                Some(Value::Path(Vec::new())),
                "High-symmetry path",
            ),
        );

        let conversion = convert_str(VALID_XML, &rules).unwrap();
        assert!(!conversion.schema.contains("kpoint_path"));
    }

    #[test]
    fn unknown_type_code_fails_loudly() {
        let input = "<parameters><parameter tool=\"w90\">
            <name>num_wann</name>
            <type>Q</type>
            <description>bogus</description>
          </parameter></parameters>";

        let err = convert_str(input, &OverrideRules::default()).unwrap_err();
        assert_eq!(ErrorKind::Schema, err.kind);
        assert_eq!(ErrorCode::UnknownTypeCode, err.code);
        assert!(err.get_details().unwrap().contains("'Q'"));
    }

    #[test]
    fn unparseable_default_fails() {
        let input = "<parameters><parameter tool=\"w90\">
            <name>num_iter</name>
            <type>I</type>
            <description>Minimisation iterations</description>
            <default>lots</default>
          </parameter></parameters>";

        let err = convert_str(input, &OverrideRules::default()).unwrap_err();
        assert_eq!(ErrorCode::BadDefaultValue, err.code);
        assert!(err.get_details().unwrap().contains("num_iter"));
    }

    #[test]
    fn boolean_defaults_parse_fortran_spellings() {
        let input = "<parameters>
            <parameter tool=\"w90\">
              <name>guiding_centres</name>
              <type>L</type>
              <description>Use guiding centres</description>
              <default>.false.</default>
            </parameter>
            <parameter tool=\"w90\">
              <name>write_hr</name>
              <type>L</type>
              <description>Write the Hamiltonian</description>
              <default>T</default>
            </parameter>
          </parameters>";

        let conversion = convert_str(input, &OverrideRules::default()).unwrap();
        assert_eq!(
            Some(Value::Bool(false)),
            conversion.schema.get("guiding_centres").unwrap().default
        );
        assert_eq!(
            Some(Value::Bool(true)),
            conversion.schema.get("write_hr").unwrap().default
        );
    }
}

// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! A validated record over a [`SchemaDescription`]: the runtime object a
//! user populates before rendering an input file.
//!
//! Instances are validated at construction and on every field write; a
//! write that would violate the schema leaves the instance unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::Result;
use crate::model_err;
use crate::schema::{SchemaDescription, TypeExpr, Value};

/// Derived defaults applied before the required-field check: when the
/// target is unset it takes the value assigned to the source field.
const DERIVED_DEFAULTS: &[(&str, &str)] = &[("num_bands", "num_wann"), ("slwf_num", "num_wann")];

#[derive(Clone, Debug)]
pub struct ModelInstance {
    schema: Arc<SchemaDescription>,
    values: HashMap<String, Value>,
}

impl ModelInstance {
    pub fn new(
        schema: Arc<SchemaDescription>,
        assignments: Vec<(String, Value)>,
    ) -> Result<ModelInstance> {
        let mut instance = ModelInstance {
            schema,
            values: assignments.into_iter().collect(),
        };
        instance.validate()?;
        Ok(instance)
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    /// The field's current value, falling back to its declared default.
    /// `None` only for names the schema does not define.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value);
        }
        self.schema.get(name).and_then(|f| f.default.as_ref())
    }

    /// Replace a field value, re-running full validation.  On error the
    /// instance is left untouched.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let mut candidate = self.clone();
        candidate.values.insert(name.to_owned(), value);
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        for (name, value) in self.values.iter() {
            let field = match self.schema.get(name) {
                Some(field) => field,
                None => {
                    return model_err!(
                        UnknownField,
                        format!(
                            "'{name}' is not a field of schema version '{}'",
                            self.schema.version
                        )
                    );
                }
            };
            if !value.conforms_to(&field.ty) {
                if matches!(field.ty, TypeExpr::Literal { .. }) {
                    return model_err!(
                        BadChoiceValue,
                        format!("field '{name}': value is not one of the allowed literals")
                    );
                }
                return model_err!(
                    TypeMismatch,
                    format!("field '{name}': value does not match the declared type")
                );
            }
        }

        for (derived, source) in DERIVED_DEFAULTS {
            if self.schema.contains(derived) && !self.values.contains_key(*derived) {
                if let Some(value) = self.values.get(*source).cloned() {
                    self.values.insert((*derived).to_owned(), value);
                }
            }
        }

        for field in self.schema.fields() {
            if field.is_required() && !self.values.contains_key(&field.name) {
                return model_err!(
                    MissingRequiredField,
                    format!("field '{}' is required", field.name)
                );
            }
        }

        self.check_position_invariant()
    }

    /// Exactly one of the two atom-position blocks must be populated,
    /// when the schema declares them both.
    fn check_position_invariant(&self) -> Result<()> {
        if !(self.schema.contains("atoms_frac") && self.schema.contains("atoms_cart")) {
            return Ok(());
        }
        let frac = self.is_populated("atoms_frac");
        let cart = self.is_populated("atoms_cart");
        if frac && cart {
            return model_err!(
                ConflictingFields,
                "specify either atoms_frac or atoms_cart, not both".to_owned()
            );
        }
        if !frac && !cart {
            return model_err!(
                ConflictingFields,
                "specify either atoms_frac or atoms_cart".to_owned()
            );
        }
        Ok(())
    }

    fn is_populated(&self, name: &str) -> bool {
        match self.get(name) {
            Some(value) => value.seq_len().map(|n| n > 0).unwrap_or(false),
            None => false,
        }
    }
}

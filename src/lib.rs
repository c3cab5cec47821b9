// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Converts the machine-readable Wannier90 parameter document
//! (`parameters.xml`) into a validated, typed schema, and serializes
//! populated instances of that schema back into the tool's flat-text
//! input-file format.

#![forbid(unsafe_code)]

pub mod common;
pub mod convert;
pub mod model;
pub mod params_xml;
pub mod patches;
pub mod registry;
pub mod render;
pub mod schema;

pub use common::{Error, ErrorCode, ErrorKind, Result};
pub use convert::{Conversion, OverrideRules, TARGET_TOOL, Warning, convert};
pub use model::ModelInstance;
pub use params_xml::{ParameterFile, parameters_from_reader, parameters_from_str};
pub use registry::SchemaRegistry;
pub use render::render;
pub use schema::{
    AtomSite, BaseType, DisSphere, FieldDefinition, PathSegment, Projection, RenderCategory,
    SchemaDescription, SeqKind, TypeExpr, Value,
};

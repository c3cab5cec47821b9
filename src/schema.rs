// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The converter's output model: typed field definitions, runtime values,
//! and the per-field rendering categories consumed by [`crate::render`].

use std::collections::HashMap;
use std::fmt;

use float_cmp::approx_eq;
use lazy_static::lazy_static;
use serde::Serialize;

use crate::common::{Error, ErrorCode, ErrorKind, Result};

/// Base scalar type of a parameter, mapped from the document's
/// one-letter type codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BaseType {
    Integer,
    Float,
    Boolean,
    String,
}

impl BaseType {
    /// The fixed code set is {I, R, L, S, P}; any other code is
    /// schema drift and must fail loudly in the converter.
    pub fn from_code(code: &str) -> Option<BaseType> {
        match code {
            "I" => Some(BaseType::Integer),
            "R" | "P" => Some(BaseType::Float),
            "L" => Some(BaseType::Boolean),
            "S" => Some(BaseType::String),
            _ => None,
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BaseType::Integer => "integer",
            BaseType::Float => "float",
            BaseType::Boolean => "boolean",
            BaseType::String => "string",
        };
        write!(f, "{name}")
    }
}

/// Element kind of a sequence-typed field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SeqKind {
    Int,
    Vector3,
    IntRow,
    Atom,
    Projection,
    Sphere,
    PathSegment,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TypeExpr {
    Scalar(BaseType),
    /// A scalar that may also be left unset ("none").
    Optional(BaseType),
    /// An enumeration over literal values of the base type.
    Literal {
        base: BaseType,
        choices: Vec<Value>,
        allow_none: bool,
    },
    List(SeqKind),
}

/// One row of an `atoms_frac`/`atoms_cart` block.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AtomSite {
    pub symbol: String,
    pub position: [f64; 3],
}

impl fmt::Display for AtomSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.symbol, vec3_str(&self.position))
    }
}

/// One row of a `projections` block.
///
/// Exactly one of `site` and `fractional_site` should be set; the axis
/// and radial qualifiers only appear in the text form when they differ
/// from Wannier90's own defaults.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Projection {
    pub site: Option<String>,
    pub fractional_site: Option<[f64; 3]>,
    pub ang_mtm: String,
    pub zaxis: [f64; 3],
    pub xaxis: [f64; 3],
    pub radial: i64,
}

impl Default for Projection {
    fn default() -> Self {
        Projection {
            site: None,
            fractional_site: None,
            ang_mtm: String::new(),
            zaxis: [0.0, 0.0, 1.0],
            xaxis: [1.0, 0.0, 0.0],
            radial: 1,
        }
    }
}

impl Projection {
    pub fn for_site(symbol: &str, ang_mtm: &str) -> Projection {
        Projection {
            site: Some(symbol.to_owned()),
            ang_mtm: ang_mtm.to_owned(),
            ..Default::default()
        }
    }

    pub fn for_fractional(site: [f64; 3], ang_mtm: &str) -> Projection {
        Projection {
            fractional_site: Some(site),
            ang_mtm: ang_mtm.to_owned(),
            ..Default::default()
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref site) = self.site {
            write!(f, "{site}")?;
        } else if let Some(ref fs) = self.fractional_site {
            write!(
                f,
                "f={},{},{}",
                fmt_float(fs[0]),
                fmt_float(fs[1]),
                fmt_float(fs[2])
            )?;
        }
        write!(f, ":{}", self.ang_mtm)?;
        if self.zaxis != [0.0, 0.0, 1.0] {
            write!(
                f,
                ":z={},{},{}",
                fmt_float(self.zaxis[0]),
                fmt_float(self.zaxis[1]),
                fmt_float(self.zaxis[2])
            )?;
        }
        if self.xaxis != [1.0, 0.0, 0.0] {
            write!(
                f,
                ":x={},{},{}",
                fmt_float(self.xaxis[0]),
                fmt_float(self.xaxis[1]),
                fmt_float(self.xaxis[2])
            )?;
        }
        if self.radial != 1 {
            write!(f, ":r={}", self.radial)?;
        }
        Ok(())
    }
}

/// One row of a `dis_spheres` block: a center in k-space plus a radius.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisSphere {
    pub center: [f64; 3],
    pub radius: f64,
}

impl fmt::Display for DisSphere {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", vec3_str(&self.center), fmt_float(self.radius))
    }
}

/// One row of a `kpoint_path` block: a labelled start and end k-point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathSegment {
    pub start_label: String,
    pub start: [f64; 3],
    pub end_label: String,
    pub end: [f64; 3],
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.start_label,
            vec3_str(&self.start),
            self.end_label,
            vec3_str(&self.end)
        )
    }
}

pub(crate) fn fmt_float(x: f64) -> String {
    // Debug formatting keeps the trailing ".0" on integral floats
    format!("{x:?}")
}

pub(crate) fn vec3_str(v: &[f64; 3]) -> String {
    format!("{} {} {}", fmt_float(v[0]), fmt_float(v[1]), fmt_float(v[2]))
}

fn f64_eq(a: f64, b: f64) -> bool {
    approx_eq!(f64, a, b, ulps = 2)
}

fn vec3_eq(a: &[f64; 3], b: &[f64; 3]) -> bool {
    f64_eq(a[0], b[0]) && f64_eq(a[1], b[1]) && f64_eq(a[2], b[2])
}

/// A concrete field value: a default recorded in the schema, a choice
/// literal, or a value held by a model instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    IntList(Vec<i64>),
    Vectors(Vec<[f64; 3]>),
    IntRows(Vec<Vec<i64>>),
    Atoms(Vec<AtomSite>),
    Projections(Vec<Projection>),
    Spheres(Vec<DisSphere>),
    Path(Vec<PathSegment>),
    None,
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Element count for sequence values, `None` for scalars.
    pub fn seq_len(&self) -> Option<usize> {
        match self {
            Value::IntList(v) => Some(v.len()),
            Value::Vectors(v) => Some(v.len()),
            Value::IntRows(v) => Some(v.len()),
            Value::Atoms(v) => Some(v.len()),
            Value::Projections(v) => Some(v.len()),
            Value::Spheres(v) => Some(v.len()),
            Value::Path(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Equality with float-aware comparison for all float content.
    /// Integers compare equal to integral floats, matching how defaults
    /// appear in the source document.
    pub fn approx_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => f64_eq(*a, *b),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                f64_eq(*a as f64, *b)
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::IntList(a), Value::IntList(b)) => a == b,
            (Value::Vectors(a), Value::Vectors(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| vec3_eq(x, y))
            }
            (Value::IntRows(a), Value::IntRows(b)) => a == b,
            (Value::Atoms(a), Value::Atoms(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| x.symbol == y.symbol && vec3_eq(&x.position, &y.position))
            }
            (Value::Projections(a), Value::Projections(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| {
                        x.site == y.site
                            && match (&x.fractional_site, &y.fractional_site) {
                                (Some(p), Some(q)) => vec3_eq(p, q),
                                (None, None) => true,
                                _ => false,
                            }
                            && x.ang_mtm == y.ang_mtm
                            && vec3_eq(&x.zaxis, &y.zaxis)
                            && vec3_eq(&x.xaxis, &y.xaxis)
                            && x.radial == y.radial
                    })
            }
            (Value::Spheres(a), Value::Spheres(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| vec3_eq(&x.center, &y.center) && f64_eq(x.radius, y.radius))
            }
            (Value::Path(a), Value::Path(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| {
                        x.start_label == y.start_label
                            && x.end_label == y.end_label
                            && vec3_eq(&x.start, &y.start)
                            && vec3_eq(&x.end, &y.end)
                    })
            }
            (Value::None, Value::None) => true,
            _ => false,
        }
    }

    /// Structural type check: does this value inhabit the given type
    /// expression?  Integers are accepted wherever a float is expected.
    pub fn conforms_to(&self, ty: &TypeExpr) -> bool {
        match ty {
            TypeExpr::Scalar(base) => match base {
                BaseType::Integer => matches!(self, Value::Int(_)),
                BaseType::Float => matches!(self, Value::Int(_) | Value::Float(_)),
                BaseType::Boolean => matches!(self, Value::Bool(_)),
                BaseType::String => matches!(self, Value::Str(_)),
            },
            TypeExpr::Optional(base) => {
                self.is_none() || self.conforms_to(&TypeExpr::Scalar(*base))
            }
            TypeExpr::Literal {
                base,
                choices,
                allow_none,
            } => {
                if self.is_none() {
                    *allow_none
                } else {
                    self.conforms_to(&TypeExpr::Scalar(*base))
                        && choices.iter().any(|c| c.approx_eq(self))
                }
            }
            TypeExpr::List(kind) => matches!(
                (kind, self),
                (SeqKind::Int, Value::IntList(_))
                    | (SeqKind::Vector3, Value::Vectors(_))
                    | (SeqKind::IntRow, Value::IntRows(_))
                    | (SeqKind::Atom, Value::Atoms(_))
                    | (SeqKind::Projection, Value::Projections(_))
                    | (SeqKind::Sphere, Value::Spheres(_))
                    | (SeqKind::PathSegment, Value::Path(_))
            ),
        }
    }
}

/// How a field is laid out in the flat input-file format.  This is
/// static per-field metadata keyed by name, not inferred from the
/// field's value type: several fields share a value type but need
/// different textual layouts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RenderCategory {
    Block {
        units: Option<&'static str>,
        keep_punctuation: bool,
    },
    SpaceList,
    CommaList,
    Scalar,
}

lazy_static! {
    static ref RENDER_CATEGORIES: HashMap<&'static str, RenderCategory> = {
        let mut m = HashMap::new();
        for name in [
            "atoms_frac",
            "atoms_cart",
            "dis_spheres",
            "shell_list",
            "kpoints",
            "nnkpts",
            "select_projections",
            "slwf_centres",
            "wannier_plot_list",
            "kpoint_path",
            "bands_plot_project",
        ] {
            m.insert(
                name,
                RenderCategory::Block {
                    units: None,
                    keep_punctuation: false,
                },
            );
        }
        // the cartesian unit cell is the only block with a units line
        m.insert(
            "unit_cell_cart",
            RenderCategory::Block {
                units: Some("ang"),
                keep_punctuation: false,
            },
        );
        // projection strings carry meaningful commas and colons
        m.insert(
            "projections",
            RenderCategory::Block {
                units: None,
                keep_punctuation: true,
            },
        );
        m.insert("mp_grid", RenderCategory::SpaceList);
        m.insert("exclude_bands", RenderCategory::CommaList);
        m
    };
}

pub fn category_for(name: &str) -> RenderCategory {
    RENDER_CATEGORIES
        .get(name)
        .copied()
        .unwrap_or(RenderCategory::Scalar)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: TypeExpr,
    /// `None` means the field is required.
    pub default: Option<Value>,
    pub description: String,
    pub category: RenderCategory,
}

impl FieldDefinition {
    pub fn new(
        name: &str,
        ty: TypeExpr,
        default: Option<Value>,
        description: &str,
    ) -> FieldDefinition {
        FieldDefinition {
            name: name.to_owned(),
            ty,
            default,
            description: description.to_owned(),
            category: category_for(name),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// The converter's terminal artifact: an ordered-by-first-seen table of
/// field definitions for one schema version.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaDescription {
    pub version: String,
    fields: Vec<FieldDefinition>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SchemaDescription {
    pub fn new(version: &str, fields: Vec<FieldDefinition>) -> SchemaDescription {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        SchemaDescription {
            version: version.to_owned(),
            fields,
            index,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON form for the external code-emission collaborator.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| Error::new(ErrorKind::Schema, ErrorCode::Generic, Some(err.to_string())))
    }
}

#[test]
fn test_base_type_codes() {
    assert_eq!(Some(BaseType::Integer), BaseType::from_code("I"));
    assert_eq!(Some(BaseType::Float), BaseType::from_code("R"));
    assert_eq!(Some(BaseType::Float), BaseType::from_code("P"));
    assert_eq!(Some(BaseType::Boolean), BaseType::from_code("L"));
    assert_eq!(Some(BaseType::String), BaseType::from_code("S"));
    assert_eq!(None, BaseType::from_code("X"));
    assert_eq!(None, BaseType::from_code(""));
}

#[test]
fn test_value_conformance() {
    assert!(Value::Int(3).conforms_to(&TypeExpr::Scalar(BaseType::Integer)));
    assert!(Value::Int(3).conforms_to(&TypeExpr::Scalar(BaseType::Float)));
    assert!(!Value::Float(3.0).conforms_to(&TypeExpr::Scalar(BaseType::Integer)));
    assert!(Value::None.conforms_to(&TypeExpr::Optional(BaseType::Integer)));
    assert!(!Value::None.conforms_to(&TypeExpr::Scalar(BaseType::Integer)));

    let spin = TypeExpr::Literal {
        base: BaseType::String,
        choices: vec![Value::Str("up".to_owned()), Value::Str("down".to_owned())],
        allow_none: false,
    };
    assert!(Value::Str("up".to_owned()).conforms_to(&spin));
    assert!(!Value::Str("sideways".to_owned()).conforms_to(&spin));
    assert!(!Value::None.conforms_to(&spin));

    assert!(Value::IntList(vec![3, 3, 3]).conforms_to(&TypeExpr::List(SeqKind::Int)));
    assert!(!Value::IntList(vec![3]).conforms_to(&TypeExpr::List(SeqKind::Vector3)));
}

#[test]
fn test_value_approx_eq() {
    assert!(Value::Float(1.0).approx_eq(&Value::Float(1.0)));
    assert!(Value::Float(1.0).approx_eq(&Value::Int(1)));
    assert!(Value::Int(1).approx_eq(&Value::Float(1.0)));
    assert!(!Value::Int(1).approx_eq(&Value::Int(2)));
    assert!(
        Value::Vectors(vec![[0.0, 0.0, 0.0]]).approx_eq(&Value::Vectors(vec![[0.0, 0.0, 0.0]]))
    );
    assert!(!Value::Vectors(vec![]).approx_eq(&Value::IntList(vec![])));
    assert!(Value::None.approx_eq(&Value::None));
}

#[test]
fn test_row_display() {
    let atom = AtomSite {
        symbol: "O".to_owned(),
        position: [0.0, 0.5, 0.25],
    };
    assert_eq!("O 0.0 0.5 0.25", format!("{atom}"));

    let proj = Projection::for_site("O", "sp3");
    assert_eq!("O:sp3", format!("{proj}"));

    let proj = Projection::for_fractional([0.5, 0.5, 0.5], "sp3");
    assert_eq!("f=0.5,0.5,0.5:sp3", format!("{proj}"));

    let proj = Projection {
        zaxis: [0.0, 1.0, 0.0],
        radial: 2,
        ..Projection::for_site("Fe", "dxy")
    };
    assert_eq!("Fe:dxy:z=0.0,1.0,0.0:r=2", format!("{proj}"));

    let sphere = DisSphere {
        center: [0.0, 0.0, 0.0],
        radius: 0.2,
    };
    assert_eq!("0.0 0.0 0.0 0.2", format!("{sphere}"));

    let segment = PathSegment {
        start_label: "G".to_owned(),
        start: [0.0, 0.0, 0.0],
        end_label: "X".to_owned(),
        end: [0.5, 0.0, 0.5],
    };
    assert_eq!("G 0.0 0.0 0.0 X 0.5 0.0 0.5", format!("{segment}"));
}

#[test]
fn test_render_categories() {
    assert_eq!(
        RenderCategory::Block {
            units: Some("ang"),
            keep_punctuation: false,
        },
        category_for("unit_cell_cart")
    );
    assert_eq!(
        RenderCategory::Block {
            units: None,
            keep_punctuation: true,
        },
        category_for("projections")
    );
    assert_eq!(RenderCategory::SpaceList, category_for("mp_grid"));
    assert_eq!(RenderCategory::CommaList, category_for("exclude_bands"));
    assert_eq!(RenderCategory::Scalar, category_for("num_wann"));
    assert_eq!(RenderCategory::Scalar, category_for("not_a_known_field"));
}

#[test]
fn test_schema_description_order_and_json() {
    let schema = SchemaDescription::new(
        "latest",
        vec![
            FieldDefinition::new(
                "num_wann",
                TypeExpr::Scalar(BaseType::Integer),
                None,
                "Number of Wannier functions",
            ),
            FieldDefinition::new(
                "title",
                TypeExpr::Scalar(BaseType::String),
                Some(Value::Str("untitled".to_owned())),
                "Title of the calculation",
            ),
        ],
    );

    assert_eq!(2, schema.len());
    assert!(schema.get("num_wann").unwrap().is_required());
    assert!(!schema.get("title").unwrap().is_required());
    assert!(schema.get("nope").is_none());

    // serialized field order must match declaration order
    let json: serde_json::Value = serde_json::from_str(&schema.to_json().unwrap()).unwrap();
    assert_eq!("latest", json["version"]);
    assert_eq!("num_wann", json["fields"][0]["name"]);
    assert_eq!("title", json["fields"][1]["name"]);
}

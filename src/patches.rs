// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-authored override rules for the Wannier90 parameter document.
//!
//! The document describes every parameter as a scalar; the block- and
//! list-valued parameters need replacement definitions, and a handful of
//! scalars are only meaningful when left unset.  These tables are data,
//! not code: the converter applies them with the precedence documented
//! in [`crate::convert`].

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

use crate::convert::OverrideRules;
use crate::schema::{FieldDefinition, SeqKind, TypeExpr, Value};

lazy_static! {
    pub static ref W90_RULES: OverrideRules = w90_rules();
}

/// Parameters dropped from the generated schema entirely.
const EXCLUDED: &[&str] = &["devel_flag", "timing_level"];

/// Structured block parameters: full replacement definitions with
/// empty-sequence defaults, so an instance only renders the blocks it
/// actually populates.
fn block_overrides() -> HashMap<String, FieldDefinition> {
    let defs: &[(&str, SeqKind, Value, &str)] = &[
        (
            "unit_cell_cart",
            SeqKind::Vector3,
            Value::Vectors(Vec::new()),
            "Unit cell lattice vectors in Cartesian coordinates",
        ),
        (
            "atoms_frac",
            SeqKind::Atom,
            Value::Atoms(Vec::new()),
            "Atomic positions in fractional coordinates",
        ),
        (
            "atoms_cart",
            SeqKind::Atom,
            Value::Atoms(Vec::new()),
            "Atomic positions in Cartesian coordinates",
        ),
        (
            "projections",
            SeqKind::Projection,
            Value::Projections(Vec::new()),
            "Initial orbital projections",
        ),
        (
            "kpoints",
            SeqKind::Vector3,
            Value::Vectors(Vec::new()),
            "K-points of the regular mesh in fractional coordinates",
        ),
        (
            "kpoint_path",
            SeqKind::PathSegment,
            Value::Path(Vec::new()),
            "High-symmetry path through the Brillouin zone",
        ),
        (
            "dis_spheres",
            SeqKind::Sphere,
            Value::Spheres(Vec::new()),
            "Spheres in k-space for sphere-restricted disentanglement",
        ),
        (
            "nnkpts",
            SeqKind::IntRow,
            Value::IntRows(Vec::new()),
            "Explicit nearest-neighbour k-point list",
        ),
        (
            "slwf_centres",
            SeqKind::Vector3,
            Value::Vectors(Vec::new()),
            "Target centres for selectively localised Wannier functions",
        ),
    ];

    defs.iter()
        .map(|(name, kind, default, description)| {
            (
                (*name).to_owned(),
                FieldDefinition::new(
                    name,
                    TypeExpr::List(*kind),
                    Some(default.clone()),
                    description,
                ),
            )
        })
        .collect()
}

/// Integer-list parameters: the document types them as plain integers,
/// so retype them and default to the empty list.
const INT_LISTS: &[&str] = &[
    "mp_grid",
    "exclude_bands",
    "shell_list",
    "select_projections",
    "wannier_plot_list",
    "bands_plot_project",
];

/// Parameters where "not given" is a meaningful state distinct from any
/// concrete value.
const ALLOW_NONE: &[&str] = &[
    "num_bands",
    "slwf_num",
    "dis_win_min",
    "dis_win_max",
    "dis_froz_min",
    "dis_froz_max",
    "fermi_energy",
];

pub fn w90_rules() -> OverrideRules {
    let exclude: HashSet<String> = EXCLUDED.iter().map(|s| (*s).to_owned()).collect();

    let mut type_overrides = HashMap::new();
    let mut default_overrides = HashMap::new();
    for name in INT_LISTS {
        type_overrides.insert((*name).to_owned(), TypeExpr::List(SeqKind::Int));
        default_overrides.insert((*name).to_owned(), Value::IntList(Vec::new()));
    }

    let allow_none: HashSet<String> = ALLOW_NONE.iter().map(|s| (*s).to_owned()).collect();

    OverrideRules {
        exclude,
        field_overrides: block_overrides(),
        type_overrides,
        default_overrides,
        allow_none,
    }
}

#[test]
fn test_w90_rules_consistency() {
    let rules = w90_rules();

    // a name must not appear in more than one override table
    for name in rules.field_overrides.keys() {
        assert!(!rules.type_overrides.contains_key(name), "{name}");
        assert!(!rules.default_overrides.contains_key(name), "{name}");
        assert!(!rules.exclude.contains(name), "{name}");
    }
    for name in rules.type_overrides.keys() {
        assert!(!rules.exclude.contains(name), "{name}");
    }

    // every block override default is an empty sequence of the right kind
    for def in rules.field_overrides.values() {
        let default = def.default.as_ref().unwrap();
        assert_eq!(Some(0), default.seq_len(), "{}", def.name);
        assert!(default.conforms_to(&def.ty), "{}", def.name);
    }

    assert!(rules.allow_none.contains("num_bands"));
    assert!(W90_RULES.exclude.contains("devel_flag"));
}

// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Text renderer: serializes a [`ModelInstance`] into Wannier90's flat
//! keyword/block input-file syntax.
//!
//! Only values that differ from their declared defaults are emitted,
//! matching the tool's own convention of listing deviations only.
//! Dispatch is a per-field category lookup, never inference from the
//! runtime value type.

use crate::model::ModelInstance;
use crate::schema::{RenderCategory, Value, fmt_float, vec3_str};

const INDENT: &str = " ";

/// Render an instance in the tool's native input-file format.  Never
/// fails for a validated instance.
pub fn render(instance: &ModelInstance) -> String {
    let mut lines: Vec<String> = Vec::new();

    for field in instance.schema().fields() {
        let value = match instance.get(&field.name) {
            Some(value) => value,
            None => continue,
        };
        if let Some(ref default) = field.default {
            if value.approx_eq(default) {
                continue;
            }
        }

        match field.category {
            RenderCategory::Block {
                units,
                keep_punctuation,
            } => push_block(&mut lines, &field.name, value, units, keep_punctuation),
            RenderCategory::SpaceList => push_list(&mut lines, &field.name, value, " "),
            RenderCategory::CommaList => push_list(&mut lines, &field.name, value, ","),
            RenderCategory::Scalar => {
                if let Some(text) = scalar_text(value) {
                    lines.push(format!("{} = {}", field.name, text));
                }
            }
        }
    }

    let mut out = lines.join("\n");
    // blocks bracket themselves with blank lines; adjacent blocks (or a
    // block at either end) must not produce doubled separators
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out.trim_matches('\n').to_owned()
}

fn sanitize(text: String) -> String {
    if text.contains(['[', ']', ',']) {
        text.chars()
            .filter(|c| !matches!(c, '[' | ']' | ','))
            .collect()
    } else {
        text
    }
}

/// One text line per sequence element, without indentation.
fn element_lines(value: &Value) -> Vec<String> {
    match value {
        Value::IntList(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::Vectors(v) => v.iter().map(vec3_str).collect(),
        Value::IntRows(rows) => rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|x| x.to_string())
                    .collect::<Vec<String>>()
                    .join(" ")
            })
            .collect(),
        Value::Atoms(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::Projections(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::Spheres(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::Path(v) => v.iter().map(|x| x.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn push_block(
    lines: &mut Vec<String>,
    name: &str,
    value: &Value,
    units: Option<&str>,
    keep_punctuation: bool,
) {
    let elements = element_lines(value);
    if elements.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("begin {name}"));
    if let Some(units) = units {
        lines.push(format!("{INDENT}{units}"));
    }
    for element in elements {
        let element = if keep_punctuation {
            element
        } else {
            sanitize(element)
        };
        lines.push(format!("{INDENT}{element}"));
    }
    lines.push(format!("end {name}"));
    lines.push(String::new());
}

fn push_list(lines: &mut Vec<String>, name: &str, value: &Value, separator: &str) {
    let items = element_lines(value);
    if items.is_empty() {
        return;
    }
    lines.push(format!("{name} = {}", items.join(separator)));
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Int(x) => Some(x.to_string()),
        Value::Float(x) => Some(fmt_float(*x)),
        Value::Bool(x) => Some(x.to_string()),
        Value::Str(x) => Some(x.clone()),
        // unset fields emit no line; sequences are routed by category
        _ => None,
    }
}

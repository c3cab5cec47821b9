// Copyright 2025 The W90Input Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Lookup of converted schemas by version (a release tag or commit
//! hash).  The registry is built once at startup by the embedding
//! application; fetching and persisting schema documents is out of
//! scope here.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::Result;
use crate::schema::SchemaDescription;
use crate::schema_err;

pub const LATEST: &str = "latest";

#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<SchemaDescription>>,
}

impl SchemaRegistry {
    pub fn new() -> SchemaRegistry {
        Default::default()
    }

    /// Register a schema under its version, replacing any previous
    /// registration for that version.
    pub fn register(&mut self, schema: SchemaDescription) -> Arc<SchemaDescription> {
        let schema = Arc::new(schema);
        self.schemas
            .insert(schema.version.clone(), Arc::clone(&schema));
        schema
    }

    pub fn get(&self, version: &str) -> Result<Arc<SchemaDescription>> {
        match self.schemas.get(version) {
            Some(schema) => Ok(Arc::clone(schema)),
            None => schema_err!(
                UnknownSchemaVersion,
                format!("no schema registered for version '{version}'")
            ),
        }
    }

    pub fn latest(&self) -> Result<Arc<SchemaDescription>> {
        self.get(LATEST)
    }

    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.schemas.keys().map(|v| v.as_str()).collect();
        versions.sort_unstable();
        versions
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload decoding and schema validation.
//!
//! Payloads are flat JSON objects whose key set must equal the category
//! schema exactly. Values pass through as raw strings: this is a transparent
//! logger, not a type-checker of readings.

use crate::schema::Category;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a payload was dropped instead of written.
///
/// Rejections are absorbed at the callback boundary; they are logged,
/// counted, and never abort the pipeline.
#[derive(Debug, Error)]
pub enum Rejection {
    /// The payload could not be decoded as a flat JSON object.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The decoded key set differs from the category schema.
    #[error("key set {observed:?} does not match the {category} schema")]
    SchemaMismatch {
        category: Category,
        observed: Vec<String>,
    },
}

/// Decode `payload` and check its key set against the category schema.
///
/// The key set must match exactly: a missing key and an unexpected extra
/// key are both a [`Rejection::SchemaMismatch`]. On success the values are
/// returned in schema-declared order, regardless of JSON key order.
pub fn validate(category: Category, payload: &[u8]) -> Result<Vec<String>, Rejection> {
    let object: Map<String, Value> = serde_json::from_slice(payload)?;

    let fields = category.fields();
    if object.len() != fields.len() || !fields.iter().all(|field| object.contains_key(*field)) {
        let mut observed: Vec<String> = object.keys().cloned().collect();
        observed.sort();
        return Err(Rejection::SchemaMismatch { category, observed });
    }

    Ok(fields.iter().map(|field| render(&object[*field])).collect())
}

/// Render a JSON value as the raw string that goes into the log row.
fn render(value: &Value) -> String {
    match value {
        // Strings pass through without the surrounding quotes.
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Measurement categories, per-category schemas, and topic bindings.
//!
//! The category set is closed: every subscribed topic is bound to exactly
//! one category, and each category defines both the required payload keys
//! and the output column order.

use std::fmt;

/// Measurement category carried by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Temperature,
    Flow,
    Pressure,
}

impl Category {
    /// All categories, in binding-table order.
    pub const ALL: [Category; 3] = [Category::Temperature, Category::Flow, Category::Pressure];

    /// Required payload keys, in output column order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Category::Temperature => &["temperature", "resistance", "timestamp"],
            Category::Flow => &[
                "temperature",
                "volflow",
                "massflow",
                "pressure",
                "setpoint",
                "timestamp",
            ],
            Category::Pressure => &["timestamp", "pressure"],
        }
    }

    /// Column labels for the header row, aligned with `fields()`.
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Category::Temperature => &["Temperature", "Resistance", "Datetime"],
            Category::Flow => &[
                "Temperature",
                "Volflow",
                "Massflow",
                "Pressure",
                "Setpoint",
                "Datetime",
            ],
            Category::Pressure => &["Datetime", "Pressure"],
        }
    }

    /// Lowercase name used in logs and configuration keys.
    pub fn name(self) -> &'static str {
        match self {
            Category::Temperature => "temperature",
            Category::Flow => "flow",
            Category::Pressure => "pressure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static topic-to-category binding table.
///
/// Bindings are data consumed by the dispatcher, not control flow; adding a
/// topic means adding a row here.
pub const TOPIC_BINDINGS: [(&str, Category); 3] = [
    ("ald/sample/temperature", Category::Temperature),
    ("ald/flow/state", Category::Flow),
    ("ald/pressure/main", Category::Pressure),
];

/// Resolve the category bound to a topic, if any.
pub fn category_for_topic(topic: &str) -> Option<Category> {
    TOPIC_BINDINGS
        .iter()
        .find(|(bound, _)| *bound == topic)
        .map(|&(_, category)| category)
}

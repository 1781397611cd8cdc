// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ALD data-acquisition bridge.
//!
//! Subscribes to the lab MQTT bus and durably appends validated sensor
//! readings to per-category delimited log files:
//! - `ald/sample/temperature` -> temperature log
//! - `ald/flow/state` -> flow log
//! - `ald/pressure/main` -> pressure log
//!
//! # Quick Start
//!
//! ```bash
//! # Defaults: broker on localhost:1883, legacy file names in the cwd
//! ald-bridge
//!
//! # Explicit broker and output directory
//! ald-bridge --host ald --temperature-file /data/sample_temperatures.dat
//!
//! # Everything from a config file
//! ald-bridge --config bridge.yaml
//! ```
//!
//! # Pipeline
//!
//! ```text
//! MQTT publish --> topic binding --> JSON decode --> key-set check --> durable append
//! ```
//!
//! Malformed and schema-mismatched payloads are logged and dropped; the
//! pipeline never stops for a bad message. A failed append is fatal: the
//! bridge tears down rather than continue an incomplete log.

pub mod bridge;
pub mod config;
pub mod mqtt;
pub mod schema;
pub mod sink;
pub mod validate;

pub use bridge::{Bridge, BridgeError, BridgeStats, InterruptHandle, Pipeline};
pub use config::BridgeConfig;
pub use mqtt::TransportError;
pub use schema::{category_for_topic, Category, TOPIC_BINDINGS};
pub use sink::CategorySink;
pub use validate::{validate, Rejection};

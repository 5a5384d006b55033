//! Shared fixtures for integration tests
//!
//! - `apps/`: software definitions (JSON)
//! - `systems/`: execution systems with their queues (TOML)
//! - `requests/`: job requests (JSON)

#![allow(dead_code)]

use job_intake::{ExecutionSystem, Software};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub fn fixture_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

/// The `wc-1.0` software definition.
pub fn wc_software() -> Software {
    Software::from_file(&fixture_path("apps/wc.json")).expect("wc.json should load")
}

/// The `hpc` system: debug (1 node), normal (default, 8 nodes), large (64 nodes).
pub fn hpc_system() -> ExecutionSystem {
    ExecutionSystem::from_file(&fixture_path("systems/hpc.toml")).expect("hpc.toml should load")
}

pub fn load_request(name: &str) -> Map<String, Value> {
    let path = fixture_path(&format!("requests/{}", name));
    let content = fs::read_to_string(&path).expect("request fixture should exist");
    match serde_json::from_str(&content).expect("request fixture should be JSON") {
        Value::Object(map) => map,
        other => panic!("request fixture is not an object: {}", other),
    }
}

/// Convert a `json!` literal into a request map.
pub fn request(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

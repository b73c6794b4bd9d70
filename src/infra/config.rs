// ============================================================
// Layer 6: Pipeline Configuration
// ============================================================
// The pipeline is driven by a flat key → value mapping
// (exp_id, model, dataset, task, evaluator, log_level, ...).
// It is stored as a serde_json object so it can be loaded from
// and saved to JSON exactly as written, and so factories can
// read the handful of keys they care about without a schema.
//
// Typed sections (WindowConfig, CawConfig) are built from it
// with the getters below, which fall back to a default when a
// key is absent and fail with InvalidInput when a key holds a
// value of the wrong type.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::{PipelineError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineConfig {
    values: Map<String, Value>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON object from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_value(serde_json::from_str(&text)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(PipelineError::invalid(format!(
                "configuration must be a JSON object, got {other}"
            ))),
        }
    }

    /// Builder-style insert, handy for tests and programmatic runs.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// String value of `key`, `None` when absent.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(wrong_type(key, "a string", other)),
        }
    }

    /// String value of `key`; a missing key is reported as NotFound.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)?
            .ok_or_else(|| PipelineError::not_found("config key", key))
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get_str(key)?.unwrap_or(default).to_string())
    }

    /// Render a string or number value for use in file names.
    pub fn display_value(&self, key: &str) -> Result<String> {
        match self.values.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            None | Some(Value::Null) => Err(PipelineError::not_found("config key", key)),
            Some(other) => Err(wrong_type(key, "a string or number", other)),
        }
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| wrong_type(key, "a number", v)),
        }
    }

    pub fn get_usize_or(&self, key: &str, default: usize) -> Result<usize> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| wrong_type(key, "a non-negative integer", v)),
        }
    }

    pub fn get_u64_or(&self, key: &str, default: u64) -> Result<u64> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v
                .as_u64()
                .ok_or_else(|| wrong_type(key, "a non-negative integer", v)),
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| wrong_type(key, "a boolean", v)),
        }
    }

    /// A list of non-negative integers, also accepting a single integer
    /// or numeric strings (`["32", "1"]`).
    pub fn get_usize_list_or(&self, key: &str, default: &[usize]) -> Result<Vec<usize>> {
        let parse = |v: &Value| -> Option<usize> {
            match v {
                Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
        };

        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default.to_vec()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| parse(v).ok_or_else(|| wrong_type(key, "a list of integers", v)))
                .collect(),
            Some(v) => parse(v)
                .map(|n| vec![n])
                .ok_or_else(|| wrong_type(key, "a list of integers", v)),
        }
    }
}

fn wrong_type(key: &str, expected: &str, got: &Value) -> PipelineError {
    PipelineError::invalid(format!("config key '{key}' must be {expected}, got {got}"))
}

//! Parameter declarations and the param comparison service.
//!
//! Param values are plain JSON values keyed by param id. Each state declares
//! its own params; a param marked `dynamic` may change value without forcing
//! the state to be exited and re-entered.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Concrete param values keyed by param id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawParams(BTreeMap<String, Value>);

impl RawParams {
    /// Create an empty param map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Return a new map with `id` set to `value`.
    pub fn with(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(id.into(), value.into());
        self
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merge `other` on top of `self`, producing a new map.
    ///
    /// Values in `other` win on conflicting ids.
    pub fn merged(&self, other: &RawParams) -> RawParams {
        let mut values = self.0.clone();
        values.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        RawParams(values)
    }
}

impl FromIterator<(String, Value)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RawParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}

/// Declaration of a single param owned by a state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Param id, unique within the declaring state
    pub id: String,
    /// Whether a value change alone keeps the state retained
    #[serde(default)]
    pub dynamic: bool,
    /// Value used when a target does not supply one
    #[serde(default)]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dynamic: false,
            default: None,
        }
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// The ordered set of params a state declares for itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSpecs(Vec<ParamSpec>);

impl ParamSpecs {
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        Self(specs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.0.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ParamSpec> {
        self.0.iter().find(|spec| spec.id == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Specs whose value changes force a reload.
    pub fn non_dynamic(&self) -> impl Iterator<Item = &ParamSpec> {
        self.0.iter().filter(|spec| !spec.dynamic)
    }

    /// Compare two value maps over the non-dynamic specs only.
    ///
    /// A param absent from both maps compares equal.
    pub fn non_dynamic_equal(&self, a: &RawParams, b: &RawParams) -> bool {
        self.non_dynamic().all(|spec| a.get(&spec.id) == b.get(&spec.id))
    }

    /// Select this state's own values out of `supplied`, falling back to
    /// `inherited` and then to declared defaults.
    pub fn values_from(&self, supplied: &RawParams, inherited: Option<&RawParams>) -> RawParams {
        self.0
            .iter()
            .filter_map(|spec| {
                supplied
                    .get(&spec.id)
                    .or_else(|| inherited.and_then(|params| params.get(&spec.id)))
                    .or(spec.default.as_ref())
                    .map(|value| (spec.id.clone(), value.clone()))
            })
            .collect()
    }
}

//! Navigation targets and per-transition options.

use crate::core::RawParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Forced re-entry request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reload {
    /// Retain whatever can be retained
    #[default]
    None,
    /// Re-enter every state of the target path
    All,
    /// Re-enter the named state and everything below it
    State(String),
}

/// Options carried by a target and the transition built from it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionOptions {
    #[serde(default)]
    pub reload: Reload,
    /// Copy params missing from the target from the current path
    #[serde(default)]
    pub inherit: bool,
    /// Caller payload, opaque to the engine
    #[serde(default)]
    pub custom: Option<Value>,
    /// Emit trace events for this transition
    #[serde(default)]
    pub trace: bool,
}

impl TransitionOptions {
    pub fn reload(mut self, reload: Reload) -> Self {
        self.reload = reload;
        self
    }

    pub fn inherit(mut self) -> Self {
        self.inherit = true;
        self
    }

    pub fn custom(mut self, custom: Value) -> Self {
        self.custom = Some(custom);
        self
    }

    pub fn traced(mut self) -> Self {
        self.trace = true;
        self
    }
}

/// Destination of a navigation: a state name, raw param values and options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    pub state: String,
    #[serde(default)]
    pub params: RawParams,
    #[serde(default)]
    pub options: TransitionOptions,
}

impl TargetState {
    pub fn new(state: impl Into<String>, params: RawParams) -> Self {
        Self {
            state: state.into(),
            params,
            options: TransitionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransitionOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'{}", self.state, self.params)
    }
}

/// Selects one of a transition's paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathName {
    From,
    To,
    Retained,
    Exiting,
    Entering,
}

//! Save and restore the current navigation position.
//!
//! A [`PathSnapshot`] records state names and param values only. Resolve
//! data and hooks are not serializable; restoring rebuilds fresh, unresolved
//! nodes through a [`StateProvider`].

use crate::core::{Environment, Node, Path, RawParams, StateProvider, StateRef};
use crate::transition::TransitionService;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// One node of a snapshot: a state name and its own param values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub state: String,
    pub params: RawParams,
}

/// Serializable capture of a path, root first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathSnapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    pub nodes: Vec<NodeSnapshot>,
}

// Binary layout. bincode cannot decode self-describing values, so params
// travel as JSON text.
#[derive(Serialize, Deserialize)]
struct EncodedSnapshot {
    version: u32,
    id: Uuid,
    timestamp: DateTime<Utc>,
    nodes: Vec<(String, String)>,
}

impl PathSnapshot {
    pub fn from_path<Env: Environment>(path: &Path<Env>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            nodes: path
                .nodes()
                .iter()
                .map(|node| NodeSnapshot {
                    state: node.state().name().to_string(),
                    params: node.params().clone(),
                })
                .collect(),
        }
    }

    /// Snapshot of the service's current path.
    pub fn capture<Env: Environment>(service: &TransitionService<Env>) -> Self {
        Self::from_path(&service.current_path())
    }

    /// Name of the leaf state, if any.
    pub fn leaf(&self) -> Option<&str> {
        self.nodes.last().map(|n| n.state.as_str())
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                serde_json::to_string(&node.params)
                    .map(|params| (node.state.clone(), params))
                    .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let encoded = EncodedSnapshot {
            version: self.version,
            id: self.id,
            timestamp: self.timestamp,
            nodes,
        };
        bincode::serialize(&encoded).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let encoded: EncodedSnapshot = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        let nodes = encoded
            .nodes
            .into_iter()
            .map(|(state, params)| {
                serde_json::from_str(&params)
                    .map(|params| NodeSnapshot { state, params })
                    .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let snapshot = Self {
            version: encoded.version,
            id: encoded.id,
            timestamp: encoded.timestamp,
            nodes,
        };
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Rebuild the path through `provider`.
    ///
    /// Every state must be known and each node must be the parent of the
    /// next, starting from a root state. The returned path is materialized
    /// with fresh resolvables.
    pub fn restore<Env, P>(&self, provider: &P) -> Result<Path<Env>, CheckpointError>
    where
        Env: Environment,
        P: StateProvider<Env> + ?Sized,
    {
        self.check_version()?;
        let mut nodes: Vec<Node<Env>> = Vec::with_capacity(self.nodes.len());
        for snapshot in &self.nodes {
            let state = provider
                .state(&snapshot.state)
                .ok_or_else(|| CheckpointError::UnknownState {
                    name: snapshot.state.clone(),
                })?;
            check_parent(&state, nodes.last().map(Node::state))?;
            nodes.push(Node::new(state, snapshot.params.clone()));
        }
        Ok(Path::new(nodes).materialize(&RawParams::new()))
    }

    /// Restore and make the result the service's current path.
    ///
    /// History is left untouched and no hooks run.
    pub fn restore_into<Env: Environment>(
        &self,
        service: &TransitionService<Env>,
    ) -> Result<(), CheckpointError> {
        let path = self.restore(service.provider())?;
        tracing::debug!(snapshot = %self.id, leaf = ?self.leaf(), "path restored");
        service.replace_current(path);
        Ok(())
    }

    fn check_version(&self) -> Result<(), CheckpointError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            })
        }
    }
}

fn check_parent<Env: Environment>(
    state: &StateRef<Env>,
    expected: Option<&StateRef<Env>>,
) -> Result<(), CheckpointError> {
    let contiguous = match (state.parent(), expected) {
        (None, None) => true,
        (Some(parent), Some(expected)) => Arc::ptr_eq(parent, expected),
        _ => false,
    };
    if contiguous {
        Ok(())
    } else {
        Err(CheckpointError::BrokenAncestry {
            state: state.name().to_string(),
            expected: expected
                .map(|s| s.name().to_string())
                .unwrap_or_else(|| "<root>".to_string()),
        })
    }
}

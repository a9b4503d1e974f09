//! Trace events and the optional sink they are delivered to.
//!
//! Every emitted event is logged through `tracing`. A [`TraceSink`] may be
//! attached to receive the same events; sink failures never reach the
//! transition pipeline.

use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Observable points of the engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    TransitionStart {
        id: u64,
        from: Option<String>,
        to: String,
    },
    TransitionIgnored {
        id: u64,
        to: String,
    },
    TransitionSettled {
        id: u64,
        outcome: String,
    },
    ResolveStart {
        transition: Option<u64>,
        name: String,
    },
    ResolveEnd {
        transition: Option<u64>,
        name: String,
        ok: bool,
    },
}

/// Fire-and-forget receiver of trace events.
pub trait TraceSink: Send + Sync {
    fn on_event(&self, event: &TraceEvent);
}

impl<F> TraceSink for F
where
    F: Fn(&TraceEvent) + Send + Sync,
{
    fn on_event(&self, event: &TraceEvent) {
        self(event)
    }
}

/// Cheap, cloneable handle used to emit trace events.
#[derive(Clone, Default)]
pub struct Tracer {
    sink: Option<Arc<dyn TraceSink>>,
    enabled: bool,
}

impl Tracer {
    /// A tracer that emits nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(sink: Option<Arc<dyn TraceSink>>) -> Self {
        Self {
            sink,
            enabled: true,
        }
    }

    /// Same sink, with emission switched on or off.
    pub fn enabled(&self, enabled: bool) -> Self {
        Self {
            sink: self.sink.clone(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn emit(&self, event: TraceEvent) {
        if !self.enabled {
            return;
        }
        tracing::trace!(target: "waypoint::trace", ?event, "trace event");
        if let Some(sink) = &self.sink {
            if catch_unwind(AssertUnwindSafe(|| sink.on_event(&event))).is_err() {
                tracing::warn!(target: "waypoint::trace", "trace sink panicked; event dropped");
            }
        }
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.enabled)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

//! Observation kinds and trace propagation context
//!
//! Specialised observation kinds (agents, tools, retrievers, ...) are stored
//! on the backend as spans or generations tagged with an `observation_type`
//! metadata entry.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ids::trace_id;
use crate::impl_wire_name_conversions;

/// Metadata key carrying the specialised observation kind.
pub const OBSERVATION_TYPE_KEY: &str = "observation_type";

/// Kind of work an observation describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationType {
    Span,
    Generation,
    Event,
    /// Reasoning block driven by a model
    Agent,
    /// Call to an external tool or API
    Tool,
    /// Step connecting other application steps
    Chain,
    /// Data retrieval, e.g. from a vector store
    Retriever,
    /// Embedding model call
    Embedding,
    /// Assessment of model output
    Evaluator,
    /// Protection against jailbreaks and unsafe output
    Guardrail,
}

impl_wire_name_conversions!(ObservationType {
    Span => "span",
    Generation => "generation",
    Event => "event",
    Agent => "agent",
    Tool => "tool",
    Chain => "chain",
    Retriever => "retriever",
    Embedding => "embedding",
    Evaluator => "evaluator",
    Guardrail => "guardrail",
});

/// Record family an observation is stored as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Span,
    Generation,
    Event,
}

impl ObservationType {
    pub const fn shape(self) -> RecordShape {
        match self {
            Self::Generation | Self::Embedding => RecordShape::Generation,
            Self::Event => RecordShape::Event,
            Self::Span
            | Self::Agent
            | Self::Tool
            | Self::Chain
            | Self::Retriever
            | Self::Evaluator
            | Self::Guardrail => RecordShape::Span,
        }
    }

    /// Metadata tagging a specialised kind; `None` for plain spans,
    /// generations and events.
    pub fn metadata(self) -> Option<Value> {
        match self {
            Self::Span | Self::Generation | Self::Event => None,
            _ => Some(json!({ OBSERVATION_TYPE_KEY: self.as_str() })),
        }
    }
}

/// Position in a trace that new observations attach to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: String,
    /// Observation that becomes the parent of new observations
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub observation_id: Option<String>,
}

impl TraceContext {
    /// Context at the root of a new random trace.
    pub fn new_trace() -> Self {
        Self { trace_id: trace_id(None), observation_id: None }
    }

    /// Context at the root of the trace derived from `seed`.
    pub fn seeded(seed: &str) -> Self {
        Self { trace_id: trace_id(Some(seed)), observation_id: None }
    }

    /// Context at the root of an existing trace.
    pub fn for_trace(trace_id: impl Into<String>) -> Self {
        Self { trace_id: trace_id.into(), observation_id: None }
    }

    /// Context nested under `observation_id` in the same trace.
    #[must_use]
    pub fn child_of(&self, observation_id: impl Into<String>) -> Self {
        Self { trace_id: self.trace_id.clone(), observation_id: Some(observation_id.into()) }
    }
}

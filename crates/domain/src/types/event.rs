//! Queue envelope for telemetry records
//!
//! A [`TelemetryEvent`] pairs an identifier and timestamp with one record. The
//! batch processor treats it as opaque; only the transport looks inside the
//! payload when it serializes a batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::records::{Event, Generation, GenerationUpdate, Score, Span, SpanUpdate, Trace};
use crate::ids::{ensure_id, new_id};
use crate::impl_wire_name_conversions;

/// Kind of record carried by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TraceCreate,
    SpanCreate,
    SpanUpdate,
    GenerationCreate,
    GenerationUpdate,
    EventCreate,
    ScoreCreate,
}

impl_wire_name_conversions!(EventKind {
    TraceCreate => "trace-create",
    SpanCreate => "span-create",
    SpanUpdate => "span-update",
    GenerationCreate => "generation-create",
    GenerationUpdate => "generation-update",
    EventCreate => "event-create",
    ScoreCreate => "score-create",
});

/// Record body, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "kebab-case")]
pub enum EventPayload {
    TraceCreate(Trace),
    SpanCreate(Span),
    SpanUpdate(SpanUpdate),
    GenerationCreate(Generation),
    GenerationUpdate(GenerationUpdate),
    EventCreate(Event),
    ScoreCreate(Score),
}

impl EventPayload {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::TraceCreate(_) => EventKind::TraceCreate,
            Self::SpanCreate(_) => EventKind::SpanCreate,
            Self::SpanUpdate(_) => EventKind::SpanUpdate,
            Self::GenerationCreate(_) => EventKind::GenerationCreate,
            Self::GenerationUpdate(_) => EventKind::GenerationUpdate,
            Self::EventCreate(_) => EventKind::EventCreate,
            Self::ScoreCreate(_) => EventKind::ScoreCreate,
        }
    }

    /// Identifier of the record inside the payload, when it has one.
    pub fn record_id(&self) -> Option<&str> {
        let id = match self {
            Self::TraceCreate(trace) => trace.id.as_deref(),
            Self::SpanCreate(span) => span.id.as_deref(),
            Self::SpanUpdate(update) => Some(update.id.as_str()),
            Self::GenerationCreate(generation) => generation.id.as_deref(),
            Self::GenerationUpdate(update) => Some(update.id.as_str()),
            Self::EventCreate(event) => event.id.as_deref(),
            Self::ScoreCreate(score) => score.id.as_deref(),
        };
        id.filter(|id| !id.is_empty())
    }
}

/// One identified, timestamped record destined for the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl TelemetryEvent {
    /// Wrap a payload, reusing the record identifier when present.
    pub fn new(payload: EventPayload) -> Self {
        let id = payload.record_id().map_or_else(new_id, str::to_string);
        Self { id, timestamp: None, payload }
    }

    pub const fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Assign identifier and timestamp when they are missing.
    pub fn fill_defaults(&mut self) {
        if self.id.is_empty() {
            self.id = new_id();
        }
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }
    }

    pub fn trace(mut trace: Trace) -> Self {
        let id = ensure_id(&mut trace.id);
        Self { id, timestamp: None, payload: EventPayload::TraceCreate(trace) }
    }

    pub fn span(mut span: Span) -> Self {
        let id = ensure_id(&mut span.id);
        Self { id, timestamp: None, payload: EventPayload::SpanCreate(span) }
    }

    /// Partial update keyed by the identifier of an existing span.
    pub fn span_update(span_id: impl Into<String>, mut update: SpanUpdate) -> Self {
        update.id = span_id.into();
        Self { id: update.id.clone(), timestamp: None, payload: EventPayload::SpanUpdate(update) }
    }

    pub fn generation(mut generation: Generation) -> Self {
        let id = ensure_id(&mut generation.id);
        Self { id, timestamp: None, payload: EventPayload::GenerationCreate(generation) }
    }

    /// Partial update keyed by the identifier of an existing generation.
    pub fn generation_update(
        generation_id: impl Into<String>,
        mut update: GenerationUpdate,
    ) -> Self {
        update.id = generation_id.into();
        Self {
            id: update.id.clone(),
            timestamp: None,
            payload: EventPayload::GenerationUpdate(update),
        }
    }

    pub fn event(mut event: Event) -> Self {
        let id = ensure_id(&mut event.id);
        Self { id, timestamp: None, payload: EventPayload::EventCreate(event) }
    }

    pub fn score(mut score: Score) -> Self {
        let id = ensure_id(&mut score.id);
        Self { id, timestamp: None, payload: EventPayload::ScoreCreate(score) }
    }
}

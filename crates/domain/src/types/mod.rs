//! Telemetry record types and the queue envelope

pub mod event;
pub mod observation;
pub mod records;

pub use event::{EventKind, EventPayload, TelemetryEvent};
pub use observation::{ObservationType, RecordShape, TraceContext, OBSERVATION_TYPE_KEY};
pub use records::{
    Event, Generation, GenerationUpdate, Level, Score, Span, SpanUpdate, Trace, Usage,
};

//! Observation handles for nested LLM workflow steps
//!
//! Starting an observation records its create event immediately; [`end`]
//! records the closing update with the end time. Children started from a
//! handle share its trace and name it as their parent.
//!
//! [`end`]: Observation::end

use chrono::Utc;
use serde_json::Value;
use tracebatch_domain::{
    observation_id, Event, Generation, GenerationUpdate, Level, ObservationType, RecordShape,
    Span, SpanUpdate, TraceContext,
};
use tracing::debug;

use crate::batch::BatchResult;
use crate::client::TelemetryClient;

/// Changes applied to a running observation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationUpdate {
    pub output: Option<Value>,
    pub metadata: Option<Value>,
    pub level: Option<Level>,
    pub status_message: Option<String>,
    /// Only recorded for generation-like observations
    pub model: Option<String>,
}

/// Running observation recorded through a [`TelemetryClient`]
#[derive(Debug)]
#[must_use = "an observation stays open until `end` is called"]
pub struct Observation<'c> {
    client: &'c TelemetryClient,
    kind: ObservationType,
    id: String,
    parent: TraceContext,
}

impl<'c> Observation<'c> {
    pub(crate) fn start(
        client: &'c TelemetryClient,
        parent: &TraceContext,
        kind: ObservationType,
        name: String,
        input: Option<Value>,
    ) -> BatchResult<Self> {
        let id = Some(observation_id(None));
        let trace_id = Some(parent.trace_id.clone());
        let parent_observation_id = parent.observation_id.clone();
        let start_time = Some(Utc::now());
        let metadata = kind.metadata();
        let name = Some(name);

        let id = match kind.shape() {
            RecordShape::Span => client.create_span(Span {
                id,
                trace_id,
                parent_observation_id,
                name,
                start_time,
                input,
                metadata,
                ..Span::default()
            }),
            RecordShape::Generation => client.create_generation(Generation {
                id,
                trace_id,
                parent_observation_id,
                name,
                start_time,
                input,
                metadata,
                ..Generation::default()
            }),
            RecordShape::Event => client.create_event(Event {
                id,
                trace_id,
                parent_observation_id,
                name,
                start_time,
                input,
                metadata,
                ..Event::default()
            }),
        }?;

        debug!(
            observation_id = %id,
            kind = %kind,
            trace_id = %parent.trace_id,
            "Observation started"
        );
        Ok(Self { client, kind, id, parent: parent.clone() })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn kind(&self) -> ObservationType {
        self.kind
    }

    pub fn trace_id(&self) -> &str {
        &self.parent.trace_id
    }

    pub fn parent_observation_id(&self) -> Option<&str> {
        self.parent.observation_id.as_deref()
    }

    /// Context that makes this observation the parent of new ones.
    #[must_use]
    pub fn context(&self) -> TraceContext {
        self.parent.child_of(self.id.clone())
    }

    /// Start an observation nested under this one.
    ///
    /// # Errors
    /// Fails like [`TelemetryClient::start_observation`].
    pub fn start_child(
        &self,
        kind: ObservationType,
        name: impl Into<String>,
        input: Option<Value>,
    ) -> BatchResult<Observation<'c>> {
        Observation::start(self.client, &self.context(), kind, name.into(), input)
    }

    /// Record `update` for this observation. Events accept no updates and
    /// ignore it.
    ///
    /// # Errors
    /// Returns the enqueue error when the update cannot be queued.
    pub fn update(&self, update: ObservationUpdate) -> BatchResult<()> {
        match self.kind.shape() {
            RecordShape::Span => self.client.update_span(
                &self.id,
                SpanUpdate {
                    trace_id: Some(self.parent.trace_id.clone()),
                    output: update.output,
                    metadata: update.metadata,
                    level: update.level,
                    status_message: update.status_message,
                    ..SpanUpdate::default()
                },
            ),
            RecordShape::Generation => self.client.update_generation(
                &self.id,
                GenerationUpdate {
                    trace_id: Some(self.parent.trace_id.clone()),
                    model: update.model,
                    output: update.output,
                    metadata: update.metadata,
                    level: update.level,
                    status_message: update.status_message,
                    ..GenerationUpdate::default()
                },
            ),
            RecordShape::Event => Ok(()),
        }
    }

    /// Close the observation by recording its end time. Events are
    /// instantaneous and record nothing.
    ///
    /// # Errors
    /// Returns the enqueue error when the closing update cannot be queued.
    pub fn end(self) -> BatchResult<()> {
        let trace_id = Some(self.parent.trace_id.clone());
        let end_time = Some(Utc::now());
        match self.kind.shape() {
            RecordShape::Span => self.client.update_span(
                &self.id,
                SpanUpdate { trace_id, end_time, ..SpanUpdate::default() },
            ),
            RecordShape::Generation => self.client.update_generation(
                &self.id,
                GenerationUpdate { trace_id, end_time, ..GenerationUpdate::default() },
            ),
            RecordShape::Event => Ok(()),
        }
    }
}

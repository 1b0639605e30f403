//! Example: Recording telemetry through the asynchronous batch processor
//!
//! With `TRACEBATCH_PUBLIC_KEY` and `TRACEBATCH_SECRET_KEY` set (and
//! optionally `TRACEBATCH_BASE_URL`), records are posted to the ingestion
//! endpoint. Otherwise batches are printed to stdout.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run -p tracebatch-infra --example async_batch
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracebatch_core::BatchSender;
use tracebatch_domain::{
    BatchConfig, DeliveryError, Generation, GenerationUpdate, Level, Score, Span, SpanUpdate,
    TelemetryEvent, Trace, Usage,
};
use tracebatch_infra::{config, TelemetryClient};

/// Prints each batch instead of sending it.
struct StdoutSender;

#[async_trait]
impl BatchSender for StdoutSender {
    async fn send_batch(&self, batch: &[TelemetryEvent]) -> Result<(), DeliveryError> {
        println!("-- batch of {} --", batch.len());
        for event in batch {
            println!("  {} {}", event.kind(), event.id);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let batch = BatchConfig {
        max_batch_size: 4,
        flush_interval: Duration::from_millis(500),
        ..BatchConfig::default()
    };

    let client = match config::load_from_env() {
        Ok(mut loaded) => {
            println!("Sending to {}", loaded.client.base_url);
            loaded.batch = batch;
            TelemetryClient::from_config(&loaded)?
        }
        Err(_) => {
            println!("No credentials in environment; printing batches");
            TelemetryClient::new(Arc::new(StdoutSender), batch)?
        }
    };

    let trace_id = client.create_trace(Trace {
        user_id: Some("user-123".into()),
        ..Trace::new("support chat")
    })?;

    let span_id = client.create_span(Span::new(&trace_id, "retrieve context"))?;
    client.update_span(
        &span_id,
        SpanUpdate { level: Some(Level::Debug), ..SpanUpdate::default() },
    )?;

    let generation_id = client.create_generation(Generation {
        model: Some("claude-haiku".into()),
        ..Generation::new(&trace_id, "answer")
    })?;
    client.update_generation(
        &generation_id,
        GenerationUpdate {
            usage: Some(Usage { input: Some(120), output: Some(48), ..Usage::default() }),
            ..GenerationUpdate::default()
        },
    )?;
    client.create_score(Score::new(&trace_id, "helpfulness", 0.92))?;

    println!("Queued events: {}", client.queue_len());

    // Let the size trigger and the timer do their work.
    tokio::time::sleep(Duration::from_secs(1)).await;

    client.create_trace(Trace::new("late trace"))?;
    client.flush().await?;

    client.shutdown().await?;
    println!("Delivery metrics: {:?}", client.processor().metrics());

    Ok(())
}

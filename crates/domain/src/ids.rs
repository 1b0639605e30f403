//! Identifier generation for telemetry records
//!
//! Record identifiers are UUIDs. Trace and observation identifiers follow the
//! W3C trace-context widths (16 and 8 bytes, lowercase hex) and can be derived
//! from a seed so that an external key always maps to the same trace.

use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const TRACE_ID_BYTES: usize = 16;
const OBSERVATION_ID_BYTES: usize = 8;
const TRACE_ID_SALT: &[u8] = b"tracebatch-trace-id";
const OBSERVATION_ID_SALT: &[u8] = b"tracebatch-observation-id";

/// Generate a fresh random record identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Return `id` when it is set, otherwise a freshly generated identifier.
pub fn ensure_id(id: &mut Option<String>) -> String {
    match id {
        Some(existing) if !existing.is_empty() => existing.clone(),
        _ => {
            let generated = new_id();
            *id = Some(generated.clone());
            generated
        }
    }
}

/// Trace identifier of 32 hex characters.
///
/// A non-empty `seed` always yields the same identifier; otherwise the
/// identifier is random.
pub fn trace_id(seed: Option<&str>) -> String {
    hex_id(TRACE_ID_BYTES, TRACE_ID_SALT, seed)
}

/// Observation identifier of 16 hex characters, seeded like [`trace_id`].
pub fn observation_id(seed: Option<&str>) -> String {
    hex_id(OBSERVATION_ID_BYTES, OBSERVATION_ID_SALT, seed)
}

fn hex_id(len: usize, salt: &[u8], seed: Option<&str>) -> String {
    if let Some(seed) = seed.filter(|seed| !seed.is_empty()) {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(seed.as_bytes());
        let digest = hasher.finalize();
        return hex::encode(&digest[..len]);
    }

    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}

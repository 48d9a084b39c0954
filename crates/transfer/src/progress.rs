use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Progress of one chunk: a percentage while in flight, `Done` once the
/// server accepted it.
///
/// Serialises as a JSON number or the string `"done"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChunkProgress {
    Percent(f64),
    Done,
}

impl ChunkProgress {
    /// Contribution of this chunk to the file's mean progress.
    pub fn value(&self) -> f64 {
        match self {
            ChunkProgress::Percent(p) => *p,
            ChunkProgress::Done => 100.0,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ChunkProgress::Done)
    }
}

impl Default for ChunkProgress {
    fn default() -> Self {
        ChunkProgress::Percent(0.0)
    }
}

impl Serialize for ChunkProgress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChunkProgress::Percent(p) => serializer.serialize_f64(*p),
            ChunkProgress::Done => serializer.serialize_str("done"),
        }
    }
}

impl<'de> Deserialize<'de> for ChunkProgress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChunkProgressVisitor;

        impl Visitor<'_> for ChunkProgressVisitor {
            type Value = ChunkProgress;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a percentage or \"done\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<ChunkProgress, E> {
                Ok(ChunkProgress::Percent(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ChunkProgress, E> {
                Ok(ChunkProgress::Percent(v as f64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ChunkProgress, E> {
                Ok(ChunkProgress::Percent(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ChunkProgress, E> {
                if v == "done" {
                    Ok(ChunkProgress::Done)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(ChunkProgressVisitor)
    }
}

/// Percentage of `loaded` out of `total` bytes, clamped to `0..=100`.
///
/// Returns 0 for an empty total.
pub fn percent_complete(loaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (loaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// Mean progress across chunk slots, counting `Done` as 100.
///
/// An empty slot list has no progress.
pub fn aggregate_chunk_progress(chunks: &[ChunkProgress]) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }
    chunks.iter().map(ChunkProgress::value).sum::<f64>() / chunks.len() as f64
}

/// `true` once every slot is `Done`. An empty list is never done.
pub fn all_chunks_done(chunks: &[ChunkProgress]) -> bool {
    !chunks.is_empty() && chunks.iter().all(ChunkProgress::is_done)
}

/// Remaining whole seconds, extrapolated linearly from `elapsed` at
/// `percent` completion.
///
/// Zero, negative and non-finite percentages yield 0.
pub fn estimate_remaining_secs(elapsed: Duration, percent: f64) -> u64 {
    if !percent.is_finite() || percent <= 0.0 || percent >= 100.0 {
        return 0;
    }
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let remaining_ms = elapsed_ms / percent * (100.0 - percent);
    (remaining_ms / 1000.0).floor() as u64
}

/// Seconds remaining for an upload started at `started_at`, measured at `now`.
///
/// A clock that went backwards counts as no elapsed time.
pub fn estimated_seconds_remaining(
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
    percent: f64,
) -> u64 {
    let elapsed = (now - started_at).to_std().unwrap_or_default();
    estimate_remaining_secs(elapsed, percent)
}

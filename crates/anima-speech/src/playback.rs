//! Gapless playback scheduling
//!
//! Chunks arrive in bursts; each is scheduled to start exactly where the
//! previous one ends, or now if the queue has drained. Times are seconds on
//! the host's audio clock.

use std::collections::VecDeque;

use anima_core::{AnimaError, AnimaResult};
use tracing::trace;

/// Where a chunk landed on the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledChunk {
    pub start: f64,
    pub duration: f64,
}

impl ScheduledChunk {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

#[derive(Debug)]
struct QueuedChunk {
    slot: ScheduledChunk,
    sample_rate: u32,
    samples: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct PlaybackQueue {
    next_start: f64,
    chunks: VecDeque<QueuedChunk>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `samples` right after whatever is already queued
    pub fn enqueue(&mut self, samples: Vec<f32>, sample_rate: u32, now: f64) -> AnimaResult<ScheduledChunk> {
        if sample_rate == 0 {
            return Err(AnimaError::InvalidSampleRate(sample_rate));
        }
        self.prune(now);

        let start = self.next_start.max(now);
        let duration = samples.len() as f64 / f64::from(sample_rate);
        let slot = ScheduledChunk { start, duration };
        self.next_start = slot.end();

        trace!(start, duration, "scheduled speech chunk");
        self.chunks.push_back(QueuedChunk {
            slot,
            sample_rate,
            samples,
        });
        Ok(slot)
    }

    /// Up to `window` samples under the playhead at `t`; empty when silent
    pub fn playing_at(&self, t: f64, window: usize) -> &[f32] {
        let Some(chunk) = self
            .chunks
            .iter()
            .find(|c| c.slot.start <= t && t < c.slot.end())
        else {
            return &[];
        };
        let offset = ((t - chunk.slot.start) * f64::from(chunk.sample_rate)) as usize;
        let offset = offset.min(chunk.samples.len());
        let end = (offset + window).min(chunk.samples.len());
        &chunk.samples[offset..end]
    }

    pub fn is_playing(&self, t: f64) -> bool {
        self.chunks
            .iter()
            .any(|c| c.slot.start <= t && t < c.slot.end())
    }

    /// End of the last scheduled chunk
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drop everything; the next chunk starts at its own `now`
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.next_start = 0.0;
    }

    fn prune(&mut self, now: f64) {
        while self.chunks.front().is_some_and(|c| c.slot.end() <= now) {
            self.chunks.pop_front();
        }
    }
}

//! Microphone capture chunking
//!
//! Capture callbacks deliver arbitrary buffer sizes; the backend expects
//! fixed 4096-sample mono chunks at 16 kHz, base64 PCM16 encoded.

use crate::encode_pcm16_base64;

pub const MIC_SAMPLE_RATE: u32 = 16_000;
pub const MIC_CHUNK_SAMPLES: usize = 4096;

#[derive(Debug)]
pub struct MicChunker {
    chunk: usize,
    pending: Vec<f32>,
}

impl MicChunker {
    pub fn new(chunk: usize) -> Self {
        let chunk = chunk.max(1);
        Self {
            chunk,
            pending: Vec::with_capacity(chunk),
        }
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Append captured samples; returns every completed chunk
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut ready = Vec::new();
        let mut rest = samples;
        while !rest.is_empty() {
            let take = (self.chunk - self.pending.len()).min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.pending.len() == self.chunk {
                ready.push(std::mem::replace(&mut self.pending, Vec::with_capacity(self.chunk)));
            }
        }
        ready
    }

    /// Like [`push`](Self::push), already encoded for the wire
    pub fn push_encoded(&mut self, samples: &[f32]) -> Vec<String> {
        self.push(samples)
            .iter()
            .map(|c| encode_pcm16_base64(c))
            .collect()
    }

    /// Emit the partial chunk, if any
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

impl Default for MicChunker {
    fn default() -> Self {
        Self::new(MIC_CHUNK_SAMPLES)
    }
}

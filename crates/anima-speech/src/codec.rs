//! PCM codec - base64 little-endian i16 <-> f32 samples
//!
//! The wire carries signed 16-bit mono PCM, base64 encoded. Decoding scales
//! by 1/32768; encoding is asymmetric so that -1.0 maps to `i16::MIN` and
//! 1.0 to `i16::MAX`.

use anima_core::{AnimaError, AnimaResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Decode raw little-endian i16 PCM bytes
pub fn decode_pcm16(raw: &[u8]) -> AnimaResult<Vec<f32>> {
    if raw.len() % 2 != 0 {
        return Err(AnimaError::OddPcmLength(raw.len()));
    }
    let mut buf = Bytes::copy_from_slice(raw);
    let mut samples = Vec::with_capacity(raw.len() / 2);
    while buf.has_remaining() {
        samples.push(f32::from(buf.get_i16_le()) / 32768.0);
    }
    Ok(samples)
}

pub fn decode_pcm16_base64(payload: &str) -> AnimaResult<Vec<f32>> {
    let raw = STANDARD
        .decode(payload.trim())
        .map_err(|e| AnimaError::InvalidBase64(e.to_string()))?;
    decode_pcm16(&raw)
}

/// One f32 sample to i16, clamped to [-1, 1]
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

pub fn encode_pcm16(samples: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * 2);
    for &s in samples {
        buf.put_i16_le(sample_to_i16(s));
    }
    buf.freeze()
}

pub fn encode_pcm16_base64(samples: &[f32]) -> String {
    STANDARD.encode(encode_pcm16(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extremes() {
        assert_eq!(sample_to_i16(-1.0), i16::MIN);
        assert_eq!(sample_to_i16(1.0), i16::MAX);
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_decode_known_bytes() {
        // 0x8000 = -32768, 0x4000 = 16384
        let samples = decode_pcm16(&[0x00, 0x80, 0x00, 0x40]).unwrap();
        assert_eq!(samples, vec![-1.0, 0.5]);
    }

    #[test]
    fn test_base64_payload() {
        // [0x00, 0x40] -> 0.5
        let samples = decode_pcm16_base64("AEA=").unwrap();
        assert_eq!(samples, vec![0.5]);
        assert_eq!(encode_pcm16_base64(&[0.0]), "AAA=");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            decode_pcm16_base64("not base64!"),
            Err(AnimaError::InvalidBase64(_))
        ));
        assert!(matches!(decode_pcm16(&[1, 2, 3]), Err(AnimaError::OddPcmLength(3))));
    }

    #[test]
    fn test_empty() {
        assert!(decode_pcm16_base64("").unwrap().is_empty());
        assert!(encode_pcm16(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_encode_clamps(s in -10.0f32..10.0) {
            let decoded = decode_pcm16(&encode_pcm16(&[s])).unwrap()[0];
            prop_assert!((-1.0..=1.0).contains(&decoded));
            prop_assert!((decoded - s.clamp(-1.0, 1.0)).abs() <= 1.0 / 16384.0);
        }
    }
}

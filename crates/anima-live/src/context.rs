//! Live Context - externally produced mood/attention snapshot
//!
//! Every field is optional on the wire. A snapshot replaces the previous one
//! wholesale; the controller reads it every frame and never consumes it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gaze {
    /// How strongly the user looks at the avatar, 0..1
    pub score: Option<f32>,
    /// Coarse direction label ("direct", "left", ...)
    pub vector: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tracking {
    /// Normalized image coordinates, center at 0.5
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Posture {
    /// Forward/back lean, radians-ish
    pub inclination: Option<f32>,
    pub facing_camera: Option<bool>,
    pub energy: Option<f32>,
}

/// One snapshot of the live feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveContext {
    pub identity: Option<String>,
    pub state_confidence: Option<f32>,

    pub emotion: Option<String>,
    pub emotion_intensity: Option<f32>,
    pub emotion_probs: Option<HashMap<String, f32>>,

    pub energy_level: Option<f32>,
    pub attention: Option<f32>,
    pub engagement: Option<f32>,

    pub gaze: Option<Gaze>,
    pub tracking: Option<Tracking>,
    pub posture: Option<Posture>,

    /// Producer clock, seconds
    pub timestamp: Option<f64>,
    pub system_status: Option<String>,
}

impl LiveContext {
    /// Probability of an emotion label, if present
    pub fn probability(&self, label: &str) -> Option<f32> {
        self.emotion_probs.as_ref()?.get(label).copied()
    }

    /// Surprise under either spelling
    pub fn surprise(&self) -> Option<f32> {
        self.probability("surprise")
            .or_else(|| self.probability("surprised"))
    }

    pub fn tracking_visible(&self) -> bool {
        self.tracking
            .as_ref()
            .and_then(|t| t.visible)
            .unwrap_or(false)
    }

    pub fn gaze_score(&self) -> Option<f32> {
        self.gaze.as_ref().and_then(|g| g.score)
    }

    pub fn inclination(&self) -> Option<f32> {
        self.posture.as_ref().and_then(|p| p.inclination)
    }

    /// True when both carry timestamps and this one is older
    pub fn is_older_than(&self, other: &LiveContext) -> bool {
        match (self.timestamp, other.timestamp) {
            (Some(mine), Some(theirs)) => mine < theirs,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_fields_optional() {
        let ctx: LiveContext = serde_json::from_str("{}").unwrap();
        assert_eq!(ctx, LiveContext::default());
        assert!(!ctx.tracking_visible());
    }

    #[test]
    fn test_full_snapshot() {
        let json = r#"{
            "identity": "Rafa",
            "state_confidence": 0.17,
            "emotion": "happy",
            "emotion_probs": {"happy": 0.8, "surprise": 0.1},
            "energy_level": 0.4,
            "gaze": {"score": 0.9, "vector": "direct"},
            "tracking": {"x": 0.6, "y": 0.4, "z": 0.1, "visible": true},
            "posture": {"inclination": 0.12, "facing_camera": true, "energy": 0.5},
            "timestamp": 1712.5,
            "system_status": "active"
        }"#;
        let ctx: LiveContext = serde_json::from_str(json).unwrap();

        assert_eq!(ctx.probability("happy"), Some(0.8));
        assert_eq!(ctx.surprise(), Some(0.1));
        assert!(ctx.tracking_visible());
        assert_eq!(ctx.gaze_score(), Some(0.9));
        assert_eq!(ctx.inclination(), Some(0.12));
    }

    #[test]
    fn test_surprised_spelling() {
        let ctx = LiveContext {
            emotion_probs: Some(HashMap::from([("surprised".to_string(), 0.7)])),
            ..Default::default()
        };
        assert_eq!(ctx.surprise(), Some(0.7));
    }

    #[test]
    fn test_null_fields() {
        let ctx: LiveContext =
            serde_json::from_str(r#"{"energy_level": null, "emotion_probs": null, "tracking": {"visible": null}}"#).unwrap();
        assert_eq!(ctx.energy_level, None);
        assert!(!ctx.tracking_visible());
    }

    #[test]
    fn test_ordering_by_timestamp() {
        let old = LiveContext {
            timestamp: Some(1.0),
            ..Default::default()
        };
        let new = LiveContext {
            timestamp: Some(2.0),
            ..Default::default()
        };
        let untimed = LiveContext::default();

        assert!(old.is_older_than(&new));
        assert!(!new.is_older_than(&old));
        assert!(!untimed.is_older_than(&new));
        assert!(!old.is_older_than(&untimed));
    }
}

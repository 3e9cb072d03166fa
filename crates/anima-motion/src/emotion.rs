//! Emotion presets
//!
//! Discrete emotion labels (as announced by the backend when a spoken
//! response starts) mapped to full-strength weights of the four emotion
//! expressions, smoothed in over a few frames.

use anima_core::{damp_factor, Expression, ExpressionFrame};
use serde::{Deserialize, Serialize};

/// Smoothing rate toward the preset (1/s)
pub const EMOTION_RATE: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionPreset {
    #[default]
    Neutral,
    Happy,
    Angry,
    Sad,
    Surprised,
}

impl EmotionPreset {
    pub fn all() -> &'static [EmotionPreset] {
        &[
            EmotionPreset::Neutral,
            EmotionPreset::Happy,
            EmotionPreset::Angry,
            EmotionPreset::Sad,
            EmotionPreset::Surprised,
        ]
    }

    /// Case-insensitive label lookup; unknown labels yield `None`
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "neutral" => Some(EmotionPreset::Neutral),
            "happy" | "joy" => Some(EmotionPreset::Happy),
            "angry" | "anger" => Some(EmotionPreset::Angry),
            "sad" | "sadness" => Some(EmotionPreset::Sad),
            "surprised" | "surprise" => Some(EmotionPreset::Surprised),
            _ => None,
        }
    }

    /// Target weight of each emotion expression
    pub fn weights(self) -> [(Expression, f32); 4] {
        let on = |e: Expression| {
            let hit = matches!(
                (self, e),
                (EmotionPreset::Happy, Expression::Happy)
                    | (EmotionPreset::Sad, Expression::Sad)
                    | (EmotionPreset::Angry, Expression::Angry)
                    | (EmotionPreset::Surprised, Expression::Surprised)
            );
            (e, if hit { 1.0 } else { 0.0 })
        };
        Expression::EMOTIONS.map(on)
    }
}

/// Smooths the four emotion expressions toward the active preset
#[derive(Debug, Default)]
pub struct EmotionController {
    target: Option<EmotionPreset>,
    current: [f32; 4],
}

impl EmotionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_emotion(&mut self, preset: EmotionPreset) {
        self.target = Some(preset);
    }

    pub fn emotion(&self) -> Option<EmotionPreset> {
        self.target
    }

    pub fn weight(&self, expression: Expression) -> f32 {
        Expression::EMOTIONS
            .iter()
            .position(|e| *e == expression)
            .map(|i| self.current[i])
            .unwrap_or(0.0)
    }

    /// No-op until a preset has been set
    pub fn update(&mut self, dt: f32, expressions: &mut ExpressionFrame) {
        let Some(preset) = self.target else {
            return;
        };
        let k = damp_factor(EMOTION_RATE, dt);
        for (i, (expression, target)) in preset.weights().into_iter().enumerate() {
            self.current[i] += (target - self.current[i]) * k;
            expressions.set(expression, self.current[i]);
        }
    }
}

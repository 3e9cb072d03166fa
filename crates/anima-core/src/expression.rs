//! Expressions and the per-frame expression pipeline
//!
//! Controllers never write the avatar's expression set directly. They write
//! into an [`ExpressionFrame`] while the compositor walks the stage order;
//! the frame is committed once, after the last facial stage. A name written
//! by two stages keeps the later value.

use std::collections::HashMap;

use tracing::warn;

use crate::{ExpressionSet, Stage};

/// Preset expression names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expression {
    // Emotions
    Happy,
    Angry,
    Sad,
    Relaxed,
    Surprised,
    Neutral,

    // Eyes
    Blink,
    BlinkLeft,
    BlinkRight,

    // Mouth shapes
    Aa,
    Ih,
    Ou,
    Ee,
    Oh,
}

impl Expression {
    pub const ALL: [Expression; 14] = [
        Expression::Happy,
        Expression::Angry,
        Expression::Sad,
        Expression::Relaxed,
        Expression::Surprised,
        Expression::Neutral,
        Expression::Blink,
        Expression::BlinkLeft,
        Expression::BlinkRight,
        Expression::Aa,
        Expression::Ih,
        Expression::Ou,
        Expression::Ee,
        Expression::Oh,
    ];

    /// The four emotions driven by live context
    pub const EMOTIONS: [Expression; 4] = [
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Happy => "happy",
            Expression::Angry => "angry",
            Expression::Sad => "sad",
            Expression::Relaxed => "relaxed",
            Expression::Surprised => "surprised",
            Expression::Neutral => "neutral",
            Expression::Blink => "blink",
            Expression::BlinkLeft => "blinkLeft",
            Expression::BlinkRight => "blinkRight",
            Expression::Aa => "aa",
            Expression::Ih => "ih",
            Expression::Ou => "ou",
            Expression::Ee => "ee",
            Expression::Oh => "oh",
        }
    }

    pub fn from_name(name: &str) -> Option<Expression> {
        Self::ALL.iter().copied().find(|e| e.as_str() == name)
    }
}

/// A weight written during the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameWeight {
    pub value: f32,
    /// Stage active when the value was written
    pub writer: Option<Stage>,
}

/// Ordered accumulator of one frame's expression writes
#[derive(Debug, Default)]
pub struct ExpressionFrame {
    stage: Option<Stage>,
    weights: HashMap<Expression, FrameWeight>,
}

impl ExpressionFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a stage; subsequent writes are attributed to it
    pub fn enter(&mut self, stage: Stage) {
        if let Some(current) = self.stage {
            if stage < current {
                warn!(%stage, %current, "expression stage entered out of order");
            }
        }
        self.stage = Some(stage);
    }

    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Write a weight, clamped to [0, 1]
    pub fn set(&mut self, expression: Expression, value: f32) {
        let value = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.weights.insert(
            expression,
            FrameWeight {
                value,
                writer: self.stage,
            },
        );
    }

    pub fn get(&self, expression: Expression) -> Option<f32> {
        self.weights.get(&expression).map(|w| w.value)
    }

    /// Stage that wrote the current value
    pub fn writer(&self, expression: Expression) -> Option<Stage> {
        self.weights.get(&expression).and_then(|w| w.writer)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Write every accumulated weight to the avatar and start a new frame
    pub fn commit(&mut self, target: &mut dyn ExpressionSet) {
        for (expression, weight) in self.weights.drain() {
            target.set_weight(expression.as_str(), weight.value);
        }
        self.stage = None;
    }

    pub fn clear(&mut self) {
        self.weights.clear();
        self.stage = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryExpressions;

    #[test]
    fn test_later_stage_wins() {
        let mut frame = ExpressionFrame::new();
        frame.enter(Stage::LiveContext);
        frame.set(Expression::Aa, 0.2);
        frame.enter(Stage::LipSync);
        frame.set(Expression::Aa, 0.9);

        assert_eq!(frame.get(Expression::Aa), Some(0.9));
        assert_eq!(frame.writer(Expression::Aa), Some(Stage::LipSync));
    }

    #[test]
    fn test_values_clamped() {
        let mut frame = ExpressionFrame::new();
        frame.set(Expression::Happy, 1.7);
        frame.set(Expression::Sad, -0.3);
        frame.set(Expression::Angry, f32::NAN);

        assert_eq!(frame.get(Expression::Happy), Some(1.0));
        assert_eq!(frame.get(Expression::Sad), Some(0.0));
        assert_eq!(frame.get(Expression::Angry), Some(0.0));
    }

    #[test]
    fn test_commit_drains() {
        let mut frame = ExpressionFrame::new();
        let mut target = MemoryExpressions::new();

        frame.enter(Stage::IdleFace);
        frame.set(Expression::Blink, 0.5);
        frame.commit(&mut target);

        assert!(frame.is_empty());
        assert_eq!(frame.stage(), None);
        assert_eq!(target.weight("blink"), Some(0.5));
    }

    #[test]
    fn test_expression_names_round_trip() {
        for e in Expression::ALL {
            assert_eq!(Expression::from_name(e.as_str()), Some(e));
        }
        assert_eq!(Expression::from_name("wink"), None);
    }
}

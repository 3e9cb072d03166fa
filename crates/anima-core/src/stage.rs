//! Frame stages - the fixed per-frame evaluation order
//!
//! Every tick runs these stages strictly in sequence. Later stages win any
//! write conflict with earlier ones, so the order below IS the priority list
//! of the compositor.

use std::fmt;

/// One step of a rendered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Re-assert the A-pose over the solver's authored default
    BasePose,
    /// Body-weight scaling of torso and legs
    BodyWeight,
    /// Smooth the latest live snapshot; emotion and look-at
    LiveContext,
    /// Blink and saccades, with this frame's gaze suppression flags
    IdleFace,
    /// Push live energy into idle amplitude
    IdleIntensity,
    /// Breathing, sway and head micro-motion
    IdleBody,
    /// Finger curl and wrist dangle
    Hands,
    /// Wind on spring-bone gravity
    Physics,
    /// Mouth shapes; last facial writer
    LipSync,
    /// Hand everything to the skeletal solver
    Commit,
    Render,
}

/// The per-frame evaluation order
pub const FRAME_ORDER: [Stage; 11] = [
    Stage::BasePose,
    Stage::BodyWeight,
    Stage::LiveContext,
    Stage::IdleFace,
    Stage::IdleIntensity,
    Stage::IdleBody,
    Stage::Hands,
    Stage::Physics,
    Stage::LipSync,
    Stage::Commit,
    Stage::Render,
];

impl Stage {
    /// Position within [`FRAME_ORDER`]
    pub fn position(self) -> usize {
        FRAME_ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or(FRAME_ORDER.len())
    }

    /// Stages allowed to contribute expression weights
    pub fn writes_expressions(self) -> bool {
        matches!(self, Stage::LiveContext | Stage::IdleFace | Stage::LipSync)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::BasePose => "base_pose",
            Stage::BodyWeight => "body_weight",
            Stage::LiveContext => "live_context",
            Stage::IdleFace => "idle_face",
            Stage::IdleIntensity => "idle_intensity",
            Stage::IdleBody => "idle_body",
            Stage::Hands => "hands",
            Stage::Physics => "physics",
            Stage::LipSync => "lip_sync",
            Stage::Commit => "commit",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

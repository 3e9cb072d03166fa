//! Runtime configuration
//!
//! One TOML document, every section optional. Missing keys take their
//! defaults, so a config only needs the values it changes.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anima_core::{AnimaError, AnimaResult, MAX_FRAME_DELTA};
use anima_live::{FeedConfig, LiveConfig};
use anima_motion::{ArmPose, FaceConfig, HandsConfig, IdleBodyConfig, TurntableConfig, WindConfig};
use anima_speech::LipSyncConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Target frames per second of the render loop
    pub fps: u32,
    /// Largest frame delta fed to the controllers
    pub max_delta_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            max_delta_ms: MAX_FRAME_DELTA.as_millis() as u64,
        }
    }
}

impl RenderConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }

    pub fn max_delta(&self) -> Duration {
        Duration::from_millis(self.max_delta_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Samples under the playhead handed to the analyser each frame
    pub analyser_window: usize,
    /// Mouth level pulsed when the backend switches to speaking
    pub trigger_level: f32,
    pub lipsync: LipSyncConfig,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            analyser_window: 256,
            trigger_level: 0.85,
            lipsync: LipSyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimaConfig {
    pub initial_body_weight: f32,
    pub render: RenderConfig,
    pub pose: ArmPose,
    pub idle_body: IdleBodyConfig,
    pub hands: HandsConfig,
    pub face: FaceConfig,
    pub live: LiveConfig,
    pub speech: SpeechConfig,
    pub physics: WindConfig,
    pub turntable: TurntableConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

impl Default for AnimaConfig {
    fn default() -> Self {
        Self {
            initial_body_weight: 0.0,
            render: RenderConfig::default(),
            pose: ArmPose::default(),
            idle_body: IdleBodyConfig::default(),
            hands: HandsConfig::default(),
            face: FaceConfig::default(),
            live: LiveConfig::default(),
            speech: SpeechConfig::default(),
            physics: WindConfig::default(),
            turntable: TurntableConfig::default(),
            feed: FeedConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AnimaConfig {
    /// Quiet idle, no jiggle
    pub fn calm() -> Self {
        Self {
            idle_body: IdleBodyConfig::calm(),
            ..Default::default()
        }
    }

    /// Bigger idle motion with chest jiggle and stronger wind
    pub fn lively() -> Self {
        Self {
            idle_body: IdleBodyConfig::lively(),
            physics: WindConfig {
                wind_x: 0.3,
                wind_z: 0.2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn from_toml(text: &str) -> AnimaResult<Self> {
        let cfg: Self = toml::from_str(text).map_err(|e| AnimaError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> AnimaResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| AnimaError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text)
    }

    /// Load `path`, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> AnimaResult<String> {
        toml::to_string_pretty(self).map_err(|e| AnimaError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> AnimaResult<()> {
        if self.render.fps == 0 {
            return Err(AnimaError::InvalidConfig("render.fps must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.initial_body_weight) {
            return Err(AnimaError::InvalidConfig(format!(
                "initial_body_weight {} outside 0..=1",
                self.initial_body_weight
            )));
        }
        if self.face.blink_interval_min > self.face.blink_interval_max {
            return Err(AnimaError::InvalidConfig(
                "face.blink_interval_min exceeds blink_interval_max".into(),
            ));
        }
        if self.face.saccade_interval_min > self.face.saccade_interval_max {
            return Err(AnimaError::InvalidConfig(
                "face.saccade_interval_min exceeds saccade_interval_max".into(),
            ));
        }
        if self.feed.poll && self.feed.poll_interval_ms == 0 {
            return Err(AnimaError::InvalidConfig(
                "feed.poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anima_motion::BlinkProfile;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(AnimaConfig::from_toml("").unwrap(), AnimaConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let cfg = AnimaConfig::from_toml(
            r#"
            initial_body_weight = 0.4

            [idle_body]
            intensity = 0.3

            [face]
            blink_profile = "asymmetric"
            seed = 7

            [feed]
            poll_url = "http://localhost:8000/api/live-context"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.initial_body_weight, 0.4);
        assert_eq!(cfg.idle_body.intensity, 0.3);
        assert_eq!(cfg.idle_body.breathe_speed, IdleBodyConfig::default().breathe_speed);
        assert_eq!(cfg.face.blink_profile, BlinkProfile::Asymmetric);
        assert_eq!(cfg.face.seed, Some(7));
        assert_eq!(cfg.feed.poll_interval_ms, 200);
        assert!(cfg.feed.poll_url.is_some());
    }

    #[test]
    fn test_invalid_rejected() {
        assert!(matches!(
            AnimaConfig::from_toml("initial_body_weight = 3.0"),
            Err(AnimaError::InvalidConfig(_))
        ));
        assert!(matches!(
            AnimaConfig::from_toml("[render]\nfps = 0"),
            Err(AnimaError::InvalidConfig(_))
        ));
        assert!(matches!(
            AnimaConfig::from_toml("[face]\nblink_profile = \"wink\""),
            Err(AnimaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let cfg = AnimaConfig::lively();
        let text = cfg.to_toml().unwrap();
        assert_eq!(AnimaConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("anima-config-does-not-exist.toml");
        assert!(matches!(AnimaConfig::load(&path), Err(AnimaError::ConfigRead { .. })));
        assert_eq!(AnimaConfig::load_or_default(&path), AnimaConfig::default());
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("anima-config-{}.toml", std::process::id()));
        fs::write(&path, "[render]\nfps = 30\n").unwrap();
        let cfg = AnimaConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(cfg.render.fps, 30);
        assert!((cfg.render.frame_interval().as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_presets_differ() {
        assert!(AnimaConfig::calm().idle_body.intensity < AnimaConfig::lively().idle_body.intensity);
        assert!(AnimaConfig::lively().idle_body.chest_jiggle);
    }

    proptest::proptest! {
        #[test]
        fn body_weight_validation(weight in -2.0f32..3.0) {
            let text = format!("initial_body_weight = {weight:?}");
            let parsed = AnimaConfig::from_toml(&text);
            proptest::prop_assert_eq!(parsed.is_ok(), (0.0..=1.0).contains(&weight));
        }
    }
}

//! Humanoid bone schema
//!
//! A fixed-topology humanoid: torso chain, eyes, limbs and fingers. Names
//! follow the standard humanoid rig convention ("hips", "leftUpperArm",
//! "rightIndexIntermediate", ...).

use std::fmt;

/// Body side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// +1 for left, -1 for right; mirrors lateral offsets
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    /// The four long fingers, thumb excluded
    pub const LONG: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Little];

    fn label(self) -> &'static str {
        match self {
            Finger::Thumb => "Thumb",
            Finger::Index => "Index",
            Finger::Middle => "Middle",
            Finger::Ring => "Ring",
            Finger::Little => "Little",
        }
    }
}

/// Finger joint, from knuckle outward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phalanx {
    Proximal,
    Intermediate,
    Distal,
}

impl Phalanx {
    pub const ALL: [Phalanx; 3] = [Phalanx::Proximal, Phalanx::Intermediate, Phalanx::Distal];

    /// 0 at the knuckle, 2 at the tip
    pub fn index(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Phalanx::Proximal => "Proximal",
            Phalanx::Intermediate => "Intermediate",
            Phalanx::Distal => "Distal",
        }
    }
}

/// Humanoid bone identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HumanBone {
    // Torso
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,

    // Eyes
    LeftEye,
    RightEye,

    // Limbs
    Shoulder(Side),
    UpperArm(Side),
    LowerArm(Side),
    Hand(Side),
    UpperLeg(Side),
    LowerLeg(Side),
    Foot(Side),

    Finger(Side, Finger, Phalanx),
}

impl HumanBone {
    /// Torso chain from root upward
    pub const TORSO: [HumanBone; 6] = [
        HumanBone::Hips,
        HumanBone::Spine,
        HumanBone::Chest,
        HumanBone::UpperChest,
        HumanBone::Neck,
        HumanBone::Head,
    ];

    /// Every bone in the schema
    pub fn all() -> Vec<HumanBone> {
        let mut bones = Vec::with_capacity(Self::count());
        bones.extend_from_slice(&Self::TORSO);
        bones.push(HumanBone::LeftEye);
        bones.push(HumanBone::RightEye);

        for side in Side::BOTH {
            bones.push(HumanBone::Shoulder(side));
            bones.push(HumanBone::UpperArm(side));
            bones.push(HumanBone::LowerArm(side));
            bones.push(HumanBone::Hand(side));
            bones.push(HumanBone::UpperLeg(side));
            bones.push(HumanBone::LowerLeg(side));
            bones.push(HumanBone::Foot(side));
            for finger in Finger::ALL {
                for phalanx in Phalanx::ALL {
                    bones.push(HumanBone::Finger(side, finger, phalanx));
                }
            }
        }
        bones
    }

    /// Number of bones in the schema
    pub fn count() -> usize {
        // 6 torso + 2 eyes + 2 * (7 limb + 15 finger)
        52
    }

    pub fn eye(side: Side) -> HumanBone {
        match side {
            Side::Left => HumanBone::LeftEye,
            Side::Right => HumanBone::RightEye,
        }
    }

    /// Rig name, e.g. "leftIndexProximal"
    pub fn name(&self) -> String {
        match self {
            HumanBone::Hips => "hips".into(),
            HumanBone::Spine => "spine".into(),
            HumanBone::Chest => "chest".into(),
            HumanBone::UpperChest => "upperChest".into(),
            HumanBone::Neck => "neck".into(),
            HumanBone::Head => "head".into(),
            HumanBone::LeftEye => "leftEye".into(),
            HumanBone::RightEye => "rightEye".into(),
            HumanBone::Shoulder(s) => format!("{}Shoulder", s.prefix()),
            HumanBone::UpperArm(s) => format!("{}UpperArm", s.prefix()),
            HumanBone::LowerArm(s) => format!("{}LowerArm", s.prefix()),
            HumanBone::Hand(s) => format!("{}Hand", s.prefix()),
            HumanBone::UpperLeg(s) => format!("{}UpperLeg", s.prefix()),
            HumanBone::LowerLeg(s) => format!("{}LowerLeg", s.prefix()),
            HumanBone::Foot(s) => format!("{}Foot", s.prefix()),
            HumanBone::Finger(s, f, p) => format!("{}{}{}", s.prefix(), f.label(), p.label()),
        }
    }

    /// Parse a rig name; unknown names yield `None`
    pub fn from_name(name: &str) -> Option<HumanBone> {
        Self::all().into_iter().find(|bone| bone.name() == name)
    }
}

impl fmt::Display for HumanBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_count() {
        assert_eq!(HumanBone::all().len(), HumanBone::count());
    }

    #[test]
    fn test_names_unique() {
        let names: HashSet<String> = HumanBone::all().iter().map(|b| b.name()).collect();
        assert_eq!(names.len(), HumanBone::count());
    }

    #[test]
    fn test_rig_names() {
        assert_eq!(HumanBone::UpperChest.name(), "upperChest");
        assert_eq!(HumanBone::UpperArm(Side::Left).name(), "leftUpperArm");
        assert_eq!(
            HumanBone::Finger(Side::Right, Finger::Little, Phalanx::Intermediate).name(),
            "rightLittleIntermediate"
        );
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            HumanBone::from_name("leftThumbDistal"),
            Some(HumanBone::Finger(Side::Left, Finger::Thumb, Phalanx::Distal))
        );
        assert_eq!(HumanBone::from_name("tail"), None);
    }

    #[test]
    fn test_side_sign_mirrors() {
        assert_eq!(Side::Left.sign(), -Side::Right.sign());
    }
}

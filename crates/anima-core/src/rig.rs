//! Rig capabilities
//!
//! The avatar is reached only through these traits. A loaded model exposes a
//! skeleton with named-bone lookup, a total expression setter and, when the
//! model has them, spring-bone joints. Missing pieces are absence, not
//! failure: `bone_mut` returns `None`, `set_weight` on an unknown name does
//! nothing, `springs` is `None`.
//!
//! `MemoryRig` is a complete in-memory implementation used by the headless
//! runtime, the simulation harness and every controller test.

use std::collections::{HashMap, HashSet};

use crate::{Expression, HumanBone, Rotation, Vec3};

/// Local transform of one bone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub rotation: Rotation,
    pub position: Vec3,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            rotation: Rotation::IDENTITY,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl BoneTransform {
    pub fn with_rotation(rotation: Rotation) -> Self {
        Self {
            rotation,
            ..Self::default()
        }
    }
}

/// Named-bone lookup
pub trait Skeleton {
    fn bone(&self, bone: HumanBone) -> Option<&BoneTransform>;

    fn bone_mut(&mut self, bone: HumanBone) -> Option<&mut BoneTransform>;

    fn has_bone(&self, bone: HumanBone) -> bool {
        self.bone(bone).is_some()
    }
}

/// Expression weights by name
pub trait ExpressionSet {
    /// Set a weight; unknown names are ignored
    fn set_weight(&mut self, name: &str, weight: f32);

    fn weight(&self, name: &str) -> Option<f32>;
}

/// Per-joint parameters the solver reads before integrating spring bones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringJointSettings {
    pub gravity_dir: Vec3,
    pub gravity_power: f32,
    pub stiffness: f32,
    pub drag: f32,
}

impl Default for SpringJointSettings {
    fn default() -> Self {
        Self {
            gravity_dir: Vec3::DOWN,
            gravity_power: 0.0,
            stiffness: 1.0,
            drag: 0.4,
        }
    }
}

/// Spring-bone joints owned by the solver
pub trait SpringBones {
    fn joints_mut(&mut self) -> &mut [SpringJointSettings];

    fn joint_count(&self) -> usize;
}

/// Disjoint mutable views into a rig, borrowed for one frame
pub struct RigParts<'a> {
    pub skeleton: &'a mut dyn Skeleton,
    pub expressions: &'a mut dyn ExpressionSet,
    pub springs: Option<&'a mut dyn SpringBones>,
}

/// A loaded avatar
pub trait AvatarRig: Send {
    fn parts(&mut self) -> RigParts<'_>;

    /// Yaw of the avatar root (turntable)
    fn set_root_yaw(&mut self, _yaw: f32) {}

    /// Hand the frame's bones, expressions and spring settings to the solver
    fn commit(&mut self, dt: f32);

    fn render(&mut self) {}
}

/// Skeleton backed by a map
#[derive(Debug, Clone, Default)]
pub struct MemorySkeleton {
    bones: HashMap<HumanBone, BoneTransform>,
}

impl MemorySkeleton {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every schema bone at identity
    pub fn humanoid() -> Self {
        Self::with_bones(HumanBone::all())
    }

    pub fn with_bones(bones: impl IntoIterator<Item = HumanBone>) -> Self {
        Self {
            bones: bones
                .into_iter()
                .map(|b| (b, BoneTransform::default()))
                .collect(),
        }
    }

    pub fn insert(&mut self, bone: HumanBone, transform: BoneTransform) {
        self.bones.insert(bone, transform);
    }

    pub fn remove(&mut self, bone: HumanBone) -> Option<BoneTransform> {
        self.bones.remove(&bone)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

impl Skeleton for MemorySkeleton {
    fn bone(&self, bone: HumanBone) -> Option<&BoneTransform> {
        self.bones.get(&bone)
    }

    fn bone_mut(&mut self, bone: HumanBone) -> Option<&mut BoneTransform> {
        self.bones.get_mut(&bone)
    }
}

/// Expression weights backed by a map
#[derive(Debug, Clone, Default)]
pub struct MemoryExpressions {
    weights: HashMap<String, f32>,
    /// When set, only these names exist on the model
    known: Option<HashSet<String>>,
}

impl MemoryExpressions {
    /// Accepts any name
    pub fn new() -> Self {
        Self::default()
    }

    /// Model that only defines `names`
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            weights: HashMap::new(),
            known: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Model defining every preset expression
    pub fn presets() -> Self {
        Self::with_names(Expression::ALL.iter().map(|e| e.as_str()))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl ExpressionSet for MemoryExpressions {
    fn set_weight(&mut self, name: &str, weight: f32) {
        if let Some(known) = &self.known {
            if !known.contains(name) {
                return;
            }
        }
        self.weights.insert(name.to_string(), weight);
    }

    fn weight(&self, name: &str) -> Option<f32> {
        self.weights.get(name).copied()
    }
}

/// Spring joints backed by a vector
#[derive(Debug, Clone, Default)]
pub struct MemorySprings {
    joints: Vec<SpringJointSettings>,
}

impl MemorySprings {
    pub fn new(count: usize) -> Self {
        Self {
            joints: vec![SpringJointSettings::default(); count],
        }
    }

    pub fn joints(&self) -> &[SpringJointSettings] {
        &self.joints
    }
}

impl SpringBones for MemorySprings {
    fn joints_mut(&mut self) -> &mut [SpringJointSettings] {
        &mut self.joints
    }

    fn joint_count(&self) -> usize {
        self.joints.len()
    }
}

/// Fully in-memory avatar
#[derive(Debug, Clone, Default)]
pub struct MemoryRig {
    pub skeleton: MemorySkeleton,
    pub expressions: MemoryExpressions,
    pub springs: Option<MemorySprings>,
    root_yaw: f32,
    commits: u64,
    renders: u64,
    last_dt: f32,
}

impl MemoryRig {
    pub fn new(skeleton: MemorySkeleton, expressions: MemoryExpressions) -> Self {
        Self {
            skeleton,
            expressions,
            ..Self::default()
        }
    }

    /// Full humanoid, every preset expression, no spring bones
    pub fn humanoid() -> Self {
        Self::new(MemorySkeleton::humanoid(), MemoryExpressions::presets())
    }

    pub fn with_spring_joints(mut self, count: usize) -> Self {
        self.springs = Some(MemorySprings::new(count));
        self
    }

    pub fn rotation(&self, bone: HumanBone) -> Option<Rotation> {
        self.skeleton.bone(bone).map(|t| t.rotation)
    }

    pub fn weight(&self, expression: Expression) -> f32 {
        self.expressions.weight(expression.as_str()).unwrap_or(0.0)
    }

    pub fn root_yaw(&self) -> f32 {
        self.root_yaw
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn last_dt(&self) -> f32 {
        self.last_dt
    }
}

impl AvatarRig for MemoryRig {
    fn parts(&mut self) -> RigParts<'_> {
        RigParts {
            skeleton: &mut self.skeleton,
            expressions: &mut self.expressions,
            springs: self.springs.as_mut().map(|s| s as &mut dyn SpringBones),
        }
    }

    fn set_root_yaw(&mut self, yaw: f32) {
        self.root_yaw = yaw;
    }

    fn commit(&mut self, dt: f32) {
        self.commits += 1;
        self.last_dt = dt;
    }

    fn render(&mut self) {
        self.renders += 1;
    }
}

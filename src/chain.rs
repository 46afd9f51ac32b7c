//! Kinematic chain: the fixed segment tree a pose snapshot is applied to.
//!
//! ```text
//! base ── arm ── elbow ── wrist ─┬─ gripper_left
//!                                └─ gripper_right
//! ```
//!
//! Each [`Segment`] carries a fixed parent-relative offset (set once in
//! [`KinematicChain::construct`]) and a list of [`Drive`]s: transform
//! components that are overwritten from the latest [`RobotData`] on every
//! [`KinematicChain::update`].  The chain only sets local transforms;
//! composing them root → leaf is the renderer's job
//! ([`KinematicChain::global_transform`] is provided for renderers that
//! cannot do it themselves).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pose::RobotData;
use crate::scene::{Material, Primitive};
use crate::types::{Axis, GlobalTransform, LocalTransform, Vec3};

// ---------------------------------------------------------------------------
// Segment identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentId {
    Base,
    Arm,
    Elbow,
    Wrist,
    GripperLeft,
    GripperRight,
}

impl SegmentId {
    /// Construction order; parents always precede their children.
    pub const ALL: [SegmentId; 6] = [
        SegmentId::Base,
        SegmentId::Arm,
        SegmentId::Elbow,
        SegmentId::Wrist,
        SegmentId::GripperLeft,
        SegmentId::GripperRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SegmentId::Base => "base",
            SegmentId::Arm => "arm",
            SegmentId::Elbow => "elbow",
            SegmentId::Wrist => "wrist",
            SegmentId::GripperLeft => "gripper_left",
            SegmentId::GripperRight => "gripper_right",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Pose-driven components
// ---------------------------------------------------------------------------

/// The snapshot scalar feeding one driven component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseSource {
    BaseX,
    BaseY,
    CranePhi,
    CraneLift,
    ElbowPhi,
    /// Elbow height; 0 when the authority does not send one.
    ElbowHeight,
    WristPhi,
    /// `+space / 2`
    HalfSpace,
    /// `-space / 2`
    NegHalfSpace,
}

impl PoseSource {
    pub fn read(self, pose: &RobotData) -> f32 {
        match self {
            PoseSource::BaseX => pose.x,
            PoseSource::BaseY => pose.y,
            PoseSource::CranePhi => pose.crane.phi,
            PoseSource::CraneLift => pose.crane.z,
            PoseSource::ElbowPhi => pose.elbow.phi,
            PoseSource::ElbowHeight => pose.elbow.z.unwrap_or(0.0),
            PoseSource::WristPhi => pose.wrist.phi,
            PoseSource::HalfSpace => pose.gripper.space / 2.0,
            PoseSource::NegHalfSpace => -(pose.gripper.space / 2.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    /// Sets the Euler angle about `axis`.
    Rotate { axis: Axis, source: PoseSource },
    /// Adds a translation along `axis` on top of the fixed offset.
    Translate { axis: Axis, source: PoseSource },
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Magnitudes of the fixed segment offsets, in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainDimensions {
    /// Base → arm, along +Z.
    pub arm_offset: f32,
    /// Arm → elbow, along +Z.
    pub elbow_rise: f32,
    /// Arm → elbow, along -Y.
    pub elbow_reach: f32,
    /// Elbow → wrist, along +Z.
    pub wrist_rise: f32,
    /// Elbow → wrist, along -Y.
    pub wrist_reach: f32,
    /// Wrist → each finger, along -Y.
    pub finger_drop: f32,
}

impl Default for ChainDimensions {
    fn default() -> Self {
        Self {
            arm_offset: 0.5,
            elbow_rise: 4.0,
            elbow_reach: 1.5,
            wrist_rise: 0.5,
            wrist_reach: 1.5,
            finger_drop: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    pub parent: Option<SegmentId>,
    /// Fixed parent-relative offset.
    pub offset: Vec3,
    pub drives: Vec<Drive>,
    /// Mesh the renderer instantiates for this segment.
    pub primitive: Primitive,
    transform: LocalTransform,
}

impl Segment {
    fn new(
        id: SegmentId,
        parent: Option<SegmentId>,
        offset: Vec3,
        drives: Vec<Drive>,
        primitive: Primitive,
    ) -> Self {
        Self {
            id,
            parent,
            offset,
            drives,
            primitive,
            transform: LocalTransform::from_translation(offset),
        }
    }

    /// Current parent-relative transform.
    pub fn transform(&self) -> &LocalTransform {
        &self.transform
    }

    /// Local transform this segment takes for `pose`.
    fn solve(&self, pose: &RobotData) -> LocalTransform {
        let mut t = LocalTransform::from_translation(self.offset);
        for drive in &self.drives {
            match *drive {
                Drive::Rotate { axis, source } => {
                    *t.rotation.component_mut(axis) = source.read(pose);
                }
                Drive::Translate { axis, source } => {
                    *t.translation.component_mut(axis) += source.read(pose);
                }
            }
        }
        t
    }
}

// ---------------------------------------------------------------------------
// KinematicChain
// ---------------------------------------------------------------------------

/// The robot's segment tree.  One instance per session, owned by the
/// controller; not meant to be shared across threads.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    dimensions: ChainDimensions,
    /// Indexed by `SegmentId as usize`.
    segments: Vec<Segment>,
    roots: Vec<SegmentId>,
    update_count: u64,
}

impl KinematicChain {
    /// Build the fixed tree.  All transforms start at their fixed offsets.
    pub fn construct(dimensions: ChainDimensions) -> Self {
        use PoseSource::*;
        use SegmentId::*;

        let d = dimensions;
        let steel = Material::wireframe(0xFFFFFF);
        let finger = Material::wireframe(0xFFAA00);

        let segments = vec![
            Segment::new(
                Base,
                None,
                Vec3::zero(),
                vec![
                    Drive::Translate { axis: Axis::X, source: BaseX },
                    Drive::Translate { axis: Axis::Y, source: BaseY },
                    Drive::Rotate { axis: Axis::Z, source: CranePhi },
                ],
                Primitive::cuboid(3.0, 3.0, 1.0, steel),
            ),
            Segment::new(
                Arm,
                Some(Base),
                Vec3::new(0.0, 0.0, d.arm_offset),
                vec![Drive::Translate { axis: Axis::Z, source: CraneLift }],
                Primitive::cuboid(0.5, 0.5, d.elbow_rise, steel),
            ),
            Segment::new(
                Elbow,
                Some(Arm),
                Vec3::new(0.0, -d.elbow_reach, d.elbow_rise),
                vec![
                    Drive::Rotate { axis: Axis::Z, source: ElbowPhi },
                    Drive::Translate { axis: Axis::Z, source: ElbowHeight },
                ],
                Primitive::cuboid(0.5, d.elbow_reach + d.wrist_reach, 0.5, steel),
            ),
            Segment::new(
                Wrist,
                Some(Elbow),
                Vec3::new(0.0, -d.wrist_reach, d.wrist_rise),
                vec![Drive::Rotate { axis: Axis::Z, source: WristPhi }],
                Primitive::cuboid(0.5, 0.5, 0.5, steel),
            ),
            Segment::new(
                GripperLeft,
                Some(Wrist),
                Vec3::new(0.0, -d.finger_drop, 0.0),
                vec![Drive::Translate { axis: Axis::Z, source: HalfSpace }],
                Primitive::cuboid(0.1, d.finger_drop, 0.1, finger),
            ),
            Segment::new(
                GripperRight,
                Some(Wrist),
                Vec3::new(0.0, -d.finger_drop, 0.0),
                vec![Drive::Translate { axis: Axis::Z, source: NegHalfSpace }],
                Primitive::cuboid(0.1, d.finger_drop, 0.1, finger),
            ),
        ];

        debug_assert!(segments
            .iter()
            .enumerate()
            .all(|(i, s)| s.id.index() == i));

        log::debug!("kinematic chain constructed with {:?}", dimensions);

        Self {
            dimensions,
            segments,
            roots: vec![Base],
            update_count: 0,
        }
    }

    /// Apply a full snapshot.
    ///
    /// All driven components are computed before any segment is written, so
    /// a rejected snapshot leaves every transform untouched.
    pub fn update(&mut self, pose: &RobotData) -> Result<()> {
        pose.validate()?;

        let next: Vec<LocalTransform> = self.segments.iter().map(|s| s.solve(pose)).collect();
        for (segment, transform) in self.segments.iter_mut().zip(next) {
            segment.transform = transform;
        }
        self.update_count += 1;

        log::trace!("chain update #{}: {}", self.update_count, pose);
        Ok(())
    }

    /// Decode `value` as a [`RobotData`] and apply it.
    pub fn update_from_value(&mut self, value: &serde_json::Value) -> Result<()> {
        let pose = RobotData::from_value(value.clone())?;
        self.update(&pose)
    }

    /// Root nodes to hand to the renderer.  Stable for the chain's lifetime.
    pub fn renders(&self) -> &[SegmentId] {
        &self.roots
    }

    pub fn dimensions(&self) -> &ChainDimensions {
        &self.dimensions
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn local_transform(&self, id: SegmentId) -> &LocalTransform {
        self.segment(id).transform()
    }

    pub fn parent(&self, id: SegmentId) -> Option<SegmentId> {
        self.segment(id).parent
    }

    pub fn children(&self, id: SegmentId) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments
            .iter()
            .filter(move |s| s.parent == Some(id))
            .map(|s| s.id)
    }

    /// `(child, parent)` pairs in construction order.
    pub fn topology(&self) -> Vec<(SegmentId, Option<SegmentId>)> {
        self.segments.iter().map(|s| (s.id, s.parent)).collect()
    }

    /// Root-relative transform of `id`, composed from the local transforms
    /// along the path root → `id`.
    pub fn global_transform(&self, id: SegmentId) -> GlobalTransform {
        let mut path = vec![id];
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            path.push(parent);
            cursor = parent;
        }
        path.iter()
            .rev()
            .fold(GlobalTransform::IDENTITY, |acc, seg| {
                acc.then(self.local_transform(*seg))
            })
    }

    /// Number of snapshots applied so far.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}

impl Default for KinematicChain {
    fn default() -> Self {
        Self::construct(ChainDimensions::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Rendering boundary.
//!
//! The chain never talks to a graphics API.  A renderer implements
//! [`SceneRenderer`]; [`mount`] builds one group + mesh per segment once per
//! session, and [`sync`] pushes the current local transforms and draws a
//! frame.  Composition of parent-relative transforms is the renderer's
//! responsibility.

use serde::{Deserialize, Serialize};

use crate::chain::{KinematicChain, SegmentId};
use crate::types::LocalTransform;

// ---------------------------------------------------------------------------
// Mesh descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// `0xRRGGBB`
    pub color: u32,
    pub wireframe: bool,
}

impl Material {
    pub const fn wireframe(color: u32) -> Self {
        Self {
            color,
            wireframe: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Cuboid { width: f32, depth: f32, height: f32 },
}

/// A primitive mesh the renderer is asked to instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub shape: Shape,
    pub material: Material,
}

impl Primitive {
    pub const fn cuboid(width: f32, depth: f32, height: f32, material: Material) -> Self {
        Self {
            shape: Shape::Cuboid {
                width,
                depth,
                height,
            },
            material,
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer capability
// ---------------------------------------------------------------------------

/// What the core needs from a scene graph.
pub trait SceneRenderer {
    /// Create a transform group for `id`, attached to `parent` (or the scene
    /// root when `None`).
    fn create_group(&mut self, id: SegmentId, parent: Option<SegmentId>);

    /// Instantiate a mesh inside the group for `id`.
    fn create_mesh(&mut self, id: SegmentId, primitive: &Primitive);

    /// Overwrite the group's parent-relative transform.
    fn apply_transform(&mut self, id: SegmentId, transform: &LocalTransform);

    /// Draw the current frame.
    fn render_frame(&mut self, chain: &KinematicChain);
}

/// Create every group and mesh.  Call once per session.
///
/// Segments are visited in construction order, so a parent group always
/// exists before its children are attached.
pub fn mount<R: SceneRenderer + ?Sized>(chain: &KinematicChain, renderer: &mut R) {
    for segment in chain.segments() {
        renderer.create_group(segment.id, segment.parent);
        renderer.create_mesh(segment.id, &segment.primitive);
        renderer.apply_transform(segment.id, segment.transform());
    }
    log::debug!(
        "scene mounted: {} segments, roots {:?}",
        chain.segments().len(),
        chain.renders()
    );
}

/// Push current transforms and render one frame.
pub fn sync<R: SceneRenderer + ?Sized>(chain: &KinematicChain, renderer: &mut R) {
    for segment in chain.segments() {
        renderer.apply_transform(segment.id, segment.transform());
    }
    renderer.render_frame(chain);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::RobotData;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recorder {
        groups: Vec<(SegmentId, Option<SegmentId>)>,
        meshes: usize,
        transforms: HashMap<SegmentId, LocalTransform>,
        frames: usize,
    }

    impl SceneRenderer for Recorder {
        fn create_group(&mut self, id: SegmentId, parent: Option<SegmentId>) {
            if let Some(p) = parent {
                assert!(
                    self.groups.iter().any(|(g, _)| *g == p),
                    "parent {p} created after child {id}"
                );
            }
            self.groups.push((id, parent));
        }

        fn create_mesh(&mut self, _id: SegmentId, _primitive: &Primitive) {
            self.meshes += 1;
        }

        fn apply_transform(&mut self, id: SegmentId, transform: &LocalTransform) {
            self.transforms.insert(id, *transform);
        }

        fn render_frame(&mut self, _chain: &KinematicChain) {
            self.frames += 1;
        }
    }

    #[test]
    fn mount_creates_one_group_and_mesh_per_segment() {
        let chain = KinematicChain::default();
        let mut r = Recorder::default();
        mount(&chain, &mut r);
        assert_eq!(r.groups, chain.topology());
        assert_eq!(r.meshes, 6);
        assert_eq!(r.frames, 0);
    }

    #[test]
    fn sync_pushes_latest_transforms_and_renders() {
        let mut chain = KinematicChain::default();
        let mut r = Recorder::default();
        mount(&chain, &mut r);

        let mut p = RobotData::default();
        p.wrist.phi = 1.25;
        chain.update(&p).unwrap();
        sync(&chain, &mut r);

        assert_eq!(r.frames, 1);
        assert_eq!(r.transforms[&SegmentId::Wrist].rotation.z, 1.25);
    }
}

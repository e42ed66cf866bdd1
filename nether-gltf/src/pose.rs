//! World-space joint transforms for a skeleton at one animation frame

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::animation::AnimationFrame;
use crate::error::{GltfError, GltfResult};
use crate::skeleton::Skeleton;

/// One world transform per joint, indexed by joint index
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    transforms: Vec<Mat4>,
}

impl Pose {
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn world_transform(&self, joint: usize) -> Option<Mat4> {
        self.transforms.get(joint).copied()
    }

    /// World-space origin of `joint`
    pub fn joint_position(&self, joint: usize) -> Option<Vec3> {
        self.world_transform(joint).map(|m| m.transform_point3(Vec3::ZERO))
    }

    /// World transform times inverse bind matrix, per joint
    pub fn skinning_matrices(&self, skeleton: &Skeleton) -> Vec<Mat4> {
        self.transforms
            .iter()
            .zip(skeleton.inverse_bind_matrices())
            .map(|(world, inverse_bind)| *world * *inverse_bind)
            .collect()
    }

    /// Column-major floats, 16 per joint
    pub fn as_f32_slice(&self) -> &[f32] {
        bytemuck::cast_slice(&self.transforms)
    }
}

fn frame_translation(frame: Option<&AnimationFrame<'_>>, joint: &str) -> GltfResult<Option<Vec3>> {
    let Some(value) = frame.map(|f| f.value(joint, "translation")).transpose()?.flatten() else {
        return Ok(None);
    };
    match value[..] {
        [x, y, z] => Ok(Some(Vec3::new(x, y, z))),
        _ => Err(GltfError::format(
            "translation track",
            format!("joint {joint}: {} components, expected 3", value.len()),
        )),
    }
}

fn frame_rotation(frame: Option<&AnimationFrame<'_>>, joint: &str) -> GltfResult<Option<Quat>> {
    let Some(value) = frame.map(|f| f.value(joint, "rotation")).transpose()?.flatten() else {
        return Ok(None);
    };
    match value[..] {
        [x, y, z, w] => {
            // Interpolated keyframes drift off unit length
            let normalized = Vec4::new(x, y, z, w).try_normalize().unwrap_or(Vec4::W);
            Ok(Some(Quat::from_vec4(normalized)))
        }
        _ => Err(GltfError::format(
            "rotation track",
            format!("joint {joint}: {} components, expected 4", value.len()),
        )),
    }
}

impl Skeleton {
    /// Local transforms at `frame`, falling back to bind values
    pub fn local_transforms(&self, frame: Option<&AnimationFrame<'_>>) -> GltfResult<Vec<Mat4>> {
        self.joints()
            .iter()
            .map(|joint| {
                let translation =
                    frame_translation(frame, joint.name())?.unwrap_or(joint.local_position());
                let rotation =
                    frame_rotation(frame, joint.name())?.unwrap_or(joint.local_rotation());
                Ok(Mat4::from_rotation_translation(rotation, translation))
            })
            .collect()
    }

    /// World transform of every joint at `frame`; `None` gives the bind pose
    pub fn joint_world_transforms(&self, frame: Option<&AnimationFrame<'_>>) -> GltfResult<Pose> {
        let locals = self.local_transforms(frame)?;
        let mut transforms = vec![Mat4::IDENTITY; self.len()];
        let mut computed = vec![false; self.len()];

        for &joint_index in self.dependency_order() {
            let joint = &self.joints()[joint_index];
            let mut world = locals[joint_index];
            for &ancestor in joint.ancestor_chain() {
                if !computed[ancestor] {
                    return Err(GltfError::Fatal(format!(
                        "joint {} ({}) evaluated before its ancestor {}",
                        joint_index,
                        joint.name(),
                        ancestor
                    )));
                }
                world = locals[ancestor] * world;
            }
            transforms[joint_index] = world;
            computed[joint_index] = true;
        }

        Ok(Pose { transforms })
    }
}

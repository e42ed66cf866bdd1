//! Skeleton construction from glTF skins
//!
//! Joints keep the skin's joint order (the order skinning indices refer to).
//! Each joint records its ancestor chain, and the skeleton precomputes a
//! dependency order in which every joint comes after all of its ancestors.

use glam::{Mat4, Quat, Vec3};
use hashbrown::HashMap;

use crate::animation::normalize_object_name;
use crate::document::Document;
use crate::error::{GltfError, GltfResult};
use crate::{Limits, MAX_SKINNING_JOINTS};

/// Node metadata the skeleton builder needs for one joint node
#[derive(Debug, Clone, PartialEq)]
pub struct JointNode {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    /// Child node indices (not joint indices)
    pub children: Vec<usize>,
}

/// One bone of a [`Skeleton`]
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonJoint {
    name: String,
    node_index: usize,
    joint_index: usize,
    local_position: Vec3,
    local_rotation: Quat,
    joint_to_world: Mat4,
    world_position: Vec3,
    parent_index: Option<usize>,
    child_indices: Vec<usize>,
    ancestor_chain: Vec<usize>,
}

impl SkeletonJoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node this joint was built from
    pub fn node_index(&self) -> usize {
        self.node_index
    }

    /// Position in the skin's joint list
    pub fn joint_index(&self) -> usize {
        self.joint_index
    }

    /// Bind-time translation relative to the parent
    pub fn local_position(&self) -> Vec3 {
        self.local_position
    }

    /// Bind-time rotation relative to the parent
    pub fn local_rotation(&self) -> Quat {
        self.local_rotation
    }

    /// Inverse of the joint's inverse bind matrix
    pub fn joint_to_world(&self) -> Mat4 {
        self.joint_to_world
    }

    /// Bind-time joint origin in skin space. Inspection only; poses are
    /// computed from local transforms.
    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    /// `None` for joints hanging off the skin's implicit root
    pub fn parent_index(&self) -> Option<usize> {
        self.parent_index
    }

    pub fn child_indices(&self) -> &[usize] {
        &self.child_indices
    }

    /// Ancestor joint indices, nearest first
    pub fn ancestor_chain(&self) -> &[usize] {
        &self.ancestor_chain
    }

    /// Bind-time local transform
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.local_rotation, self.local_position)
    }
}

/// Joint hierarchy of one skin
#[derive(Debug, Clone)]
pub struct Skeleton {
    name: Option<String>,
    joints: Vec<SkeletonJoint>,
    dependency_order: Vec<usize>,
    inverse_bind_matrices: Vec<Mat4>,
}

impl Skeleton {
    /// Build a skeleton from a skin's joint node list
    ///
    /// `node_meta` looks up a node by index. `inverse_bind_matrices` holds
    /// one world-to-joint matrix per joint. Fails with
    /// [`GltfError::Cycle`] when an ancestor chain grows past `max_depth`.
    pub fn build<F>(
        name: Option<String>,
        joint_nodes: &[usize],
        inverse_bind_matrices: Vec<Mat4>,
        node_meta: F,
        max_depth: usize,
    ) -> GltfResult<Self>
    where
        F: Fn(usize) -> GltfResult<JointNode>,
    {
        if inverse_bind_matrices.len() < joint_nodes.len() {
            return Err(GltfError::format(
                "skin",
                format!(
                    "{} inverse bind matrices for {} joints",
                    inverse_bind_matrices.len(),
                    joint_nodes.len()
                ),
            ));
        }

        let metas = joint_nodes
            .iter()
            .map(|&node| node_meta(node))
            .collect::<GltfResult<Vec<_>>>()?;

        let mut node_to_joint: HashMap<usize, usize> = HashMap::with_capacity(joint_nodes.len());
        for (joint, &node) in joint_nodes.iter().enumerate() {
            node_to_joint.entry(node).or_insert(joint);
        }

        let parents: Vec<Option<usize>> = joint_nodes
            .iter()
            .map(|node| metas.iter().position(|meta| meta.children.contains(node)))
            .collect();

        let mut joints = Vec::with_capacity(joint_nodes.len());
        for (joint_index, (&node_index, meta)) in joint_nodes.iter().zip(&metas).enumerate() {
            let inverse_bind = inverse_bind_matrices[joint_index];
            if inverse_bind.determinant() == 0.0 {
                tracing::warn!(
                    "joint {} ({}) has a singular inverse bind matrix",
                    joint_index,
                    meta.name
                );
            }
            let joint_to_world = inverse_bind.inverse();

            let child_indices = meta
                .children
                .iter()
                .filter_map(|child| {
                    let joint = node_to_joint.get(child).copied();
                    if joint.is_none() {
                        tracing::debug!(
                            "joint {} child node {} is not part of the skin",
                            meta.name,
                            child
                        );
                    }
                    joint
                })
                .collect();

            joints.push(SkeletonJoint {
                name: meta.name.clone(),
                node_index,
                joint_index,
                local_position: meta.translation,
                local_rotation: meta.rotation,
                joint_to_world,
                world_position: joint_to_world.transform_point3(Vec3::ZERO),
                parent_index: parents[joint_index],
                child_indices,
                ancestor_chain: Vec::new(),
            });
        }

        for (joint_index, joint) in joints.iter_mut().enumerate() {
            joint.ancestor_chain = ancestor_chain(&parents, joint_index, max_depth)?;
        }

        let mut dependency_order: Vec<usize> = (0..joints.len()).collect();
        dependency_order.sort_by_key(|&joint| joints[joint].ancestor_chain.len());

        Ok(Self {
            name,
            joints,
            dependency_order,
            inverse_bind_matrices,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Joints in skin order
    pub fn joints(&self) -> &[SkeletonJoint] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> Option<&SkeletonJoint> {
        self.joints.get(index)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joint indices ordered so ancestors always precede descendants
    pub fn dependency_order(&self) -> &[usize] {
        &self.dependency_order
    }

    /// World-to-joint matrices, one per joint
    pub fn inverse_bind_matrices(&self) -> &[Mat4] {
        &self.inverse_bind_matrices[..self.joints.len()]
    }

    /// Joint whose (namespace-stripped) name matches
    pub fn find_joint(&self, name: &str) -> Option<&SkeletonJoint> {
        let wanted = normalize_object_name(name);
        self.joints
            .iter()
            .find(|joint| normalize_object_name(&joint.name) == wanted)
    }

    /// Joint built from node `node_index`
    pub fn joint_by_node(&self, node_index: usize) -> Option<&SkeletonJoint> {
        self.joints
            .iter()
            .find(|joint| joint.node_index == node_index)
    }

    /// Inverse bind matrices flattened to `max_joints * 16` floats, zero padded
    pub fn padded_inverse_bind_matrices(&self, max_joints: usize) -> GltfResult<Vec<f32>> {
        pad_matrices(self.inverse_bind_matrices(), max_joints)
    }

    /// Joint-to-world matrices flattened to `max_joints * 16` floats, zero padded
    pub fn padded_joint_to_world_matrices(&self, max_joints: usize) -> GltfResult<Vec<f32>> {
        let matrices: Vec<Mat4> = self.joints.iter().map(|j| j.joint_to_world).collect();
        pad_matrices(&matrices, max_joints)
    }
}

fn ancestor_chain(
    parents: &[Option<usize>],
    joint: usize,
    max_depth: usize,
) -> GltfResult<Vec<usize>> {
    let mut chain = Vec::new();
    let mut parent = parents[joint];
    while let Some(ancestor) = parent {
        if chain.len() == max_depth {
            return Err(GltfError::Cycle { joint, max_depth });
        }
        chain.push(ancestor);
        parent = parents[ancestor];
    }
    Ok(chain)
}

fn pad_matrices(matrices: &[Mat4], max_joints: usize) -> GltfResult<Vec<f32>> {
    if matrices.len() > max_joints {
        return Err(GltfError::format(
            "skeleton",
            format!("{} joints, padded buffer holds {}", matrices.len(), max_joints),
        ));
    }
    let mut flat = vec![0.0f32; max_joints * 16];
    for (slot, matrix) in flat.chunks_exact_mut(16).zip(matrices) {
        slot.copy_from_slice(&matrix.to_cols_array());
    }
    Ok(flat)
}

impl Document {
    /// Build the skeleton of skin `skin_index` with default limits
    pub fn get_skeleton(&self, skin_index: usize) -> GltfResult<Skeleton> {
        self.get_skeleton_with_limits(skin_index, &Limits::default())
    }

    pub fn get_skeleton_with_limits(
        &self,
        skin_index: usize,
        limits: &Limits,
    ) -> GltfResult<Skeleton> {
        let skin = self.skin(skin_index)?;

        let inverse_bind_matrices = match skin.inverse_bind_matrices {
            Some(accessor) => {
                let resolved = self.resolve_accessor(accessor)?;
                if resolved.element_size() != 16 {
                    return Err(GltfError::format(
                        "skin",
                        format!(
                            "inverse bind accessor {} has element size {}, expected 16",
                            accessor,
                            resolved.element_size()
                        ),
                    ));
                }
                resolved
                    .data()
                    .to_f32_vec()
                    .chunks_exact(16)
                    .map(Mat4::from_cols_slice)
                    .collect()
            }
            None => vec![Mat4::IDENTITY; skin.joints.len()],
        };

        let skeleton = Skeleton::build(
            skin.name.clone(),
            &skin.joints,
            inverse_bind_matrices,
            |node_index| {
                let node = self.node(node_index)?;
                let (translation, rotation) = node.local_translation_rotation();
                Ok(JointNode {
                    name: node.label(node_index),
                    translation,
                    rotation,
                    children: node.children.clone(),
                })
            },
            limits.max_joint_depth,
        )?;

        if skeleton.len() > MAX_SKINNING_JOINTS {
            tracing::warn!(
                "skin {} has {} joints, padded skinning buffers hold {}",
                skin_index,
                skeleton.len(),
                MAX_SKINNING_JOINTS
            );
        }
        Ok(skeleton)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (name, translation, children) per node
    fn nodes(layout: &[(&str, [f32; 3], &[usize])]) -> Vec<JointNode> {
        layout
            .iter()
            .map(|(name, t, children)| JointNode {
                name: name.to_string(),
                translation: Vec3::from_array(*t),
                rotation: Quat::IDENTITY,
                children: children.to_vec(),
            })
            .collect()
    }

    fn build(metas: &[JointNode], joint_nodes: &[usize], max_depth: usize) -> GltfResult<Skeleton> {
        let ibms = joint_nodes.iter().map(|_| Mat4::IDENTITY).collect();
        Skeleton::build(
            Some("rig".to_string()),
            joint_nodes,
            ibms,
            |node| {
                metas.get(node).cloned().ok_or(GltfError::Missing {
                    kind: "node",
                    index: node,
                })
            },
            max_depth,
        )
    }

    #[test]
    fn test_hierarchy() {
        // 0 Hips -> 1 Spine -> 2 Head, 0 Hips -> 3 Leg
        let metas = nodes(&[
            ("Hips", [0.0, 1.0, 0.0], &[1, 3]),
            ("Spine", [0.0, 0.5, 0.0], &[2]),
            ("Head", [0.0, 0.5, 0.0], &[]),
            ("Leg", [0.2, -0.5, 0.0], &[]),
        ]);
        // Joint order differs from node order
        let skeleton = build(&metas, &[2, 0, 3, 1], 1000).unwrap();

        let head = skeleton.joint(0).unwrap();
        assert_eq!(head.name(), "Head");
        assert_eq!(head.parent_index(), Some(3));
        assert_eq!(head.ancestor_chain(), &[3, 1]);

        let hips = skeleton.joint(1).unwrap();
        assert_eq!(hips.parent_index(), None);
        assert_eq!(hips.child_indices(), &[3, 2]);
        assert!(hips.ancestor_chain().is_empty());

        assert_eq!(skeleton.dependency_order(), &[1, 2, 3, 0]);
    }

    #[test]
    fn test_dependency_order_is_topological() {
        // A chain and a fan mixed together
        let metas = nodes(&[
            ("a", [0.0; 3], &[1, 2]),
            ("b", [0.0; 3], &[3]),
            ("c", [0.0; 3], &[4, 5]),
            ("d", [0.0; 3], &[6]),
            ("e", [0.0; 3], &[]),
            ("f", [0.0; 3], &[]),
            ("g", [0.0; 3], &[]),
        ]);
        let skeleton = build(&metas, &[6, 5, 4, 3, 2, 1, 0], 1000).unwrap();

        let order = skeleton.dependency_order();
        let position = |joint: usize| order.iter().position(|&j| j == joint).unwrap();
        for joint in skeleton.joints() {
            for &ancestor in joint.ancestor_chain() {
                assert!(position(ancestor) < position(joint.joint_index()));
            }
        }
    }

    #[test]
    fn test_ties_keep_joint_order() {
        let metas = nodes(&[("r", [0.0; 3], &[1, 2]), ("x", [0.0; 3], &[]), ("y", [0.0; 3], &[])]);
        let skeleton = build(&metas, &[2, 1, 0], 1000).unwrap();
        assert_eq!(skeleton.dependency_order(), &[2, 0, 1]);
    }

    #[test]
    fn test_cycle_detected() {
        let metas = nodes(&[("a", [0.0; 3], &[1]), ("b", [0.0; 3], &[0])]);
        let err = build(&metas, &[0, 1], 1000).unwrap_err();
        assert!(matches!(err, GltfError::Cycle { max_depth: 1000, .. }));
    }

    #[test]
    fn test_depth_bound_is_configurable() {
        let metas = nodes(&[
            ("a", [0.0; 3], &[1]),
            ("b", [0.0; 3], &[2]),
            ("c", [0.0; 3], &[]),
        ]);
        assert!(build(&metas, &[0, 1, 2], 2).is_ok());
        assert!(matches!(
            build(&metas, &[0, 1, 2], 1),
            Err(GltfError::Cycle { joint: 2, max_depth: 1 })
        ));
    }

    #[test]
    fn test_world_position_from_inverse_bind() {
        let metas = nodes(&[("root", [0.0, 2.0, 0.0], &[])]);
        let ibm = Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0));
        let skeleton = Skeleton::build(None, &[0], vec![ibm], |n| Ok(metas[n].clone()), 10)
            .unwrap();
        let joint = skeleton.joint(0).unwrap();
        assert!((joint.world_position() - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_too_few_inverse_bind_matrices() {
        let metas = nodes(&[("a", [0.0; 3], &[]), ("b", [0.0; 3], &[])]);
        let result = Skeleton::build(
            None,
            &[0, 1],
            vec![Mat4::IDENTITY],
            |n| Ok(metas[n].clone()),
            10,
        );
        assert!(matches!(result, Err(GltfError::Format { .. })));
    }

    #[test]
    fn test_find_joint_strips_namespace() {
        let metas = nodes(&[("mixamorig:Hips", [0.0; 3], &[])]);
        let skeleton = build(&metas, &[0], 10).unwrap();
        assert!(skeleton.find_joint("Hips").is_some());
        assert!(skeleton.find_joint("mixamorig:Hips").is_some());
        assert!(skeleton.joint_by_node(0).is_some());
    }

    #[test]
    fn test_padded_matrices() {
        let metas = nodes(&[("a", [0.0; 3], &[]), ("b", [0.0; 3], &[])]);
        let skeleton = build(&metas, &[0, 1], 10).unwrap();

        let flat = skeleton.padded_inverse_bind_matrices(4).unwrap();
        assert_eq!(flat.len(), 64);
        assert_eq!(&flat[0..16], &Mat4::IDENTITY.to_cols_array());
        assert!(flat[32..].iter().all(|&v| v == 0.0));

        assert!(skeleton.padded_joint_to_world_matrices(1).is_err());
    }

    #[test]
    fn test_skin_without_inverse_bind_matrices() {
        let doc = Document::from_json_str(
            r#"{
                "nodes": [
                    {"name": "root", "children": [1], "translation": [0, 1, 0]},
                    {"name": "tip", "rotation": [0, 0, 0.7071068, 0.7071068]}
                ],
                "skins": [{"joints": [0, 1]}]
            }"#,
        )
        .unwrap();

        let skeleton = doc.get_skeleton(0).unwrap();
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton.inverse_bind_matrices(), &[Mat4::IDENTITY; 2]);
        assert_eq!(skeleton.joint(0).unwrap().local_position(), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(skeleton.joint(1).unwrap().parent_index(), Some(0));
        assert!(matches!(doc.get_skeleton(1), Err(GltfError::Missing { kind: "skin", .. })));
    }
}

//! Test rig: a triangle skinned to a three-bone chain with a walk clip.

use glam::{Mat4, Quat, Vec3};
use serde_json::{Value, json};

use super::binary_packing::BinaryPacker;

/// Bone count for the test skeleton
pub const BONE_COUNT: usize = 3;
/// Height of each bone above its parent
pub const SEGMENT_HEIGHT: f32 = 1.0;
/// Last keyframe of the walk clip
pub const WALK_DURATION: f32 = 1.0;
/// Hips travel along x over the walk clip
pub const HIPS_TRAVEL: f32 = 2.0;

/// Accessor indices in the generated document
pub mod accessors {
    pub const POSITION: usize = 0;
    pub const NORMAL: usize = 1;
    pub const INDICES: usize = 2;
    pub const INVERSE_BIND: usize = 3;
    pub const TIMES: usize = 4;
    pub const HIPS_TRANSLATION: usize = 5;
    pub const SPINE_ROTATION: usize = 6;
}

/// Interleaved position + normal vertices
pub const VERTICES: [[f32; 6]; 3] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
    [1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
    [0.0, 3.0, 0.0, 0.0, 0.0, 1.0],
];

/// Spine rotation at the end of the walk clip
pub fn spine_end_rotation() -> Quat {
    Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)
}

/// Build the rig's document (without buffer URI) and BIN payload
pub fn build_rig() -> (Value, Vec<u8>) {
    let mut packer = BinaryPacker::default();

    let vertex_view = packer.push_view(bytemuck::cast_slice(&VERTICES), Some(24));
    let index_view = packer.push_view(bytemuck::cast_slice(&[0u16, 1, 2]), None);

    let inverse_binds: Vec<f32> = (0..BONE_COUNT)
        .flat_map(|bone| {
            let height = SEGMENT_HEIGHT * (bone + 1) as f32;
            Mat4::from_translation(Vec3::new(0.0, -height, 0.0)).to_cols_array()
        })
        .collect();
    let inverse_bind_view = packer.push_f32s(&inverse_binds);

    let times_view = packer.push_f32s(&[0.0, WALK_DURATION]);
    let hips_view = packer.push_f32s(&[
        0.0,
        SEGMENT_HEIGHT,
        0.0,
        HIPS_TRAVEL,
        SEGMENT_HEIGHT,
        0.0,
    ]);
    let mut rotations = Quat::IDENTITY.to_array().to_vec();
    rotations.extend_from_slice(&spine_end_rotation().to_array());
    let spine_view = packer.push_f32s(&rotations);

    let root = json!({
        "asset": {"version": "2.0", "generator": "nether-gltf tests"},
        "scene": 0,
        "scenes": [{"nodes": [0, 3]}],
        "buffers": [{"byteLength": packer.buffer.len()}],
        "bufferViews": packer.views,
        "accessors": [
            {"bufferView": vertex_view, "byteOffset": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
            {"bufferView": vertex_view, "byteOffset": 12, "componentType": 5126, "count": 3, "type": "VEC3"},
            {"bufferView": index_view, "componentType": 5123, "count": 3, "type": "SCALAR"},
            {"bufferView": inverse_bind_view, "componentType": 5126, "count": BONE_COUNT, "type": "MAT4"},
            {"bufferView": times_view, "componentType": 5126, "count": 2, "type": "SCALAR"},
            {"bufferView": hips_view, "componentType": 5126, "count": 2, "type": "VEC3"},
            {"bufferView": spine_view, "componentType": 5126, "count": 2, "type": "VEC4"}
        ],
        "nodes": [
            {"name": "mixamorig:Hips", "translation": [0.0, SEGMENT_HEIGHT, 0.0], "children": [1]},
            {"name": "mixamorig:Spine", "translation": [0.0, SEGMENT_HEIGHT, 0.0], "children": [2]},
            {"name": "mixamorig:Head", "translation": [0.0, SEGMENT_HEIGHT, 0.0]},
            {"name": "Body", "mesh": 0, "skin": 0}
        ],
        "meshes": [{
            "name": "Body",
            "primitives": [{
                "attributes": {"POSITION": accessors::POSITION, "NORMAL": accessors::NORMAL},
                "indices": accessors::INDICES,
                "material": 0
            }]
        }],
        "skins": [{
            "name": "Armature",
            "joints": [0, 1, 2],
            "inverseBindMatrices": accessors::INVERSE_BIND
        }],
        "animations": [{
            "name": "Walk",
            "samplers": [
                {"input": accessors::TIMES, "output": accessors::HIPS_TRANSLATION, "interpolation": "LINEAR"},
                {"input": accessors::TIMES, "output": accessors::SPINE_ROTATION, "interpolation": "LINEAR"}
            ],
            "channels": [
                {"sampler": 0, "target": {"node": 0, "path": "translation"}},
                {"sampler": 1, "target": {"node": 1, "path": "rotation"}}
            ]
        }]
    });

    (root, packer.buffer)
}

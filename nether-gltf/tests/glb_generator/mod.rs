//! Programmatic glTF/GLB generation for integration tests.
//!
//! Every variant carries the same rig:
//! - One triangle with interleaved positions and normals, u16 indices
//! - 3-bone skeleton (Hips -> Spine -> Head) with inverse bind matrices
//! - "Walk" clip moving the hips and bending the spine over one second

#![allow(dead_code)]

mod binary_packing;
mod glb_assembly;
mod rig;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

pub use glb_assembly::assemble_glb;
pub use rig::{
    BONE_COUNT, HIPS_TRAVEL, SEGMENT_HEIGHT, VERTICES, WALK_DURATION, accessors, build_rig,
    spine_end_rotation,
};

/// The rig as a GLB with its payload in the BIN chunk
pub fn generate_rig_glb() -> Vec<u8> {
    let (root, bin) = build_rig();
    assemble_glb(&root, &bin)
}

/// The rig as a GLB after `edit` has modified its document
pub fn generate_rig_glb_with(edit: impl FnOnce(&mut Value)) -> Vec<u8> {
    let (mut root, bin) = build_rig();
    edit(&mut root);
    assemble_glb(&root, &bin)
}

/// The rig as bare JSON with the payload in a base64 data URI
pub fn generate_rig_embedded_json() -> Vec<u8> {
    let (mut root, bin) = build_rig();
    root["buffers"][0]["uri"] = format!(
        "data:application/octet-stream;base64,{}",
        STANDARD.encode(&bin)
    )
    .into();
    serde_json::to_vec(&root).expect("Failed to serialize JSON")
}

/// The rig as bare JSON referencing `uri`, plus the payload to serve for it
pub fn generate_rig_external_json(uri: &str) -> (Vec<u8>, Vec<u8>) {
    let (mut root, bin) = build_rig();
    root["buffers"][0]["uri"] = uri.into();
    (
        serde_json::to_vec(&root).expect("Failed to serialize JSON"),
        bin,
    )
}

//! GLB container assembly.

use nether_gltf::{CHUNK_TYPE_BIN, CHUNK_TYPE_JSON, GLB_HEADER_SIZE, GLB_MAGIC, GLB_VERSION};
use serde_json::Value;

/// Chunk header: length + type
const CHUNK_HEADER_SIZE: usize = 8;

/// Append one chunk, padding its payload to 4 bytes with `pad`
fn push_chunk(glb: &mut Vec<u8>, chunk_type: u32, payload: &[u8], pad: u8) {
    let padded_len = payload.len().next_multiple_of(4);
    glb.extend_from_slice(&(padded_len as u32).to_le_bytes());
    glb.extend_from_slice(&chunk_type.to_le_bytes());
    glb.extend_from_slice(payload);
    glb.resize(glb.len() + padded_len - payload.len(), pad);
}

/// Assemble a GLB from a document and its BIN payload
///
/// `buffers[0].byteLength` is set to the unpadded payload length.
pub fn assemble_glb(root: &Value, buffer_data: &[u8]) -> Vec<u8> {
    let mut root = root.clone();
    root["buffers"][0]["byteLength"] = buffer_data.len().into();
    let json_bytes = serde_json::to_vec(&root).expect("Failed to serialize JSON");

    let total_length = GLB_HEADER_SIZE
        + CHUNK_HEADER_SIZE
        + json_bytes.len().next_multiple_of(4)
        + CHUNK_HEADER_SIZE
        + buffer_data.len().next_multiple_of(4);

    let mut glb = Vec::with_capacity(total_length);
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    // JSON pads with spaces, BIN with zeros
    push_chunk(&mut glb, CHUNK_TYPE_JSON, &json_bytes, b' ');
    push_chunk(&mut glb, CHUNK_TYPE_BIN, buffer_data, 0);

    debug_assert_eq!(glb.len(), total_length);
    glb
}

//! nether-gltf: glTF/GLB decoding for skinned, animated assets
//!
//! Decodes a glTF document (bare JSON or GLB container) into typed sections,
//! attaches buffer payloads, and exposes the data a renderer needs:
//!
//! - **Accessors** resolved into contiguous typed arrays, with interleaved
//!   buffer views unrolled
//! - **Meshes** grouped into named geometries with their vertex attributes
//! - **Skeletons** with parent links, ancestor chains, and a dependency order
//! - **Animation clips** sampled with linear, spherical, step, or cubic-spline
//!   interpolation
//! - **Poses**: per-joint world transforms for a clip at a given time
//!
//! Matrix and quaternion math comes from `glam`. Fetching external buffers
//! is delegated to a caller-supplied [`BufferLoader`].
//!
//! # Usage
//!
//! ```ignore
//! use nether_gltf::{parse_asset, EmbeddedOnly};
//!
//! let bytes = std::fs::read("character.glb")?;
//! let document = pollster::block_on(parse_asset(bytes, &mut EmbeddedOnly, None))?;
//!
//! let skeleton = document.get_skeleton(0)?;
//! let walk = document.get_animation("Walk")?;
//! let pose = skeleton.joint_world_transforms(Some(&walk.frame(0.5)))?;
//! ```

mod accessor;
mod animation;
mod data_uri;
mod document;
mod error;
mod glb;
mod loader;
mod mesh;
mod pose;
mod skeleton;

pub use accessor::{ComponentType, ElementType, ResolvedArray, TypedArray};
pub use animation::{
    AnimationClip, AnimationFrame, AnimationTrack, Interpolation, TrackKey, lerp,
    normalize_object_name, slerp,
};
pub use data_uri::DataUri;
pub use document::{
    Accessor, Animation, AnimationPointer, AnimationSampler, Asset, Buffer, BufferData,
    BufferView, Channel, ChannelTarget, Document, Mesh, Node, Primitive, Scene, Skin,
    TargetExtensions,
};
pub use error::{BoxError, GltfError, GltfResult};
pub use glb::{DecodedContainer, GlbContainer, chunk_type_name, decode_container, is_glb};
pub use loader::{
    BufferLoader, EmbeddedOnly, load_buffers, parse_asset, parse_asset_with_limits,
    parse_asset_with_meshes,
};
pub use mesh::{Geometry, MeshGroup, MeshLibrary};
pub use pose::Pose;
pub use skeleton::{JointNode, Skeleton, SkeletonJoint};

// =============================================================================
// Container constants
// =============================================================================

/// GLB magic, `"glTF"` read as a little-endian u32
pub const GLB_MAGIC: u32 = 0x4654_6C67;

/// GLB container version written by current exporters
pub const GLB_VERSION: u32 = 2;

/// Size of the GLB header (magic, version, total length)
pub const GLB_HEADER_SIZE: usize = 12;

/// Chunk type `"JSON"`
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;

/// Chunk type `"BIN\0"`
pub const CHUNK_TYPE_BIN: u32 = 0x004E_4942;

// =============================================================================
// Limits
// =============================================================================

/// Default bound on the number of chunks scanned in a GLB container
pub const DEFAULT_MAX_CHUNKS: usize = 1000;

/// Default bound on a joint's ancestor chain length
pub const DEFAULT_MAX_JOINT_DEPTH: usize = 1000;

/// Joint count that padded skinning matrix arrays are sized for
pub const MAX_SKINNING_JOINTS: usize = 70;

/// Bounds applied while decoding, so corrupt input fails instead of looping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum chunks in a GLB container
    pub max_glb_chunks: usize,
    /// Maximum ancestors of any joint
    pub max_joint_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_glb_chunks: DEFAULT_MAX_CHUNKS,
            max_joint_depth: DEFAULT_MAX_JOINT_DEPTH,
        }
    }
}

//! Typed glTF document sections
//!
//! Each JSON section gets an explicit struct. Absent fields are filled in at
//! deserialization time, so consumers never see "missing" translations,
//! offsets, or child lists.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;

use crate::error::{GltfError, GltfResult};

/// Parsed glTF document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub asset: Asset,
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub skins: Vec<Skin>,
    #[serde(default)]
    pub animations: Vec<Animation>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    pub scene: Option<usize>,
}

/// `asset` block
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub version: String,
    pub generator: Option<String>,
}

/// Raw byte payload attached to a [`Buffer`]
///
/// The payload is a window into a shared allocation. A GLB BIN chunk is
/// attached without copying, so `offset` is the chunk's position inside the
/// original file bytes.
#[derive(Clone)]
pub struct BufferData {
    storage: Arc<[u8]>,
    offset: usize,
    len: usize,
}

impl BufferData {
    /// Take ownership of a standalone payload (offset 0)
    pub fn new(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            storage: bytes.into(),
            offset: 0,
            len,
        }
    }

    /// Window `[offset, offset + len)` of a shared allocation
    pub fn window(storage: Arc<[u8]>, offset: usize, len: usize) -> GltfResult<Self> {
        let end = offset.checked_add(len).ok_or(GltfError::OutOfRange {
            offset,
            len,
            available: storage.len(),
        })?;
        if end > storage.len() {
            return Err(GltfError::OutOfRange {
                offset,
                len,
                available: storage.len(),
            });
        }
        Ok(Self {
            storage,
            offset,
            len,
        })
    }

    /// Bytes of this payload only
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.len]
    }

    /// Entire backing allocation
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// Byte offset of this payload inside its backing allocation
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for BufferData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferData")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("storage_len", &self.storage.len())
            .finish()
    }
}

/// `buffers[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    #[serde(default)]
    pub byte_length: usize,
    pub uri: Option<String>,
    pub name: Option<String>,
    #[serde(skip)]
    data: Option<BufferData>,
}

impl Buffer {
    pub fn data(&self) -> Option<&BufferData> {
        self.data.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Attach a payload. Returns `false` (and keeps the existing payload)
    /// when data was already attached.
    pub fn attach(&mut self, data: BufferData) -> bool {
        if self.data.is_some() {
            return false;
        }
        if data.len() != self.byte_length {
            tracing::warn!(
                "buffer payload is {} bytes, declared byteLength is {}",
                data.len(),
                self.byte_length
            );
        }
        self.data = Some(data);
        true
    }

    /// URI, treating an absent URI as empty
    pub fn uri_or_empty(&self) -> &str {
        self.uri.as_deref().unwrap_or("")
    }
}

/// `bufferViews[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub name: Option<String>,
}

/// `accessors[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: Option<u32>,
    #[serde(rename = "type")]
    pub element_type: String,
    pub count: usize,
    #[serde(default)]
    pub normalized: bool,
    pub name: Option<String>,
}

/// `nodes[]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<usize>,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    pub matrix: Option<[f32; 16]>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: None,
            children: Vec::new(),
            translation: [0.0; 3],
            rotation: identity_rotation(),
            scale: unit_scale(),
            matrix: None,
            mesh: None,
            skin: None,
        }
    }
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Node {
    /// Local translation and rotation, decomposing `matrix` when present
    pub fn local_translation_rotation(&self) -> (Vec3, Quat) {
        match self.matrix {
            Some(m) => {
                let (_scale, rotation, translation) =
                    Mat4::from_cols_array(&m).to_scale_rotation_translation();
                (translation, rotation)
            }
            None => (
                Vec3::from_array(self.translation),
                Quat::from_array(self.rotation),
            ),
        }
    }

    /// Name used to key animation tracks and joints
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("node{index}"),
        }
    }
}

/// `meshes[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mesh {
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<Primitive>,
}

/// `meshes[].primitives[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Primitive {
    #[serde(default)]
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: Option<u32>,
}

/// `skins[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    pub name: Option<String>,
    #[serde(default)]
    pub joints: Vec<usize>,
    pub inverse_bind_matrices: Option<usize>,
    pub skeleton: Option<usize>,
}

/// `animations[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Animation {
    pub name: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub samplers: Vec<AnimationSampler>,
}

/// `animations[].channels[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Channel {
    pub sampler: usize,
    pub target: ChannelTarget,
}

/// Channel target: node + property path, possibly redirected by an extension
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelTarget {
    pub node: Option<usize>,
    pub path: String,
    #[serde(default)]
    pub extensions: TargetExtensions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetExtensions {
    #[serde(rename = "KHR_animation_pointer")]
    pub animation_pointer: Option<AnimationPointer>,
}

/// `KHR_animation_pointer` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationPointer {
    pub pointer: String,
}

/// `animations[].samplers[]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct AnimationSampler {
    pub input: usize,
    pub output: usize,
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
}

fn default_interpolation() -> String {
    "LINEAR".to_string()
}

/// `scenes[]` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scene {
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

fn lookup<'a, T>(items: &'a [T], kind: &'static str, index: usize) -> GltfResult<&'a T> {
    items.get(index).ok_or(GltfError::Missing { kind, index })
}

impl Document {
    /// Parse a document from UTF-8 JSON bytes
    pub fn from_json_slice(bytes: &[u8]) -> GltfResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| GltfError::format("glTF JSON", format!("not UTF-8: {e}")))?;
        Self::from_json_str(text)
    }

    pub fn from_json_str(text: &str) -> GltfResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn accessor(&self, index: usize) -> GltfResult<&Accessor> {
        lookup(&self.accessors, "accessor", index)
    }

    pub fn buffer_view(&self, index: usize) -> GltfResult<&BufferView> {
        lookup(&self.buffer_views, "bufferView", index)
    }

    pub fn buffer(&self, index: usize) -> GltfResult<&Buffer> {
        lookup(&self.buffers, "buffer", index)
    }

    pub fn node(&self, index: usize) -> GltfResult<&Node> {
        lookup(&self.nodes, "node", index)
    }

    pub fn skin(&self, index: usize) -> GltfResult<&Skin> {
        lookup(&self.skins, "skin", index)
    }

    /// Names of all animations, in declaration order
    pub fn animation_names(&self) -> Vec<Option<&str>> {
        self.animations.iter().map(|a| a.name.as_deref()).collect()
    }

    /// The single animation called `name`
    pub fn animation_by_name(&self, name: &str) -> GltfResult<&Animation> {
        let mut matches = self
            .animations
            .iter()
            .filter(|a| a.name.as_deref() == Some(name));
        let first = matches.next().ok_or_else(|| GltfError::MissingNamed {
            kind: "animation",
            name: name.to_string(),
        })?;
        let extra = matches.count();
        if extra > 0 {
            return Err(GltfError::Ambiguous {
                kind: "animation",
                name: name.to_string(),
                count: extra + 1,
            });
        }
        Ok(first)
    }

    /// True once every buffer has a payload attached
    pub fn buffers_loaded(&self) -> bool {
        self.buffers.iter().all(Buffer::is_loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let doc = Document::from_json_str(
            r#"{
                "asset": {"version": "2.0"},
                "nodes": [{"name": "Hips"}],
                "accessors": [{"bufferView": 0, "type": "VEC3", "count": 2}],
                "animations": [{"channels": [], "samplers": [{"input": 0, "output": 1}]}]
            }"#,
        )
        .unwrap();

        let node = &doc.nodes[0];
        assert_eq!(node.translation, [0.0, 0.0, 0.0]);
        assert_eq!(node.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(node.scale, [1.0, 1.0, 1.0]);
        assert!(node.children.is_empty());
        assert_eq!(doc.accessors[0].byte_offset, 0);
        assert_eq!(doc.accessors[0].component_type, None);
        assert_eq!(doc.animations[0].samplers[0].interpolation, "LINEAR");
    }

    #[test]
    fn test_matrix_node_decomposes() {
        let mut node = Node::default();
        let m = Mat4::from_rotation_translation(
            Quat::from_rotation_z(0.5),
            Vec3::new(1.0, 2.0, 3.0),
        );
        node.matrix = Some(m.to_cols_array());

        let (t, r) = node.local_translation_rotation();
        assert!((t - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        assert!(r.abs_diff_eq(Quat::from_rotation_z(0.5), 1e-5));
    }

    #[test]
    fn test_buffer_attach_once() {
        let mut buffer = Buffer {
            byte_length: 3,
            ..Default::default()
        };
        assert!(buffer.attach(BufferData::new(vec![1, 2, 3])));
        assert!(!buffer.attach(BufferData::new(vec![9, 9, 9])));
        assert_eq!(buffer.data().unwrap().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_buffer_data_window() {
        let storage: Arc<[u8]> = vec![0u8, 1, 2, 3, 4, 5].into();
        let data = BufferData::window(storage.clone(), 2, 3).unwrap();
        assert_eq!(data.offset(), 2);
        assert_eq!(data.as_slice(), &[2, 3, 4]);
        assert!(matches!(
            BufferData::window(storage, 4, 3),
            Err(GltfError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_animation_by_name() {
        let doc = Document::from_json_str(
            r#"{"animations": [{"name": "Walk"}, {"name": "Run"}, {"name": "Run"}]}"#,
        )
        .unwrap();

        assert!(doc.animation_by_name("Walk").is_ok());
        assert!(matches!(
            doc.animation_by_name("Jump"),
            Err(GltfError::MissingNamed { .. })
        ));
        assert!(matches!(
            doc.animation_by_name("Run"),
            Err(GltfError::Ambiguous { count: 2, .. })
        ));
    }
}

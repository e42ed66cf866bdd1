//! GLB container decoding
//!
//! A GLB file is a 12-byte header followed by length-prefixed chunks. The
//! JSON chunk holds the document; the BIN chunk backs any buffer without a
//! URI. Input that does not start with the GLB magic is parsed as a bare
//! JSON document instead.

use std::ops::Range;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::document::{BufferData, Document};
use crate::error::{GltfError, GltfResult};
use crate::{CHUNK_TYPE_BIN, CHUNK_TYPE_JSON, GLB_HEADER_SIZE, GLB_MAGIC, GLB_VERSION, Limits};

/// Sequential little-endian reader over the container bytes
struct ChunkReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ChunkReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Claim the next `len` bytes, returning their absolute range
    fn take(&mut self, len: usize) -> GltfResult<Range<usize>> {
        if len > self.remaining() {
            return Err(GltfError::OutOfRange {
                offset: self.position,
                len,
                available: self.remaining(),
            });
        }
        let start = self.position;
        self.position += len;
        Ok(start..self.position)
    }

    fn read_u32(&mut self) -> GltfResult<u32> {
        let range = self.take(4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[range]);
        Ok(u32::from_le_bytes(word))
    }
}

/// True when `bytes` starts with the GLB magic
pub fn is_glb(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) == GLB_MAGIC
}

/// Human-readable chunk type for diagnostics
pub fn chunk_type_name(chunk_type: u32) -> String {
    match chunk_type {
        CHUNK_TYPE_JSON => "JSON".to_string(),
        CHUNK_TYPE_BIN => "BIN".to_string(),
        other => format!("0x{other:08X}"),
    }
}

/// A scanned GLB container
///
/// Chunks are kept as ranges into the original allocation, so the BIN chunk
/// can be handed to a buffer without copying.
#[derive(Debug)]
pub struct GlbContainer {
    version: u32,
    total_length: u32,
    storage: Arc<[u8]>,
    chunks: HashMap<u32, Range<usize>>,
    chunk_order: Vec<u32>,
}

impl GlbContainer {
    /// Scan the header and every chunk
    ///
    /// Fails on a bad magic, a chunk running past the end of the data, a
    /// repeated chunk type, or more than `max_chunks` chunks.
    pub fn parse(bytes: impl Into<Arc<[u8]>>, max_chunks: usize) -> GltfResult<Self> {
        let storage: Arc<[u8]> = bytes.into();
        let mut reader = ChunkReader::new(&storage);

        let magic = reader.read_u32()?;
        if magic != GLB_MAGIC {
            return Err(GltfError::format(
                "GLB header",
                format!("magic 0x{magic:08X}, expected 0x{GLB_MAGIC:08X}"),
            ));
        }
        let version = reader.read_u32()?;
        let total_length = reader.read_u32()?;

        if version != GLB_VERSION {
            tracing::warn!("GLB version {} (expected {})", version, GLB_VERSION);
        }
        if total_length as usize != storage.len() {
            tracing::warn!(
                "GLB header declares {} bytes, file has {}",
                total_length,
                storage.len()
            );
        }

        let mut chunks = HashMap::new();
        let mut chunk_order = Vec::new();
        while reader.remaining() > 0 {
            if chunk_order.len() == max_chunks {
                return Err(GltfError::format(
                    "GLB chunks",
                    format!(
                        "more than {} chunks ({} bytes unread at offset {})",
                        max_chunks,
                        reader.remaining(),
                        reader.position
                    ),
                ));
            }

            let chunk_length = reader.read_u32()? as usize;
            let chunk_type = reader.read_u32()?;
            let range = reader.take(chunk_length)?;

            if chunks.contains_key(&chunk_type) {
                return Err(GltfError::Duplicate {
                    kind: "GLB chunk",
                    key: chunk_type_name(chunk_type),
                });
            }
            tracing::debug!(
                "GLB chunk {} at {}..{}",
                chunk_type_name(chunk_type),
                range.start,
                range.end
            );
            chunks.insert(chunk_type, range);
            chunk_order.push(chunk_type);
        }

        Ok(Self {
            version,
            total_length,
            storage,
            chunks,
            chunk_order,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn total_length(&self) -> u32 {
        self.total_length
    }

    /// Chunk types in file order
    pub fn chunk_types(&self) -> &[u32] {
        &self.chunk_order
    }

    /// Raw bytes of a chunk, including types this decoder does not interpret
    pub fn chunk(&self, chunk_type: u32) -> Option<&[u8]> {
        self.chunks
            .get(&chunk_type)
            .map(|range| &self.storage[range.clone()])
    }

    pub fn json_chunk(&self) -> GltfResult<&[u8]> {
        self.chunk(CHUNK_TYPE_JSON)
            .ok_or_else(|| GltfError::format("GLB chunks", "no JSON chunk"))
    }

    /// BIN chunk as a window into the container allocation
    pub fn bin_chunk(&self) -> GltfResult<Option<BufferData>> {
        self.chunks
            .get(&CHUNK_TYPE_BIN)
            .map(|range| BufferData::window(self.storage.clone(), range.start, range.len()))
            .transpose()
    }

    /// Parse the JSON chunk
    pub fn document(&self) -> GltfResult<Document> {
        Document::from_json_slice(self.json_chunk()?)
    }
}

/// Output of [`decode_container`]
#[derive(Debug)]
pub struct DecodedContainer {
    pub document: Document,
    /// Default payload for buffers without a URI
    pub bin_chunk: Option<BufferData>,
}

/// Decode GLB or bare JSON bytes into a document
///
/// Only the magic decides the path: once the magic matches, framing errors
/// are hard failures rather than a reason to retry as JSON.
pub fn decode_container(bytes: Vec<u8>, limits: &Limits) -> GltfResult<DecodedContainer> {
    if !is_glb(&bytes) {
        tracing::debug!("no GLB magic, parsing {} bytes as glTF JSON", bytes.len());
        return Ok(DecodedContainer {
            document: Document::from_json_slice(&bytes)?,
            bin_chunk: None,
        });
    }

    let container = GlbContainer::parse(bytes, limits.max_glb_chunks)?;
    Ok(DecodedContainer {
        document: container.document()?,
        bin_chunk: container.bin_chunk()?,
    })
}

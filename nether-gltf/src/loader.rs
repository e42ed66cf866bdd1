//! Document loading: container decode plus buffer payload attachment
//!
//! Buffers are filled in declaration order, one at a time. Payloads come
//! from the GLB BIN chunk (empty URI), an embedded data URI, or the
//! caller's [`BufferLoader`].

use std::future::Future;

use crate::Limits;
use crate::data_uri::DataUri;
use crate::document::{BufferData, Document};
use crate::error::{BoxError, GltfError, GltfResult};
use crate::glb::decode_container;
use crate::mesh::MeshLibrary;

/// Characters of a buffer URI passed to progress callbacks
const PROGRESS_URI_CHARS: usize = 40;

/// Fetches external buffer files referenced by URI
pub trait BufferLoader {
    fn load_buffer(&mut self, uri: &str) -> impl Future<Output = Result<Vec<u8>, BoxError>>;
}

/// Loader for self-contained assets; every external fetch fails
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedOnly;

impl BufferLoader for EmbeddedOnly {
    async fn load_buffer(&mut self, uri: &str) -> Result<Vec<u8>, BoxError> {
        Err(format!("external buffer \"{uri}\" requested but no loader was supplied").into())
    }
}

/// Attach a payload to every buffer that does not have one yet
///
/// `bin_chunk` backs buffers with an empty or absent URI.
pub async fn load_buffers<L: BufferLoader>(
    document: &mut Document,
    bin_chunk: Option<&BufferData>,
    loader: &mut L,
    mut on_progress: Option<&mut dyn FnMut(&str)>,
) -> GltfResult<()> {
    for (index, buffer) in document.buffers.iter_mut().enumerate() {
        if buffer.is_loaded() {
            continue;
        }

        let uri = buffer.uri_or_empty().to_string();
        if let Some(report) = on_progress.as_deref_mut() {
            let preview: String = uri.chars().take(PROGRESS_URI_CHARS).collect();
            report(&preview);
        }

        let data = if uri.is_empty() {
            bin_chunk.cloned().ok_or(GltfError::Missing {
                kind: "BIN chunk for buffer",
                index,
            })?
        } else if let Some(data_uri) = DataUri::parse(&uri) {
            tracing::debug!("buffer {}: embedded {}", index, data_uri.mime_type);
            BufferData::new(data_uri.decode()?)
        } else {
            tracing::debug!("buffer {}: loading \"{}\"", index, uri);
            let bytes = loader
                .load_buffer(&uri)
                .await
                .map_err(|source| GltfError::Loader {
                    uri: uri.clone(),
                    source,
                })?;
            BufferData::new(bytes)
        };

        buffer.attach(data);
    }
    Ok(())
}

/// Decode GLB or glTF JSON bytes and load every buffer
pub async fn parse_asset<L: BufferLoader>(
    bytes: Vec<u8>,
    loader: &mut L,
    on_progress: Option<&mut dyn FnMut(&str)>,
) -> GltfResult<Document> {
    parse_asset_with_limits(bytes, loader, on_progress, &Limits::default()).await
}

/// [`parse_asset`] with explicit decode bounds
pub async fn parse_asset_with_limits<L: BufferLoader>(
    bytes: Vec<u8>,
    loader: &mut L,
    on_progress: Option<&mut dyn FnMut(&str)>,
    limits: &Limits,
) -> GltfResult<Document> {
    let decoded = decode_container(bytes, limits)?;
    let mut document = decoded.document;
    load_buffers(
        &mut document,
        decoded.bin_chunk.as_ref(),
        loader,
        on_progress,
    )
    .await?;
    Ok(document)
}

/// [`parse_asset`] followed by mesh extraction; a bad primitive fails the load
pub async fn parse_asset_with_meshes<L: BufferLoader>(
    bytes: Vec<u8>,
    loader: &mut L,
    on_progress: Option<&mut dyn FnMut(&str)>,
) -> GltfResult<(Document, MeshLibrary)> {
    let document = parse_asset(bytes, loader, on_progress).await?;
    let meshes = document.extract_meshes()?;
    Ok((document, meshes))
}

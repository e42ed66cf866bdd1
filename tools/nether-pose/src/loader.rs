//! Filesystem-backed buffer loading

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nether_gltf::{BoxError, BufferLoader, Document, Limits, parse_asset_with_limits};

/// Resolves external buffer URIs relative to the asset's directory
#[derive(Debug, Clone)]
pub struct FsBufferLoader {
    base_dir: PathBuf,
}

impl FsBufferLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Loader for buffers next to `asset`
    pub fn for_asset(asset: &Path) -> Self {
        Self::new(asset.parent().unwrap_or(Path::new(".")))
    }
}

impl BufferLoader for FsBufferLoader {
    async fn load_buffer(&mut self, uri: &str) -> Result<Vec<u8>, BoxError> {
        let path = self.base_dir.join(uri);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        Ok(bytes)
    }
}

/// Read a glTF/GLB file and load all of its buffers
pub async fn load_document(input: &Path, limits: &Limits) -> Result<Document> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {:?}", input))?;

    let mut loader = FsBufferLoader::for_asset(input);
    let mut on_progress = |uri: &str| {
        if !uri.is_empty() {
            tracing::debug!("Loading buffer {}", uri);
        }
    };

    parse_asset_with_limits(bytes, &mut loader, Some(&mut on_progress), limits)
        .await
        .with_context(|| format!("Failed to load glTF: {:?}", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_external_buffer_relative_to_asset() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("data.bin"), [1u8, 2, 3, 4]).unwrap();
        let gltf_path = dir.path().join("scene.gltf");
        std::fs::write(
            &gltf_path,
            r#"{"asset": {"version": "2.0"}, "buffers": [{"byteLength": 4, "uri": "data.bin"}]}"#,
        )
        .unwrap();

        let document = runtime()
            .block_on(load_document(&gltf_path, &Limits::default()))
            .unwrap();
        assert_eq!(document.buffers[0].data().unwrap().as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_buffer_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut loader = FsBufferLoader::new(dir.path());
        let err = runtime().block_on(loader.load_buffer("absent.bin")).unwrap_err();
        assert!(err.to_string().contains("absent.bin"));
    }
}

//! Binary data packing for glTF buffers.

use serde_json::{Value, json};

/// Accumulates buffer views in one 4-byte aligned payload
#[derive(Default)]
pub struct BinaryPacker {
    pub buffer: Vec<u8>,
    pub views: Vec<Value>,
}

impl BinaryPacker {
    /// Append `data` as a new view on buffer 0, returning the view index
    pub fn push_view(&mut self, data: &[u8], byte_stride: Option<usize>) -> usize {
        while !self.buffer.len().is_multiple_of(4) {
            self.buffer.push(0);
        }
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(data);

        let mut view = json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": data.len(),
        });
        if let Some(stride) = byte_stride {
            view["byteStride"] = stride.into();
        }
        self.views.push(view);
        self.views.len() - 1
    }

    pub fn push_f32s(&mut self, values: &[f32]) -> usize {
        self.push_view(bytemuck::cast_slice(values), None)
    }
}

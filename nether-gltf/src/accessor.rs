//! Accessor resolution
//!
//! Turns an accessor (bufferView window + component layout) into a
//! contiguous typed array. Interleaved views are unrolled into a fresh copy;
//! callers never see strided data.

use crate::document::{Accessor, Document};
use crate::error::{GltfError, GltfResult};

/// Scalar component kind of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ComponentType {
    pub const GL_UNSIGNED_BYTE: u32 = 5121;
    pub const GL_UNSIGNED_SHORT: u32 = 5123;
    pub const GL_UNSIGNED_INT: u32 = 5125;
    pub const GL_FLOAT: u32 = 5126;

    pub fn from_gl(code: u32) -> Option<Self> {
        match code {
            Self::GL_UNSIGNED_BYTE => Some(Self::UnsignedByte),
            Self::GL_UNSIGNED_SHORT => Some(Self::UnsignedShort),
            Self::GL_UNSIGNED_INT => Some(Self::UnsignedInt),
            Self::GL_FLOAT => Some(Self::Float),
            _ => None,
        }
    }

    /// Bytes per component
    pub fn size(self) -> usize {
        match self {
            Self::UnsignedByte => 1,
            Self::UnsignedShort => 2,
            Self::UnsignedInt | Self::Float => 4,
        }
    }
}

/// Element shape of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl ElementType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    /// Components per element
    pub fn width(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat4 => 16,
        }
    }
}

/// Decoded component values
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl TypedArray {
    /// Decode little-endian components; `bytes.len()` must be a multiple of
    /// the component size
    fn decode(component: ComponentType, bytes: &[u8]) -> Self {
        match component {
            ComponentType::UnsignedByte => TypedArray::U8(bytes.to_vec()),
            ComponentType::UnsignedShort => TypedArray::U16(
                bytes
                    .chunks_exact(2)
                    .map(|b| u16::from_le_bytes([b[0], b[1]]))
                    .collect(),
            ),
            ComponentType::UnsignedInt => TypedArray::U32(
                bytes
                    .chunks_exact(4)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            ComponentType::Float => TypedArray::F32(
                bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            TypedArray::U8(_) => ComponentType::UnsignedByte,
            TypedArray::U16(_) => ComponentType::UnsignedShort,
            TypedArray::U32(_) => ComponentType::UnsignedInt,
            TypedArray::F32(_) => ComponentType::Float,
        }
    }

    /// Number of components
    pub fn len(&self) -> usize {
        match self {
            TypedArray::U8(v) => v.len(),
            TypedArray::U16(v) => v.len(),
            TypedArray::U32(v) => v.len(),
            TypedArray::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            TypedArray::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Components widened to f32 (integers are not normalized)
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            TypedArray::U8(v) => v.iter().map(|&x| f32::from(x)).collect(),
            TypedArray::U16(v) => v.iter().map(|&x| f32::from(x)).collect(),
            TypedArray::U32(v) => v.iter().map(|&x| x as f32).collect(),
            TypedArray::F32(v) => v.clone(),
        }
    }

    /// Integer components widened to u32; `None` for float data
    pub fn to_u32_vec(&self) -> Option<Vec<u32>> {
        match self {
            TypedArray::U8(v) => Some(v.iter().map(|&x| u32::from(x)).collect()),
            TypedArray::U16(v) => Some(v.iter().map(|&x| u32::from(x)).collect()),
            TypedArray::U32(v) => Some(v.clone()),
            TypedArray::F32(_) => None,
        }
    }
}

/// Contiguous accessor contents plus element metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArray {
    data: TypedArray,
    element_size: usize,
    stride_bytes: usize,
}

impl ResolvedArray {
    pub fn data(&self) -> &TypedArray {
        &self.data
    }

    pub fn into_data(self) -> TypedArray {
        self.data
    }

    /// Components per element (1-4, or 16 for MAT4)
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Interleave stride of the source view, 0 if it was already contiguous.
    /// `data` is contiguous either way.
    pub fn stride_bytes(&self) -> usize {
        self.stride_bytes
    }

    /// Number of whole elements
    pub fn element_count(&self) -> usize {
        self.data.len() / self.element_size
    }
}

fn component_type_of(accessor: &Accessor) -> GltfResult<ComponentType> {
    if let Some(component) = accessor.component_type.and_then(ComponentType::from_gl) {
        return Ok(component);
    }
    // Untyped (or unknown) components on a known shape are read as float
    match ElementType::parse(&accessor.element_type) {
        Some(_) => Ok(ComponentType::Float),
        None => Err(GltfError::unsupported(
            "accessor layout",
            format!(
                "componentType {:?} with type {}",
                accessor.component_type, accessor.element_type
            ),
        )),
    }
}

fn element_type_of(accessor: &Accessor) -> GltfResult<ElementType> {
    ElementType::parse(&accessor.element_type)
        .ok_or_else(|| GltfError::unsupported("accessor type", &accessor.element_type))
}

/// Borrow `[start, start + len)` of `bytes`, failing past `limit`
fn slice_checked(bytes: &[u8], start: usize, len: usize, limit: usize) -> GltfResult<&[u8]> {
    match start.checked_add(len) {
        Some(end) if end <= limit => Ok(&bytes[start..end]),
        _ => Err(GltfError::OutOfRange {
            offset: start,
            len,
            available: limit.saturating_sub(start),
        }),
    }
}

/// Range error for JSON-supplied offsets or lengths whose sum or product
/// does not fit in `usize`
fn overflowed(offset: usize, len: usize, available: usize) -> GltfError {
    GltfError::OutOfRange {
        offset,
        len,
        available,
    }
}

/// Copy one element out of every stride-sized instance in `region`
///
/// An instance is kept when its element fits inside the region, so a final
/// instance without trailing padding is still read.
pub(crate) fn unroll_interleaved(
    region: &[u8],
    stride: usize,
    element_offset: usize,
    element_bytes: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity((region.len() / stride) * element_bytes);
    let mut start = element_offset;
    while let Some(end) = start.checked_add(element_bytes) {
        if end > region.len() {
            break;
        }
        out.extend_from_slice(&region[start..end]);
        match start.checked_add(stride) {
            Some(next) => start = next,
            None => break,
        }
    }
    out
}

impl Document {
    /// Resolve an accessor into a contiguous typed array
    ///
    /// The buffer behind the accessor must already have data attached.
    pub fn resolve_accessor(&self, index: usize) -> GltfResult<ResolvedArray> {
        let accessor = self.accessor(index)?;
        let view_index = accessor.buffer_view.ok_or(GltfError::Missing {
            kind: "bufferView of accessor",
            index,
        })?;
        let view = self.buffer_view(view_index)?;
        let data = self
            .buffer(view.buffer)?
            .data()
            .ok_or(GltfError::BufferNotLoaded {
                buffer: view.buffer,
            })?;

        let component = component_type_of(accessor)?;
        let width = element_type_of(accessor)?.width();
        let element_bytes = width * component.size();

        // Offsets are into the backing allocation, reads stay inside the buffer
        let storage = data.storage();
        let limit = data.offset() + data.len();

        let stride = match view.byte_stride {
            Some(stride) if stride != 0 && stride != element_bytes => stride,
            _ => 0,
        };

        if stride != 0 {
            // The view spans every interleaved instance; the accessor count
            // may only describe part of it
            let region_start = view
                .byte_offset
                .checked_add(data.offset())
                .ok_or_else(|| overflowed(view.byte_offset, view.byte_length, data.len()))?;
            let region = slice_checked(storage, region_start, view.byte_length, limit)?;
            if accessor.byte_offset.checked_add(element_bytes).is_none() {
                return Err(overflowed(accessor.byte_offset, element_bytes, region.len()));
            }
            let bytes = unroll_interleaved(region, stride, accessor.byte_offset, element_bytes);
            let instances = bytes.len() / element_bytes;
            if instances != accessor.count {
                tracing::debug!(
                    "accessor {}: unrolled {} interleaved elements, count is {}",
                    index,
                    instances,
                    accessor.count
                );
            }
            return Ok(ResolvedArray {
                data: TypedArray::decode(component, &bytes),
                element_size: width,
                stride_bytes: stride,
            });
        }

        let offset = view
            .byte_offset
            .checked_add(accessor.byte_offset)
            .and_then(|offset| offset.checked_add(data.offset()));
        let component_count = accessor.count.checked_mul(width);
        let byte_len = component_count.and_then(|count| count.checked_mul(component.size()));
        let (Some(offset), Some(component_count), Some(byte_len)) =
            (offset, component_count, byte_len)
        else {
            return Err(overflowed(
                view.byte_offset.saturating_add(accessor.byte_offset),
                accessor.count.saturating_mul(element_bytes),
                data.len(),
            ));
        };
        let view_component_count = view.byte_length / component.size();
        if component_count != view_component_count {
            tracing::debug!(
                "accessor {}: {} components, bufferView {} holds {}",
                index,
                component_count,
                view_index,
                view_component_count
            );
        }

        let bytes = slice_checked(storage, offset, byte_len, limit)?;
        Ok(ResolvedArray {
            data: TypedArray::decode(component, bytes),
            element_size: width,
            stride_bytes: 0,
        })
    }

    /// Resolve an accessor used as a vertex attribute or animation sampler,
    /// which must have 1-4 components per element
    pub fn resolve_vector_accessor(&self, index: usize) -> GltfResult<ResolvedArray> {
        let resolved = self.resolve_accessor(index)?;
        if !(1..=4).contains(&resolved.element_size) {
            return Err(GltfError::format(
                "attribute accessor",
                format!(
                    "accessor {} has element size {}, expected 1-4",
                    index, resolved.element_size
                ),
            ));
        }
        Ok(resolved)
    }
}

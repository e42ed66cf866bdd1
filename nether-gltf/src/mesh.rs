//! Mesh extraction: every primitive as a named geometry with resolved data

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::accessor::ResolvedArray;
use crate::document::{Document, Primitive};
use crate::error::{GltfError, GltfResult};

/// One primitive with its accessors resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub material: Option<usize>,
    /// Primitive topology, `None` means triangles
    pub mode: Option<u32>,
    pub indices: Option<ResolvedArray>,
    pub attributes: BTreeMap<String, ResolvedArray>,
    pub vertex_count: usize,
}

impl Geometry {
    pub fn attribute(&self, name: &str) -> Option<&ResolvedArray> {
        self.attributes.get(name)
    }

    /// Index list widened to `u32`, `None` for non-indexed or float indices
    pub fn index_list(&self) -> Option<Vec<u32>> {
        self.indices.as_ref()?.data().to_u32_vec()
    }
}

/// The geometries of one glTF mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshGroup {
    pub name: String,
    pub mesh_index: usize,
    pub geometry_names: Vec<String>,
}

/// All geometries of a document, grouped by mesh
#[derive(Debug, Clone, Default)]
pub struct MeshLibrary {
    groups: Vec<MeshGroup>,
    geometries: HashMap<String, Geometry>,
}

impl MeshLibrary {
    /// Groups in mesh order
    pub fn groups(&self) -> &[MeshGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&MeshGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn geometry(&self, name: &str) -> Option<&Geometry> {
        self.geometries.get(name)
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    fn insert_geometry(&mut self, name: String, geometry: Geometry) -> GltfResult<()> {
        if self.geometries.contains_key(&name) {
            return Err(GltfError::Duplicate {
                kind: "geometry",
                key: name,
            });
        }
        self.geometries.insert(name, geometry);
        Ok(())
    }
}

impl Document {
    /// Resolve every mesh primitive into a [`MeshLibrary`]
    ///
    /// Groups are named after the mesh (`Group#<index>` when unnamed) and
    /// geometries `<group>_<n>`.
    pub fn extract_meshes(&self) -> GltfResult<MeshLibrary> {
        let mut library = MeshLibrary::default();

        for (mesh_index, mesh) in self.meshes.iter().enumerate() {
            let mut group = MeshGroup {
                name: mesh
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Group#{mesh_index}")),
                mesh_index,
                geometry_names: Vec::with_capacity(mesh.primitives.len()),
            };

            for primitive in &mesh.primitives {
                let geometry_name = format!("{}_{}", group.name, group.geometry_names.len());
                let geometry = self.extract_geometry(primitive)?;
                tracing::debug!(
                    "geometry {}: {} vertices, {} attributes",
                    geometry_name,
                    geometry.vertex_count,
                    geometry.attributes.len()
                );
                library.insert_geometry(geometry_name.clone(), geometry)?;
                group.geometry_names.push(geometry_name);
            }

            library.groups.push(group);
        }

        Ok(library)
    }

    fn extract_geometry(&self, primitive: &Primitive) -> GltfResult<Geometry> {
        let attributes = primitive
            .attributes
            .iter()
            .map(|(name, &accessor)| Ok((name.clone(), self.resolve_vector_accessor(accessor)?)))
            .collect::<GltfResult<BTreeMap<_, _>>>()?;

        let indices = primitive
            .indices
            .map(|accessor| self.resolve_accessor(accessor))
            .transpose()?;

        let vertex_count = attributes
            .values()
            .next()
            .map_or(0, ResolvedArray::element_count);

        Ok(Geometry {
            material: primitive.material,
            mode: primitive.mode,
            indices,
            attributes,
            vertex_count,
        })
    }
}

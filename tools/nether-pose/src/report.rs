//! Subcommand reports, written through `tracing::info!`

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use nether_gltf::{Document, Limits, MAX_SKINNING_JOINTS, Skeleton};

pub fn info(input: &Path, document: &Document) -> Result<()> {
    tracing::info!(
        "{:?}: glTF {} ({})",
        input,
        document.asset.version,
        document.asset.generator.as_deref().unwrap_or("unknown generator")
    );

    let total_bytes: usize = document
        .buffers
        .iter()
        .filter_map(|b| b.data())
        .map(|d| d.len())
        .sum();
    tracing::info!("Buffers: {} ({} bytes)", document.buffers.len(), total_bytes);

    let library = document
        .extract_meshes()
        .context("Failed to extract meshes")?;
    tracing::info!("Meshes: {}", library.groups().len());
    for group in library.groups() {
        for name in &group.geometry_names {
            if let Some(geometry) = library.geometry(name) {
                tracing::info!(
                    "  {}: {} vertices, {} indices, attributes [{}]",
                    name,
                    geometry.vertex_count,
                    geometry.indices.as_ref().map_or(0, |i| i.data().len()),
                    geometry
                        .attributes
                        .keys()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
    }

    tracing::info!("Skins: {}", document.skins.len());
    for (i, skin) in document.skins.iter().enumerate() {
        let name = skin.name.as_deref().unwrap_or("unnamed");
        tracing::info!("  [{}] '{}': {} joints", i, name, skin.joints.len());
    }

    tracing::info!("Animations: {}", document.animations.len());
    for (i, name) in document.animation_names().into_iter().enumerate() {
        tracing::info!("  [{}] '{}'", i, name.unwrap_or("unnamed"));
    }

    Ok(())
}

fn load_skeleton(document: &Document, skin: usize, limits: &Limits) -> Result<Skeleton> {
    document
        .get_skeleton_with_limits(skin, limits)
        .with_context(|| format!("Failed to build skeleton for skin {}", skin))
}

pub fn skeleton(document: &Document, skin: usize, limits: &Limits) -> Result<()> {
    let skeleton = load_skeleton(document, skin, limits)?;
    tracing::info!(
        "Skin [{}] '{}': {} joints",
        skin,
        skeleton.name().unwrap_or("unnamed"),
        skeleton.len()
    );
    if skeleton.len() > MAX_SKINNING_JOINTS {
        tracing::warn!(
            "{} joints exceeds the {} supported for skinning",
            skeleton.len(),
            MAX_SKINNING_JOINTS
        );
    }

    for &index in skeleton.dependency_order() {
        let joint = &skeleton.joints()[index];
        let parent = joint
            .parent_index()
            .and_then(|p| skeleton.joint(p))
            .map_or("-", |p| p.name());
        let depth = joint.ancestor_chain().len();
        tracing::info!(
            "  {}[{}] {} (node {}, parent {}, bind {})",
            "  ".repeat(depth),
            index,
            joint.name(),
            joint.node_index(),
            parent,
            format_vec3(joint.world_position())
        );
    }

    Ok(())
}

pub fn animations(input: &Path, document: &Document) -> Result<()> {
    if document.animations.is_empty() {
        tracing::info!("No animations found in {:?}", input);
        return Ok(());
    }

    tracing::info!("Animations in {:?}:", input);
    for i in 0..document.animations.len() {
        let clip = document
            .get_animation_at(i)
            .with_context(|| format!("Failed to build animation {}", i))?;
        tracing::info!(
            "  [{}] '{}': {} tracks, {:.3}s",
            i,
            clip.name().unwrap_or("unnamed"),
            clip.len(),
            clip.last_keyframe_time().unwrap_or(0.0)
        );
    }

    Ok(())
}

pub fn pose(
    document: &Document,
    animation: &str,
    skin: usize,
    time: f32,
    limits: &Limits,
) -> Result<()> {
    let skeleton = load_skeleton(document, skin, limits)?;
    let clip = document
        .get_animation(animation)
        .with_context(|| format!("Failed to build animation '{}'", animation))?;
    let frame = clip.frame(time);
    let pose = skeleton
        .joint_world_transforms(Some(&frame))
        .with_context(|| format!("Failed to sample '{}' at {}s", animation, time))?;

    tracing::info!("'{}' at {:.3}s:", animation, time);
    for (index, joint) in skeleton.joints().iter().enumerate() {
        let position = pose.joint_position(index).unwrap_or(Vec3::ZERO);
        tracing::info!("  [{}] {} {}", index, joint.name(), format_vec3(position));
    }

    Ok(())
}

fn format_vec3(v: Vec3) -> String {
    format!("({:.4}, {:.4}, {:.4})", v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_vec3() {
        assert_eq!(format_vec3(Vec3::new(1.0, -0.5, 0.0)), "(1.0000, -0.5000, 0.0000)");
    }
}

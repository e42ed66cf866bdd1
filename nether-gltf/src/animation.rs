//! Keyframe animation clips
//!
//! A clip holds one track per (object, property) pair. Tracks are sampled at
//! arbitrary times; rotations are always interpolated spherically, whatever
//! interpolation the sampler declares.

use std::fmt;

use hashbrown::HashMap;

use crate::accessor::ResolvedArray;
use crate::document::{Animation, ChannelTarget, Document};
use crate::error::{GltfError, GltfResult};

/// Quaternions closer than this (1 - cos) are linearly interpolated
const SLERP_EPSILON: f32 = 1e-5;

/// Interpolation applied between two keyframes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// `LINEAR`: component-wise lerp
    Linear,
    /// Quaternion slerp; not a glTF sampler mode, used for every rotation
    Spherical,
    /// `STEP`: hold the previous keyframe
    Step,
    /// `CUBICSPLINE`: Hermite spline over (in-tangent, value, out-tangent)
    CubicSpline,
}

impl Interpolation {
    /// Parse a sampler's `interpolation` string
    pub fn parse(name: &str) -> GltfResult<Self> {
        match name {
            "LINEAR" => Ok(Self::Linear),
            "STEP" => Ok(Self::Step),
            "CUBICSPLINE" => Ok(Self::CubicSpline),
            other => Err(GltfError::unsupported("interpolation", other)),
        }
    }
}

/// Strip a namespace prefix (`mixamorig:Hips` -> `Hips`)
pub fn normalize_object_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Key identifying a track within a clip
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub object: String,
    pub property: String,
}

impl TrackKey {
    /// Build a key, normalizing the object name
    pub fn new(object: &str, property: &str) -> Self {
        Self {
            object: normalize_object_name(object).to_string(),
            property: property.to_string(),
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.object, self.property)
    }
}

/// Component-wise linear interpolation
pub fn lerp(a: &[f32], b: &[f32], t: f32) -> Vec<f32> {
    a.iter().zip(b).map(|(&a, &b)| a + (b - a) * t).collect()
}

/// Spherical interpolation between two `[x, y, z, w]` quaternions
///
/// Takes the shortest path. Returns `a` exactly at `t <= 0` and `b` exactly
/// at `t >= 1`.
pub fn slerp(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }

    let mut cos = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];
    let mut b = b;
    if cos < 0.0 {
        cos = -cos;
        b = [-b[0], -b[1], -b[2], -b[3]];
    }

    let (scale_a, scale_b) = if 1.0 - cos > SLERP_EPSILON {
        let omega = cos.acos();
        let sin = omega.sin();
        (((1.0 - t) * omega).sin() / sin, (t * omega).sin() / sin)
    } else {
        (1.0 - t, t)
    };

    [
        scale_a * a[0] + scale_b * b[0],
        scale_a * a[1] + scale_b * b[1],
        scale_a * a[2] + scale_b * b[2],
        scale_a * a[3] + scale_b * b[3],
    ]
}

fn as_quat(value: &[f32]) -> GltfResult<[f32; 4]> {
    value.try_into().map_err(|_| {
        GltfError::format(
            "rotation keyframe",
            format!("{} components, slerp needs 4", value.len()),
        )
    })
}

/// Keyframes for one property of one object
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    object_name: String,
    property: String,
    declared_interpolation: String,
    keyframe_times: Vec<f32>,
    keyframe_values: Vec<f32>,
    element_size: usize,
}

impl AnimationTrack {
    /// Create a track
    ///
    /// `keyframe_values` holds `element_size` floats per keyframe, or three
    /// such groups (in-tangent, value, out-tangent) for `CUBICSPLINE`.
    pub fn new(
        object_name: impl Into<String>,
        property: impl Into<String>,
        declared_interpolation: impl Into<String>,
        keyframe_times: Vec<f32>,
        keyframe_values: Vec<f32>,
        element_size: usize,
    ) -> GltfResult<Self> {
        let track = Self {
            object_name: object_name.into(),
            property: property.into(),
            declared_interpolation: declared_interpolation.into(),
            keyframe_times,
            keyframe_values,
            element_size,
        };

        if track.keyframe_times.is_empty() {
            return Err(GltfError::format(
                "animation track",
                format!("{} has no keyframes", track.key()),
            ));
        }
        if element_size == 0 {
            return Err(GltfError::format(
                "animation track",
                format!("{} has zero-sized values", track.key()),
            ));
        }
        let expected = track.keyframe_times.len() * track.keyframe_stride();
        if track.keyframe_values.len() < expected {
            return Err(GltfError::format(
                "animation track",
                format!(
                    "{} has {} values, {} keyframes need {}",
                    track.key(),
                    track.keyframe_values.len(),
                    track.keyframe_times.len(),
                    expected
                ),
            ));
        }
        if track.keyframe_values.len() > expected {
            tracing::debug!(
                "track {}: {} values, using the first {}",
                track.key(),
                track.keyframe_values.len(),
                expected
            );
        }
        Ok(track)
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.object_name, &self.property)
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Interpolation string from the sampler
    pub fn declared_interpolation(&self) -> &str {
        &self.declared_interpolation
    }

    pub fn keyframe_times(&self) -> &[f32] {
        &self.keyframe_times
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn first_keyframe_time(&self) -> f32 {
        self.keyframe_times[0]
    }

    pub fn last_keyframe_time(&self) -> f32 {
        self.keyframe_times[self.keyframe_times.len() - 1]
    }

    /// Interpolation actually used; rotations are always spherical
    pub fn interpolation(&self) -> GltfResult<Interpolation> {
        if self.property == "rotation" {
            return Ok(Interpolation::Spherical);
        }
        Interpolation::parse(&self.declared_interpolation)
    }

    fn is_cubic_layout(&self) -> bool {
        self.declared_interpolation == "CUBICSPLINE"
    }

    /// Floats stored per keyframe
    fn keyframe_stride(&self) -> usize {
        if self.is_cubic_layout() {
            self.element_size * 3
        } else {
            self.element_size
        }
    }

    /// Value group `group` (0 in-tangent, 1 value, 2 out-tangent for cubic
    /// layouts) of keyframe `index`
    fn keyframe_group(&self, index: usize, group: usize) -> &[f32] {
        let start = index * self.keyframe_stride() + group * self.element_size;
        &self.keyframe_values[start..start + self.element_size]
    }

    /// Value of keyframe `index`
    pub fn keyframe_value(&self, index: usize) -> &[f32] {
        let group = if self.is_cubic_layout() { 1 } else { 0 };
        self.keyframe_group(index, group)
    }

    /// Sample the track at `time_secs`
    ///
    /// Times before the first keyframe return the first value; times at or
    /// after the last keyframe return the last value.
    pub fn value_at(&self, time_secs: f32) -> GltfResult<Vec<f32>> {
        let times = &self.keyframe_times;

        let mut prev = 0;
        for (index, &keyframe_time) in times.iter().enumerate() {
            if keyframe_time > time_secs {
                break;
            }
            prev = index;
        }
        let next = (prev + 1).min(times.len() - 1);

        let prev_value = self.keyframe_value(prev);
        if prev == next {
            return Ok(prev_value.to_vec());
        }
        let next_value = self.keyframe_value(next);

        let t = (time_secs - times[prev]) / (times[next] - times[prev]);
        if t.is_nan() || t <= 0.0 {
            return Ok(prev_value.to_vec());
        }
        if t >= 1.0 {
            return Ok(next_value.to_vec());
        }

        match self.interpolation()? {
            Interpolation::Linear => Ok(lerp(prev_value, next_value, t)),
            Interpolation::Spherical => {
                Ok(slerp(as_quat(prev_value)?, as_quat(next_value)?, t).to_vec())
            }
            Interpolation::Step => Ok(prev_value.to_vec()),
            Interpolation::CubicSpline => Ok(self.hermite(prev, next, t)),
        }
    }

    fn hermite(&self, prev: usize, next: usize, t: f32) -> Vec<f32> {
        let interval = self.keyframe_times[next] - self.keyframe_times[prev];
        let p0 = self.keyframe_group(prev, 1);
        let m0 = self.keyframe_group(prev, 2);
        let p1 = self.keyframe_group(next, 1);
        let m1 = self.keyframe_group(next, 0);

        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        (0..self.element_size)
            .map(|i| {
                h00 * p0[i] + h10 * interval * m0[i] + h01 * p1[i] + h11 * interval * m1[i]
            })
            .collect()
    }
}

/// Where a channel writes to
enum TargetObject {
    Node(usize),
    /// Non-node pointer targets, keyed as `<type>/<index>`
    Other(String),
}

fn resolve_target(
    channel_index: usize,
    target: &ChannelTarget,
) -> GltfResult<(TargetObject, String)> {
    let Some(pointer) = &target.extensions.animation_pointer else {
        let node = target.node.ok_or_else(|| {
            GltfError::format(
                "animation channel",
                format!("channel {channel_index} targets no node"),
            )
        })?;
        return Ok((TargetObject::Node(node), target.path.clone()));
    };

    if target.path != "pointer" {
        return Err(GltfError::format(
            "KHR_animation_pointer",
            format!("target path is \"{}\", expected \"pointer\"", target.path),
        ));
    }

    // "/nodes/6/translation", "/materials/0/pbrMetallicRoughness/baseColorFactor"
    let malformed = || {
        GltfError::format(
            "KHR_animation_pointer",
            format!("malformed pointer \"{}\"", pointer.pointer),
        )
    };
    let mut segments = pointer.pointer.split('/');
    if segments.next() != Some("") {
        return Err(malformed());
    }
    let target_type = segments.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
    let target_index: usize = segments
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(malformed)?;
    let property = segments.collect::<Vec<_>>().join(".");
    if property.is_empty() {
        return Err(malformed());
    }

    let object = if target_type == "nodes" {
        TargetObject::Node(target_index)
    } else {
        TargetObject::Other(format!("{target_type}/{target_index}"))
    };
    Ok((object, property))
}

/// Named set of tracks built from one glTF animation
#[derive(Debug, Clone, Default)]
pub struct AnimationClip {
    name: Option<String>,
    tracks: HashMap<TrackKey, AnimationTrack>,
}

impl AnimationClip {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            tracks: HashMap::new(),
        }
    }

    /// Build a clip from a document animation
    ///
    /// `node_name` maps a node index to the name tracks are keyed by;
    /// `resolve` resolves a sampler accessor.
    pub fn build<N, R>(animation: &Animation, node_name: N, resolve: R) -> GltfResult<Self>
    where
        N: Fn(usize) -> GltfResult<String>,
        R: Fn(usize) -> GltfResult<ResolvedArray>,
    {
        let mut clip = Self::new(animation.name.clone());

        for (channel_index, channel) in animation.channels.iter().enumerate() {
            let sampler = animation
                .samplers
                .get(channel.sampler)
                .ok_or(GltfError::Missing {
                    kind: "animation sampler",
                    index: channel.sampler,
                })?;

            let (object, property) = resolve_target(channel_index, &channel.target)?;
            let object_name = match object {
                TargetObject::Node(node) => node_name(node)?,
                TargetObject::Other(name) => name,
            };

            let times = resolve(sampler.input)?;
            if times.element_size() != 1 {
                return Err(GltfError::format(
                    "animation sampler",
                    format!(
                        "time accessor {} has element size {}",
                        sampler.input,
                        times.element_size()
                    ),
                ));
            }
            let values = resolve(sampler.output)?;

            let track = AnimationTrack::new(
                object_name,
                property,
                sampler.interpolation.clone(),
                times.data().to_f32_vec(),
                values.data().to_f32_vec(),
                values.element_size(),
            )?;
            clip.add_track(track)?;
        }

        Ok(clip)
    }

    /// Insert a track; fails if the clip already has one for the same key
    pub fn add_track(&mut self, track: AnimationTrack) -> GltfResult<()> {
        let key = track.key();
        if self.tracks.contains_key(&key) {
            return Err(GltfError::Duplicate {
                kind: "animation track",
                key: key.to_string(),
            });
        }
        self.tracks.insert(key, track);
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &AnimationTrack> {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, object: &str, property: &str) -> Option<&AnimationTrack> {
        self.tracks.get(&TrackKey::new(object, property))
    }

    /// Latest keyframe time over all tracks, `None` for an empty clip
    pub fn last_keyframe_time(&self) -> Option<f32> {
        self.tracks
            .values()
            .map(AnimationTrack::last_keyframe_time)
            .reduce(f32::max)
    }

    /// View of the clip at one point in time
    pub fn frame(&self, time_secs: f32) -> AnimationFrame<'_> {
        AnimationFrame {
            clip: self,
            time_secs,
        }
    }
}

/// A clip sampled lazily at a fixed time
#[derive(Debug, Clone, Copy)]
pub struct AnimationFrame<'a> {
    clip: &'a AnimationClip,
    time_secs: f32,
}

impl AnimationFrame<'_> {
    pub fn time_secs(&self) -> f32 {
        self.time_secs
    }

    /// Interpolated value, or `None` when the clip has no such track
    pub fn value(&self, object: &str, property: &str) -> GltfResult<Option<Vec<f32>>> {
        self.clip
            .track(object, property)
            .map(|track| track.value_at(self.time_secs))
            .transpose()
    }
}

impl Document {
    /// Build the clip for the animation called `name`
    pub fn get_animation(&self, name: &str) -> GltfResult<AnimationClip> {
        self.build_clip(self.animation_by_name(name)?)
    }

    /// Build the clip for animation `index` (for unnamed animations)
    pub fn get_animation_at(&self, index: usize) -> GltfResult<AnimationClip> {
        let animation = self.animations.get(index).ok_or(GltfError::Missing {
            kind: "animation",
            index,
        })?;
        self.build_clip(animation)
    }

    fn build_clip(&self, animation: &Animation) -> GltfResult<AnimationClip> {
        AnimationClip::build(
            animation,
            |node| Ok(self.node(node)?.label(node)),
            |accessor| self.resolve_vector_accessor(accessor),
        )
    }
}

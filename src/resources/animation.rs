//! Animation clips and the mixers that drive them.
//!
//! A glTF animation arrives as one channel per transform component
//! ([`AnimationClip`]); [`merge`] folds the channels of a node into a single
//! [`ModelAnimation`] track that can be sampled at an arbitrary time. A
//! [`Mixer`] owns the tracks of one animated model instance, advances them
//! with the frame clock, and writes the sampled poses back into the scene
//! graph by node name.

use std::collections::HashMap;

use cgmath::{One, VectorSpace};

use crate::data_structures::{scene_graph::SceneNode, transform::Transform};

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<cgmath::Vector3<f32>>),
    Rotation(Vec<cgmath::Quaternion<f32>>),
    Scale(Vec<cgmath::Vector3<f32>>),
    Other,
}

/// One animation channel: a named animation targeting a single node with
/// keyframes for one transform component.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub target: String,
    pub keyframes: Keyframes,
    pub timestamps: Vec<f32>,
}

/// A merged per-node track: full transforms at each timestamp.
#[derive(Clone, Debug, Default)]
pub struct ModelAnimation {
    pub name: String,
    pub target: String,
    pub timestamps: Vec<f32>,
    pub transforms: Vec<Transform>,
}

impl ModelAnimation {
    pub fn duration(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }

    /// Sample the track at `time`. Clamps before the first and after the
    /// last keyframe, interpolates in between.
    pub fn sample(&self, time: f32) -> Option<Transform> {
        if self.timestamps.is_empty() || self.transforms.is_empty() {
            return None;
        }
        if time <= self.timestamps[0] {
            return Some(self.transforms[0].clone());
        }
        let last = self.transforms.len() - 1;
        if time >= self.timestamps[last] {
            return Some(self.transforms[last].clone());
        }
        let next = self
            .timestamps
            .iter()
            .position(|&t| t > time)
            .unwrap_or(last);
        let prev = next - 1;
        let span = self.timestamps[next] - self.timestamps[prev];
        let amount = if span > 0.0 {
            (time - self.timestamps[prev]) / span
        } else {
            0.0
        };
        let a = &self.transforms[prev];
        let b = &self.transforms[next];
        Some(Transform {
            position: a.position.lerp(b.position, amount),
            rotation: a.rotation.nlerp(b.rotation, amount),
            scale: a.scale.lerp(b.scale, amount),
        })
    }
}

/**
 * Merges channels with the same animation name and target node so that all
 * transform components live in one track.
 *
 * glTF:
 * AnimationClip { name: walk, target: Hips, keyframes: Rotation([..]) }
 * AnimationClip { name: walk, target: Hips, keyframes: Translation([..]) }
 * ...
 *
 * to
 *
 * ModelAnimation { name: walk, target: Hips, transforms: [Transform, ..] }
 *
 * Shorter tracks are padded with their first value; components without any
 * channel fall back to the identity.
 */
pub fn merge(clips: Vec<AnimationClip>) -> Vec<ModelAnimation> {
    struct Tracks {
        trans: Vec<cgmath::Vector3<f32>>,
        rots: Vec<cgmath::Quaternion<f32>>,
        scals: Vec<cgmath::Vector3<f32>>,
        timestamps: Vec<f32>,
    }

    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Tracks> = HashMap::new();
    for clip in clips {
        let key = (clip.name.clone(), clip.target.clone());
        let tracks = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Tracks {
                trans: Vec::new(),
                rots: Vec::new(),
                scals: Vec::new(),
                timestamps: Vec::new(),
            }
        });
        match clip.keyframes {
            Keyframes::Translation(mut translations) => tracks.trans.append(&mut translations),
            Keyframes::Rotation(mut rotations) => tracks.rots.append(&mut rotations),
            Keyframes::Scale(mut scales) => tracks.scals.append(&mut scales),
            Keyframes::Other => continue,
        }
        // in case some channels have fewer steps than others we want the
        // largest set of timestamps for smooth playback
        if clip.timestamps.len() > tracks.timestamps.len() {
            tracks.timestamps = clip.timestamps;
        }
    }

    order
        .into_iter()
        .map(|key| {
            let tracks = groups.remove(&key).expect("group recorded in order");
            let (name, target) = key;
            let transforms = (0..tracks.timestamps.len())
                .map(|i| Transform {
                    position: component(&tracks.trans, i, cgmath::Vector3::new(0.0, 0.0, 0.0)),
                    rotation: component(&tracks.rots, i, cgmath::Quaternion::one()),
                    scale: component(&tracks.scals, i, cgmath::Vector3::new(1.0, 1.0, 1.0)),
                })
                .collect();
            ModelAnimation {
                name,
                target,
                timestamps: tracks.timestamps,
                transforms,
            }
        })
        .collect()
}

fn component<T: Copy>(track: &[T], i: usize, default: T) -> T {
    track
        .get(i)
        .or_else(|| track.first())
        .copied()
        .unwrap_or(default)
}

/// Runtime driver for one animated model instance.
///
/// Owns the merged tracks of a playing animation, advances an internal clock
/// and applies the sampled poses to the matching nodes of the model subtree.
/// Mixers only ever accumulate in the world; they are never removed.
pub struct Mixer {
    clips: Vec<ModelAnimation>,
    duration: f32,
    time: f32,
}

impl Mixer {
    pub fn new(clips: Vec<ModelAnimation>) -> Self {
        let duration = clips
            .iter()
            .map(|clip| clip.duration())
            .fold(0.0, f32::max);
        Self {
            clips,
            duration,
            time: 0.0,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advance the clock by `dt` seconds, looping over the clip duration.
    pub fn advance(&mut self, dt: f32) {
        if self.duration > 0.0 {
            self.time = (self.time + dt) % self.duration;
        }
    }

    /// Write the current pose into `node`'s subtree, matching tracks to
    /// nodes by name. Tracks without a matching node are skipped.
    pub fn apply(&self, node: &mut dyn SceneNode) {
        for clip in &self.clips {
            if let Some(pose) = clip.sample(self.time) {
                if !node.apply_track(&clip.target, pose) {
                    log::debug!("no node named {} for animation {}", clip.target, clip.name);
                }
            }
        }
    }
}

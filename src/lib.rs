//! hangar
//!
//! A small cross-platform 3D world: a skybox, a shadowed ground plane, a
//! statically placed mech and an animated character, rendered with wgpu on
//! native targets and on the web. The crate composes a scene over fixed GPU
//! pipelines and drives a per-frame render loop; an optional VR display mode
//! hands frame pacing to an external headset runtime behind a capability
//! trait.
//!
//! High-level modules
//! - `camera`: perspective camera, orbit controls and the camera uniform
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: scene data models (meshes, transforms, textures, graph)
//! - `pipelines`: the mesh, shadow and skybox render pipelines plus lighting
//! - `resources`: helpers to load models, clips, textures and the skybox
//! - `vr`: the external VR session capability surface
//! - `world`: the scene component and application event loop
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod pipelines;
pub mod resources;
pub mod vr;
pub mod world;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;

/// Web entry point: the page boots straight into the VR configuration, the
/// way the world is meant to be shown on a headset-capable browser.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    use crate::world::{DisplayMode, WorldOptions, run};

    run(WorldOptions {
        mode: DisplayMode::Vr,
    })
    .expect("failed to start the world");
}

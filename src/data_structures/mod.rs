//! Engine data structures: models, textures, scene graphs, and transforms.
//!
//! This module contains the core data types for scene representation:
//!
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains GPU texture wrappers, including the skybox cube texture
//! - `transform` holds node transformations and their GPU representation
//! - `scene_graph` enables hierarchical scene organization

pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;

//! Scene lighting: one ambient and one shadow-casting directional light.
//!
//! The directional light renders the scene into a depth-only shadow map from
//! an orthographic frustum around the world origin; the mesh pass samples it
//! with a comparison sampler for soft shadow edges.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3, ortho};
use wgpu::util::DeviceExt;

use crate::{camera::OPENGL_TO_WGPU_MATRIX, data_structures::texture::Texture};

pub const SHADOW_MAP_SIZE: u32 = 2048;

const SHADOW_EXTENT: f32 = 100.0;
const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 500.0;

#[derive(Clone, Debug)]
pub struct AmbientLight {
    pub color: [f32; 3],
}

#[derive(Clone, Debug)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
}

impl DirectionalLight {
    pub fn direction(&self) -> Vector3<f32> {
        (self.target - self.position).normalize()
    }

    /// View-projection of the light's shadow camera: look from the light
    /// towards its target through an orthographic box around the scene.
    pub fn shadow_view_proj(&self) -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(
            Point3::from_vec(self.position),
            Point3::from_vec(self.target),
            Vector3::unit_y(),
        );
        let proj = ortho(
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            SHADOW_NEAR,
            SHADOW_FAR,
        );
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

/// A light as it appears in the scene graph.
#[derive(Clone, Debug)]
pub enum Light {
    Ambient(AmbientLight),
    Directional(DirectionalLight),
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    shadow_view_proj: [[f32; 4]; 4],
    direction: [f32; 3],
    // Uniforms require 16 byte (4 float) spacing, hence the padding fields
    _padding: u32,
    color: [f32; 3],
    _padding2: u32,
    ambient: [f32; 3],
    _padding3: u32,
}

impl LightUniform {
    pub fn new(ambient: &AmbientLight, directional: &DirectionalLight) -> Self {
        Self {
            shadow_view_proj: directional.shadow_view_proj().into(),
            direction: directional.direction().into(),
            _padding: 0,
            color: directional.color,
            _padding2: 0,
            ambient: ambient.color,
            _padding3: 0,
        }
    }
}

/// GPU resources of the light setup: the uniform shared by the mesh and
/// shadow passes plus the shadow map with its comparison sampler.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub shadow_map: Texture,
    pub shadow_bind_group: wgpu::BindGroup,
    pub shadow_bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(
        device: &wgpu::Device,
        ambient: &AmbientLight,
        directional: &DirectionalLight,
    ) -> Self {
        let uniform = LightUniform::new(ambient, directional);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("light_bind_group_layout"),
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });

        let shadow_map = Texture::create_shadow_map(device, SHADOW_MAP_SIZE);

        let shadow_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Depth,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                        count: None,
                    },
                ],
                label: Some("shadow_bind_group_layout"),
            });

        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(
                        shadow_map.sampler.as_ref().expect("shadow sampler"),
                    ),
                },
            ],
            label: Some("shadow_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            shadow_map,
            shadow_bind_group,
            shadow_bind_group_layout,
        }
    }
}

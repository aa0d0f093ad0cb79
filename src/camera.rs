//! Perspective camera, orbit controls and the camera uniform.
//!
//! The camera orbits a fixed look-at point: yaw/pitch/distance around the
//! target. With the distance clamped to its minimum this behaves like
//! standing at the target and looking around, which is the world's default
//! framing at eye height.

use cgmath::{Angle, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

/// wgpu clip space spans z 0..1 while cgmath produces OpenGL's -1..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const MIN_ORBIT_DISTANCE: f32 = 0.1;
pub const MAX_ORBIT_DISTANCE: f32 = 300.0;

/// Fixed perspective of the world's camera.
pub const FOVY: cgmath::Deg<f32> = cgmath::Deg(60.0);
pub const ZNEAR: f32 = 0.1;
pub const ZFAR: f32 = 500.0;

#[derive(Debug)]
pub struct Camera {
    pub target: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    pub distance: f32,
}

impl Camera {
    pub fn new<T: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        target: T,
        yaw: Y,
        pitch: P,
        distance: f32,
    ) -> Self {
        Self {
            target: target.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            distance: distance.clamp(MIN_ORBIT_DISTANCE, MAX_ORBIT_DISTANCE),
        }
    }

    pub fn position(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target
            + Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw) * self.distance
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position(), self.target, Vector3::unit_y())
    }

    /// The view matrix with its translation removed, as used by the skybox.
    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        let mut view = self.calc_matrix();
        view.w.x = 0.0;
        view.w.y = 0.0;
        view.w.z = 0.0;
        view
    }
}

#[derive(Debug)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    // The eye position in homogenous coordinates for the 16 byte alignment
    // requirement of uniforms
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position().to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Pointer-drag orbit and scroll zoom around the camera's fixed target.
///
/// Deltas accumulate as events arrive and are folded into the camera once
/// per frame by [`update`](Self::update).
#[derive(Debug)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    rotate_delta: (f32, f32),
    zoom_delta: f32,
    is_dragging: bool,
}

impl OrbitControls {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            rotate_delta: (0.0, 0.0),
            zoom_delta: 0.0,
            is_dragging: false,
        }
    }

    /// Track drag state and scroll wheel from window events.
    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.is_dragging = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32
                    }
                };
                self.zoom_delta -= scroll;
            }
            _ => (),
        }
    }

    /// Accumulate raw mouse motion while the pointer is dragging.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if self.is_dragging {
            self.rotate_delta.0 += dx as f32;
            self.rotate_delta.1 += dy as f32;
        }
    }

    /// Fold the accumulated input into the camera and reset the deltas.
    pub fn update(&mut self, camera: &mut Camera) {
        camera.yaw += Rad(self.rotate_delta.0 * self.rotate_speed);
        camera.pitch += Rad(self.rotate_delta.1 * self.rotate_speed);
        // Keep the pitch clear of the poles so the view never flips
        let limit = std::f32::consts::FRAC_PI_2 - 0.05;
        camera.pitch = Rad(camera.pitch.0.clamp(-limit, limit));
        camera.distance = (camera.distance + self.zoom_delta * self.zoom_speed)
            .clamp(MIN_ORBIT_DISTANCE, MAX_ORBIT_DISTANCE);
        self.rotate_delta = (0.0, 0.0);
        self.zoom_delta = 0.0;
    }
}

/// Camera state bundled with its GPU resources.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera, projection: &Projection) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
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
                label: Some("camera_bind_group_layout"),
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Refresh the uniform from the camera and upload it.
    pub fn upload(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

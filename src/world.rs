//! The world: scene composition and the application event loop.
//!
//! One [`World`] owns the GPU context, the scene graph, the animation mixer
//! list and the frame clock, and drives winit's `ApplicationHandler`
//! lifecycle. Scene setup happens in fixed order during initialization:
//! renderer, camera, lights, skybox, ground plane; models arrive later from
//! fire-and-forget async loads whose results come back through the event
//! loop proxy and are appended to the scene graph.
//!
//! The desktop and VR configurations are the same component: VR swaps orbit
//! controls for the session toggle and the headset's frame pacing, and skips
//! the animated character.

use std::{fmt::Debug, iter, sync::Arc};

use cgmath::One;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{
    camera::{Camera, MIN_ORBIT_DISTANCE, OrbitControls},
    context::Context,
    data_structures::{
        scene_graph::{LightNode, ModelNode, Scene, SceneNode, set_cast_shadow_all},
        transform::Transform,
    },
    pipelines::{
        light::{AmbientLight, DirectionalLight, Light},
        skybox::{Skybox, skybox_bind_group_layout},
    },
    resources::{
        animation::{Mixer, ModelAnimation},
        ground_plane, load_animation_clips, load_model_gltf, load_skybox,
    },
    vr::{NoHeadset, VrRuntime},
};

/// Average standing eye height; 3DOF headsets report poses relative to it.
pub const EYE_HEIGHT: f32 = 1.6;

pub const GPU_UNAVAILABLE_MESSAGE: &str =
    "No WebGPU/WebGL-capable graphics backend is available, the world cannot be rendered.";

const AMBIENT_COLOR: [f32; 3] = [0.25, 0.25, 0.25];
const SUN_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
const SUN_POSITION: [f32; 3] = [100.0, 100.0, 100.0];

const PLANE_SIZE: f32 = 100.0;
const PLANE_SEGMENTS: u32 = 10;

const MECH_MODEL_PATH: &str = "models/x12-mech/scene.gltf";
const MECH_POSITION: [f32; 3] = [-28.0, -EYE_HEIGHT, 0.0];

const CHARACTER_MODEL_PATH: &str = "models/yardbot/scene.gltf";
const CHARACTER_CLIP_PATH: &str = "animations/yardbot-idle.gltf";
const CHARACTER_POSITION: [f32; 3] = [15.0, -EYE_HEIGHT, -5.0];
// The character is exported at centimeter scale
const CHARACTER_SCALE: f32 = 0.02;

const ORBIT_ROTATE_SPEED: f32 = 0.005;
const ORBIT_ZOOM_SPEED: f32 = 0.25;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Desktop,
    Vr,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WorldOptions {
    pub mode: DisplayMode,
}

#[derive(Clone, Copy, Debug)]
enum ModelSlot {
    Mech,
    Character,
}

pub(crate) enum WorldEvent {
    /// The async half of initialization finished (wasm path).
    #[allow(dead_code)]
    Initialized(Box<WorldState>),
    ModelLoaded {
        slot: ModelSlot,
        result: anyhow::Result<Box<dyn SceneNode>>,
    },
    ClipsLoaded(anyhow::Result<Vec<ModelAnimation>>),
}

impl Debug for WorldEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::ModelLoaded { slot, result } => f
                .debug_struct("ModelLoaded")
                .field("slot", slot)
                .field("ok", &result.is_ok())
                .finish(),
            Self::ClipsLoaded(result) => f
                .debug_tuple("ClipsLoaded")
                .field(&result.is_ok())
                .finish(),
        }
    }
}

/// Everything that only exists once the GPU context is up.
pub(crate) struct WorldState {
    ctx: Context,
    scene: Scene,
    controls: Option<OrbitControls>,
    /// Active animation mixers, each bound to the scene index of the model
    /// it drives. Appended on asset-load completion, never pruned.
    mixers: Vec<(usize, Mixer)>,
    character: Option<usize>,
    is_surface_configured: bool,
}

impl WorldState {
    /// Build context and the synchronous part of the scene: lights, skybox
    /// background and ground plane, in that order. Models load later.
    async fn new(window: Arc<Window>, options: WorldOptions) -> anyhow::Result<Self> {
        let camera = Camera::new(
            (0.0, EYE_HEIGHT, 0.0),
            cgmath::Deg(-90.0),
            cgmath::Deg(0.0),
            MIN_ORBIT_DISTANCE,
        );
        let ambient = AmbientLight {
            color: AMBIENT_COLOR,
        };
        let sun = DirectionalLight {
            color: SUN_COLOR,
            position: SUN_POSITION.into(),
            target: [0.0, 0.0, 0.0].into(),
        };

        let ctx = Context::new(window, camera, &ambient, &sun).await?;

        let mut scene = Scene::new();
        scene.add(Box::new(LightNode::new(
            "ambient-light",
            Light::Ambient(ambient),
        )));
        scene.add(Box::new(LightNode::new("sun", Light::Directional(sun))));

        match load_skybox(&ctx.device, &ctx.queue).await {
            Ok(texture) => {
                let skybox = Skybox::new(
                    &ctx.device,
                    texture,
                    &skybox_bind_group_layout(&ctx.device),
                    &ctx.camera.camera,
                    &ctx.projection,
                );
                scene.set_background(skybox);
            }
            Err(e) => log::error!("could not load the skybox: {e:#}"),
        }

        let mut plane = ModelNode::from_model(
            "ground-plane",
            &ctx.device,
            ground_plane(&ctx.device, &ctx.queue, PLANE_SIZE, PLANE_SEGMENTS),
            Vec::new(),
        );
        plane.set_receive_shadow(true);
        plane.set_local_transform(Transform::from_position([0.0, -EYE_HEIGHT, 0.0].into()));
        scene.add(Box::new(plane));

        let controls = match options.mode {
            DisplayMode::Desktop => {
                Some(OrbitControls::new(ORBIT_ROTATE_SPEED, ORBIT_ZOOM_SPEED))
            }
            DisplayMode::Vr => None,
        };

        Ok(Self {
            ctx,
            scene,
            controls,
            mixers: Vec::new(),
            character: None,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.is_surface_configured = true;
            self.ctx.resize(width, height);
        }
    }

    /// Mark a loaded subtree as shadow-casting, place it, and append it to
    /// the scene graph. Returns the subtree's scene index.
    fn attach_model(&mut self, slot: ModelSlot, mut node: Box<dyn SceneNode>) -> usize {
        set_cast_shadow_all(node.as_mut(), true);
        let placement = match slot {
            ModelSlot::Mech => Transform::from_position(MECH_POSITION.into()),
            ModelSlot::Character => Transform {
                position: CHARACTER_POSITION.into(),
                rotation: cgmath::Quaternion::one(),
                scale: [CHARACTER_SCALE; 3].into(),
            },
        };
        node.set_local_transform(placement);
        log::info!("{} joined the scene", node.name());
        self.scene.add(node)
    }

    /// One frame: advance every mixer by the clock delta, refresh the GPU
    /// buffers, render the shadow pass and the main pass, present.
    fn render(&mut self, dt: Duration) -> Result<(), wgpu::CurrentSurfaceTexture> {
        // keep the redraw loop running
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        if let Some(controls) = &mut self.controls {
            controls.update(&mut self.ctx.camera.camera);
        }
        self.ctx.camera.upload(&self.ctx.queue, &self.ctx.projection);

        let dt = dt.as_secs_f32();
        for (target, mixer) in &mut self.mixers {
            mixer.advance(dt);
            if let Some(node) = self.scene.node_mut(*target) {
                mixer.apply(node);
            }
        }
        self.scene.update(&self.ctx.queue);
        if let Some(background) = &self.scene.background {
            background.upload(&self.ctx.queue, &self.ctx.camera.camera, &self.ctx.projection);
        }

        let output = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => texture,
            other => return Err(other),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.light.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            shadow_pass.set_pipeline(&self.ctx.pipelines.shadow);
            self.scene
                .root
                .draw_shadow(&self.ctx.light.bind_group, &mut shadow_pass);
        }
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.ctx.pipelines.mesh);
            render_pass.set_bind_group(3, &self.ctx.light.shadow_bind_group, &[]);
            self.scene.root.draw(
                &self.ctx.camera.bind_group,
                &self.ctx.light.bind_group,
                &mut render_pass,
            );

            // The background goes last: it only fills pixels still at the
            // far plane
            if let Some(background) = &self.scene.background {
                render_pass.set_pipeline(&self.ctx.pipelines.skybox);
                render_pass.set_bind_group(0, &background.bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct World {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<WorldEvent>,
    options: WorldOptions,
    state: Option<WorldState>,
    vr: Box<dyn VrRuntime>,
    last_time: Instant,
}

impl World {
    fn new(event_loop: &EventLoop<WorldEvent>, options: WorldOptions) -> Self {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new().expect("async runtime");
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            options,
            state: None,
            vr: Box::new(NoHeadset),
            last_time: Instant::now(),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.async_runtime.spawn(fut);
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn(&self, fut: impl Future<Output = ()> + 'static) {
        wasm_bindgen_futures::spawn_local(fut);
    }

    /// Kick off the fire-and-forget model loads. Their results arrive as
    /// user events on a later frame; until then the scene simply renders
    /// without them.
    fn spawn_model_loads(&self) {
        let Some(state) = &self.state else { return };
        // Device and queue are internally reference counted, the clones are
        // cheap handles into the load tasks
        let device = state.ctx.device.clone();
        let queue = state.ctx.queue.clone();
        let proxy = self.proxy.clone();
        self.spawn(async move {
            let result = load_model_gltf(MECH_MODEL_PATH, &device, &queue).await;
            let _ = proxy.send_event(WorldEvent::ModelLoaded {
                slot: ModelSlot::Mech,
                result,
            });
        });

        if self.options.mode == DisplayMode::Desktop {
            let device = state.ctx.device.clone();
            let queue = state.ctx.queue.clone();
            let proxy = self.proxy.clone();
            self.spawn(async move {
                let result = load_model_gltf(CHARACTER_MODEL_PATH, &device, &queue).await;
                let _ = proxy.send_event(WorldEvent::ModelLoaded {
                    slot: ModelSlot::Character,
                    result,
                });
            });
        }
    }

    /// The clip file only starts loading once the character model is in the
    /// scene, so the mixer binding requires both fetches to succeed in order.
    fn spawn_clip_load(&self) {
        let proxy = self.proxy.clone();
        self.spawn(async move {
            let result = load_animation_clips(CHARACTER_CLIP_PATH).await;
            let _ = proxy.send_event(WorldEvent::ClipsLoaded(result));
        });
    }

    fn toggle_vr_session(&mut self) {
        if self.vr.is_session_active() {
            self.vr.end_session();
            log::info!("VR session ended");
        } else if let Err(e) = self.vr.request_session() {
            log::error!("could not start a VR session: {e:#}");
        } else {
            log::info!("VR session started");
        }
    }
}

fn report_unavailable(err: &anyhow::Error) {
    log::error!("{GPU_UNAVAILABLE_MESSAGE} ({err:#})");
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            if let (Some(body), Ok(warning)) = (document.body(), document.create_element("p")) {
                warning.set_text_content(Some(GPU_UNAVAILABLE_MESSAGE));
                let _ = body.append_child(&warning);
            }
        }
    }
}

impl ApplicationHandler<WorldEvent> for World {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes();

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("window creation"),
        );
        let options = self.options;

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(WorldState::new(window, options)) {
                Ok(state) => {
                    self.state = Some(state);
                    self.spawn_model_loads();
                }
                Err(e) => {
                    report_unavailable(&e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match WorldState::new(window, options).await {
                    Ok(state) => {
                        assert!(
                            proxy
                                .send_event(WorldEvent::Initialized(Box::new(state)))
                                .is_ok()
                        );
                    }
                    Err(e) => report_unavailable(&e),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: WorldEvent) {
        match event {
            WorldEvent::Initialized(state) => {
                // This is the message from our wasm `spawn_local`
                self.state = Some(*state);
                let state = self.state.as_mut().unwrap();
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
                self.spawn_model_loads();
            }
            WorldEvent::ModelLoaded { slot, result } => {
                let mut character_arrived = false;
                if let Some(state) = &mut self.state {
                    match result {
                        Ok(node) => {
                            let index = state.attach_model(slot, node);
                            if let ModelSlot::Character = slot {
                                state.character = Some(index);
                                character_arrived = true;
                            }
                        }
                        Err(e) => log::error!("loading the {slot:?} model failed: {e:#}"),
                    }
                }
                if character_arrived {
                    self.spawn_clip_load();
                }
            }
            WorldEvent::ClipsLoaded(result) => {
                let Some(state) = &mut self.state else { return };
                match result {
                    Ok(clips) => match state.character {
                        Some(target) => state.mixers.push((target, Mixer::new(clips))),
                        None => log::warn!("animation clips arrived without a character"),
                    },
                    Err(e) => log::error!("loading the animation clips failed: {e:#}"),
                }
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else { return };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let Some(controls) = &mut state.controls {
                controls.handle_mouse(dx, dy);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else { return };

        if let Some(controls) = &mut state.controls {
            controls.handle_window_events(&event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Enter),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                // Stands in for the page's VR entry button
                if self.options.mode == DisplayMode::Vr {
                    self.toggle_vr_session();
                }
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                // During an active session the headset paces the frames
                if self.options.mode == DisplayMode::Vr && self.vr.is_session_active() {
                    self.vr.wait_frame();
                }

                match state.render(dt) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {:?}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Build the event loop and run one world in it until the window closes.
pub fn run(options: WorldOptions) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<WorldEvent> = EventLoop::with_user_event().build()?;
    let mut world = World::new(&event_loop, options);

    event_loop.run_app(&mut world)?;

    Ok(())
}

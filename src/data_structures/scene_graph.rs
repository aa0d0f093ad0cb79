//! Scene graph and hierarchical scene organization.
//!
//! The world composites a tree of [`SceneNode`]s rooted in a [`Scene`]:
//! light markers, the ground plane, and asynchronously loaded model
//! hierarchies. Nodes are appended during initialization and when asset
//! loads complete; they are never removed while the world is alive.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::{self, DrawModel},
        transform::Transform,
    },
    pipelines::{light::Light, skybox::Skybox},
    resources::animation::ModelAnimation,
};

pub trait SceneNode: Send {
    fn name(&self) -> &str;

    fn children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn local_transform(&self) -> Transform;

    fn set_local_transform(&mut self, transform: Transform);

    fn world_transform(&self) -> Transform;

    fn casts_shadow(&self) -> bool;

    fn set_cast_shadow(&mut self, cast: bool);

    /// Animation tracks bundled with this node when it was loaded.
    fn animations(&self) -> &[ModelAnimation];

    /// Write `pose` into the first node of this subtree whose name matches
    /// `target`. Returns whether a node accepted the pose.
    fn apply_track(&mut self, target: &str, pose: Transform) -> bool {
        if self.name() == target {
            self.set_local_transform(pose);
            return true;
        }
        self.children_mut()
            .iter_mut()
            .any(|child| child.apply_track(target, pose.clone()))
    }

    /// Recompute world transforms, parent before child.
    fn update_world_transforms(&mut self, parent: &Transform);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue);

    fn draw<'a, 'b>(
        &'a self,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'b mut wgpu::RenderPass<'a>,
    ) where
        'a: 'b;

    /// Depth-only pass from the light's point of view. Only nodes flagged as
    /// shadow casters emit geometry; children are visited regardless.
    fn draw_shadow<'a, 'b>(
        &'a self,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'b mut wgpu::RenderPass<'a>,
    ) where
        'a: 'b;
}

/// Flag a whole subtree as shadow-casting, the way loaded models are marked
/// after their fetch completes.
pub fn set_cast_shadow_all(node: &mut dyn SceneNode, cast: bool) {
    node.set_cast_shadow(cast);
    for child in node.children_mut() {
        set_cast_shadow_all(child.as_mut(), cast);
    }
}

/// A grouping node without GPU resources of its own.
pub struct ContainerNode {
    name: String,
    children: Vec<Box<dyn SceneNode>>,
    local: Transform,
    world: Transform,
    cast_shadow: bool,
    animations: Vec<ModelAnimation>,
}

impl ContainerNode {
    pub fn new(name: &str) -> Self {
        Self::with_animations(name, Vec::new())
    }

    pub fn with_animations(name: &str, animations: Vec<ModelAnimation>) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            local: Transform::default(),
            world: Transform::default(),
            cast_shadow: false,
            animations,
        }
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn local_transform(&self) -> Transform {
        self.local.clone()
    }

    fn set_local_transform(&mut self, transform: Transform) {
        self.local = transform;
    }

    fn world_transform(&self) -> Transform {
        self.world.clone()
    }

    fn casts_shadow(&self) -> bool {
        self.cast_shadow
    }

    fn set_cast_shadow(&mut self, cast: bool) {
        self.cast_shadow = cast;
    }

    fn animations(&self) -> &[ModelAnimation] {
        &self.animations
    }

    fn update_world_transforms(&mut self, parent: &Transform) {
        self.world = parent * &self.local;
        for child in &mut self.children {
            child.update_world_transforms(&self.world);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        for child in &mut self.children {
            child.write_to_buffers(queue);
        }
    }

    fn draw<'a, 'b>(
        &'a self,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'b mut wgpu::RenderPass<'a>,
    ) where
        'a: 'b,
    {
        for child in &self.children {
            child.draw(camera_bind_group, light_bind_group, render_pass);
        }
    }

    fn draw_shadow<'a, 'b>(
        &'a self,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'b mut wgpu::RenderPass<'a>,
    ) where
        'a: 'b,
    {
        for child in &self.children {
            child.draw_shadow(light_bind_group, render_pass);
        }
    }
}

/// A node with mesh geometry: a [`model::Model`] plus a single-entry
/// transform buffer holding its world matrix.
pub struct ModelNode {
    name: String,
    model: model::Model,
    transform_buffer: wgpu::Buffer,
    children: Vec<Box<dyn SceneNode>>,
    local: Transform,
    world: Transform,
    cast_shadow: bool,
    receives_shadow: bool,
    animations: Vec<ModelAnimation>,
}

impl ModelNode {
    pub fn from_model(
        name: &str,
        device: &wgpu::Device,
        model: model::Model,
        animations: Vec<ModelAnimation>,
    ) -> Self {
        let transform = Transform::default();
        let transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Transform Buffer"),
            contents: bytemuck::cast_slice(&[transform.to_raw(false)]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            name: name.to_string(),
            model,
            transform_buffer,
            children: Vec::new(),
            local: transform.clone(),
            world: transform,
            cast_shadow: false,
            receives_shadow: false,
            animations,
        }
    }

    pub fn set_receive_shadow(&mut self, receive: bool) {
        self.receives_shadow = receive;
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn local_transform(&self) -> Transform {
        self.local.clone()
    }

    fn set_local_transform(&mut self, transform: Transform) {
        self.local = transform;
    }

    fn world_transform(&self) -> Transform {
        self.world.clone()
    }

    fn casts_shadow(&self) -> bool {
        self.cast_shadow
    }

    fn set_cast_shadow(&mut self, cast: bool) {
        self.cast_shadow = cast;
    }

    fn animations(&self) -> &[ModelAnimation] {
        &self.animations
    }

    fn update_world_transforms(&mut self, parent: &Transform) {
        self.world = parent * &self.local;
        for child in &mut self.children {
            child.update_world_transforms(&self.world);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        queue.write_buffer(
            &self.transform_buffer,
            0,
            bytemuck::cast_slice(&[self.world.to_raw(self.receives_shadow)]),
        );
        for child in &mut self.children {
            child.write_to_buffers(queue);
        }
    }

    fn draw<'a, 'b>(
        &'a self,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'b mut wgpu::RenderPass<'a>,
    ) where
        'a: 'b,
    {
        render_pass.set_vertex_buffer(1, self.transform_buffer.slice(..));
        render_pass.draw_model_instanced(&self.model, 0..1, camera_bind_group, light_bind_group);
        for child in &self.children {
            child.draw(camera_bind_group, light_bind_group, render_pass);
        }
    }

    fn draw_shadow<'a, 'b>(
        &'a self,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'b mut wgpu::RenderPass<'a>,
    ) where
        'a: 'b,
    {
        if self.cast_shadow {
            render_pass.set_vertex_buffer(1, self.transform_buffer.slice(..));
            render_pass.draw_model_depth(&self.model, 0..1, light_bind_group);
        }
        for child in &self.children {
            child.draw_shadow(light_bind_group, render_pass);
        }
    }
}

/// A light marker in the scene graph. The actual illumination parameters are
/// uploaded once as the light uniform; the node records the light's presence
/// and placement in the scene tree.
pub struct LightNode {
    name: String,
    pub light: Light,
    children: Vec<Box<dyn SceneNode>>,
    local: Transform,
    world: Transform,
    animations: Vec<ModelAnimation>,
}

impl LightNode {
    pub fn new(name: &str, light: Light) -> Self {
        let local = match &light {
            Light::Directional(directional) => Transform::from_position(directional.position),
            Light::Ambient(_) => Transform::default(),
        };
        Self {
            name: name.to_string(),
            light,
            children: Vec::new(),
            local: local.clone(),
            world: local,
            animations: Vec::new(),
        }
    }
}

impl SceneNode for LightNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn local_transform(&self) -> Transform {
        self.local.clone()
    }

    fn set_local_transform(&mut self, transform: Transform) {
        self.local = transform;
    }

    fn world_transform(&self) -> Transform {
        self.world.clone()
    }

    fn casts_shadow(&self) -> bool {
        false
    }

    fn set_cast_shadow(&mut self, _cast: bool) {}

    fn animations(&self) -> &[ModelAnimation] {
        &self.animations
    }

    fn update_world_transforms(&mut self, parent: &Transform) {
        self.world = parent * &self.local;
        for child in &mut self.children {
            child.update_world_transforms(&self.world);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        for child in &mut self.children {
            child.write_to_buffers(queue);
        }
    }

    fn draw<'a, 'b>(
        &'a self,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'b mut wgpu::RenderPass<'a>,
    ) where
        'a: 'b,
    {
        for child in &self.children {
            child.draw(camera_bind_group, light_bind_group, render_pass);
        }
    }

    fn draw_shadow<'a, 'b>(
        &'a self,
        light_bind_group: &'a wgpu::BindGroup,
        render_pass: &'b mut wgpu::RenderPass<'a>,
    ) where
        'a: 'b,
    {
        for child in &self.children {
            child.draw_shadow(light_bind_group, render_pass);
        }
    }
}

/// The scene: the node tree plus the optional skybox background.
pub struct Scene {
    pub root: ContainerNode,
    pub background: Option<Skybox>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: ContainerNode::new("scene"),
            background: None,
        }
    }

    /// Append a node to the scene. The returned index stays valid for the
    /// scene's lifetime since nodes are never removed.
    pub fn add(&mut self, node: Box<dyn SceneNode>) -> usize {
        self.root.add_child(node);
        self.root.children().len() - 1
    }

    pub fn set_background(&mut self, skybox: Skybox) {
        self.background = Some(skybox);
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut (dyn SceneNode + 'static)> {
        self.root
            .children_mut()
            .get_mut(index)
            .map(|node| node.as_mut())
    }

    /// Recompute world transforms and upload them.
    pub fn update(&mut self, queue: &wgpu::Queue) {
        self.root.update_world_transforms(&Transform::default());
        self.root.write_to_buffers(queue);
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

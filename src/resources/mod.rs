use std::io::{BufReader, Cursor};

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model,
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::{CubeTexture, Texture},
        transform::Transform,
    },
    resources::{
        animation::{AnimationClip, Keyframes, ModelAnimation, merge},
        texture::{diffuse_normal_layout, load_binary, load_texture},
    },
};

/**
 * This module contains all logic for loading models/clips/textures/skyboxes
 * from external files.
 */
pub mod animation;
pub mod texture;

/// Skybox face files in cube-map layer order (+x, -x, +y, -y, +z, -z).
pub const SKYBOX_FACES: [&str; 6] = [
    "skybox/sh_ft.png",
    "skybox/sh_bk.png",
    "skybox/sh_up.png",
    "skybox/sh_dn.png",
    "skybox/sh_rt.png",
    "skybox/sh_lf.png",
];

/// Fetch and decode all six skybox faces and upload them as one cube texture.
pub async fn load_skybox(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<CubeTexture> {
    let face_data =
        futures::future::join_all(SKYBOX_FACES.iter().map(|face| load_binary(face))).await;
    let mut faces = Vec::with_capacity(6);
    for (path, data) in SKYBOX_FACES.iter().zip(face_data) {
        let bytes = data?;
        faces.push(
            image::load_from_memory(&bytes)
                .map_err(|e| anyhow::anyhow!("could not decode skybox face {path}: {e}"))?,
        );
    }
    let faces: [image::DynamicImage; 6] = faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected six skybox faces"))?;
    CubeTexture::from_faces(device, queue, &faces, "skybox")
}

/// Stable label for a glTF node, used to match animation channels to nodes
/// across files.
fn node_label(node: &gltf::scene::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node-{}", node.index()))
}

/// Resolve a URI referenced by a glTF file against the file's directory.
fn relative_path(file_name: &str, uri: &str) -> String {
    match std::path::Path::new(file_name).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join(uri).to_string_lossy().into_owned()
        }
        _ => uri.to_string(),
    }
}

async fn load_gltf_buffers(
    file_name: &str,
    gltf: &gltf::Gltf,
) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.push(blob.into());
                };
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(&relative_path(file_name, uri)).await?;
                buffer_data.push(bin);
            }
        }
    }
    Ok(buffer_data)
}

/// Pull every animation channel out of a glTF document, keyed to its target
/// node by name.
fn read_animation_clips(gltf: &gltf::Gltf, buffer_data: &[Vec<u8>]) -> Vec<AnimationClip> {
    let mut clips = Vec::new();
    for animation in gltf.animations() {
        for channel in animation.channels() {
            let reader = channel.reader(|buffer| Some(&buffer_data[buffer.index()]));
            let timestamps = match reader.read_inputs() {
                Some(gltf::accessor::Iter::Standard(times)) => times.collect(),
                Some(gltf::accessor::Iter::Sparse(_)) => {
                    log::warn!("sparse animation inputs are not supported, skipping channel");
                    Vec::new()
                }
                None => {
                    log::warn!("no inputs in animation channel {}", channel.index());
                    Vec::new()
                }
            };
            let keyframes = match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
                    Keyframes::Translation(translations.map(|tr| tr.into()).collect())
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => {
                    Keyframes::Rotation(rotations.into_f32().map(|quat| quat.into()).collect())
                }
                Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
                    Keyframes::Scale(scales.map(|sc| sc.into()).collect())
                }
                Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) | None => {
                    Keyframes::Other
                }
            };
            clips.push(AnimationClip {
                name: animation.name().unwrap_or("Default").to_string(),
                target: node_label(&channel.target().node()),
                keyframes,
                timestamps,
            });
        }
    }
    clips
}

async fn load_gltf_materials(
    file_name: &str,
    gltf: &gltf::Gltf,
    buffer_data: &[Vec<u8>],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Vec<model::Material>> {
    let layout = diffuse_normal_layout(device);
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let diffuse_texture = match pbr.base_color_texture() {
            Some(tex) => match tex.texture().source().source() {
                gltf::image::Source::View { view, mime_type } => Texture::from_bytes(
                    device,
                    queue,
                    &buffer_data[view.buffer().index()]
                        [view.offset()..view.offset() + view.length()],
                    file_name,
                    mime_type.split('/').last(),
                    false,
                )?,
                gltf::image::Source::Uri { uri, mime_type } => {
                    load_texture(
                        &relative_path(file_name, uri),
                        false,
                        device,
                        queue,
                        mime_type.and_then(|mt| mt.split('/').last()),
                    )
                    .await?
                }
            },
            // Untextured material, bake the base color factor into one texel
            None => {
                let factor = pbr.base_color_factor();
                let color = factor.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8);
                Texture::from_color(color, device, queue)
            }
        };
        let normal_texture = match material.normal_texture() {
            Some(texture) => match texture.texture().source().source() {
                gltf::image::Source::View { view, mime_type } => Texture::from_bytes(
                    device,
                    queue,
                    &buffer_data[view.buffer().index()]
                        [view.offset()..view.offset() + view.length()],
                    file_name,
                    mime_type.split('/').last(),
                    true,
                )?,
                gltf::image::Source::Uri { uri, mime_type } => {
                    load_texture(
                        &relative_path(file_name, uri),
                        true,
                        device,
                        queue,
                        mime_type.and_then(|mt| mt.split('/').last()),
                    )
                    .await?
                }
            },
            None => Texture::create_default_normal_map(2, 2, device, queue),
        };
        materials.push(model::Material::new(
            device,
            material.name().unwrap_or(file_name),
            diffuse_texture,
            normal_texture,
            &layout,
        ));
    }
    if materials.is_empty() {
        materials.push(model::Material::new(
            device,
            file_name,
            Texture::from_color([255, 255, 255, 255], device, queue),
            Texture::create_default_normal_map(2, 2, device, queue),
            &layout,
        ));
    }
    Ok(materials)
}

fn to_scene_node(
    node: gltf::scene::Node,
    buf: &[Vec<u8>],
    device: &wgpu::Device,
    mats: &Vec<model::Material>,
) -> Box<dyn SceneNode> {
    let label = node_label(&node);
    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let mut meshes = Vec::new();

            mesh.primitives().for_each(|primitive| {
                let reader = primitive.reader(|buffer| Some(&buf[buffer.index()]));

                let mut vertices = Vec::new();
                if let Some(vertex_attribute) = reader.read_positions() {
                    vertex_attribute.for_each(|vertex| {
                        vertices.push(model::ModelVertex {
                            position: vertex,
                            tex_coords: Default::default(),
                            normal: Default::default(),
                            tangent: Default::default(),
                            bitangent: Default::default(),
                        })
                    });
                }
                if let Some(normal_attribute) = reader.read_normals() {
                    for (i, normal) in normal_attribute.enumerate() {
                        vertices[i].normal = normal;
                    }
                }
                if let Some(tex_coord_attribute) = reader.read_tex_coords(0).map(|v| v.into_f32())
                {
                    for (i, tex_coord) in tex_coord_attribute.enumerate() {
                        vertices[i].tex_coords = tex_coord;
                    }
                }
                if let Some(tangent_attribute) = reader.read_tangents() {
                    for (i, tangent) in tangent_attribute.enumerate() {
                        // glTF stores tangents as vec4 where the 4th component
                        // gives the bitangent's handedness
                        let tangent: cgmath::Vector4<f32> = tangent.into();
                        vertices[i].tangent = tangent.truncate().into();
                        let normal: cgmath::Vector3<f32> = vertices[i].normal.into();
                        let bitangent = normal.cross(tangent.truncate()) * tangent[3];
                        vertices[i].bitangent = bitangent.into();
                    }
                };

                let mut indices = Vec::new();
                if let Some(indices_raw) = reader.read_indices() {
                    indices.append(&mut indices_raw.into_u32().collect::<Vec<u32>>());
                }

                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Vertex Buffer", mesh.name())),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Index Buffer", mesh.name())),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                });

                meshes.push(model::Mesh {
                    name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                    vertex_buffer,
                    index_buffer,
                    num_elements: indices.len() as u32,
                    material: primitive.material().index().unwrap_or(0),
                });
            });

            let model = model::Model {
                meshes,
                materials: mats.clone(),
            };
            Box::new(ModelNode::from_model(&label, device, model, Vec::new()))
        }
        None => Box::new(ContainerNode::new(&label)),
    };

    let decomposed = node.transform().decomposed();
    scene_node.set_local_transform(Transform {
        position: decomposed.0.into(),
        rotation: decomposed.1.into(),
        scale: decomposed.2.into(),
    });
    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buf, device, mats));
    }

    scene_node
}

/// Load a glTF file into a scene subtree. Animations found in the file are
/// merged and attached to the returned root node.
pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let gltf_text = load_binary(file_name).await?;
    let gltf_cursor = Cursor::new(gltf_text);
    let gltf_reader = BufReader::new(gltf_cursor);
    let gltf = gltf::Gltf::from_reader(gltf_reader)?;

    let buffer_data = load_gltf_buffers(file_name, &gltf).await?;
    let animations = merge(read_animation_clips(&gltf, &buffer_data));
    let materials = load_gltf_materials(file_name, &gltf, &buffer_data, device, queue).await?;

    let root_label = std::path::Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let mut root = ContainerNode::with_animations(&root_label, animations);
    for scene in gltf.scenes() {
        for node in scene.nodes() {
            root.add_child(to_scene_node(node, &buffer_data, device, &materials));
        }
    }

    Ok(Box::new(root))
}

/// Load only the animation tracks of a glTF file, for clip files that are
/// shipped separately from the mesh they animate.
pub async fn load_animation_clips(file_name: &str) -> anyhow::Result<Vec<ModelAnimation>> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_reader(BufReader::new(Cursor::new(bytes)))?;
    let buffer_data = load_gltf_buffers(file_name, &gltf).await?;
    let animations = merge(read_animation_clips(&gltf, &buffer_data));
    if animations.is_empty() {
        anyhow::bail!("{file_name} contains no animations");
    }
    Ok(animations)
}

/// Build the ground plane: a subdivided quad in the xz plane with a plain
/// white material, receiving but not casting shadows.
pub fn ground_plane(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    size: f32,
    segments: u32,
) -> model::Model {
    let step = size / segments as f32;
    let half = size / 2.0;
    let side = segments + 1;

    let mut vertices = Vec::with_capacity((side * side) as usize);
    for z in 0..side {
        for x in 0..side {
            vertices.push(model::ModelVertex {
                position: [x as f32 * step - half, 0.0, z as f32 * step - half],
                tex_coords: [x as f32 / segments as f32, z as f32 / segments as f32],
                normal: [0.0, 1.0, 0.0],
                tangent: [1.0, 0.0, 0.0],
                bitangent: [0.0, 0.0, 1.0],
            });
        }
    }

    let mut indices: Vec<u32> = Vec::with_capacity((segments * segments * 6) as usize);
    for z in 0..segments {
        for x in 0..segments {
            let i00 = z * side + x;
            let i10 = i00 + 1;
            let i01 = i00 + side;
            let i11 = i01 + 1;
            // Counter-clockwise seen from above
            indices.extend_from_slice(&[i00, i01, i11, i00, i11, i10]);
        }
    }

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Ground Plane Vertex Buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Ground Plane Index Buffer"),
        contents: bytemuck::cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    let material = model::Material::new(
        device,
        "ground",
        Texture::from_color([255, 255, 255, 255], device, queue),
        Texture::create_default_normal_map(2, 2, device, queue),
        &diffuse_normal_layout(device),
    );

    model::Model {
        meshes: vec![model::Mesh {
            name: "ground".to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material: 0,
        }],
        materials: vec![material],
    }
}

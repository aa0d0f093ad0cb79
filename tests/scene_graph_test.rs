use cgmath::{Deg, One, Quaternion, Rotation3};
use hangar::{
    data_structures::{
        scene_graph::{ContainerNode, LightNode, Scene, SceneNode, set_cast_shadow_all},
        transform::Transform,
    },
    pipelines::light::{AmbientLight, DirectionalLight, Light},
};

use crate::common::test_utils::assert_vec_approx;

mod common;

fn ambient() -> LightNode {
    LightNode::new(
        "ambient-light",
        Light::Ambient(AmbientLight {
            color: [0.25, 0.25, 0.25],
        }),
    )
}

fn sun() -> LightNode {
    LightNode::new(
        "sun",
        Light::Directional(DirectionalLight {
            color: [1.0, 1.0, 1.0],
            position: [100.0, 100.0, 100.0].into(),
            target: [0.0, 0.0, 0.0].into(),
        }),
    )
}

#[test]
fn synchronous_setup_precedes_async_model_arrivals() {
    let mut scene = Scene::new();
    scene.add(Box::new(ambient()));
    scene.add(Box::new(sun()));
    scene.add(Box::new(ContainerNode::new("ground-plane")));

    // A model load completing on some later frame appends behind everything
    // the initialization added.
    let mech_index = scene.add(Box::new(ContainerNode::new("x12-mech")));

    let names: Vec<_> = scene
        .root
        .children()
        .iter()
        .map(|node| node.name().to_string())
        .collect();
    assert_eq!(names, vec!["ambient-light", "sun", "ground-plane", "x12-mech"]);
    assert_eq!(mech_index, 3);
    assert_eq!(scene.node_mut(mech_index).unwrap().name(), "x12-mech");
}

#[test]
fn scene_indices_stay_valid_as_the_graph_grows() {
    let mut scene = Scene::new();
    let first = scene.add(Box::new(ContainerNode::new("first")));
    let second = scene.add(Box::new(ContainerNode::new("second")));

    assert_eq!(scene.node_mut(first).unwrap().name(), "first");
    assert_eq!(scene.node_mut(second).unwrap().name(), "second");
}

#[test]
fn cast_shadow_flag_covers_the_whole_subtree() {
    let mut root = ContainerNode::new("mech");
    let mut torso = ContainerNode::new("torso");
    torso.add_child(Box::new(ContainerNode::new("arm")));
    root.add_child(Box::new(torso));

    set_cast_shadow_all(&mut root, true);

    assert!(root.casts_shadow());
    let torso = &root.children()[0];
    assert!(torso.casts_shadow());
    assert!(torso.children()[0].casts_shadow());
}

#[test]
fn world_transforms_compose_parent_before_child() {
    let mut root = ContainerNode::new("root");
    root.set_local_transform(Transform {
        position: [1.0, 0.0, 0.0].into(),
        rotation: Quaternion::one(),
        scale: [2.0, 2.0, 2.0].into(),
    });
    let mut child = ContainerNode::new("child");
    child.set_local_transform(Transform::from_position([1.0, 0.0, 0.0].into()));
    root.add_child(Box::new(child));

    root.update_world_transforms(&Transform::default());

    // The child's offset is scaled by the parent before translation
    let child_world = root.children()[0].world_transform();
    assert_vec_approx(child_world.position, [3.0, 0.0, 0.0]);
    assert_vec_approx(child_world.scale, [2.0, 2.0, 2.0]);
}

#[test]
fn parent_rotation_swings_child_positions() {
    let mut root = ContainerNode::new("root");
    root.set_local_transform(Transform {
        position: [0.0, 0.0, 0.0].into(),
        rotation: Quaternion::from_angle_y(Deg(90.0)),
        scale: [1.0, 1.0, 1.0].into(),
    });
    let mut child = ContainerNode::new("child");
    child.set_local_transform(Transform::from_position([1.0, 0.0, 0.0].into()));
    root.add_child(Box::new(child));

    root.update_world_transforms(&Transform::default());

    // +x rotated 90 degrees around y lands on -z
    assert_vec_approx(
        root.children()[0].world_transform().position,
        [0.0, 0.0, -1.0],
    );
}

#[test]
fn light_nodes_sit_at_their_light_position() {
    let mut sun = sun();
    sun.update_world_transforms(&Transform::default());
    assert_vec_approx(sun.world_transform().position, [100.0, 100.0, 100.0]);

    let mut ambient = ambient();
    ambient.update_world_transforms(&Transform::default());
    assert_vec_approx(ambient.world_transform().position, [0.0, 0.0, 0.0]);
}

use hangar::{
    data_structures::scene_graph::{ContainerNode, SceneNode},
    resources::animation::{Mixer, merge},
};

use crate::common::test_utils::{
    assert_approx, assert_vec_approx, rotation_clip, scale_clip, translation_clip,
};

mod common;

#[test]
fn merge_folds_channels_of_one_node_into_one_track() {
    let clips = vec![
        translation_clip(
            "walk",
            "Hips",
            vec![0.0, 1.0],
            vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
        ),
        rotation_clip(
            "walk",
            "Hips",
            vec![0.0, 1.0],
            vec![[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]],
        ),
        scale_clip(
            "walk",
            "Hips",
            vec![0.0, 1.0],
            vec![[1.0, 1.0, 1.0], [2.0, 2.0, 2.0]],
        ),
    ];

    let merged = merge(clips);
    assert_eq!(merged.len(), 1);
    let track = &merged[0];
    assert_eq!(track.name, "walk");
    assert_eq!(track.target, "Hips");
    assert_eq!(track.timestamps, vec![0.0, 1.0]);
    assert_eq!(track.transforms.len(), 2);
    assert_vec_approx(track.transforms[1].position, [2.0, 0.0, 0.0]);
    assert_vec_approx(track.transforms[1].scale, [2.0, 2.0, 2.0]);
}

#[test]
fn merge_keeps_animations_and_targets_apart() {
    let clips = vec![
        translation_clip("walk", "Hips", vec![0.0], vec![[1.0, 0.0, 0.0]]),
        translation_clip("walk", "Spine", vec![0.0], vec![[0.0, 1.0, 0.0]]),
        translation_clip("run", "Hips", vec![0.0], vec![[0.0, 0.0, 1.0]]),
    ];

    let merged = merge(clips);
    assert_eq!(merged.len(), 3);
    let names: Vec<_> = merged
        .iter()
        .map(|track| (track.name.as_str(), track.target.as_str()))
        .collect();
    assert_eq!(names, vec![("walk", "Hips"), ("walk", "Spine"), ("run", "Hips")]);
}

#[test]
fn merge_pads_missing_components_with_defaults() {
    // Only a translation channel: rotation and scale must fall back to the
    // identity instead of zeroing the node out.
    let clips = vec![translation_clip(
        "slide",
        "Crate",
        vec![0.0, 1.0],
        vec![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]],
    )];

    let merged = merge(clips);
    let track = &merged[0];
    assert_vec_approx(track.transforms[0].scale, [1.0, 1.0, 1.0]);
    let rot = track.transforms[0].rotation;
    assert_approx(rot.s, 1.0);
    assert_vec_approx(rot.v, [0.0, 0.0, 0.0]);
}

#[test]
fn sample_clamps_at_the_track_ends_and_interpolates_between() {
    let merged = merge(vec![translation_clip(
        "walk",
        "Hips",
        vec![0.0, 1.0, 2.0],
        vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [20.0, 0.0, 0.0]],
    )]);
    let track = &merged[0];

    assert_vec_approx(track.sample(-1.0).unwrap().position, [0.0, 0.0, 0.0]);
    assert_vec_approx(track.sample(0.5).unwrap().position, [5.0, 0.0, 0.0]);
    assert_vec_approx(track.sample(1.75).unwrap().position, [17.5, 0.0, 0.0]);
    assert_vec_approx(track.sample(99.0).unwrap().position, [20.0, 0.0, 0.0]);
}

#[test]
fn mixer_wraps_its_clock_over_the_clip_duration() {
    let merged = merge(vec![translation_clip(
        "walk",
        "Hips",
        vec![0.0, 2.0],
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
    )]);
    let mut mixer = Mixer::new(merged);

    mixer.advance(1.5);
    assert_approx(mixer.time(), 1.5);
    mixer.advance(1.0);
    assert_approx(mixer.time(), 0.5);
}

#[test]
fn mixer_writes_sampled_poses_into_matching_nodes() {
    let mut root = ContainerNode::new("character");
    root.add_child(Box::new(ContainerNode::new("Hips")));

    let merged = merge(vec![translation_clip(
        "walk",
        "Hips",
        vec![0.0, 1.0],
        vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]],
    )]);
    let mut mixer = Mixer::new(merged);

    mixer.advance(0.5);
    mixer.apply(&mut root);

    let hips = &root.children()[0];
    assert_vec_approx(hips.local_transform().position, [2.0, 0.0, 0.0]);
    // The untargeted root keeps its own transform
    assert_vec_approx(root.local_transform().position, [0.0, 0.0, 0.0]);
}

#[test]
fn loaded_roots_carry_their_animation_tracks() {
    let merged = merge(vec![translation_clip(
        "walk",
        "Hips",
        vec![0.0, 1.0],
        vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]],
    )]);
    let root = ContainerNode::with_animations("character", merged);

    assert_eq!(root.animations().len(), 1);
    assert_eq!(root.animations()[0].name, "walk");
    // Plain grouping nodes carry no tracks of their own
    assert!(ContainerNode::new("empty").animations().is_empty());
}

#[test]
fn mixer_without_matching_node_leaves_the_tree_alone() {
    let mut root = ContainerNode::new("character");
    root.add_child(Box::new(ContainerNode::new("Hips")));

    let merged = merge(vec![translation_clip(
        "walk",
        "UnknownBone",
        vec![0.0, 1.0],
        vec![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]],
    )]);
    let mut mixer = Mixer::new(merged);
    mixer.advance(0.5);
    mixer.apply(&mut root);

    assert_vec_approx(root.children()[0].local_transform().position, [0.0, 0.0, 0.0]);
}

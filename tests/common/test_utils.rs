use hangar::resources::animation::{AnimationClip, Keyframes};

pub fn translation_clip(
    name: &str,
    target: &str,
    timestamps: Vec<f32>,
    positions: Vec<[f32; 3]>,
) -> AnimationClip {
    AnimationClip {
        name: name.to_string(),
        target: target.to_string(),
        keyframes: Keyframes::Translation(positions.into_iter().map(Into::into).collect()),
        timestamps,
    }
}

pub fn rotation_clip(
    name: &str,
    target: &str,
    timestamps: Vec<f32>,
    rotations: Vec<[f32; 4]>,
) -> AnimationClip {
    AnimationClip {
        name: name.to_string(),
        target: target.to_string(),
        keyframes: Keyframes::Rotation(
            rotations
                .into_iter()
                // [x, y, z, w] as glTF delivers them
                .map(|q| cgmath::Quaternion::new(q[3], q[0], q[1], q[2]))
                .collect(),
        ),
        timestamps,
    }
}

pub fn scale_clip(
    name: &str,
    target: &str,
    timestamps: Vec<f32>,
    scales: Vec<[f32; 3]>,
) -> AnimationClip {
    AnimationClip {
        name: name.to_string(),
        target: target.to_string(),
        keyframes: Keyframes::Scale(scales.into_iter().map(Into::into).collect()),
        timestamps,
    }
}

pub fn assert_approx(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

pub fn assert_vec_approx(actual: cgmath::Vector3<f32>, expected: [f32; 3]) {
    for (a, e) in [actual.x, actual.y, actual.z].into_iter().zip(expected) {
        assert!(
            (a - e).abs() < 1e-4,
            "expected {expected:?}, got {actual:?}"
        );
    }
}

use cgmath::{Deg, Rad};
use hangar::{
    camera::{
        Camera, FOVY, MAX_ORBIT_DISTANCE, MIN_ORBIT_DISTANCE, OrbitControls, Projection, ZFAR,
        ZNEAR,
    },
    world::EYE_HEIGHT,
};

use crate::common::test_utils::assert_approx;

mod common;

fn default_camera() -> Camera {
    Camera::new(
        (0.0, EYE_HEIGHT, 0.0),
        Deg(-90.0),
        Deg(0.0),
        MIN_ORBIT_DISTANCE,
    )
}

#[test]
fn resize_tracks_the_viewport_aspect_ratio() {
    let mut projection = Projection::new(1280, 720, FOVY, ZNEAR, ZFAR);
    assert_approx(projection.aspect, 1280.0 / 720.0);

    projection.resize(800, 600);
    assert_approx(projection.aspect, 800.0 / 600.0);

    // Arbitrary repetition must be idempotent
    projection.resize(800, 600);
    assert_approx(projection.aspect, 800.0 / 600.0);
}

#[test]
fn default_framing_stands_at_eye_height_looking_forward() {
    let camera = default_camera();
    let position = camera.position();

    assert_approx(position.x, 0.0);
    assert_approx(position.y, EYE_HEIGHT);
    // yaw -90 degrees puts the eye just behind the target on -z
    assert_approx(position.z, -MIN_ORBIT_DISTANCE);
}

#[test]
fn orbit_distance_is_clamped_on_construction() {
    let too_close = Camera::new((0.0, 0.0, 0.0), Deg(0.0), Deg(0.0), 0.0);
    assert_approx(too_close.distance, MIN_ORBIT_DISTANCE);

    let too_far = Camera::new((0.0, 0.0, 0.0), Deg(0.0), Deg(0.0), 1.0e6);
    assert_approx(too_far.distance, MAX_ORBIT_DISTANCE);
}

#[test]
fn controls_keep_the_pitch_clear_of_the_poles() {
    let mut camera = default_camera();
    camera.pitch = Rad(10.0);

    let mut controls = OrbitControls::new(0.005, 0.25);
    controls.update(&mut camera);

    assert!(camera.pitch.0 < std::f32::consts::FRAC_PI_2);
    assert!(camera.pitch.0 > -std::f32::consts::FRAC_PI_2);

    camera.pitch = Rad(-10.0);
    controls.update(&mut camera);
    assert!(camera.pitch.0 > -std::f32::consts::FRAC_PI_2);
}

#[test]
fn rotation_only_view_has_no_translation() {
    let camera = default_camera();
    let rotation = camera.rotation_matrix();

    assert_approx(rotation.w.x, 0.0);
    assert_approx(rotation.w.y, 0.0);
    assert_approx(rotation.w.z, 0.0);
    assert_approx(rotation.w.w, 1.0);
}

#[test]
fn view_matrix_moves_the_target_onto_the_view_axis() {
    use cgmath::{Point3, Transform as _};

    let camera = Camera::new((0.0, EYE_HEIGHT, 0.0), Deg(-90.0), Deg(0.0), 2.0);
    let target_in_view = camera
        .calc_matrix()
        .transform_point(Point3::new(0.0, EYE_HEIGHT, 0.0));

    // Looking straight at the target: it sits on the -z view axis at orbit
    // distance
    assert_approx(target_in_view.x, 0.0);
    assert_approx(target_in_view.y, 0.0);
    assert_approx(target_in_view.z, -2.0);
}

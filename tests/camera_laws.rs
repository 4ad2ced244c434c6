use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Mat4, Vec2, Vec3};
use meshlet_passes::camera::{BoundingBox, Camera, CameraInput, Directions};
use meshlet_passes::settings::CameraSettings;

const EPSILON: f32 = 1e-4;

fn sample_cameras() -> Vec<Camera> {
    vec![
        Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO),
        Camera::new(Vec3::new(5.0, 2.0, -1.0), Vec3::new(0.0, 1.0, 0.0)),
        Camera::new(Vec3::new(-10.0, 0.5, 10.0), Vec3::new(3.0, -2.0, 4.0)),
    ]
}

fn assert_views_eq(a: Mat4, b: Mat4) {
    assert!(a.abs_diff_eq(b, EPSILON), "views differ:\n{a}\n{b}");
}

#[test]
fn rotate_then_inverse_rotation_restores_view() {
    for (yaw, pitch, roll) in [(0.7, 0.0, 0.0), (0.0, -1.2, 0.0), (0.3, 0.4, 0.5), (-2.0, 1.5, -0.1)] {
        for mut camera in sample_cameras() {
            let before = camera.view_matrix();
            camera.rotate(yaw, pitch, roll);
            // undo Rx(pitch) * Ry(yaw) * Rz(roll) in reverse order
            camera.rotate(0.0, 0.0, -roll);
            camera.rotate(-yaw, 0.0, 0.0);
            camera.rotate(0.0, -pitch, 0.0);
            assert_views_eq(camera.view_matrix(), before);
        }
    }
}

#[test]
fn translate_round_trip_is_identity() {
    for d in [Vec3::new(1.0, 2.0, 3.0), Vec3::new(-0.25, 0.0, 7.5), Vec3::ZERO] {
        for mut camera in sample_cameras() {
            let before = camera.view_matrix();
            camera.translate(d.x, d.y, d.z);
            camera.translate(-d.x, -d.y, -d.z);
            assert_views_eq(camera.view_matrix(), before);
        }
    }
}

#[test]
fn update_keeps_yaw_and_pitch_in_range_for_extreme_input() {
    let settings = CameraSettings::default();
    for mouse in [
        Vec2::new(100.0, 100.0),
        Vec2::new(-100.0, -100.0),
        Vec2::new(1e6, -1e6),
        Vec2::new(f32::MAX, f32::MIN),
        Vec2::new(-1e-7, 1e-7),
    ] {
        let mut camera = Camera::default();
        let input = CameraInput {
            directions: Directions::empty(),
            mouse,
        };
        let motion = camera.update(1.0, &input, &settings);
        assert!((0.0..TAU).contains(&motion.yaw), "yaw {} for {mouse}", motion.yaw);
        assert!(
            (-FRAC_PI_2..=FRAC_PI_2).contains(&motion.pitch),
            "pitch {} for {mouse}",
            motion.pitch
        );
    }
}

#[test]
fn yaw_of_100_radians_wraps() {
    let mut camera = Camera::default();
    let input = CameraInput {
        directions: Directions::empty(),
        mouse: Vec2::new(100.0, 0.0),
    };
    let motion = camera.update(1.0, &input, &CameraSettings::default());
    assert!((motion.yaw - 100f32.rem_euclid(TAU)).abs() < EPSILON);
}

#[test]
fn focus_bounding_box_frames_unit_box() {
    let fov = 60f32.to_radians();
    let bbox = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    let mut camera = Camera::new(Vec3::new(4.0, 5.0, 6.0), Vec3::X);

    camera.focus_bounding_box(&bbox, fov);

    let distance = 1.0 / 30f32.to_radians().tan() + 1.0;
    assert!(camera
        .position()
        .abs_diff_eq(Vec3::new(0.0, 0.0, distance), EPSILON));

    // the target sits straight ahead on the view axis
    let target_in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
    assert!(target_in_view.abs_diff_eq(Vec3::new(0.0, 0.0, -distance), EPSILON));
}

#[test]
fn focused_box_corners_project_inside_vertical_frustum() {
    let settings = CameraSettings::default();
    let bbox = BoundingBox::new(Vec3::new(-1.0, -2.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
    let mut camera = Camera::default();
    camera.focus_bounding_box(&bbox, settings.fov_y_radians());

    let view_proj = camera.view_proj(&settings, 1.0);
    for corner in [bbox.min, bbox.max, Vec3::new(1.0, 2.0, 1.0), Vec3::new(-1.0, -2.0, 1.0)] {
        let clip = view_proj * corner.extend(1.0);
        let ndc_y = clip.y / clip.w;
        assert!(ndc_y.abs() <= 1.0 + EPSILON, "corner {corner} at ndc y {ndc_y}");
    }
}

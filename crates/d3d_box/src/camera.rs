//! An orbit camera around the origin. Dragging with the left button rotates,
//! dragging with the right button zooms.

use std::f32::consts::FRAC_PI_4;
use std::f32::consts::PI;

use bevy_math::Mat4;
use bevy_math::Vec3;
use d3d_application::device::Extent;

const MIN_RADIUS: f32 = 3.0;
const MAX_RADIUS: f32 = 15.0;
/// Radians per second the camera drifts around the box when left alone.
const IDLE_SPIN: f32 = 0.1;

pub struct OrbitCamera {
    theta: f32,
    phi: f32,
    radius: f32,
    last_mouse: (i32, i32),
    dragging: bool,
    projection: Mat4,
    view: Mat4,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            theta: 1.5 * PI,
            phi: FRAC_PI_4,
            radius: 5.0,
            last_mouse: (0, 0),
            dragging: false,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        Vec3::new(
            self.radius * self.phi.sin() * self.theta.cos(),
            self.radius * self.phi.cos(),
            self.radius * self.phi.sin() * self.theta.sin(),
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// `dx` and `dy` in pixels; a quarter degree per pixel.
    pub fn rotate(&mut self, dx: i32, dy: i32) {
        self.theta += (0.25 * dx as f32).to_radians();
        self.phi = (self.phi + (0.25 * dy as f32).to_radians()).clamp(0.1, PI - 0.1);
    }

    pub fn zoom(&mut self, dx: i32, dy: i32) {
        let delta = 0.005 * (dx - dy) as f32;
        self.radius = (self.radius + delta).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    pub fn set_aspect(&mut self, extent: Extent) {
        self.projection = Mat4::perspective_lh(0.25 * PI, extent.aspect_ratio(), 1.0, 1000.0);
    }

    pub fn advance(&mut self, delta_time: f32) {
        if !self.dragging {
            self.theta += IDLE_SPIN * delta_time;
        }
        self.view = Mat4::look_at_lh(self.eye(), Vec3::ZERO, Vec3::Y);
    }

    pub fn grab(&mut self, x: i32, y: i32) {
        self.last_mouse = (x, y);
        self.dragging = true;
    }

    pub fn release(&mut self) {
        self.dragging = false;
    }

    /// Returns the pixel delta since the last grab or drag.
    pub fn drag_to(&mut self, x: i32, y: i32) -> (i32, i32) {
        let delta = (x - self.last_mouse.0, y - self.last_mouse.1);
        self.last_mouse = (x, y);
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_behind_and_above_the_box() {
        let camera = OrbitCamera::default();
        let eye = camera.eye();
        assert!(eye.x.abs() < 1e-4);
        assert!(eye.y > 0.0 && eye.z < 0.0);
        assert!((eye.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn rotation_keeps_the_camera_off_the_poles() {
        let mut camera = OrbitCamera::default();
        camera.rotate(0, -10_000);
        assert!((camera.phi - 0.1).abs() < 1e-6);
        camera.rotate(0, 10_000);
        assert!((camera.phi - (PI - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.zoom(100_000, 0);
        assert_eq!(camera.radius, MAX_RADIUS);
        camera.zoom(0, 100_000);
        assert_eq!(camera.radius, MIN_RADIUS);
    }

    #[test]
    fn projection_follows_the_aspect_ratio() {
        let mut camera = OrbitCamera::default();
        camera.set_aspect(Extent::new(800, 600));
        let wide = camera.projection;
        camera.set_aspect(Extent::new(600, 800));
        assert_ne!(wide, camera.projection);
        assert!(wide.x_axis.x < camera.projection.x_axis.x);
    }

    #[test]
    fn dragging_stops_the_idle_spin() {
        let mut camera = OrbitCamera::default();
        camera.grab(10, 10);
        let theta = camera.theta;
        camera.advance(1.0);
        assert_eq!(camera.theta, theta);
        assert_eq!(camera.drag_to(14, 7), (4, -3));

        camera.release();
        camera.advance(1.0);
        assert!((camera.theta - theta - IDLE_SPIN).abs() < 1e-6);
    }
}

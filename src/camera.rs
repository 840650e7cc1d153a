//! Orthographic 2D camera.
//!
//! The camera keeps a view rectangle around a focus point. The view height
//! always follows the width through the camera's aspect ratio, and a zoom of
//! `z` widens both axes by `z` times the half extents. Every mutator
//! recomputes the view right away, so [`Camera::bounds`] is always current.

use cgmath::Point2;

use crate::render::QuadTarget;

/// An axis-aligned rectangle in world coordinates, `min` top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: Point2::new(min_x, min_y),
            max: Point2::new(max_x, max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    view: Rect,
    focus: Point2<f64>,
    width: f64,
    height: f64,
    zoom: f64,
}

impl Camera {
    /// A camera showing the `w` x `h` area whose top-left corner is `(x, y)`.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        let mut camera = Self {
            view: Rect::new(0.0, 0.0, 0.0, 0.0),
            focus: Point2::new(x + w / 2.0, y + h / 2.0),
            width: w,
            height: h,
            zoom: 0.0,
        };
        camera.calc_view();
        camera
    }

    fn calc_view(&mut self) {
        let ratio = self.height / self.width;
        let hw = self.width / 2.0;
        let hh = hw * ratio;
        let zw = hw * self.zoom;
        let zh = zw * ratio;
        self.view.min.x = self.focus.x - hw - zw;
        self.view.min.y = self.focus.y - hh - zh;
        self.view.max.x = self.focus.x + hw + zw;
        self.view.max.y = self.focus.y + hh + zh;
    }

    /// Derives the view height from the width so the view matches a
    /// `width` x `height` pixel surface.
    pub fn match_ratio(&mut self, width: u32, height: u32) {
        let ratio = height as f64 / width as f64;
        self.height = self.width * ratio;
        self.calc_view();
    }

    /// Moves the focus vertically so the top edge of the view lands on `y`.
    pub fn top(&mut self, y: f64) {
        let dy = y - self.view.min.y;
        self.focus.y += dy;
        self.calc_view();
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.focus.x += dx;
        self.focus.y += dy;
        self.calc_view();
    }

    /// Sets the absolute zoom level; `0.0` shows exactly `width` x `height`.
    pub fn zoom(&mut self, z: f64) {
        self.zoom = z;
        self.calc_view();
    }

    pub fn bounds(&self) -> Rect {
        self.view
    }

    pub fn focus(&self) -> Point2<f64> {
        self.focus
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom
    }

    /// Orthographic projection of the view with y pointing down.
    pub fn projection_matrix(&self) -> cgmath::Matrix4<f32> {
        ortho_matrix(self.view)
    }

    /// Hands the current view to `target` for all quads that follow.
    pub fn set_projection(&self, target: &mut dyn QuadTarget) {
        target.set_projection(self.view);
    }
}

/// Maps `view` onto clip space, `min` to the top-left corner.
pub fn ortho_matrix(view: Rect) -> cgmath::Matrix4<f32> {
    cgmath::ortho(
        view.min.x as f32,
        view.max.x as f32,
        view.max.y as f32,
        view.min.y as f32,
        -1.0,
        1.0,
    )
}

// THEORY:
// The overlay draws the hand skeleton on top of the video. Only two things are
// load-bearing: the shape (21 markers plus the segments of `HAND_CONNECTIONS`)
// and the coordinate mapping (landmark coordinates are surface pixels, and the
// surface is sized to the source video before anything is drawn).
//
// Rendering always starts by clearing the surface. That makes the "no hand"
// case trivial: rendering `None` leaves an empty surface, so markers from a
// previous cycle never linger.

use crate::core_modules::landmark::{HAND_CONNECTIONS, LandmarkSet};
use crate::core_modules::utils::image_helper;
use crate::error::Result;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::path::Path;

/// A resizable 2D target for point and line draw calls.
pub trait DrawingSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Changes the surface size. Implementations should make this a no-op when
    /// the size is unchanged.
    fn resize(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    fn draw_point(&mut self, x: f32, y: f32, radius: f32, color: Rgba<u8>);
    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba<u8>);
}

/// Colors and sizes of the skeleton. Purely presentational.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub point_color: Rgba<u8>,
    pub line_color: Rgba<u8>,
    pub point_radius: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            point_color: Rgba([255, 0, 0, 255]),
            line_color: Rgba([192, 192, 192, 255]),
            point_radius: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn render(&self, landmarks: Option<&LandmarkSet>, surface: &mut dyn DrawingSurface) {
        surface.clear();
        let Some(landmarks) = landmarks else {
            return;
        };
        let points = landmarks.points();
        // Segments first so the markers sit on top.
        for &(a, b) in HAND_CONNECTIONS.iter() {
            let (from, to) = (points[a], points[b]);
            surface.draw_line((from.x, from.y), (to.x, to.y), self.style.line_color);
        }
        for p in points {
            surface.draw_point(p.x, p.y, self.style.point_radius, self.style.point_color);
        }
    }
}

/// An RGBA raster surface. Cleared pixels are fully transparent so the canvas
/// can be composited over the video frame.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::new(width, height) }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Number of pixels that are not fully transparent.
    pub fn painted_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[3] != 0).count()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        (x < self.image.width() && y < self.image.height()).then(|| *self.image.get_pixel(x, y))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        image_helper::save(path, &self.image)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl DrawingSurface for Canvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_point(&mut self, x: f32, y: f32, radius: f32, color: Rgba<u8>) {
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        if !(x.is_finite() && y.is_finite()) || w == 0.0 || h == 0.0 {
            return;
        }
        let r = if radius.is_finite() { radius.clamp(0.0, w + h) } else { 0.0 };
        if x + r < 0.0 || y + r < 0.0 || x - r >= w || y - r >= h {
            return;
        }
        draw_filled_circle_mut(&mut self.image, (x.round() as i32, y.round() as i32), r.round() as i32, color);
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba<u8>) {
        let max_x = self.image.width() as f64 - 1.0;
        let max_y = self.image.height() as f64 - 1.0;
        if let Some((from, to)) = clip_segment(from, to, max_x, max_y) {
            draw_line_segment_mut(&mut self.image, from, to, color);
        }
    }
}

/// Liang-Barsky clipping of a segment to `[0, max_x] x [0, max_y]`. `None` when
/// nothing of the segment is on the surface or an endpoint is not finite.
fn clip_segment(from: (f32, f32), to: (f32, f32), max_x: f64, max_y: f64) -> Option<((f32, f32), (f32, f32))> {
    if max_x < 0.0 || max_y < 0.0 || ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (dx, dy) = (to.0 as f64 - x0, to.1 as f64 - y0);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [(-dx, x0), (dx, max_x - x0), (-dy, y0), (dy, max_y - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    let at = |t: f64| ((x0 + t * dx).clamp(0.0, max_x) as f32, (y0 + t * dy).clamp(0.0, max_y) as f32);
    Some((at(t0), at(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::synthetic::HandBuilder;

    #[test]
    fn renders_every_landmark() {
        let hand = HandBuilder::new(320.0, 400.0).build().unwrap();
        let mut canvas = Canvas::new(640, 480);
        OverlayRenderer::default().render(Some(&hand), &mut canvas);

        let style = OverlayStyle::default();
        for p in hand.points() {
            let pixel = canvas.pixel(p.x.round() as u32, p.y.round() as u32).unwrap();
            assert_eq!(pixel, style.point_color);
        }
    }

    #[test]
    fn connects_palm_base() {
        let hand = HandBuilder::new(320.0, 400.0).build().unwrap();
        let mut canvas = Canvas::new(640, 480);
        OverlayRenderer::new(OverlayStyle { point_radius: 0.0, ..OverlayStyle::default() }).render(Some(&hand), &mut canvas);

        let a = hand.points()[crate::core_modules::landmark::INDEX_MCP];
        let b = hand.points()[crate::core_modules::landmark::MIDDLE_MCP];
        let mid = (((a.x + b.x) / 2.0).round() as u32, ((a.y + b.y) / 2.0).round() as u32);
        // The rasterized segment passes within a pixel of the true midpoint.
        let near = (mid.0.saturating_sub(1)..=mid.0 + 1)
            .flat_map(|x| (mid.1.saturating_sub(1)..=mid.1 + 1).map(move |y| (x, y)))
            .any(|(x, y)| canvas.pixel(x, y).map(|p| p.0[3] != 0).unwrap_or(false));
        assert!(near);
    }

    #[test]
    fn empty_render_clears_stale_markers() {
        let mut canvas = Canvas::new(640, 480);
        let renderer = OverlayRenderer::default();
        renderer.render(Some(&HandBuilder::thumbs_up(300.0, 300.0).build().unwrap()), &mut canvas);
        assert!(canvas.painted_pixels() > 0);

        renderer.render(None, &mut canvas);
        assert_eq!(canvas.painted_pixels(), 0);
    }

    #[test]
    fn drawing_off_surface_is_clipped() {
        let mut canvas = Canvas::new(10, 10);
        canvas.draw_line((-20.0, 5.0), (30.0, 5.0), Rgba([1, 2, 3, 255]));
        canvas.draw_point(-100.0, -100.0, 4.0, Rgba([1, 2, 3, 255]));
        for (x, y, pixel) in canvas.image().enumerate_pixels() {
            assert_eq!(pixel.0[3] != 0, y == 5, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn non_finite_coordinates_draw_nothing() {
        let mut canvas = Canvas::new(64, 64);
        let color = Rgba([1, 2, 3, 255]);
        canvas.draw_line((f32::NEG_INFINITY, 10.0), (f32::INFINITY, 10.0), color);
        canvas.draw_line((f32::NAN, 0.0), (32.0, 32.0), color);
        canvas.draw_point(f32::INFINITY, 5.0, 3.0, color);
        canvas.draw_point(5.0, f32::NAN, 3.0, color);
        canvas.draw_point(5.0, 5.0, f32::INFINITY, color);
        assert_eq!(canvas.painted_pixels(), 1);
    }

    #[test]
    fn far_off_surface_landmarks_render_quickly() {
        let hand = HandBuilder::new(30.0, 40.0).build().unwrap();
        let mut points = hand.points().to_vec();
        points[crate::core_modules::landmark::INDEX_TIP].x = 3.0e8;
        points[crate::core_modules::landmark::PINKY_TIP].y = -3.0e30;
        let hand = LandmarkSet::try_from(points).unwrap();

        let mut canvas = Canvas::new(64, 64);
        let started = std::time::Instant::now();
        OverlayRenderer::default().render(Some(&hand), &mut canvas);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert!(canvas.painted_pixels() > 0);
    }

    #[test]
    fn clipping_keeps_on_surface_part_of_segment() {
        assert_eq!(clip_segment((-10.0, 0.0), (10.0, 0.0), 4.0, 4.0), Some(((0.0, 0.0), (4.0, 0.0))));
        assert_eq!(clip_segment((1.0, 1.0), (2.0, 3.0), 4.0, 4.0), Some(((1.0, 1.0), (2.0, 3.0))));
        assert_eq!(clip_segment((-5.0, -5.0), (-1.0, 9.0), 4.0, 4.0), None);
        assert_eq!(clip_segment((-1.0e6, 2.0), (1.0e6, 2.0), 4.0, 4.0), Some(((0.0, 2.0), (4.0, 2.0))));
        assert_eq!(clip_segment((0.0, 0.0), (1.0, 1.0), -1.0, 4.0), None);
    }

    #[test]
    fn resize_only_reallocates_on_change() {
        let mut canvas = Canvas::new(4, 4);
        canvas.draw_point(1.0, 1.0, 0.0, Rgba([9, 9, 9, 255]));
        canvas.resize(4, 4);
        assert_eq!(canvas.painted_pixels(), 1);
        canvas.resize(8, 2);
        assert_eq!((canvas.width(), canvas.height()), (8, 2));
        assert_eq!(canvas.painted_pixels(), 0);
    }
}

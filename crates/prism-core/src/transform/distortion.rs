//! Grid-based random distortion.
//!
//! The image is split into `grid_width x grid_height` cells. Interior grid
//! vertices are displaced by a random offset and every cell is warped so its
//! rectangle samples from the displaced quadrilateral. Border vertices stay
//! put, so the image outline is preserved.

use image::{DynamicImage, ImageBuffer, Pixel};
use rand::Rng;

/// Concrete vertex displacements drawn for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct DistortionGrid {
    grid_width: u32,
    grid_height: u32,
    /// Row-major offsets of the `(grid_width - 1) * (grid_height - 1)`
    /// interior vertices.
    offsets: Vec<(i32, i32)>,
}

impl DistortionGrid {
    /// Draw offsets in `[-magnitude, magnitude]` for every interior vertex.
    pub fn draw<R: Rng>(
        rng: &mut R,
        grid_width: u32,
        grid_height: u32,
        magnitude: u32,
    ) -> Self {
        let m = i32::try_from(magnitude).unwrap_or(i32::MAX);
        let interior =
            grid_width.saturating_sub(1) as usize * grid_height.saturating_sub(1) as usize;
        let offsets = (0..interior)
            .map(|_| (rng.gen_range(-m..=m), rng.gen_range(-m..=m)))
            .collect();
        Self {
            grid_width,
            grid_height,
            offsets,
        }
    }

    /// A grid with no displacement.
    pub fn identity(grid_width: u32, grid_height: u32) -> Self {
        let interior =
            grid_width.saturating_sub(1) as usize * grid_height.saturating_sub(1) as usize;
        Self {
            grid_width,
            grid_height,
            offsets: vec![(0, 0); interior],
        }
    }

    pub fn is_identity(&self) -> bool {
        self.offsets.iter().all(|&o| o == (0, 0))
    }

    /// Warp the image, keeping its pixel layout where the format allows.
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        if self.is_identity() {
            return image;
        }
        match image {
            DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(self.warp(&buf)),
            DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(self.warp(&buf)),
            DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(self.warp(&buf)),
            DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(self.warp(&buf)),
            DynamicImage::ImageLuma16(buf) => DynamicImage::ImageLuma16(self.warp(&buf)),
            DynamicImage::ImageLumaA16(buf) => DynamicImage::ImageLumaA16(self.warp(&buf)),
            DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgb16(self.warp(&buf)),
            DynamicImage::ImageRgba16(buf) => DynamicImage::ImageRgba16(self.warp(&buf)),
            other => DynamicImage::ImageRgba32F(self.warp(&other.to_rgba32f())),
        }
    }

    /// Grid line positions along one axis. The last cell absorbs the remainder.
    fn lines(extent: u32, cells: u32) -> Vec<f32> {
        let cells = cells.max(1).min(extent.max(1));
        let step = extent / cells;
        let mut lines: Vec<f32> = (0..cells).map(|i| (i * step) as f32).collect();
        lines.push(extent as f32);
        lines
    }

    /// Position of vertex `(i, j)` after displacement.
    fn vertex(&self, xs: &[f32], ys: &[f32], i: usize, j: usize) -> (f32, f32) {
        let cols = xs.len() - 1;
        let rows = ys.len() - 1;
        let (mut x, mut y) = (xs[i], ys[j]);
        if i > 0 && i < cols && j > 0 && j < rows {
            let idx = (j - 1) * (self.grid_width as usize - 1) + (i - 1);
            if let Some(&(dx, dy)) = self.offsets.get(idx) {
                x += dx as f32;
                y += dy as f32;
            }
        }
        (x, y)
    }

    fn warp<P: Pixel>(
        &self,
        src: &ImageBuffer<P, Vec<P::Subpixel>>,
    ) -> ImageBuffer<P, Vec<P::Subpixel>> {
        let (width, height) = src.dimensions();
        let xs = Self::lines(width, self.grid_width);
        let ys = Self::lines(height, self.grid_height);
        let max_x = width.saturating_sub(1) as f32;
        let max_y = height.saturating_sub(1) as f32;

        ImageBuffer::from_fn(width, height, |x, y| {
            let (fx, fy) = (x as f32, y as f32);
            let i = cell_index(&xs, fx);
            let j = cell_index(&ys, fy);
            let u = (fx - xs[i]) / (xs[i + 1] - xs[i]);
            let v = (fy - ys[j]) / (ys[j + 1] - ys[j]);

            let (x00, y00) = self.vertex(&xs, &ys, i, j);
            let (x10, y10) = self.vertex(&xs, &ys, i + 1, j);
            let (x01, y01) = self.vertex(&xs, &ys, i, j + 1);
            let (x11, y11) = self.vertex(&xs, &ys, i + 1, j + 1);

            let sx = bilerp(x00, x10, x01, x11, u, v).round().clamp(0.0, max_x);
            let sy = bilerp(y00, y10, y01, y11, u, v).round().clamp(0.0, max_y);
            *src.get_pixel(sx as u32, sy as u32)
        })
    }
}

fn cell_index(lines: &[f32], pos: f32) -> usize {
    let cells = lines.len() - 1;
    lines[1..cells]
        .iter()
        .position(|&line| pos < line)
        .unwrap_or(cells - 1)
}

fn bilerp(p00: f32, p10: f32, p01: f32, p11: f32, u: f32, v: f32) -> f32 {
    let top = p00 + (p10 - p00) * u;
    let bottom = p01 + (p11 - p01) * u;
    top + (bottom - top) * v
}

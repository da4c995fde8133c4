//! Resolving steps into concrete operations and applying them to pixels.
//!
//! All random draws for an image happen in [`Plan::draw`] before any pixel
//! work, so the pixel stage is a pure function of the plan and can run on a
//! worker thread without touching the pipeline's random source.

use image::imageops::FilterType;
use image::DynamicImage;
use rand::Rng;

use super::distortion::DistortionGrid;
use super::step::{Transform, TransformStep};

/// A step with all of its random parameters fixed.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    FlipHorizontal,
    FlipVertical,
    Rotate90,
    Rotate180,
    Rotate270,
    Zoom { factor: f64 },
    HueShift { degrees: i32 },
    Distort(DistortionGrid),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlipHorizontal => "flip_horizontal",
            Self::FlipVertical => "flip_vertical",
            Self::Rotate90 => "rotate90",
            Self::Rotate180 => "rotate180",
            Self::Rotate270 => "rotate270",
            Self::Zoom { .. } => "zoom",
            Self::HueShift { .. } => "hue_shift",
            Self::Distort(_) => "random_distortion",
        }
    }

    /// Draw the concrete parameters for a transform.
    fn resolve<R: Rng>(transform: &Transform, rng: &mut R) -> Self {
        match *transform {
            Transform::FlipHorizontal => Self::FlipHorizontal,
            Transform::FlipVertical => Self::FlipVertical,
            Transform::Rotate90 => Self::Rotate90,
            Transform::Rotate180 => Self::Rotate180,
            Transform::Rotate270 => Self::Rotate270,
            Transform::Zoom {
                min_factor,
                max_factor,
            } => Self::Zoom {
                factor: rng.gen_range(min_factor..=max_factor),
            },
            Transform::HueShift {
                min_degrees,
                max_degrees,
            } => Self::HueShift {
                degrees: rng.gen_range(min_degrees..=max_degrees),
            },
            Transform::RandomDistortion {
                grid_width,
                grid_height,
                magnitude,
            } => Self::Distort(DistortionGrid::draw(rng, grid_width, grid_height, magnitude)),
        }
    }

    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::FlipHorizontal => image.fliph(),
            Self::FlipVertical => image.flipv(),
            Self::Rotate90 => image.rotate90(),
            Self::Rotate180 => image.rotate180(),
            Self::Rotate270 => image.rotate270(),
            Self::Zoom { factor } => zoom(image, *factor),
            Self::HueShift { degrees } => {
                if *degrees == 0 {
                    image
                } else {
                    image.huerotate(*degrees)
                }
            }
            Self::Distort(grid) => grid.apply(image),
        }
    }
}

/// Crop the centred `1/factor` region and scale it back to the full size.
fn zoom(image: DynamicImage, factor: f64) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let crop_w = ((width as f64 / factor).round() as u32).clamp(1, width.max(1));
    let crop_h = ((height as f64 / factor).round() as u32).clamp(1, height.max(1));
    if crop_w == width && crop_h == height {
        return image;
    }
    let x = (width - crop_w) / 2;
    let y = (height - crop_h) / 2;
    image
        .crop_imm(x, y, crop_w, crop_h)
        .resize_exact(width, height, FilterType::CatmullRom)
}

/// The operations that fired for one image, in step order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    operations: Vec<Operation>,
}

impl Plan {
    /// Roll every step once, in order. A step fires when a uniform draw in
    /// `[0, 1)` falls below its probability.
    pub fn draw<R: Rng>(steps: &[TransformStep], rng: &mut R) -> Self {
        let operations = steps
            .iter()
            .filter_map(|step| {
                let roll: f64 = rng.gen();
                if roll < step.probability() {
                    Some(Operation::resolve(step.transform(), rng))
                } else {
                    None
                }
            })
            .collect();
        Self { operations }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Names of the applied operations, in order.
    pub fn applied(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.name().to_string()).collect()
    }

    /// Filename fragment describing the applied sequence.
    pub fn label(&self) -> String {
        if self.operations.is_empty() {
            "original".to_string()
        } else {
            self.operations
                .iter()
                .map(Operation::name)
                .collect::<Vec<_>>()
                .join("+")
        }
    }

    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        self.operations
            .iter()
            .fold(image, |current, op| op.apply(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn asymmetric() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(6, 4, |x, y| {
            Rgb([(x * 40) as u8, (y * 60) as u8, (x * y) as u8])
        }))
    }

    #[test]
    fn test_probability_one_always_fires() {
        let steps = vec![TransformStep::flip_horizontal(1.0), TransformStep::rotate90(1.0)];
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            let plan = Plan::draw(&steps, &mut rng);
            assert_eq!(plan.applied(), vec!["flip_horizontal", "rotate90"]);
        }
    }

    #[test]
    fn test_probability_zero_never_fires() {
        let steps = vec![TransformStep::flip_vertical(0.0), TransformStep::zoom(0.0, 1.1, 1.3)];
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            let plan = Plan::draw(&steps, &mut rng);
            assert!(plan.is_empty());
            assert_eq!(plan.label(), "original");
        }
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let steps = vec![
            TransformStep::flip_horizontal(0.5),
            TransformStep::zoom(0.5, 1.05, 1.2),
            TransformStep::hue_shift(0.5, -30, 30),
        ];
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            assert_eq!(Plan::draw(&steps, &mut a), Plan::draw(&steps, &mut b));
        }
    }

    #[test]
    fn test_flip_twice_restores_layout() {
        let img = asymmetric();
        let plan = Plan {
            operations: vec![Operation::FlipHorizontal, Operation::FlipHorizontal],
        };
        assert_eq!(plan.apply(img.clone()), img);
    }

    #[test]
    fn test_rotations_cancel() {
        let img = asymmetric();
        let plan = Plan {
            operations: vec![Operation::Rotate90, Operation::Rotate270],
        };
        assert_eq!(plan.apply(img.clone()), img);

        let rotated = Operation::Rotate90.apply(img.clone());
        assert_eq!(rotated.dimensions(), (4, 6));
    }

    #[test]
    fn test_flip_horizontal_mirrors_pixels() {
        let img = asymmetric();
        let flipped = Operation::FlipHorizontal.apply(img.clone());
        assert_eq!(flipped.get_pixel(0, 1), img.get_pixel(5, 1));
    }

    #[test]
    fn test_zoom_keeps_dimensions() {
        let img = DynamicImage::new_rgb8(100, 80);
        let zoomed = Operation::Zoom { factor: 1.2 }.apply(img);
        assert_eq!(zoomed.dimensions(), (100, 80));
    }

    #[test]
    fn test_zoom_factor_one_is_identity() {
        let img = asymmetric();
        assert_eq!(Operation::Zoom { factor: 1.0 }.apply(img.clone()), img);
    }

    #[test]
    fn test_zoom_samples_centre() {
        // Red border around a green centre: a 2x zoom shows only the centre.
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Rgba([0, 255, 0, 255])
            } else {
                Rgba([255, 0, 0, 255])
            }
        }));
        let zoomed = Operation::Zoom { factor: 2.0 }.apply(img);
        let Rgba([r, g, _, _]) = zoomed.get_pixel(20, 20);
        assert!(r < 5 && g > 250);
    }

    #[test]
    fn test_hue_shift_changes_colour_not_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 40, 40])));
        let shifted = Operation::HueShift { degrees: 120 }.apply(img.clone());
        assert_eq!(shifted.dimensions(), (8, 8));
        assert_ne!(shifted, img);
        assert_eq!(Operation::HueShift { degrees: 0 }.apply(img.clone()), img);
    }

    #[test]
    fn test_zoom_factor_drawn_within_range() {
        let steps = vec![TransformStep::zoom(1.0, 1.05, 1.2)];
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let plan = Plan::draw(&steps, &mut rng);
            match plan.operations() {
                [Operation::Zoom { factor }] => assert!((1.05..=1.2).contains(factor)),
                other => panic!("unexpected plan {other:?}"),
            }
        }
    }

    #[test]
    fn test_label_joins_applied_names() {
        let plan = Plan {
            operations: vec![Operation::FlipHorizontal, Operation::Zoom { factor: 1.1 }],
        };
        assert_eq!(plan.label(), "flip_horizontal+zoom");
    }
}

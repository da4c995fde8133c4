//! Transform steps: a named operation paired with an application probability.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, PipelineResult};

/// Largest accepted `random_distortion` grid dimension.
pub const MAX_DISTORTION_GRID: u32 = 256;

/// Largest accepted `random_distortion` vertex displacement, in pixels.
pub const MAX_DISTORTION_MAGNITUDE: u32 = 4096;

/// The operation a step performs when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Mirror left to right
    FlipHorizontal,
    /// Mirror top to bottom
    FlipVertical,
    /// Quarter turn clockwise
    Rotate90,
    /// Half turn
    Rotate180,
    /// Three quarter turns clockwise
    Rotate270,
    /// Crop the centre by a factor drawn from `[min_factor, max_factor]`
    /// and scale it back to the original size.
    Zoom { min_factor: f64, max_factor: f64 },
    /// Rotate the hue of every pixel by a whole number of degrees drawn
    /// from `[min_degrees, max_degrees]`.
    HueShift { min_degrees: i32, max_degrees: i32 },
    /// Displace the interior vertices of a grid by up to `magnitude` pixels
    /// and warp each cell to its displaced quadrilateral.
    RandomDistortion {
        grid_width: u32,
        grid_height: u32,
        magnitude: u32,
    },
}

impl Transform {
    /// Stable name used in recipes, step specs and derived filenames.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlipHorizontal => "flip_horizontal",
            Self::FlipVertical => "flip_vertical",
            Self::Rotate90 => "rotate90",
            Self::Rotate180 => "rotate180",
            Self::Rotate270 => "rotate270",
            Self::Zoom { .. } => "zoom",
            Self::HueShift { .. } => "hue_shift",
            Self::RandomDistortion { .. } => "random_distortion",
        }
    }

    /// Check the operation's own parameters.
    pub fn validate(&self) -> PipelineResult<()> {
        match *self {
            Self::Zoom {
                min_factor,
                max_factor,
            } => {
                if !min_factor.is_finite() || !max_factor.is_finite() {
                    return Err(PipelineError::invalid("zoom", "factors must be finite"));
                }
                if min_factor < 1.0 {
                    return Err(PipelineError::invalid(
                        "zoom",
                        format!("min_factor {min_factor} must be >= 1.0"),
                    ));
                }
                if min_factor > max_factor {
                    return Err(PipelineError::invalid(
                        "zoom",
                        format!("min_factor {min_factor} exceeds max_factor {max_factor}"),
                    ));
                }
            }
            Self::HueShift {
                min_degrees,
                max_degrees,
            } => {
                if !(-180..=180).contains(&min_degrees) || !(-180..=180).contains(&max_degrees) {
                    return Err(PipelineError::invalid(
                        "hue_shift",
                        "degrees must lie within [-180, 180]",
                    ));
                }
                if min_degrees > max_degrees {
                    return Err(PipelineError::invalid(
                        "hue_shift",
                        format!("min_degrees {min_degrees} exceeds max_degrees {max_degrees}"),
                    ));
                }
            }
            Self::RandomDistortion {
                grid_width,
                grid_height,
                magnitude,
            } => {
                if grid_width == 0 || grid_height == 0 {
                    return Err(PipelineError::invalid(
                        "random_distortion",
                        "grid_width and grid_height must be > 0",
                    ));
                }
                if grid_width > MAX_DISTORTION_GRID || grid_height > MAX_DISTORTION_GRID {
                    return Err(PipelineError::invalid(
                        "random_distortion",
                        format!("grid dimensions must be <= {MAX_DISTORTION_GRID}"),
                    ));
                }
                if magnitude > MAX_DISTORTION_MAGNITUDE {
                    return Err(PipelineError::invalid(
                        "random_distortion",
                        format!("magnitude {magnitude} exceeds {MAX_DISTORTION_MAGNITUDE}"),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// One probabilistic operation of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct TransformStep {
    transform: Transform,
    probability: f64,
}

impl TransformStep {
    /// Pair a transform with a probability. Validation happens when the step
    /// is added to a pipeline or loaded from a recipe.
    pub fn new(transform: Transform, probability: f64) -> Self {
        Self {
            transform,
            probability,
        }
    }

    pub fn flip_horizontal(probability: f64) -> Self {
        Self::new(Transform::FlipHorizontal, probability)
    }

    pub fn flip_vertical(probability: f64) -> Self {
        Self::new(Transform::FlipVertical, probability)
    }

    pub fn rotate90(probability: f64) -> Self {
        Self::new(Transform::Rotate90, probability)
    }

    pub fn rotate180(probability: f64) -> Self {
        Self::new(Transform::Rotate180, probability)
    }

    pub fn rotate270(probability: f64) -> Self {
        Self::new(Transform::Rotate270, probability)
    }

    pub fn zoom(probability: f64, min_factor: f64, max_factor: f64) -> Self {
        Self::new(
            Transform::Zoom {
                min_factor,
                max_factor,
            },
            probability,
        )
    }

    pub fn hue_shift(probability: f64, min_degrees: i32, max_degrees: i32) -> Self {
        Self::new(
            Transform::HueShift {
                min_degrees,
                max_degrees,
            },
            probability,
        )
    }

    pub fn random_distortion(
        probability: f64,
        grid_width: u32,
        grid_height: u32,
        magnitude: u32,
    ) -> Self {
        Self::new(
            Transform::RandomDistortion {
                grid_width,
                grid_height,
                magnitude,
            },
            probability,
        )
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn name(&self) -> &'static str {
        self.transform.name()
    }

    /// Check the probability lies in [0, 1] and the parameters are well formed.
    pub fn validate(&self) -> PipelineResult<()> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(PipelineError::invalid(
                self.name(),
                format!("probability {} not in [0, 1]", self.probability),
            ));
        }
        self.transform.validate()
    }
}

impl fmt::Display for TransformStep {
    /// Formats in the same `name@probability[:params]` syntax `FromStr` accepts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name(), self.probability)?;
        match self.transform {
            Transform::Zoom {
                min_factor,
                max_factor,
            } => write!(f, ":{min_factor}:{max_factor}"),
            Transform::HueShift {
                min_degrees,
                max_degrees,
            } => write!(f, ":{min_degrees}:{max_degrees}"),
            Transform::RandomDistortion {
                grid_width,
                grid_height,
                magnitude,
            } => write!(f, ":{grid_width}:{grid_height}:{magnitude}"),
            _ => Ok(()),
        }
    }
}

impl FromStr for TransformStep {
    type Err = PipelineError;

    /// Parse a command-line step spec such as `flip_horizontal@0.5`,
    /// `zoom@1:1.05:1.2` or `random_distortion@1:4:4:8`. The probability
    /// defaults to 1 when `@` is omitted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let head = parts.next().unwrap_or_default();
        let params: Vec<&str> = parts.collect();

        let (name, probability) = match head.split_once('@') {
            Some((name, p)) => {
                let p = p
                    .parse::<f64>()
                    .map_err(|_| PipelineError::invalid(name, format!("bad probability {p:?}")))?;
                (name, p)
            }
            None => (head, 1.0),
        };

        let expect = |n: usize| -> PipelineResult<()> {
            if params.len() == n {
                Ok(())
            } else {
                Err(PipelineError::invalid(
                    name,
                    format!("expected {n} parameter(s), got {}", params.len()),
                ))
            }
        };

        let transform = match name {
            "flip_horizontal" => {
                expect(0)?;
                Transform::FlipHorizontal
            }
            "flip_vertical" => {
                expect(0)?;
                Transform::FlipVertical
            }
            "rotate90" => {
                expect(0)?;
                Transform::Rotate90
            }
            "rotate180" => {
                expect(0)?;
                Transform::Rotate180
            }
            "rotate270" => {
                expect(0)?;
                Transform::Rotate270
            }
            "zoom" => {
                expect(2)?;
                Transform::Zoom {
                    min_factor: parse_param(name, params[0])?,
                    max_factor: parse_param(name, params[1])?,
                }
            }
            "hue_shift" => {
                expect(2)?;
                Transform::HueShift {
                    min_degrees: parse_param(name, params[0])?,
                    max_degrees: parse_param(name, params[1])?,
                }
            }
            "random_distortion" => {
                expect(3)?;
                Transform::RandomDistortion {
                    grid_width: parse_param(name, params[0])?,
                    grid_height: parse_param(name, params[1])?,
                    magnitude: parse_param(name, params[2])?,
                }
            }
            other => {
                return Err(PipelineError::invalid(other, "unknown transform"));
            }
        };

        let step = TransformStep::new(transform, probability);
        step.validate()?;
        Ok(step)
    }
}

fn parse_param<T: FromStr>(step: &str, value: &str) -> PipelineResult<T> {
    value
        .parse()
        .map_err(|_| PipelineError::invalid(step, format!("bad parameter {value:?}")))
}

/// Flat serde representation used in recipe files.
#[derive(Debug, Serialize, Deserialize)]
struct RawStep {
    op: String,
    probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_degrees: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_degrees: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grid_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grid_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    magnitude: Option<u32>,
}

impl RawStep {
    fn bare(op: &str, probability: f64) -> Self {
        Self {
            op: op.to_string(),
            probability,
            min_factor: None,
            max_factor: None,
            min_degrees: None,
            max_degrees: None,
            grid_width: None,
            grid_height: None,
            magnitude: None,
        }
    }
}

fn required<T>(value: Option<T>, step: &str, field: &str) -> PipelineResult<T> {
    value.ok_or_else(|| PipelineError::invalid(step, format!("missing field `{field}`")))
}

impl TryFrom<RawStep> for TransformStep {
    type Error = PipelineError;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let op = raw.op.as_str();
        let transform = match op {
            "flip_horizontal" => Transform::FlipHorizontal,
            "flip_vertical" => Transform::FlipVertical,
            "rotate90" => Transform::Rotate90,
            "rotate180" => Transform::Rotate180,
            "rotate270" => Transform::Rotate270,
            "zoom" => Transform::Zoom {
                min_factor: required(raw.min_factor, op, "min_factor")?,
                max_factor: required(raw.max_factor, op, "max_factor")?,
            },
            "hue_shift" => Transform::HueShift {
                min_degrees: required(raw.min_degrees, op, "min_degrees")?,
                max_degrees: required(raw.max_degrees, op, "max_degrees")?,
            },
            "random_distortion" => Transform::RandomDistortion {
                grid_width: required(raw.grid_width, op, "grid_width")?,
                grid_height: required(raw.grid_height, op, "grid_height")?,
                magnitude: required(raw.magnitude, op, "magnitude")?,
            },
            other => return Err(PipelineError::invalid(other, "unknown transform")),
        };
        let step = TransformStep::new(transform, raw.probability);
        step.validate()?;
        Ok(step)
    }
}

impl From<TransformStep> for RawStep {
    fn from(step: TransformStep) -> Self {
        let mut raw = RawStep::bare(step.name(), step.probability);
        match step.transform {
            Transform::Zoom {
                min_factor,
                max_factor,
            } => {
                raw.min_factor = Some(min_factor);
                raw.max_factor = Some(max_factor);
            }
            Transform::HueShift {
                min_degrees,
                max_degrees,
            } => {
                raw.min_degrees = Some(min_degrees);
                raw.max_degrees = Some(max_degrees);
            }
            Transform::RandomDistortion {
                grid_width,
                grid_height,
                magnitude,
            } => {
                raw.grid_width = Some(grid_width);
                raw.grid_height = Some(grid_height);
                raw.magnitude = Some(magnitude);
            }
            _ => {}
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_out_of_range_rejected() {
        let err = TransformStep::flip_horizontal(1.5).validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));

        let err = TransformStep::rotate90(-0.1).validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));

        assert!(TransformStep::flip_vertical(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_probability_bounds_accepted() {
        assert!(TransformStep::flip_horizontal(0.0).validate().is_ok());
        assert!(TransformStep::flip_horizontal(1.0).validate().is_ok());
    }

    #[test]
    fn test_zoom_range_checks() {
        assert!(TransformStep::zoom(1.0, 1.05, 1.2).validate().is_ok());
        assert!(TransformStep::zoom(1.0, 1.2, 1.05).validate().is_err());
        assert!(TransformStep::zoom(1.0, 0.5, 1.2).validate().is_err());
        assert!(TransformStep::zoom(1.0, 1.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_hue_shift_range_checks() {
        assert!(TransformStep::hue_shift(1.0, -30, 30).validate().is_ok());
        assert!(TransformStep::hue_shift(1.0, 30, -30).validate().is_err());
        assert!(TransformStep::hue_shift(1.0, -200, 0).validate().is_err());
    }

    #[test]
    fn test_distortion_requires_grid() {
        assert!(TransformStep::random_distortion(1.0, 4, 4, 8).validate().is_ok());
        assert!(TransformStep::random_distortion(1.0, 0, 4, 8).validate().is_err());
    }

    #[test]
    fn test_distortion_magnitude_bounded() {
        let err = TransformStep::random_distortion(1.0, 2, 2, u32::MAX)
            .validate()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
        assert!(TransformStep::random_distortion(1.0, 2, 2, MAX_DISTORTION_MAGNITUDE)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_distortion_grid_bounded() {
        assert!("random_distortion@1:100000:100000:1"
            .parse::<TransformStep>()
            .is_err());
        let err = TransformStep::random_distortion(1.0, MAX_DISTORTION_GRID + 1, 2, 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
    }

    #[test]
    fn test_parse_step_specs() {
        let step: TransformStep = "flip_horizontal@0.5".parse().unwrap();
        assert_eq!(step, TransformStep::flip_horizontal(0.5));

        let step: TransformStep = "rotate270".parse().unwrap();
        assert_eq!(step, TransformStep::rotate270(1.0));

        let step: TransformStep = "zoom@1:1.05:1.2".parse().unwrap();
        assert_eq!(step, TransformStep::zoom(1.0, 1.05, 1.2));

        let step: TransformStep = "random_distortion@1:4:4:8".parse().unwrap();
        assert_eq!(step, TransformStep::random_distortion(1.0, 4, 4, 8));
    }

    #[test]
    fn test_parse_rejects_malformed_specs() {
        assert!("zoom@1".parse::<TransformStep>().is_err());
        assert!("flip_horizontal@abc".parse::<TransformStep>().is_err());
        assert!("flip_horizontal@1.5".parse::<TransformStep>().is_err());
        assert!("shear@1".parse::<TransformStep>().is_err());
        assert!("hue_shift@1:-20:x".parse::<TransformStep>().is_err());
    }

    #[test]
    fn test_display_matches_parse_syntax() {
        let step = TransformStep::hue_shift(0.25, -20, 20);
        assert_eq!(step.to_string(), "hue_shift@0.25:-20:20");
        assert_eq!(step.to_string().parse::<TransformStep>().unwrap(), step);
    }

    #[test]
    fn test_deserialize_validates() {
        let step: TransformStep =
            serde_json::from_str(r#"{"op":"zoom","probability":1.0,"min_factor":1.05,"max_factor":1.2}"#)
                .unwrap();
        assert_eq!(step, TransformStep::zoom(1.0, 1.05, 1.2));

        let err = serde_json::from_str::<TransformStep>(r#"{"op":"flip_vertical","probability":2.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("probability"));

        let err = serde_json::from_str::<TransformStep>(r#"{"op":"zoom","probability":1.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("min_factor"));
    }

    #[test]
    fn test_serialize_omits_unused_fields() {
        let json = serde_json::to_string(&TransformStep::flip_horizontal(1.0)).unwrap();
        assert_eq!(json, r#"{"op":"flip_horizontal","probability":1.0}"#);
    }
}

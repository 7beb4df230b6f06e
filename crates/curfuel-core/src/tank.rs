//! Tank Geometry
//!
//! Liquid volume inside a tank of known dimensions, given the fill depth.
//!
//! Horizontal tanks have a "stadium" cross-section: a flat middle section of
//! width `width - depth` closed by two half cylinders of radius `depth / 2`.
//! Vertical tanks are modelled as a right prism.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Tank orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Lying on its side, stadium cross-section
    Horizontal,
    /// Standing upright, filled like a box
    Vertical,
}

impl Orientation {
    /// Anything other than `horizontal` is treated as vertical
    pub fn from_config_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("horizontal") {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// Rejected tank dimensions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidTank {
    #[error("tank depth must be positive, got {0}")]
    Depth(f64),

    #[error("tank length must be positive, got {0}")]
    Length(f64),

    #[error("tank width ({width}) must be at least the depth ({depth}) for a horizontal tank")]
    Width { width: f64, depth: f64 },
}

/// Tank dimensions in meters
///
/// `depth` is measured top to bottom, `length` is the longest dimension and
/// `width` is the distance between the two rounded sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TankConfig {
    /// How the tank is mounted
    pub orientation: Orientation,
    /// Top to bottom
    pub depth: f64,
    /// Longest dimension
    pub length: f64,
    /// Side to side
    pub width: f64,
}

impl TankConfig {
    /// Build a validated tank description
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn new(
        orientation: Orientation,
        depth: f64,
        length: f64,
        width: f64,
    ) -> Result<Self, InvalidTank> {
        if !(depth > 0.0) {
            return Err(InvalidTank::Depth(depth));
        }
        if !(length > 0.0) {
            return Err(InvalidTank::Length(length));
        }
        let min_width = match orientation {
            Orientation::Horizontal => depth,
            Orientation::Vertical => f64::MIN_POSITIVE,
        };
        if !(width >= min_width) {
            return Err(InvalidTank::Width { width, depth });
        }

        Ok(Self {
            orientation,
            depth,
            length,
            width,
        })
    }

    /// Radius of the rounded ends
    pub fn radius(&self) -> f64 {
        self.depth / 2.0
    }

    /// Width of the flat middle section of a horizontal tank
    pub fn flat_width(&self) -> f64 {
        self.width - self.depth
    }
}

/// Total capacity of the tank in cubic meters
pub fn full_volume(tank: &TankConfig) -> f64 {
    match tank.orientation {
        Orientation::Horizontal => {
            let r = tank.radius();
            let v_rect = tank.flat_width() * tank.depth * tank.length;
            let v_cyl = PI * r * r * tank.length;
            v_rect + v_cyl
        }
        Orientation::Vertical => tank.depth * tank.length * tank.width,
    }
}

/// Volume of liquid in cubic meters given `liquid` meters at the bottom
pub fn liquid_volume(tank: &TankConfig, liquid: f64) -> f64 {
    match tank.orientation {
        Orientation::Horizontal => horizontal_liquid_volume(tank, liquid),
        Orientation::Vertical => liquid.clamp(0.0, tank.depth) * tank.length * tank.width,
    }
}

fn horizontal_liquid_volume(tank: &TankConfig, liquid: f64) -> f64 {
    let r = tank.radius();
    if r <= 0.0 || liquid <= 0.0 {
        return 0.0;
    }

    let full = full_volume(tank);

    // exactly half
    if liquid == r {
        return full / 2.0;
    }

    // overflow
    if liquid > tank.depth {
        return full;
    }

    // b is the distance between the liquid line and the center
    let b = (liquid - r).abs();
    let cos_half = (b / r).clamp(-1.0, 1.0);
    let angle = 2.0 * cos_half.acos();
    let segment = (r * r * angle / 2.0) * tank.length;

    // half the liquid line and the triangle under the chord
    let a = (r * r - b * b).max(0.0).sqrt();
    let triangle = b * a * tank.length;

    if liquid < r {
        let middle = liquid * tank.flat_width() * tank.length;
        segment - triangle + middle
    } else {
        let middle = (tank.depth - liquid) * tank.flat_width() * tank.length;
        let empty = segment - triangle + middle;
        full - empty
    }
}

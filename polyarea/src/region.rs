//! Sampling regions.
//!
//! The region fixes both where points are drawn and the area the inside
//! ratio is scaled by. One region is chosen per run.

use std::fmt;
use std::str::FromStr;

use crate::error::InputError;
use crate::polygon::{BoundingBox, Polygon};

/// The fixed `[-1, 1] x [-1, 1]` square.
pub const UNIT_SQUARE: BoundingBox = BoundingBox {
    min_x: -1.0,
    max_x: 1.0,
    min_y: -1.0,
    max_y: 1.0,
};

/// Which sampling region strategy a run uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Always sample `[-1, 1] x [-1, 1]`, whatever the polygon.
    UnitSquare,
    /// Sample the polygon's axis-aligned bounding box.
    #[default]
    BoundingBox,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnitSquare => write!(f, "square"),
            Self::BoundingBox => write!(f, "bbox"),
        }
    }
}

impl FromStr for RegionKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "square" | "unit-square" => Ok(Self::UnitSquare),
            "bbox" | "bounding-box" => Ok(Self::BoundingBox),
            other => Err(InputError::InvalidParameter {
                name: "region",
                value: format!("unknown region '{other}', expected 'square' or 'bbox'"),
            }),
        }
    }
}

/// Concrete sampling domain for one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRegion {
    kind: RegionKind,
    bounds: BoundingBox,
}

impl SampleRegion {
    pub fn unit_square() -> Self {
        Self {
            kind: RegionKind::UnitSquare,
            bounds: UNIT_SQUARE,
        }
    }

    pub fn bounding_box(polygon: &Polygon) -> Self {
        Self {
            kind: RegionKind::BoundingBox,
            bounds: polygon.bounding_box(),
        }
    }

    pub fn for_polygon(kind: RegionKind, polygon: &Polygon) -> Self {
        match kind {
            RegionKind::UnitSquare => Self::unit_square(),
            RegionKind::BoundingBox => Self::bounding_box(polygon),
        }
    }

    #[inline]
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    #[inline]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Area the inside ratio is scaled by.
    #[inline]
    pub fn area(&self) -> f64 {
        self.bounds.area()
    }
}

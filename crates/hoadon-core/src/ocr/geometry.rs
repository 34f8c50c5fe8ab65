//! Boxes and recognized fragments.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Raw region coordinates `[x_min, y_min, x_max, y_max]` as returned by a
/// detector, before validation.
pub type RegionCoords = [f32; 4];

/// Axis-aligned box in image pixel coordinates.
///
/// Always finite with `x_min < x_max` and `y_min < y_max`; the only way to
/// build one is through [`BoundingBox::new`] (or deserialization, which
/// runs the same checks).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RegionCoords", into = "RegionCoords")]
pub struct BoundingBox {
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
}

impl BoundingBox {
    /// Validate and build a box.
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Result<Self, GeometryError> {
        let coords = [x_min, y_min, x_max, y_max];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(GeometryError::NonFinite(coords));
        }
        if x_min >= x_max || y_min >= y_max {
            return Err(GeometryError::Inverted(coords));
        }
        Ok(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Check that the box lies inside a `width` x `height` image.
    pub fn check_within(&self, width: u32, height: u32) -> Result<(), GeometryError> {
        let (w, h) = (width as f32, height as f32);
        if self.x_min < 0.0 || self.y_min < 0.0 || self.x_max > w || self.y_max > h {
            return Err(GeometryError::OutOfBounds {
                coords: self.to_array(),
                width,
                height,
            });
        }
        Ok(())
    }

    pub fn x_min(&self) -> f32 {
        self.x_min
    }

    pub fn y_min(&self) -> f32 {
        self.y_min
    }

    pub fn x_max(&self) -> f32 {
        self.x_max
    }

    pub fn y_max(&self) -> f32 {
        self.y_max
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn center_x(&self) -> f32 {
        (self.x_min + self.x_max) / 2.0
    }

    /// Vertical center, the coordinate lines are clustered on.
    pub fn center_y(&self) -> f32 {
        (self.y_min + self.y_max) / 2.0
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub fn to_array(&self) -> RegionCoords {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    /// Integer pixel rectangle `(x, y, width, height)` covering the box.
    pub fn pixel_rect(&self) -> (u32, u32, u32, u32) {
        let x = self.x_min.floor().max(0.0) as u32;
        let y = self.y_min.floor().max(0.0) as u32;
        let width = (self.x_max.ceil() as u32).saturating_sub(x).max(1);
        let height = (self.y_max.ceil() as u32).saturating_sub(y).max(1);
        (x, y, width, height)
    }
}

impl TryFrom<RegionCoords> for BoundingBox {
    type Error = GeometryError;

    fn try_from(coords: RegionCoords) -> Result<Self, Self::Error> {
        BoundingBox::new(coords[0], coords[1], coords[2], coords[3])
    }
}

impl From<BoundingBox> for RegionCoords {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

/// One recognized region: its box and the recognizer's transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    bbox: BoundingBox,
    text: String,
}

impl Fragment {
    pub fn new(bbox: BoundingBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
        }
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

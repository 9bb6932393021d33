//! Plate origin calculation for multi-plate projects.
//!
//! Plates of a project live side by side in one logical grid; each cell is
//! the bed extent plus a 20% gap. The origin of a plate is the offset of its
//! cell, which the engine subtracts so the emitted G-code is plate-local.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDictionary, ConfigValue};

/// Key holding the printable bed outline (`"0x0,256x0,256x256,0x256"`).
pub const PRINTABLE_AREA_KEY: &str = "printable_area";

/// Gap between logical plates, as a fraction of the bed extent.
const PLATE_GAP: f64 = 0.2;

/// A point in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point2 {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// What a project records about its plates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlateMetadata {
    /// Vendor printer model id of the selected plate (e.g. `N2S`).
    pub printer_model_id: Option<String>,
    /// First entry of the plate's nozzle diameter list (e.g. `0.4`).
    pub nozzle_variant: Option<String>,
    /// Number of plates in the project.
    pub total_plates: usize,
    /// Selected plate, 0-based, clamped to the plate list.
    pub selected_index: Option<usize>,
}

/// Bounding box of the printable area.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BedShape {
    min: Point2,
    max: Point2,
}

impl BedShape {
    /// Bounding box of `points`; empty input yields a degenerate bed.
    #[must_use]
    pub fn from_points(points: &[Point2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        points.iter().fold(
            Self {
                min: *first,
                max: *first,
            },
            |bed, p| Self {
                min: Point2::new(bed.min.x.min(p.x), bed.min.y.min(p.y)),
                max: Point2::new(bed.max.x.max(p.x), bed.max.y.max(p.y)),
            },
        )
    }

    /// Bed shape from the `printable_area` option of `config`.
    ///
    /// Entries that are not of the form `<x>x<y>` are ignored.
    #[must_use]
    pub fn from_config(config: &ConfigDictionary) -> Self {
        let points: Vec<Point2> = config
            .get(PRINTABLE_AREA_KEY)
            .map(ConfigValue::string_items)
            .unwrap_or_default()
            .iter()
            .flat_map(|item| item.split([',', ';']))
            .filter_map(parse_point)
            .collect();
        Self::from_points(&points)
    }

    /// Width of the bed in millimetres.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Depth of the bed in millimetres.
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Return `true` if the bed has no area.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.depth() > 0.0)
    }

    fn stride(&self) -> Point2 {
        Point2::new(
            self.width() * (1.0 + PLATE_GAP),
            self.depth() * (1.0 + PLATE_GAP),
        )
    }
}

/// Offset subtracted from model coordinates for the selected plate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PlacementTransform {
    /// X offset in millimetres.
    pub x: f64,
    /// Y offset in millimetres.
    pub y: f64,
}

impl fmt::Display for PlacementTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Compute the plate origin.
///
/// When instance placements are known, the first one is snapped to the
/// nearest grid cell. Otherwise the 0-based `plate_index` (default 0) is laid
/// out row-major in a square-ish grid of `ceil(sqrt(total_plates))` columns.
/// Rows grow towards negative Y. A degenerate bed yields `(0, 0)`.
///
/// # Examples
///
/// ```
/// use orcaslicer_cli::plate::{BedShape, Point2, compute_origin};
///
/// let bed = BedShape::from_points(&[Point2::new(0.0, 0.0), Point2::new(100.0, 100.0)]);
/// let origin = compute_origin(&bed, Some(3), 4, &[]);
/// assert_eq!((origin.x, origin.y), (120.0, -120.0));
/// ```
#[must_use]
pub fn compute_origin(
    bed: &BedShape,
    plate_index: Option<usize>,
    total_plates: usize,
    instances: &[Point2],
) -> PlacementTransform {
    if bed.is_degenerate() {
        return PlacementTransform::default();
    }
    let stride = bed.stride();

    let (col, row) = instances.first().map_or_else(
        || {
            let columns = ceil_sqrt(total_plates.max(1));
            let index = plate_index.unwrap_or(0);
            (to_f64(index % columns), to_f64(index / columns))
        },
        |offset| ((offset.x / stride.x).round(), (-offset.y / stride.y).round()),
    );

    // `+ 0.0` folds a negative zero into positive zero.
    PlacementTransform {
        x: col * stride.x + 0.0,
        y: -(row * stride.y) + 0.0,
    }
}

fn ceil_sqrt(n: usize) -> usize {
    let mut columns: usize = 1;
    while columns.saturating_mul(columns) < n {
        columns += 1;
    }
    columns
}

fn to_f64(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::from(u32::MAX), f64::from)
}

fn parse_point(raw: &str) -> Option<Point2> {
    let (x, y) = raw.trim().split_once(['x', 'X'])?;
    Some(Point2::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

use crate::geometry::point::Point;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Bounding box of a point sequence, `None` for fewer than 3 points.
    pub fn of_points(points: &[Point]) -> Option<Bounds> {
        if points.len() < 3 {
            return None;
        }

        let (mut x_min, mut y_min) = (f64::MAX, f64::MAX);
        let (mut x_max, mut y_max) = (f64::MIN, f64::MIN);

        for point in points {
            x_min = x_min.min(point.0);
            y_min = y_min.min(point.1);
            x_max = x_max.max(point.0);
            y_max = y_max.max(point.1);
        }

        Some(Bounds {
            x: x_min,
            y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
        })
    }

    pub fn x_max(&self) -> f64 {
        self.x + self.width
    }

    pub fn y_max(&self) -> f64 {
        self.y + self.height
    }

    /// Strictly smaller in both dimensions than `other`.
    pub fn fits_within(&self, other: &Bounds) -> bool {
        self.width < other.width && self.height < other.height
    }

    /// Larger than `other` in both dimensions.
    pub fn exceeds(&self, other: &Bounds) -> bool {
        self.width > other.width && self.height > other.height
    }
}

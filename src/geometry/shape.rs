use crate::config::{ELLIPSE_SEGMENTS, FULL_EXTENT_MM, OVERLAP_EPSILON};
use crate::types::Location;
use geo::{
    Area, BooleanOps, BoundingRect, Contains, Coord, Intersects, LineString, MultiPolygon, Point,
    Polygon, Rect, Rotate, Translate,
};
use std::f64::consts::PI;

/// A planar region in millimetres, possibly disjoint or holed.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    area: MultiPolygon<f64>,
}

impl Shape {
    pub fn empty() -> Self {
        Shape {
            area: MultiPolygon::new(Vec::new()),
        }
    }

    /// Covers the whole board and then some
    pub fn full() -> Self {
        Shape::rect(
            -FULL_EXTENT_MM,
            -FULL_EXTENT_MM,
            2.0 * FULL_EXTENT_MM,
            2.0 * FULL_EXTENT_MM,
        )
    }

    /// Axis aligned rectangle with its minimum corner at `(x, y)`
    pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Self {
        let rect = Rect::new(Coord { x, y }, Coord { x: x + w, y: y + h });
        Shape::from_polygon(rect.to_polygon())
    }

    /// Rectangle of the given size centred on the origin
    pub fn centered_rect(w: f64, h: f64) -> Self {
        Shape::rect(-w / 2.0, -h / 2.0, w, h)
    }

    /// Ellipse inscribed in the rectangle at `(x, y)` of size `w` by `h`
    pub fn ellipse(x: f64, y: f64, w: f64, h: f64) -> Self {
        let (cx, cy) = (x + w / 2.0, y + h / 2.0);
        let (rx, ry) = (w / 2.0, h / 2.0);
        let ring: Vec<(f64, f64)> = (0..ELLIPSE_SEGMENTS)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / ELLIPSE_SEGMENTS as f64;
                (cx + rx * a.cos(), cy + ry * a.sin())
            })
            .collect();
        Shape::polygon(&ring)
    }

    pub fn polygon(points: &[(f64, f64)]) -> Self {
        if points.len() < 3 {
            return Shape::empty();
        }
        Shape::from_polygon(Polygon::new(LineString::from(points.to_vec()), Vec::new()))
    }

    fn from_polygon(polygon: Polygon<f64>) -> Self {
        Shape {
            area: MultiPolygon::new(vec![polygon]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.area.0.is_empty() || self.area() <= OVERLAP_EPSILON
    }

    pub fn area(&self) -> f64 {
        self.area.unsigned_area()
    }

    pub fn union(&self, other: &Shape) -> Shape {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        Shape {
            area: self.area.union(&other.area),
        }
    }

    pub fn subtract(&self, other: &Shape) -> Shape {
        if self.is_empty() || other.is_empty() {
            return self.clone();
        }
        Shape {
            area: self.area.difference(&other.area),
        }
    }

    pub fn intersect(&self, other: &Shape) -> Shape {
        if self.is_empty() || other.is_empty() {
            return Shape::empty();
        }
        Shape {
            area: self.area.intersection(&other.area),
        }
    }

    pub fn xor(&self, other: &Shape) -> Shape {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        Shape {
            area: self.area.xor(&other.area),
        }
    }

    /// Rotates about the origin by `loc.theta`, then translates to `(loc.x, loc.y)`
    pub fn transformed(&self, loc: &Location) -> Shape {
        let rotated = self
            .area
            .rotate_around_point(loc.theta.to_degrees(), Point::new(0.0, 0.0));
        Shape {
            area: rotated.translate(loc.x, loc.y),
        }
    }

    /// True when the two regions share a positive area; touching edges do not count
    pub fn overlaps(&self, other: &Shape) -> bool {
        match (self.bounds(), other.bounds()) {
            (Some(a), Some(b)) if a.intersects(&b) => {
                self.area.intersection(&other.area).unsigned_area() > OVERLAP_EPSILON
            }
            _ => false,
        }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.area.contains(&Point::new(x, y))
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.area.bounding_rect()
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::empty()
    }
}

//! Shape geometry: where beats sit on a circle or regular polygon, and
//! where the cursor is for a given progress.
//!
//! Screen coordinates: y grows downwards, the first vertex is at the top and
//! shapes are walked clockwise.

pub mod easing;
pub mod shape;

use std::f64::consts::PI;

use kurbo::{Circle, Point, Rect};

use crate::error::{Error, Result};

pub use easing::{ease_in, ease_in_out, ease_out, Easing, EasingMass};
pub use shape::{CursorMode, Shape, ShapeKind};

/// A polygon edge, start to end.
pub type Segment = (Point, Point);

/// Angle of the top of a shape.
const TOP: f64 = -PI / 2.0;

/// Largest square centred in a `width` × `height` area, inset by `padding`.
pub fn largest_square(width: f64, height: f64, padding: f64) -> Rect {
    let side = (width - padding).min(height - padding).max(0.0);
    let x = (width - side) / 2.0;
    let y = (height - side) / 2.0;
    Rect::new(x, y, x + side, y + side)
}

/// Circle inscribed in `square`.
pub fn square_circle(square: Rect) -> Circle {
    Circle::new(square.center(), square.width().min(square.height()) / 2.0)
}

/// Same centre, radius scaled by `size_ratio`.
pub fn bound_circle(circle: Circle, size_ratio: f64) -> Circle {
    Circle::new(circle.center, circle.radius * size_ratio)
}

/// Regular polygon inside `circle` with its first vertex at the top.
///
/// The polygon fills `size_ratio` of the circle's height whatever the number
/// of sides; odd polygons are shifted down so their top vertex and bottom
/// edge are centred vertically.
pub fn bound_polygon(circle: Circle, sides: usize, size_ratio: f64) -> Result<Vec<Point>> {
    if sides < 3 {
        return Err(Error::TooFewSides(sides));
    }

    let diameter = circle.radius * 2.0 * size_ratio;
    let radius_factor = if sides % 2 == 0 {
        2.0
    } else {
        1.0 + (PI / sides as f64).cos()
    };
    let radius = diameter / radius_factor;
    let shift = radius - diameter / 2.0;
    let step = 2.0 * PI / sides as f64;

    Ok((0..sides)
        .map(|side| {
            let angle = TOP + side as f64 * step;
            Point::new(
                circle.center.x + radius * angle.cos(),
                circle.center.y + shift + radius * angle.sin(),
            )
        })
        .collect())
}

/// Linear interpolation from `start` to `end`.
pub fn progress_in_range(start: f64, end: f64, progress: f64) -> f64 {
    start + (end - start) * progress
}

pub fn point_in_segment(segment: Segment, progress: f64) -> Point {
    segment.0.lerp(segment.1, progress)
}

/// Edge `index` of `polygon`, wrapping around.
pub fn polygon_segment(polygon: &[Point], index: usize) -> Option<Segment> {
    if polygon.is_empty() {
        return None;
    }
    let n = polygon.len();
    Some((polygon[index % n], polygon[(index + 1) % n]))
}

pub fn polygon_segments(polygon: &[Point]) -> Vec<Segment> {
    (0..polygon.len())
        .filter_map(|i| polygon_segment(polygon, i))
        .collect()
}

/// Point at `progress` (`[0, 1)`) around the polygon. `easing` shapes the
/// motion along each edge.
pub fn point_in_polygon(polygon: &[Point], progress: f64, easing: Easing) -> Option<Point> {
    let n = polygon.len();
    if n == 0 {
        return None;
    }
    let scaled = progress.clamp(0.0, 1.0) * n as f64;
    let index = (scaled.floor() as usize).min(n - 1);
    let within = scaled - index as f64;
    let segment = polygon_segment(polygon, index)?;
    Some(point_in_segment(segment, easing.apply(within)))
}

/// `divisions` evenly spaced points around `circle`, starting at the top.
pub fn points_in_circle(circle: Circle, divisions: usize) -> Vec<Point> {
    (0..divisions)
        .map(|i| point_in_circle_division(circle, divisions, i, 0.0, Easing::LINEAR))
        .collect()
}

/// Point `progress` of the way along arc `division_index` of a circle cut
/// into `divisions` arcs.
pub fn point_in_circle_division(
    circle: Circle,
    divisions: usize,
    division_index: usize,
    progress: f64,
    easing: Easing,
) -> Point {
    let step = 2.0 * PI / divisions.max(1) as f64;
    let angle = TOP + (division_index as f64 + easing.apply(progress)) * step;
    Point::new(
        circle.center.x + circle.radius * angle.cos(),
        circle.center.y + circle.radius * angle.sin(),
    )
}

//! The metronome shape: division marks, subdivision marks and the cursor.

use kurbo::{Circle, Point, Rect};
use serde::Deserialize;

use crate::error::Result;
use crate::metronome::{MetronomeProgress, Signature, Subdivision};

use super::easing::{ease_in, Easing, EasingMass};
use super::{
    bound_circle, bound_polygon, point_in_circle_division, point_in_segment, points_in_circle,
    polygon_segment, polygon_segments, square_circle,
};

/// Share of the container the shape fills.
pub const SIZE_RATIO: f64 = 0.85;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    #[default]
    Polygon,
}

/// How the cursor moves within a beat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorMode {
    /// Eased in by the cursor mass: slow off each beat, fast into the next.
    #[default]
    Mass,
    Linear,
}

impl CursorMode {
    pub fn easing(self, mass: EasingMass) -> Easing {
        match self {
            CursorMode::Mass => ease_in(mass),
            CursorMode::Linear => Easing::LINEAR,
        }
    }
}

/// A laid-out shape with one vertex (or arc start) per beat.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle { circle: Circle, divisions: usize },
    Polygon { vertices: Vec<Point> },
}

impl Shape {
    /// Lay out a shape of `kind` for `signature` inside `container`.
    pub fn build(kind: ShapeKind, container: Rect, signature: Signature) -> Result<Self> {
        let circle = square_circle(container);
        let divisions = signature.beats() as usize;
        Ok(match kind {
            ShapeKind::Circle => Shape::Circle {
                circle: bound_circle(circle, SIZE_RATIO),
                divisions,
            },
            ShapeKind::Polygon => Shape::Polygon {
                vertices: bound_polygon(circle, divisions, SIZE_RATIO)?,
            },
        })
    }

    pub fn divisions(&self) -> usize {
        match self {
            Shape::Circle { divisions, .. } => *divisions,
            Shape::Polygon { vertices } => vertices.len(),
        }
    }

    /// Where each beat starts.
    pub fn division_points(&self) -> Vec<Point> {
        match self {
            Shape::Circle { circle, divisions } => points_in_circle(*circle, *divisions),
            Shape::Polygon { vertices } => vertices.clone(),
        }
    }

    /// Subdivision marks inside each beat, grouped by beat. Empty with one
    /// subdivision per beat.
    pub fn subdivision_points(&self, subdivisions: Subdivision) -> Vec<Vec<Point>> {
        let count = subdivisions.count();
        if count <= 1 {
            return Vec::new();
        }
        let ratios: Vec<f64> = (1..count).map(|i| i as f64 / count as f64).collect();

        match self {
            Shape::Circle { circle, divisions } => (0..*divisions)
                .map(|division| {
                    ratios
                        .iter()
                        .map(|&t| {
                            point_in_circle_division(
                                *circle,
                                *divisions,
                                division,
                                t,
                                Easing::LINEAR,
                            )
                        })
                        .collect()
                })
                .collect(),
            Shape::Polygon { vertices } => polygon_segments(vertices)
                .into_iter()
                .map(|segment| ratios.iter().map(|&t| point_in_segment(segment, t)).collect())
                .collect(),
        }
    }

    /// Cursor position for a progress snapshot.
    pub fn cursor_point(&self, progress: &MetronomeProgress, easing: Easing) -> Point {
        let division = progress.division_index as usize;
        let within = progress.progress_in_division;
        match self {
            Shape::Circle { circle, divisions } => {
                point_in_circle_division(*circle, *divisions, division, within, easing)
            }
            Shape::Polygon { vertices } => polygon_segment(vertices, division)
                .map(|segment| point_in_segment(segment, easing.apply(within)))
                .unwrap_or(Point::ORIGIN),
        }
    }
}

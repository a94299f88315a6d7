use egui::{Color32, Pos2, Rect};
use serde::{Deserialize, Serialize};

// Immutable stroke as stored in the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    points: Vec<Pos2>,
    color: Color32,
    thickness: f32,
}

// Stroke under construction while the pointer is down
#[derive(Debug, Clone)]
pub struct MutableStroke {
    points: Vec<Pos2>,
    color: Color32,
    thickness: f32,
}

impl Stroke {
    pub fn new(color: Color32, thickness: f32, points: Vec<Pos2>) -> Self {
        Self {
            points,
            color,
            thickness,
        }
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn thickness(&self) -> f32 {
        self.thickness
    }

    /// Area covered by the stroke, including its width.
    pub fn bounds(&self) -> Rect {
        Rect::from_points(&self.points).expand(self.thickness * 0.5)
    }

    /// Distance from `pos` to the stroke's outline; zero or less means inside.
    pub fn distance_to(&self, pos: Pos2) -> f32 {
        let centerline = match self.points.as_slice() {
            [] => return f32::INFINITY,
            [only] => pos.distance(*only),
            points => points
                .windows(2)
                .map(|pair| distance_to_segment(pos, pair[0], pair[1]))
                .fold(f32::INFINITY, f32::min),
        };
        centerline - self.thickness * 0.5
    }
}

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

impl MutableStroke {
    pub fn new(color: Color32, thickness: f32) -> Self {
        Self {
            points: Vec::new(),
            color,
            thickness,
        }
    }

    // Consecutive duplicates carry no geometry, drop them
    pub fn add_point(&mut self, point: Pos2) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_stroke(self) -> Stroke {
        Stroke::new(self.color, self.thickness, self.points)
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn thickness(&self) -> f32 {
        self.thickness
    }
}

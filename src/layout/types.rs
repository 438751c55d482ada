use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{PersonId, RelationKind};

/// Layout-space point. `y` grows upward: children sit below their parents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Position store: one point per person, rewritten on every layout pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Positions {
    points: BTreeMap<PersonId, Point>,
}

impl Positions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PersonId) -> Option<Point> {
        self.points.get(id).copied()
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.points.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonId, Point)> + '_ {
        self.points.iter().map(|(id, point)| (id, *point))
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
    }

    pub(crate) fn set(&mut self, id: &PersonId, point: Point) {
        self.points.insert(id.clone(), point);
    }

    pub(crate) fn shift_x(&mut self, id: &PersonId, dx: f32) {
        if let Some(point) = self.points.get_mut(id) {
            point.x += dx;
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: PersonId,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Partner drawn in the same couple block, if any.
    pub partner: Option<PersonId>,
}

#[derive(Debug, Clone)]
pub struct ConnectorLayout {
    pub kind: RelationKind,
    pub from: PersonId,
    pub to: PersonId,
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn width(&self) -> f32 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.max_y - self.min_y).max(0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub nodes: BTreeMap<PersonId, NodeLayout>,
    pub connectors: Vec<ConnectorLayout>,
    pub roots: Vec<PersonId>,
    pub bounds: Bounds,
}

impl Layout {
    pub fn position(&self, id: &PersonId) -> Option<Point> {
        self.nodes.get(id).map(|node| Point::new(node.x, node.y))
    }
}

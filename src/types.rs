use glam::Vec2;

/// Opaque identity of a tracked entity (pack your game-side handle into it).
pub type EntityKey = u64;

/// Index of a static line inside the collision system that owns it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(pub u32);

/// One edge of level geometry.
///
/// The solid side of a line is to the left of `p1 -> p2`: the one-sided
/// normal is `(-dy, dx)` and circles whose center lies behind it are culled.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Line {
    pub p1: Vec2,
    pub p2: Vec2,
    /// Friction coefficient handed to the solver for contacts on this edge.
    pub grip: f32,
}

impl Line {
    pub fn new(p1: Vec2, p2: Vec2, grip: f32) -> Self {
        Self { p1, p2, grip }
    }

    /// Direction vector `p2 - p1` (not normalized).
    #[inline]
    pub fn delta(&self) -> Vec2 {
        self.p2 - self.p1
    }

    /// Unnormalized one-sided normal `(-dy, dx)`.
    #[inline]
    pub fn side_normal(&self) -> Vec2 {
        self.delta().perp()
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.p1.min(self.p2), self.p1.max(self.p2))
    }
}

/// Contact surface parameters consumed by the constraint solver.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Surface {
    /// Friction coefficient (the touched line's grip).
    pub grip: f32,
    /// Error reduction parameter.
    pub erp: f32,
    /// Constraint force mixing.
    pub cfm: f32,
}

/// Where a contact came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContactSource {
    /// A line registered with `define_line`.
    Static(LineId),
    /// Index into the dynamic lines supplied for the current step.
    Dynamic(usize),
}

/// A single point of penetration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    pub position: Vec2,
    /// Unit normal pushing the body out of the geometry.
    pub normal: Vec2,
    /// Penetration depth (>= 0).
    pub depth: f32,
    pub surface: Surface,
    pub source: ContactSource,
}

impl Contact {
    /// True when the contact was produced by a moving-block line.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, ContactSource::Dynamic(_))
    }
}

/// Grid health summary for level tuning.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CollisionStats {
    pub grid_width: usize,
    pub grid_height: usize,
    pub cell_width: f32,
    pub cell_height: f32,
    /// Share of cells (0..=100) that reference no line.
    pub percentage_of_empty_cells: f32,
    pub total_lines: usize,
}

/// World-space rectangle of one grid cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellBox {
    pub min: Vec2,
    pub max: Vec2,
}

/// Which query produced a trace.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceKind {
    /// Boolean checks (`check_circle`).
    Check,
    /// Contact generation (`collide_circle`).
    Contact,
}

/// Cells and lines visited by a single query, for the debug overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryTrace {
    pub kind: TraceKind,
    pub cells: Vec<CellBox>,
    pub lines: Vec<LineId>,
}

impl QueryTrace {
    pub fn new(kind: TraceKind) -> Self {
        Self {
            kind,
            cells: Vec::new(),
            lines: Vec::new(),
        }
    }
}

/// Segment/circle intersection points (0, 1 or 2).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SegmentCircleHits {
    None,
    One(Vec2),
    Two(Vec2, Vec2),
}

impl SegmentCircleHits {
    pub fn count(&self) -> usize {
        match self {
            SegmentCircleHits::None => 0,
            SegmentCircleHits::One(_) => 1,
            SegmentCircleHits::Two(..) => 2,
        }
    }

    pub fn points(self) -> impl Iterator<Item = Vec2> {
        let (a, b) = match self {
            SegmentCircleHits::None => (None, None),
            SegmentCircleHits::One(p) => (Some(p), None),
            SegmentCircleHits::Two(p, q) => (Some(p), Some(q)),
        };
        a.into_iter().chain(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_side_normal_points_left() {
        let l = Line::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), 1.0);
        assert_eq!(l.side_normal(), Vec2::new(0.0, 2.0));
        let (min, max) = Line::new(Vec2::new(3.0, -1.0), Vec2::new(1.0, 4.0), 1.0).bounds();
        assert_eq!(min, Vec2::new(1.0, -1.0));
        assert_eq!(max, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_hits_points_order() {
        let h = SegmentCircleHits::Two(Vec2::X, Vec2::Y);
        assert_eq!(h.count(), 2);
        let pts: Vec<Vec2> = h.points().collect();
        assert_eq!(pts, vec![Vec2::X, Vec2::Y]);
        assert_eq!(SegmentCircleHits::None.points().count(), 0);
    }
}

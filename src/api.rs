use glam::Vec2;

use crate::config::CollisionConfig;
use crate::error::CollisionError;
use crate::types::*;

/// Public API contract for the level collision system.
pub trait CollisionSystemApi {
    /// Construct an empty system (no grid until `set_dims`).
    fn new(cfg: CollisionConfig) -> Self
    where
        Self: Sized;

    // --- Level lifecycle ---------------------------------------------------

    /// Drop the grid and all level geometry. Tracked entities survive without a cell.
    fn reset(&mut self);

    /// Define the level bounding box and build the grid for it.
    fn set_dims(&mut self, min: Vec2, max: Vec2) -> Result<(), CollisionError>;

    /// Register one permanent edge of level geometry.
    fn define_line(&mut self, p1: Vec2, p2: Vec2, grip: f32) -> LineId;

    // --- Moving block geometry ---------------------------------------------

    /// Add a line of a moving block for the current step.
    fn add_dynamic_line(&mut self, line: Line);

    /// Forget every dynamic line (call once per step before re-adding).
    fn clear_dynamic_lines(&mut self);

    // --- Queries -----------------------------------------------------------

    /// True if the circle overlaps any line, moving-block lines first.
    fn check_circle(&self, center: Vec2, r: f32) -> bool;

    /// Over-approximation: true if any cell touched by the box holds a line.
    fn check_box_fast(&self, min: Vec2, max: Vec2) -> bool;

    /// True if the segment crosses any static line.
    fn check_line(&self, a: Vec2, b: Vec2) -> bool;

    /// Contacts between a circle and the level, at most `max_contacts`.
    fn collide_circle(&self, center: Vec2, r: f32, max_contacts: usize) -> Vec<Contact>;

    /// Contacts where a segment crosses the level, at most `max_contacts`.
    fn collide_line(&self, a: Vec2, b: Vec2, max_contacts: usize) -> Vec<Contact>;

    // --- Tracked entities --------------------------------------------------

    fn add_entity(&mut self, key: EntityKey, pos: Vec2) -> Result<(), CollisionError>;

    fn remove_entity(&mut self, key: EntityKey) -> Result<(), CollisionError>;

    fn move_entity(&mut self, key: EntityKey, pos: Vec2) -> Result<(), CollisionError>;

    /// Keys of entities whose cell is touched by the box.
    fn entities_near(&self, min: Vec2, max: Vec2) -> Vec<EntityKey>;

    // --- Diagnostics -------------------------------------------------------

    fn stats(&self) -> CollisionStats;

    /// Enable trace recording for the `*_traced` query variants.
    fn set_debug(&mut self, enabled: bool);
}

/// Segment primitives used by the collision queries.
pub trait NarrowphaseApi {
    /// Intersections of the segment `a0..a1` with the circle boundary.
    fn segment_circle(center: Vec2, r: f32, a0: Vec2, a1: Vec2) -> SegmentCircleHits;

    /// Crossing point of two segments, if any.
    fn segment_segment(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> Option<Vec2>;

    /// `r - |center - p|`, clamped at zero.
    fn point_depth(center: Vec2, r: f32, p: Vec2) -> f32;

    /// True if `p` lies strictly behind the one-sided normal of `line`.
    fn is_behind(line: &Line, p: Vec2) -> bool;

    fn overlap_point_circle(p: Vec2, c: Vec2, r: f32) -> bool;
}

use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::types::*;

/// Parametric slack when deciding whether a root lies on the segment.
const SEGMENT_SLACK: f64 = 0.0001;
/// Denominators below this are treated as parallel lines.
const PARALLEL_EPSILON: f32 = 0.0001;

/// Exact segment tests used after the grid has picked candidate lines.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn segment_circle(center: Vec2, r: f32, a0: Vec2, a1: Vec2) -> SegmentCircleHits {
        // Box reject before the quadratic
        let (lo, hi) = (a0.min(a1), a0.max(a1));
        if hi.x < center.x - r || lo.x > center.x + r {
            return SegmentCircleHits::None;
        }
        if hi.y < center.y - r || lo.y > center.y + r {
            return SegmentCircleHits::None;
        }
        if a0.abs_diff_eq(a1, f32::EPSILON) {
            return SegmentCircleHits::None;
        }

        // Solved in f64: thin lines on large levels lose roots in f32.
        let p0 = a0.as_dvec2();
        let c = center.as_dvec2();
        let d = a1.as_dvec2() - p0;
        let len = d.length();
        let dir = d / len;
        let v = p0 - c;
        let b = -v.dot(dir);
        let rr = r as f64;
        let mut det = b * b - v.dot(v) + rr * rr;
        if det < 0.0 && det > -SEGMENT_SLACK {
            det = 0.0;
        }
        if det < 0.0 {
            return SegmentCircleHits::None;
        }

        let det = det.sqrt();
        let on_segment = |t: f64| t > -SEGMENT_SLACK && t < len + SEGMENT_SLACK;
        let at = |t: f64| -> Vec2 { (p0 + dir * t).as_vec2() };
        let (t1, t2) = (b - det, b + det);
        match (on_segment(t1), on_segment(t2)) {
            (true, true) => SegmentCircleHits::Two(at(t1), at(t2)),
            (true, false) => SegmentCircleHits::One(at(t1)),
            (false, true) => SegmentCircleHits::One(at(t2)),
            (false, false) => SegmentCircleHits::None,
        }
    }

    fn segment_segment(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> Option<Vec2> {
        if a0.abs_diff_eq(a1, f32::EPSILON) || b0.abs_diff_eq(b1, f32::EPSILON) {
            return None;
        }
        let (alo, ahi) = (a0.min(a1), a0.max(a1));
        let (blo, bhi) = (b0.min(b1), b0.max(b1));
        if ahi.x < blo.x || alo.x > bhi.x || ahi.y < blo.y || alo.y > bhi.y {
            return None;
        }

        let da = a1 - a0;
        let db = b1 - b0;

        // Parameter along A where it crosses the infinite line B
        let nb = db.perp();
        let den = nb.dot(da);
        if den.abs() < PARALLEL_EPSILON {
            return None;
        }
        let ta = nb.dot(b0 - a0) / den;
        if !(0.0..=1.0).contains(&ta) {
            return None;
        }

        // And the other way round
        let na = da.perp();
        let den = na.dot(db);
        if den.abs() < PARALLEL_EPSILON {
            return None;
        }
        let tb = na.dot(a0 - b0) / den;
        if !(0.0..=1.0).contains(&tb) {
            return None;
        }
        Some(b0 + db * tb)
    }

    fn point_depth(center: Vec2, r: f32, p: Vec2) -> f32 {
        (r - center.distance(p)).max(0.0)
    }

    fn is_behind(line: &Line, p: Vec2) -> bool {
        let n = line.side_normal();
        n.dot(p) < n.dot(line.p1)
    }

    fn overlap_point_circle(p: Vec2, c: Vec2, r: f32) -> bool {
        let d = p - c;
        d.length_squared() <= r * r
    }
}

/// Unit normal of `line` facing `p`, or `None` for a zero-length line.
pub(crate) fn facing_normal(line: &Line, p: Vec2) -> Option<Vec2> {
    let n = line.side_normal().try_normalize()?;
    if n.dot(p - line.p1) < 0.0 { Some(-n) } else { Some(n) }
}

use glam::Vec2;

use std::collections::{HashMap, HashSet};

use slotmap::SlotMap;

use crate::api::{CollisionSystemApi, NarrowphaseApi};
use crate::config::{CollisionConfig, LineCulling};
use crate::entities::{ColEntity, EntityHandle};
use crate::error::CollisionError;
use crate::narrowphase::{Narrowphase, facing_normal};
use crate::types::*;

/// Uniform-grid collision system over static level lines.
pub struct CollisionSystem {
    pub(crate) cfg: CollisionConfig,
    pub(crate) debug: bool,

    // Level geometry, owned; cells refer to it by `LineId`
    lines: Vec<Line>,
    // Moving-block lines for the current step, never indexed
    dynamic_lines: Vec<Line>,

    pub(crate) grid: Option<Grid>,

    pub(crate) entities: SlotMap<EntityHandle, ColEntity>,
    pub(crate) entity_index: HashMap<EntityKey, EntityHandle>,
}

/// Cell storage and geometry for one level.
pub(crate) struct Grid {
    pub(crate) min: Vec2,
    pub(crate) max: Vec2,
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) cell_size: Vec2,
    pub(crate) cells: Vec<GridCell>,
}

#[derive(Default)]
pub(crate) struct GridCell {
    pub(crate) lines: Vec<LineId>,
    pub(crate) entities: Vec<EntityHandle>,
}

/// What a line visitor did with the line it was handed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Visit {
    /// Not tested (culled or degenerate).
    Skip,
    Tested,
    /// Tested, and the walk ends here.
    Stop,
}

/// Inclusive rectangle of cell coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CellRange {
    pub(crate) x0: usize,
    pub(crate) x1: usize,
    pub(crate) y0: usize,
    pub(crate) y1: usize,
}

impl CellRange {
    /// Column-major walk: x outer, y inner.
    pub(crate) fn iter(self) -> impl Iterator<Item = (usize, usize)> {
        (self.x0..=self.x1).flat_map(move |cx| (self.y0..=self.y1).map(move |cy| (cx, cy)))
    }
}

/// Cells along one axis: the most (up to `max_cells`) whose size stays >= `min_cell`.
fn axis_cells(extent: f32, min_cell: f32, max_cells: usize) -> (usize, f32) {
    for n in (1..=max_cells).rev() {
        let size = extent / n as f32;
        if size >= min_cell {
            return (n, size);
        }
    }
    (1, extent)
}

impl Grid {
    fn build(min: Vec2, max: Vec2, cfg: &CollisionConfig) -> Result<Self, CollisionError> {
        let extent = max - min;
        let (width, cw) = axis_cells(extent.x, cfg.min_cell_size, cfg.max_grid_size);
        let (height, ch) = axis_cells(extent.y, cfg.min_cell_size, cfg.max_grid_size);
        let n = width * height;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(n)
            .map_err(|_| CollisionError::GridAllocation { cells: n })?;
        cells.resize_with(n, GridCell::default);
        Ok(Self {
            min,
            max,
            width,
            height,
            cell_size: Vec2::new(cw, ch),
            cells,
        })
    }

    #[inline]
    pub(crate) fn index(&self, cx: usize, cy: usize) -> usize {
        cx + cy * self.width
    }

    /// Map a box to the cells it touches after padding by `eps`.
    /// `None` when the box lies entirely beyond one side of the grid.
    pub(crate) fn cell_range(&self, min: Vec2, max: Vec2, eps: f32) -> Option<CellRange> {
        let extent = self.max - self.min;
        // Float-to-int casts saturate (NaN -> 0), so zero extents stay in range.
        let to_cell = |v: f32, lo: f32, ext: f32, n: usize| -> i64 {
            (((v - lo) * n as f32) / ext).floor() as i64
        };
        let x0 = to_cell(min.x - eps, self.min.x, extent.x, self.width).max(0);
        let y0 = to_cell(min.y - eps, self.min.y, extent.y, self.height).max(0);
        let x1 = to_cell(max.x + eps, self.min.x, extent.x, self.width).min(self.width as i64 - 1);
        let y1 = to_cell(max.y + eps, self.min.y, extent.y, self.height).min(self.height as i64 - 1);
        if x0 > x1 || y0 > y1 {
            return None;
        }
        Some(CellRange {
            x0: x0 as usize,
            x1: x1 as usize,
            y0: y0 as usize,
            y1: y1 as usize,
        })
    }

    /// Cell holding a point, `None` outside the level box.
    pub(crate) fn cell_of(&self, p: Vec2) -> Option<usize> {
        if !p.is_finite() || p.x < self.min.x || p.y < self.min.y || p.x > self.max.x || p.y > self.max.y {
            return None;
        }
        // Clamp first so points on the max edge land in the last row/column.
        let p = p.min(self.max - self.cell_size * 0.5).max(self.min);
        let r = self.cell_range(p, p, 0.0)?;
        Some(self.index(r.x0, r.y0))
    }

    fn cell_box(&self, cx: usize, cy: usize) -> CellBox {
        let lo = self.min + self.cell_size * Vec2::new(cx as f32, cy as f32);
        CellBox {
            min: lo,
            max: lo + self.cell_size,
        }
    }

    fn insert_line(&mut self, id: LineId, line: &Line, eps: f32) {
        let (min, max) = line.bounds();
        if let Some(range) = self.cell_range(min, max, eps) {
            for (cx, cy) in range.iter() {
                let i = self.index(cx, cy);
                self.cells[i].lines.push(id);
            }
        }
    }
}

impl CollisionSystemApi for CollisionSystem {
    fn new(cfg: CollisionConfig) -> Self {
        Self {
            cfg,
            debug: false,
            lines: Vec::new(),
            dynamic_lines: Vec::new(),
            grid: None,
            entities: SlotMap::with_key(),
            entity_index: HashMap::new(),
        }
    }

    fn reset(&mut self) {
        self.grid = None;
        self.lines.clear();
        self.dynamic_lines.clear();
        for e in self.entities.values_mut() {
            e.cell = None;
        }
        log::debug!("collision system reset ({} tracked entities kept)", self.entities.len());
    }

    fn set_dims(&mut self, min: Vec2, max: Vec2) -> Result<(), CollisionError> {
        if self.grid.is_some() {
            return Err(CollisionError::GridAlreadyDefined);
        }
        let mut grid = Grid::build(min, max, &self.cfg)?;
        for (i, line) in self.lines.iter().enumerate() {
            grid.insert_line(LineId(i as u32), line, self.cfg.cell_epsilon);
        }
        log::info!(
            "{}x{} grid with {:.2}x{:.2} cells",
            grid.width,
            grid.height,
            grid.cell_size.x,
            grid.cell_size.y
        );
        self.grid = Some(grid);
        self.rebind_entities();
        Ok(())
    }

    fn define_line(&mut self, p1: Vec2, p2: Vec2, grip: f32) -> LineId {
        let id = LineId(self.lines.len() as u32);
        let line = Line::new(p1, p2, grip);
        if let Some(grid) = self.grid.as_mut() {
            grid.insert_line(id, &line, self.cfg.cell_epsilon);
        }
        log::trace!("line {:?}: {:?} -> {:?} grip {}", id, p1, p2, grip);
        self.lines.push(line);
        id
    }

    fn add_dynamic_line(&mut self, line: Line) {
        self.dynamic_lines.push(line);
    }

    fn clear_dynamic_lines(&mut self) {
        self.dynamic_lines.clear();
    }

    fn check_circle(&self, center: Vec2, r: f32) -> bool {
        self.check_circle_inner(center, r, None)
    }

    fn check_box_fast(&self, min: Vec2, max: Vec2) -> bool {
        let Some(grid) = self.grid.as_ref() else { return false };
        let Some(range) = grid.cell_range(min, max, self.cfg.cell_epsilon) else { return false };
        range
            .iter()
            .any(|(cx, cy)| !grid.cells[grid.index(cx, cy)].lines.is_empty())
    }

    fn check_line(&self, a: Vec2, b: Vec2) -> bool {
        let mut hit = false;
        self.walk_lines(a.min(b), a.max(b), None, |_, line| {
            if self.is_degenerate(line) {
                return Visit::Skip;
            }
            if Narrowphase::segment_segment(a, b, line.p1, line.p2).is_some() {
                hit = true;
                return Visit::Stop;
            }
            Visit::Tested
        });
        hit
    }

    fn collide_circle(&self, center: Vec2, r: f32, max_contacts: usize) -> Vec<Contact> {
        self.collide_circle_inner(center, r, max_contacts, None)
    }

    fn collide_line(&self, a: Vec2, b: Vec2, max_contacts: usize) -> Vec<Contact> {
        let mut out = Vec::new();
        if max_contacts == 0 {
            return out;
        }
        for (i, line) in self.dynamic_lines.iter().enumerate() {
            if out.len() >= max_contacts {
                return out;
            }
            self.segment_line_contact(line, ContactSource::Dynamic(i), a, b, &mut out, max_contacts);
        }
        if out.len() >= max_contacts {
            return out;
        }
        self.walk_lines(a.min(b), a.max(b), None, |id, line| {
            if self.is_degenerate(line) {
                return Visit::Skip;
            }
            self.segment_line_contact(line, ContactSource::Static(id), a, b, &mut out, max_contacts);
            if out.len() >= max_contacts { Visit::Stop } else { Visit::Tested }
        });
        out
    }

    fn add_entity(&mut self, key: EntityKey, pos: Vec2) -> Result<(), CollisionError> {
        self.track(key, pos)
    }

    fn remove_entity(&mut self, key: EntityKey) -> Result<(), CollisionError> {
        self.untrack(key)
    }

    fn move_entity(&mut self, key: EntityKey, pos: Vec2) -> Result<(), CollisionError> {
        self.relocate(key, pos)
    }

    fn entities_near(&self, min: Vec2, max: Vec2) -> Vec<EntityKey> {
        self.collect_near(min, max)
    }

    fn stats(&self) -> CollisionStats {
        let Some(grid) = self.grid.as_ref() else {
            return CollisionStats {
                percentage_of_empty_cells: 100.0,
                total_lines: self.lines.len(),
                ..Default::default()
            };
        };
        let empty = grid.cells.iter().filter(|c| c.lines.is_empty()).count();
        CollisionStats {
            grid_width: grid.width,
            grid_height: grid.height,
            cell_width: grid.cell_size.x,
            cell_height: grid.cell_size.y,
            percentage_of_empty_cells: 100.0 * empty as f32 / grid.cells.len() as f32,
            total_lines: self.lines.len(),
        }
    }

    fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

impl CollisionSystem {
    /// `check_circle` plus the cells and lines it visited when debug is on.
    pub fn check_circle_traced(&self, center: Vec2, r: f32) -> (bool, Option<QueryTrace>) {
        let mut trace = self.debug.then(|| QueryTrace::new(TraceKind::Check));
        let hit = self.check_circle_inner(center, r, trace.as_mut());
        (hit, trace)
    }

    /// `collide_circle` plus the cells and surviving lines it visited when debug is on.
    pub fn collide_circle_traced(
        &self,
        center: Vec2,
        r: f32,
        max_contacts: usize,
    ) -> (Vec<Contact>, Option<QueryTrace>) {
        let mut trace = self.debug.then(|| QueryTrace::new(TraceKind::Contact));
        let contacts = self.collide_circle_inner(center, r, max_contacts, trace.as_mut());
        (contacts, trace)
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.cfg
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    /// Static lines in definition order (`LineId` is the index).
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(id.0 as usize)
    }

    pub fn dynamic_lines(&self) -> &[Line] {
        &self.dynamic_lines
    }

    /// `(width, height)` in cells, once `set_dims` has run.
    pub fn grid_size(&self) -> Option<(usize, usize)> {
        self.grid.as_ref().map(|g| (g.width, g.height))
    }

    /// World rectangle of cell `(cx, cy)`.
    pub fn cell_box(&self, cx: usize, cy: usize) -> Option<CellBox> {
        let grid = self.grid.as_ref()?;
        (cx < grid.width && cy < grid.height).then(|| grid.cell_box(cx, cy))
    }

    /// Lines referenced by cell `(cx, cy)`; empty when out of range.
    pub fn lines_in_cell(&self, cx: usize, cy: usize) -> &[LineId] {
        match self.grid.as_ref() {
            Some(g) if cx < g.width && cy < g.height => g.cells[g.index(cx, cy)].lines.as_slice(),
            _ => &[],
        }
    }

    // --- internals ---------------------------------------------------------

    /// Visit each distinct line referenced by the cells a box touches, cell
    /// by cell. Cells are traced as they are entered; lines unless skipped.
    fn walk_lines(
        &self,
        min: Vec2,
        max: Vec2,
        mut trace: Option<&mut QueryTrace>,
        mut visit: impl FnMut(LineId, &Line) -> Visit,
    ) {
        let Some(grid) = self.grid.as_ref() else { return };
        let Some(range) = grid.cell_range(min, max, self.cfg.cell_epsilon) else { return };
        let mut seen = HashSet::new();
        for (cx, cy) in range.iter() {
            if let Some(t) = trace.as_deref_mut() {
                t.cells.push(grid.cell_box(cx, cy));
            }
            for &id in &grid.cells[grid.index(cx, cy)].lines {
                if !seen.insert(id) {
                    continue;
                }
                let step = visit(id, &self.lines[id.0 as usize]);
                if step != Visit::Skip {
                    if let Some(t) = trace.as_deref_mut() {
                        t.lines.push(id);
                    }
                }
                if step == Visit::Stop {
                    return;
                }
            }
        }
    }

    fn is_degenerate(&self, line: &Line) -> bool {
        let d = line.delta();
        let eps = self.cfg.degenerate_line_epsilon;
        d.x.abs() < eps && d.y.abs() < eps
    }

    /// Lines a circle centered at `center` can never touch.
    fn culled(&self, line: &Line, center: Vec2) -> bool {
        if self.cfg.culling == LineCulling::OneSided && Narrowphase::is_behind(line, center) {
            return true;
        }
        self.is_degenerate(line)
    }

    /// Endpoint-in-circle or boundary crossing.
    fn circle_touches(line: &Line, center: Vec2, r: f32) -> bool {
        Narrowphase::overlap_point_circle(line.p1, center, r)
            || Narrowphase::overlap_point_circle(line.p2, center, r)
            || Narrowphase::segment_circle(center, r, line.p1, line.p2).count() > 0
    }

    fn check_circle_inner(&self, center: Vec2, r: f32, trace: Option<&mut QueryTrace>) -> bool {
        // Moving blocks first
        if self
            .dynamic_lines
            .iter()
            .any(|line| !self.culled(line, center) && Self::circle_touches(line, center, r))
        {
            return true;
        }

        let rv = Vec2::splat(r);
        let mut hit = false;
        // Culled lines still count as visited in the trace.
        self.walk_lines(center - rv, center + rv, trace, |_, line| {
            if !self.culled(line, center) && Self::circle_touches(line, center, r) {
                hit = true;
                return Visit::Stop;
            }
            Visit::Tested
        });
        hit
    }

    fn collide_circle_inner(
        &self,
        center: Vec2,
        r: f32,
        max_contacts: usize,
        trace: Option<&mut QueryTrace>,
    ) -> Vec<Contact> {
        let mut out = Vec::new();
        if max_contacts == 0 {
            return out;
        }
        for (i, line) in self.dynamic_lines.iter().enumerate() {
            if out.len() >= max_contacts {
                return out;
            }
            if !self.culled(line, center) {
                self.circle_line_contacts(line, ContactSource::Dynamic(i), center, r, &mut out, max_contacts);
            }
        }
        if out.len() >= max_contacts {
            return out;
        }

        let rv = Vec2::splat(r);
        self.walk_lines(center - rv, center + rv, trace, |id, line| {
            if self.culled(line, center) {
                return Visit::Skip;
            }
            self.circle_line_contacts(line, ContactSource::Static(id), center, r, &mut out, max_contacts);
            if out.len() >= max_contacts { Visit::Stop } else { Visit::Tested }
        });
        out
    }

    /// Contacts of one circle against one (non-culled) line.
    fn circle_line_contacts(
        &self,
        line: &Line,
        source: ContactSource,
        center: Vec2,
        r: f32,
        out: &mut Vec<Contact>,
        max_contacts: usize,
    ) {
        // Each endpoint inside the circle yields its own corner contact.
        let mut corner = false;
        for p in [line.p1, line.p2] {
            if Narrowphase::overlap_point_circle(p, center, r) {
                corner = true;
                let normal = (center - p)
                    .try_normalize()
                    .or_else(|| facing_normal(line, center))
                    .unwrap_or(Vec2::Y);
                let depth = Narrowphase::point_depth(center, r, p);
                self.push_contact(out, self.contact(p, normal, depth, line, source), max_contacts);
            }
        }
        if corner {
            return;
        }

        let hits = Narrowphase::segment_circle(center, r, line.p1, line.p2);
        if hits.count() == 0 {
            return;
        }
        let Some(normal) = facing_normal(line, center) else { return };
        // Penetration measured against the line itself, not the crossing points.
        let dist = normal.dot(center - line.p1).abs();
        let depth = (r - dist).clamp(0.0, r.max(0.0));
        for p in hits.points() {
            self.push_contact(out, self.contact(p, normal, depth, line, source), max_contacts);
        }
    }

    /// Where a segment crosses one line, if it does.
    fn segment_line_contact(
        &self,
        line: &Line,
        source: ContactSource,
        a: Vec2,
        b: Vec2,
        out: &mut Vec<Contact>,
        max_contacts: usize,
    ) {
        if self.is_degenerate(line) {
            return;
        }
        let Some(hit) = Narrowphase::segment_segment(a, b, line.p1, line.p2) else { return };
        let Some(normal) = facing_normal(line, a) else { return };
        self.push_contact(out, self.contact(hit, normal, 0.0, line, source), max_contacts);
    }

    fn contact(&self, position: Vec2, normal: Vec2, depth: f32, line: &Line, source: ContactSource) -> Contact {
        let s = self.cfg.wheel_surface;
        // Micro-penetration is reported as resting contact.
        let depth = if depth < self.cfg.min_contact_depth { 0.0 } else { depth };
        Contact {
            position,
            normal,
            depth,
            surface: Surface {
                grip: line.grip,
                erp: s.erp,
                cfm: s.cfm,
            },
            source,
        }
    }

    /// Append unless full or within the merge distance of an accepted contact.
    fn push_contact(&self, out: &mut Vec<Contact>, c: Contact, max_contacts: usize) -> bool {
        if out.len() >= max_contacts {
            return false;
        }
        let tol = self.cfg.contact_merge_distance;
        let dup = out.iter().any(|o| {
            (o.position.x - c.position.x).abs() < tol && (o.position.y - c.position.y).abs() < tol
        });
        if dup {
            return false;
        }
        out.push(c);
        true
    }
}

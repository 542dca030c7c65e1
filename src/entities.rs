//! Point entities tracked in the level grid so gameplay can ask "what is near
//! this rectangle" without scanning every entity each frame.
//!
//! Records live in a slot arena; grid cells hold arena handles. A record is
//! listed in exactly the cell stored in its `cell` field, or in none.

use glam::Vec2;

use std::collections::HashSet;

use crate::error::CollisionError;
use crate::system::CollisionSystem;
use crate::types::EntityKey;

slotmap::new_key_type! {
    /// Arena slot of a tracked entity.
    pub(crate) struct EntityHandle;
}

pub(crate) struct ColEntity {
    pub(crate) key: EntityKey,
    pub(crate) pos: Vec2,
    /// Flat cell index; `None` outside the level box or before `set_dims`.
    pub(crate) cell: Option<usize>,
}

impl CollisionSystem {
    pub(crate) fn track(&mut self, key: EntityKey, pos: Vec2) -> Result<(), CollisionError> {
        if self.entity_index.contains_key(&key) {
            return Err(CollisionError::DuplicateEntity(key));
        }
        let h = self.entities.insert(ColEntity { key, pos, cell: None });
        self.entity_index.insert(key, h);
        self.attach(h);
        Ok(())
    }

    pub(crate) fn untrack(&mut self, key: EntityKey) -> Result<(), CollisionError> {
        let h = self
            .entity_index
            .remove(&key)
            .ok_or(CollisionError::EntityNotFound(key))?;
        self.detach(h);
        self.entities.remove(h);
        Ok(())
    }

    pub(crate) fn relocate(&mut self, key: EntityKey, pos: Vec2) -> Result<(), CollisionError> {
        let h = *self
            .entity_index
            .get(&key)
            .ok_or(CollisionError::EntityNotFound(key))?;
        self.detach(h);
        if let Some(e) = self.entities.get_mut(h) {
            e.pos = pos;
        }
        self.attach(h);
        Ok(())
    }

    pub(crate) fn collect_near(&self, min: Vec2, max: Vec2) -> Vec<EntityKey> {
        let mut out = Vec::new();
        let Some(grid) = self.grid.as_ref() else { return out };
        let Some(range) = grid.cell_range(min, max, self.cfg.cell_epsilon) else { return out };
        let mut seen = HashSet::new();
        for (cx, cy) in range.iter() {
            for &h in &grid.cells[grid.index(cx, cy)].entities {
                if let Some(e) = self.entities.get(h) {
                    if seen.insert(e.key) {
                        out.push(e.key);
                    }
                }
            }
        }
        out
    }

    /// Last reported position of a tracked entity.
    pub fn entity_position(&self, key: EntityKey) -> Option<Vec2> {
        let h = self.entity_index.get(&key)?;
        self.entities.get(*h).map(|e| e.pos)
    }

    /// Whether the entity currently sits in a grid cell.
    pub fn entity_in_grid(&self, key: EntityKey) -> Option<bool> {
        let h = self.entity_index.get(&key)?;
        self.entities.get(*h).map(|e| e.cell.is_some())
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Recompute every record's cell after the grid was rebuilt.
    pub(crate) fn rebind_entities(&mut self) {
        let handles: Vec<_> = self.entities.keys().collect();
        for h in handles {
            if let Some(e) = self.entities.get_mut(h) {
                e.cell = None;
            }
            self.attach(h);
        }
    }

    fn attach(&mut self, h: EntityHandle) {
        let Some(e) = self.entities.get_mut(h) else { return };
        let Some(grid) = self.grid.as_mut() else {
            e.cell = None;
            return;
        };
        e.cell = grid.cell_of(e.pos);
        match e.cell {
            Some(i) => grid.cells[i].entities.push(h),
            None => log::warn!("entity {} at {:?} is outside the level box", e.key, e.pos),
        }
    }

    fn detach(&mut self, h: EntityHandle) {
        let Some(e) = self.entities.get_mut(h) else { return };
        let Some(i) = e.cell.take() else { return };
        if let Some(grid) = self.grid.as_mut() {
            let list = &mut grid.cells[i].entities;
            if let Some(pos) = list.iter().position(|&x| x == h) {
                list.swap_remove(pos);
            }
        }
    }
}

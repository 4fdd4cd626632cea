//! Per-zone pools of items lying on the ground

use crate::catalog::ZoneCatalog;
use shared::{manhattan_distance, GroundItem, ItemKind};
use std::collections::HashMap;

/// Mutable item collections, one per zone.
///
/// Items are stored in insertion order and ids grow monotonically, so ties in
/// [`GroundItemPool::remove_nearest`] always resolve to the oldest item.
#[derive(Debug)]
pub struct GroundItemPool {
    zones: HashMap<String, Vec<GroundItem>>,
    next_item_id: u64,
}

impl GroundItemPool {
    pub fn new() -> Self {
        Self {
            zones: HashMap::new(),
            next_item_id: 1,
        }
    }

    /// Creates a pool seeded from every zone's spawn list.
    pub fn seeded(catalog: &ZoneCatalog) -> Self {
        let mut pool = Self::new();
        for zone in catalog.iter() {
            pool.zones.entry(zone.name.clone()).or_default();
            for spawn in &zone.spawn_items {
                pool.add_item(&zone.name, spawn.kind.clone(), spawn.x, spawn.y);
            }
        }
        pool
    }

    /// Live view of the items in a zone. Unknown zones have no items.
    pub fn items(&self, zone: &str) -> &[GroundItem] {
        self.zones.get(zone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Places a new item and returns its freshly minted id.
    pub fn add_item(&mut self, zone: &str, kind: ItemKind, x: f32, y: f32) -> u64 {
        let id = self.next_item_id;
        self.next_item_id += 1;

        self.zones.entry(zone.to_string()).or_default().push(GroundItem {
            id,
            kind,
            x,
            y,
            zone: zone.to_string(),
        });
        id
    }

    /// Removes and returns the item closest to `(x, y)` by Manhattan distance,
    /// provided that distance is within `max_distance`.
    pub fn remove_nearest(
        &mut self,
        zone: &str,
        x: f32,
        y: f32,
        max_distance: f32,
    ) -> Option<GroundItem> {
        let items = self.zones.get_mut(zone)?;

        let mut nearest: Option<(usize, f32)> = None;
        for (index, item) in items.iter().enumerate() {
            let distance = manhattan_distance((item.x, item.y), (x, y));
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((index, distance));
            }
        }

        match nearest {
            Some((index, distance)) if distance <= max_distance => Some(items.remove(index)),
            _ => None,
        }
    }

    pub fn total(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }
}

impl Default for GroundItemPool {
    fn default() -> Self {
        Self::new()
    }
}

//! Zone catalog: the immutable table of zone definitions loaded at startup
//!
//! The catalog is validated once when it is built. After that every zone name
//! reachable through a portal is guaranteed to resolve, so runtime lookups
//! only fail if the server was handed a zone name from outside the catalog.

use log::info;
use shared::{ItemKind, ItemSpawn, Point, Portal, ZoneDefinition};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Faults in startup zone data. All of them are fatal to catalog loading.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("zone not found: {0}")]
    NotFound(String),
    #[error("duplicate zone name: {0}")]
    DuplicateZone(String),
    #[error("zone {zone}: portal {index} has an inverted rectangle")]
    MalformedPortal { zone: String, index: usize },
    #[error("zone {zone}: portal {index} targets unknown zone {target}")]
    UnknownPortalTarget {
        zone: String,
        index: usize,
        target: String,
    },
    #[error("no zone definitions were provided")]
    Empty,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ZoneCatalog {
    zones: HashMap<String, ZoneDefinition>,
    /// Zone names in load order, used wherever iteration must be deterministic.
    order: Vec<String>,
}

impl ZoneCatalog {
    /// Builds a catalog from parsed zone records, rejecting any inconsistency.
    pub fn new(definitions: Vec<ZoneDefinition>) -> Result<Self, CatalogError> {
        if definitions.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut zones = HashMap::new();
        let mut order = Vec::with_capacity(definitions.len());
        for zone in definitions {
            if zones.contains_key(&zone.name) {
                return Err(CatalogError::DuplicateZone(zone.name));
            }
            order.push(zone.name.clone());
            zones.insert(zone.name.clone(), zone);
        }

        for name in &order {
            let zone = &zones[name];
            for (index, portal) in zone.portals.iter().enumerate() {
                if !portal.is_well_formed() {
                    return Err(CatalogError::MalformedPortal {
                        zone: name.clone(),
                        index,
                    });
                }
                if !zones.contains_key(&portal.target) {
                    return Err(CatalogError::UnknownPortalTarget {
                        zone: name.clone(),
                        index,
                        target: portal.target.clone(),
                    });
                }
            }
        }

        Ok(Self { zones, order })
    }

    /// Loads every `*.json` zone file in `dir`, in file name order.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let entries = fs::read_dir(dir).map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CatalogError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut definitions = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let zone: ZoneDefinition = serde_json::from_str(&text)
                .map_err(|source| CatalogError::Parse { path, source })?;
            definitions.push(zone);
        }

        let catalog = Self::new(definitions)?;
        info!("Loaded {} zones from {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    /// A small two-zone world used when no zone directory is configured.
    pub fn default_world() -> Result<Self, CatalogError> {
        let town = ZoneDefinition {
            name: "town".to_string(),
            spawn: Point { x: 400.0, y: 300.0 },
            portals: vec![Portal {
                x1: 760.0,
                y1: 260.0,
                x2: 790.0,
                y2: 340.0,
                target: "graveyard".to_string(),
                exit_x: 40.0,
                exit_y: 300.0,
            }],
            spawn_items: vec![
                ItemSpawn {
                    kind: ItemKind::Apple,
                    x: 200.0,
                    y: 200.0,
                },
                ItemSpawn {
                    kind: ItemKind::Apple,
                    x: 600.0,
                    y: 450.0,
                },
            ],
        };
        let graveyard = ZoneDefinition {
            name: "graveyard".to_string(),
            spawn: Point { x: 40.0, y: 300.0 },
            portals: vec![Portal {
                x1: 0.0,
                y1: 260.0,
                x2: 20.0,
                y2: 340.0,
                target: "town".to_string(),
                exit_x: 730.0,
                exit_y: 300.0,
            }],
            spawn_items: vec![
                ItemSpawn {
                    kind: ItemKind::Apple,
                    x: 150.0,
                    y: 150.0,
                },
                ItemSpawn {
                    kind: ItemKind::Poison,
                    x: 500.0,
                    y: 420.0,
                },
            ],
        };

        Self::new(vec![town, graveyard])
    }

    pub fn zone(&self, name: &str) -> Result<&ZoneDefinition, CatalogError> {
        self.zones
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.zones.contains_key(name)
    }

    /// Zones in load order.
    pub fn iter(&self) -> impl Iterator<Item = &ZoneDefinition> {
        self.order.iter().map(|name| &self.zones[name])
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

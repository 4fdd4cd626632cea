use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const ENTITY_SIZE: f32 = 10.0;
pub const MAX_HEALTH: i32 = 100;
pub const APPLE_HEAL: i32 = 20;
pub const HARM_DAMAGE: i32 = 30;
pub const PICKUP_RANGE: f32 = 30.0;
pub const PORTAL_COOLDOWN: Duration = Duration::from_millis(250);
pub const DEFAULT_TICK_RATE: u32 = 20;

/// Kind of a world item. Unknown kinds are kept verbatim and treated as harmful when used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Apple,
    Poison,
    Other(String),
}

impl ItemKind {
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Apple => "apple",
            ItemKind::Poison => "poison",
            ItemKind::Other(name) => name,
        }
    }

    /// Applies this item's effect to a health value, clamped to `[0, MAX_HEALTH]`.
    pub fn apply_to_health(&self, health: i32) -> i32 {
        match self {
            ItemKind::Apple => (health + APPLE_HEAL).min(MAX_HEALTH),
            _ => (health - HARM_DAMAGE).max(0),
        }
    }
}

impl From<String> for ItemKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "apple" => ItemKind::Apple,
            "poison" => ItemKind::Poison,
            _ => ItemKind::Other(name),
        }
    }
}

impl From<&str> for ItemKind {
    fn from(name: &str) -> Self {
        ItemKind::from(name.to_string())
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Rectangular trigger region that moves a player into another zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portal {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub target: String,
    pub exit_x: f32,
    pub exit_y: f32,
}

impl Portal {
    pub fn is_well_formed(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Edges are inclusive.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpawn {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub x: f32,
    pub y: f32,
}

/// Static description of one zone, as read from a zone file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDefinition {
    pub name: String,
    pub spawn: Point,
    #[serde(default)]
    pub portals: Vec<Portal>,
    #[serde(default)]
    pub spawn_items: Vec<ItemSpawn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub x: f32,
    pub y: f32,
    pub zone: String,
}

/// An inbound client action, decided once when the frame is decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move { dx: f32, dy: f32 },
    TogglePickup,
    Use,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClientFrame {
    Move {
        dx: f32,
        dy: f32,
    },
    Action {
        #[serde(rename = "type")]
        action: ActionTag,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ActionTag {
    Pickup,
    Use,
}

impl Command {
    /// Decodes a JSON text frame. Returns `None` for anything that is not a
    /// complete move or a known action.
    pub fn decode(text: &str) -> Option<Command> {
        match serde_json::from_str::<ClientFrame>(text).ok()? {
            ClientFrame::Move { dx, dy } => Some(Command::Move { dx, dy }),
            ClientFrame::Action {
                action: ActionTag::Pickup,
            } => Some(Command::TogglePickup),
            ClientFrame::Action {
                action: ActionTag::Use,
            } => Some(Command::Use),
        }
    }

    /// Encodes the command in the client wire shape.
    pub fn encode(&self) -> String {
        match self {
            Command::Move { dx, dy } => serde_json::json!({ "dx": dx, "dy": dy }).to_string(),
            Command::TogglePickup => serde_json::json!({ "type": "pickup" }).to_string(),
            Command::Use => serde_json::json!({ "type": "use" }).to_string(),
        }
    }
}

/// Direct replies sent to the connection that issued a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    MapData(ZoneDefinition),
    Teleport {
        x: f32,
        y: f32,
    },
    DropResult {
        success: bool,
    },
    PickupResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item: Option<GroundItem>,
    },
    UseResult {
        health: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub zone: String,
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub item: Option<ItemKind>,
}

/// Zone-scoped state pushed to every connection once per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub players: BTreeMap<String, PlayerView>,
    pub colliding: BTreeMap<String, bool>,
    pub ground_items: Vec<GroundItem>,
}

/// Anything the server writes to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outbound {
    Frame(ServerFrame),
    Snapshot(Snapshot),
}

/// Clamps a position so the entity stays fully on the board.
pub fn clamp_to_board(x: f32, y: f32) -> (f32, f32) {
    (
        x.clamp(0.0, WORLD_WIDTH - ENTITY_SIZE),
        y.clamp(0.0, WORLD_HEIGHT - ENTITY_SIZE),
    )
}

/// Axis-aligned overlap of two entity boxes anchored at their top-left corners.
pub fn check_collision(a: (f32, f32), b: (f32, f32)) -> bool {
    (a.0 - b.0).abs() < ENTITY_SIZE && (a.1 - b.1).abs() < ENTITY_SIZE
}

pub fn manhattan_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_clamp_to_board() {
        assert_eq!(clamp_to_board(-5.0, -1.0), (0.0, 0.0));
        assert_eq!(clamp_to_board(1000.0, 1000.0), (790.0, 590.0));
        assert_eq!(clamp_to_board(400.0, 300.0), (400.0, 300.0));
    }

    #[test]
    fn test_collision_detection_overlap() {
        assert!(check_collision((100.0, 100.0), (105.0, 103.0)));
        assert!(check_collision((105.0, 103.0), (100.0, 100.0)));
    }

    #[test]
    fn test_collision_detection_exact_touch() {
        assert!(!check_collision((0.0, 0.0), (ENTITY_SIZE, 0.0)));
        assert!(!check_collision((0.0, 0.0), (0.0, ENTITY_SIZE)));
    }

    #[test]
    fn test_collision_requires_both_axes() {
        assert!(!check_collision((100.0, 100.0), (105.0, 150.0)));
        assert!(!check_collision((100.0, 100.0), (150.0, 105.0)));
    }

    #[test]
    fn test_manhattan_distance() {
        assert_approx_eq!(manhattan_distance((150.0, 150.0), (160.0, 155.0)), 15.0);
        assert_approx_eq!(manhattan_distance((0.0, 0.0), (-3.0, 4.0)), 7.0);
    }

    #[test]
    fn test_portal_contains_is_inclusive() {
        let portal = Portal {
            x1: 10.0,
            y1: 20.0,
            x2: 30.0,
            y2: 40.0,
            target: "town".to_string(),
            exit_x: 0.0,
            exit_y: 0.0,
        };
        assert!(portal.is_well_formed());
        assert!(portal.contains(10.0, 20.0));
        assert!(portal.contains(30.0, 40.0));
        assert!(!portal.contains(30.1, 40.0));
        assert!(!portal.contains(9.9, 25.0));
    }

    #[test]
    fn test_item_kind_effects() {
        assert_eq!(ItemKind::Apple.apply_to_health(50), 70);
        assert_eq!(ItemKind::Apple.apply_to_health(95), MAX_HEALTH);
        assert_eq!(ItemKind::Poison.apply_to_health(50), 20);
        assert_eq!(ItemKind::Poison.apply_to_health(10), 0);
        assert_eq!(ItemKind::from("mushroom").apply_to_health(100), 70);
    }

    #[test]
    fn test_item_kind_wire_names() {
        assert_eq!(ItemKind::from("apple"), ItemKind::Apple);
        assert_eq!(ItemKind::from("poison"), ItemKind::Poison);
        assert_eq!(
            ItemKind::from("mushroom"),
            ItemKind::Other("mushroom".to_string())
        );
        assert_eq!(serde_json::to_string(&ItemKind::Apple).unwrap(), "\"apple\"");
        let parsed: ItemKind = serde_json::from_str("\"mushroom\"").unwrap();
        assert_eq!(parsed.as_str(), "mushroom");
    }

    #[test]
    fn test_command_decode_move() {
        assert_eq!(
            Command::decode(r#"{"dx": 3, "dy": -2.5}"#),
            Some(Command::Move { dx: 3.0, dy: -2.5 })
        );
    }

    #[test]
    fn test_command_decode_actions() {
        assert_eq!(
            Command::decode(r#"{"type": "pickup"}"#),
            Some(Command::TogglePickup)
        );
        assert_eq!(Command::decode(r#"{"type": "use"}"#), Some(Command::Use));
    }

    #[test]
    fn test_command_decode_rejects_partial_shapes() {
        assert_eq!(Command::decode(r#"{"dx": 3}"#), None);
        assert_eq!(Command::decode(r#"{"type": "jump"}"#), None);
        assert_eq!(Command::decode(r#"{}"#), None);
        assert_eq!(Command::decode("not json"), None);
    }

    #[test]
    fn test_command_encode_matches_decode() {
        for command in [
            Command::Move { dx: 1.0, dy: -1.0 },
            Command::TogglePickup,
            Command::Use,
        ] {
            assert_eq!(Command::decode(&command.encode()), Some(command));
        }
    }

    #[test]
    fn test_server_frame_tags() {
        let frame = ServerFrame::PickupResult {
            success: false,
            item: None,
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "pickupResult");
        assert_eq!(value["success"], false);
        assert!(value.get("item").is_none());

        let value = serde_json::to_value(ServerFrame::UseResult { health: 70 }).unwrap();
        assert_eq!(value["type"], "useResult");
        assert_eq!(value["health"], 70);
    }

    #[test]
    fn test_map_data_carries_zone_file_shape() {
        let zone: ZoneDefinition = serde_json::from_str(
            r#"{
                "name": "graveyard",
                "spawn": {"x": 50, "y": 60},
                "portals": [{"x1": 0, "y1": 0, "x2": 20, "y2": 20,
                             "target": "town", "exitX": 400, "exitY": 300}],
                "spawnItems": [{"type": "apple", "x": 150, "y": 150}]
            }"#,
        )
        .unwrap();
        assert_eq!(zone.portals[0].target, "town");
        assert_approx_eq!(zone.portals[0].exit_x, 400.0);
        assert_eq!(zone.spawn_items[0].kind, ItemKind::Apple);

        let value = serde_json::to_value(ServerFrame::MapData(zone)).unwrap();
        assert_eq!(value["type"], "mapData");
        assert_eq!(value["name"], "graveyard");
        assert_eq!(value["portals"][0]["exitY"], 300.0);
        assert_eq!(value["spawnItems"][0]["type"], "apple");
    }

    #[test]
    fn test_outbound_snapshot_is_untagged() {
        let mut snapshot = Snapshot::default();
        snapshot.colliding.insert("alice".to_string(), true);
        let text = serde_json::to_string(&Outbound::Snapshot(snapshot.clone())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("type").is_none());
        assert_eq!(value["colliding"]["alice"], true);
        assert!(value["groundItems"].as_array().unwrap().is_empty());

        let parsed: Outbound = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, Outbound::Snapshot(snapshot));
    }
}

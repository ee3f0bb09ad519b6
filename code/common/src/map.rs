use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;
use thiserror::Error;

use crate::entities::ENEMY_RADIUS;
use crate::geometry::{Circle, Obstacle, Rect};
use crate::nav::{NAV_CELL_SIZE, NavGrid};

/// Layout coordinates are authored at 1/3 of world size.
pub const MAP_SCALE: f32 = 3.0;

const COLLISION_LAYER: &str = "collisions";

#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapId {
    Ship,
    Planet,
}

impl MapId {
    pub fn other(self) -> Self {
        match self {
            MapId::Ship => MapId::Planet,
            MapId::Planet => MapId::Ship,
        }
    }
}

/// Named spawn-point lists used by the spawn tables.
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnGroup {
    CockpitRoom,
    Corridor,
    Left3,
    Right3,
    Engine,
    BossAdds,
}

#[derive(Error, Debug)]
pub enum GeometryLoadError {
    #[error("failed to read collision file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse collision json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no `{COLLISION_LAYER}` layer in collision file")]
    MissingLayer,
}

/// Static description of one map: walkable zones, blocking shapes and fixed points.
#[derive(Debug, Clone)]
pub struct MapLayout {
    pub id: MapId,
    pub width: f32,
    pub height: f32,
    pub zones: Vec<Rect>,
    pub obstacles: Vec<Obstacle>,
    /// Double-tap interact inside this rect moves the player to the other map.
    pub airlock: Rect,
    /// Where players land when they come through the other map's airlock.
    pub arrival: Vec2,
    pub respawn: Vec2,
    pub spawn_groups: Vec<(SpawnGroup, Vec<Vec2>)>,
}

fn scaled(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y) * MAP_SCALE
}

fn zone(x: f32, y: f32, w: f32, h: f32) -> Rect {
    Rect::new(x, y, w, h).scaled(MAP_SCALE)
}

impl MapLayout {
    /// Ship interior without obstacles. Obstacles come from [`load_tiled_obstacles`].
    pub fn ship() -> Self {
        let mut zones = vec![
            zone(420.0, 40.0, 184.0, 120.0),
            zone(300.0, 160.0, 424.0, 130.0),
            zone(475.0, 160.0, 74.0, 800.0),
        ];
        let wings = [
            (290.0, 240.0, 80.0),
            (370.0, 285.0, 80.0),
            (450.0, 325.0, 80.0),
            (530.0, 355.0, 80.0),
            (610.0, 385.0, 80.0),
            (690.0, 415.0, 70.0),
        ];
        for (y, w, h) in wings {
            zones.push(zone(495.0 - w, y, w, h));
        }
        for (y, w, h) in wings {
            zones.push(zone(529.0, y, w, h));
        }
        zones.push(zone(60.0, 760.0, 904.0, 220.0));
        zones.push(zone(5.0, 430.0, 55.0, 100.0));
        zones.push(zone(964.0, 430.0, 55.0, 100.0));

        Self {
            id: MapId::Ship,
            width: 1024.0 * MAP_SCALE,
            height: 1024.0 * MAP_SCALE,
            zones,
            obstacles: Vec::new(),
            airlock: zone(400.0, 920.0, 224.0, 60.0),
            arrival: scaled(512.0, 840.0),
            respawn: scaled(512.0, 700.0),
            spawn_groups: vec![
                (
                    SpawnGroup::CockpitRoom,
                    vec![
                        scaled(400.0, 210.0),
                        scaled(512.0, 210.0),
                        scaled(620.0, 210.0),
                        scaled(460.0, 240.0),
                    ],
                ),
                (
                    SpawnGroup::Corridor,
                    vec![
                        scaled(512.0, 400.0),
                        scaled(512.0, 500.0),
                        scaled(512.0, 600.0),
                        scaled(512.0, 700.0),
                    ],
                ),
                (
                    SpawnGroup::Left3,
                    vec![
                        scaled(250.0, 480.0),
                        scaled(300.0, 480.0),
                        scaled(350.0, 480.0),
                        scaled(200.0, 480.0),
                    ],
                ),
                (
                    SpawnGroup::Right3,
                    vec![
                        scaled(774.0, 480.0),
                        scaled(700.0, 480.0),
                        scaled(650.0, 480.0),
                        scaled(824.0, 480.0),
                    ],
                ),
                (
                    SpawnGroup::Engine,
                    vec![
                        scaled(400.0, 810.0),
                        scaled(600.0, 810.0),
                        scaled(512.0, 850.0),
                        scaled(512.0, 790.0),
                    ],
                ),
            ],
        }
    }

    /// Planet surface. The boss arena sits at the top of the map.
    pub fn planet() -> Self {
        Self {
            id: MapId::Planet,
            width: 1536.0 * MAP_SCALE,
            height: 1024.0 * MAP_SCALE,
            zones: vec![zone(0.0, 0.0, 1536.0, 1024.0)],
            obstacles: Vec::new(),
            airlock: zone(650.0, 850.0, 236.0, 100.0),
            arrival: scaled(768.0, 780.0),
            respawn: scaled(768.0, 780.0),
            spawn_groups: vec![(
                SpawnGroup::BossAdds,
                vec![
                    scaled(300.0, 60.0),
                    scaled(450.0, 60.0),
                    scaled(375.0, 150.0),
                    scaled(300.0, 150.0),
                ],
            )],
        }
    }

    pub fn with_obstacles(mut self, obstacles: Vec<Obstacle>) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn spawn_points(&self, group: SpawnGroup) -> &[Vec2] {
        self.spawn_groups
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, points)| points.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Deserialize)]
struct TiledMap {
    layers: Vec<TiledLayer>,
}

#[derive(Deserialize)]
struct TiledLayer {
    name: String,
    #[serde(default)]
    objects: Vec<TiledObject>,
}

#[derive(Deserialize)]
struct TiledObject {
    x: f32,
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    ellipse: bool,
}

impl TiledObject {
    fn to_obstacle(&self) -> Option<Obstacle> {
        if self.width == 0.0 && self.height == 0.0 {
            return None;
        }

        if self.ellipse && self.rotation == 0.0 {
            let radius = self.width.max(self.height) / 2.0;
            return Some(Obstacle::Circle(Circle {
                center: Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0),
                radius,
            }));
        }

        if self.rotation == 0.0 {
            return Some(Obstacle::Rect(Rect::new(self.x, self.y, self.width, self.height)));
        }

        // Tiled rotates around the top-left corner; keep the bounding box of the four corners.
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let corners = [
            Vec2::ZERO,
            Vec2::new(self.width * cos, self.width * sin),
            Vec2::new(-self.height * sin, self.height * cos),
            Vec2::new(
                self.width * cos - self.height * sin,
                self.width * sin + self.height * cos,
            ),
        ];
        let min = corners.iter().copied().fold(Vec2::splat(f32::INFINITY), Vec2::min);
        let max = corners
            .iter()
            .copied()
            .fold(Vec2::splat(f32::NEG_INFINITY), Vec2::max);
        let origin = Vec2::new(self.x, self.y);
        Some(Obstacle::Rect(Rect {
            min: origin + min,
            max: origin + max,
        }))
    }
}

/// Parses the `collisions` object layer of a Tiled map and scales it to world units.
pub fn load_tiled_obstacles(json: &str) -> Result<Vec<Obstacle>, GeometryLoadError> {
    let map: TiledMap = serde_json::from_str(json)?;
    let layer = map
        .layers
        .iter()
        .find(|layer| layer.name == COLLISION_LAYER)
        .ok_or(GeometryLoadError::MissingLayer)?;

    Ok(layer
        .objects
        .iter()
        .filter_map(TiledObject::to_obstacle)
        .map(|obstacle| obstacle.scaled(MAP_SCALE))
        .collect())
}

pub fn load_tiled_obstacles_from(path: &Path) -> Result<Vec<Obstacle>, GeometryLoadError> {
    let json = std::fs::read_to_string(path)?;
    load_tiled_obstacles(&json)
}

/// A map layout together with its navigation grid.
#[derive(Debug, Clone)]
pub struct WorldMap {
    pub layout: MapLayout,
    pub nav: NavGrid,
}

impl WorldMap {
    pub fn new(layout: MapLayout) -> Self {
        let nav = NavGrid::build(
            layout.width,
            layout.height,
            NAV_CELL_SIZE,
            ENEMY_RADIUS,
            &layout.zones,
            &layout.obstacles,
        );
        Self { layout, nav }
    }
}

/// Both maps, built once at startup and shared read-only by every room.
#[derive(Debug, Clone)]
pub struct World {
    ship: WorldMap,
    planet: WorldMap,
}

impl World {
    pub fn new(ship: MapLayout, planet: MapLayout) -> Self {
        Self {
            ship: WorldMap::new(ship),
            planet: WorldMap::new(planet),
        }
    }

    /// Built-in layouts with no obstacles.
    pub fn builtin() -> Self {
        Self::new(MapLayout::ship(), MapLayout::planet())
    }

    pub fn map(&self, id: MapId) -> &WorldMap {
        match id {
            MapId::Ship => &self.ship,
            MapId::Planet => &self.planet,
        }
    }

    pub fn layout(&self, id: MapId) -> &MapLayout {
        &self.map(id).layout
    }
}

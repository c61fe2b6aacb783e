use anyhow::{Context, Result};
use core_wfc::{BorderState, EdgeRule, TileDefinition, TileSet};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefabInfo {
    pub name: String,
    pub prefab: String,
}

/// Tile catalog backed by prefab names, loadable from an XML file.
#[derive(Debug, Clone)]
pub struct PrefabTileset {
    tiles: Vec<TileDefinition>,
    prefabs: Vec<PrefabInfo>,
}

impl PrefabTileset {
    pub fn new(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read tileset {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("Invalid tileset {}", path.display()))
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let config: Config = serde_xml_rs::from_str(xml)?;

        let mut tiles = Vec::with_capacity(config.tiles.tile.len());
        let mut prefabs = Vec::with_capacity(config.tiles.tile.len());
        for tile in config.tiles.tile.iter() {
            let definition = tile
                .definition()
                .with_context(|| format!("Invalid tile {:?}", tile.name))?;
            tiles.push(definition);
            prefabs.push(PrefabInfo {
                name: tile.name.clone(),
                prefab: tile
                    .prefab
                    .clone()
                    .unwrap_or_else(|| format!("prefabs/{}", tile.name)),
            });
        }

        Ok(Self { tiles, prefabs })
    }

    pub fn prefab(&self, tile: usize) -> &PrefabInfo {
        &self.prefabs[tile]
    }

    pub fn prefabs(&self) -> &[PrefabInfo] {
        &self.prefabs
    }
}

impl Default for PrefabTileset {
    /// Small dungeon catalog: closed rooms and corridor pieces whose
    /// openings have to line up.
    fn default() -> Self {
        type S = BorderState;

        // forward, back, right, left
        let tile_edge_types = [
            ("room", [S::DontAllow, S::DontAllow, S::DontAllow, S::DontAllow], 40.0, 1.0, 2.0),
            ("corridor", [S::Allow, S::Allow, S::DontAllow, S::DontAllow], 30.0, 1.0, 1.0),
            ("corner", [S::Allow, S::DontAllow, S::Allow, S::DontAllow], 15.0, 1.0, 1.0),
            ("tee", [S::Allow, S::DontAllow, S::Allow, S::Allow], 8.0, 1.5, 0.5),
            ("cross", [S::Allow, S::Allow, S::Allow, S::Allow], 4.0, 2.0, 0.0),
            ("dead_end", [S::Allow, S::DontAllow, S::DontAllow, S::DontAllow], 5.0, 0.5, 1.0),
        ];

        let mut tiles = Vec::with_capacity(tile_edge_types.len());
        let mut prefabs = Vec::with_capacity(tile_edge_types.len());
        for (name, [forward, back, right, left], weight, interior, edge) in tile_edge_types {
            tiles.push(
                TileDefinition::new(forward, back, right, left)
                    .with_weight(weight)
                    .with_multipliers(interior, edge),
            );
            prefabs.push(PrefabInfo {
                name: name.to_string(),
                prefab: format!("prefabs/{}", name),
            });
        }

        Self { tiles, prefabs }
    }
}

impl TileSet for PrefabTileset {
    fn tiles(&self) -> &[TileDefinition] {
        &self.tiles
    }

    fn tile_name(&self, tile: usize) -> String {
        self.prefabs[tile].name.clone()
    }
}

fn default_weight() -> f32 {
    100.0
}

fn default_multiplier() -> f32 {
    1.0
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename = "set")]
struct Config {
    tiles: Tiles,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Tiles {
    #[serde(default)]
    tile: Vec<Tile>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Tile {
    name: String,
    #[serde(default)]
    prefab: Option<String>,
    #[serde(default = "default_weight")]
    weight: f32,
    #[serde(default = "default_multiplier")]
    interior: f32,
    #[serde(default = "default_multiplier")]
    edge: f32,
    #[serde(default)]
    forward: Option<String>,
    #[serde(default)]
    back: Option<String>,
    #[serde(default)]
    right: Option<String>,
    #[serde(default)]
    left: Option<String>,
    #[serde(default)]
    forward_right: Option<String>,
    #[serde(default)]
    forward_left: Option<String>,
    #[serde(default)]
    back_right: Option<String>,
    #[serde(default)]
    back_left: Option<String>,
    #[serde(default)]
    right_right: Option<String>,
    #[serde(default)]
    right_left: Option<String>,
    #[serde(default)]
    left_right: Option<String>,
    #[serde(default)]
    left_left: Option<String>,
}

impl Tile {
    fn definition(&self) -> Result<TileDefinition> {
        let tile = TileDefinition::new(
            edge_rule(&self.forward, &self.forward_right, &self.forward_left)?,
            edge_rule(&self.back, &self.back_right, &self.back_left)?,
            edge_rule(&self.right, &self.right_right, &self.right_left)?,
            edge_rule(&self.left, &self.left_right, &self.left_left)?,
        )
        .with_weight(self.weight)
        .with_multipliers(self.interior, self.edge);
        tile.validate()?;
        Ok(tile)
    }
}

fn edge_rule(state: &Option<String>, right: &Option<String>, left: &Option<String>) -> Result<EdgeRule> {
    let parse = |value: &Option<String>| -> Result<BorderState> {
        Ok(value
            .as_deref()
            .map(str::parse::<BorderState>)
            .transpose()?
            .unwrap_or_default())
    };
    Ok(EdgeRule::with_sides(parse(state)?, parse(right)?, parse(left)?))
}

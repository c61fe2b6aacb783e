use anyhow::{Context, Result};
use bevy::{log::LogPlugin, prelude::*, utils::HashMap};
use prefab_wfc::{
    prefab_tileset::PrefabTileset,
    single_shot::{self, GenerationSettings},
    spawn::{self, CommandsSpawner, PrefabTile},
};
use std::{path::Path, sync::Arc};

/// Usage: prefab_wfc [tileset.xml|-] [width] [height] [seed]
#[derive(Resource)]
struct Args(Vec<String>);

fn main() {
    App::new()
        .add_plugins(LogPlugin::default())
        .insert_resource(Args(std::env::args().skip(1).collect()))
        .add_systems(Startup, setup)
        .add_systems(Update, report)
        .run();
}

fn load(args: &[String]) -> Result<(Arc<PrefabTileset>, GenerationSettings)> {
    let tileset = match args.first().map(String::as_str) {
        Some(path) if path != "-" => PrefabTileset::new(Path::new(path))?,
        _ => PrefabTileset::default(),
    };

    let mut settings = GenerationSettings {
        restarts: 16,
        ..Default::default()
    };
    if let Some(width) = args.get(1) {
        settings.grid.width = width
            .parse()
            .with_context(|| format!("Invalid width {:?}", width))?;
    }
    if let Some(height) = args.get(2) {
        settings.grid.height = height
            .parse()
            .with_context(|| format!("Invalid height {:?}", height))?;
    }
    if let Some(seed) = args.get(3) {
        settings.seed = seed
            .parse()
            .with_context(|| format!("Invalid seed {:?}", seed))?;
    }

    Ok((Arc::new(tileset), settings))
}

fn setup(mut commands: Commands, args: Res<Args>) {
    let (tileset, settings) = match load(&args.0) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Error while loading generator config: {:?}", e);
            return;
        }
    };

    let generation = match single_shot::generate(tileset.clone(), &settings) {
        Ok(generation) => generation,
        Err(e) => {
            error!("Error while generating grid: {:?}", e);
            return;
        }
    };

    info!(
        "{:?} {}x{} grid from seed {} after {} attempts:\n{}",
        generation.state,
        settings.grid.width,
        settings.grid.height,
        generation.seed,
        generation.attempts,
        generation.grid
    );
    if !generation.stalled.is_empty() {
        warn!("Stalled cells: {:?}", generation.stalled);
    }

    let mut spawner = CommandsSpawner {
        commands: &mut commands,
        tileset: &tileset,
    };
    spawn::spawn_all(&generation.grid, settings.cell_size, &mut spawner);
}

fn report(tiles: Query<&PrefabTile>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tile in tiles.iter() {
        *counts.entry(tile.prefab.as_str()).or_default() += 1;
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort();
    for (prefab, count) in counts {
        info!("{:>4} x {}", count, prefab);
    }
}

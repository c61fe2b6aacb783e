use crate::prefab_tileset::PrefabTileset;
use bevy::prelude::*;
use core_wfc::{Grid, Orientation, Placement, Possibilities};

/// Receives every placement that survived generation.
pub trait Spawner {
    fn spawn(&mut self, cell: IVec2, transform: Transform, placement: &Placement);
}

impl<F: FnMut(IVec2, Transform, &Placement)> Spawner for F {
    fn spawn(&mut self, cell: IVec2, transform: Transform, placement: &Placement) {
        self(cell, transform, placement)
    }
}

/// Center of `cell` with the grid centered on the origin. Grid y runs along
/// world +Z.
pub fn cell_position(cell: IVec2, grid_size: IVec2, cell_size: Vec3) -> Vec3 {
    let offset = cell.as_vec2() + Vec2::splat(0.5) - grid_size.as_vec2() / 2.0;
    cell_size * Vec3::new(offset.x, 0.0, offset.y)
}

/// Turns +Z (the tile's forward edge) clockwise seen from above, so at 90°
/// it points along +X.
pub fn orientation_rotation(orientation: Orientation) -> Quat {
    Quat::from_rotation_y(orientation.degrees().to_radians())
}

/// Hands every remaining placement of every cell to `spawner`. Cells with
/// several candidates left spawn all of them, stalled cells spawn nothing.
/// Returns how many placements were spawned.
pub fn spawn_all(grid: &Grid<Possibilities>, cell_size: Vec3, spawner: &mut impl Spawner) -> usize {
    let mut spawned = 0;
    for (cell, possibilities) in grid.iter() {
        let translation = cell_position(cell, grid.size(), cell_size);
        for placement in possibilities.iter() {
            let transform = Transform::from_translation(translation)
                .with_rotation(orientation_rotation(placement.orientation));
            spawner.spawn(cell, transform, placement);
            spawned += 1;
        }
    }
    spawned
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct PrefabTile {
    pub cell: IVec2,
    pub tile: usize,
    pub prefab: String,
    pub orientation: Orientation,
}

/// Spawns one entity per placement through bevy `Commands`.
pub struct CommandsSpawner<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub tileset: &'a PrefabTileset,
}

impl Spawner for CommandsSpawner<'_, '_, '_> {
    fn spawn(&mut self, cell: IVec2, transform: Transform, placement: &Placement) {
        let info = self.tileset.prefab(placement.tile);
        self.commands.spawn((
            Name::new(format!("{} ({}, {})", info.name, cell.x, cell.y)),
            PrefabTile {
                cell,
                tile: placement.tile,
                prefab: info.prefab.clone(),
                orientation: placement.orientation,
            },
            TransformBundle::from_transform(transform),
        ));
    }
}

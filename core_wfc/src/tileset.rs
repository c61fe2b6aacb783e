use crate::TileDefinition;

/// Catalog of tiles the solver draws from.
pub trait TileSet: Send + Sync {
    fn tiles(&self) -> &[TileDefinition];

    fn tile_count(&self) -> usize {
        self.tiles().len()
    }

    fn tile_name(&self, tile: usize) -> String {
        format!("tile {}", tile)
    }
}

impl TileSet for Vec<TileDefinition> {
    fn tiles(&self) -> &[TileDefinition] {
        self
    }
}

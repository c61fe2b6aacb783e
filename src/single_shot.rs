use anyhow::Result;
use bevy::prelude::*;
use core_wfc::{CollapseSolver, Grid, GridSettings, Possibilities, TileSet, WfcSettings, WfcState};
use rand::{rngs::SmallRng, SeedableRng};
use std::sync::Arc;

#[derive(Reflect, Clone, Debug, PartialEq)]
#[reflect(Default)]
pub struct GenerationSettings {
    pub grid: GridSettings,
    pub wfc: WfcSettings,
    pub seed: u64,
    /// Extra attempts with fresh seeds when a run leaves stalled cells.
    pub restarts: usize,
    pub cell_size: Vec3,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            grid: GridSettings::default(),
            wfc: WfcSettings::default(),
            seed: 0,
            restarts: 0,
            cell_size: Vec3::new(1.0, 0.1, 1.0),
        }
    }
}

pub struct Generation {
    pub grid: Grid<Possibilities>,
    /// Seed of the attempt that produced `grid`.
    pub seed: u64,
    pub state: WfcState,
    pub stalled: Vec<IVec2>,
    pub attempts: usize,
}

/// Runs the solver once per attempt, seeding attempt `n` with `seed + n`,
/// until a run collapses every cell or the restarts are used up. The last
/// attempt is returned either way.
pub fn generate(tileset: Arc<dyn TileSet>, settings: &GenerationSettings) -> Result<Generation> {
    let mut attempt = 0;
    loop {
        let seed = settings.seed.wrapping_add(attempt as u64);
        let mut solver = CollapseSolver::new(tileset.clone(), &settings.grid, settings.wfc.clone())?;
        let mut rng = SmallRng::seed_from_u64(seed);
        let state = solver.run(&mut rng)?;
        let stalled = solver.stalled_cells();

        if state == WfcState::Collapsed || attempt >= settings.restarts {
            return Ok(Generation {
                grid: solver.into_grid(),
                seed,
                state,
                stalled,
                attempts: attempt + 1,
            });
        }

        info!(
            "Seed {:x} left {} stalled cells, restarting",
            seed,
            stalled.len()
        );
        attempt += 1;
    }
}

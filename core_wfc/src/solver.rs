use crate::{
    Direction, Grid, GridSettings, Orientation, Placement, Possibilities, TileDefinition, TileSet,
};
use anyhow::{bail, Context, Result};
use bevy::prelude::*;
use rand::Rng;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Reflect, Default)]
#[reflect(Default)]
pub struct WfcSettings {
    /// Abort with an error once this many cells have been collapsed while
    /// undecided cells remain.
    pub max_collapses: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WfcState {
    Initialized,
    Propagating,
    /// Every cell holds exactly one placement.
    Collapsed,
    /// No cell holds more than one placement but at least one holds none.
    Stalled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cascade {
    source: usize,
    direction: Direction,
}

/// What a single cascade work item did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CascadeStep {
    pub source: usize,
    pub direction: Direction,
    /// `None` when the step pointed off the grid.
    pub target: Option<usize>,
    pub removed: usize,
    pub remaining: usize,
}

/// Builds the starting possibility sets: every tile in every orientation,
/// in catalog order, keeping only the candidates with a positive weight.
pub fn initial_possibilities(tiles: &[TileDefinition], settings: &GridSettings) -> Grid<Possibilities> {
    let size = settings.size();
    Grid::create(settings, |cell| {
        tiles
            .iter()
            .enumerate()
            .flat_map(|(tile, definition)| {
                Orientation::ALL.into_iter().map(move |orientation| {
                    Placement::new(tile, orientation, definition.get_weight(cell, size, orientation))
                })
            })
            .filter(|placement| placement.weight > 0.0)
            .collect()
    })
}

/// Weighted wave function collapse without backtracking.
///
/// Repeatedly collapses the first cell (row-major) with the fewest
/// candidates above one, then cascades the compatibility filter outwards
/// from it. A cell whose candidates are all filtered away is left empty and
/// the run carries on around it.
pub struct CollapseSolver {
    grid: Grid<Possibilities>,
    tileset: Arc<dyn TileSet>,
    settings: WfcSettings,
    state: WfcState,
    stack: Vec<Cascade>,
    stalled: Vec<usize>,
    collapses: usize,
}

impl CollapseSolver {
    pub fn new(
        tileset: Arc<dyn TileSet>,
        grid_settings: &GridSettings,
        settings: WfcSettings,
    ) -> Result<Self> {
        grid_settings.validate()?;
        for (index, tile) in tileset.tiles().iter().enumerate() {
            tile.validate()
                .with_context(|| format!("Invalid {}", tileset.tile_name(index)))?;
        }

        let grid = initial_possibilities(tileset.tiles(), grid_settings);
        Ok(Self::from_grid(tileset, grid, settings))
    }

    /// Starts from caller supplied possibility sets instead of the weighted
    /// initial ones.
    pub fn from_grid(tileset: Arc<dyn TileSet>, grid: Grid<Possibilities>, settings: WfcSettings) -> Self {
        let stalled: Vec<usize> = grid
            .cells
            .iter()
            .enumerate()
            .filter(|(_, possibilities)| possibilities.is_stalled())
            .map(|(index, _)| index)
            .collect();
        for index in stalled.iter() {
            warn!("Cell {} has no placement with positive weight", grid.position(*index));
        }

        Self {
            grid,
            tileset,
            settings,
            state: WfcState::Initialized,
            stack: Vec::new(),
            stalled,
            collapses: 0,
        }
    }

    pub fn state(&self) -> WfcState {
        self.state
    }

    pub fn grid(&self) -> &Grid<Possibilities> {
        &self.grid
    }

    pub fn into_grid(self) -> Grid<Possibilities> {
        self.grid
    }

    pub fn collapse_count(&self) -> usize {
        self.collapses
    }

    pub fn stalled_cells(&self) -> Vec<IVec2> {
        self.stalled
            .iter()
            .map(|index| self.grid.position(*index))
            .collect()
    }

    pub fn pending_cascades(&self) -> usize {
        self.stack.len()
    }

    /// First cell in row-major order holding the smallest number of
    /// candidates above one.
    pub fn lowest_entropy(&self) -> Option<usize> {
        let mut min_entropy = usize::MAX;
        let mut min_index = None;
        for (index, cell) in self.grid.cells.iter().enumerate() {
            let entropy = cell.len();
            if entropy > 1 && entropy < min_entropy {
                min_entropy = entropy;
                min_index = Some(index);
            }
        }
        min_index
    }

    /// Collapses `index` to one weighted random candidate and queues the
    /// cascade to its four neighbors.
    pub fn collapse_cell<R: Rng>(&mut self, index: usize, rng: &mut R) -> Option<Placement> {
        let selected = self.grid.cells[index].select_random(rng)?;
        self.collapses += 1;
        self.state = WfcState::Propagating;
        debug!(
            "Collapsed {} to {} at {}",
            self.grid.position(index),
            self.tileset.tile_name(selected.tile),
            selected.orientation
        );

        self.push_cascades(index, None);
        Some(selected)
    }

    /// Select and collapse. Returns the collapsed cell, or `None` once no
    /// cell has more than one candidate. With the worklist drained at that
    /// point the run is over and the final state is set.
    pub fn observe<R: Rng>(&mut self, rng: &mut R) -> Option<usize> {
        let Some(index) = self.lowest_entropy() else {
            if self.stack.is_empty() {
                self.finish();
            }
            return None;
        };
        self.collapse_cell(index, rng);
        Some(index)
    }

    fn push_cascades(&mut self, source: usize, arrived: Option<Direction>) {
        // reversed so north is handled first
        for direction in Direction::ALL.into_iter().rev() {
            if Some(direction.other()) == arrived {
                continue;
            }
            self.stack.push(Cascade { source, direction });
        }
    }

    /// Handles one queued cascade. Only neighbors that still hold two or
    /// more candidates are filtered; a neighbor that drops to exactly one
    /// cascades onwards, away from where the cascade came from.
    pub fn propagate_step(&mut self) -> Option<CascadeStep> {
        let Cascade { source, direction } = self.stack.pop()?;
        let mut step = CascadeStep {
            source,
            direction,
            target: self.grid.neighbor(source, direction),
            removed: 0,
            remaining: 0,
        };

        let Some(target) = step.target else {
            return Some(step);
        };
        step.remaining = self.grid.cells[target].len();
        let Some(origin) = self.grid.cells[source].collapse() else {
            return Some(step);
        };
        if step.remaining < 2 {
            return Some(step);
        }

        let tileset = self.tileset.clone();
        let tiles = tileset.tiles();
        let origin_tile = &tiles[origin.tile];
        self.grid.cells[target].retain(|candidate| {
            origin_tile.is_compatible(
                origin.orientation,
                Some((&tiles[candidate.tile], candidate.orientation)),
                direction,
            )
        });

        let remaining = self.grid.cells[target].len();
        step.removed = step.remaining - remaining;
        step.remaining = remaining;

        match remaining {
            0 => {
                warn!(
                    "Cell {} stalled while cascading {:?} from {}",
                    self.grid.position(target),
                    direction,
                    self.grid.position(source)
                );
                self.stalled.push(target);
            }
            1 => self.push_cascades(target, Some(direction)),
            _ => {}
        }

        Some(step)
    }

    /// Drains the cascade worklist, returning how many candidates were removed.
    pub fn propagate(&mut self) -> usize {
        let mut removed = 0;
        while let Some(step) = self.propagate_step() {
            removed += step.removed;
        }
        removed
    }

    pub fn run<R: Rng>(&mut self, rng: &mut R) -> Result<WfcState> {
        self.state = WfcState::Propagating;
        loop {
            self.propagate();

            let Some(index) = self.lowest_entropy() else {
                break;
            };
            if let Some(max_collapses) = self.settings.max_collapses {
                if self.collapses >= max_collapses {
                    bail!("Ran out of collapses after {}", max_collapses);
                }
            }
            self.collapse_cell(index, rng);
        }

        Ok(self.finish())
    }

    fn finish(&mut self) -> WfcState {
        self.state = if self.stalled.is_empty() {
            WfcState::Collapsed
        } else {
            WfcState::Stalled
        };
        info!(
            "Wave function {:?} after {} collapses ({} stalled cells)",
            self.state,
            self.collapses,
            self.stalled.len()
        );
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BorderState::*;
    use rand::{rngs::SmallRng, SeedableRng};

    fn plain_and_wall() -> Arc<dyn TileSet> {
        Arc::new(vec![
            TileDefinition::default().with_weight(10.0),
            TileDefinition::new(DontAllow, DontCare, DontCare, DontCare).with_weight(1.0),
        ])
    }

    /// Link joins east/west through Allow edges; Cap refuses everything.
    fn link_and_cap() -> Arc<dyn TileSet> {
        Arc::new(vec![
            TileDefinition::new(DontCare, DontCare, Allow, Allow),
            TileDefinition::new(DontAllow, DontAllow, DontAllow, DontAllow),
        ])
    }

    fn row(cells: Vec<Vec<Placement>>) -> Grid<Possibilities> {
        Grid {
            width: cells.len(),
            height: 1,
            cells: cells.into_iter().map(Possibilities).collect(),
        }
    }

    fn link() -> Placement {
        Placement::new(0, Orientation::Deg0, 1.0)
    }

    fn cap(orientation: Orientation) -> Placement {
        Placement::new(1, orientation, 1.0)
    }

    #[test]
    fn initialization_drops_zero_weights() {
        let solver = CollapseSolver::new(plain_and_wall(), &GridSettings::new(3, 3), WfcSettings::default()).unwrap();
        let grid = solver.grid();
        assert_eq!(solver.state(), WfcState::Initialized);

        let center = grid.get(IVec2::new(1, 1)).unwrap();
        assert_eq!(center.len(), 8);
        assert_eq!(center[0], Placement::new(0, Orientation::Deg0, 10.0));
        assert_eq!(center[4], Placement::new(1, Orientation::Deg0, 1.0));

        assert_eq!(
            grid.get(IVec2::new(1, 2)).unwrap().0,
            vec![Placement::new(1, Orientation::Deg0, 1.0)]
        );
        assert_eq!(
            grid.get(IVec2::new(2, 1)).unwrap().0,
            vec![Placement::new(1, Orientation::Deg90, 1.0)]
        );
        assert_eq!(solver.stalled_cells().len(), 4);
        assert!(grid.get(IVec2::new(0, 0)).unwrap().is_stalled());
    }

    #[test]
    fn empty_catalog_stalls_every_cell() {
        let tileset: Arc<dyn TileSet> = Arc::new(Vec::<TileDefinition>::new());
        let mut solver = CollapseSolver::new(tileset, &GridSettings::new(2, 3), WfcSettings::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(solver.run(&mut rng).unwrap(), WfcState::Stalled);
        assert_eq!(solver.stalled_cells().len(), 6);
        assert_eq!(solver.collapse_count(), 0);
        assert!(solver.grid().cells.iter().all(|cell| cell.is_empty()));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let bad: Arc<dyn TileSet> = Arc::new(vec![TileDefinition::default().with_weight(-2.0)]);
        assert!(CollapseSolver::new(bad, &GridSettings::default(), WfcSettings::default()).is_err());
        assert!(CollapseSolver::new(plain_and_wall(), &GridSettings::new(0, 4), WfcSettings::default()).is_err());
    }

    #[test]
    fn lowest_entropy_takes_first_minimum() {
        let many = |count: usize| vec![link(); count];
        let solver = CollapseSolver::from_grid(
            link_and_cap(),
            row(vec![many(3), many(1), many(2), many(0), many(2), many(5)]),
            WfcSettings::default(),
        );
        assert_eq!(solver.lowest_entropy(), Some(2));

        let settled = CollapseSolver::from_grid(link_and_cap(), row(vec![many(1), many(0)]), WfcSettings::default());
        assert_eq!(settled.lowest_entropy(), None);
    }

    #[test]
    fn dont_care_tiles_cascade_to_nothing() {
        let tileset: Arc<dyn TileSet> = Arc::new(vec![
            TileDefinition::default(),
            TileDefinition::default().with_weight(5.0),
        ]);
        let all: Vec<Placement> = (0..2)
            .flat_map(|tile| Orientation::ALL.map(|orientation| Placement::new(tile, orientation, 1.0)))
            .collect();
        let grid = Grid::create(&GridSettings::new(3, 3), |_| Possibilities(all.clone()));
        let mut solver = CollapseSolver::from_grid(tileset, grid, WfcSettings::default());

        let mut rng = SmallRng::seed_from_u64(9);
        solver.collapse_cell(4, &mut rng).unwrap();
        assert_eq!(solver.pending_cascades(), 4);
        let mut steps = 0;
        while let Some(step) = solver.propagate_step() {
            assert_eq!(step.removed, 0);
            assert_eq!(step.remaining, 8);
            steps += 1;
        }
        assert_eq!(steps, 4);
        for (pos, cell) in solver.grid().iter() {
            if pos != IVec2::new(1, 1) {
                assert_eq!(cell.len(), 8);
            }
        }
    }

    #[test]
    fn cascade_runs_along_a_chain() {
        let candidates = vec![link(), cap(Orientation::Deg0)];
        let grid = row(vec![vec![link()], candidates.clone(), candidates.clone(), candidates]);
        let mut solver = CollapseSolver::from_grid(link_and_cap(), grid, WfcSettings::default());

        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(solver.collapse_cell(0, &mut rng), Some(link()));
        assert_eq!(solver.propagate(), 3);
        for cell in solver.grid().cells.iter() {
            assert_eq!(cell.collapse(), Some(link()));
        }
        assert!(solver.stalled_cells().is_empty());
    }

    #[test]
    fn emptied_cell_stalls_without_aborting() {
        let caps = vec![cap(Orientation::Deg0), cap(Orientation::Deg90)];
        let grid = row(vec![vec![link(), link()], caps.clone(), caps]);
        let mut solver = CollapseSolver::from_grid(link_and_cap(), grid, WfcSettings::default());

        let mut rng = SmallRng::seed_from_u64(4);
        assert_eq!(solver.run(&mut rng).unwrap(), WfcState::Stalled);
        assert_eq!(solver.stalled_cells(), vec![IVec2::new(1, 0)]);
        // the stalled cell did not cascade, so the last cell was decided on its own
        assert_eq!(solver.grid().cells[2].len(), 1);
        assert_eq!(solver.collapse_count(), 2);
    }

    #[test]
    fn cascade_continues_past_a_stall() {
        let grid = row(vec![
            vec![link(), cap(Orientation::Deg0)],
            vec![link()],
            vec![cap(Orientation::Deg0), cap(Orientation::Deg90)],
        ]);
        let mut solver = CollapseSolver::from_grid(link_and_cap(), grid, WfcSettings::default());

        let mut rng = SmallRng::seed_from_u64(6);
        assert_eq!(solver.collapse_cell(1, &mut rng), Some(link()));
        assert_eq!(solver.propagate(), 3);

        let sizes: Vec<usize> = solver.grid().cells.iter().map(|cell| cell.len()).collect();
        assert_eq!(sizes, vec![1, 1, 0]);
        assert_eq!(solver.grid().cells[0].collapse(), Some(link()));
        assert_eq!(solver.stalled_cells(), vec![IVec2::new(2, 0)]);
        assert_eq!(solver.pending_cascades(), 0);
    }

    #[test]
    fn stepping_with_observe_reaches_an_end_state() {
        let closed: Arc<dyn TileSet> = Arc::new(vec![TileDefinition::new(
            DontAllow, DontAllow, DontAllow, DontAllow,
        )]);
        let mut solver = CollapseSolver::new(closed, &GridSettings::new(2, 2), WfcSettings::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);

        let mut observed = Vec::new();
        while let Some(index) = solver.observe(&mut rng) {
            assert_eq!(solver.state(), WfcState::Propagating);
            solver.propagate();
            observed.push(index);
        }
        assert_eq!(observed, vec![0, 1, 2, 3]);
        assert_eq!(solver.collapse_count(), 4);
        assert_eq!(solver.state(), WfcState::Collapsed);
        assert!(solver.grid().validate().is_ok());

        let empty: Arc<dyn TileSet> = Arc::new(Vec::<TileDefinition>::new());
        let mut solver = CollapseSolver::new(empty, &GridSettings::new(2, 1), WfcSettings::default()).unwrap();
        assert_eq!(solver.observe(&mut rng), None);
        assert_eq!(solver.state(), WfcState::Stalled);
    }

    #[test]
    fn observe_waits_for_pending_cascades() {
        let grid = row(vec![vec![link()], vec![link()]]);
        let mut solver = CollapseSolver::from_grid(link_and_cap(), grid, WfcSettings::default());
        let mut rng = SmallRng::seed_from_u64(1);

        solver.collapse_cell(0, &mut rng);
        assert_eq!(solver.pending_cascades(), 4);
        assert_eq!(solver.observe(&mut rng), None);
        assert_eq!(solver.state(), WfcState::Propagating);

        solver.propagate();
        assert_eq!(solver.observe(&mut rng), None);
        assert_eq!(solver.state(), WfcState::Collapsed);
    }

    #[test]
    fn resolved_neighbors_are_not_filtered() {
        let grid = row(vec![vec![link(), link()], vec![cap(Orientation::Deg0)]]);
        let mut solver = CollapseSolver::from_grid(link_and_cap(), grid, WfcSettings::default());
        let mut rng = SmallRng::seed_from_u64(4);
        assert_eq!(solver.run(&mut rng).unwrap(), WfcState::Collapsed);
        assert_eq!(solver.grid().cells[1].collapse(), Some(cap(Orientation::Deg0)));
    }

    #[test]
    fn same_seed_same_result() {
        let settings = GridSettings::new(6, 4);
        let closed = TileDefinition::new(DontAllow, DontAllow, DontAllow, DontAllow);
        let tileset: Arc<dyn TileSet> = Arc::new(vec![
            closed.clone().with_weight(3.0),
            closed.with_weight(1.0).with_multipliers(0.5, 2.0),
        ]);
        let generate = |seed| {
            let mut solver = CollapseSolver::new(tileset.clone(), &settings, WfcSettings::default()).unwrap();
            let mut rng = SmallRng::seed_from_u64(seed);
            assert_eq!(solver.run(&mut rng).unwrap(), WfcState::Collapsed);
            assert_eq!(solver.collapse_count(), 24);
            solver.into_grid()
        };
        assert_eq!(generate(11), generate(11));
    }

    #[test]
    fn collapse_cap_is_enforced() {
        let settings = WfcSettings {
            max_collapses: Some(1),
        };
        let grid = Grid::create(&GridSettings::new(3, 1), |_| Possibilities(vec![link(), link()]));
        let mut solver = CollapseSolver::from_grid(link_and_cap(), grid, settings);
        let mut rng = SmallRng::seed_from_u64(2);
        assert!(solver.run(&mut rng).is_err());
        assert_eq!(solver.collapse_count(), 1);
    }
}

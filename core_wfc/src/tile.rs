use crate::{BorderState, Direction, EdgeRule};
use anyhow::{ensure, Result};
use bevy::prelude::*;
use std::fmt;

/// Rotation of a tile about the vertical axis, clockwise seen from above.
/// At `Deg90` the tile's forward edge faces east.
#[derive(Debug, Default, Hash, PartialEq, Eq, Copy, Clone)]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Deg0,
        Orientation::Deg90,
        Orientation::Deg180,
        Orientation::Deg270,
    ];

    pub fn from_quarter_turns(turns: usize) -> Self {
        Self::ALL[turns % 4]
    }

    pub fn quarter_turns(self) -> usize {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    pub fn degrees(self) -> f32 {
        90.0 * self.quarter_turns() as f32
    }

    pub fn rotate(self, turns: usize) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + turns)
    }

    /// Maps a world direction into the tile's unrotated frame.
    pub fn to_local(self, world: Direction) -> Direction {
        world.rotate(4 - self.quarter_turns())
    }

    /// Maps one of the tile's own edges to the world direction it faces.
    pub fn to_world(self, local: Direction) -> Direction {
        local.rotate(self.quarter_turns())
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// A catalog entry: per-edge border rules plus the weighting policy.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDefinition {
    /// Indexed by the local `Direction` each edge faces.
    pub edges: [EdgeRule; 4],
    pub weight: f32,
    pub interior_weight_multiplier: f32,
    pub edge_weight_multiplier: f32,
}

impl Default for TileDefinition {
    fn default() -> Self {
        Self {
            edges: [EdgeRule::DONT_CARE; 4],
            weight: 100.0,
            interior_weight_multiplier: 1.0,
            edge_weight_multiplier: 1.0,
        }
    }
}

impl TileDefinition {
    pub fn new(
        forward: impl Into<EdgeRule>,
        back: impl Into<EdgeRule>,
        right: impl Into<EdgeRule>,
        left: impl Into<EdgeRule>,
    ) -> Self {
        let mut tile = Self::default();
        tile.edges[Direction::North as usize] = forward.into();
        tile.edges[Direction::South as usize] = back.into();
        tile.edges[Direction::East as usize] = right.into();
        tile.edges[Direction::West as usize] = left.into();
        tile
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_multipliers(mut self, interior: f32, edge: f32) -> Self {
        self.interior_weight_multiplier = interior;
        self.edge_weight_multiplier = edge;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("weight", self.weight),
            ("interior weight multiplier", self.interior_weight_multiplier),
            ("edge weight multiplier", self.edge_weight_multiplier),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                "Tile {} must be a finite non-negative number, got {}",
                name,
                value
            );
        }
        Ok(())
    }

    pub fn edge(&self, local: Direction) -> EdgeRule {
        self.edges[local as usize]
    }

    pub fn get_edge_state(&self, local: Direction) -> BorderState {
        self.edge(local).state
    }

    /// Edge lookup by raw grid offset, for callers that do not hold a
    /// `Direction`. Anything but a unit cardinal offset is an error.
    pub fn edge_state_towards(&self, local: IVec2) -> Result<BorderState> {
        Ok(self.get_edge_state(Direction::try_from(local)?))
    }

    /// States this tile shows towards a neighbor it faces through local edge
    /// `facing`: the edge itself, then the edges on the neighbor's right and
    /// left hand as it looks back at us.
    fn facing_states(&self, facing: Direction) -> [BorderState; 3] {
        [
            self.get_edge_state(facing),
            self.get_edge_state(facing.left_of()),
            self.get_edge_state(facing.right_of()),
        ]
    }

    /// Whether `neighbor` may sit next to this tile in world direction
    /// `direction`. A missing neighbor stands for the outside of the grid.
    pub fn is_compatible(
        &self,
        orientation: Orientation,
        neighbor: Option<(&TileDefinition, Orientation)>,
        direction: Direction,
    ) -> bool {
        let rule = self.edge(orientation.to_local(direction));

        let Some((neighbor, neighbor_orientation)) = neighbor else {
            return rule.state != BorderState::DontAllow;
        };

        if rule.is_dont_care() {
            return true;
        }

        let facing = neighbor_orientation.to_local(direction.other());
        let [state, right, left] = neighbor.facing_states(facing);
        rule.state.matches(state) && rule.right.matches(right) && rule.left.matches(left)
    }

    /// Placement weight of this tile at `cell`. Zero means the tile may not
    /// go there: a tile that would accept a neighbor through an edge lying on
    /// the grid boundary is excluded from that cell.
    pub fn get_weight(&self, cell: IVec2, grid_size: IVec2, orientation: Orientation) -> f32 {
        if boundary_directions(cell, grid_size)
            .any(|direction| self.is_compatible(orientation, None, direction))
        {
            return 0.0;
        }

        let t = center_offset(cell, grid_size);
        self.weight
            * (self.interior_weight_multiplier
                + (self.edge_weight_multiplier - self.interior_weight_multiplier) * t)
    }
}

/// Directions in which `cell` touches the outside of the grid.
pub fn boundary_directions(cell: IVec2, grid_size: IVec2) -> impl Iterator<Item = Direction> {
    let on_edge = [
        cell.y == grid_size.y - 1,
        cell.y == 0,
        cell.x == 0,
        cell.x == grid_size.x - 1,
    ];
    [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ]
    .into_iter()
    .zip(on_edge)
    .filter_map(|(direction, on_edge)| on_edge.then_some(direction))
}

/// Chebyshev distance from the grid center normalised to `[0, 1]`: zero at
/// the center, one on the outer ring. An axis of length one contributes 0.
pub fn center_offset(cell: IVec2, grid_size: IVec2) -> f32 {
    let center = grid_size.as_vec2() / 2.0 - Vec2::splat(0.5);
    let offset = (cell.as_vec2() - center).abs();
    let axis = |offset: f32, center: f32| if center > 0.0 { offset / center } else { 0.0 };
    axis(offset.x, center.x).max(axis(offset.y, center.y))
}

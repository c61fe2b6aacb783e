use anyhow::{anyhow, Result};
use bevy::prelude::*;

/// Cardinal direction on the grid plane. `North` is +y, `East` is +x.
///
/// In a tile's own frame the same values name its edges: `North` is the
/// forward edge, `South` the back edge, `East` the right edge and `West`
/// the left edge.
#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub enum Direction {
    North = 0,
    South = 1,
    West = 2,
    East = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn other(&self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Rotates clockwise (seen from above) by `rotation` quarter turns.
    pub fn rotate(&self, rotation: usize) -> Self {
        match rotation % 4 {
            0 => *self,
            1 => match self {
                Self::North => Self::East,
                Self::South => Self::West,
                Self::West => Self::North,
                Self::East => Self::South,
            },
            2 => self.other(),
            3 => match self {
                Self::North => Self::West,
                Self::South => Self::East,
                Self::West => Self::South,
                Self::East => Self::North,
            },
            _ => unreachable!(),
        }
    }

    /// The direction on your right hand while facing `self`.
    pub fn right_of(&self) -> Self {
        self.rotate(1)
    }

    /// The direction on your left hand while facing `self`.
    pub fn left_of(&self) -> Self {
        self.rotate(3)
    }

    pub fn to_ivec2(&self) -> IVec2 {
        match self {
            Self::North => IVec2::new(0, 1),
            Self::South => IVec2::new(0, -1),
            Self::West => IVec2::new(-1, 0),
            Self::East => IVec2::new(1, 0),
        }
    }
}

impl TryFrom<usize> for Direction {
    type Error = anyhow::Error;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            0 => Ok(Self::North),
            1 => Ok(Self::South),
            2 => Ok(Self::West),
            3 => Ok(Self::East),
            _ => Err(anyhow!("Invalid direction: {}", value)),
        }
    }
}

impl TryFrom<IVec2> for Direction {
    type Error = anyhow::Error;

    fn try_from(value: IVec2) -> Result<Self> {
        Direction::ALL
            .into_iter()
            .find(|direction| direction.to_ivec2() == value)
            .ok_or_else(|| anyhow!("Not a cardinal direction: {}", value))
    }
}

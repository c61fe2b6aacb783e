use crate::Orientation;
use bevy::prelude::*;
use rand::Rng;

/// A candidate for a cell: catalog index, rotation and the weight it was
/// given at that cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub tile: usize,
    pub orientation: Orientation,
    pub weight: f32,
}

impl Placement {
    pub fn new(tile: usize, orientation: Orientation, weight: f32) -> Self {
        Self {
            tile,
            orientation,
            weight,
        }
    }
}

/// The ordered possibility set of one cell.
#[derive(Deref, DerefMut, Debug, Clone, Default, PartialEq)]
pub struct Possibilities(pub Vec<Placement>);

impl Possibilities {
    pub fn single(placement: Placement) -> Self {
        Self(vec![placement])
    }

    pub fn total_weight(&self) -> f32 {
        self.iter().map(|placement| placement.weight).sum()
    }

    /// Weight-proportional draw: subtract each candidate's weight from a
    /// uniform sample in `[0, total)` until the remainder drops to zero.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Option<Placement> {
        let last = *self.last()?;
        let total = self.total_weight();
        if !(total > 0.0 && total.is_finite()) {
            return self.first().copied();
        }

        let mut remaining = rng.gen_range(0.0..total);
        for placement in self.iter() {
            remaining -= placement.weight;
            if remaining <= 0.0 {
                return Some(*placement);
            }
        }

        // rounding left a sliver of weight unaccounted for
        Some(last)
    }

    /// Leaves a single randomly drawn placement and returns it
    pub fn select_random<R: Rng>(&mut self, rng: &mut R) -> Option<Placement> {
        let selected = self.draw(rng)?;
        self.0 = vec![selected];
        Some(selected)
    }

    /// Returns the one and only placement if there is only one
    pub fn collapse(&self) -> Option<Placement> {
        match self.as_slice() {
            [placement] => Some(*placement),
            _ => None,
        }
    }

    pub fn is_stalled(&self) -> bool {
        self.is_empty()
    }
}

impl FromIterator<Placement> for Possibilities {
    fn from_iter<T: IntoIterator<Item = Placement>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

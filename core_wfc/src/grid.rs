use crate::{Direction, Placement, Possibilities};
use anyhow::{anyhow, ensure, Result};
use bevy::prelude::*;
use std::fmt;

#[derive(Reflect, Clone, Debug, PartialEq)]
#[reflect(Default)]
pub struct GridSettings {
    pub width: usize,
    pub height: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: 5,
            height: 5,
        }
    }
}

impl GridSettings {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.width >= 1 && self.height >= 1,
            "Grid must be at least 1x1, got {}x{}",
            self.width,
            self.height
        );
        Ok(())
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }
}

/// Fixed size grid stored row-major: index = y * width + x.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<C> {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<C>,
}

impl<C> Grid<C> {
    pub fn create(settings: &GridSettings, mut fill_with: impl FnMut(IVec2) -> C) -> Self {
        let mut cells = Vec::with_capacity(settings.width * settings.height);
        for y in 0..settings.height {
            for x in 0..settings.width {
                cells.push(fill_with(IVec2::new(x as i32, y as i32)));
            }
        }

        Self {
            width: settings.width,
            height: settings.height,
            cells,
        }
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }

    pub fn index(&self, pos: IVec2) -> Option<usize> {
        if pos.cmplt(IVec2::ZERO).any() || pos.cmpge(self.size()).any() {
            return None;
        }
        Some(pos.y as usize * self.width + pos.x as usize)
    }

    pub fn position(&self, index: usize) -> IVec2 {
        IVec2::new((index % self.width) as i32, (index / self.width) as i32)
    }

    pub fn neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        self.index(self.position(index) + direction.to_ivec2())
    }

    pub fn get(&self, pos: IVec2) -> Option<&C> {
        self.index(pos).map(|index| &self.cells[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &C)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| (self.position(index), cell))
    }
}

impl Grid<Possibilities> {
    /// Returns the collapsed placements, failing if any cell is stalled or
    /// still holds more than one candidate.
    pub fn validate(&self) -> Result<Grid<Placement>> {
        let mut cells = Vec::with_capacity(self.cells.len());
        for (index, possibilities) in self.cells.iter().enumerate() {
            let placement = possibilities.collapse().ok_or_else(|| {
                anyhow!(
                    "Cell {} holds {} placements",
                    self.position(index),
                    possibilities.len()
                )
            })?;
            cells.push(placement);
        }

        Ok(Grid {
            width: self.width,
            height: self.height,
            cells,
        })
    }
}

impl fmt::Display for Grid<Possibilities> {
    /// One glyph per cell, highest row first: the tile's letter when
    /// resolved, `.` when stalled and `?` when several candidates remain.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let cell = &self.cells[y * self.width + x];
                let glyph = match cell.collapse() {
                    Some(placement) => (b'A' + (placement.tile % 26) as u8) as char,
                    None if cell.is_stalled() => '.',
                    None => '?',
                };
                write!(f, "{}", glyph)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

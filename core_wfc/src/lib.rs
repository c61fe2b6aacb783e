pub use border::*;
pub use direction::*;
pub use grid::*;
pub use solver::*;
pub use superposition::*;
pub use tile::*;
pub use tileset::*;

mod border;
mod direction;
mod grid;
mod solver;
mod superposition;
mod tile;
mod tileset;

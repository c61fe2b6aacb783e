pub use core_wfc::*;

pub mod prefab_tileset;
pub mod single_shot;
pub mod spawn;

use anyhow::{anyhow, Result};
use std::{fmt, str::FromStr};

/// What a tile edge demands of the tile across it.
#[derive(Debug, Default, Hash, PartialEq, Eq, Copy, Clone)]
pub enum BorderState {
    #[default]
    DontCare,
    Allow,
    DontAllow,
}

impl BorderState {
    /// `DontCare` on our side accepts anything. Otherwise the other side has
    /// to carry the exact same state, so a neighbor's `DontCare` does not
    /// satisfy an `Allow` or `DontAllow` demand.
    pub fn matches(self, neighbor: BorderState) -> bool {
        self == BorderState::DontCare || self == neighbor
    }
}

impl FromStr for BorderState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "dontcare" => Ok(Self::DontCare),
            "allow" => Ok(Self::Allow),
            "dontallow" => Ok(Self::DontAllow),
            _ => Err(anyhow!("Unknown border state: {:?}", s)),
        }
    }
}

impl fmt::Display for BorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DontCare => "DontCare",
            Self::Allow => "Allow",
            Self::DontAllow => "DontAllow",
        };
        write!(f, "{}", name)
    }
}

/// Border rule for one edge of a tile.
///
/// `state` is the edge's own demand. `right` and `left` are the optional
/// two-sided extension: demands on the neighbor's edges that sit to the
/// right and left of the shared border, seen from this tile looking out.
/// Leaving both at `DontCare` gives the plain single-state rule.
#[derive(Debug, Default, Hash, PartialEq, Eq, Copy, Clone)]
pub struct EdgeRule {
    pub state: BorderState,
    pub right: BorderState,
    pub left: BorderState,
}

impl EdgeRule {
    pub const DONT_CARE: Self = Self::new(BorderState::DontCare);

    pub const fn new(state: BorderState) -> Self {
        Self {
            state,
            right: BorderState::DontCare,
            left: BorderState::DontCare,
        }
    }

    pub const fn with_sides(state: BorderState, right: BorderState, left: BorderState) -> Self {
        Self { state, right, left }
    }

    pub fn is_dont_care(&self) -> bool {
        *self == Self::DONT_CARE
    }

    pub fn is_two_sided(&self) -> bool {
        self.right != BorderState::DontCare || self.left != BorderState::DontCare
    }
}

impl From<BorderState> for EdgeRule {
    fn from(state: BorderState) -> Self {
        Self::new(state)
    }
}

//! Coordinate system helpers.
//!
//! The passes work in a rank-relative space: the *secondary* axis runs along a rank (the
//! coordinate the heuristics optimise), the *primary* axis runs across ranks. North/south
//! layouts map secondary to `x`; east/west layouts swap the axes, so vertex extents are
//! swapped on the way in and points are swapped on the way out.

use crate::model::{Point, Size};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where the root (source) rank sits relative to the rest of the drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    North,
    South,
    East,
    West,
}

impl Orientation {
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::East | Self::West)
    }

    /// South and east layouts grow the primary axis towards negative values, which flips
    /// which side of a rank faces the sources.
    pub fn is_layout_reversed(self) -> bool {
        matches!(self, Self::South | Self::East)
    }

    pub fn primary_sign(self) -> f64 {
        match self {
            Self::North | Self::West => 1.0,
            Self::South | Self::East => -1.0,
        }
    }

    /// Vertex bounds as seen by the passes (`width` along the secondary axis).
    pub fn oriented(self, size: Size) -> Size {
        if self.swaps_axes() {
            Size::new(size.height, size.width)
        } else {
            size
        }
    }

    pub fn project(self, secondary: f64, primary: f64) -> Point {
        if self.swaps_axes() {
            Point::new(primary, secondary)
        } else {
            Point::new(secondary, primary)
        }
    }
}

impl FromStr for Orientation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Self::North),
            "south" | "s" => Ok(Self::South),
            "east" | "e" => Ok(Self::East),
            "west" | "w" => Ok(Self::West),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn north_and_south_keep_axes() {
        for o in [Orientation::North, Orientation::South] {
            assert_eq!(o.oriented(Size::new(100.0, 200.0)), Size::new(100.0, 200.0));
            assert_eq!(o.project(1.0, 2.0), Point::new(1.0, 2.0));
        }
    }

    #[test]
    fn east_and_west_swap_axes() {
        for o in [Orientation::East, Orientation::West] {
            assert_eq!(o.oriented(Size::new(100.0, 200.0)), Size::new(200.0, 100.0));
            assert_eq!(o.project(1.0, 2.0), Point::new(2.0, 1.0));
        }
    }

    #[test]
    fn parses_orientation_names() {
        assert_eq!("North".parse::<Orientation>(), Ok(Orientation::North));
        assert_eq!(" w ".parse::<Orientation>(), Ok(Orientation::West));
        assert!("up".parse::<Orientation>().is_err());
    }
}

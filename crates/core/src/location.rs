//! Block location keys.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::OrganizeError;

/// Identity of a container: the block it occupies.
///
/// Rendered as `world:x,y,z`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl LocationKey {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Chebyshev (cube) distance in blocks, `None` across worlds.
    ///
    /// This is the metric of a cubic search range around a centre block.
    pub fn block_distance(&self, other: &LocationKey) -> Option<u32> {
        if self.world != other.world {
            return None;
        }
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let dz = self.z.abs_diff(other.z);
        Some(dx.max(dy).max(dz))
    }

    /// Manhattan distance in blocks, `None` across worlds.
    pub fn manhattan_distance(&self, other: &LocationKey) -> Option<u64> {
        if self.world != other.world {
            return None;
        }
        Some(
            u64::from(self.x.abs_diff(other.x))
                + u64::from(self.y.abs_diff(other.y))
                + u64::from(self.z.abs_diff(other.z)),
        )
    }
}

impl core::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

impl FromStr for LocationKey {
    type Err = OrganizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (world, coords) = s
            .rsplit_once(':')
            .ok_or_else(|| OrganizeError::validation(format!("location '{s}' missing ':'")))?;
        if world.is_empty() {
            return Err(OrganizeError::validation(format!("location '{s}' has no world")));
        }

        let parts: Vec<&str> = coords.split(',').collect();
        let [x, y, z] = parts.as_slice() else {
            return Err(OrganizeError::validation(format!(
                "location '{s}' needs three coordinates"
            )));
        };

        let parse = |v: &str| {
            v.trim()
                .parse::<i32>()
                .map_err(|e| OrganizeError::validation(format!("location '{s}': {e}")))
        };

        Ok(Self::new(world, parse(*x)?, parse(*y)?, parse(*z)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_form() {
        let key: LocationKey = "world_nether:-12,64,300".parse().unwrap();
        assert_eq!(key, LocationKey::new("world_nether", -12, 64, 300));
        assert_eq!(key.to_string(), "world_nether:-12,64,300");
    }

    #[test]
    fn rejects_missing_coordinates() {
        assert!("world:1,2".parse::<LocationKey>().is_err());
        assert!(":1,2,3".parse::<LocationKey>().is_err());
        assert!("world".parse::<LocationKey>().is_err());
    }

    #[test]
    fn distances_are_undefined_across_worlds() {
        let a = LocationKey::new("world", 0, 64, 0);
        let b = LocationKey::new("world", 3, 60, -5);
        let c = LocationKey::new("world_the_end", 0, 64, 0);

        assert_eq!(a.block_distance(&b), Some(5));
        assert_eq!(a.manhattan_distance(&b), Some(12));
        assert_eq!(a.block_distance(&c), None);
    }
}

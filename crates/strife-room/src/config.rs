//! Room generation bounds.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Smallest side that still leaves an interior inside the walls.
pub const MIN_SIDE: u32 = 3;
/// Largest side that fits the single-byte wire fields.
pub const MAX_SIDE: u32 = 255;

// ---------------------------------------------------------------------------
// RoomBounds
// ---------------------------------------------------------------------------

/// Size limits for randomly generated rooms.
///
/// Widths are drawn from `min_width..max_width`, heights likewise, so the
/// maximum itself is never produced unless it equals the minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomBounds {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    #[serde(alias = "maxHeight")]
    pub max_height: u32,
}

impl Default for RoomBounds {
    fn default() -> Self {
        Self {
            min_width: 5,
            max_width: 100,
            min_height: 5,
            max_height: 100,
        }
    }
}

impl RoomBounds {
    /// Checks that the bounds can produce a room that fits on the wire.
    pub fn validated(self) -> Result<Self, RoomError> {
        for (label, min, max) in [
            ("width", self.min_width, self.max_width),
            ("height", self.min_height, self.max_height),
        ] {
            if min < MIN_SIDE || max > MAX_SIDE || min > max {
                return Err(RoomError::InvalidDimensions(format!(
                    "{label} bounds {min}..{max} must satisfy \
                     {MIN_SIDE} <= min <= max <= {MAX_SIDE}"
                )));
            }
        }
        Ok(self)
    }

    /// Picks a random `(width, height)` inside the bounds.
    pub fn random_dimensions(&self, rng: &mut impl Rng) -> (u32, u32) {
        (
            pick(rng, self.min_width, self.max_width),
            pick(rng, self.min_height, self.max_height),
        )
    }
}

fn pick(rng: &mut impl Rng, min: u32, max: u32) -> u32 {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}

// ---------------------------------------------------------------------------
// RoomData
// ---------------------------------------------------------------------------

/// The `room_data` section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomData {
    pub config: RoomBounds,
    /// Number of rooms generated when no room index exists yet.
    pub min_rooms: usize,
}

impl Default for RoomData {
    fn default() -> Self {
        Self {
            config: RoomBounds::default(),
            min_rooms: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds_are_valid() {
        assert!(RoomBounds::default().validated().is_ok());
        assert_eq!(RoomData::default().min_rooms, 6);
    }

    #[test]
    fn test_bounds_reject_inverted_range() {
        let bounds = RoomBounds {
            min_width: 50,
            max_width: 10,
            ..RoomBounds::default()
        };
        assert!(matches!(
            bounds.validated(),
            Err(RoomError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_bounds_reject_side_too_large_for_wire() {
        let bounds = RoomBounds {
            max_height: 256,
            ..RoomBounds::default()
        };
        assert!(bounds.validated().is_err());
    }

    #[test]
    fn test_random_dimensions_stay_in_range() {
        let bounds = RoomBounds {
            min_width: 5,
            max_width: 8,
            min_height: 6,
            max_height: 6,
        };
        let mut rng = rand::rng();
        for _ in 0..200 {
            let (w, h) = bounds.random_dimensions(&mut rng);
            assert!((5..8).contains(&w));
            assert_eq!(h, 6);
        }
    }

    #[test]
    fn test_legacy_max_height_key_is_accepted() {
        let json = r#"{"min_width":5,"max_width":9,"min_height":5,"maxHeight":7}"#;
        let bounds: RoomBounds = serde_json::from_str(json).unwrap();
        assert_eq!(bounds.max_height, 7);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let data: RoomData = serde_json::from_str("{}").unwrap();
        assert_eq!(data, RoomData::default());
    }
}

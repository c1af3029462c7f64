//! Structural note keys.
//!
//! Runtime cut events reference notes that carry no durable identity of
//! their own. A [`NoteKey`] captures the structural coordinates a note is
//! identified by (its position in the map definition), so that the resolver
//! can correlate spawn, cut, and fully-resolved events for the same note.

use serde::{Deserialize, Serialize};

/// The kind of interactable object in a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    /// A note to be cut with the left saber.
    NoteA,
    /// A note to be cut with the right saber.
    NoteB,
    /// A bomb; touching it is a penalty.
    Bomb,
}

impl NoteKind {
    /// Wire string for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoteA => "NoteA",
            Self::NoteB => "NoteB",
            Self::Bomb => "Bomb",
        }
    }

    /// Whether this object is a bomb.
    pub const fn is_bomb(self) -> bool {
        matches!(self, Self::Bomb)
    }
}

/// The direction a note must be cut in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CutDirection {
    /// Upward swing.
    Up,
    /// Downward swing.
    Down,
    /// Leftward swing.
    Left,
    /// Rightward swing.
    Right,
    /// Diagonal up-left swing.
    UpLeft,
    /// Diagonal up-right swing.
    UpRight,
    /// Diagonal down-left swing.
    DownLeft,
    /// Diagonal down-right swing.
    DownRight,
    /// Any direction is accepted (dot note).
    Any,
}

impl CutDirection {
    /// Wire string for this direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::UpLeft => "UpLeft",
            Self::UpRight => "UpRight",
            Self::DownLeft => "DownLeft",
            Self::DownRight => "DownRight",
            Self::Any => "Any",
        }
    }
}

/// Structural coordinates identifying one note within a map definition.
///
/// Two keys describe the same note when their coordinates agree; the
/// direction is part of the comparison unless a no-direction modifier is
/// active for the session (see [`NoteKey::matches`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteKey {
    /// Position of the note on the map timeline, in beats.
    pub time: f32,
    /// Horizontal lane index, left to right.
    pub line: i32,
    /// Vertical layer index, bottom to top.
    pub layer: i32,
    /// Object kind.
    pub kind: NoteKind,
    /// Required cut direction.
    pub direction: CutDirection,
}

impl NoteKey {
    /// Structural equality against another key.
    ///
    /// `ignore_direction` relaxes the direction comparison for sessions
    /// played with a no-direction modifier, where the runtime reports
    /// [`CutDirection::Any`] regardless of the authored direction.
    pub fn matches(&self, other: &Self, ignore_direction: bool) -> bool {
        // Both keys originate from the same map definition, so bitwise
        // time equality is the intended comparison.
        self.time.to_bits() == other.time.to_bits()
            && self.line == other.line
            && self.layer == other.layer
            && self.kind == other.kind
            && (ignore_direction || self.direction == other.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(time: f32, line: i32, direction: CutDirection) -> NoteKey {
        NoteKey {
            time,
            line,
            layer: 0,
            kind: NoteKind::NoteA,
            direction,
        }
    }

    #[test]
    fn matches_on_identical_coordinates() {
        let a = key(1.5, 2, CutDirection::Down);
        let b = key(1.5, 2, CutDirection::Down);
        assert!(a.matches(&b, false));
    }

    #[test]
    fn direction_mismatch_fails_unless_ignored() {
        let a = key(1.5, 2, CutDirection::Down);
        let b = key(1.5, 2, CutDirection::Any);
        assert!(!a.matches(&b, false));
        assert!(a.matches(&b, true));
    }

    #[test]
    fn different_lane_never_matches() {
        let a = key(1.5, 2, CutDirection::Down);
        let b = key(1.5, 3, CutDirection::Down);
        assert!(!a.matches(&b, true));
    }

    #[test]
    fn kind_is_part_of_identity() {
        let a = key(2.0, 1, CutDirection::Any);
        let mut b = a;
        b.kind = NoteKind::Bomb;
        assert!(!a.matches(&b, true));
    }

    #[test]
    fn note_key_serde_round_trip() {
        let original = key(4.25, 3, CutDirection::DownLeft);
        let json = serde_json::to_string(&original).unwrap_or_default();
        let parsed: Result<NoteKey, _> = serde_json::from_str(&json);
        assert_eq!(parsed.ok(), Some(original));
    }
}

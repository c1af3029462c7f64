//! Stable-ID assignment for ephemeral note objects.
//!
//! Runtime cut events carry transient note references with no durable
//! identity, but external consumers need a small stable integer to
//! correlate the spawn, cut, and fully-resolved events of the *same* note.
//! At session start the resolver snapshots the ordered sequence of notes
//! the map will produce; a note's position in that sequence is its ID.
//!
//! Resolution scans a small window around a monotonic cursor: ascending
//! from ten slots behind the cursor (the common near-monotonic playback
//! case, amortized O(1)), then descending over the remaining prefix for
//! out-of-order resolutions such as simultaneous notes or follow-through
//! events that land late. A miss yields `None`, never an error.

use cadence_types::NoteKey;

/// How far behind the cursor the ascending scan starts.
const LOOKBACK: usize = 10;

/// Correlates transient note references to stable session-scoped indices.
///
/// State is rebuilt once per session and must be [`reset`](Self::reset) at
/// every session end, including abnormal exits, so stale mappings never
/// leak into the next session.
#[derive(Debug, Default)]
pub struct NoteIdentityResolver {
    known: Vec<NoteKey>,
    last: usize,
    ignore_direction: bool,
}

impl NoteIdentityResolver {
    /// Create an empty resolver; no session is active.
    pub const fn new() -> Self {
        Self {
            known: Vec::new(),
            last: 0,
            ignore_direction: false,
        }
    }

    /// Snapshot the notes expected in the session, in temporal order.
    ///
    /// The order of `notes` becomes the ID space; entries are stable-sorted
    /// by time so equal-time notes keep their authored relative order.
    /// `ignore_direction` must be set when a no-direction modifier is
    /// active, because the runtime then reports every cut as direction
    /// [`Any`](cadence_types::CutDirection::Any).
    pub fn begin_session(&mut self, mut notes: Vec<NoteKey>, ignore_direction: bool) {
        notes.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.known = notes;
        self.last = 0;
        self.ignore_direction = ignore_direction;
    }

    /// Clear all session state.
    pub fn reset(&mut self) {
        self.known.clear();
        self.last = 0;
        self.ignore_direction = false;
    }

    /// Number of notes known to the current session.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether no session is active.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Resolve a transient note reference to its stable index.
    ///
    /// Scans ascending from just behind the cursor to the end, then
    /// descending over the prefix. A forward match advances the cursor.
    /// Returns `None` when nothing matches structurally; the caller
    /// reports that as the unknown-identity sentinel.
    pub fn resolve(&mut self, key: &NoteKey) -> Option<usize> {
        let window_start = self.last.saturating_sub(LOOKBACK);

        let found = self
            .known
            .iter()
            .enumerate()
            .skip(window_start)
            .find(|(_, known)| known.matches(key, self.ignore_direction))
            .map(|(index, _)| index)
            .or_else(|| {
                self.known
                    .iter()
                    .enumerate()
                    .take(window_start)
                    .rev()
                    .find(|(_, known)| known.matches(key, self.ignore_direction))
                    .map(|(index, _)| index)
            });

        if let Some(index) = found
            && index > self.last
        {
            self.last = index;
        }
        found
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use cadence_types::{CutDirection, NoteKind};

    use super::*;

    fn note(time: f32, line: i32, direction: CutDirection) -> NoteKey {
        NoteKey {
            time,
            line,
            layer: 0,
            kind: NoteKind::NoteA,
            direction,
        }
    }

    fn sequential_notes(count: usize) -> Vec<NoteKey> {
        (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let time = i as f32 * 0.5;
                note(time, 0, CutDirection::Down)
            })
            .collect()
    }

    #[test]
    fn in_order_resolution_returns_sequential_indices() {
        let mut resolver = NoteIdentityResolver::new();
        let notes = sequential_notes(50);
        resolver.begin_session(notes.clone(), false);

        for (expected, key) in notes.iter().enumerate() {
            assert_eq!(resolver.resolve(key), Some(expected));
        }
    }

    #[test]
    fn out_of_order_within_lookback_is_found() {
        let mut resolver = NoteIdentityResolver::new();
        let notes = sequential_notes(50);
        resolver.begin_session(notes.clone(), false);

        // Advance the cursor deep into the session, then resolve notes
        // behind it, as late follow-through events would.
        assert_eq!(resolver.resolve(notes.get(30).unwrap()), Some(30));

        // Ten back lands inside the ascending window.
        assert_eq!(resolver.resolve(notes.get(20).unwrap()), Some(20));

        // Eleven back is only reachable through the descending fallback.
        assert_eq!(resolver.resolve(notes.get(19).unwrap()), Some(19));

        // The cursor must not regress.
        assert_eq!(resolver.resolve(notes.get(31).unwrap()), Some(31));
    }

    #[test]
    fn simultaneous_notes_resolve_to_distinct_indices() {
        let mut resolver = NoteIdentityResolver::new();
        let notes = vec![
            note(1.0, 0, CutDirection::Down),
            note(1.0, 3, CutDirection::Up),
            note(2.0, 1, CutDirection::Left),
        ];
        resolver.begin_session(notes.clone(), false);

        // Cut right-to-left: the second simultaneous note first.
        assert_eq!(resolver.resolve(notes.get(1).unwrap()), Some(1));
        assert_eq!(resolver.resolve(notes.get(0).unwrap()), Some(0));
        assert_eq!(resolver.resolve(notes.get(2).unwrap()), Some(2));
    }

    #[test]
    fn unmatched_key_yields_none() {
        let mut resolver = NoteIdentityResolver::new();
        resolver.begin_session(sequential_notes(10), false);

        let stray = note(99.0, 2, CutDirection::Any);
        assert_eq!(resolver.resolve(&stray), None);
    }

    #[test]
    fn direction_is_ignored_when_modifier_active() {
        let mut resolver = NoteIdentityResolver::new();
        resolver.begin_session(vec![note(1.0, 0, CutDirection::Down)], true);

        let reported = note(1.0, 0, CutDirection::Any);
        assert_eq!(resolver.resolve(&reported), Some(0));
    }

    #[test]
    fn reset_leaves_no_residual_mapping() {
        let mut resolver = NoteIdentityResolver::new();
        let notes = sequential_notes(20);
        resolver.begin_session(notes.clone(), false);
        assert_eq!(resolver.resolve(notes.get(15).unwrap()), Some(15));

        resolver.reset();
        assert!(resolver.is_empty());
        assert_eq!(resolver.resolve(notes.first().unwrap()), None);

        // A new session with an identical first note resolves to index 0,
        // not to a stale cursor position.
        resolver.begin_session(notes, false);
        let first = note(0.0, 0, CutDirection::Down);
        assert_eq!(resolver.resolve(&first), Some(0));
    }

    #[test]
    fn begin_session_sorts_by_time() {
        let mut resolver = NoteIdentityResolver::new();
        let early = note(0.5, 1, CutDirection::Down);
        let late = note(3.0, 2, CutDirection::Up);
        resolver.begin_session(vec![late, early], false);

        assert_eq!(resolver.resolve(&early), Some(0));
        assert_eq!(resolver.resolve(&late), Some(1));
    }
}

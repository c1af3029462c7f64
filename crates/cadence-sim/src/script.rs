//! Deterministic playthrough script generation.
//!
//! A [`Playthrough`] is everything one scripted session needs: the content
//! metadata, the ordered note list (the resolver's ID space), and a timed
//! event stream for the driver to replay. Generation is pure with respect
//! to the RNG, so identical seeds replay identically.

use cadence_types::{Content, CutDirection, NoteKey, NoteKind};
use rand::Rng;
use rand::rngs::SmallRng;
use tracing::warn;

use crate::config::DriverConfig;
use crate::scoring;

/// How long after a clean cut the follow-through swing resolves.
const RESOLVE_DELAY_MS: i64 = 400;

/// Gap inserted by the scripted mid-session pause.
const PAUSE_GAP_MS: i64 = 1500;

/// One scripted simulation occurrence, relative to session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    /// Milliseconds after session start at which the event fires.
    pub at_ms: i64,
    /// What happens.
    pub event: SimEvent,
}

/// The kinds of occurrences the driver replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// An object was cut; `clean` distinguishes a good cut from a bad one.
    Cut {
        /// Index into the playthrough's note list.
        index: usize,
        /// Whether the cut satisfied all scoring conditions.
        clean: bool,
    },
    /// The follow-through swing of an earlier cut resolved.
    CutResolved {
        /// Index into the playthrough's note list.
        index: usize,
    },
    /// An object left play without being cut.
    Miss {
        /// Index into the playthrough's note list.
        index: usize,
    },
    /// The player's head entered an obstacle.
    ObstacleEnter,
    /// The player's head left an obstacle.
    ObstacleExit,
    /// A lighting/timeline event fired.
    Lighting {
        /// Simulation-defined event type.
        event_type: i32,
        /// Simulation-defined event value.
        value: i32,
    },
    /// Playback paused.
    Pause,
    /// Playback resumed.
    Resume,
    /// The map was completed.
    Finish,
}

/// One generated session: content, note list, and the event timeline.
#[derive(Debug, Clone)]
pub struct Playthrough {
    /// Content metadata for the status model.
    pub content: Content,
    /// Notes in temporal order; positions are the stable ID space.
    pub notes: Vec<NoteKey>,
    /// Timed events, sorted by time.
    pub events: Vec<TimedEvent>,
}

/// Generate a playthrough from the configuration.
///
/// The note grid, miss pattern, and bomb placement are derived from the
/// config; cut directions and lighting payloads come from the RNG.
pub fn generate(config: &DriverConfig, rng: &mut SmallRng) -> Playthrough {
    let play = &config.playthrough;
    let song = &config.song;

    let ms_per_beat = 60_000.0 / f64::from(song.bpm.max(1.0));
    let directions = [
        CutDirection::Up,
        CutDirection::Down,
        CutDirection::Left,
        CutDirection::Right,
        CutDirection::UpLeft,
        CutDirection::UpRight,
        CutDirection::DownLeft,
        CutDirection::DownRight,
    ];

    // --- Note grid ---
    let mut notes = Vec::new();
    for i in 0..play.notes_count {
        let ordinal = i.saturating_add(1);
        let is_bomb = play.bomb_every != 0 && ordinal % play.bomb_every == 0;
        let beats = f64::from(ordinal) * f64::from(play.note_interval_beats);

        let kind = if is_bomb {
            NoteKind::Bomb
        } else if i % 2 == 0 {
            NoteKind::NoteA
        } else {
            NoteKind::NoteB
        };
        let direction = if is_bomb {
            CutDirection::Any
        } else {
            let pick = rng.random_range(0..directions.len());
            directions.get(pick).copied().unwrap_or(CutDirection::Any)
        };

        #[allow(clippy::cast_possible_truncation)]
        notes.push(NoteKey {
            time: beats as f32,
            line: i32::try_from(i % 4).unwrap_or(0),
            layer: i32::try_from((i / 4) % 3).unwrap_or(0),
            kind,
            direction,
        });
    }

    // --- Event timeline ---
    let mut events = Vec::new();
    let mut last_ms: i64 = 0;
    for (index, note) in notes.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let at_ms = (f64::from(note.time) * ms_per_beat) as i64;
        last_ms = last_ms.max(at_ms);
        let ordinal = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);

        if note.kind.is_bomb() {
            // Bombs are usually avoided; one in four is clipped.
            if rng.random_range(0..4) == 0 {
                events.push(TimedEvent {
                    at_ms,
                    event: SimEvent::Cut { index, clean: false },
                });
            } else {
                events.push(TimedEvent {
                    at_ms,
                    event: SimEvent::Miss { index },
                });
            }
        } else if play.miss_every != 0 && ordinal % play.miss_every == 0 {
            events.push(TimedEvent {
                at_ms,
                event: SimEvent::Miss { index },
            });
        } else {
            events.push(TimedEvent {
                at_ms,
                event: SimEvent::Cut { index, clean: true },
            });
            events.push(TimedEvent {
                at_ms: at_ms.saturating_add(RESOLVE_DELAY_MS),
                event: SimEvent::CutResolved { index },
            });
        }

        // Sparse lighting traffic alongside the notes.
        if ordinal % 4 == 0 {
            events.push(TimedEvent {
                at_ms: at_ms.saturating_add(50),
                event: SimEvent::Lighting {
                    event_type: rng.random_range(0..5),
                    value: rng.random_range(0..8),
                },
            });
        }
    }

    // A wall crosses the track a third of the way in.
    let obstacle_at = last_ms / 3;
    events.push(TimedEvent {
        at_ms: obstacle_at,
        event: SimEvent::ObstacleEnter,
    });
    events.push(TimedEvent {
        at_ms: obstacle_at.saturating_add(800),
        event: SimEvent::ObstacleExit,
    });

    // A pause halfway through; later events shift by the gap.
    let pause_at = last_ms / 2;
    for timed in &mut events {
        if timed.at_ms > pause_at {
            timed.at_ms = timed.at_ms.saturating_add(PAUSE_GAP_MS);
        }
    }
    events.push(TimedEvent {
        at_ms: pause_at,
        event: SimEvent::Pause,
    });
    events.push(TimedEvent {
        at_ms: pause_at.saturating_add(PAUSE_GAP_MS),
        event: SimEvent::Resume,
    });

    let finish_at = last_ms.saturating_add(PAUSE_GAP_MS).saturating_add(1000);
    events.push(TimedEvent {
        at_ms: finish_at,
        event: SimEvent::Finish,
    });

    events.sort_by_key(|timed| timed.at_ms);

    // --- Content metadata ---
    let bombs_count = notes.iter().filter(|n| n.kind.is_bomb()).count();
    let notes_only = notes.len().saturating_sub(bombs_count);
    let notes_only = u32::try_from(notes_only).unwrap_or(u32::MAX);
    let bombs_count = u32::try_from(bombs_count).unwrap_or(u32::MAX);

    let content = Content {
        name: song.name.clone(),
        sub_name: String::new(),
        author_name: song.author_name.clone(),
        level_author_name: song.level_author_name.clone(),
        cover: play.cover_path.as_deref().and_then(load_cover),
        hash: Some(format!("{:040x}", play.seed)),
        bpm: song.bpm,
        note_jump_speed: 16.0,
        song_time_offset_ms: 0,
        length_ms: finish_at.saturating_add(1000),
        start_ms: None,
        paused_ms: None,
        difficulty: Some(song.difficulty.clone()),
        notes_count: notes_only,
        bombs_count,
        obstacles_count: 1,
        max_score: scoring::max_score_for_notes(notes_only),
        max_rank: String::from("SSS"),
        environment: Some(song.environment.clone()),
    };

    Playthrough {
        content,
        notes,
        events,
    }
}

/// Read and base64-encode a cover image.
///
/// Any failure degrades to an absent cover; it never fails the session.
fn load_cover(path: &str) -> Option<String> {
    use base64::Engine as _;

    match std::fs::read(path) {
        Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        Err(e) => {
            warn!(path, error = %e, "cover image unavailable, continuing without");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use rand::SeedableRng;

    use super::*;

    fn generate_default(seed: u64) -> Playthrough {
        let config = DriverConfig::default();
        let mut rng = SmallRng::seed_from_u64(seed);
        generate(&config, &mut rng)
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let a = generate_default(7);
        let b = generate_default(7);
        assert_eq!(a.notes, b.notes);
        assert_eq!(a.events, b.events);
        assert_eq!(a.content, b.content);
    }

    #[test]
    fn notes_are_in_temporal_order() {
        let playthrough = generate_default(42);
        for pair in playthrough.notes.windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
    }

    #[test]
    fn events_are_sorted_and_end_with_finish() {
        let playthrough = generate_default(42);
        for pair in playthrough.events.windows(2) {
            assert!(pair[0].at_ms <= pair[1].at_ms);
        }
        let last = playthrough.events.last().unwrap();
        assert_eq!(last.event, SimEvent::Finish);
    }

    #[test]
    fn bomb_cadence_follows_config() {
        let playthrough = generate_default(42);
        let config = DriverConfig::default();
        let expected = config.playthrough.notes_count / config.playthrough.bomb_every;
        assert_eq!(playthrough.content.bombs_count, expected);
        assert_eq!(
            playthrough.content.notes_count,
            config.playthrough.notes_count - expected
        );
    }

    #[test]
    fn pause_precedes_resume_by_the_gap() {
        let playthrough = generate_default(42);
        let pause = playthrough
            .events
            .iter()
            .find(|t| t.event == SimEvent::Pause)
            .unwrap();
        let resume = playthrough
            .events
            .iter()
            .find(|t| t.event == SimEvent::Resume)
            .unwrap();
        assert_eq!(resume.at_ms - pause.at_ms, PAUSE_GAP_MS);
    }

    #[test]
    fn missing_cover_degrades_to_none() {
        let mut config = DriverConfig::default();
        config.playthrough.cover_path = Some(String::from("/definitely/not/here.png"));
        let mut rng = SmallRng::seed_from_u64(1);
        let playthrough = generate(&config, &mut rng);
        assert!(playthrough.content.cover.is_none());
    }
}

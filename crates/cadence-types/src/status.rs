//! The status categories and the [`StatusModel`] aggregate.
//!
//! One [`StatusModel`] instance exists per process. It is exclusively owned
//! and mutated by the simulation's update loop; every other execution
//! context reads it through the marshaled snapshot path. Absence is modeled
//! with `Option` (no map loaded, clock not started, no cover art) rather
//! than zeroed defaults, so consumers never see misleading zeros.

use serde::{Deserialize, Serialize};

use crate::notes::{CutDirection, NoteKind};

/// Wire-contract version advertised in the session category.
pub const PROTOCOL_VERSION: &str = "1.1.0";

/// Scene/mode identity and version strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Name of the active scene (`"Menu"` outside of play).
    pub scene: String,
    /// Gameplay mode name, absent in the menu.
    pub mode: Option<String>,
    /// Whether a local multiplayer (party) session is active.
    pub party_mode: bool,
    /// Version of the broadcasting server.
    pub server_version: String,
    /// Version of the wire contract.
    pub protocol_version: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            scene: String::from("Menu"),
            mode: None,
            party_mode: false,
            server_version: String::from(env!("CARGO_PKG_VERSION")),
            protocol_version: String::from(PROTOCOL_VERSION),
        }
    }
}

/// Metadata of the currently loaded map.
///
/// The whole category is absent (`StatusModel::content == None`) when
/// nothing is loaded; its presence is the signal that performance data is
/// meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Song title.
    pub name: String,
    /// Song subtitle, empty when the map has none.
    pub sub_name: String,
    /// Performing artist.
    pub author_name: String,
    /// Mapper credit.
    pub level_author_name: String,
    /// Base64-encoded cover image; absent when the fetch failed.
    pub cover: Option<String>,
    /// Content hash of the map, when known.
    pub hash: Option<String>,
    /// Beats per minute.
    pub bpm: f32,
    /// Note jump speed for the selected difficulty.
    pub note_jump_speed: f32,
    /// Audio offset in milliseconds.
    pub song_time_offset_ms: i64,
    /// Total length in milliseconds.
    pub length_ms: i64,
    /// Unix millisecond timestamp at which playback started; unset until
    /// the session clock starts.
    pub start_ms: Option<i64>,
    /// Unix millisecond timestamp at which playback was paused; unset
    /// while playing.
    pub paused_ms: Option<i64>,
    /// Difficulty name of the selected beatmap.
    pub difficulty: Option<String>,
    /// Number of cuttable notes in the map.
    pub notes_count: u32,
    /// Number of bombs in the map.
    pub bombs_count: u32,
    /// Number of obstacles in the map.
    pub obstacles_count: u32,
    /// Maximum achievable score without modifiers.
    pub max_score: u32,
    /// Rank awarded at the maximum score.
    pub max_rank: String,
    /// Environment (stage) name.
    pub environment: Option<String>,
}

/// Live performance counters.
///
/// Serialized as `null` until the session clock starts, so a zero score is
/// never conflated with "no score yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    /// Current score with modifiers applied.
    pub score: u32,
    /// Maximum score achievable for the notes passed so far.
    pub current_max_score: u32,
    /// Rank for the current score against the current ceiling.
    pub rank: String,
    /// Notes that have left play, hit or not.
    pub passed_notes: u32,
    /// Notes cut cleanly.
    pub hit_notes: u32,
    /// Notes missed or cut wrong.
    pub missed_notes: u32,
    /// Score of the most recent note.
    pub last_note_score: i32,
    /// Bombs that have left play.
    pub passed_bombs: u32,
    /// Bombs touched.
    pub hit_bombs: u32,
    /// Current combo.
    pub combo: u32,
    /// Longest combo so far.
    pub max_combo: u32,
    /// Current score multiplier.
    pub multiplier: u32,
    /// Progress toward the next multiplier step, `0.0..1.0`.
    pub multiplier_progress: f32,
    /// Remaining energy, `0.0..1.0`.
    pub energy: f32,
    /// Whether the energy floor was reached with No Fail active.
    pub soft_failed: bool,
}

impl Default for Performance {
    fn default() -> Self {
        Self {
            score: 0,
            current_max_score: 0,
            rank: String::from("E"),
            passed_notes: 0,
            hit_notes: 0,
            missed_notes: 0,
            last_note_score: 0,
            passed_bombs: 0,
            hit_bombs: 0,
            combo: 0,
            max_combo: 0,
            multiplier: 1,
            multiplier_progress: 0.0,
            energy: 0.5,
            soft_failed: false,
        }
    }
}

/// Detail of the last discrete cut interaction.
///
/// Fully overwritten on every cut-lifecycle event, never merged; it gets
/// its own category because it fires far more often than the performance
/// counters and consumers must not be forced to re-parse them for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetail {
    /// Stable correlation index for the note, unset when resolution failed.
    pub note_id: Option<usize>,
    /// Kind of the object that was cut.
    pub note_kind: Option<NoteKind>,
    /// Authored cut direction of the note.
    pub cut_direction: Option<CutDirection>,
    /// Horizontal lane of the note.
    pub line: i32,
    /// Vertical layer of the note.
    pub layer: i32,
    /// Whether the saber moved fast enough.
    pub speed_ok: bool,
    /// Whether the swing direction was acceptable; meaningless for bombs.
    pub direction_ok: bool,
    /// Whether the correct saber was used; meaningless for bombs.
    pub saber_type_ok: bool,
    /// Whether the cut landed before the note was cuttable.
    pub was_cut_too_soon: bool,
    /// Score at the moment of the cut, before the follow-through resolves.
    pub initial_score: Option<i32>,
    /// Final score once the follow-through swing resolved.
    pub final_score: Option<i32>,
    /// Combo multiplier at the time of the cut.
    pub cut_multiplier: u32,
    /// Saber speed at the moment of the cut.
    pub saber_speed: f32,
    /// Saber direction vector at the moment of the cut.
    pub saber_dir: [f32; 3],
    /// Which saber performed the cut.
    pub saber_type: Option<String>,
    /// Swing quality rating, `0.0..1.0`.
    pub swing_rating: f32,
    /// Deviation from perfect timing, in seconds.
    pub time_deviation: f32,
    /// Deviation from the authored cut direction, in degrees.
    pub cut_direction_deviation: f32,
    /// Point where the cut plane intersected the note.
    pub cut_point: [f32; 3],
    /// Normal of the cut plane.
    pub cut_normal: [f32; 3],
    /// Distance from the cut plane to the note center.
    pub cut_distance_to_center: f32,
    /// Seconds until the next cuttable note.
    pub time_to_next_note: f32,
}

impl Default for EventDetail {
    fn default() -> Self {
        Self {
            note_id: None,
            note_kind: None,
            cut_direction: None,
            line: 0,
            layer: 0,
            speed_ok: false,
            direction_ok: false,
            saber_type_ok: false,
            was_cut_too_soon: false,
            initial_score: None,
            final_score: None,
            cut_multiplier: 0,
            saber_speed: 0.0,
            saber_dir: [0.0; 3],
            saber_type: None,
            swing_rating: 0.0,
            time_deviation: 0.0,
            cut_direction_deviation: 0.0,
            cut_point: [0.0; 3],
            cut_normal: [0.0; 3],
            cut_distance_to_center: 0.0,
            time_to_next_note: 0.0,
        }
    }
}

/// Behavior-modifying settings for the current session, plus the score
/// scalar and maxima they derive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Product of all active modifier score factors.
    pub multiplier: f32,
    /// Maximum achievable score under the active modifiers.
    pub max_score: u32,
    /// Rank awarded at that maximum.
    pub max_rank: String,
    /// Obstacle setting (`"All"`, `"FullHeightOnly"`, `"None"`).
    pub obstacles: String,
    /// Fail on the first miss.
    pub insta_fail: bool,
    /// Never fail; score penalty applies once rescued.
    pub no_fail: bool,
    /// Battery energy mode (fixed number of lives).
    pub battery_energy: bool,
    /// Number of lives in battery mode.
    pub battery_lives: u32,
    /// Note arrows fade on approach.
    pub disappearing_arrows: bool,
    /// Map bombs are removed.
    pub no_bombs: bool,
    /// Song speed setting (`"Normal"`, `"Slower"`, `"Faster"`).
    pub song_speed: String,
    /// Playback rate factor for the speed setting.
    pub song_speed_multiplier: f32,
    /// Notes may be cut in any direction.
    pub no_arrows: bool,
    /// Notes are invisible while cuttable.
    pub ghost_notes: bool,
    /// Saber clash causes a fail.
    pub fail_on_saber_clash: bool,
    /// Tighter cut-angle tolerance.
    pub strict_angles: bool,
    /// Notes approach faster than authored.
    pub fast_notes: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            max_score: 0,
            max_rank: String::from("E"),
            obstacles: String::from("All"),
            insta_fail: false,
            no_fail: false,
            battery_energy: false,
            battery_lives: 1,
            disappearing_arrows: false,
            no_bombs: false,
            song_speed: String::from("Normal"),
            song_speed_multiplier: 1.0,
            no_arrows: false,
            ghost_notes: false,
            fail_on_saber_clash: false,
            strict_angles: false,
            fast_notes: false,
        }
    }
}

/// Presentation and accessibility preferences.
///
/// Changes only at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// Static light show instead of map-driven lighting.
    pub static_lights: bool,
    /// Mirrored saber assignment.
    pub left_handed: bool,
    /// Player height in meters.
    pub player_height: f32,
    /// Sound-effect volume, `0.0..1.0`.
    pub sfx_volume: f32,
    /// Fewer cut-debris particles.
    pub reduce_debris: bool,
    /// HUD hidden entirely.
    pub no_hud: bool,
    /// Extended HUD elements shown.
    pub advanced_hud: bool,
    /// Automatic restart on fail.
    pub auto_restart: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            static_lights: false,
            left_handed: false,
            player_height: 1.7,
            sfx_volume: 0.7,
            reduce_debris: false,
            no_hud: false,
            advanced_hud: false,
            auto_restart: false,
        }
    }
}

/// Opaque simulation-authored timeline event payload.
///
/// Overwritten on every arrival; the broadcaster attaches no meaning to
/// the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenericEvent {
    /// Event type discriminator, simulation-defined.
    pub event_type: i32,
    /// Event value, simulation-defined.
    pub value: i32,
}

/// The canonical mutable aggregate of simulation state.
///
/// Exactly one instance exists; it lives as long as the process and is
/// mutated only by the owner execution context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusModel {
    /// Scene/mode identity.
    pub session: Session,
    /// Loaded map metadata, absent in the menu.
    pub content: Option<Content>,
    /// Live performance counters.
    pub performance: Performance,
    /// Last cut detail.
    pub event_detail: EventDetail,
    /// Active modifiers.
    pub modifiers: Modifiers,
    /// Player preferences.
    pub player_settings: PlayerSettings,
    /// Last timeline event.
    pub generic_event: GenericEvent,
}

impl StatusModel {
    /// Whether performance data is currently meaningful.
    ///
    /// True once a map is loaded and its session clock has started.
    pub fn performance_active(&self) -> bool {
        self.content.as_ref().is_some_and(|c| c.start_ms.is_some())
    }

    /// Drop the loaded map and its clock.
    pub fn reset_content(&mut self) {
        self.content = None;
    }

    /// Return all performance counters to their session-start values.
    pub fn reset_performance(&mut self) {
        self.performance = Performance::default();
    }

    /// Clear the last cut detail.
    pub fn reset_event_detail(&mut self) {
        self.event_detail = EventDetail::default();
    }
}

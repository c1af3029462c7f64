//! Well-known cause labels.
//!
//! A cause is the short machine-readable tag naming why a publish fired;
//! consumers branch on it. The hub accepts any label, these are the ones
//! the stock integration emits.

/// Synthetic first event of every subscription, carrying a full snapshot.
pub const HELLO: &str = "hello";
/// Returned to the menu.
pub const MENU: &str = "menu";
/// Entered a scene that is neither menu nor gameplay.
pub const SCENE: &str = "scene";
/// A map was loaded and its session clock started.
pub const SONG_START: &str = "songStart";
/// Playback paused.
pub const PAUSE: &str = "pause";
/// Playback resumed.
pub const RESUME: &str = "resume";
/// A note was cut cleanly; the follow-through is still resolving.
pub const NOTE_CUT: &str = "noteCut";
/// The follow-through swing for an earlier cut resolved.
pub const NOTE_FULLY_CUT: &str = "noteFullyCut";
/// A note was missed or cut wrong.
pub const NOTE_MISSED: &str = "noteMissed";
/// A bomb was touched.
pub const BOMB_CUT: &str = "bombCut";
/// A bomb left play untouched.
pub const BOMB_MISSED: &str = "bombMissed";
/// The score counter changed.
pub const SCORE_CHANGED: &str = "scoreChanged";
/// The player's head entered an obstacle.
pub const OBSTACLE_ENTER: &str = "obstacleEnter";
/// The player's head left an obstacle.
pub const OBSTACLE_EXIT: &str = "obstacleExit";
/// The map was completed.
pub const FINISHED: &str = "finished";
/// The energy floor was reached.
pub const FAILED: &str = "failed";
/// The energy floor was reached with No Fail active.
pub const SOFT_FAILED: &str = "softFailed";
/// A simulation-authored timeline event fired.
pub const EVENT: &str = "event";

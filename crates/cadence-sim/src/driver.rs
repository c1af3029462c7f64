//! The owner-thread update loop.
//!
//! The [`Driver`] stands in for the game engine: it owns the
//! [`TelemetryHub`] on a dedicated thread, replays a scripted playthrough
//! against the status model, publishes each mutation with the matching
//! change set and cause, and services the gate once per loop iteration so
//! foreign-context reads and subscriptions are answered within one tick.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cadence_core::{NoteIdentityResolver, TelemetryHub, cause};
use cadence_types::{
    ChangeSet, CutDirection, EventDetail, GenericEvent, Modifiers, NoteKey, NoteKind, Performance,
};
use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::DriverConfig;
use crate::script::{self, Playthrough, SimEvent, TimedEvent};
use crate::scoring;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionOutcome {
    /// The script ran to its finish event.
    Completed,
    /// The energy floor was reached without No Fail.
    Failed,
    /// The stop flag was raised mid-session.
    Stopped,
}

/// A clean cut whose follow-through swing has not resolved yet.
struct PendingCut {
    detail: EventDetail,
    multiplier: u32,
}

/// Scripted simulation driver; the single owner of the hub.
pub struct Driver {
    hub: TelemetryHub,
    resolver: NoteIdentityResolver,
    rng: SmallRng,
    config: DriverConfig,
    pending_cuts: HashMap<usize, PendingCut>,
    pause_position_ms: Option<i64>,
}

impl Driver {
    /// Create a driver around a hub. The hub must not have been touched
    /// from any other thread yet; the first use pins ownership to the
    /// thread [`run`](Self::run) executes on.
    pub fn new(hub: TelemetryHub, config: DriverConfig) -> Self {
        let rng = SmallRng::seed_from_u64(config.playthrough.seed);
        Self {
            hub,
            resolver: NoteIdentityResolver::new(),
            rng,
            config,
            pending_cuts: HashMap::new(),
            pause_position_ms: None,
        }
    }

    /// Run sessions until the configured repeat count is reached or the
    /// stop flag is raised. Consumes the driver; the hub is dropped on
    /// return, which closes every subscriber stream.
    pub fn run(mut self, stop: &AtomicBool) {
        // Announce the initial menu state.
        self.hub.publish(ChangeSet::SESSION_REFRESH, cause::MENU);

        let mut sessions: u32 = 0;
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            let playthrough = script::generate(&self.config, &mut self.rng);
            let outcome = self.play_session(&playthrough, stop);
            self.end_session();

            sessions = sessions.saturating_add(1);
            info!(sessions, ?outcome, "session ended");

            if outcome == SessionOutcome::Stopped {
                break;
            }
            let repeat = self.config.playthrough.repeat;
            if repeat != 0 && sessions >= repeat {
                break;
            }
        }
        info!("driver loop ended");
    }

    fn play_session(&mut self, playthrough: &Playthrough, stop: &AtomicBool) -> SessionOutcome {
        let no_arrows = self.config.playthrough.no_arrows;
        let no_fail = self.config.playthrough.no_fail;

        self.resolver
            .begin_session(playthrough.notes.clone(), no_arrows);
        self.pending_cuts.clear();
        self.pause_position_ms = None;

        let base_max = playthrough.content.max_score;
        {
            let model = self.hub.status_mut();
            model.session.scene = String::from("Song");
            model.session.mode = Some(String::from("Standard"));

            let mut content = playthrough.content.clone();
            content.start_ms = Some(Utc::now().timestamp_millis());
            model.content = Some(content);

            model.reset_performance();
            model.reset_event_detail();

            model.modifiers = Modifiers {
                no_arrows,
                no_fail,
                ..Modifiers::default()
            };
            let factor = scoring::modifier_multiplier(&model.modifiers);
            model.modifiers.multiplier = factor;
            model.modifiers.max_score = scoring::modified_max_score(base_max, factor);
            model.modifiers.max_rank =
                String::from(scoring::rank_for_score(model.modifiers.max_score, base_max));
        }
        self.hub.publish(ChangeSet::SESSION_REFRESH, cause::SONG_START);

        let tick = Duration::from_millis(self.config.playthrough.tick_interval_ms.max(1));
        let session_start = Instant::now();

        for timed in &playthrough.events {
            loop {
                if stop.load(Ordering::Relaxed) {
                    return SessionOutcome::Stopped;
                }
                let elapsed =
                    i64::try_from(session_start.elapsed().as_millis()).unwrap_or(i64::MAX);
                if elapsed >= timed.at_ms {
                    break;
                }
                self.hub.service_gate();
                std::thread::sleep(tick);
            }
            self.hub.service_gate();

            if let Some(outcome) = self.apply(timed, playthrough) {
                return outcome;
            }
        }
        SessionOutcome::Completed
    }

    /// Return to the menu and wipe all session-scoped state, including
    /// the resolver; stale mappings must never leak into the next session.
    fn end_session(&mut self) {
        self.resolver.reset();
        self.pending_cuts.clear();
        self.pause_position_ms = None;

        let model = self.hub.status_mut();
        model.session.scene = String::from("Menu");
        model.session.mode = None;
        model.reset_content();
        model.reset_performance();
        model.reset_event_detail();

        self.hub.publish(ChangeSet::SESSION_REFRESH, cause::MENU);
        self.hub.service_gate();
    }

    fn apply(&mut self, timed: &TimedEvent, playthrough: &Playthrough) -> Option<SessionOutcome> {
        match timed.event {
            SimEvent::Cut { index, clean } => self.apply_cut(index, clean, playthrough),
            SimEvent::CutResolved { index } => {
                self.apply_cut_resolved(index);
                None
            }
            SimEvent::Miss { index } => self.apply_miss(index, playthrough),
            SimEvent::ObstacleEnter => {
                let performance = &mut self.hub.status_mut().performance;
                performance.energy = (performance.energy - 0.05).max(0.0);
                self.hub.publish(ChangeSet::PERFORMANCE, cause::OBSTACLE_ENTER);
                self.energy_check()
            }
            SimEvent::ObstacleExit => {
                self.hub.publish(ChangeSet::PERFORMANCE, cause::OBSTACLE_EXIT);
                None
            }
            SimEvent::Lighting { event_type, value } => {
                self.hub.status_mut().generic_event = GenericEvent { event_type, value };
                self.hub.publish(ChangeSet::GENERIC_EVENT, cause::EVENT);
                None
            }
            SimEvent::Pause => {
                self.pause_position_ms = Some(timed.at_ms);
                if let Some(content) = self.hub.status_mut().content.as_mut() {
                    content.paused_ms = Some(Utc::now().timestamp_millis());
                }
                self.hub.publish(ChangeSet::CONTENT, cause::PAUSE);
                None
            }
            SimEvent::Resume => {
                let position = self.pause_position_ms.take().unwrap_or(timed.at_ms);
                if let Some(content) = self.hub.status_mut().content.as_mut() {
                    // Rebase the start stamp so elapsed-time consumers
                    // stay aligned with the audio position.
                    content.start_ms = Some(Utc::now().timestamp_millis().saturating_sub(position));
                    content.paused_ms = None;
                }
                self.hub.publish(ChangeSet::CONTENT, cause::RESUME);
                None
            }
            SimEvent::Finish => {
                self.hub.publish(ChangeSet::PERFORMANCE, cause::FINISHED);
                None
            }
        }
    }

    fn apply_cut(
        &mut self,
        index: usize,
        clean: bool,
        playthrough: &Playthrough,
    ) -> Option<SessionOutcome> {
        let Some(note) = playthrough.notes.get(index).copied() else {
            return None;
        };
        let is_bomb = note.kind.is_bomb();

        let reported = self.reported_key(&note);
        let note_id = self.resolver.resolve(&reported);
        if note_id.is_none() {
            debug!(?note, "no structural match for cut, reporting unknown identity");
        }

        let initial = if is_bomb {
            None
        } else {
            Some(self.rng.random_range(40..=85_i32))
        };
        let mut detail = self.make_detail(&note, note_id, clean, initial);

        let multiplier;
        {
            let model = self.hub.status_mut();
            let performance = &mut model.performance;
            if is_bomb {
                performance.passed_bombs = performance.passed_bombs.saturating_add(1);
                performance.hit_bombs = performance.hit_bombs.saturating_add(1);
                reset_combo(performance);
                performance.energy = (performance.energy - 0.15).max(0.0);
            } else if clean {
                performance.passed_notes = performance.passed_notes.saturating_add(1);
                performance.hit_notes = performance.hit_notes.saturating_add(1);
                advance_combo(performance);
                performance.energy = (performance.energy + 0.01).min(1.0);
            } else {
                performance.passed_notes = performance.passed_notes.saturating_add(1);
                performance.missed_notes = performance.missed_notes.saturating_add(1);
                reset_combo(performance);
                performance.energy = (performance.energy - 0.1).max(0.0);
            }
            multiplier = performance.multiplier;

            detail.cut_multiplier = multiplier;
            model.event_detail = detail.clone();
        }

        let label = if is_bomb {
            cause::BOMB_CUT
        } else if clean {
            cause::NOTE_CUT
        } else {
            cause::NOTE_MISSED
        };
        self.hub
            .publish(ChangeSet::PERFORMANCE | ChangeSet::EVENT_DETAIL, label);

        if is_bomb {
            self.bump_score(0);
        } else {
            let gained = if clean {
                self.pending_cuts
                    .insert(index, PendingCut { detail, multiplier });
                initial
                    .and_then(|i| u32::try_from(i).ok())
                    .unwrap_or(0)
                    .saturating_mul(multiplier)
            } else {
                0
            };
            self.bump_score(gained);
        }

        self.energy_check()
    }

    fn apply_cut_resolved(&mut self, index: usize) {
        let Some(pending) = self.pending_cuts.remove(&index) else {
            return;
        };

        let after = self.rng.random_range(10..=30_i32);
        let initial = pending.detail.initial_score.unwrap_or(0);
        let final_score = initial.saturating_add(after);

        let mut detail = pending.detail;
        detail.final_score = Some(final_score);

        let gained = u32::try_from(after)
            .unwrap_or(0)
            .saturating_mul(pending.multiplier);
        {
            let model = self.hub.status_mut();
            model.event_detail = detail;
            model.performance.last_note_score =
                final_score.saturating_mul(i32::try_from(pending.multiplier).unwrap_or(1));
        }
        self.hub.publish(
            ChangeSet::PERFORMANCE | ChangeSet::EVENT_DETAIL,
            cause::NOTE_FULLY_CUT,
        );

        self.bump_score(gained);
    }

    fn apply_miss(&mut self, index: usize, playthrough: &Playthrough) -> Option<SessionOutcome> {
        let Some(note) = playthrough.notes.get(index) else {
            return None;
        };

        if note.kind.is_bomb() {
            let performance = &mut self.hub.status_mut().performance;
            performance.passed_bombs = performance.passed_bombs.saturating_add(1);
            self.hub.publish(ChangeSet::PERFORMANCE, cause::BOMB_MISSED);
            return None;
        }

        {
            let performance = &mut self.hub.status_mut().performance;
            performance.passed_notes = performance.passed_notes.saturating_add(1);
            performance.missed_notes = performance.missed_notes.saturating_add(1);
            performance.last_note_score = 0;
            reset_combo(performance);
            performance.energy = (performance.energy - 0.1).max(0.0);
        }
        self.hub.publish(ChangeSet::PERFORMANCE, cause::NOTE_MISSED);
        self.bump_score(0);

        self.energy_check()
    }

    /// Fold gained points into the score, refresh the ceiling and rank,
    /// and announce the change.
    fn bump_score(&mut self, gained: u32) {
        {
            let performance = &mut self.hub.status_mut().performance;
            performance.score = performance.score.saturating_add(gained);
            performance.current_max_score = scoring::max_score_for_notes(performance.passed_notes);
            performance.rank = String::from(scoring::rank_for_score(
                performance.score,
                performance.current_max_score,
            ));
        }
        self.hub.publish(ChangeSet::PERFORMANCE, cause::SCORE_CHANGED);
    }

    /// React to the energy floor: soft fail under No Fail, hard fail
    /// otherwise.
    fn energy_check(&mut self) -> Option<SessionOutcome> {
        let no_fail = self.config.playthrough.no_fail;

        let (floored, already_soft) = {
            let performance = &self.hub.status().performance;
            (performance.energy <= 0.0, performance.soft_failed)
        };
        if !floored {
            return None;
        }

        if no_fail {
            if !already_soft {
                let base_max = {
                    let model = self.hub.status_mut();
                    model.performance.soft_failed = true;
                    model.modifiers.multiplier *= 0.5;
                    model.content.as_ref().map_or(0, |c| c.max_score)
                };
                let model = self.hub.status_mut();
                model.modifiers.max_score =
                    scoring::modified_max_score(base_max, model.modifiers.multiplier);
                model.modifiers.max_rank =
                    String::from(scoring::rank_for_score(model.modifiers.max_score, base_max));
                self.hub.publish(
                    ChangeSet::PERFORMANCE | ChangeSet::MODIFIERS,
                    cause::SOFT_FAILED,
                );
            }
            None
        } else {
            self.hub.publish(ChangeSet::PERFORMANCE, cause::FAILED);
            Some(SessionOutcome::Failed)
        }
    }

    /// The key as the runtime reports it: with a no-direction modifier the
    /// authored direction is replaced by `Any`.
    fn reported_key(&self, note: &NoteKey) -> NoteKey {
        if self.config.playthrough.no_arrows {
            NoteKey {
                direction: CutDirection::Any,
                ..*note
            }
        } else {
            *note
        }
    }

    fn make_detail(
        &mut self,
        note: &NoteKey,
        note_id: Option<usize>,
        clean: bool,
        initial: Option<i32>,
    ) -> EventDetail {
        let is_bomb = note.kind.is_bomb();
        let interval_s = self.config.playthrough.note_interval_beats * 60.0
            / self.config.song.bpm.max(1.0);
        let rng = &mut self.rng;

        EventDetail {
            note_id,
            note_kind: Some(note.kind),
            cut_direction: Some(note.direction),
            line: note.line,
            layer: note.layer,
            speed_ok: clean,
            direction_ok: clean && !is_bomb,
            saber_type_ok: clean && !is_bomb,
            was_cut_too_soon: !clean && !is_bomb,
            initial_score: initial,
            final_score: None,
            cut_multiplier: 0,
            saber_speed: rng.random_range(12.0..28.0),
            saber_dir: [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ],
            saber_type: Some(String::from(match note.kind {
                NoteKind::NoteB => "SaberB",
                _ => "SaberA",
            })),
            swing_rating: if clean {
                rng.random_range(0.7..1.0)
            } else {
                rng.random_range(0.0..0.5)
            },
            time_deviation: rng.random_range(-0.04..0.04),
            cut_direction_deviation: rng.random_range(-15.0..15.0),
            cut_point: [
                rng.random_range(-0.2..0.2),
                rng.random_range(-0.2..0.2),
                rng.random_range(-0.2..0.2),
            ],
            cut_normal: [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                0.0,
            ],
            cut_distance_to_center: rng.random_range(0.0..0.3),
            time_to_next_note: interval_s,
        }
    }
}

/// Advance the combo and the 1x/2x/4x/8x multiplier ramp.
fn advance_combo(performance: &mut Performance) {
    performance.combo = performance.combo.saturating_add(1);
    performance.max_combo = performance.max_combo.max(performance.combo);

    #[allow(clippy::cast_precision_loss)]
    let (multiplier, progress) = match performance.combo {
        c @ 0..=1 => (1, c as f32 / 2.0),
        c @ 2..=5 => (2, (c - 2) as f32 / 4.0),
        c @ 6..=13 => (4, (c - 6) as f32 / 8.0),
        _ => (8, 1.0),
    };
    performance.multiplier = multiplier;
    performance.multiplier_progress = progress;
}

/// Break the combo and reset the multiplier ramp.
fn reset_combo(performance: &mut Performance) {
    performance.combo = 0;
    performance.multiplier = 1;
    performance.multiplier_progress = 0.0;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use cadence_types::StatusModel;

    use super::*;

    #[test]
    fn combo_ramp_hits_documented_thresholds() {
        let mut performance = Performance::default();
        for _ in 0..1 {
            advance_combo(&mut performance);
        }
        assert_eq!(performance.multiplier, 1);

        advance_combo(&mut performance); // combo 2
        assert_eq!(performance.multiplier, 2);

        for _ in 0..4 {
            advance_combo(&mut performance); // combo 6
        }
        assert_eq!(performance.multiplier, 4);

        for _ in 0..8 {
            advance_combo(&mut performance); // combo 14
        }
        assert_eq!(performance.multiplier, 8);
        assert_eq!(performance.max_combo, 14);
    }

    #[test]
    fn combo_reset_returns_to_base_multiplier() {
        let mut performance = Performance::default();
        for _ in 0..20 {
            advance_combo(&mut performance);
        }
        reset_combo(&mut performance);
        assert_eq!(performance.combo, 0);
        assert_eq!(performance.multiplier, 1);
        assert_eq!(performance.max_combo, 20);
    }

    /// Fast end-to-end run: two scripted sessions against a live
    /// subscriber, checking the cause stream a consumer relies on.
    #[tokio::test]
    async fn scripted_sessions_stream_expected_causes() {
        let mut config = DriverConfig::default();
        config.playthrough.notes_count = 6;
        config.playthrough.note_interval_beats = 0.25;
        config.playthrough.tick_interval_ms = 1;
        config.playthrough.bomb_every = 4;
        config.playthrough.miss_every = 5;
        config.playthrough.repeat = 2;
        config.song.bpm = 600.0;

        let (hub, gate) = cadence_core::TelemetryHub::new(StatusModel::default());
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let worker =
            std::thread::spawn(move || Driver::new(hub, config).run(worker_stop.as_ref()));

        let mut channel = gate.subscribe().await.unwrap();
        let mut causes = Vec::new();
        while let Some(frame) = channel.recv().await {
            let value: serde_json::Value = serde_json::from_str(frame.as_ref()).unwrap();
            causes.push(value.get("event").unwrap().as_str().unwrap().to_owned());
        }
        worker.join().unwrap();

        assert_eq!(causes.first().map(String::as_str), Some("hello"));
        assert_eq!(causes.last().map(String::as_str), Some("menu"));

        for expected in [
            "songStart",
            "noteCut",
            "noteFullyCut",
            "scoreChanged",
            "noteMissed",
            "pause",
            "resume",
            "event",
            "obstacleEnter",
            "obstacleExit",
            "finished",
            "menu",
        ] {
            assert!(
                causes.iter().any(|c| c == expected),
                "missing cause {expected}"
            );
        }

        // Within one session the order is songStart before finished; use
        // the last session since the subscriber may join mid-first-session.
        let song_start = causes.iter().rposition(|c| c == "songStart").unwrap();
        let finished = causes.iter().rposition(|c| c == "finished").unwrap();
        assert!(song_start < finished);
    }
}

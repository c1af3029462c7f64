//! Per-category serialized views and the merged status document.
//!
//! The cache keeps one JSON document per wire concern: the composite
//! `status` object (five category sub-views updated in place), the
//! `eventDetail` document, and the `genericEvent` document. A rebuild
//! recomputes exactly the categories named in a [`ChangeSet`]; everything
//! else keeps its previous serialization. That is safe because a category
//! is always mutated before the publish that flags it, and never mutated
//! without a subsequent publish.
//!
//! Null-vs-absent rules are load-bearing for consumers and live here, in
//! one place: a missing map collapses the whole `content` view to `null`,
//! performance is `null` until the session clock starts, an empty cover is
//! `null`, and bomb cuts null out the fields that only make sense for
//! notes.

use cadence_types::{Category, ChangeSet, NoteKind, StatusModel};
use serde_json::{Map, Value, json};

/// Cached serialized representations of the status model.
///
/// Lifetime is tied to the model; both are owned by the hub and only ever
/// touched on the owner execution context.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    /// Composite status object with one key per status category.
    status: Value,
    /// Last cut detail document.
    event_detail: Value,
    /// Last timeline event document.
    generic_event: Value,
}

impl SnapshotCache {
    /// Build a cache with every view freshly serialized from the model.
    pub fn new(model: &StatusModel) -> Self {
        let mut status = Map::new();
        status.insert(Category::Session.key().to_owned(), session_view(model));
        status.insert(Category::Content.key().to_owned(), content_view(model));
        status.insert(
            Category::Performance.key().to_owned(),
            performance_view(model),
        );
        status.insert(Category::Modifiers.key().to_owned(), modifiers_view(model));
        status.insert(
            Category::PlayerSettings.key().to_owned(),
            player_settings_view(model),
        );

        Self {
            status: Value::Object(status),
            event_detail: event_detail_view(model),
            generic_event: generic_event_view(model),
        }
    }

    /// Recompute the views of exactly the categories named in `changes`.
    pub fn rebuild(&mut self, model: &StatusModel, changes: ChangeSet) {
        for category in changes.iter() {
            match category {
                Category::EventDetail => self.event_detail = event_detail_view(model),
                Category::GenericEvent => self.generic_event = generic_event_view(model),
                status_part => {
                    let view = match status_part {
                        Category::Session => session_view(model),
                        Category::Content => content_view(model),
                        Category::Performance => performance_view(model),
                        Category::Modifiers => modifiers_view(model),
                        _ => player_settings_view(model),
                    };
                    if let Some(status) = self.status.as_object_mut() {
                        status.insert(status_part.key().to_owned(), view);
                    }
                }
            }
        }
    }

    /// The composite status document, all categories merged.
    pub const fn merged_view(&self) -> &Value {
        &self.status
    }

    /// The cached view of one status category, by its wire key.
    ///
    /// Returns `None` for the two categories that are not part of the
    /// `status` object.
    pub fn status_view(&self, category: Category) -> Option<&Value> {
        if category.in_status() {
            self.status.get(category.key())
        } else {
            None
        }
    }

    /// The last cut detail document.
    pub const fn event_detail_view(&self) -> &Value {
        &self.event_detail
    }

    /// The last timeline event document.
    pub const fn generic_event_view(&self) -> &Value {
        &self.generic_event
    }
}

fn session_view(model: &StatusModel) -> Value {
    let session = &model.session;
    json!({
        "scene": session.scene,
        "mode": session.mode,
        "partyMode": session.party_mode,
        "serverVersion": session.server_version,
        "protocolVersion": session.protocol_version,
    })
}

fn content_view(model: &StatusModel) -> Value {
    let Some(content) = model.content.as_ref() else {
        return Value::Null;
    };

    // An empty cover string means the fetch was attempted and failed.
    let cover = content.cover.as_deref().filter(|c| !c.is_empty());

    json!({
        "songName": content.name,
        "songSubName": content.sub_name,
        "songAuthorName": content.author_name,
        "levelAuthorName": content.level_author_name,
        "songCover": cover,
        "songHash": content.hash,
        "songBPM": content.bpm,
        "noteJumpSpeed": content.note_jump_speed,
        "songTimeOffset": content.song_time_offset_ms,
        "length": content.length_ms,
        "start": content.start_ms,
        "paused": content.paused_ms,
        "difficulty": content.difficulty,
        "notesCount": content.notes_count,
        "bombsCount": content.bombs_count,
        "obstaclesCount": content.obstacles_count,
        "maxScore": content.max_score,
        "maxRank": content.max_rank,
        "environmentName": content.environment,
    })
}

fn performance_view(model: &StatusModel) -> Value {
    if !model.performance_active() {
        return Value::Null;
    }
    let performance = &model.performance;

    json!({
        "score": performance.score,
        "currentMaxScore": performance.current_max_score,
        "rank": performance.rank,
        "passedNotes": performance.passed_notes,
        "hitNotes": performance.hit_notes,
        "missedNotes": performance.missed_notes,
        "lastNoteScore": performance.last_note_score,
        "passedBombs": performance.passed_bombs,
        "hitBombs": performance.hit_bombs,
        "combo": performance.combo,
        "maxCombo": performance.max_combo,
        "multiplier": performance.multiplier,
        "multiplierProgress": performance.multiplier_progress,
        "energy": performance.energy,
        "softFailed": performance.soft_failed,
    })
}

fn modifiers_view(model: &StatusModel) -> Value {
    let modifiers = &model.modifiers;

    // "None" serializes as boolean false so consumers can truth-test it.
    let obstacles = if modifiers.obstacles == "None" {
        json!(false)
    } else {
        json!(modifiers.obstacles)
    };

    json!({
        "multiplier": modifiers.multiplier,
        "maxScore": modifiers.max_score,
        "maxRank": modifiers.max_rank,
        "obstacles": obstacles,
        "instaFail": modifiers.insta_fail,
        "noFail": modifiers.no_fail,
        "batteryEnergy": modifiers.battery_energy,
        "batteryLives": modifiers.battery_lives,
        "disappearingArrows": modifiers.disappearing_arrows,
        "noBombs": modifiers.no_bombs,
        "songSpeed": modifiers.song_speed,
        "songSpeedMultiplier": modifiers.song_speed_multiplier,
        "noArrows": modifiers.no_arrows,
        "ghostNotes": modifiers.ghost_notes,
        "failOnSaberClash": modifiers.fail_on_saber_clash,
        "strictAngles": modifiers.strict_angles,
        "fastNotes": modifiers.fast_notes,
    })
}

fn player_settings_view(model: &StatusModel) -> Value {
    let settings = &model.player_settings;
    json!({
        "staticLights": settings.static_lights,
        "leftHanded": settings.left_handed,
        "playerHeight": settings.player_height,
        "sfxVolume": settings.sfx_volume,
        "reduceDebris": settings.reduce_debris,
        "noHUD": settings.no_hud,
        "advancedHUD": settings.advanced_hud,
        "autoRestart": settings.auto_restart,
    })
}

fn event_detail_view(model: &StatusModel) -> Value {
    let detail = &model.event_detail;
    let is_bomb = detail.note_kind.is_some_and(NoteKind::is_bomb);

    // -1 is the unknown-identity sentinel on the wire.
    let note_id = detail.note_id.map_or(json!(-1), |id| json!(id));

    json!({
        "noteID": note_id,
        "noteType": detail.note_kind.map(NoteKind::as_str),
        "noteCutDirection": detail.cut_direction.map(cadence_types::CutDirection::as_str),
        "noteLine": detail.line,
        "noteLayer": detail.layer,
        "speedOK": detail.speed_ok,
        "directionOK": if is_bomb { Value::Null } else { json!(detail.direction_ok) },
        "saberTypeOK": if is_bomb { Value::Null } else { json!(detail.saber_type_ok) },
        "wasCutTooSoon": detail.was_cut_too_soon,
        "initialScore": detail.initial_score,
        "finalScore": detail.final_score,
        "multiplier": detail.cut_multiplier,
        "saberSpeed": detail.saber_speed,
        "saberDir": detail.saber_dir,
        "saberType": detail.saber_type,
        "swingRating": detail.swing_rating,
        "timeDeviation": detail.time_deviation,
        "cutDirectionDeviation": detail.cut_direction_deviation,
        "cutPoint": detail.cut_point,
        "cutNormal": detail.cut_normal,
        "cutDistanceToCenter": detail.cut_distance_to_center,
        "timeToNextNote": detail.time_to_next_note,
    })
}

fn generic_event_view(model: &StatusModel) -> Value {
    json!({
        "type": model.generic_event.event_type,
        "value": model.generic_event.value,
    })
}

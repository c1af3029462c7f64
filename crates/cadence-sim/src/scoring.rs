//! Score and rank helpers for the scripted driver.
//!
//! The broadcaster core carries whatever the simulation writes into the
//! model; these helpers are the demo driver's stand-in for the game's
//! scoring rules, used to keep `currentMaxScore`, `rank`, and the
//! modifier-derived maxima self-consistent.

use cadence_types::Modifiers;

/// Maximum score a single cut can award.
pub const MAX_CUT_SCORE: u32 = 115;

/// Maximum achievable score for the first `notes` notes of a map.
///
/// The combo multiplier ramps 1x for the first note, 2x for the next
/// four, 4x for the next eight, and 8x for everything after.
pub fn max_score_for_notes(notes: u32) -> u32 {
    let at_1x = notes.min(1);
    let at_2x = notes.saturating_sub(1).min(4);
    let at_4x = notes.saturating_sub(5).min(8);
    let at_8x = notes.saturating_sub(13);

    let units = at_1x
        .saturating_add(at_2x.saturating_mul(2))
        .saturating_add(at_4x.saturating_mul(4))
        .saturating_add(at_8x.saturating_mul(8));
    units.saturating_mul(MAX_CUT_SCORE)
}

/// Rank awarded for `score` against a ceiling of `max_score`.
///
/// Thresholds are fractions of the ceiling; a zero ceiling ranks `E`.
pub fn rank_for_score(score: u32, max_score: u32) -> &'static str {
    if max_score == 0 {
        return "E";
    }
    let ratio = f64::from(score) / f64::from(max_score);
    if ratio >= 1.0 {
        "SSS"
    } else if ratio >= 0.9 {
        "SS"
    } else if ratio >= 0.8 {
        "S"
    } else if ratio >= 0.65 {
        "A"
    } else if ratio >= 0.5 {
        "B"
    } else if ratio >= 0.35 {
        "C"
    } else if ratio >= 0.2 {
        "D"
    } else {
        "E"
    }
}

/// Combined score factor of the active modifiers.
///
/// The No Fail penalty is not part of this product; it only applies once
/// the rescue actually triggers, which the driver handles at that moment.
pub fn modifier_multiplier(modifiers: &Modifiers) -> f32 {
    let mut factor = 1.0_f32;
    if modifiers.no_bombs {
        factor *= 0.9;
    }
    if modifiers.obstacles == "None" {
        factor *= 0.95;
    }
    if modifiers.no_arrows {
        factor *= 0.7;
    }
    if modifiers.ghost_notes {
        factor *= 1.04;
    }
    if modifiers.disappearing_arrows {
        factor *= 1.07;
    }
    match modifiers.song_speed.as_str() {
        "Faster" => factor *= 1.08,
        "Slower" => factor *= 0.7,
        _ => {}
    }
    factor
}

/// Maximum achievable score once `multiplier` is applied to `base_max`.
pub fn modified_max_score(base_max: u32, multiplier: f32) -> u32 {
    let scaled = f64::from(base_max) * f64::from(multiplier);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = scaled.round().max(0.0) as u32;
    rounded
}

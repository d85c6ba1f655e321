//! Plant lifecycle state machine.
//!
//! Pure functions mapping (stage, health, elapsed time, action) to a new stage
//! and health. No I/O and no clock access: callers pass `now` in.
//!
//! Decay and growth are separate steps. A sweep applies [`apply_decay`] and
//! then [`apply_growth`], so a neglected plant is moved to `Decayed` (and stops
//! growing) while a cared-for plant advances one stage.

use chrono::{DateTime, Duration, Utc};

use crate::plant::{Action, GrowthStage, Plant};

/// Tunables for the lifecycle rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Maximum time since the last watering or feeding before decay applies.
    pub neglect_window: Duration,
    /// Health lost per decay step.
    pub decay_amount: u8,
    /// Health gained per watering.
    pub water_boost: u8,
    /// Health gained per feeding.
    pub feed_boost: u8,
    /// Upper bound for health.
    pub health_ceiling: u8,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            neglect_window: Duration::seconds(10),
            decay_amount: 10,
            water_boost: 10,
            feed_boost: 10,
            health_ceiling: 100,
        }
    }
}

impl LifecycleConfig {
    const fn boost(&self, action: Action) -> u8 {
        match action {
            Action::Water => self.water_boost,
            Action::Feed => self.feed_boost,
        }
    }
}

/// What [`apply_decay`] did to a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayOutcome {
    /// Not neglected, or already dead.
    Untouched,
    /// Lost health and moved to `Decayed`.
    Decayed,
    /// Health reached zero; the plant is now `Dead`.
    Died,
}

/// Maps a health level onto a growth stage.
///
/// Used when a decayed plant is revived by an action.
#[must_use]
pub const fn stage_for_health(health: u8) -> GrowthStage {
    match health {
        80..=u8::MAX => GrowthStage::Blooming,
        60..=79 => GrowthStage::Bloom,
        40..=59 => GrowthStage::Youngling,
        20..=39 => GrowthStage::Young,
        _ => GrowthStage::Seedling,
    }
}

/// Applies a care action at `now`.
///
/// Health rises by the action's boost, capped at the ceiling, and the matching
/// care timestamp is set. A `Decayed` plant that ends up with positive health
/// is put back on the progression via [`stage_for_health`]. `Dead` plants are
/// left exactly as they are.
pub fn apply_action(plant: &mut Plant, action: Action, now: DateTime<Utc>, cfg: &LifecycleConfig) {
    if plant.is_dead() {
        return;
    }

    match action {
        Action::Water => plant.last_watered = Some(now),
        Action::Feed => plant.last_fed = Some(now),
    }

    let ceiling = cfg.health_ceiling;
    plant.health_level = plant
        .health_level
        .min(ceiling)
        .saturating_add(cfg.boost(action))
        .min(ceiling);

    if plant.growth_stage == GrowthStage::Decayed && plant.health_level > 0 {
        plant.growth_stage = stage_for_health(plant.health_level);
    }
}

/// Returns true if either care timestamp is older than the neglect window.
///
/// A plant that was never watered (or fed) counts from `created_at`.
#[must_use]
pub fn is_neglected(plant: &Plant, now: DateTime<Utc>, cfg: &LifecycleConfig) -> bool {
    let water_gap = now - plant.last_watered.unwrap_or(plant.created_at);
    let feed_gap = now - plant.last_fed.unwrap_or(plant.created_at);
    water_gap > cfg.neglect_window || feed_gap > cfg.neglect_window
}

/// Charges one decay step if the plant has been neglected.
///
/// Every sweep that finds the plant neglected charges a step. A step already
/// charged at or after `now` blocks another one, so a repeated call with the
/// same `now` is a no-op.
pub fn apply_decay(plant: &mut Plant, now: DateTime<Utc>, cfg: &LifecycleConfig) -> DecayOutcome {
    let already_charged = plant.last_decayed.is_some_and(|at| at >= now);
    if plant.is_dead() || already_charged || !is_neglected(plant, now, cfg) {
        return DecayOutcome::Untouched;
    }

    plant.last_decayed = Some(now);
    let health = plant.health_level.min(cfg.health_ceiling);
    if health <= cfg.decay_amount {
        plant.health_level = 0;
        plant.growth_stage = GrowthStage::Dead;
        DecayOutcome::Died
    } else {
        plant.health_level = health - cfg.decay_amount;
        plant.growth_stage = GrowthStage::Decayed;
        DecayOutcome::Decayed
    }
}

/// Advances a growing plant one stage. Returns true if the stage changed.
///
/// `Decayed` and `Dead` plants do not grow; `Blooming` saturates.
pub fn apply_growth(plant: &mut Plant) -> bool {
    let next = plant.growth_stage.next();
    let grew = next != plant.growth_stage;
    plant.growth_stage = next;
    grew
}

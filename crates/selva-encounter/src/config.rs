//! Encounter configuration.
//!
//! Every tunable constant of the encounter lives here so that speed and
//! damage are always computed as `base * state * difficulty` and never
//! hard-coded at a call site.

use selva_common::{Aabb, ConfigError, Vec2};
use serde::{Deserialize, Serialize};

use crate::threat::{OverrideRules, ThreatTable};

/// Difficulty selected before the encounter starts.
///
/// Carried unchanged across phase transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// More health, softer hits
    Easy,
    /// Baseline tuning
    #[default]
    Normal,
    /// Less health, faster and harder hits
    Hard,
}

impl Difficulty {
    /// Multiplier on the player's max health.
    #[must_use]
    pub fn player_health_multiplier(self) -> f32 {
        match self {
            Self::Easy => 1.5,
            Self::Normal => 1.0,
            Self::Hard => 0.75,
        }
    }

    /// Multiplier on damage the player receives.
    #[must_use]
    pub fn incoming_damage_multiplier(self) -> f32 {
        match self {
            Self::Easy => 0.7,
            Self::Normal => 1.0,
            Self::Hard => 1.4,
        }
    }

    /// Multiplier on boss projectile speed.
    #[must_use]
    pub fn projectile_speed_multiplier(self) -> f32 {
        match self {
            Self::Easy => 0.8,
            Self::Normal => 1.0,
            Self::Hard => 1.25,
        }
    }

    /// Multiplier on damage bosses take from the player.
    #[must_use]
    pub fn boss_damage_taken_multiplier(self) -> f32 {
        match self {
            Self::Easy => 1.2,
            Self::Normal => 1.0,
            Self::Hard => 0.85,
        }
    }
}

/// Arena rectangle and the margin projectiles may travel beyond it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Margin added on every side before a projectile is discarded
    pub margin: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            x: 200.0,
            y: 150.0,
            width: 400.0,
            height: 300.0,
            margin: 50.0,
        }
    }
}

impl ArenaConfig {
    /// The playable rectangle.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_rect(self.x, self.y, self.width, self.height)
    }

    /// The playable rectangle inflated by `margin`.
    #[must_use]
    pub fn extended_bounds(&self) -> Aabb {
        self.bounds().expanded(self.margin)
    }

    /// Centre of the arena.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.bounds().center()
    }

    /// Where a boss stands between attacks: centred, above the arena.
    #[must_use]
    pub fn boss_home(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y - 50.0)
    }
}

/// Player tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Max health before the difficulty multiplier
    pub max_health: f32,
    /// Movement speed in units per second
    pub speed: f32,
    /// Hitbox edge length
    pub size: f32,
    /// Invulnerability window after a hit, in seconds
    pub invulnerability: f32,
    /// Dodges needed to open the counter-attack window
    pub attack_mode_dodges: u32,
    /// Length of the counter-attack window, in seconds
    pub attack_window: f32,
    /// Seconds between shots while attacking
    pub shoot_cooldown: f32,
    /// Shot speed in units per second
    pub shot_speed: f32,
    /// Damage per shot
    pub shot_damage: f32,
    /// Damage of the special attack
    pub special_damage: f32,
    /// Starting radius of the special attack ring
    pub special_start_radius: f32,
    /// Radius at which the ring dissipates
    pub special_max_radius: f32,
    /// Ring growth in units per second
    pub special_growth: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            speed: 300.0,
            size: 20.0,
            invulnerability: 1.0,
            attack_mode_dodges: 30,
            attack_window: 20.0,
            shoot_cooldown: 0.2,
            shot_speed: 480.0,
            shot_damage: 10.0,
            special_damage: 60.0,
            special_start_radius: 20.0,
            special_max_radius: 200.0,
            special_growth: 300.0,
        }
    }
}

/// Boss tuning shared by every boss kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    /// Scale on every boss's base health
    pub health_scale: f32,
    /// Half extent of the boss hitbox
    pub half_size: f32,
    /// Seconds between regular attacks
    pub attack_cooldown: f32,
    /// Rotation accumulator speed in radians per second
    pub rotation_speed: f32,
    /// Seconds between beams
    pub beam_cooldown: f32,
    /// Beam charge time
    pub beam_charge: f32,
    /// Beam fire time
    pub beam_fire: f32,
    /// Beam width
    pub beam_width: f32,
    /// Beam length
    pub beam_length: f32,
    /// Beam damage per hit
    pub beam_damage: f32,
    /// Seconds a dialogue quip stays visible
    pub quip_duration: f32,

    // === Revival ===
    /// Health ratio of the final boss below which spirits rise
    pub revival_threshold: f32,
    /// Spirit max health as a fraction of the revived boss's max health
    pub spirit_health_scale: f32,
    /// Spirit pattern count scale
    pub spirit_pattern_scale: f32,
    /// Spirit attack cooldown as a multiple of the primary's
    pub spirit_cooldown_scale: f32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            health_scale: 1.0,
            half_size: 40.0,
            attack_cooldown: 2.0,
            rotation_speed: 2.0,
            beam_cooldown: 8.0,
            beam_charge: 1.0,
            beam_fire: 1.5,
            beam_width: 30.0,
            beam_length: 700.0,
            beam_damage: 10.0,
            quip_duration: 2.0,
            revival_threshold: 0.5,
            spirit_health_scale: 0.5,
            spirit_pattern_scale: 0.6,
            spirit_cooldown_scale: 1.5,
        }
    }
}

/// Base projectile magnitudes before any multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Speed in units per second
    pub base_speed: f32,
    /// Damage per hit
    pub base_damage: f32,
    /// Collision radius
    pub radius: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            base_speed: 180.0,
            base_damage: 10.0,
            radius: 8.0,
        }
    }
}

/// Encounter timers in seconds of simulated time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Intro before the first attack cycle
    pub intro: f32,
    /// Non-interactive pause between phases
    pub phase_transition: f32,
    /// Interval between behavior analyses
    pub analysis_interval: f32,
    /// Interval between profile flushes
    pub flush_interval: f32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            intro: 2.0,
            phase_transition: 3.0,
            analysis_interval: 3.0,
            flush_interval: 5.0,
        }
    }
}

/// Threat table thresholds and override knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatConfig {
    /// Boss health ratio below which the boss is at least aggressive
    pub aggressive_below: f32,
    /// Boss health ratio below which the boss is unhinged
    pub unhinged_below: f32,
    /// Override rules layered on the table
    pub overrides: OverrideRules,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            aggressive_below: 0.66,
            unhinged_below: 0.33,
            overrides: OverrideRules::default(),
        }
    }
}

impl ThreatConfig {
    /// Builds the threat table, rejecting unordered thresholds.
    pub fn table(&self) -> Result<ThreatTable, ConfigError> {
        ThreatTable::new(self.aggressive_below, self.unhinged_below)
    }
}

/// Full encounter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Arena geometry
    pub arena: ArenaConfig,
    /// Player tuning
    pub player: PlayerTuning,
    /// Boss tuning
    pub boss: BossTuning,
    /// Projectile tuning
    pub projectile: ProjectileTuning,
    /// Timers
    pub timers: TimerConfig,
    /// Threat table
    pub threat: ThreatConfig,
    /// Difficulty
    pub difficulty: Difficulty,
}

impl EncounterConfig {
    /// Clamp all values to sane ranges.
    pub fn validate(&mut self) {
        // Arena
        self.arena.width = self.arena.width.clamp(100.0, 4000.0);
        self.arena.height = self.arena.height.clamp(100.0, 4000.0);
        self.arena.margin = self.arena.margin.clamp(0.0, 500.0);

        // Player
        self.player.max_health = self.player.max_health.clamp(1.0, 10_000.0);
        self.player.speed = self.player.speed.clamp(10.0, 2000.0);
        self.player.size = self.player.size.clamp(2.0, 100.0);
        self.player.invulnerability = self.player.invulnerability.clamp(0.0, 10.0);
        self.player.attack_mode_dodges = self.player.attack_mode_dodges.max(1);
        self.player.attack_window = self.player.attack_window.clamp(1.0, 120.0);
        self.player.shoot_cooldown = self.player.shoot_cooldown.clamp(0.01, 5.0);
        self.player.special_max_radius = self
            .player
            .special_max_radius
            .max(self.player.special_start_radius);

        // Boss
        self.boss.health_scale = self.boss.health_scale.clamp(0.01, 10.0);
        self.boss.attack_cooldown = self.boss.attack_cooldown.clamp(0.1, 30.0);
        self.boss.beam_cooldown = self.boss.beam_cooldown.clamp(0.5, 120.0);
        self.boss.revival_threshold = self.boss.revival_threshold.clamp(0.0, 1.0);
        self.boss.spirit_health_scale = self.boss.spirit_health_scale.clamp(0.05, 1.0);
        self.boss.spirit_pattern_scale = self.boss.spirit_pattern_scale.clamp(0.1, 1.0);
        self.boss.spirit_cooldown_scale = self.boss.spirit_cooldown_scale.clamp(1.0, 10.0);

        // Projectiles
        self.projectile.base_speed = self.projectile.base_speed.clamp(1.0, 2000.0);
        self.projectile.radius = self.projectile.radius.clamp(1.0, 64.0);

        // Timers
        self.timers.intro = self.timers.intro.clamp(0.0, 30.0);
        self.timers.phase_transition = self.timers.phase_transition.clamp(0.0, 30.0);
        self.timers.analysis_interval = self.timers.analysis_interval.clamp(0.1, 60.0);
        self.timers.flush_interval = self.timers.flush_interval.clamp(0.5, 600.0);

        // Threat table: fall back to defaults when the pair cannot partition [0, 1]
        if self.threat.table().is_err() {
            let defaults = ThreatConfig::default();
            self.threat.aggressive_below = defaults.aggressive_below;
            self.threat.unhinged_below = defaults.unhinged_below;
        }
    }

    /// Boss projectile speed before the threat multiplier.
    #[must_use]
    pub fn projectile_speed(&self) -> f32 {
        self.projectile.base_speed * self.difficulty.projectile_speed_multiplier()
    }

    /// Damage a boss projectile deals before the threat multiplier.
    #[must_use]
    pub fn projectile_damage(&self) -> f32 {
        self.projectile.base_damage * self.difficulty.incoming_damage_multiplier()
    }

    /// Player max health after the difficulty multiplier.
    #[must_use]
    pub fn player_max_health(&self) -> f32 {
        self.player.max_health * self.difficulty.player_health_multiplier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_arena_bounds() {
        let config = EncounterConfig::default();
        let extended = config.arena.extended_bounds();
        assert_eq!(extended.min_x, 150.0);
        assert_eq!(extended.min_y, 100.0);
        assert_eq!(extended.max_x, 650.0);
        assert_eq!(extended.max_y, 500.0);
    }

    #[test]
    fn test_difficulty_scaling() {
        let mut config = EncounterConfig::default();
        assert!((config.player_max_health() - 100.0).abs() < f32::EPSILON);

        config.difficulty = Difficulty::Hard;
        assert!((config.player_max_health() - 75.0).abs() < 1e-4);
        assert!((config.projectile_speed() - 225.0).abs() < 1e-3);
        assert!(config.projectile_damage() > 10.0);
    }

    #[test]
    fn test_validate_restores_bad_thresholds() {
        let mut config = EncounterConfig::default();
        config.threat.aggressive_below = 0.2;
        config.threat.unhinged_below = 0.8;
        config.boss.revival_threshold = 3.0;
        config.validate();

        assert!((config.threat.aggressive_below - 0.66).abs() < f32::EPSILON);
        assert!((config.threat.unhinged_below - 0.33).abs() < f32::EPSILON);
        assert!((config.boss.revival_threshold - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EncounterConfig =
            serde_json::from_str(r#"{"difficulty":"easy","arena":{"margin":10.0}}"#)
                .expect("partial config should parse");
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert!((config.arena.margin - 10.0).abs() < f32::EPSILON);
        assert!((config.arena.width - 400.0).abs() < f32::EPSILON);
    }
}

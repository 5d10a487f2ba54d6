//! Boss instances.

use std::fmt;

use selva_common::{Aabb, BossId, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::EncounterConfig;
use crate::entity::Collider;
use crate::threat::{ThreatInputs, ThreatState, ThreatStateMachine, ThreatTable};

/// The three sequential bosses, in phase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BossKind {
    /// Phase 0: river dweller, waves and bursts
    Yacuruna,
    /// Phase 1: forest trickster, converging and grid attacks
    Chullachaqui,
    /// Phase 2 (final): the great serpent, owns the beam and revives the others
    Yacumama,
}

impl BossKind {
    /// All bosses in phase order.
    pub const ALL: [Self; 3] = [Self::Yacuruna, Self::Chullachaqui, Self::Yacumama];

    /// Boss fought in `phase`.
    #[must_use]
    pub fn for_phase(phase: usize) -> Option<Self> {
        Self::ALL.get(phase).copied()
    }

    /// Phase index.
    #[must_use]
    pub fn phase(self) -> usize {
        match self {
            Self::Yacuruna => 0,
            Self::Chullachaqui => 1,
            Self::Yacumama => 2,
        }
    }

    /// Whether this is the last boss.
    #[must_use]
    pub fn is_final(self) -> bool {
        self == Self::Yacumama
    }

    /// Boss that follows this one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::for_phase(self.phase() + 1)
    }

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Yacuruna => "Yacuruna",
            Self::Chullachaqui => "Chullachaqui",
            Self::Yacumama => "Yacumama",
        }
    }

    /// Max health before scaling.
    #[must_use]
    pub fn base_health(self) -> f32 {
        match self {
            Self::Yacuruna | Self::Chullachaqui => 500.0,
            Self::Yacumama => 700.0,
        }
    }

    /// Phase multiplier on projectile speed.
    #[must_use]
    pub fn speed_multiplier(self) -> f32 {
        match self {
            Self::Yacuruna => 1.0,
            Self::Chullachaqui => 1.1,
            Self::Yacumama => 1.2,
        }
    }

    /// Phase multiplier on projectile damage.
    #[must_use]
    pub fn damage_multiplier(self) -> f32 {
        match self {
            Self::Yacuruna => 1.0,
            Self::Chullachaqui => 1.1,
            Self::Yacumama => 1.25,
        }
    }

    /// Whether this boss has the beam attack.
    #[must_use]
    pub fn has_beam(self) -> bool {
        self.is_final()
    }
}

impl fmt::Display for BossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primary boss of the phase, or a revived spirit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossRole {
    /// The phase's own boss
    Primary,
    /// Weakened copy of an earlier boss, raised during the final phase
    Spirit,
}

/// A live boss.
#[derive(Debug, Clone)]
pub struct BossEntity {
    /// Entity ID
    pub id: BossId,
    /// Which boss
    pub kind: BossKind,
    /// Primary or spirit
    pub role: BossRole,
    /// Centre position
    pub position: Vec2,
    /// Threat state machine
    pub threat: ThreatStateMachine,
    health: f32,
    max_health: f32,
    half_size: f32,
    home: Vec2,

    // === Scaling ===
    speed_multiplier: f32,
    damage_multiplier: f32,
    damage_taken_multiplier: f32,
    pattern_scale: f32,

    // === Timers ===
    attack_timer: f32,
    attack_cooldown: f32,
    beam_timer: f32,
    beam_cooldown: f32,
    return_timer: f32,
    rotation: f32,
    rotation_speed: f32,
}

impl BossEntity {
    /// Creates the primary boss for `kind`.
    #[must_use]
    pub fn primary(id: BossId, kind: BossKind, config: &EncounterConfig, table: ThreatTable) -> Self {
        let max_health = kind.base_health() * config.boss.health_scale;
        let home = config.arena.boss_home();
        Self {
            id,
            kind,
            role: BossRole::Primary,
            position: home,
            threat: ThreatStateMachine::new(
                table,
                config.threat.overrides.clone(),
                config.boss.quip_duration,
            ),
            health: max_health,
            max_health,
            half_size: config.boss.half_size,
            home,
            speed_multiplier: kind.speed_multiplier(),
            damage_multiplier: kind.damage_multiplier(),
            damage_taken_multiplier: config.difficulty.boss_damage_taken_multiplier(),
            pattern_scale: 1.0,
            attack_timer: 0.0,
            attack_cooldown: config.boss.attack_cooldown,
            beam_timer: 0.0,
            beam_cooldown: config.boss.beam_cooldown,
            return_timer: 0.0,
            rotation: 0.0,
            rotation_speed: config.boss.rotation_speed,
        }
    }

    /// Creates a weakened spirit of `kind` standing at `position`.
    #[must_use]
    pub fn spirit(
        id: BossId,
        kind: BossKind,
        position: Vec2,
        config: &EncounterConfig,
        table: ThreatTable,
    ) -> Self {
        let mut boss = Self::primary(id, kind, config, table);
        boss.role = BossRole::Spirit;
        boss.max_health *= config.boss.spirit_health_scale;
        boss.health = boss.max_health;
        boss.position = position;
        boss.home = position;
        boss.pattern_scale = config.boss.spirit_pattern_scale;
        boss.attack_cooldown *= config.boss.spirit_cooldown_scale;
        boss
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Max health.
    #[must_use]
    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Current over max health.
    #[must_use]
    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            self.health / self.max_health
        }
    }

    /// Whether health has reached zero.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.health <= 0.0
    }

    /// Whether this is a spirit.
    #[must_use]
    pub fn is_spirit(&self) -> bool {
        self.role == BossRole::Spirit
    }

    /// Resting position between beams.
    #[must_use]
    pub fn home(&self) -> Vec2 {
        self.home
    }

    /// Current threat state.
    #[must_use]
    pub fn state(&self) -> ThreatState {
        self.threat.state()
    }

    /// Phase speed multiplier.
    #[must_use]
    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Phase damage multiplier.
    #[must_use]
    pub fn damage_multiplier(&self) -> f32 {
        self.damage_multiplier
    }

    /// Scale applied to pattern projectile counts.
    #[must_use]
    pub fn pattern_scale(&self) -> f32 {
        self.pattern_scale
    }

    /// Rotation accumulator used by spiral patterns.
    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Seconds between regular attacks.
    #[must_use]
    pub fn attack_cooldown(&self) -> f32 {
        self.attack_cooldown
    }

    /// Applies player damage scaled by the boss's resistance. Health never
    /// drops below zero. Returns the damage actually applied.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if self.is_defeated() || amount <= 0.0 {
            return 0.0;
        }
        let scaled = amount * self.damage_taken_multiplier;
        let applied = scaled.min(self.health);
        self.health -= applied;
        applied
    }

    /// Restores health up to the max.
    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount.max(0.0)).min(self.max_health);
    }

    /// Advances timers and the rotation accumulator.
    pub fn tick(&mut self, dt: f32) {
        self.rotation += self.rotation_speed * dt;
        self.attack_timer += dt;
        self.beam_timer += dt;
        self.threat.tick(dt);

        if self.return_timer > 0.0 {
            self.return_timer -= dt;
            if self.return_timer <= 0.0 {
                self.return_timer = 0.0;
                self.position = self.home;
            }
        }
    }

    /// Whether the regular attack cycle has elapsed.
    #[must_use]
    pub fn attack_ready(&self) -> bool {
        self.attack_timer >= self.attack_cooldown
    }

    /// Starts a new attack cycle.
    pub fn reset_attack_timer(&mut self) {
        self.attack_timer = 0.0;
    }

    /// Whether the beam may fire: final primary boss, unhinged, off cooldown.
    #[must_use]
    pub fn beam_ready(&self) -> bool {
        self.kind.has_beam()
            && self.role == BossRole::Primary
            && self.state() == ThreatState::Unhinged
            && self.beam_timer >= self.beam_cooldown
    }

    /// Moves to `anchor` for `hold` seconds, then back home. Restarts the beam cooldown.
    pub fn relocate_for_beam(&mut self, anchor: Vec2, hold: f32) {
        self.position = anchor;
        self.return_timer = hold.max(f32::EPSILON);
        self.beam_timer = 0.0;
    }

    /// Cancels every pending timer.
    pub fn cancel_timers(&mut self) {
        self.attack_timer = 0.0;
        self.beam_timer = 0.0;
        self.return_timer = 0.0;
        self.position = self.home;
    }

    /// Inputs for the threat rules.
    #[must_use]
    pub fn threat_inputs(&self, player_ratio: f32, direction_changes: u64, hits_taken: u32) -> ThreatInputs {
        ThreatInputs {
            boss_ratio: self.health_ratio(),
            player_ratio,
            direction_changes,
            hits_taken,
        }
    }
}

impl Collider for BossEntity {
    fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_size, self.half_size)
    }
}

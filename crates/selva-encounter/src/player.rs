//! Player state: movement, dodge tally, invulnerability and the
//! counter-attack window.
//!
//! The player dodges until enough direction changes open attack mode, then
//! has a fixed window to shoot and to use one special attack.

use selva_common::{Aabb, EntityId, IdAllocator, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ArenaConfig, EncounterConfig, PlayerTuning};
use crate::entity::{Collider, PlayerShot, SpecialAttack};
use crate::predictive::PlayerTelemetry;
use crate::profile::{Direction, DodgeCounts};

/// One frame of player input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Horizontal axis, -1 (left) to 1 (right)
    pub dx: i8,
    /// Vertical axis, -1 (up) to 1 (down)
    pub dy: i8,
    /// Shoot if attack mode allows it
    pub shoot: bool,
    /// Use the special attack if still available
    pub special: bool,
}

impl PlayerInput {
    /// Movement-only input.
    #[must_use]
    pub fn moving(dx: i8, dy: i8) -> Self {
        Self {
            dx,
            dy,
            ..Self::default()
        }
    }

    /// Axis pair clamped to {-1, 0, 1}.
    #[must_use]
    pub fn axis(&self) -> (i8, i8) {
        (self.dx.signum(), self.dy.signum())
    }

    /// Whether any movement key is held.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.axis() != (0, 0)
    }
}

/// What changed during [`Player::apply_input`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerUpdate {
    /// The movement vector changed this frame
    pub dodged: bool,
    /// Attack mode opened this frame
    pub entered_attack_mode: bool,
    /// Attack mode closed this frame
    pub left_attack_mode: bool,
}

/// The player.
#[derive(Debug, Clone)]
pub struct Player {
    /// Entity ID
    pub id: EntityId,
    position: Vec2,
    spawn: Vec2,
    health: f32,
    max_health: f32,
    tuning: PlayerTuning,

    // === Tally ===
    dodges: DodgeCounts,
    last_axis: Option<(i8, i8)>,
    direction_changes: u64,
    dodges_for_attack: u32,
    hits_taken: u32,
    shots_fired: u32,
    survival_time: f64,

    // === Timers ===
    invulnerable_for: f32,
    attack_window: Option<f32>,
    shoot_timer: f32,
    special_available: bool,
}

impl Player {
    /// Creates the player at the arena centre with difficulty-scaled health.
    #[must_use]
    pub fn new(id: EntityId, config: &EncounterConfig) -> Self {
        let spawn = config.arena.center();
        let max_health = config.player_max_health();
        Self {
            id,
            position: spawn,
            spawn,
            health: max_health,
            max_health,
            tuning: config.player.clone(),
            dodges: DodgeCounts::default(),
            last_axis: None,
            direction_changes: 0,
            dodges_for_attack: 0,
            hits_taken: 0,
            shots_fired: 0,
            survival_time: 0.0,
            invulnerable_for: 0.0,
            attack_window: None,
            shoot_timer: 0.0,
            special_available: false,
        }
    }

    /// Hitbox centre.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
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
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Cumulative per-direction dodges.
    #[must_use]
    pub fn dodges(&self) -> DodgeCounts {
        self.dodges
    }

    /// Total direction changes.
    #[must_use]
    pub fn direction_changes(&self) -> u64 {
        self.direction_changes
    }

    /// Dodges counted toward the next attack window.
    #[must_use]
    pub fn dodges_for_attack(&self) -> u32 {
        self.dodges_for_attack
    }

    /// Hits taken.
    #[must_use]
    pub fn hits_taken(&self) -> u32 {
        self.hits_taken
    }

    /// Shots fired.
    #[must_use]
    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    /// Seconds survived.
    #[must_use]
    pub fn survival_time(&self) -> f64 {
        self.survival_time
    }

    /// Whether hits are currently ignored.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_for > 0.0
    }

    /// Seconds of invulnerability left.
    #[must_use]
    pub fn invulnerable_for(&self) -> f32 {
        self.invulnerable_for.max(0.0)
    }

    /// Whether the counter-attack window is open.
    #[must_use]
    pub fn attack_mode(&self) -> bool {
        self.attack_window.is_some()
    }

    /// Seconds left in the counter-attack window.
    #[must_use]
    pub fn attack_window_remaining(&self) -> Option<f32> {
        self.attack_window
    }

    /// Whether the special attack can still be used this window.
    #[must_use]
    pub fn special_available(&self) -> bool {
        self.special_available
    }

    /// Snapshot for the behavior model.
    #[must_use]
    pub fn telemetry(&self) -> PlayerTelemetry {
        PlayerTelemetry {
            position: self.position,
            dodges: self.dodges,
            hits_taken: self.hits_taken,
            survival_time: self.survival_time,
        }
    }

    /// Advances timers, moves, counts dodges and opens or closes attack mode.
    pub fn apply_input(
        &mut self,
        input: &PlayerInput,
        dt: f32,
        arena: &ArenaConfig,
    ) -> PlayerUpdate {
        let mut update = PlayerUpdate::default();
        self.survival_time += f64::from(dt);
        self.invulnerable_for = (self.invulnerable_for - dt).max(0.0);
        self.shoot_timer = (self.shoot_timer - dt).max(0.0);

        // Movement
        let (dx, dy) = input.axis();
        if (dx, dy) != (0, 0) {
            let heading = Vec2::new(f32::from(dx), f32::from(dy)).normalized();
            self.position += heading.scale(self.tuning.speed * dt);
            let half = self.tuning.size / 2.0;
            self.position = arena.bounds().expanded(-half).clamp_point(self.position);

            if self.last_axis != Some((dx, dy)) {
                self.count_dodge(dx, dy);
                update.dodged = true;
            }
            self.last_axis = Some((dx, dy));
        }

        // Attack window
        if let Some(remaining) = self.attack_window.as_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.close_attack_mode();
                update.left_attack_mode = true;
            }
        } else if self.dodges_for_attack >= self.tuning.attack_mode_dodges {
            self.attack_window = Some(self.tuning.attack_window);
            self.special_available = true;
            self.shoot_timer = 0.0;
            update.entered_attack_mode = true;
            debug!("Attack mode open after {} dodges", self.dodges_for_attack);
        }

        update
    }

    fn count_dodge(&mut self, dx: i8, dy: i8) {
        match dx {
            -1 => self.dodges.increment(Direction::Left),
            1 => self.dodges.increment(Direction::Right),
            _ => {},
        }
        match dy {
            -1 => self.dodges.increment(Direction::Up),
            1 => self.dodges.increment(Direction::Down),
            _ => {},
        }
        self.direction_changes += 1;
        self.dodges_for_attack = self.dodges_for_attack.saturating_add(1);
    }

    fn close_attack_mode(&mut self) {
        self.attack_window = None;
        self.dodges_for_attack = 0;
        self.special_available = false;
        self.shoot_timer = 0.0;
    }

    /// Fires a shot upward if attack mode is open and the cooldown elapsed.
    pub fn try_shoot(&mut self, ids: &mut IdAllocator) -> Option<PlayerShot> {
        if !self.attack_mode() || self.shoot_timer > 0.0 {
            return None;
        }
        self.shoot_timer = self.tuning.shoot_cooldown;
        self.shots_fired += 1;
        let muzzle = Vec2::new(self.position.x, self.position.y - self.tuning.size / 2.0);
        Some(PlayerShot::upward(
            ids.next_id(),
            muzzle,
            self.tuning.shot_speed,
            self.tuning.shot_damage,
        ))
    }

    /// Uses the window's special attack.
    pub fn try_special(&mut self, ids: &mut IdAllocator) -> Option<SpecialAttack> {
        if !self.attack_mode() || !self.special_available {
            return None;
        }
        self.special_available = false;
        Some(SpecialAttack::new(
            ids.next_id(),
            self.position,
            self.tuning.special_start_radius,
            self.tuning.special_max_radius,
            self.tuning.special_growth,
            self.tuning.special_damage,
        ))
    }

    /// Applies a hit unless invulnerable. Returns whether damage landed.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_invulnerable() || self.is_dead() || amount <= 0.0 {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        self.hits_taken += 1;
        self.invulnerable_for = self.tuning.invulnerability;
        true
    }

    /// Closes attack mode and recentres for the next boss.
    pub fn reset_for_new_phase(&mut self) {
        self.close_attack_mode();
        self.invulnerable_for = 0.0;
        self.position = self.spawn;
        self.last_axis = None;
    }
}

impl Collider for Player {
    fn bounds(&self) -> Aabb {
        let half = self.tuning.size / 2.0;
        Aabb::from_center(self.position, half, half)
    }
}

//! Boss threat states.
//!
//! The health-ratio table is authoritative. Override rules can only raise
//! the state the table picks, never lower it.

use std::fmt;
use std::str::FromStr;

use selva_common::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Boss severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThreatState {
    /// Slow projectiles, light damage
    #[default]
    Calm,
    /// Faster and harder hitting
    Aggressive,
    /// Fastest, heaviest, most concurrent patterns
    Unhinged,
}

impl ThreatState {
    /// All states in severity order.
    pub const ALL: [Self; 3] = [Self::Calm, Self::Aggressive, Self::Unhinged];

    /// Multiplier applied to projectile speed.
    #[must_use]
    pub fn speed_multiplier(self) -> f32 {
        match self {
            Self::Calm => 0.7,
            Self::Aggressive => 1.2,
            Self::Unhinged => 1.8,
        }
    }

    /// Multiplier applied to projectile damage.
    #[must_use]
    pub fn damage_multiplier(self) -> f32 {
        match self {
            Self::Calm => 1.0,
            Self::Aggressive => 1.5,
            Self::Unhinged => 2.5,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Aggressive => "aggressive",
            Self::Unhinged => "unhinged",
        }
    }
}

impl fmt::Display for ThreatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThreatState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calm" => Ok(Self::Calm),
            "aggressive" => Ok(Self::Aggressive),
            "unhinged" => Ok(Self::Unhinged),
            _ => Err(ConfigError::UnknownThreatState(s.to_string())),
        }
    }
}

/// Three contiguous health-ratio ranges:
/// `[aggressive_below, 1]` calm, `[unhinged_below, aggressive_below)`
/// aggressive, `[0, unhinged_below)` unhinged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreatTable {
    aggressive_below: f32,
    unhinged_below: f32,
}

impl Default for ThreatTable {
    fn default() -> Self {
        Self {
            aggressive_below: 0.66,
            unhinged_below: 0.33,
        }
    }
}

impl ThreatTable {
    /// Creates a table. Both thresholds must lie strictly inside (0, 1)
    /// with `unhinged_below < aggressive_below`.
    pub fn new(aggressive_below: f32, unhinged_below: f32) -> Result<Self, ConfigError> {
        let ordered = unhinged_below > 0.0
            && unhinged_below < aggressive_below
            && aggressive_below < 1.0;
        if !ordered {
            return Err(ConfigError::InvalidThresholds {
                aggressive: aggressive_below,
                unhinged: unhinged_below,
            });
        }
        Ok(Self {
            aggressive_below,
            unhinged_below,
        })
    }

    /// Looks up the state for a health ratio. Ratios outside [0, 1] are clamped;
    /// NaN counts as zero health.
    #[must_use]
    pub fn state_for(&self, ratio: f32) -> ThreatState {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        if ratio >= self.aggressive_below {
            ThreatState::Calm
        } else if ratio >= self.unhinged_below {
            ThreatState::Aggressive
        } else {
            ThreatState::Unhinged
        }
    }

    /// Ratio below which the boss is at least aggressive.
    #[must_use]
    pub fn aggressive_below(&self) -> f32 {
        self.aggressive_below
    }

    /// Ratio below which the boss is unhinged.
    #[must_use]
    pub fn unhinged_below(&self) -> f32 {
        self.unhinged_below
    }
}

/// Snapshot of everything the threat rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThreatInputs {
    /// Boss current / max health
    pub boss_ratio: f32,
    /// Player current / max health
    pub player_ratio: f32,
    /// Cumulative direction changes this encounter
    pub direction_changes: u64,
    /// Hits the player has taken this encounter
    pub hits_taken: u32,
}

/// Secondary rules that escalate the table's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideRules {
    /// Master switch
    pub enabled: bool,
    /// Healthy-player threshold for the first rule
    pub healthy_player_above: f32,
    /// Boss ratio threshold for the first rule
    pub wounded_boss_below: f32,
    /// Boss ratio below which the boss is forced unhinged
    pub critical_boss_below: f32,
    /// Direction changes above which a careful player is punished
    pub direction_changes_above: u64,
    /// Hits below which a player counts as careful
    pub hits_below: u32,
}

impl Default for OverrideRules {
    fn default() -> Self {
        Self {
            enabled: true,
            healthy_player_above: 0.7,
            wounded_boss_below: 0.5,
            critical_boss_below: 0.3,
            direction_changes_above: 100,
            hits_below: 3,
        }
    }
}

impl OverrideRules {
    /// Most severe state forced by any matching rule.
    #[must_use]
    pub fn evaluate(&self, inputs: &ThreatInputs) -> Option<ThreatState> {
        if !self.enabled {
            return None;
        }

        let mut forced = None;
        if inputs.player_ratio > self.healthy_player_above
            && inputs.boss_ratio < self.wounded_boss_below
        {
            forced = forced.max(Some(ThreatState::Aggressive));
        }
        if inputs.boss_ratio < self.critical_boss_below {
            forced = forced.max(Some(ThreatState::Unhinged));
        }
        if inputs.direction_changes > self.direction_changes_above
            && inputs.hits_taken < self.hits_below
        {
            forced = forced.max(Some(ThreatState::Aggressive));
        }
        forced
    }
}

/// A state change, emitted once per actual transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreatTransition {
    /// Previous state
    pub from: ThreatState,
    /// New state
    pub to: ThreatState,
}

/// Per-boss edge-triggered threat state.
#[derive(Debug, Clone)]
pub struct ThreatStateMachine {
    table: ThreatTable,
    overrides: OverrideRules,
    current: ThreatState,
    quip_duration: f32,
    quip_timer: f32,
    transitions: u32,
}

impl ThreatStateMachine {
    /// Creates a machine starting in `Calm`.
    #[must_use]
    pub fn new(table: ThreatTable, overrides: OverrideRules, quip_duration: f32) -> Self {
        Self {
            table,
            overrides,
            current: ThreatState::Calm,
            quip_duration,
            quip_timer: 0.0,
            transitions: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ThreatState {
        self.current
    }

    /// The state the rules pick for `inputs`, without changing anything.
    #[must_use]
    pub fn resolve(&self, inputs: &ThreatInputs) -> ThreatState {
        let base = self.table.state_for(inputs.boss_ratio);
        match self.overrides.evaluate(inputs) {
            Some(forced) => base.max(forced),
            None => base,
        }
    }

    /// Re-evaluates the state. Returns a transition only when the state
    /// actually changed; the quip timer restarts on every transition.
    pub fn evaluate(&mut self, inputs: &ThreatInputs) -> Option<ThreatTransition> {
        let next = self.resolve(inputs);
        if next == self.current {
            return None;
        }

        let transition = ThreatTransition {
            from: self.current,
            to: next,
        };
        self.current = next;
        self.quip_timer = self.quip_duration;
        self.transitions += 1;
        info!(
            "Threat state {} -> {} (boss ratio {:.2})",
            transition.from, transition.to, inputs.boss_ratio
        );
        Some(transition)
    }

    /// Counts down the visible quip.
    pub fn tick(&mut self, dt: f32) {
        self.quip_timer = (self.quip_timer - dt).max(0.0);
    }

    /// Restarts the quip timer without a transition (attack quips).
    pub fn restart_quip(&mut self) {
        self.quip_timer = self.quip_duration;
    }

    /// Seconds left on the visible quip.
    #[must_use]
    pub fn quip_remaining(&self) -> f32 {
        self.quip_timer
    }

    /// Number of transitions so far.
    #[must_use]
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Speed multiplier of the current state.
    #[must_use]
    pub fn speed_multiplier(&self) -> f32 {
        self.current.speed_multiplier()
    }

    /// Damage multiplier of the current state.
    #[must_use]
    pub fn damage_multiplier(&self) -> f32 {
        self.current.damage_multiplier()
    }
}

//! Seeded stand-in for a human player.

use selva_encounter::{Player, PlayerInput};

/// Frames a weave keeps one horizontal heading.
const WEAVE_MIN_FRAMES: u32 = 8;
const WEAVE_MAX_FRAMES: u32 = 40;

/// Produces deterministic input from a seed.
///
/// The script weaves left and right with an occasional vertical jink,
/// shoots only while attack mode is open and spends the special once.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    rng: fastrand::Rng,
    dx: i8,
    dy: i8,
    hold: u32,
    special_spent: bool,
}

impl ScriptedInput {
    /// Creates a script from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            dx: 1,
            dy: 0,
            hold: 0,
            special_spent: false,
        }
    }

    /// Whether the special has been requested.
    #[must_use]
    pub fn special_spent(&self) -> bool {
        self.special_spent
    }

    /// Input for the next tick given the current player state.
    pub fn next(&mut self, player: &Player) -> PlayerInput {
        if self.hold == 0 {
            self.hold = self.rng.u32(WEAVE_MIN_FRAMES..=WEAVE_MAX_FRAMES);
            self.dx = if self.dx > 0 { -1 } else { 1 };
            self.dy = match self.rng.u8(0..10) {
                0 => -1,
                1 => 1,
                _ => 0,
            };
        }
        self.hold -= 1;

        let shoot = player.attack_mode();
        let special = shoot && player.special_available() && !self.special_spent;
        if special {
            self.special_spent = true;
        }

        PlayerInput {
            dx: self.dx,
            dy: self.dy,
            shoot,
            special,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selva_common::IdAllocator;
    use selva_encounter::{ArenaConfig, EncounterConfig};

    fn player(config: &EncounterConfig) -> Player {
        let mut ids = IdAllocator::new();
        Player::new(ids.next_id(), config)
    }

    #[test]
    fn test_same_seed_same_script() {
        let config = EncounterConfig::default();
        let p = player(&config);
        let mut a = ScriptedInput::new(42);
        let mut b = ScriptedInput::new(42);
        for _ in 0..500 {
            assert_eq!(a.next(&p), b.next(&p));
        }
    }

    #[test]
    fn test_holds_fire_outside_attack_mode() {
        let config = EncounterConfig::default();
        let p = player(&config);
        let mut script = ScriptedInput::new(1);
        for _ in 0..200 {
            let input = script.next(&p);
            assert!(!input.shoot);
            assert!(!input.special);
            assert!(input.is_moving());
        }
    }

    #[test]
    fn test_weaving_opens_attack_mode_and_special_fires_once() {
        let mut config = EncounterConfig::default();
        config.player.attack_mode_dodges = 3;
        config.player.attack_window = 120.0;
        let arena = ArenaConfig::default();
        let mut p = player(&config);
        let mut script = ScriptedInput::new(9);

        let mut specials = 0;
        for _ in 0..2000 {
            let input = script.next(&p);
            if input.special {
                specials += 1;
            }
            p.apply_input(&input, 1.0 / 60.0, &arena);
        }

        assert!(p.attack_mode());
        assert_eq!(specials, 1);
        assert!(script.special_spent());
    }
}

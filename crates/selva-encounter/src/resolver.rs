//! Per-tick entity simulation and collision resolution.
//!
//! Every live entity is advanced, tested against the player or the bosses,
//! and then dropped in a single compaction pass per collection. Nothing is
//! removed while a collection is being iterated.

use selva_common::{BossId, EntityId};
use tracing::debug;

use crate::boss::BossEntity;
use crate::config::ArenaConfig;
use crate::entity::{Beam, Collider, Entity, PlayerShot, Projectile, SpecialAttack, Warning};
use crate::player::Player;

/// All live entities of an encounter.
#[derive(Debug, Clone, Default)]
pub struct EntityWorld {
    /// Hostile projectiles from every boss, primary and spirit alike
    pub projectiles: Vec<Projectile>,
    /// Beams
    pub beams: Vec<Beam>,
    /// Beam telegraphs
    pub warnings: Vec<Warning>,
    /// Player shots
    pub shots: Vec<PlayerShot>,
    /// Player special attacks
    pub specials: Vec<SpecialAttack>,
}

impl EntityWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a generator entity to its collection.
    pub fn spawn(&mut self, entity: Entity) {
        match entity {
            Entity::Projectile(p) => self.projectiles.push(p),
            Entity::Beam(b) => self.beams.push(b),
            Entity::Warning(w) => self.warnings.push(w),
        }
    }

    /// Adds a batch of generator entities.
    pub fn extend(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.spawn(entity);
        }
    }

    /// Drops projectiles, beams and warnings.
    pub fn clear_hostile(&mut self) {
        self.projectiles.clear();
        self.beams.clear();
        self.warnings.clear();
    }

    /// Drops player shots and specials.
    pub fn clear_player_attacks(&mut self) {
        self.shots.clear();
        self.specials.clear();
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.clear_hostile();
        self.clear_player_attacks();
    }

    /// Live projectiles, beams and warnings.
    #[must_use]
    pub fn hostile_count(&self) -> usize {
        self.projectiles.len() + self.beams.len() + self.warnings.len()
    }

    /// Every live entity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hostile_count() + self.shots.len() + self.specials.len()
    }

    /// Whether nothing is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Damage that reached the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerHit {
    /// Projectile or beam that hit
    pub source: EntityId,
    /// Damage applied
    pub damage: f32,
}

/// Damage that reached a boss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossHit {
    /// Boss that was hit
    pub boss: BossId,
    /// Damage applied after the boss's resistance
    pub damage: f32,
    /// Whether a special attack scored it
    pub special: bool,
}

/// What happened during one resolver tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Hits on the player
    pub player_hits: Vec<PlayerHit>,
    /// Hits on bosses
    pub boss_hits: Vec<BossHit>,
    /// Entities dropped for leaving the arena or running out of time
    pub expired: usize,
    /// Entities dropped on contact
    pub consumed: usize,
}

/// Advances entities and resolves collisions once per tick.
#[derive(Debug, Clone)]
pub struct EncounterResolver {
    arena: ArenaConfig,
}

impl EncounterResolver {
    /// Creates a resolver for `arena`.
    #[must_use]
    pub fn new(arena: &ArenaConfig) -> Self {
        Self {
            arena: arena.clone(),
        }
    }

    /// Runs one tick over `world`.
    pub fn resolve(
        &self,
        world: &mut EntityWorld,
        player: &mut Player,
        bosses: &mut [BossEntity],
        dt: f32,
        rng: &mut fastrand::Rng,
    ) -> TickReport {
        let mut report = TickReport::default();
        let limit = self.arena.extended_bounds();
        let player_box = player.bounds();
        let player_half = player_box.width() / 2.0;

        // Projectiles
        for projectile in &mut world.projectiles {
            projectile.advance(dt, rng);
            if !projectile.is_within(&limit) {
                projectile.active = false;
                report.expired += 1;
                continue;
            }
            if projectile.bounds().overlaps(&player_box) {
                projectile.active = false;
                report.consumed += 1;
                if player.take_damage(projectile.damage) {
                    report.player_hits.push(PlayerHit {
                        source: projectile.id,
                        damage: projectile.damage,
                    });
                }
            }
        }

        // Beams persist through hits; invulnerability is the only repeat guard
        for beam in &mut world.beams {
            beam.advance(dt);
            if beam.hits(player_box.center(), player_half) && player.take_damage(beam.damage) {
                report.player_hits.push(PlayerHit {
                    source: beam.id,
                    damage: beam.damage,
                });
            }
            if beam.is_expired() {
                report.expired += 1;
            }
        }

        for warning in &mut world.warnings {
            warning.advance(dt);
            if warning.is_expired() {
                report.expired += 1;
            }
        }

        // Player shots
        for shot in &mut world.shots {
            shot.advance(dt);
            if !limit.contains_point(shot.position) {
                shot.active = false;
                report.expired += 1;
                continue;
            }
            let shot_box = shot.bounds();
            let target = bosses
                .iter_mut()
                .find(|b| !b.is_defeated() && b.bounds().overlaps(&shot_box));
            if let Some(boss) = target {
                shot.active = false;
                report.consumed += 1;
                let applied = boss.take_damage(shot.damage);
                report.boss_hits.push(BossHit {
                    boss: boss.id,
                    damage: applied,
                    special: false,
                });
            }
        }

        // Specials score at most one hit each
        for special in &mut world.specials {
            special.advance(dt);
            let target = if special.consumed {
                None
            } else {
                bosses
                    .iter_mut()
                    .find(|b| !b.is_defeated() && special.reaches(&b.bounds()))
            };
            if let Some(boss) = target {
                special.consumed = true;
                let applied = boss.take_damage(special.damage);
                debug!("Special attack hit {} for {applied:.1}", boss.kind);
                report.boss_hits.push(BossHit {
                    boss: boss.id,
                    damage: applied,
                    special: true,
                });
            }
            if !special.active {
                report.expired += 1;
            }
        }

        world.projectiles.retain(|p| p.active);
        world.beams.retain(|b| !b.is_expired());
        world.warnings.retain(|w| !w.is_expired());
        world.shots.retain(|s| s.active);
        world.specials.retain(|s| s.active);

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncounterConfig;
    use crate::patterns::PatternKind;
    use crate::player::PlayerInput;
    use crate::threat::ThreatTable;
    use selva_common::{IdAllocator, Vec2};
    use std::f32::consts::PI;

    struct Fixture {
        config: EncounterConfig,
        resolver: EncounterResolver,
        world: EntityWorld,
        player: Player,
        bosses: Vec<BossEntity>,
        ids: IdAllocator,
        rng: fastrand::Rng,
    }

    impl Fixture {
        fn new() -> Self {
            let config = EncounterConfig::default();
            let mut ids = IdAllocator::new();
            let player = Player::new(ids.next_id(), &config);
            let boss = BossEntity::primary(
                ids.next_id(),
                crate::boss::BossKind::Yacuruna,
                &config,
                ThreatTable::default(),
            );
            Self {
                resolver: EncounterResolver::new(&config.arena),
                config,
                world: EntityWorld::new(),
                player,
                bosses: vec![boss],
                ids,
                rng: fastrand::Rng::with_seed(7),
            }
        }

        fn projectile(&mut self, position: Vec2, angle: f32, speed: f32) -> Projectile {
            Projectile::new(
                self.ids.next_id(),
                self.bosses[0].id,
                position,
                angle,
                speed,
                10.0,
                8.0,
                PatternKind::AimedShot,
            )
        }

        fn resolve(&mut self, dt: f32) -> TickReport {
            self.resolver.resolve(
                &mut self.world,
                &mut self.player,
                &mut self.bosses,
                dt,
                &mut self.rng,
            )
        }

        fn wait(&mut self, seconds: f32, step: f32) {
            let steps = (seconds / step).round() as usize;
            for _ in 0..steps {
                self.player
                    .apply_input(&PlayerInput::default(), step, &self.config.arena);
            }
        }
    }

    #[test]
    fn test_projectile_on_boundary_survives() {
        let mut f = Fixture::new();
        let edge = f.config.arena.extended_bounds();
        let on_edge = f.projectile(Vec2::new(edge.min_x, 300.0), PI, 0.0);
        let leaving = f.projectile(Vec2::new(edge.min_x, 250.0), PI, 10.0);
        f.world.projectiles.push(on_edge);
        f.world.projectiles.push(leaving);

        let report = f.resolve(0.1);
        assert_eq!(report.expired, 1);
        assert_eq!(f.world.projectiles.len(), 1);
        assert_eq!(f.world.projectiles[0].position.x, edge.min_x);
    }

    #[test]
    fn test_projectile_hits_player_once() {
        let mut f = Fixture::new();
        let at_player = f.projectile(f.player.position(), 0.0, 0.0);
        f.world.projectiles.push(at_player);

        let report = f.resolve(0.016);
        assert_eq!(report.player_hits.len(), 1);
        assert_eq!(report.consumed, 1);
        assert!(f.world.projectiles.is_empty());
        assert_eq!(f.player.health(), 90.0);
        assert!(f.player.is_invulnerable());
    }

    #[test]
    fn test_invulnerability_blocks_then_expires() {
        let mut f = Fixture::new();
        let first = f.projectile(f.player.position(), 0.0, 0.0);
        f.world.projectiles.push(first);
        assert_eq!(f.resolve(0.0).player_hits.len(), 1);

        f.wait(0.5, 0.05);
        let second = f.projectile(f.player.position(), 0.0, 0.0);
        f.world.projectiles.push(second);
        let report = f.resolve(0.0);
        assert!(report.player_hits.is_empty());
        assert_eq!(f.player.health(), 90.0);

        f.wait(0.6, 0.05);
        let third = f.projectile(f.player.position(), 0.0, 0.0);
        f.world.projectiles.push(third);
        assert_eq!(f.resolve(0.0).player_hits.len(), 1);
        assert_eq!(f.player.health(), 80.0);
    }

    #[test]
    fn test_beam_persists_and_rehits_after_invulnerability() {
        let mut f = Fixture::new();
        let target = f.player.position();
        let origin = Vec2::new(target.x - 300.0, target.y);
        let owner = f.bosses[0].id;
        let beam = Beam::new(f.ids.next_id(), owner, origin, 0.0, 30.0, 700.0, 5.0, 0.1, 5.0);
        f.world.beams.push(beam);

        // Charging deals nothing
        assert!(f.resolve(0.05).player_hits.is_empty());

        let report = f.resolve(0.1);
        assert_eq!(report.player_hits.len(), 1);
        assert_eq!(f.world.beams.len(), 1);

        f.wait(1.2, 0.1);
        assert_eq!(f.resolve(0.1).player_hits.len(), 1);
        assert_eq!(f.player.hits_taken(), 2);
    }

    #[test]
    fn test_expired_beams_and_warnings_are_dropped() {
        let mut f = Fixture::new();
        let area = f.config.arena.bounds();
        let warning = Warning::new(f.ids.next_id(), area, 0.2);
        f.world.warnings.push(warning);
        let owner = f.bosses[0].id;
        let beam = Beam::new(f.ids.next_id(), owner, Vec2::ZERO, PI, 10.0, 10.0, 5.0, 0.1, 0.1);
        f.world.beams.push(beam);

        for _ in 0..3 {
            f.resolve(0.1);
        }
        assert!(f.world.warnings.is_empty());
        assert!(f.world.beams.is_empty());
    }

    #[test]
    fn test_player_shot_damages_boss() {
        let mut f = Fixture::new();
        let below_boss = f.bosses[0].position + Vec2::new(0.0, 30.0);
        let shot = PlayerShot::upward(f.ids.next_id(), below_boss, 480.0, 25.0);
        f.world.shots.push(shot);

        let report = f.resolve(0.016);
        assert_eq!(report.boss_hits.len(), 1);
        assert!(f.world.shots.is_empty());
        assert_eq!(f.bosses[0].health(), 475.0);
    }

    #[test]
    fn test_special_hits_one_boss_once() {
        let mut f = Fixture::new();
        let spirit = BossEntity::spirit(
            f.ids.next_id(),
            crate::boss::BossKind::Chullachaqui,
            f.bosses[0].position + Vec2::new(10.0, 0.0),
            &f.config,
            ThreatTable::default(),
        );
        f.bosses.push(spirit);

        let center = f.bosses[0].position;
        let special = SpecialAttack::new(f.ids.next_id(), center, 20.0, 200.0, 300.0, 60.0);
        f.world.specials.push(special);

        let mut hits = Vec::new();
        for _ in 0..10 {
            hits.extend(f.resolve(0.1).boss_hits);
        }
        assert_eq!(hits.len(), 1);
        assert!(hits[0].special);
        assert_eq!(hits[0].boss, f.bosses[0].id);
        assert_eq!(f.bosses[1].health(), f.bosses[1].max_health());
        assert!(f.world.specials.is_empty());
    }

    #[test]
    fn test_world_spawn_and_clear() {
        let mut f = Fixture::new();
        let p = f.projectile(Vec2::ZERO, 0.0, 1.0);
        let w = Warning::new(f.ids.next_id(), f.config.arena.bounds(), 1.0);
        f.world.extend([Entity::Projectile(p), Entity::Warning(w)]);
        f.world.shots.push(PlayerShot::upward(f.ids.next_id(), Vec2::ZERO, 1.0, 1.0));
        assert_eq!(f.world.hostile_count(), 2);
        assert_eq!(f.world.len(), 3);

        f.world.clear_hostile();
        assert_eq!(f.world.len(), 1);
        f.world.clear();
        assert!(f.world.is_empty());
    }
}

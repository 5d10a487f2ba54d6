//! Attack pattern catalog and generator.
//!
//! Each (boss, threat state) pair maps to a list of [`PatternSpec`]s. An
//! attack samples a state-dependent number of them without replacement and
//! concatenates the projectiles they build. Combo patterns return two
//! batches that are flattened once at the call boundary.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, TAU};
use std::ops::RangeInclusive;

use selva_common::{Aabb, BossId, CatalogError, IdAllocator, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::boss::{BossEntity, BossKind};
use crate::config::{ArenaConfig, BossTuning, EncounterConfig};
use crate::entity::{Beam, BeamMotion, Collider, Entity, Projectile, Trajectory, Warning};
use crate::threat::ThreatState;

/// Speed scale of shots aimed at the predicted position.
const PREDICTIVE_SPEED_SCALE: f32 = 1.5;

/// Angular gap between shots in an aimed fan.
const FAN_SPREAD: f32 = 0.15;

/// Spacing between projectiles in a wall.
const WALL_SPACING: f32 = 30.0;

/// Named pattern constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Evenly spaced ring from the boss
    RadialBurst,
    /// Fan aimed at the player's current position
    AimedShot,
    /// Fast fan aimed at the predicted position
    PredictiveShot,
    /// Rotating ring offset by the boss's rotation
    Spiral,
    /// Row falling from the top of the arena
    Wall,
    /// Ring around the player closing in
    Converging,
    /// Random headings from the boss
    RandomSpray,
    /// Jittering drops across the top edge
    AreaRain,
    /// Swaying fan aimed at the player
    Wave,
    /// Falling row plus a row sweeping in from the left
    Grid,
    /// Radial burst plus an aimed fan
    BurstAndAim,
    /// Spiral plus a wall
    SpiralAndWall,
}

impl PatternKind {
    /// Whether the pattern yields two batches.
    #[must_use]
    pub fn is_combo(self) -> bool {
        matches!(self, Self::BurstAndAim | Self::SpiralAndWall)
    }
}

/// A catalog entry: which pattern, and how many projectiles it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Pattern constructor
    pub kind: PatternKind,
    /// Projectile count before spirit scaling
    pub count: usize,
}

impl PatternSpec {
    /// Creates a spec.
    #[must_use]
    pub const fn new(kind: PatternKind, count: usize) -> Self {
        Self { kind, count }
    }
}

/// One batch of projectiles.
pub type Batch = Vec<Projectile>;

/// What a pattern constructor returns.
#[derive(Debug, Clone)]
pub enum Emission {
    /// A single batch
    Single(Batch),
    /// Two sub-patterns fired together
    Combo(Batch, Batch),
}

impl Emission {
    /// Flattens one level.
    #[must_use]
    pub fn flatten(self) -> Batch {
        match self {
            Self::Single(batch) => batch,
            Self::Combo(mut first, second) => {
                first.extend(second);
                first
            },
        }
    }
}

/// Everything a pattern constructor needs besides the count.
#[derive(Debug, Clone, Copy)]
pub struct PatternContext<'a> {
    /// Boss firing the pattern
    pub owner: BossId,
    /// Spawn point
    pub origin: Vec2,
    /// Player's current position
    pub player: Vec2,
    /// Predicted player position
    pub predicted: Vec2,
    /// Boss rotation accumulator
    pub rotation: f32,
    /// Speed after every multiplier
    pub speed: f32,
    /// Damage after every multiplier
    pub damage: f32,
    /// Collision radius
    pub radius: f32,
    /// Arena geometry
    pub arena: &'a ArenaConfig,
}

impl PatternContext<'_> {
    fn projectile(
        &self,
        ids: &mut IdAllocator,
        position: Vec2,
        angle: f32,
        kind: PatternKind,
    ) -> Projectile {
        Projectile::new(
            ids.next_id(),
            self.owner,
            position,
            angle,
            self.speed,
            self.damage,
            self.radius,
            kind,
        )
    }
}

// ============================================================================
// Pattern constructors
// ============================================================================

/// `count` projectiles evenly spaced around `origin`, starting at `offset`.
fn ring(
    ctx: &PatternContext<'_>,
    ids: &mut IdAllocator,
    count: usize,
    offset: f32,
    kind: PatternKind,
) -> Batch {
    let count = count.max(1);
    let step = TAU / count as f32;
    (0..count)
        .map(|i| ctx.projectile(ids, ctx.origin, offset + step * i as f32, kind))
        .collect()
}

/// `count` projectiles fanned around the heading to `target`.
fn fan(
    ctx: &PatternContext<'_>,
    ids: &mut IdAllocator,
    count: usize,
    target: Vec2,
    kind: PatternKind,
) -> Batch {
    let count = count.max(1);
    let center = ctx.origin.angle_to(target);
    let half = (count - 1) as f32 / 2.0;
    (0..count)
        .map(|i| ctx.projectile(ids, ctx.origin, center + (i as f32 - half) * FAN_SPREAD, kind))
        .collect()
}

/// Ring around the boss.
pub fn radial_burst(ctx: &PatternContext<'_>, ids: &mut IdAllocator, count: usize) -> Batch {
    ring(ctx, ids, count, 0.0, PatternKind::RadialBurst)
}

/// Fan aimed at the player's current position.
pub fn aimed_shot(ctx: &PatternContext<'_>, ids: &mut IdAllocator, count: usize) -> Batch {
    fan(ctx, ids, count, ctx.player, PatternKind::AimedShot)
}

/// Fast fan aimed at the predicted position.
pub fn predictive_shot(ctx: &PatternContext<'_>, ids: &mut IdAllocator, count: usize) -> Batch {
    let mut batch = fan(ctx, ids, count, ctx.predicted, PatternKind::PredictiveShot);
    for p in &mut batch {
        p.speed *= PREDICTIVE_SPEED_SCALE;
    }
    batch
}

/// Ring offset by the rotation accumulator, each projectile curling as it flies.
pub fn spiral(ctx: &PatternContext<'_>, ids: &mut IdAllocator, count: usize) -> Batch {
    ring(ctx, ids, count, ctx.rotation, PatternKind::Spiral)
        .into_iter()
        .map(|p| p.with_trajectory(Trajectory::Spiral { angular_velocity: 0.8 }))
        .collect()
}

/// Horizontal row centred on the arena's top edge, falling straight down.
pub fn wall(ctx: &PatternContext<'_>, ids: &mut IdAllocator, count: usize) -> Batch {
    let count = count.max(1);
    let center_x = ctx.arena.x + ctx.arena.width / 2.0;
    let half = (count / 2) as f32;
    (0..count)
        .map(|i| {
            let x = center_x + (i as f32 - half) * WALL_SPACING;
            ctx.projectile(ids, Vec2::new(x, ctx.arena.y), FRAC_PI_2, PatternKind::Wall)
        })
        .collect()
}

/// Ring of projectiles spawned around the player, all heading inward.
pub fn converging(ctx: &PatternContext<'_>, ids: &mut IdAllocator, count: usize) -> Batch {
    let count = count.max(1);
    let radius = ctx.arena.width.min(ctx.arena.height) / 2.0;
    let step = TAU / count as f32;
    (0..count)
        .map(|i| {
            let spawn = ctx.player + Vec2::from_angle(step * i as f32).scale(radius);
            ctx.projectile(ids, spawn, spawn.angle_to(ctx.player), PatternKind::Converging)
        })
        .collect()
}

/// Random headings from the boss.
pub fn random_spray(
    ctx: &PatternContext<'_>,
    ids: &mut IdAllocator,
    rng: &mut fastrand::Rng,
    count: usize,
) -> Batch {
    (0..count.max(1))
        .map(|_| ctx.projectile(ids, ctx.origin, rng.f32() * TAU, PatternKind::RandomSpray))
        .collect()
}

/// Drops at random x positions along the top edge, drifting as they fall.
pub fn area_rain(
    ctx: &PatternContext<'_>,
    ids: &mut IdAllocator,
    rng: &mut fastrand::Rng,
    count: usize,
) -> Batch {
    (0..count.max(1))
        .map(|_| {
            let x = ctx.arena.x + rng.f32() * ctx.arena.width;
            ctx.projectile(ids, Vec2::new(x, ctx.arena.y), FRAC_PI_2, PatternKind::AreaRain)
                .with_trajectory(Trajectory::Jitter { magnitude: 1.5 })
        })
        .collect()
}

/// Swaying fan aimed at the player.
pub fn wave(ctx: &PatternContext<'_>, ids: &mut IdAllocator, count: usize) -> Batch {
    fan(ctx, ids, count, ctx.player, PatternKind::Wave)
        .into_iter()
        .map(|p| {
            p.with_trajectory(Trajectory::Wave {
                amplitude: 24.0,
                frequency: 1.5,
            })
        })
        .collect()
}

/// Falling row plus a column sweeping in from the left edge.
pub fn grid(ctx: &PatternContext<'_>, ids: &mut IdAllocator, count: usize) -> Batch {
    let count = count.max(2);
    let columns = count / 2;
    let rows = count - columns;
    let mut batch: Batch = wall(ctx, ids, columns)
        .into_iter()
        .map(|mut p| {
            p.tag = PatternKind::Grid;
            p
        })
        .collect();

    let center_y = ctx.arena.y + ctx.arena.height / 2.0;
    let half = (rows / 2) as f32;
    batch.extend((0..rows).map(|i| {
        let y = center_y + (i as f32 - half) * WALL_SPACING;
        ctx.projectile(ids, Vec2::new(ctx.arena.x, y), 0.0, PatternKind::Grid)
    }));
    batch
}

/// Builds the projectiles of one catalog entry.
pub fn build(
    spec: PatternSpec,
    ctx: &PatternContext<'_>,
    ids: &mut IdAllocator,
    rng: &mut fastrand::Rng,
) -> Emission {
    let count = spec.count;
    match spec.kind {
        PatternKind::RadialBurst => Emission::Single(radial_burst(ctx, ids, count)),
        PatternKind::AimedShot => Emission::Single(aimed_shot(ctx, ids, count)),
        PatternKind::PredictiveShot => Emission::Single(predictive_shot(ctx, ids, count)),
        PatternKind::Spiral => Emission::Single(spiral(ctx, ids, count)),
        PatternKind::Wall => Emission::Single(wall(ctx, ids, count)),
        PatternKind::Converging => Emission::Single(converging(ctx, ids, count)),
        PatternKind::RandomSpray => Emission::Single(random_spray(ctx, ids, rng, count)),
        PatternKind::AreaRain => Emission::Single(area_rain(ctx, ids, rng, count)),
        PatternKind::Wave => Emission::Single(wave(ctx, ids, count)),
        PatternKind::Grid => Emission::Single(grid(ctx, ids, count)),
        PatternKind::BurstAndAim => {
            let aimed = (count / 4).max(1);
            Emission::Combo(
                radial_burst(ctx, ids, count.saturating_sub(aimed).max(1)),
                aimed_shot(ctx, ids, aimed),
            )
        },
        PatternKind::SpiralAndWall => {
            let half = (count / 2).max(1);
            Emission::Combo(spiral(ctx, ids, half), wall(ctx, ids, half))
        },
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Pattern lists keyed by (boss, threat state), plus how many patterns each
/// state fires at once.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    entries: HashMap<(BossKind, ThreatState), Vec<PatternSpec>>,
    concurrency: [RangeInclusive<usize>; 3],
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl PatternCatalog {
    /// A catalog with no entries and the standard concurrency ranges.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            concurrency: [1..=2, 2..=3, 3..=4],
        }
    }

    /// The same pattern list for every boss and state.
    #[must_use]
    pub fn uniform(specs: &[PatternSpec]) -> Self {
        let mut catalog = Self::empty();
        for boss in BossKind::ALL {
            for state in ThreatState::ALL {
                catalog.insert(boss, state, specs.to_vec());
            }
        }
        catalog
    }

    /// The full catalog for all three bosses.
    #[must_use]
    pub fn standard() -> Self {
        use PatternKind::{
            AimedShot, AreaRain, BurstAndAim, Converging, Grid, PredictiveShot, RadialBurst,
            RandomSpray, Spiral, SpiralAndWall, Wall, Wave,
        };
        use ThreatState::{Aggressive, Calm, Unhinged};

        let s = PatternSpec::new;
        let mut catalog = Self::empty();

        catalog.insert(BossKind::Yacuruna, Calm, vec![s(RadialBurst, 8), s(AimedShot, 1), s(Wave, 3)]);
        catalog.insert(BossKind::Yacuruna, Aggressive, vec![s(Spiral, 12), s(PredictiveShot, 1), s(Wave, 5)]);
        catalog.insert(
            BossKind::Yacuruna,
            Unhinged,
            vec![s(RadialBurst, 20), s(RandomSpray, 30), s(Wall, 10), s(BurstAndAim, 16)],
        );

        catalog.insert(BossKind::Chullachaqui, Calm, vec![s(AimedShot, 3), s(Converging, 6)]);
        catalog.insert(
            BossKind::Chullachaqui,
            Aggressive,
            vec![s(Converging, 10), s(PredictiveShot, 3), s(RandomSpray, 12)],
        );
        catalog.insert(
            BossKind::Chullachaqui,
            Unhinged,
            vec![s(Grid, 12), s(Converging, 14), s(SpiralAndWall, 12), s(RandomSpray, 24)],
        );

        catalog.insert(BossKind::Yacumama, Calm, vec![s(Wave, 5), s(AreaRain, 8)]);
        catalog.insert(
            BossKind::Yacumama,
            Aggressive,
            vec![s(Spiral, 14), s(AreaRain, 12), s(PredictiveShot, 2)],
        );
        catalog.insert(
            BossKind::Yacumama,
            Unhinged,
            vec![s(Spiral, 20), s(AreaRain, 16), s(Grid, 14), s(BurstAndAim, 20)],
        );

        catalog
    }

    /// Sets the pattern list for a pair.
    pub fn insert(&mut self, boss: BossKind, state: ThreatState, specs: Vec<PatternSpec>) {
        self.entries.insert((boss, state), specs);
    }

    /// Pattern list for a pair.
    #[must_use]
    pub fn get(&self, boss: BossKind, state: ThreatState) -> Option<&[PatternSpec]> {
        self.entries.get(&(boss, state)).map(Vec::as_slice)
    }

    /// How many patterns fire at once in `state`.
    #[must_use]
    pub fn concurrency(&self, state: ThreatState) -> RangeInclusive<usize> {
        self.concurrency[state as usize].clone()
    }

    /// Overrides the concurrency range for `state`.
    pub fn set_concurrency(&mut self, state: ThreatState, range: RangeInclusive<usize>) {
        self.concurrency[state as usize] = range;
    }

    /// Checks that every reachable pair has patterns and every range is usable.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for state in ThreatState::ALL {
            let range = self.concurrency(state);
            if *range.start() == 0 || range.start() > range.end() {
                return Err(CatalogError::InvalidConcurrency {
                    state: state.to_string(),
                    min: *range.start(),
                    max: *range.end(),
                });
            }
        }

        for boss in BossKind::ALL {
            for state in ThreatState::ALL {
                match self.get(boss, state) {
                    None => {
                        return Err(CatalogError::Missing {
                            boss: boss.to_string(),
                            state: state.to_string(),
                        })
                    },
                    Some([]) => {
                        return Err(CatalogError::Empty {
                            boss: boss.to_string(),
                            state: state.to_string(),
                        })
                    },
                    Some(_) => {},
                }
            }
        }
        Ok(())
    }

    /// Samples up to `concurrency(state)` specs without replacement. The
    /// sample size is clamped to the catalog size; a missing or empty entry
    /// yields nothing.
    pub fn sample(
        &self,
        boss: BossKind,
        state: ThreatState,
        rng: &mut fastrand::Rng,
    ) -> Vec<PatternSpec> {
        let specs = self.get(boss, state).unwrap_or(&[]);
        debug_assert!(
            !specs.is_empty(),
            "no attack patterns for {boss} in state {state}"
        );
        if specs.is_empty() {
            error!("No attack patterns for {boss} in state {state}, skipping attack");
            return Vec::new();
        }

        let range = self.concurrency(state);
        let wanted = rng.usize(range);
        let mut pool = specs.to_vec();
        rng.shuffle(&mut pool);
        pool.truncate(wanted.min(specs.len()));
        pool
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Turns a boss's state into projectiles, beams and warnings.
#[derive(Debug, Clone)]
pub struct AttackPatternGenerator {
    catalog: PatternCatalog,
    arena: ArenaConfig,
    beam: BossTuning,
    base_speed: f32,
    base_damage: f32,
    incoming_damage: f32,
    radius: f32,
}

impl AttackPatternGenerator {
    /// Creates a generator. Speeds and damages already include the difficulty.
    #[must_use]
    pub fn new(catalog: PatternCatalog, config: &EncounterConfig) -> Self {
        Self {
            catalog,
            arena: config.arena.clone(),
            beam: config.boss.clone(),
            base_speed: config.projectile_speed(),
            base_damage: config.projectile_damage(),
            incoming_damage: config.difficulty.incoming_damage_multiplier(),
            radius: config.projectile.radius,
        }
    }

    /// The catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Builds one regular attack for `boss`.
    pub fn attack(
        &self,
        boss: &BossEntity,
        player: Vec2,
        prediction: Vec2,
        ids: &mut IdAllocator,
        rng: &mut fastrand::Rng,
    ) -> Vec<Entity> {
        let state = boss.state();
        let specs = self.catalog.sample(boss.kind, state, rng);
        if specs.is_empty() {
            return Vec::new();
        }

        let ctx = PatternContext {
            owner: boss.id,
            origin: boss.position,
            player,
            predicted: prediction,
            rotation: boss.rotation(),
            speed: self.base_speed * state.speed_multiplier() * boss.speed_multiplier(),
            damage: self.base_damage * state.damage_multiplier() * boss.damage_multiplier(),
            radius: self.radius,
            arena: &self.arena,
        };

        let mut entities = Vec::new();
        for spec in &specs {
            let scaled = PatternSpec {
                count: ((spec.count as f32 * boss.pattern_scale()).round() as usize).max(1),
                ..*spec
            };
            let batch = build(scaled, &ctx, ids, rng).flatten();
            entities.extend(batch.into_iter().map(Entity::Projectile));
        }

        debug!(
            "{} ({}) fired {:?}: {} projectiles",
            boss.kind,
            state,
            specs.iter().map(|s| s.kind).collect::<Vec<_>>(),
            entities.len()
        );
        entities
    }

    /// Arena-adjacent points a boss may beam from.
    #[must_use]
    pub fn beam_anchors(&self) -> [Vec2; 4] {
        let a = &self.arena;
        let inset = 40.0;
        [
            Vec2::new(a.x, a.y - inset),
            Vec2::new(a.x + a.width, a.y - inset),
            Vec2::new(a.x - inset, a.y + a.height / 2.0),
            Vec2::new(a.x + a.width + inset, a.y + a.height / 2.0),
        ]
    }

    /// Fires the beam if `boss` is allowed to. Relocates the boss to an
    /// anchor and aims at the player's current position. Returns the warning
    /// and the beam, or `None` when the beam is gated.
    pub fn try_beam(
        &self,
        boss: &mut BossEntity,
        player: Vec2,
        ids: &mut IdAllocator,
        rng: &mut fastrand::Rng,
    ) -> Option<Vec<Entity>> {
        if !boss.beam_ready() {
            return None;
        }

        let anchors = self.beam_anchors();
        let anchor = anchors[rng.usize(..anchors.len())];
        let angle = anchor.angle_to(player);
        let damage = self.beam.beam_damage
            * self.incoming_damage
            * boss.state().damage_multiplier()
            * boss.damage_multiplier();

        let motion = match rng.u8(0..4) {
            0 => BeamMotion::Static,
            1 => BeamMotion::Sweep {
                angular_velocity: if rng.bool() { 0.4 } else { -0.4 },
            },
            2 => BeamMotion::Oscillate {
                amplitude: 40.0,
                frequency: 0.8,
            },
            _ => BeamMotion::Orbit {
                center: self.arena.center(),
                angular_velocity: 0.3,
            },
        };

        let beam = Beam::new(
            ids.next_id(),
            boss.id,
            anchor,
            angle,
            self.beam.beam_width,
            self.beam.beam_length,
            damage,
            self.beam.beam_charge,
            self.beam.beam_fire,
        )
        .with_motion(motion);
        let warning = Warning::new(ids.next_id(), telegraph_area(&beam), self.beam.beam_charge);

        boss.relocate_for_beam(anchor, beam.total_duration());
        debug!("{} beams from ({:.0}, {:.0})", boss.kind, anchor.x, anchor.y);
        Some(vec![Entity::Warning(warning), Entity::Beam(beam)])
    }
}

fn telegraph_area(beam: &Beam) -> Aabb {
    beam.bounds()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::{ThreatInputs, ThreatTable};
    use selva_common::EntityId;

    fn context(arena: &ArenaConfig) -> PatternContext<'_> {
        PatternContext {
            owner: EntityId::from_raw(1),
            origin: Vec2::new(400.0, 100.0),
            player: Vec2::new(400.0, 300.0),
            predicted: Vec2::new(350.0, 300.0),
            rotation: 0.0,
            speed: 100.0,
            damage: 10.0,
            radius: 8.0,
            arena,
        }
    }

    fn unhinged_boss(kind: BossKind, config: &EncounterConfig) -> BossEntity {
        let mut boss =
            BossEntity::primary(EntityId::from_raw(1), kind, config, ThreatTable::default());
        boss.take_damage(boss.max_health() * 0.9);
        let inputs = ThreatInputs {
            boss_ratio: boss.health_ratio(),
            player_ratio: 0.5,
            direction_changes: 0,
            hits_taken: 10,
        };
        boss.threat.evaluate(&inputs);
        boss
    }

    #[test]
    fn test_radial_burst_is_evenly_spaced() {
        let arena = ArenaConfig::default();
        let mut ids = IdAllocator::new();
        let batch = radial_burst(&context(&arena), &mut ids, 8);

        assert_eq!(batch.len(), 8);
        let step = TAU / 8.0;
        for (i, p) in batch.iter().enumerate() {
            assert!((p.angle - step * i as f32).abs() < 1e-5);
        }
        assert_eq!(ids.allocated(), 8);
    }

    #[test]
    fn test_aimed_and_predictive_targets() {
        let arena = ArenaConfig::default();
        let ctx = context(&arena);
        let mut ids = IdAllocator::new();

        let aimed = aimed_shot(&ctx, &mut ids, 1);
        assert!((aimed[0].angle - FRAC_PI_2).abs() < 1e-5);

        let predicted = predictive_shot(&ctx, &mut ids, 1);
        let expected = ctx.origin.angle_to(ctx.predicted);
        assert!((predicted[0].angle - expected).abs() < 1e-5);
        assert!((predicted[0].speed - 150.0).abs() < 1e-4);
    }

    #[test]
    fn test_converging_heads_at_player() {
        let arena = ArenaConfig::default();
        let ctx = context(&arena);
        let mut ids = IdAllocator::new();
        for p in converging(&ctx, &mut ids, 6) {
            let heading = Vec2::from_angle(p.angle);
            let to_player = (ctx.player - p.position).normalized();
            assert!(heading.dot(to_player) > 0.999);
        }
    }

    #[test]
    fn test_combo_flattens_once() {
        let arena = ArenaConfig::default();
        let ctx = context(&arena);
        let mut ids = IdAllocator::new();
        let mut rng = fastrand::Rng::with_seed(3);

        let spec = PatternSpec::new(PatternKind::BurstAndAim, 16);
        let emission = build(spec, &ctx, &mut ids, &mut rng);
        assert!(matches!(emission, Emission::Combo(_, _)));
        let batch = emission.flatten();
        assert_eq!(batch.len(), 16);
        assert_eq!(
            batch.iter().filter(|p| p.tag == PatternKind::AimedShot).count(),
            4
        );
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = PatternCatalog::standard();
        assert!(catalog.validate().is_ok());
        for boss in BossKind::ALL {
            for state in ThreatState::ALL {
                let specs = catalog.get(boss, state).unwrap_or_default();
                assert!(specs.len() >= *catalog.concurrency(state).start());
            }
        }
    }

    #[test]
    fn test_catalog_validation_errors() {
        let mut catalog = PatternCatalog::uniform(&[PatternSpec::new(PatternKind::Wall, 5)]);
        assert!(catalog.validate().is_ok());

        catalog.insert(BossKind::Chullachaqui, ThreatState::Aggressive, Vec::new());
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::Empty {
                boss: "Chullachaqui".to_string(),
                state: "aggressive".to_string(),
            })
        );

        let missing = PatternCatalog::empty();
        assert!(matches!(missing.validate(), Err(CatalogError::Missing { .. })));

        let mut bad_range = PatternCatalog::standard();
        bad_range.set_concurrency(ThreatState::Calm, 0..=2);
        assert!(matches!(
            bad_range.validate(),
            Err(CatalogError::InvalidConcurrency { .. })
        ));
    }

    #[test]
    fn test_sample_clamps_to_catalog_size() {
        let mut catalog = PatternCatalog::empty();
        catalog.insert(
            BossKind::Yacuruna,
            ThreatState::Unhinged,
            vec![
                PatternSpec::new(PatternKind::RadialBurst, 5),
                PatternSpec::new(PatternKind::AimedShot, 1),
            ],
        );
        catalog.set_concurrency(ThreatState::Unhinged, 4..=4);

        let mut rng = fastrand::Rng::with_seed(11);
        let picked = catalog.sample(BossKind::Yacuruna, ThreatState::Unhinged, &mut rng);
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0].kind, picked[1].kind);

        let config = EncounterConfig::default();
        let generator = AttackPatternGenerator::new(catalog, &config);
        let boss = unhinged_boss(BossKind::Yacuruna, &config);
        let mut ids = IdAllocator::new();
        let player = Vec2::new(400.0, 300.0);
        let entities = generator.attack(&boss, player, player, &mut ids, &mut rng);
        assert_eq!(entities.len(), 6);
    }

    #[test]
    fn test_concurrency_grows_with_severity() {
        let catalog = PatternCatalog::standard();
        let mut rng = fastrand::Rng::with_seed(5);
        for _ in 0..50 {
            let calm = catalog.sample(BossKind::Yacumama, ThreatState::Calm, &mut rng).len();
            let unhinged = catalog
                .sample(BossKind::Yacumama, ThreatState::Unhinged, &mut rng)
                .len();
            assert!((1..=2).contains(&calm));
            assert!((3..=4).contains(&unhinged));
        }
    }

    #[test]
    fn test_speed_and_damage_are_composed() {
        let config = EncounterConfig::default();
        let catalog = PatternCatalog::uniform(&[PatternSpec::new(PatternKind::AimedShot, 1)]);
        let generator = AttackPatternGenerator::new(catalog, &config);
        let boss = unhinged_boss(BossKind::Chullachaqui, &config);
        let mut ids = IdAllocator::new();
        let mut rng = fastrand::Rng::with_seed(1);

        let player = Vec2::new(400.0, 300.0);
        let entities = generator.attack(&boss, player, Vec2::ZERO, &mut ids, &mut rng);
        let Some(Entity::Projectile(p)) = entities.first() else {
            panic!("expected a projectile");
        };
        assert!((p.speed - 180.0 * 1.8 * 1.1).abs() < 1e-3);
        assert!((p.damage - 10.0 * 2.5 * 1.1).abs() < 1e-3);
    }

    #[test]
    fn test_spirit_patterns_are_scaled_down() {
        let config = EncounterConfig::default();
        let catalog = PatternCatalog::uniform(&[PatternSpec::new(PatternKind::RadialBurst, 10)]);
        let generator = AttackPatternGenerator::new(catalog, &config);
        let spirit = BossEntity::spirit(
            EntityId::from_raw(9),
            BossKind::Yacuruna,
            Vec2::new(300.0, 100.0),
            &config,
            ThreatTable::default(),
        );
        let mut ids = IdAllocator::new();
        let mut rng = fastrand::Rng::with_seed(1);
        let entities = generator.attack(&spirit, Vec2::ZERO, Vec2::ZERO, &mut ids, &mut rng);
        assert_eq!(entities.len(), 6);
    }

    #[test]
    fn test_beam_gated_to_unhinged_final_boss() {
        let config = EncounterConfig::default();
        let generator = AttackPatternGenerator::new(PatternCatalog::standard(), &config);
        let mut ids = IdAllocator::new();
        let mut rng = fastrand::Rng::with_seed(2);
        let player = Vec2::new(400.0, 300.0);

        let mut calm = BossEntity::primary(
            EntityId::from_raw(1),
            BossKind::Yacumama,
            &config,
            ThreatTable::default(),
        );
        calm.tick(20.0);
        assert!(generator.try_beam(&mut calm, player, &mut ids, &mut rng).is_none());

        let mut boss = unhinged_boss(BossKind::Yacumama, &config);
        boss.tick(20.0);
        let spawned = generator
            .try_beam(&mut boss, player, &mut ids, &mut rng)
            .expect("beam should fire");
        assert_eq!(spawned.len(), 2);
        assert!(matches!(spawned[0], Entity::Warning(_)));
        let Entity::Beam(beam) = &spawned[1] else {
            panic!("expected a beam");
        };

        assert!(generator.beam_anchors().contains(&boss.position));
        assert_eq!(beam.origin, boss.position);
        assert!((beam.angle - boss.position.angle_to(player)).abs() < 1e-5);

        // Own cooldown restarts
        assert!(generator.try_beam(&mut boss, player, &mut ids, &mut rng).is_none());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "no attack patterns")]
    fn test_missing_catalog_asserts_in_debug() {
        let catalog = PatternCatalog::empty();
        let mut rng = fastrand::Rng::with_seed(1);
        let _ = catalog.sample(BossKind::Yacuruna, ThreatState::Calm, &mut rng);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_missing_catalog_is_noop_in_release() {
        let catalog = PatternCatalog::empty();
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(catalog
            .sample(BossKind::Yacuruna, ThreatState::Calm, &mut rng)
            .is_empty());
    }
}

//! Simulation entities: projectiles, beams, warnings and the player's own attacks.
//!
//! Every entity exposes an axis-aligned bounding shape through [`Collider`];
//! beams additionally expose a line segment with a width.

use std::f32::consts::TAU;

use selva_common::{point_segment_distance, Aabb, BossId, EntityId, Vec2};

use crate::patterns::PatternKind;

/// Anything that takes part in collision tests.
pub trait Collider {
    /// Axis-aligned bounding box in arena space.
    fn bounds(&self) -> Aabb;
}

// ============================================================================
// Projectiles
// ============================================================================

/// Per-tick motion rule of a projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trajectory {
    /// Straight line at constant speed.
    Linear,
    /// Sinusoidal sway around the straight path.
    Wave {
        /// Lateral amplitude
        amplitude: f32,
        /// Oscillations per second
        frequency: f32,
    },
    /// Heading rotates at a constant rate.
    Spiral {
        /// Radians per second
        angular_velocity: f32,
    },
    /// Heading drifts randomly.
    Jitter {
        /// Max heading change in radians per second
        magnitude: f32,
    },
}

/// A hostile projectile.
#[derive(Debug, Clone)]
pub struct Projectile {
    /// Entity ID
    pub id: EntityId,
    /// Boss that fired it
    pub owner: BossId,
    /// Centre position
    pub position: Vec2,
    /// Heading in radians
    pub angle: f32,
    /// Speed in units per second
    pub speed: f32,
    /// Damage dealt on contact
    pub damage: f32,
    /// Collision radius
    pub radius: f32,
    /// Pattern that spawned it
    pub tag: PatternKind,
    /// Motion rule
    pub trajectory: Trajectory,
    /// Whether still live
    pub active: bool,
    anchor: Vec2,
    age: f32,
}

impl Projectile {
    /// Creates a linear projectile.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EntityId,
        owner: BossId,
        position: Vec2,
        angle: f32,
        speed: f32,
        damage: f32,
        radius: f32,
        tag: PatternKind,
    ) -> Self {
        Self {
            id,
            owner,
            position,
            angle,
            speed,
            damage,
            radius,
            tag,
            trajectory: Trajectory::Linear,
            active: true,
            anchor: position,
            age: 0.0,
        }
    }

    /// Set the motion rule.
    #[must_use]
    pub fn with_trajectory(mut self, trajectory: Trajectory) -> Self {
        self.trajectory = trajectory;
        self
    }

    /// Seconds since spawn.
    #[must_use]
    pub fn age(&self) -> f32 {
        self.age
    }

    /// Advance by `dt` seconds. Only jittering projectiles draw from `rng`.
    pub fn advance(&mut self, dt: f32, rng: &mut fastrand::Rng) {
        self.age += dt;
        match self.trajectory {
            Trajectory::Linear => {
                self.position += Vec2::from_angle(self.angle).scale(self.speed * dt);
            },
            Trajectory::Wave {
                amplitude,
                frequency,
            } => {
                let heading = Vec2::from_angle(self.angle);
                self.anchor += heading.scale(self.speed * dt);
                let sway = (TAU * frequency * self.age).sin() * amplitude;
                self.position = self.anchor + heading.perpendicular().scale(sway);
            },
            Trajectory::Spiral { angular_velocity } => {
                self.angle += angular_velocity * dt;
                self.position += Vec2::from_angle(self.angle).scale(self.speed * dt);
            },
            Trajectory::Jitter { magnitude } => {
                self.angle += (rng.f32() * 2.0 - 1.0) * magnitude * dt;
                self.position += Vec2::from_angle(self.angle).scale(self.speed * dt);
            },
        }
    }

    /// Whether the centre lies inside `bounds`; the boundary itself counts as inside.
    #[must_use]
    pub fn is_within(&self, bounds: &Aabb) -> bool {
        bounds.contains_point(self.position)
    }
}

impl Collider for Projectile {
    fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.radius, self.radius)
    }
}

// ============================================================================
// Beams
// ============================================================================

/// Beam lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamPhase {
    /// Telegraphing, harmless
    Charging,
    /// Dealing damage
    Firing,
    /// Done, awaiting removal
    Expired,
}

/// Motion applied while a beam fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeamMotion {
    /// Fixed in place.
    Static,
    /// Origin circles `center`, always aimed at it.
    Orbit {
        /// Orbit centre
        center: Vec2,
        /// Radians per second
        angular_velocity: f32,
    },
    /// Angle rotates about the fixed origin.
    Sweep {
        /// Radians per second
        angular_velocity: f32,
    },
    /// Origin slides side to side across the aim line.
    Oscillate {
        /// Lateral amplitude
        amplitude: f32,
        /// Oscillations per second
        frequency: f32,
    },
}

/// A heavy line attack that charges, fires, then expires.
#[derive(Debug, Clone)]
pub struct Beam {
    /// Entity ID
    pub id: EntityId,
    /// Boss that fired it
    pub owner: BossId,
    /// Start of the segment
    pub origin: Vec2,
    /// Direction in radians
    pub angle: f32,
    /// Full width
    pub width: f32,
    /// Segment length
    pub length: f32,
    /// Damage per hit
    pub damage: f32,
    /// Motion rule while firing
    pub motion: BeamMotion,
    phase: BeamPhase,
    charge_time: f32,
    fire_time: f32,
    timer: f32,
    fire_elapsed: f32,
    anchor: Vec2,
}

impl Beam {
    /// Creates a charging, static beam.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EntityId,
        owner: BossId,
        origin: Vec2,
        angle: f32,
        width: f32,
        length: f32,
        damage: f32,
        charge_time: f32,
        fire_time: f32,
    ) -> Self {
        Self {
            id,
            owner,
            origin,
            angle,
            width,
            length,
            damage,
            motion: BeamMotion::Static,
            phase: BeamPhase::Charging,
            charge_time,
            fire_time,
            timer: 0.0,
            fire_elapsed: 0.0,
            anchor: origin,
        }
    }

    /// Set the firing motion.
    #[must_use]
    pub fn with_motion(mut self, motion: BeamMotion) -> Self {
        self.motion = motion;
        self
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> BeamPhase {
        self.phase
    }

    /// Whether the beam is dealing damage.
    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.phase == BeamPhase::Firing
    }

    /// Whether the beam is done.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.phase == BeamPhase::Expired
    }

    /// Charge plus fire time.
    #[must_use]
    pub fn total_duration(&self) -> f32 {
        self.charge_time + self.fire_time
    }

    /// End of the segment.
    #[must_use]
    pub fn end(&self) -> Vec2 {
        self.origin + Vec2::from_angle(self.angle).scale(self.length)
    }

    /// Advance the charge/fire timers, moving the beam while it fires.
    pub fn advance(&mut self, dt: f32) {
        match self.phase {
            BeamPhase::Charging => {
                self.timer += dt;
                if self.timer >= self.charge_time {
                    self.phase = BeamPhase::Firing;
                    self.timer -= self.charge_time;
                }
            },
            BeamPhase::Firing => {
                self.timer += dt;
                self.fire_elapsed += dt;
                self.apply_motion(dt);
                if self.timer >= self.fire_time {
                    self.phase = BeamPhase::Expired;
                }
            },
            BeamPhase::Expired => {},
        }
    }

    fn apply_motion(&mut self, dt: f32) {
        match self.motion {
            BeamMotion::Static => {},
            BeamMotion::Orbit {
                center,
                angular_velocity,
            } => {
                let radius = self.anchor.distance(center);
                let start = center.angle_to(self.anchor);
                let orbit = start + angular_velocity * self.fire_elapsed;
                self.origin = center + Vec2::from_angle(orbit).scale(radius);
                self.angle = self.origin.angle_to(center);
            },
            BeamMotion::Sweep { angular_velocity } => {
                self.angle += angular_velocity * dt;
            },
            BeamMotion::Oscillate {
                amplitude,
                frequency,
            } => {
                let across = Vec2::from_angle(self.angle).perpendicular();
                let offset = (TAU * frequency * self.fire_elapsed).sin() * amplitude;
                self.origin = self.anchor + across.scale(offset);
            },
        }
    }

    /// Whether a square hitbox centred at `center` touches the firing beam.
    #[must_use]
    pub fn hits(&self, center: Vec2, half_size: f32) -> bool {
        self.is_firing()
            && point_segment_distance(center, self.origin, self.end())
                <= self.width / 2.0 + half_size
    }
}

impl Collider for Beam {
    fn bounds(&self) -> Aabb {
        Aabb::from_points(self.origin, self.end()).expanded(self.width / 2.0)
    }
}

/// Advisory telegraph for an imminent beam. Deals no damage.
#[derive(Debug, Clone)]
pub struct Warning {
    /// Entity ID
    pub id: EntityId,
    /// Telegraphed region
    pub area: Aabb,
    remaining: f32,
}

impl Warning {
    /// Creates a warning that lasts `duration` seconds.
    #[must_use]
    pub fn new(id: EntityId, area: Aabb, duration: f32) -> Self {
        Self {
            id,
            area,
            remaining: duration,
        }
    }

    /// Seconds left.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Count down.
    pub fn advance(&mut self, dt: f32) {
        self.remaining -= dt;
    }

    /// Whether the warning is over.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

impl Collider for Warning {
    fn bounds(&self) -> Aabb {
        self.area
    }
}

// ============================================================================
// Player attacks
// ============================================================================

/// Collision half-extent of a player shot.
pub const PLAYER_SHOT_RADIUS: f32 = 4.0;

/// A shot fired by the player during attack mode.
#[derive(Debug, Clone)]
pub struct PlayerShot {
    /// Entity ID
    pub id: EntityId,
    /// Centre position
    pub position: Vec2,
    /// Velocity in units per second
    pub velocity: Vec2,
    /// Damage before the boss's resistance
    pub damage: f32,
    /// Whether still live
    pub active: bool,
}

impl PlayerShot {
    /// A shot travelling straight up.
    #[must_use]
    pub fn upward(id: EntityId, position: Vec2, speed: f32, damage: f32) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::UP.scale(speed),
            damage,
            active: true,
        }
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity.scale(dt);
    }
}

impl Collider for PlayerShot {
    fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, PLAYER_SHOT_RADIUS, PLAYER_SHOT_RADIUS)
    }
}

/// Expanding ring centred on the player. Hits at most one boss, once.
#[derive(Debug, Clone)]
pub struct SpecialAttack {
    /// Entity ID
    pub id: EntityId,
    /// Ring centre
    pub center: Vec2,
    /// Current radius
    pub radius: f32,
    /// Radius at which the ring dissipates
    pub max_radius: f32,
    /// Growth in units per second
    pub growth: f32,
    /// Damage before the boss's resistance
    pub damage: f32,
    /// Set once the ring has scored its hit
    pub consumed: bool,
    /// Whether the ring is still expanding
    pub active: bool,
}

impl SpecialAttack {
    /// Creates a ring.
    #[must_use]
    pub fn new(
        id: EntityId,
        center: Vec2,
        start_radius: f32,
        max_radius: f32,
        growth: f32,
        damage: f32,
    ) -> Self {
        Self {
            id,
            center,
            radius: start_radius,
            max_radius,
            growth,
            damage,
            consumed: false,
            active: true,
        }
    }

    /// Grow the ring.
    pub fn advance(&mut self, dt: f32) {
        self.radius += self.growth * dt;
        if self.radius >= self.max_radius {
            self.radius = self.max_radius;
            self.active = false;
        }
    }

    /// Whether `target` lies within the ring's reach.
    #[must_use]
    pub fn reaches(&self, target: &Aabb) -> bool {
        let nearest = target.clamp_point(self.center);
        nearest.distance(self.center) <= self.radius
    }
}

impl Collider for SpecialAttack {
    fn bounds(&self) -> Aabb {
        Aabb::from_center(self.center, self.radius, self.radius)
    }
}

/// Anything the pattern generator can spawn.
#[derive(Debug, Clone)]
pub enum Entity {
    /// Hostile projectile
    Projectile(Projectile),
    /// Heavy beam
    Beam(Beam),
    /// Beam telegraph
    Warning(Warning),
}

impl Entity {
    /// Entity ID.
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Projectile(p) => p.id,
            Self::Beam(b) => b.id,
            Self::Warning(w) => w.id,
        }
    }
}

impl Collider for Entity {
    fn bounds(&self) -> Aabb {
        match self {
            Self::Projectile(p) => p.bounds(),
            Self::Beam(b) => b.bounds(),
            Self::Warning(w) => w.bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> EntityId {
        EntityId::from_raw(n)
    }

    fn projectile(angle: f32) -> Projectile {
        Projectile::new(
            id(1),
            id(100),
            Vec2::new(0.0, 0.0),
            angle,
            100.0,
            10.0,
            8.0,
            PatternKind::AimedShot,
        )
    }

    #[test]
    fn test_linear_projectile_movement() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut p = projectile(0.0);
        p.advance(0.5, &mut rng);
        assert!((p.position.x - 50.0).abs() < 1e-4);
        assert!(p.position.y.abs() < 1e-4);
        assert!((p.age() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_wave_projectile_sways_but_progresses() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut p = projectile(0.0).with_trajectory(Trajectory::Wave {
            amplitude: 20.0,
            frequency: 1.0,
        });
        p.advance(0.25, &mut rng);
        // Quarter period: full lateral swing
        assert!((p.position.x - 25.0).abs() < 1e-3);
        assert!((p.position.y - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_spiral_projectile_turns() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut p = projectile(0.0).with_trajectory(Trajectory::Spiral {
            angular_velocity: 1.0,
        });
        p.advance(0.5, &mut rng);
        assert!((p.angle - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_jitter_is_seeded() {
        let mut a = projectile(0.0).with_trajectory(Trajectory::Jitter { magnitude: 3.0 });
        let mut b = a.clone();
        let mut rng_a = fastrand::Rng::with_seed(9);
        let mut rng_b = fastrand::Rng::with_seed(9);
        for _ in 0..10 {
            a.advance(0.1, &mut rng_a);
            b.advance(0.1, &mut rng_b);
        }
        assert_eq!(a.position, b.position);
    }

    #[test]
    fn test_beam_lifecycle() {
        let mut beam = Beam::new(id(2), id(100), Vec2::ZERO, 0.0, 20.0, 100.0, 15.0, 1.0, 0.5);
        let target = Vec2::new(50.0, 5.0);

        assert_eq!(beam.phase(), BeamPhase::Charging);
        assert!(!beam.hits(target, 5.0));

        beam.advance(1.0);
        assert!(beam.is_firing());
        assert!(beam.hits(target, 5.0));
        assert!(!beam.hits(Vec2::new(50.0, 40.0), 5.0));

        beam.advance(0.5);
        assert!(beam.is_expired());
        assert!(!beam.hits(target, 5.0));
    }

    #[test]
    fn test_beam_charge_overshoot_counts_toward_fire() {
        let mut beam = Beam::new(id(2), id(100), Vec2::ZERO, 0.0, 20.0, 100.0, 15.0, 1.0, 0.5);
        beam.advance(0.75);
        beam.advance(0.75);
        assert!(beam.is_firing());

        // 0.5 s already carried over from the charge
        beam.advance(0.25);
        assert!(beam.is_expired());
    }

    #[test]
    fn test_beam_sweep_only_while_firing() {
        let mut beam = Beam::new(id(2), id(100), Vec2::ZERO, 0.0, 20.0, 100.0, 15.0, 1.0, 2.0)
            .with_motion(BeamMotion::Sweep {
                angular_velocity: 1.0,
            });
        beam.advance(0.5);
        assert_eq!(beam.angle, 0.0);
        beam.advance(0.5);
        beam.advance(0.5);
        assert!((beam.angle - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_beam_orbit_keeps_radius() {
        let center = Vec2::new(100.0, 100.0);
        let mut beam = Beam::new(
            id(2),
            id(100),
            Vec2::new(0.0, 100.0),
            0.0,
            20.0,
            300.0,
            15.0,
            0.0,
            5.0,
        )
        .with_motion(BeamMotion::Orbit {
            center,
            angular_velocity: 1.0,
        });
        beam.advance(0.0);
        for _ in 0..10 {
            beam.advance(0.1);
        }
        assert!((beam.origin.distance(center) - 100.0).abs() < 1e-2);
        // Still aimed at the centre
        assert!(point_segment_distance(center, beam.origin, beam.end()) < 1e-2);
    }

    #[test]
    fn test_warning_expires() {
        let mut warning = Warning::new(id(3), Aabb::default(), 1.0);
        warning.advance(0.6);
        assert!(!warning.is_expired());
        warning.advance(0.4);
        assert!(warning.is_expired());
    }

    #[test]
    fn test_special_attack_growth() {
        let mut ring = SpecialAttack::new(id(4), Vec2::ZERO, 20.0, 200.0, 300.0, 50.0);
        let far = Aabb::from_center(Vec2::new(0.0, -150.0), 40.0, 40.0);

        assert!(!ring.reaches(&far));
        ring.advance(0.5);
        assert!((ring.radius - 170.0).abs() < 1e-3);
        assert!(ring.reaches(&far));
        ring.advance(1.0);
        assert!(!ring.active);
        assert!((ring.radius - 200.0).abs() < f32::EPSILON);
    }
}

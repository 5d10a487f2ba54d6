//! Per-tick resolver cost for growing projectile counts.

use std::f32::consts::TAU;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use selva_common::{IdAllocator, Vec2};
use selva_encounter::prelude::*;

struct Scene {
    world: EntityWorld,
    player: Player,
    bosses: Vec<BossEntity>,
}

fn make_scene(n: usize) -> (EncounterResolver, Scene) {
    let mut config = EncounterConfig::default();
    config.player.max_health = 10_000.0;
    let mut ids = IdAllocator::new();
    let player = Player::new(ids.next_id(), &config);
    let boss = BossEntity::primary(
        ids.next_id(),
        BossKind::Yacumama,
        &config,
        ThreatTable::default(),
    );

    let mut world = EntityWorld::new();
    let center = config.arena.center();
    for i in 0..n {
        let angle = TAU * i as f32 / n as f32;
        let ring = 40.0 + (i % 7) as f32 * 20.0;
        let position = center + Vec2::from_angle(angle).scale(ring);
        let projectile = Projectile::new(
            ids.next_id(),
            boss.id,
            position,
            angle,
            180.0,
            10.0,
            8.0,
            PatternKind::Spiral,
        )
        .with_trajectory(Trajectory::Spiral {
            angular_velocity: 0.8,
        });
        world.projectiles.push(projectile);
    }
    for _ in 0..8 {
        let position = player.position();
        world
            .shots
            .push(PlayerShot::upward(ids.next_id(), position, 480.0, 10.0));
    }

    let scene = Scene {
        world,
        player,
        bosses: vec![boss],
    };
    (EncounterResolver::new(&config.arena), scene)
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver_tick");
    for &n in &[100usize, 500, 1000, 5000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let (resolver, scene) = make_scene(n);
            let mut rng = fastrand::Rng::with_seed(1);
            b.iter_batched(
                || Scene {
                    world: scene.world.clone(),
                    player: scene.player.clone(),
                    bosses: scene.bosses.clone(),
                },
                |mut s| {
                    resolver.resolve(&mut s.world, &mut s.player, &mut s.bosses, 0.016, &mut rng)
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);

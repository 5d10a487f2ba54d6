//! Full scripted encounters driven through the director.

use selva_common::ProfileError;
use selva_encounter::prelude::*;

const DT: f32 = 1.0 / 60.0;

/// Remembers every profile it is handed.
#[derive(Default)]
struct RecordingSink {
    saved: Vec<BehaviorProfile>,
}

impl ProfileSink for RecordingSink {
    fn persist(&mut self, profile: &BehaviorProfile) -> Result<(), ProfileError> {
        self.saved.push(profile.clone());
        Ok(())
    }
}

/// A player that opens attack mode at once and hits hard.
fn brisk_config(shot_damage: f32) -> EncounterConfig {
    let mut config = EncounterConfig::default();
    config.player.attack_mode_dodges = 1;
    config.player.attack_window = 120.0;
    config.player.shot_damage = shot_damage;
    config.player.max_health = 10_000.0;
    config.timers.intro = 0.5;
    config.timers.phase_transition = 0.5;
    config
}

/// Jitters under the boss, shooting every frame.
fn weave(frame: u64) -> PlayerInput {
    PlayerInput {
        dx: if frame % 2 == 0 { 1 } else { -1 },
        dy: -1,
        shoot: true,
        special: true,
    }
}

fn idle(_frame: u64) -> PlayerInput {
    PlayerInput::default()
}

fn director(config: EncounterConfig, catalog: PatternCatalog, seed: u64) -> EncounterDirector {
    EncounterDirector::new(config, catalog, BehaviorProfile::default(), seed).expect("director")
}

fn run(
    director: &mut EncounterDirector,
    seconds: f32,
    sink: &mut dyn ProfileSink,
    input: impl Fn(u64) -> PlayerInput,
) -> Vec<EncounterEvent> {
    let frames = (seconds / DT) as u64;
    let mut events = Vec::new();
    for frame in 0..frames {
        director.tick(&input(frame), DT, sink);
        events.extend(director.drain_events());
        if director.is_finished() {
            break;
        }
    }
    events
}

/// Ticks `frames` times with `input`, no intro, returning what the sink saw.
fn flushes_over(
    flush_interval: f32,
    frames: u64,
    input: impl Fn(u64) -> PlayerInput,
) -> RecordingSink {
    let mut config = EncounterConfig::default();
    config.player.max_health = 10_000.0;
    config.timers.intro = 0.0;
    config.timers.flush_interval = flush_interval;

    let mut d = director(config, PatternCatalog::standard(), 21);
    let mut sink = RecordingSink::default();
    for frame in 0..frames {
        d.tick(&input(frame), DT, &mut sink);
    }
    assert!(!d.is_finished());
    sink
}

#[test]
fn test_profile_flushes_follow_configured_interval() {
    // First tick leaves the zero-length intro; 354 active ticks = 5.9 s
    assert_eq!(flushes_over(1.0, 355, idle).saved.len(), 5);
    assert_eq!(flushes_over(2.5, 355, idle).saved.len(), 2);
    assert_eq!(flushes_over(5.0, 355, idle).saved.len(), 1);
}

#[test]
fn test_dodges_reach_sink_mid_encounter() {
    let sway = |frame: u64| PlayerInput::moving(if (frame / 10) % 2 == 0 { 1 } else { -1 }, 0);
    let sink = flushes_over(1.0, 150, sway);

    assert_eq!(sink.saved.len(), 2);
    let first = &sink.saved[0];
    let second = &sink.saved[1];
    assert!(first.dodges.total() > 0);
    assert!(second.dodges.total() > first.dodges.total());
    assert!(second.dodges.left > 0 && second.dodges.right > 0);
}

#[test]
fn test_same_seed_same_encounter() {
    let mut config = EncounterConfig::default();
    config.player.max_health = 10_000.0;

    let script = |frame: u64| {
        let mut rng = fastrand::Rng::with_seed(frame / 20);
        PlayerInput {
            dx: rng.i8(-1..=1),
            dy: rng.i8(-1..=1),
            shoot: true,
            special: rng.bool(),
        }
    };

    let mut a = director(config.clone(), PatternCatalog::standard(), 99);
    let mut b = director(config, PatternCatalog::standard(), 99);
    let events_a = run(&mut a, 20.0, &mut NullSink, script);
    let events_b = run(&mut b, 20.0, &mut NullSink, script);

    assert_eq!(events_a, events_b);
    assert_eq!(a.player().position(), b.player().position());
    assert_eq!(a.player().health(), b.player().health());
    assert_eq!(a.world().projectiles.len(), b.world().projectiles.len());
    assert_eq!(a.profile(), b.profile());
    let health = |d: &EncounterDirector| d.bosses().iter().map(BossEntity::health).collect::<Vec<_>>();
    assert_eq!(health(&a), health(&b));
}

#[test]
fn test_victory_through_all_phases() {
    let mut d = director(brisk_config(400.0), PatternCatalog::standard(), 7);
    let mut sink = RecordingSink::default();
    let events = run(&mut d, 60.0, &mut sink, weave);

    assert_eq!(d.outcome(), Some(EncounterOutcome::Victory));
    assert!(d.world().is_empty());

    let defeated: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EncounterEvent::BossDefeated { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(defeated, BossKind::ALL.to_vec());

    let advanced: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EncounterEvent::PhaseAdvanced { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(advanced, vec![1, 2]);

    assert_eq!(
        events.last(),
        Some(&EncounterEvent::EncounterEnded {
            outcome: EncounterOutcome::Victory
        })
    );
    assert!(d.player().shots_fired() > 0);

    d.finish(&mut sink);
    let last = sink.saved.last().expect("final flush");
    assert!(last.dodges.total() > 0);
    assert_eq!(last, d.profile());
}

#[test]
fn test_spirits_rise_once_in_final_phase() {
    let mut d = director(brisk_config(250.0), PatternCatalog::standard(), 3);
    let events = run(&mut d, 60.0, &mut NullSink, weave);

    let revived: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EncounterEvent::SpiritRevived { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(revived, vec![BossKind::Yacuruna, BossKind::Chullachaqui]);
    assert_eq!(
        d.revived().collect::<Vec<_>>(),
        vec![BossKind::Yacuruna, BossKind::Chullachaqui]
    );
    assert!(events.contains(&EncounterEvent::DialogueCue {
        boss: BossKind::Yacumama,
        moment: DialogueMoment::Revival,
    }));

    // The final boss still decides the fight
    assert_eq!(d.outcome(), Some(EncounterOutcome::Victory));
}

#[test]
fn test_defeat_when_player_falls() {
    let mut config = EncounterConfig::default();
    config.player.max_health = 1.0;
    config.timers.intro = 0.5;
    let catalog = PatternCatalog::uniform(&[PatternSpec::new(PatternKind::AimedShot, 1)]);

    let mut d = director(config, catalog, 5);
    let events = run(&mut d, 30.0, &mut NullSink, idle);

    assert_eq!(d.outcome(), Some(EncounterOutcome::Defeat));
    assert!(d.player().is_dead());
    assert!(d.world().is_empty());
    assert!(events
        .iter()
        .any(|e| matches!(e, EncounterEvent::PlayerDamaged { .. })));
    assert_eq!(
        events.last(),
        Some(&EncounterEvent::EncounterEnded {
            outcome: EncounterOutcome::Defeat
        })
    );
}

#[test]
fn test_abandon_cancels_pending_attacks() {
    let mut config = EncounterConfig::default();
    config.player.max_health = 10_000.0;
    let mut d = director(config, PatternCatalog::standard(), 11);

    let mut sink = NullSink;
    let mut frames = 0;
    while d.world().hostile_count() == 0 && frames < 60 * 30 {
        d.tick(&PlayerInput::default(), DT, &mut sink);
        frames += 1;
    }
    assert!(d.world().hostile_count() > 0, "a first attack landed in the world");

    d.abandon();
    assert_eq!(d.outcome(), Some(EncounterOutcome::Abandoned));
    assert!(d.world().is_empty());
    let home = d.config().arena.boss_home();
    assert!(d.bosses().iter().all(|b| !b.attack_ready() && b.position == home));

    for _ in 0..600 {
        d.tick(&PlayerInput::default(), DT, &mut sink);
    }
    assert!(d.world().is_empty());
    assert!(d
        .drain_events()
        .iter()
        .any(|e| *e == EncounterEvent::EncounterEnded {
            outcome: EncounterOutcome::Abandoned
        }));
}

//! Encounter orchestration.
//!
//! The director owns every piece of encounter state and steps it once per
//! frame:
//!
//! 1. player input (movement, dodges, shots)
//! 2. boss timers
//! 3. entity advance and collision resolution
//! 4. defeat check
//! 5. threat re-evaluation for every live boss
//! 6. boss and spirit defeat, phase transition, victory
//! 7. revival
//! 8. attack cycles and the beam
//! 9. behavior sampling, analysis and profile flushes
//!
//! Presentation hooks are published on the [`EventBus`].

use std::collections::BTreeSet;
use std::fmt;

use selva_common::{IdAllocator, SelvaError, Vec2};
use tracing::{debug, info};

use crate::boss::{BossEntity, BossKind};
use crate::config::EncounterConfig;
use crate::events::{DialogueMoment, EncounterEvent, EncounterOutcome, EventBus};
use crate::patterns::{AttackPatternGenerator, PatternCatalog};
use crate::player::{Player, PlayerInput};
use crate::predictive::PredictiveAi;
use crate::profile::BehaviorProfile;
use crate::resolver::{EncounterResolver, EntityWorld, TickReport};
use crate::store::ProfileSink;
use crate::threat::ThreatTable;

/// Horizontal distance between the final boss and a revived spirit.
const SPIRIT_OFFSET_X: f32 = 150.0;

/// Vertical distance between the final boss and a revived spirit.
const SPIRIT_OFFSET_Y: f32 = 30.0;

/// Coarse encounter state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncounterPhase {
    /// Opening pause before the first attack cycle
    Intro {
        /// Seconds left
        remaining: f32,
    },
    /// Fighting
    Active,
    /// Non-interactive pause between bosses
    PhaseTransition {
        /// Seconds left
        remaining: f32,
        /// Boss of the coming phase
        next: BossKind,
    },
    /// Terminal
    Ended(EncounterOutcome),
}

impl EncounterPhase {
    /// Whether the encounter is over.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended(_))
    }
}

impl fmt::Display for EncounterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intro { .. } => f.write_str("intro"),
            Self::Active => f.write_str("active"),
            Self::PhaseTransition { next, .. } => write!(f, "transition to {next}"),
            Self::Ended(outcome) => write!(f, "ended ({outcome:?})"),
        }
    }
}

/// Drives a full multi-phase encounter.
#[derive(Debug)]
pub struct EncounterDirector {
    config: EncounterConfig,
    table: ThreatTable,
    generator: AttackPatternGenerator,
    resolver: EncounterResolver,
    ai: PredictiveAi,
    events: EventBus,
    ids: IdAllocator,
    rng: fastrand::Rng,

    // === Live state ===
    player: Player,
    bosses: Vec<BossEntity>,
    world: EntityWorld,
    phase_index: usize,
    stage: EncounterPhase,
    revived: BTreeSet<BossKind>,

    // === Behavior sampling ===
    analysis_timer: f32,

    // === Stats ===
    elapsed: f64,
    ticks: u64,
    last_report: TickReport,
}

impl EncounterDirector {
    /// Builds an encounter. The config is clamped first; the catalog and
    /// the threat table are checked before anything is spawned.
    pub fn new(
        mut config: EncounterConfig,
        catalog: PatternCatalog,
        profile: BehaviorProfile,
        seed: u64,
    ) -> Result<Self, SelvaError> {
        config.validate();
        catalog.validate()?;
        let table = config.threat.table()?;

        let mut ids = IdAllocator::new();
        let player = Player::new(ids.next_id(), &config);

        let mut director = Self {
            table,
            generator: AttackPatternGenerator::new(catalog, &config),
            resolver: EncounterResolver::new(&config.arena),
            ai: PredictiveAi::new(profile, config.timers.flush_interval),
            events: EventBus::default(),
            ids,
            rng: fastrand::Rng::with_seed(seed),
            player,
            bosses: Vec::new(),
            world: EntityWorld::new(),
            phase_index: 0,
            stage: EncounterPhase::Intro {
                remaining: config.timers.intro,
            },
            revived: BTreeSet::new(),
            analysis_timer: 0.0,
            elapsed: 0.0,
            ticks: 0,
            last_report: TickReport::default(),
            config,
        };
        director.start_phase(BossKind::Yacuruna);
        info!(
            "Encounter ready: difficulty {:?}, seed {seed}",
            director.config.difficulty
        );
        Ok(director)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Coarse state.
    #[must_use]
    pub fn phase(&self) -> EncounterPhase {
        self.stage
    }

    /// Index of the current boss phase.
    #[must_use]
    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    /// Outcome once the encounter has ended.
    #[must_use]
    pub fn outcome(&self) -> Option<EncounterOutcome> {
        match self.stage {
            EncounterPhase::Ended(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Whether the encounter is over.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.stage.is_terminal()
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Live bosses; the primary comes first.
    #[must_use]
    pub fn bosses(&self) -> &[BossEntity] {
        &self.bosses
    }

    /// The current phase's primary boss.
    #[must_use]
    pub fn primary(&self) -> Option<&BossEntity> {
        self.bosses.iter().find(|b| !b.is_spirit())
    }

    /// Live entities.
    #[must_use]
    pub fn world(&self) -> &EntityWorld {
        &self.world
    }

    /// The behavior model.
    #[must_use]
    pub fn ai(&self) -> &PredictiveAi {
        &self.ai
    }

    /// The in-memory behavior profile.
    #[must_use]
    pub fn profile(&self) -> &BehaviorProfile {
        self.ai.profile()
    }

    /// The event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drains pending events.
    pub fn drain_events(&self) -> Vec<EncounterEvent> {
        self.events.drain()
    }

    /// Bosses already revived as spirits.
    pub fn revived(&self) -> impl Iterator<Item = BossKind> + '_ {
        self.revived.iter().copied()
    }

    /// Simulated seconds so far.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Ticks so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Collision report of the latest active tick.
    #[must_use]
    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    /// The configuration after clamping.
    #[must_use]
    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    // ========================================================================
    // Frame step
    // ========================================================================

    /// Advances the encounter by `dt` seconds.
    pub fn tick(
        &mut self,
        input: &PlayerInput,
        dt: f32,
        sink: &mut dyn ProfileSink,
    ) -> EncounterPhase {
        if self.stage.is_terminal() {
            return self.stage;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += f64::from(dt);
        self.ticks += 1;

        match self.stage {
            EncounterPhase::Intro { remaining } => {
                let remaining = remaining - dt;
                self.stage = if remaining <= 0.0 {
                    debug!("Intro over");
                    EncounterPhase::Active
                } else {
                    EncounterPhase::Intro { remaining }
                };
            },
            EncounterPhase::PhaseTransition { remaining, next } => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    self.start_phase(next);
                    self.events.publish(EncounterEvent::PhaseAdvanced {
                        phase: self.phase_index,
                        kind: next,
                    });
                    info!("Phase {} begins: {next}", self.phase_index);
                    self.stage = EncounterPhase::Active;
                } else {
                    self.stage = EncounterPhase::PhaseTransition { remaining, next };
                }
            },
            EncounterPhase::Active => self.step_active(input, dt, sink),
            EncounterPhase::Ended(_) => {},
        }
        self.stage
    }

    fn step_active(&mut self, input: &PlayerInput, dt: f32, sink: &mut dyn ProfileSink) {
        self.update_player(input, dt);

        for boss in &mut self.bosses {
            boss.tick(dt);
        }

        let report = self.resolver.resolve(
            &mut self.world,
            &mut self.player,
            &mut self.bosses,
            dt,
            &mut self.rng,
        );
        self.publish_hits(&report);
        self.last_report = report;

        if self.player.is_dead() {
            self.end(EncounterOutcome::Defeat);
            return;
        }

        self.evaluate_threat();
        if self.resolve_defeats() {
            return;
        }
        self.check_revival();
        self.run_attacks();
        self.analyze_behavior(dt, sink);
    }

    fn update_player(&mut self, input: &PlayerInput, dt: f32) {
        let update = self.player.apply_input(input, dt, &self.config.arena);
        if update.entered_attack_mode {
            self.events
                .publish(EncounterEvent::AttackModeChanged { active: true });
        }
        if update.left_attack_mode {
            self.world.clear_player_attacks();
            self.events
                .publish(EncounterEvent::AttackModeChanged { active: false });
        }

        if input.shoot {
            if let Some(shot) = self.player.try_shoot(&mut self.ids) {
                self.world.shots.push(shot);
            }
        }
        if input.special {
            if let Some(special) = self.player.try_special(&mut self.ids) {
                debug!(
                    "Player special attack at ({:.0}, {:.0})",
                    special.center.x, special.center.y
                );
                self.world.specials.push(special);
            }
        }
    }

    fn publish_hits(&self, report: &TickReport) {
        for hit in &report.player_hits {
            self.events.publish(EncounterEvent::PlayerDamaged {
                amount: hit.damage,
                remaining: self.player.health(),
            });
        }
        for hit in &report.boss_hits {
            let remaining = self
                .bosses
                .iter()
                .find(|b| b.id == hit.boss)
                .map_or(0.0, BossEntity::health);
            self.events.publish(EncounterEvent::BossDamaged {
                boss: hit.boss,
                amount: hit.damage,
                remaining,
            });
        }
    }

    fn evaluate_threat(&mut self) {
        let player_ratio = self.player.health_ratio();
        let direction_changes = self.player.direction_changes();
        let hits = self.player.hits_taken();

        for boss in &mut self.bosses {
            if boss.is_defeated() {
                continue;
            }
            let inputs = boss.threat_inputs(player_ratio, direction_changes, hits);
            if let Some(transition) = boss.threat.evaluate(&inputs) {
                self.events.publish(EncounterEvent::ThreatStateChanged {
                    boss: boss.id,
                    kind: boss.kind,
                    from: transition.from,
                    to: transition.to,
                });
                if !boss.is_spirit() {
                    self.events.publish(EncounterEvent::DialogueCue {
                        boss: boss.kind,
                        moment: DialogueMoment::ThreatChange(transition.to),
                    });
                }
            }
        }
    }

    /// Removes fallen spirits and handles a fallen primary. Returns true
    /// when the phase or the encounter ended.
    fn resolve_defeats(&mut self) -> bool {
        for spirit in self.bosses.iter().filter(|b| b.is_spirit() && b.is_defeated()) {
            info!("Spirit of {} banished", spirit.kind);
            self.events.publish(EncounterEvent::SpiritBanished {
                boss: spirit.id,
                kind: spirit.kind,
            });
        }
        self.bosses.retain(|b| !(b.is_spirit() && b.is_defeated()));

        let Some(fallen) = self
            .bosses
            .iter()
            .find(|b| !b.is_spirit() && b.is_defeated())
            .map(|b| b.kind)
        else {
            return false;
        };

        info!("{fallen} defeated in phase {}", self.phase_index);
        self.events.publish(EncounterEvent::BossDefeated {
            kind: fallen,
            phase: self.phase_index,
        });
        self.events.publish(EncounterEvent::DialogueCue {
            boss: fallen,
            moment: DialogueMoment::Defeat,
        });

        match fallen.next() {
            None => self.end(EncounterOutcome::Victory),
            Some(next) => {
                self.world.clear();
                self.bosses.clear();
                self.player.reset_for_new_phase();
                self.ai.clear_samples();
                self.stage = EncounterPhase::PhaseTransition {
                    remaining: self.config.timers.phase_transition,
                    next,
                };
            },
        }
        true
    }

    /// Raises a spirit for every earlier boss not yet revived, once the
    /// final boss drops below the revival threshold.
    fn check_revival(&mut self) {
        let threshold = self.config.boss.revival_threshold;
        let Some(primary) = self.bosses.iter().find(|b| !b.is_spirit()) else {
            return;
        };
        if !primary.kind.is_final()
            || primary.is_defeated()
            || primary.health_ratio() >= threshold
        {
            return;
        }
        let final_kind = primary.kind;
        let home = primary.home();

        let mut raised = 0_usize;
        for kind in BossKind::ALL {
            if kind.phase() >= final_kind.phase() || self.revived.contains(&kind) {
                continue;
            }
            self.revived.insert(kind);

            let side = if raised % 2 == 0 { -1.0 } else { 1.0 };
            let position =
                Vec2::new(home.x + side * SPIRIT_OFFSET_X, home.y + SPIRIT_OFFSET_Y);
            let spirit = BossEntity::spirit(
                self.ids.next_id(),
                kind,
                position,
                &self.config,
                self.table,
            );
            info!("{final_kind} raises the spirit of {kind}");
            self.events.publish(EncounterEvent::SpiritRevived {
                boss: spirit.id,
                kind,
            });
            self.bosses.push(spirit);
            raised += 1;
        }

        if raised > 0 {
            self.events.publish(EncounterEvent::DialogueCue {
                boss: final_kind,
                moment: DialogueMoment::Revival,
            });
        }
    }

    fn run_attacks(&mut self) {
        let target = self.player.position();
        let prediction = self.ai.predict_target(target);

        for boss in &mut self.bosses {
            if boss.is_defeated() {
                continue;
            }

            if boss.attack_ready() {
                boss.reset_attack_timer();
                let spawned =
                    self.generator
                        .attack(boss, target, prediction, &mut self.ids, &mut self.rng);
                self.world.extend(spawned);
                if !boss.is_spirit() {
                    boss.threat.restart_quip();
                    self.events.publish(EncounterEvent::DialogueCue {
                        boss: boss.kind,
                        moment: DialogueMoment::Attack(boss.state()),
                    });
                }
            }

            if let Some(spawned) =
                self.generator
                    .try_beam(boss, target, &mut self.ids, &mut self.rng)
            {
                self.world.extend(spawned);
                self.events.publish(EncounterEvent::SpecialMoveTriggered {
                    boss: boss.id,
                    kind: boss.kind,
                });
            }
        }
    }

    fn analyze_behavior(&mut self, dt: f32, sink: &mut dyn ProfileSink) {
        self.ai.observe(&self.player.telemetry(), dt, sink);

        self.analysis_timer += dt;
        let interval = self.config.timers.analysis_interval;
        if self.analysis_timer >= interval {
            self.analysis_timer -= interval;
            if let Some(pattern) = self.ai.analyze_samples() {
                debug!("Recent movement: {}", pattern.label());
            }
        }
    }

    // ========================================================================
    // Phases and termination
    // ========================================================================

    fn start_phase(&mut self, kind: BossKind) {
        self.phase_index = kind.phase();
        self.bosses.clear();
        let boss = BossEntity::primary(self.ids.next_id(), kind, &self.config, self.table);
        self.bosses.push(boss);
        self.events.publish(EncounterEvent::DialogueCue {
            boss: kind,
            moment: DialogueMoment::Intro,
        });
    }

    /// Leaves the encounter without a winner.
    pub fn abandon(&mut self) {
        if !self.stage.is_terminal() {
            self.end(EncounterOutcome::Abandoned);
        }
    }

    /// Terminates the encounter: every live entity is dropped and every
    /// pending boss timer is cancelled in the same step, so nothing can land
    /// afterwards.
    fn end(&mut self, outcome: EncounterOutcome) {
        self.world.clear();
        for boss in &mut self.bosses {
            boss.cancel_timers();
        }
        self.stage = EncounterPhase::Ended(outcome);
        info!(
            "Encounter ended: {outcome:?} after {:.1}s ({} ticks)",
            self.elapsed, self.ticks
        );
        self.events
            .publish(EncounterEvent::EncounterEnded { outcome });
    }

    /// Ends the encounter if still running and performs the final flush.
    pub fn finish(&mut self, sink: &mut dyn ProfileSink) {
        self.abandon();
        self.ai.observe(&self.player.telemetry(), 0.0, sink);
        self.ai.flush(sink);
    }
}

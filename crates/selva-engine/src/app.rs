//! Headless encounter runner.
//!
//! Loads the config and the stored behavior profile, drives the director
//! with scripted input on a fixed timestep and persists what it learned.

use std::path::PathBuf;

use anyhow::Result;
use selva_encounter::{
    BackgroundProfileWriter, BossKind, EncounterDirector, EncounterEvent, EncounterOutcome,
    PatternCatalog, ProfileSink, ProfileStore,
};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, CONFIG_FILE};
use crate::input::ScriptedInput;
use crate::timing::FrameClock;

/// Mixed into the seed so input and encounter draw different streams.
const INPUT_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// What one run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// How the encounter ended
    pub outcome: Option<EncounterOutcome>,
    /// Last boss faced
    pub last_boss: Option<BossKind>,
    /// Simulated seconds
    pub elapsed: f64,
    /// Ticks run
    pub ticks: u64,
    /// Player health at the end
    pub player_health: f32,
    /// Hits the player took
    pub hits_taken: u32,
    /// Shots the player fired
    pub shots_fired: u32,
    /// Bosses defeated, spirits excluded
    pub bosses_defeated: u32,
    /// Spirits raised in the final phase
    pub spirits_revived: u32,
    /// Threat state transitions
    pub threat_changes: u32,
    /// Events lost to a full bus
    pub dropped_events: u64,
    /// Ticks the frame clock discarded
    pub dropped_ticks: u64,
}

impl RunSummary {
    fn record(&mut self, event: &EncounterEvent) {
        match event {
            EncounterEvent::BossDefeated { kind, .. } => {
                self.bosses_defeated += 1;
                debug!("{kind} defeated");
            },
            EncounterEvent::SpiritRevived { .. } => self.spirits_revived += 1,
            EncounterEvent::ThreatStateChanged { .. } => self.threat_changes += 1,
            EncounterEvent::EncounterEnded { outcome } => self.outcome = Some(*outcome),
            _ => {},
        }
    }

    fn log(&self) {
        let outcome = self
            .outcome
            .map_or_else(|| "unfinished".to_string(), |o| format!("{o:?}"));
        info!(
            "Run finished: {outcome} after {:.1}s ({} ticks), last boss {}",
            self.elapsed,
            self.ticks,
            self.last_boss.map_or("none", BossKind::name)
        );
        info!(
            "Player: {:.0} health, {} hits taken, {} shots fired",
            self.player_health, self.hits_taken, self.shots_fired
        );
        info!(
            "Bosses defeated: {}, spirits revived: {}, threat changes: {}",
            self.bosses_defeated, self.spirits_revived, self.threat_changes
        );
        if self.dropped_events > 0 || self.dropped_ticks > 0 {
            warn!(
                "Dropped {} events and {} ticks",
                self.dropped_events, self.dropped_ticks
            );
        }
    }
}

/// Reads the config named on the command line (or `selva.toml`) and runs.
pub fn run() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = EngineConfig::load_from(&config_path);
    config.validate();
    if !config_path.exists() {
        if let Err(e) = config.save_to(&config_path) {
            warn!("Failed to write default config: {e}");
        }
    }

    let summary = simulate(&config)?;
    summary.log();
    Ok(())
}

/// Runs one encounter to completion or to the time limit.
pub fn simulate(config: &EngineConfig) -> Result<RunSummary> {
    let mut store = ProfileStore::new(&config.profile_path);
    let profile = store.load();
    let mut sink: Box<dyn ProfileSink> = if config.background_writer {
        Box::new(BackgroundProfileWriter::spawn(store.clone())?)
    } else {
        Box::new(store.clone())
    };

    let mut director = EncounterDirector::new(
        config.encounter.clone(),
        PatternCatalog::standard(),
        profile,
        config.seed,
    )?;
    let mut script = ScriptedInput::new(config.seed ^ INPUT_SEED_SALT);
    let mut clock = FrameClock::new(config.tick_rate, config.render_fps);
    let mut summary = RunSummary::default();
    let limit = f64::from(config.max_seconds);

    info!(
        "Running at {} ticks/s, {} frames/s, limit {:.0}s",
        config.tick_rate, config.render_fps, config.max_seconds
    );

    while !director.is_finished() {
        let frame_dt = if config.realtime {
            clock.delta_time()
        } else {
            clock.frame_dt()
        };

        for _ in 0..clock.accumulate(frame_dt) {
            let input = script.next(director.player());
            director.tick(&input, clock.fixed_dt(), sink.as_mut());
            for event in director.drain_events() {
                summary.record(&event);
            }
            if director.is_finished() {
                break;
            }
        }

        if !director.is_finished() && director.elapsed() >= limit {
            warn!("Time limit of {limit:.0}s reached, abandoning encounter");
            director.abandon();
        }

        if config.realtime {
            clock.sleep_remainder();
        }
    }

    // Queued background writes land before the final one
    drop(sink);
    director.finish(&mut store);
    debug!("Scripted special used: {}", script.special_spent());
    for event in director.drain_events() {
        summary.record(&event);
    }

    let player = director.player();
    summary.last_boss = director.primary().map(|b| b.kind);
    summary.elapsed = director.elapsed();
    summary.ticks = director.ticks();
    summary.player_health = player.health();
    summary.hits_taken = player.hits_taken();
    summary.shots_fired = player.shots_fired();
    summary.dropped_events = director.events().dropped();
    summary.dropped_ticks = clock.dropped();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quick_config(dir: &TempDir) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.profile_path = dir.path().join("behavior.json");
        config.max_seconds = 5.0;
        config.encounter.timers.intro = 0.5;
        config.encounter.player.max_health = 10_000.0;
        config.validate();
        config
    }

    #[test]
    fn test_time_limit_abandons() {
        let dir = TempDir::new().expect("temp dir");
        let config = quick_config(&dir);

        let summary = simulate(&config).expect("run");

        assert_eq!(summary.outcome, Some(EncounterOutcome::Abandoned));
        assert!(summary.elapsed >= 5.0);
        assert!(summary.elapsed < 5.5);
        assert_eq!(summary.last_boss, Some(BossKind::Yacuruna));
    }

    #[test]
    fn test_profile_written_and_reloaded() {
        let dir = TempDir::new().expect("temp dir");
        let mut config = quick_config(&dir);
        config.background_writer = false;

        simulate(&config).expect("first run");
        assert!(config.profile_path.exists());
        let first = ProfileStore::new(&config.profile_path).load();
        assert!(first.dodges.total() > 0);

        simulate(&config).expect("second run");
        let second = ProfileStore::new(&config.profile_path).load();
        assert!(second.dodges.total() > first.dodges.total());
    }

    #[test]
    fn test_background_writer_flushes_before_exit() {
        let dir = TempDir::new().expect("temp dir");
        let config = quick_config(&dir);

        simulate(&config).expect("run");

        let stored = ProfileStore::new(&config.profile_path).load();
        assert!(stored.dodges.total() > 0);
    }

    #[test]
    fn test_same_seed_same_summary() {
        let dir = TempDir::new().expect("temp dir");
        let mut config = quick_config(&dir);
        config.background_writer = false;
        let other = TempDir::new().expect("temp dir");
        let mut twin = config.clone();
        twin.profile_path = other.path().join("behavior.json");

        let a = simulate(&config).expect("run a");
        let b = simulate(&twin).expect("run b");
        assert_eq!(a, b);
    }
}

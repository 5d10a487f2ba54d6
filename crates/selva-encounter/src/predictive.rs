//! Predictive model of player movement.
//!
//! A frequency heuristic, not a forecast: predictions come only from the
//! historical dodge tally and classified movement axes, never from velocity.

use selva_common::Vec2;
use tracing::{debug, warn};

use crate::profile::{BehaviorProfile, DodgeCounts, MovementPattern, MOVEMENT_HISTORY_LIMIT};
use crate::store::ProfileSink;

/// Offset of a prediction from the current position.
pub const BASE_PREDICTION_OFFSET: f32 = 50.0;

/// Offset scale once a dominant movement pattern is known.
pub const PATTERN_OFFSET_MULTIPLIER: f32 = 1.5;

/// Extra scale when the last three samples repeat a label.
pub const STREAK_OFFSET_MULTIPLIER: f32 = 1.25;

/// Fewest positions `classify_recent_movement` will classify.
pub const MIN_CLASSIFY_SAMPLES: usize = 3;

/// Seconds between player position samples for movement classification.
pub const POSITION_SAMPLE_INTERVAL: f32 = 0.25;

/// A step is diagonal when its minor axis is at least this fraction of the major one.
const DIAGONAL_RATIO: f32 = 0.5;

/// Live player state handed over every simulated tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerTelemetry {
    /// Current position
    pub position: Vec2,
    /// Per-direction counts for this encounter
    pub dodges: DodgeCounts,
    /// Hits taken this encounter
    pub hits_taken: u32,
    /// Seconds survived this encounter
    pub survival_time: f64,
}

/// Classifies one movement step by its dominant axis.
/// Returns `None` for a step that did not move.
#[must_use]
pub fn classify_step(from: Vec2, to: Vec2) -> Option<MovementPattern> {
    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let major = dx.max(dy);
    if major <= f32::EPSILON {
        return None;
    }

    let minor = dx.min(dy);
    if minor >= major * DIAGONAL_RATIO {
        Some(MovementPattern::Diagonal)
    } else if dx > dy {
        Some(MovementPattern::Horizontal)
    } else {
        Some(MovementPattern::Vertical)
    }
}

/// Owns the in-memory behavior profile and derives predictions from it.
#[derive(Debug)]
pub struct PredictiveAi {
    profile: BehaviorProfile,
    baseline: DodgeCounts,
    baseline_hits: u32,
    samples: Vec<Vec2>,
    sample_timer: f32,
    flush_interval: f32,
    flush_timer: f32,
    flushes: u32,
    flush_failures: u32,
}

impl PredictiveAi {
    /// Wraps a loaded profile. Counts from this session are added on top of it.
    #[must_use]
    pub fn new(profile: BehaviorProfile, flush_interval: f32) -> Self {
        Self {
            baseline: profile.dodges,
            baseline_hits: profile.hits_taken,
            profile,
            samples: Vec::with_capacity(MOVEMENT_HISTORY_LIMIT),
            sample_timer: 0.0,
            flush_interval: flush_interval.max(0.0),
            flush_timer: 0.0,
            flushes: 0,
            flush_failures: 0,
        }
    }

    /// Read-only view of the profile.
    #[must_use]
    pub fn profile(&self) -> &BehaviorProfile {
        &self.profile
    }

    /// Successful flushes so far.
    #[must_use]
    pub fn flushes(&self) -> u32 {
        self.flushes
    }

    /// Failed flushes so far.
    #[must_use]
    pub fn flush_failures(&self) -> u32 {
        self.flush_failures
    }

    /// Positions sampled since the last analysis, oldest first.
    #[must_use]
    pub fn pending_samples(&self) -> &[Vec2] {
        &self.samples
    }

    /// Ingests telemetry and advances the sampling and flush accumulators by
    /// `elapsed` seconds. The position is sampled every
    /// [`POSITION_SAMPLE_INTERVAL`]; the profile goes to `sink` each time the
    /// flush interval passes, with the overshoot carried into the next one.
    pub fn observe(
        &mut self,
        telemetry: &PlayerTelemetry,
        elapsed: f32,
        sink: &mut dyn ProfileSink,
    ) {
        let mut session = self.baseline;
        session.left += telemetry.dodges.left;
        session.right += telemetry.dodges.right;
        session.up += telemetry.dodges.up;
        session.down += telemetry.dodges.down;
        self.profile.dodges.absorb(&session);

        self.profile.hits_taken = self
            .profile
            .hits_taken
            .max(self.baseline_hits.saturating_add(telemetry.hits_taken));
        self.profile.survival_time = telemetry.survival_time;
        self.profile.preferred_direction = self
            .profile
            .dodges
            .dominant(self.profile.preferred_direction);

        let elapsed = elapsed.max(0.0);
        self.sample_timer += elapsed;
        if self.sample_timer >= POSITION_SAMPLE_INTERVAL {
            self.sample_timer -= POSITION_SAMPLE_INTERVAL;
            if self.samples.len() == MOVEMENT_HISTORY_LIMIT {
                self.samples.remove(0);
            }
            self.samples.push(telemetry.position);
        }

        self.flush_timer += elapsed;
        if self.flush_interval > 0.0 && self.flush_timer >= self.flush_interval {
            self.flush_timer %= self.flush_interval;
            self.flush(sink);
        }
    }

    /// Classifies the positions sampled since the last call and starts a
    /// fresh sample window.
    pub fn analyze_samples(&mut self) -> Option<MovementPattern> {
        let samples = std::mem::take(&mut self.samples);
        let pattern = self.classify_recent_movement(&samples);
        self.samples = samples;
        self.samples.clear();
        pattern
    }

    /// Drops pending samples, e.g. when the player is moved between phases.
    pub fn clear_samples(&mut self) {
        self.samples.clear();
        self.sample_timer = 0.0;
    }

    /// Hands the profile to `sink`. Failures are logged and swallowed.
    pub fn flush(&mut self, sink: &mut dyn ProfileSink) {
        match sink.persist(&self.profile) {
            Ok(()) => {
                self.flushes += 1;
                debug!("Behavior profile flushed ({} total)", self.flushes);
            },
            Err(e) => {
                self.flush_failures += 1;
                warn!("Behavior profile flush failed: {e}");
            },
        }
    }

    /// Classifies each consecutive pair of `positions` and records the
    /// labels. Fewer than three positions are ignored; steps that did not
    /// move are skipped. Returns the last label recorded.
    pub fn classify_recent_movement(&mut self, positions: &[Vec2]) -> Option<MovementPattern> {
        if positions.len() < MIN_CLASSIFY_SAMPLES {
            return None;
        }

        let mut last = None;
        for pair in positions.windows(2) {
            if let Some(pattern) = classify_step(pair[0], pair[1]) {
                self.profile.record_movement(pattern);
                last = Some(pattern);
            }
        }
        last
    }

    /// Where the player is expected to be. Pure: the same profile and
    /// position always give the same point.
    #[must_use]
    pub fn predict_target(&self, current: Vec2) -> Vec2 {
        let pattern = self.profile.dominant_pattern();

        let mut offset = BASE_PREDICTION_OFFSET;
        if pattern.is_some() {
            offset *= PATTERN_OFFSET_MULTIPLIER;
            if self.profile.has_recent_streak() {
                offset *= STREAK_OFFSET_MULTIPLIER;
            }
        }

        if let Some(direction) = self.profile.preferred_direction {
            return current + direction.unit_vector().scale(offset);
        }

        match pattern {
            Some(MovementPattern::Horizontal) => current + Vec2::new(offset, 0.0),
            Some(MovementPattern::Vertical) => current + Vec2::new(0.0, offset),
            Some(MovementPattern::Diagonal) => {
                let step = offset / std::f32::consts::SQRT_2;
                current + Vec2::new(step, step)
            },
            None => current,
        }
    }
}

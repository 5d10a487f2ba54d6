//! Persisted record of a player's movement tendencies.

use std::collections::{BTreeMap, VecDeque};

use selva_common::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of classified movement samples kept in the rolling history.
pub const MOVEMENT_HISTORY_LIMIT: usize = 10;

/// Cardinal movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// -x
    Left,
    /// +x
    Right,
    /// -y
    Up,
    /// +y
    Down,
}

impl Direction {
    /// All directions in storage order.
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Up, Self::Down];

    /// Storage label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// Parses a storage label. `"none"` and unknown labels yield `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    /// Unit vector in screen space.
    #[must_use]
    pub fn unit_vector(self) -> Vec2 {
        match self {
            Self::Left => Vec2::LEFT,
            Self::Right => Vec2::RIGHT,
            Self::Up => Vec2::UP,
            Self::Down => Vec2::DOWN,
        }
    }
}

/// Axis classification of a movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementPattern {
    /// Mostly along x
    Horizontal,
    /// Mostly along y
    Vertical,
    /// Both axes comparable
    Diagonal,
}

impl MovementPattern {
    /// All labels.
    pub const ALL: [Self; 3] = [Self::Horizontal, Self::Vertical, Self::Diagonal];

    /// Storage label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::Diagonal => "diagonal",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "horizontal" => Some(Self::Horizontal),
            "vertical" => Some(Self::Vertical),
            "diagonal" => Some(Self::Diagonal),
            _ => None,
        }
    }
}

/// Cumulative dodge count per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DodgeCounts {
    /// Dodges to the left
    pub left: u64,
    /// Dodges to the right
    pub right: u64,
    /// Dodges upward
    pub up: u64,
    /// Dodges downward
    pub down: u64,
}

impl DodgeCounts {
    /// Count for one direction.
    #[must_use]
    pub fn get(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }

    fn slot(&mut self, direction: Direction) -> &mut u64 {
        match direction {
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        }
    }

    /// Adds one dodge.
    pub fn increment(&mut self, direction: Direction) {
        *self.slot(direction) += 1;
    }

    /// Raises each count to at least the matching count in `other`.
    /// Counts never decrease.
    pub fn absorb(&mut self, other: &DodgeCounts) {
        for direction in Direction::ALL {
            let slot = self.slot(direction);
            *slot = (*slot).max(other.get(direction));
        }
    }

    /// Sum over all directions.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.left + self.right + self.up + self.down
    }

    /// The direction with the strictly largest count. Ties and an all-zero
    /// tally return `previous`.
    #[must_use]
    pub fn dominant(&self, previous: Option<Direction>) -> Option<Direction> {
        let best = Direction::ALL
            .iter()
            .map(|d| self.get(*d))
            .max()
            .unwrap_or(0);
        if best == 0 {
            return previous;
        }

        let mut leaders = Direction::ALL.iter().filter(|d| self.get(**d) == best);
        match (leaders.next(), leaders.next()) {
            (Some(direction), None) => Some(*direction),
            _ => previous,
        }
    }

    fn from_value_lossy(value: &Value) -> Self {
        let mut counts = Self::default();
        if let Some(map) = value.as_object() {
            for direction in Direction::ALL {
                if let Some(count) = map.get(direction.label()).and_then(Value::as_u64) {
                    *counts.slot(direction) = count;
                }
            }
        }
        counts
    }
}

mod direction_label {
    use super::Direction;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Direction>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.map_or("none", Direction::label))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Direction>, D::Error> {
        let label = String::deserialize(d)?;
        Ok(Direction::from_label(&label))
    }
}

/// A player's learned movement tendencies.
///
/// Only the predictive model mutates a live profile; everything else reads it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BehaviorProfile {
    /// Cumulative per-direction dodge counts
    pub dodges: DodgeCounts,
    /// Cumulative hits taken
    pub hits_taken: u32,
    /// Last known survival time in seconds
    pub survival_time: f64,
    /// Direction with the strictly largest dodge count
    #[serde(with = "direction_label")]
    pub preferred_direction: Option<Direction>,
    /// Most recent classified movement samples, oldest first
    pub movement_history: VecDeque<MovementPattern>,
    /// How often each movement pattern was observed
    pub movement_patterns: BTreeMap<MovementPattern, u64>,
}

impl BehaviorProfile {
    /// Appends a classified sample to the bounded history and the frequency table.
    pub fn record_movement(&mut self, pattern: MovementPattern) {
        self.movement_history.push_back(pattern);
        while self.movement_history.len() > MOVEMENT_HISTORY_LIMIT {
            self.movement_history.pop_front();
        }
        *self.movement_patterns.entry(pattern).or_insert(0) += 1;
    }

    /// Most common label in the recent history. Ties go to whichever tied
    /// label was seen most recently.
    #[must_use]
    pub fn dominant_pattern(&self) -> Option<MovementPattern> {
        let mut best: Option<(MovementPattern, usize, usize)> = None;
        for pattern in MovementPattern::ALL {
            let count = self
                .movement_history
                .iter()
                .filter(|p| **p == pattern)
                .count();
            if count == 0 {
                continue;
            }
            let last_seen = self
                .movement_history
                .iter()
                .rposition(|p| *p == pattern)
                .unwrap_or(0);
            let better = match best {
                None => true,
                Some((_, best_count, best_seen)) => {
                    count > best_count || (count == best_count && last_seen > best_seen)
                },
            };
            if better {
                best = Some((pattern, count, last_seen));
            }
        }
        best.map(|(pattern, _, _)| pattern)
    }

    /// True when the last three samples hold at least two of one label.
    #[must_use]
    pub fn has_recent_streak(&self) -> bool {
        let len = self.movement_history.len();
        if len < 3 {
            return false;
        }
        let recent: Vec<MovementPattern> =
            self.movement_history.iter().skip(len - 3).copied().collect();
        MovementPattern::ALL
            .iter()
            .any(|pattern| recent.iter().filter(|p| *p == pattern).count() >= 2)
    }

    /// Builds a profile from a loosely shaped JSON value. Fields that are
    /// missing or have the wrong shape fall back to their defaults; unknown
    /// movement labels are dropped.
    #[must_use]
    pub fn from_value_lossy(value: &Value) -> Self {
        let mut profile = Self::default();
        let Some(map) = value.as_object() else {
            return profile;
        };

        if let Some(dodges) = map.get("dodges") {
            profile.dodges = DodgeCounts::from_value_lossy(dodges);
        }
        if let Some(hits) = map
            .get("hits_taken")
            .and_then(Value::as_u64)
            .and_then(|h| u32::try_from(h).ok())
        {
            profile.hits_taken = hits;
        }
        if let Some(time) = map
            .get("survival_time")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite() && *t >= 0.0)
        {
            profile.survival_time = time;
        }
        profile.preferred_direction = map
            .get("preferred_direction")
            .and_then(Value::as_str)
            .and_then(Direction::from_label);

        if let Some(history) = map.get("movement_history").and_then(Value::as_array) {
            let labels: Vec<MovementPattern> = history
                .iter()
                .filter_map(Value::as_str)
                .filter_map(MovementPattern::from_label)
                .collect();
            let skip = labels.len().saturating_sub(MOVEMENT_HISTORY_LIMIT);
            profile.movement_history = labels.into_iter().skip(skip).collect();
        }
        if let Some(patterns) = map.get("movement_patterns").and_then(Value::as_object) {
            profile.movement_patterns = patterns
                .iter()
                .filter_map(|(label, count)| {
                    Some((MovementPattern::from_label(label)?, count.as_u64()?))
                })
                .collect();
        }

        profile
    }
}

//! The five household phases and the day-range schedule that selects them.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// One of the five ordered behavioral eras the whole household moves through.
///
/// The derive order is the progression order; comparisons use it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Chaos,
    Discovery,
    Integration,
    Balanced,
    Thriving,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Chaos,
        Phase::Discovery,
        Phase::Integration,
        Phase::Balanced,
        Phase::Thriving,
    ];

    /// Zero-based position in the progression.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Phase> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Chaos => "chaos",
            Phase::Discovery => "discovery",
            Phase::Integration => "integration",
            Phase::Balanced => "balanced",
            Phase::Thriving => "thriving",
        }
    }

    /// Bonus added to a member's base responsibility when drawing habit
    /// completion.
    pub fn habit_bonus(self) -> f64 {
        match self {
            Phase::Chaos => 0.0,
            Phase::Discovery => 0.1,
            Phase::Integration => 0.2,
            Phase::Balanced => 0.3,
            Phase::Thriving => 0.4,
        }
    }

    /// Scale applied to cross-cutting document uploads.
    pub fn activity_scale(self) -> f64 {
        match self {
            Phase::Chaos => 0.6,
            Phase::Discovery => 0.8,
            Phase::Integration => 1.0,
            Phase::Balanced => 1.1,
            Phase::Thriving => 1.2,
        }
    }

    /// Family meetings only start once the household has left the first phase.
    pub fn allows_meetings(self) -> bool {
        self > Phase::Chaos
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chaos" => Ok(Phase::Chaos),
            "discovery" => Ok(Phase::Discovery),
            "integration" => Ok(Phase::Integration),
            "balanced" => Ok(Phase::Balanced),
            "thriving" => Ok(Phase::Thriving),
            other => Err(format!("unknown phase '{other}'")),
        }
    }
}

/// Habit completion probability for a member with the given base
/// responsibility during `phase`.
pub fn habit_completion_probability(base_responsibility: f64, phase: Phase) -> f64 {
    (base_responsibility + phase.habit_bonus()).min(0.95)
}

/// First `days_elapsed` value of each phase, in phase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct PhaseSchedule {
    starts: [u32; 5],
}

impl PhaseSchedule {
    pub const DEFAULT_STARTS: [u32; 5] = [0, 60, 90, 180, 270];

    pub fn new(starts: [u32; 5]) -> Result<Self, SimulationError> {
        if starts[0] != 0 {
            return Err(SimulationError::InvalidSchedule(format!(
                "first phase must start at day 0, got {}",
                starts[0]
            )));
        }
        if starts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimulationError::InvalidSchedule(format!(
                "phase starts must be strictly increasing: {starts:?}"
            )));
        }
        Ok(Self { starts })
    }

    pub fn starts(&self) -> [u32; 5] {
        self.starts
    }

    pub fn start_of(&self, phase: Phase) -> u32 {
        self.starts[phase.index()]
    }

    /// Phase implied by the number of fully elapsed days.
    pub fn phase_for(&self, days_elapsed: u32) -> Phase {
        Phase::ALL
            .iter()
            .rev()
            .copied()
            .find(|p| days_elapsed >= self.start_of(*p))
            .unwrap_or(Phase::Chaos)
    }

    /// Half-open `days_elapsed` range covered by `phase` in a run of
    /// `total_days`. Empty when the run ends before the phase starts.
    pub fn range(&self, phase: Phase, total_days: u32) -> std::ops::Range<u32> {
        let start = self.start_of(phase).min(total_days);
        let end = Phase::from_index(phase.index() + 1)
            .map(|next| self.start_of(next))
            .unwrap_or(total_days)
            .min(total_days);
        start..end.max(start)
    }
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self {
            starts: Self::DEFAULT_STARTS,
        }
    }
}

impl TryFrom<Vec<u32>> for PhaseSchedule {
    type Error = SimulationError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        let starts: [u32; 5] = value.try_into().map_err(|v: Vec<u32>| {
            SimulationError::InvalidSchedule(format!("expected 5 phase starts, got {}", v.len()))
        })?;
        Self::new(starts)
    }
}

impl From<PhaseSchedule> for Vec<u32> {
    fn from(schedule: PhaseSchedule) -> Self {
        schedule.starts.to_vec()
    }
}

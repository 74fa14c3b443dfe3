//! Simulated calendar time, independent of the wall clock.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::sim::phase::Phase;

/// Minutes of overnight rest between the evening block and the next morning.
pub const OVERNIGHT_MINUTES: u32 = 8 * 60;

/// The four fixed blocks a simulated day is divided into, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBlock {
    Morning,
    Day,
    Afternoon,
    Evening,
}

impl TimeBlock {
    pub const ALL: [TimeBlock; 4] = [
        TimeBlock::Morning,
        TimeBlock::Day,
        TimeBlock::Afternoon,
        TimeBlock::Evening,
    ];

    pub fn start_hour(self) -> u32 {
        match self {
            TimeBlock::Morning => 6,
            TimeBlock::Day => 9,
            TimeBlock::Afternoon => 15,
            TimeBlock::Evening => 18,
        }
    }

    pub fn duration_minutes(self) -> u32 {
        match self {
            TimeBlock::Morning => 180,
            TimeBlock::Day => 360,
            TimeBlock::Afternoon => 180,
            TimeBlock::Evening => 240,
        }
    }

    pub fn hours(self) -> f64 {
        f64::from(self.duration_minutes()) / 60.0
    }

    /// Whether a wall-clock hour on a 24h dial falls inside this block.
    pub fn contains_hour(self, hour: u32) -> bool {
        let start = self.start_hour();
        hour >= start && hour < start + self.duration_minutes() / 60
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeBlock::Morning => "morning",
            TimeBlock::Day => "day",
            TimeBlock::Afternoon => "afternoon",
            TimeBlock::Evening => "evening",
        }
    }
}

/// A phase and the day number on which the household entered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub phase: Phase,
    pub day: u32,
}

/// The single monotonically increasing simulated date for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationClock {
    start_date: NaiveDate,
    date: NaiveDate,
    days_elapsed: u32,
    phase: Phase,
    history: Vec<PhaseEntry>,
}

impl SimulationClock {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            date: start_date,
            days_elapsed: 0,
            phase: Phase::Chaos,
            history: vec![PhaseEntry {
                phase: Phase::Chaos,
                day: 1,
            }],
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn days_elapsed(&self) -> u32 {
        self.days_elapsed
    }

    /// 1-based number of the day currently being simulated.
    pub fn day_number(&self) -> u32 {
        self.days_elapsed + 1
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_history(&self) -> &[PhaseEntry] {
        &self.history
    }

    /// Move to `phase` if it lies strictly after the current one.
    ///
    /// Returns the phase that was left, or `None` when nothing changed.
    /// Earlier or equal phases are ignored so the clock can never regress.
    pub fn enter_phase(&mut self, phase: Phase) -> Option<Phase> {
        if phase <= self.phase {
            return None;
        }
        let previous = self.phase;
        self.phase = phase;
        self.history.push(PhaseEntry {
            phase,
            day: self.day_number(),
        });
        Some(previous)
    }

    /// Simulated timestamp `offset_minutes` into `block` of the current day.
    pub fn timestamp(&self, block: TimeBlock, offset_minutes: u32) -> NaiveDateTime {
        let offset = offset_minutes.min(block.duration_minutes().saturating_sub(1));
        let minutes = block.start_hour() * 60 + offset;
        let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN);
        self.date.and_time(time)
    }

    /// Timestamp at an explicit hour and minute of the current day.
    pub fn at(&self, hour: u32, minute: u32) -> NaiveDateTime {
        let time =
            NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0).unwrap_or(NaiveTime::MIN);
        self.date.and_time(time)
    }

    /// Advance to the next calendar day.
    pub fn advance_day(&mut self) {
        self.date = self.date.succ_opt().unwrap_or(self.date);
        self.days_elapsed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> SimulationClock {
        SimulationClock::new(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
    }

    #[test]
    fn blocks_cover_sixteen_waking_hours() {
        let total: u32 = TimeBlock::ALL.iter().map(|b| b.duration_minutes()).sum();
        assert_eq!(total + OVERNIGHT_MINUTES, 24 * 60);
        for pair in TimeBlock::ALL.windows(2) {
            assert_eq!(
                pair[0].start_hour() + pair[0].duration_minutes() / 60,
                pair[1].start_hour()
            );
        }
    }

    #[test]
    fn advance_day_moves_date_and_counter() {
        let mut c = clock();
        assert_eq!(c.day_number(), 1);
        assert_eq!(c.weekday(), Weekday::Mon);
        c.advance_day();
        assert_eq!(c.days_elapsed(), 1);
        assert_eq!(c.day_number(), 2);
        assert_eq!(c.weekday(), Weekday::Tue);
    }

    #[test]
    fn phase_never_regresses() {
        let mut c = clock();
        assert_eq!(c.enter_phase(Phase::Discovery), Some(Phase::Chaos));
        assert_eq!(c.enter_phase(Phase::Chaos), None);
        assert_eq!(c.enter_phase(Phase::Discovery), None);
        assert_eq!(c.phase(), Phase::Discovery);
        assert_eq!(c.phase_history().len(), 2);
    }

    #[test]
    fn timestamps_stay_inside_block() {
        let c = clock();
        let ts = c.timestamp(TimeBlock::Morning, 10_000);
        assert_eq!(ts.time(), NaiveTime::from_hms_opt(8, 59, 0).unwrap());
        let ts = c.timestamp(TimeBlock::Evening, 30);
        assert_eq!(ts.time(), NaiveTime::from_hms_opt(18, 30, 0).unwrap());
    }

    #[test]
    fn block_hour_membership() {
        assert!(TimeBlock::Afternoon.contains_hour(16));
        assert!(!TimeBlock::Afternoon.contains_hour(18));
        assert!(TimeBlock::Evening.contains_hour(21));
    }
}

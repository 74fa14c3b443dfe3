//! Probability and content tables for routine activity generation.

use rand::Rng;

use crate::agent::{Mood, Persona, Role};
use crate::sim::clock::TimeBlock;
use crate::sim::phase::Phase;
use crate::util::unit;

/// Minutes across the four waking blocks.
const WAKING_MINUTES: f64 = 960.0;

/// Actions offered to an adult in the evening.
pub const ADULT_EVENING_ACTIONS: [&str; 5] = [
    "create_task",
    "schedule_event",
    "check_calendar",
    "help_with_homework",
    "rest",
];

/// Actions offered to a child on weekend afternoons.
pub const CHILD_WEEKEND_ACTIONS: [&str; 5] = [
    "play_outside",
    "read_book",
    "help_with_chores",
    "screen_time",
    "do_nothing",
];

pub const CREATE_TASK: &str = "create_task";
pub const SCHEDULE_EVENT: &str = "schedule_event";

const ADULT_CALENDAR_TITLES: [&str; 8] = [
    "Dentist appointment",
    "Parent-teacher conference",
    "Grocery pickup",
    "Car service",
    "Date night",
    "Work dinner",
    "Pay bills",
    "Birthday party drop-off",
];

const CHILD_CALENDAR_TITLES: [&str; 5] = [
    "Playdate",
    "Homework club",
    "Movie night",
    "Library due date",
    "Sleepover",
];

const DOCUMENT_TITLES: [&str; 8] = [
    "School calendar PDF",
    "Insurance card scan",
    "Vaccination record",
    "Camp registration form",
    "Utility bill",
    "Soccer schedule",
    "Report card",
    "Recipe for the potluck",
];

/// Fraction of the waking day a block represents.
pub fn block_share(block: TimeBlock) -> f64 {
    f64::from(block.duration_minutes()) / WAKING_MINUTES
}

/// Routine task volume on a weekend relative to a weekday. School runs and
/// work errands drop out, children's chores more so than adults' lists.
fn weekend_task_factor(role: Role) -> f64 {
    match role {
        Role::Adult => 0.7,
        Role::Child => 0.5,
    }
}

/// Calendar volume on a weekend relative to a weekday.
fn weekend_calendar_factor(role: Role) -> f64 {
    match role {
        Role::Adult => 1.2,
        Role::Child => 1.5,
    }
}

/// Chance that a member creates a routine task during `block`.
pub fn task_probability(
    member: &dyn Persona,
    block: TimeBlock,
    phase: Phase,
    weekend: bool,
) -> f64 {
    let day = if weekend {
        weekend_task_factor(member.agent().role())
    } else {
        1.0
    };
    unit(
        member.agent().behavior().task_creation_rate
            * block_share(block)
            * phase.activity_scale()
            * day,
    )
}

/// Chance that a member puts something on the calendar during `block`.
pub fn calendar_probability(
    member: &dyn Persona,
    block: TimeBlock,
    phase: Phase,
    weekend: bool,
) -> f64 {
    let day = if weekend {
        weekend_calendar_factor(member.agent().role())
    } else {
        1.0
    };
    unit(
        member.agent().behavior().calendar_check_cadence
            * block_share(block)
            * phase.activity_scale()
            * day,
    )
}

/// Chance that an adult uploads a document on a given day.
pub fn document_probability(member: &dyn Persona, phase: Phase) -> f64 {
    unit(member.agent().behavior().document_upload_likelihood * 0.6 * phase.activity_scale())
}

/// Chance that the overloaded adult hands a task over during the day block.
pub fn suggestion_probability(phase: Phase) -> f64 {
    unit(0.3 + 0.1 * phase.index() as f64)
}

pub fn calendar_title<R: Rng>(role: Role, rng: &mut R) -> &'static str {
    let titles: &[&str] = match role {
        Role::Adult => &ADULT_CALENDAR_TITLES,
        Role::Child => &CHILD_CALENDAR_TITLES,
    };
    titles[rng.gen_range(0..titles.len())]
}

pub fn document_title<R: Rng>(rng: &mut R) -> &'static str {
    DOCUMENT_TITLES[rng.gen_range(0..DOCUMENT_TITLES.len())]
}

/// Agenda for a family meeting during `phase`.
pub fn meeting_agenda(phase: Phase) -> Vec<String> {
    let mut agenda = vec![
        "Review the coming two weeks".to_string(),
        "Chores check-in".to_string(),
    ];
    let focus = match phase {
        Phase::Chaos => "List everything that fell through the cracks",
        Phase::Discovery => "Share what each of us noticed",
        Phase::Integration => "Rebalance recurring tasks",
        Phase::Balanced => "Celebrate what is working",
        Phase::Thriving => "Plan something fun together",
    };
    agenda.push(focus.to_string());
    agenda
}

/// One-line summary of a discovery interview.
pub fn interview_summary(member: &dyn Persona) -> String {
    let state = member.agent().state();
    let feeling = match state.mood {
        Mood::Stressed => "feels stretched thin",
        Mood::Neutral => "feels things are manageable",
        Mood::Happy => "feels relaxed",
    };
    format!(
        "{} ({}) {} with mental load {:.2}",
        member.agent().name(),
        member.archetype(),
        feeling,
        state.mental_load
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Household, IdentityMap, MemberKey};

    fn household() -> Household {
        Household::from_identities(&IdentityMap::generated(7), 7).unwrap()
    }

    #[test]
    fn block_shares_cover_the_waking_day() {
        let total: f64 = TimeBlock::ALL.iter().map(|b| block_share(*b)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overloaded_adult_creates_more_tasks() {
        let household = household();
        let busy = household.member(MemberKey::OverloadedAdult);
        let relaxed = household.member(MemberKey::UnderAwareAdult);
        for block in TimeBlock::ALL {
            assert!(
                task_probability(busy, block, Phase::Chaos, false)
                    > task_probability(relaxed, block, Phase::Chaos, false)
            );
        }
    }

    #[test]
    fn weekends_trade_tasks_for_calendar_entries() {
        let household = household();
        for key in [MemberKey::OverloadedAdult, MemberKey::YoungestChild] {
            let member = household.member(key);
            for block in TimeBlock::ALL {
                let weekday = task_probability(member, block, Phase::Integration, false);
                let weekend = task_probability(member, block, Phase::Integration, true);
                assert!(weekend < weekday, "{key:?} {block:?}");

                let weekday = calendar_probability(member, block, Phase::Integration, false);
                let weekend = calendar_probability(member, block, Phase::Integration, true);
                assert!(weekend > weekday, "{key:?} {block:?}");
            }
        }
    }

    #[test]
    fn suggestions_grow_with_phase() {
        let probabilities: Vec<f64> = Phase::ALL
            .iter()
            .map(|p| suggestion_probability(*p))
            .collect();
        assert!(probabilities.windows(2).all(|w| w[0] < w[1]));
        assert!((probabilities[0] - 0.3).abs() < 1e-9);
        assert!((probabilities[4] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn meetings_have_a_phase_specific_item() {
        assert_eq!(meeting_agenda(Phase::Discovery).len(), 3);
        assert_ne!(meeting_agenda(Phase::Discovery), meeting_agenda(Phase::Thriving));
    }

    #[test]
    fn interview_mentions_the_member() {
        let household = household();
        let summary = interview_summary(household.member(MemberKey::OverloadedAdult));
        assert!(summary.contains("overloaded_adult"));
        assert!(summary.contains("0.87"));
    }
}

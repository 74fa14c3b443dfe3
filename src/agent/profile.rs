//! Personality, behaviour and state vectors, and the declarative effects that
//! phase transitions apply to them.

use serde::{Deserialize, Serialize};

use crate::util::unit;

/// Stable character traits. Only phase transitions change them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub helpfulness: f64,
    pub awareness: f64,
    pub follow_through: f64,
    pub initiative: f64,
    pub detail_orientation: f64,
    /// Children only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curiosity: Option<f64>,
    /// Children only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub independence: Option<f64>,
}

impl Personality {
    pub fn uniform(value: f64) -> Self {
        let v = unit(value);
        Self {
            helpfulness: v,
            awareness: v,
            follow_through: v,
            initiative: v,
            detail_orientation: v,
            curiosity: None,
            independence: None,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        let mut values = vec![
            self.helpfulness,
            self.awareness,
            self.follow_through,
            self.initiative,
            self.detail_orientation,
        ];
        values.extend(self.curiosity);
        values.extend(self.independence);
        values
    }
}

/// Scalars that drive event-generation probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPattern {
    pub task_creation_rate: f64,
    pub calendar_check_cadence: f64,
    pub survey_completion_rate: f64,
    pub document_upload_likelihood: f64,
    pub response_verbosity: f64,
}

impl BehaviorPattern {
    pub fn uniform(value: f64) -> Self {
        let v = unit(value);
        Self {
            task_creation_rate: v,
            calendar_check_cadence: v,
            survey_completion_rate: v,
            document_upload_likelihood: v,
            response_verbosity: v,
        }
    }

    pub fn values(&self) -> [f64; 5] {
        [
            self.task_creation_rate,
            self.calendar_check_cadence,
            self.survey_completion_rate,
            self.document_upload_likelihood,
            self.response_verbosity,
        ]
    }
}

/// Mood, derived from stress on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Stressed,
    Neutral,
    Happy,
}

impl Mood {
    pub fn from_stress(stress: f64) -> Self {
        if stress > 0.7 {
            Mood::Stressed
        } else if stress < 0.3 {
            Mood::Happy
        } else {
            Mood::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Stressed => "stressed",
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
        }
    }
}

/// Mutable per-agent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub mood: Mood,
    pub energy: f64,
    pub stress: f64,
    pub mental_load: f64,
    pub last_action: Option<String>,
}

impl AgentState {
    /// Fresh morning state for a member carrying `mental_load`.
    pub fn with_mental_load(mental_load: f64) -> Self {
        let mental_load = unit(mental_load);
        let stress = unit(0.7 * mental_load);
        Self {
            mood: Mood::from_stress(stress),
            energy: 1.0,
            stress,
            mental_load,
            last_action: None,
        }
    }

    pub fn values(&self) -> [f64; 3] {
        [self.energy, self.stress, self.mental_load]
    }
}

/// Every scalar a phase effect can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Helpfulness,
    Awareness,
    FollowThrough,
    Initiative,
    DetailOrientation,
    Curiosity,
    Independence,
    TaskCreationRate,
    CalendarCheckCadence,
    SurveyCompletionRate,
    DocumentUploadLikelihood,
    ResponseVerbosity,
    Energy,
    Stress,
    MentalLoad,
}

/// Absolute or relative change to a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    Set(f64),
    Delta(f64),
}

impl Adjustment {
    /// Resulting value, clamped to the unit interval.
    pub fn apply_to(self, current: f64) -> f64 {
        match self {
            Adjustment::Set(value) => unit(value),
            Adjustment::Delta(delta) => unit(current + delta),
        }
    }
}

/// One row of a phase-effect table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub field: Field,
    pub adjustment: Adjustment,
}

impl Effect {
    pub const fn set(field: Field, value: f64) -> Self {
        Self {
            field,
            adjustment: Adjustment::Set(value),
        }
    }

    pub const fn delta(field: Field, delta: f64) -> Self {
        Self {
            field,
            adjustment: Adjustment::Delta(delta),
        }
    }
}

/// Apply an effect to the three vectors of one agent.
///
/// Optional child traits are created by `Set` and left alone by `Delta` when
/// absent. Returns the field's new value.
pub(crate) fn apply_effect(
    effect: Effect,
    personality: &mut Personality,
    behavior: &mut BehaviorPattern,
    state: &mut AgentState,
) -> f64 {
    fn optional(slot: &mut Option<f64>, adjustment: Adjustment) -> f64 {
        match (*slot, adjustment) {
            (Some(current), adj) => {
                let next = adj.apply_to(current);
                *slot = Some(next);
                next
            }
            (None, Adjustment::Set(value)) => {
                let next = unit(value);
                *slot = Some(next);
                next
            }
            (None, Adjustment::Delta(_)) => 0.0,
        }
    }

    let slot = match effect.field {
        Field::Helpfulness => &mut personality.helpfulness,
        Field::Awareness => &mut personality.awareness,
        Field::FollowThrough => &mut personality.follow_through,
        Field::Initiative => &mut personality.initiative,
        Field::DetailOrientation => &mut personality.detail_orientation,
        Field::Curiosity => return optional(&mut personality.curiosity, effect.adjustment),
        Field::Independence => return optional(&mut personality.independence, effect.adjustment),
        Field::TaskCreationRate => &mut behavior.task_creation_rate,
        Field::CalendarCheckCadence => &mut behavior.calendar_check_cadence,
        Field::SurveyCompletionRate => &mut behavior.survey_completion_rate,
        Field::DocumentUploadLikelihood => &mut behavior.document_upload_likelihood,
        Field::ResponseVerbosity => &mut behavior.response_verbosity,
        Field::Energy => &mut state.energy,
        Field::Stress => &mut state.stress,
        Field::MentalLoad => &mut state.mental_load,
    };
    let next = effect.adjustment.apply_to(*slot);
    *slot = next;
    if effect.field == Field::Stress {
        state.mood = Mood::from_stress(next);
    }
    next
}

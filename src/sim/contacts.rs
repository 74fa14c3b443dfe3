//! Fixed roster of people outside the household who send messages in.

use rand::Rng;

use crate::sim::events::MessageChannel;

/// Chance that a given contact writes on a given day.
pub const DAILY_MESSAGE_PROBABILITY: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalContact {
    pub name: &'static str,
    pub organization: &'static str,
    pub channel: MessageChannel,
    pub subjects: &'static [&'static str],
}

pub const CONTACT_ROSTER: [ExternalContact; 5] = [
    ExternalContact {
        name: "Front Office",
        organization: "Maple Grove Elementary",
        channel: MessageChannel::Email,
        subjects: &[
            "Picture day reminder",
            "Early dismissal on Friday",
            "Field trip permission slip",
            "Lunch account balance low",
        ],
    },
    ExternalContact {
        name: "Dr. Patel's Office",
        organization: "Riverside Pediatrics",
        channel: MessageChannel::Sms,
        subjects: &[
            "Appointment reminder",
            "Annual checkup due",
            "Vaccination records ready",
        ],
    },
    ExternalContact {
        name: "Coach Miller",
        organization: "Eastside Youth Soccer",
        channel: MessageChannel::Email,
        subjects: &[
            "Practice moved to Thursday",
            "Tournament schedule",
            "Snack rotation sign-up",
        ],
    },
    ExternalContact {
        name: "Grandma Rose",
        organization: "Family",
        channel: MessageChannel::Sms,
        subjects: &[
            "Sunday dinner?",
            "Photos from the weekend",
            "Can the kids stay over?",
        ],
    },
    ExternalContact {
        name: "Ms. Alvarez",
        organization: "Harmony Piano Studio",
        channel: MessageChannel::Email,
        subjects: &["Recital dates", "Lesson rescheduling", "Tuition invoice"],
    },
];

/// Remembers which contacts have already been introduced.
#[derive(Debug, Clone, Default)]
pub struct ContactBook {
    introduced: [bool; CONTACT_ROSTER.len()],
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark contact `index` as known. True the first time only.
    pub fn introduce(&mut self, index: usize) -> bool {
        match self.introduced.get_mut(index) {
            Some(seen) if !*seen => {
                *seen = true;
                true
            }
            _ => false,
        }
    }

    pub fn known(&self) -> usize {
        self.introduced.iter().filter(|seen| **seen).count()
    }
}

impl ExternalContact {
    pub fn pick_subject<R: Rng>(&self, rng: &mut R) -> &'static str {
        self.subjects[rng.gen_range(0..self.subjects.len())]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn contacts_are_introduced_once() {
        let mut book = ContactBook::new();
        assert!(book.introduce(2));
        assert!(!book.introduce(2));
        assert!(!book.introduce(99));
        assert_eq!(book.known(), 1);
    }

    #[test]
    fn every_contact_has_subjects() {
        let mut rng = StdRng::seed_from_u64(1);
        for contact in &CONTACT_ROSTER {
            assert!(!contact.subjects.is_empty());
            assert!(contact.subjects.contains(&contact.pick_subject(&mut rng)));
        }
    }
}

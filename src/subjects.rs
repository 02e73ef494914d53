//! Static catalog of the seven CASA CPL theory exam subjects. Exam
//! submissions reference a subject by id; the display name is resolved here
//! and denormalized into weak-point records at creation time.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
}

pub const SUBJECTS: &[Subject] = &[
    Subject {
        id: "CNAV",
        name: "CPL Navigation",
    },
    Subject {
        id: "CMET",
        name: "CPL Meteorology",
    },
    Subject {
        id: "CHUF",
        name: "CPL Human Factors",
    },
    Subject {
        id: "CFPA",
        name: "CPL Flight Planning and Performance",
    },
    Subject {
        id: "CLWA",
        name: "CPL Air Law",
    },
    Subject {
        id: "CADA",
        name: "CPL Aerodynamics",
    },
    Subject {
        id: "CSYA",
        name: "CPL Aircraft General Knowledge",
    },
];

pub fn subject_name(subject_id: &str) -> Option<&'static str> {
    SUBJECTS
        .iter()
        .find(|s| s.id == subject_id)
        .map(|s| s.name)
}

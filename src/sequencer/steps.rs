pub struct StepDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// Investigative steps of the pre-meeting preparation scenario.
pub static PRE_MEETING_STEPS: &[StepDefinition] = &[
    StepDefinition {
        id: "attendees",
        title: "Attendee Research",
        description: "Look up every attendee's role, history and recent activity",
    },
    StepDefinition {
        id: "history",
        title: "Relationship History",
        description: "Collect past meetings, open deals and support tickets",
    },
    StepDefinition {
        id: "news",
        title: "Company News",
        description: "Scan recent announcements and press coverage",
    },
    StepDefinition {
        id: "risks",
        title: "Risk Signals",
        description: "Flag churn indicators and unresolved escalations",
    },
    StepDefinition {
        id: "agenda",
        title: "Agenda Draft",
        description: "Assemble talking points and a proposed agenda",
    },
];

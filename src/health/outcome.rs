use crate::runtime::ContainerRecord;

/// Docker reports removed containers with this name.
const NULL_NAME: &str = "null";
const RESTARTING_STATE: &str = "restarting";

pub const RESTART_SUCCEEDED: &str = "Successfully restarted the container";
pub const RESTART_FAILED: &str = "Failed to restart the container";

/// What the loop does with a container, decided from the listing alone.
/// Rules are checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NoName,
    AlreadyRestarting,
    Restart,
}

impl Decision {
    pub fn for_container(container: &ContainerRecord) -> Self {
        match container.names.first() {
            None => return Decision::NoName,
            Some(name) if name == NULL_NAME => return Decision::NoName,
            Some(_) => {}
        }
        if container.state == RESTARTING_STATE {
            return Decision::AlreadyRestarting;
        }
        Decision::Restart
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    SkippedNoName,
    SkippedAlreadyRestarting,
    Restarted,
    RestartFailed,
}

/// The result of handling one container in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub name: String,
    pub short_id: String,
    /// When the container was handled, already formatted for messages.
    pub timestamp: String,
}

impl Outcome {
    pub fn new(kind: OutcomeKind, container: &ContainerRecord, timestamp: String) -> Self {
        Self {
            kind,
            name: container.display_name().to_string(),
            short_id: container.short_id().to_string(),
            timestamp,
        }
    }

    pub fn is_restart(&self) -> bool {
        matches!(self.kind, OutcomeKind::Restarted | OutcomeKind::RestartFailed)
    }

    /// Value of the `result` metric label. Skips have none.
    pub fn result_label(&self) -> Option<&'static str> {
        match self.kind {
            OutcomeKind::Restarted => Some(RESTART_SUCCEEDED),
            OutcomeKind::RestartFailed => Some(RESTART_FAILED),
            OutcomeKind::SkippedNoName | OutcomeKind::SkippedAlreadyRestarting => None,
        }
    }

    pub fn message(&self) -> String {
        let Self {
            timestamp,
            name,
            short_id,
            ..
        } = self;
        match self.kind {
            OutcomeKind::SkippedNoName => format!(
                "{timestamp} Container name of ({short_id}) is null, which implies container does not exist - don't restart."
            ),
            OutcomeKind::SkippedAlreadyRestarting => format!(
                "{timestamp} Container {name} ({short_id}) found to be restarting - don't restart."
            ),
            OutcomeKind::Restarted => format!(
                "{timestamp} Container {name} ({short_id}) found to be unhealthy. {RESTART_SUCCEEDED}."
            ),
            OutcomeKind::RestartFailed => format!(
                "{timestamp} Container {name} ({short_id}) found to be unhealthy. {RESTART_FAILED}."
            ),
        }
    }
}

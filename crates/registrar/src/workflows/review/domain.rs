use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Staff member acting on an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authoritative application status. Both the numeric dashboard codes and the
/// named representation resolve through this enum. Serializes as snake_case and
/// deserializes from a code, a label or snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    InProgress,
    Approved,
    Rejected,
    Incomplete,
}

impl ApplicationStatus {
    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::InProgress => 2,
            Self::Approved => 3,
            Self::Rejected => 4,
            Self::Incomplete => 5,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Pending),
            2 => Some(Self::InProgress),
            3 => Some(Self::Approved),
            4 => Some(Self::Rejected),
            5 => Some(Self::Incomplete),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Incomplete => "Incomplete",
        }
    }

    /// Parses a persisted status name. Accepts the display label and the
    /// snake_case form.
    pub fn from_name(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        [
            Self::Pending,
            Self::InProgress,
            Self::Approved,
            Self::Rejected,
            Self::Incomplete,
        ]
        .into_iter()
        .find(|status| normalize(status.label()) == normalized)
    }

    /// Approved and Rejected both stop the workflow until staff intervene.
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Stored {
            Code(u8),
            Name(String),
        }

        match Stored::deserialize(deserializer)? {
            Stored::Code(code) => Self::from_code(code).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown application status code {code}"))
            }),
            Stored::Name(name) => Self::from_name(&name).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown application status '{name}'"))
            }),
        }
    }
}

/// The three fixed review steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    DocumentVerification,
    EligibilityCheck,
    FinalReview,
}

impl StepId {
    pub const COUNT: usize = 3;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::DocumentVerification,
            Self::EligibilityCheck,
            Self::FinalReview,
        ]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::DocumentVerification => 0,
            Self::EligibilityCheck => 1,
            Self::FinalReview => 2,
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::DocumentVerification),
            1 => Some(Self::EligibilityCheck),
            2 => Some(Self::FinalReview),
            _ => None,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::DocumentVerification => "document-verification",
            Self::EligibilityCheck => "eligibility-check",
            Self::FinalReview => "final-review",
        }
    }

    /// Label stored in the application's current step column.
    pub const fn label(self) -> &'static str {
        match self {
            Self::DocumentVerification => "Document Verification",
            Self::EligibilityCheck => "Eligibility Check",
            Self::FinalReview => "Final Review",
        }
    }

    pub const fn is_final(self) -> bool {
        matches!(self, Self::FinalReview)
    }

    /// Resolves a persisted label or a kebab-case key.
    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        Self::ordered().into_iter().find(|step| {
            normalize(step.label()) == normalized || normalize(step.key()) == normalized
        })
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for StepId {
    type Err = UnknownStep;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_label(value).ok_or_else(|| UnknownStep(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown review step '{0}'")]
pub struct UnknownStep(pub String);

/// Displayed status of a single review step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl StepStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
        }
    }
}

/// Coarse status shown to students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverallStatus {
    Pending,
    InProgress,
    Approved,
    Rejected,
}

impl OverallStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl From<ApplicationStatus> for OverallStatus {
    fn from(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Rejected => Self::Rejected,
            ApplicationStatus::Approved => Self::Approved,
            ApplicationStatus::InProgress => Self::InProgress,
            ApplicationStatus::Pending | ApplicationStatus::Incomplete => Self::Pending,
        }
    }
}

/// Persisted application row as the external store keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    /// `None` when the store returned a row without a status.
    pub status: Option<ApplicationStatus>,
    pub current_step: String,
    pub submitted_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub review_note: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<ActorId>,
}

impl ApplicationRecord {
    /// Freshly registered application waiting on document verification.
    pub fn submitted(application_id: ApplicationId, submitted_at: DateTime<Utc>) -> Self {
        Self {
            application_id,
            status: Some(ApplicationStatus::Pending),
            current_step: StepId::DocumentVerification.label().to_string(),
            submitted_at,
            last_updated: submitted_at,
            review_note: None,
            reviewed_by: None,
        }
    }

    /// Writes a transition's persisted fields onto this row.
    pub fn apply(&mut self, decision: &DecisionRecord) {
        self.status = Some(decision.status);
        self.current_step = decision.step().label().to_string();
        self.last_updated = decision.last_updated;
        self.reviewed_by = Some(decision.reviewed_by.clone());
        self.review_note = decision.note.clone();
    }
}

/// Persistence request produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub step_index: usize,
    pub last_updated: DateTime<Utc>,
    pub reviewed_by: ActorId,
    pub note: Option<String>,
}

impl DecisionRecord {
    pub fn step(&self) -> StepId {
        StepId::from_index(self.step_index).unwrap_or(StepId::FinalReview)
    }
}

fn normalize(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

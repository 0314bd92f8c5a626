use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One step of the fixed deployment pipeline. Ordering is positional:
/// the index in [`Stage::ALL`] is the only ordering key, and candidates
/// enter the pipeline at [`Stage::first`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PassportReceived,
    Interview,
    Medical,
    PoliceClearance,
    Mofa,
    Taseer,
    Takamul,
    Training,
    Fingerprint,
    Embassy,
    VisaIssued,
    Manpower,
    Flight,
}

impl Stage {
    pub const ALL: [Stage; 13] = [
        Stage::PassportReceived,
        Stage::Interview,
        Stage::Medical,
        Stage::PoliceClearance,
        Stage::Mofa,
        Stage::Taseer,
        Stage::Takamul,
        Stage::Training,
        Stage::Fingerprint,
        Stage::Embassy,
        Stage::VisaIssued,
        Stage::Manpower,
        Stage::Flight,
    ];

    pub fn first() -> Stage {
        Stage::ALL[0]
    }

    pub fn key(self) -> &'static str {
        match self {
            Stage::PassportReceived => "passport_received",
            Stage::Interview => "interview",
            Stage::Medical => "medical",
            Stage::PoliceClearance => "police_clearance",
            Stage::Mofa => "mofa",
            Stage::Taseer => "taseer",
            Stage::Takamul => "takamul",
            Stage::Training => "training",
            Stage::Fingerprint => "fingerprint",
            Stage::Embassy => "embassy",
            Stage::VisaIssued => "visa_issued",
            Stage::Manpower => "manpower",
            Stage::Flight => "flight",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::PassportReceived => "Passport received",
            Stage::Interview => "Interview",
            Stage::Medical => "Medical examination",
            Stage::PoliceClearance => "Police clearance",
            Stage::Mofa => "MOFA attestation",
            Stage::Taseer => "Taseer enrollment",
            Stage::Takamul => "Takamul registration",
            Stage::Training => "Pre-departure training",
            Stage::Fingerprint => "Fingerprinting",
            Stage::Embassy => "Embassy submission",
            Stage::VisaIssued => "Visa issued",
            Stage::Manpower => "Manpower clearance",
            Stage::Flight => "Flight",
        }
    }

    /// Zero-based index in pipeline order.
    pub fn position(self) -> usize {
        match self {
            Stage::PassportReceived => 0,
            Stage::Interview => 1,
            Stage::Medical => 2,
            Stage::PoliceClearance => 3,
            Stage::Mofa => 4,
            Stage::Taseer => 5,
            Stage::Takamul => 6,
            Stage::Training => 7,
            Stage::Fingerprint => 8,
            Stage::Embassy => 9,
            Stage::VisaIssued => 10,
            Stage::Manpower => 11,
            Stage::Flight => 12,
        }
    }

    pub fn next(self) -> Option<Stage> {
        Stage::ALL.get(self.position() + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Completion ratio for display: `(position + 1) / total`.
    pub fn progress(self) -> f64 {
        (self.position() + 1) as f64 / Stage::ALL.len() as f64
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown pipeline stage '{}'", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.key() == value)
            .ok_or_else(|| UnknownStage(value.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub position: usize,
    pub is_terminal: bool,
}

/// The full catalog in pipeline order, for UI consumption.
pub fn catalog() -> Vec<StageInfo> {
    Stage::ALL
        .iter()
        .map(|stage| StageInfo {
            key: stage.key(),
            label: stage.label(),
            position: stage.position(),
            is_terminal: stage.is_terminal(),
        })
        .collect()
}

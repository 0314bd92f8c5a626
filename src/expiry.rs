use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MEDICAL_VALIDITY_DAYS: i64 = 60;
pub const VISA_VALIDITY_DAYS: i64 = 90;

/// Remaining days at or below this mark the window as urgent.
pub const URGENT_WINDOW_DAYS: i64 = 15;

/// Validity window being assessed. Medical and visa windows run from an
/// issuance date; the passport window is anchored on its recorded expiry
/// date instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    Medical,
    Visa,
    Passport,
}

impl ExpiryPolicy {
    /// Window length from the issuance date. Passports carry their own
    /// expiry date, so no fixed window applies.
    pub fn validity_days(self) -> Option<i64> {
        match self {
            ExpiryPolicy::Medical => Some(MEDICAL_VALIDITY_DAYS),
            ExpiryPolicy::Visa => Some(VISA_VALIDITY_DAYS),
            ExpiryPolicy::Passport => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Normal,
    Advisory,
    Urgent,
    Critical,
    Expired,
}

/// Derived view of one validity window. Never persisted; recomputed on
/// every read so it always agrees with "today".
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryAssessment {
    pub policy: ExpiryPolicy,
    pub issue_date: Option<NaiveDate>,
    pub validity_days: Option<i64>,
    pub expiry_date: NaiveDate,
    pub remaining_days: i64,
    pub is_expired: bool,
    pub is_urgent: bool,
    pub tier: UrgencyTier,
    pub actions: Vec<&'static str>,
}

/// Total over all integers: every remaining-day count lands in exactly
/// one tier, checked in ascending order.
pub fn tier_for(remaining_days: i64) -> UrgencyTier {
    if remaining_days < 0 {
        UrgencyTier::Expired
    } else if remaining_days <= 7 {
        UrgencyTier::Critical
    } else if remaining_days <= URGENT_WINDOW_DAYS {
        UrgencyTier::Urgent
    } else if remaining_days <= 30 {
        UrgencyTier::Advisory
    } else {
        UrgencyTier::Normal
    }
}

fn actions_for(policy: ExpiryPolicy, tier: UrgencyTier) -> Vec<&'static str> {
    match (policy, tier) {
        (ExpiryPolicy::Medical, UrgencyTier::Expired) => vec![
            "Schedule a fresh medical examination",
            "Hold all downstream submissions until refit",
        ],
        (ExpiryPolicy::Medical, UrgencyTier::Critical) => vec![
            "Book a re-examination slot now",
            "Prioritize embassy submission this week",
        ],
        (ExpiryPolicy::Medical, UrgencyTier::Urgent) => vec![
            "Expedite pending stage paperwork",
            "Confirm the examination center can re-test on short notice",
        ],
        (ExpiryPolicy::Medical, UrgencyTier::Advisory) => {
            vec!["Review remaining stages against the fitness window"]
        }
        (ExpiryPolicy::Medical, UrgencyTier::Normal) => vec!["No action needed"],
        (ExpiryPolicy::Visa, UrgencyTier::Expired) => vec![
            "Restart the visa application",
            "Notify the employer of the lapsed visa",
        ],
        (ExpiryPolicy::Visa, UrgencyTier::Critical) => vec![
            "Book the flight immediately",
            "Escalate any pending manpower clearance",
        ],
        (ExpiryPolicy::Visa, UrgencyTier::Urgent) => vec![
            "Reserve a departure date",
            "Verify ticketing and exit documents are ready",
        ],
        (ExpiryPolicy::Visa, UrgencyTier::Advisory) => {
            vec!["Plan departure logistics within the visa window"]
        }
        (ExpiryPolicy::Visa, UrgencyTier::Normal) => vec!["No action needed"],
        (ExpiryPolicy::Passport, UrgencyTier::Expired) => vec![
            "Request passport renewal before any further processing",
        ],
        (ExpiryPolicy::Passport, UrgencyTier::Critical) => vec![
            "Start passport renewal now",
            "Warn the candidate that travel is blocked on renewal",
        ],
        (ExpiryPolicy::Passport, UrgencyTier::Urgent) => {
            vec!["Advise the candidate to begin passport renewal"]
        }
        (ExpiryPolicy::Passport, UrgencyTier::Advisory) => {
            vec!["Check renewal lead times at the issuing mission"]
        }
        (ExpiryPolicy::Passport, UrgencyTier::Normal) => vec!["No action needed"],
    }
}

fn build(
    policy: ExpiryPolicy,
    issue_date: Option<NaiveDate>,
    validity_days: Option<i64>,
    expiry_date: NaiveDate,
    today: NaiveDate,
) -> ExpiryAssessment {
    let remaining_days = (expiry_date - today).num_days();
    let tier = tier_for(remaining_days);
    ExpiryAssessment {
        policy,
        issue_date,
        validity_days,
        expiry_date,
        remaining_days,
        is_expired: remaining_days < 0,
        is_urgent: (0..=URGENT_WINDOW_DAYS).contains(&remaining_days),
        tier,
        actions: actions_for(policy, tier),
    }
}

/// Assess a window that runs the policy's validity length from
/// `issue_date`. Returns `None` when no issuance date has been recorded
/// yet, or when the policy carries no fixed window (passport).
pub fn assess(
    policy: ExpiryPolicy,
    issue_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<ExpiryAssessment> {
    let validity_days = policy.validity_days()?;
    assess_with(policy, issue_date, validity_days, today)
}

/// Same as [`assess`] with an explicit window length.
pub fn assess_with(
    policy: ExpiryPolicy,
    issue_date: Option<NaiveDate>,
    validity_days: i64,
    today: NaiveDate,
) -> Option<ExpiryAssessment> {
    let issue_date = issue_date?;
    let expiry_date = issue_date + chrono::Duration::days(validity_days);
    Some(build(
        policy,
        Some(issue_date),
        Some(validity_days),
        expiry_date,
        today,
    ))
}

/// Assess a window anchored on a known expiry date (passport).
pub fn assess_until(
    policy: ExpiryPolicy,
    expiry_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<ExpiryAssessment> {
    let expiry_date = expiry_date?;
    Some(build(policy, None, None, expiry_date, today))
}

/// Per-candidate compliance view over the three monitored windows.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceView {
    pub medical: Option<ExpiryAssessment>,
    pub visa: Option<ExpiryAssessment>,
    pub passport: Option<ExpiryAssessment>,
}

pub fn compliance_view(
    medical_fit_date: Option<NaiveDate>,
    visa_issue_date: Option<NaiveDate>,
    passport_expiry_date: Option<NaiveDate>,
    today: NaiveDate,
) -> ComplianceView {
    ComplianceView {
        medical: assess(ExpiryPolicy::Medical, medical_fit_date, today),
        visa: assess(ExpiryPolicy::Visa, visa_issue_date, today),
        passport: assess_until(ExpiryPolicy::Passport, passport_expiry_date, today),
    }
}

//! Service levels for emergency alerts and visit coverage
//!
//! Durations are measured in fractional minutes from millisecond
//! timestamps. Breach comparisons are strict: exactly at the threshold is
//! still on time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SlaConfig;
use crate::model::{EmergencyAlert, Person, VerificationState};
use crate::workflow::AlertStatus;

/// Thresholds the monitor compares against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub response_minutes: f64,
    pub resolution_minutes: f64,
    pub verification_visit_days: u32,
    pub routine_visit_days: u32,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        SlaPolicy::from(&SlaConfig::default())
    }
}

impl From<&SlaConfig> for SlaPolicy {
    fn from(cfg: &SlaConfig) -> Self {
        Self {
            response_minutes: cfg.response_minutes,
            resolution_minutes: cfg.resolution_minutes,
            verification_visit_days: cfg.verification_visit_days,
            routine_visit_days: cfg.routine_visit_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaMetrics {
    pub alert_id: String,
    /// `None` until the alert is responded to
    pub response_time_minutes: Option<f64>,
    /// `None` until the alert is resolved
    pub resolution_time_minutes: Option<f64>,
    /// Minutes since creation; only for alerts still Active
    pub elapsed_minutes: Option<f64>,
    pub response_breached: bool,
    pub resolution_breached: bool,
    /// Active alert whose elapsed time already exceeds the response threshold
    pub live_breached: bool,
}

impl SlaMetrics {
    pub fn is_breached(&self) -> bool {
        self.response_breached || self.resolution_breached || self.live_breached
    }
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Compute response, resolution and live elapsed times for one alert
pub fn compute_sla(alert: &EmergencyAlert, policy: &SlaPolicy, now: DateTime<Utc>) -> SlaMetrics {
    let response = alert
        .responded_at
        .map(|t| minutes_between(alert.created_at, t));
    let resolution = alert
        .resolved_at
        .map(|t| minutes_between(alert.created_at, t));
    let elapsed = (alert.status == AlertStatus::Active)
        .then(|| minutes_between(alert.created_at, now));

    SlaMetrics {
        alert_id: alert.id.clone(),
        response_time_minutes: response,
        resolution_time_minutes: resolution,
        elapsed_minutes: elapsed,
        response_breached: response.is_some_and(|m| m > policy.response_minutes),
        resolution_breached: resolution.is_some_and(|m| m > policy.resolution_minutes),
        live_breached: elapsed.is_some_and(|m| m > policy.response_minutes),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreachKind {
    SosResponse,
    SosResolution,
    VerificationVisit,
    RoutineVisit,
}

impl BreachKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreachKind::SosResponse => "SOS_RESPONSE",
            BreachKind::SosResolution => "SOS_RESOLUTION",
            BreachKind::VerificationVisit => "VERIFICATION_VISIT",
            BreachKind::RoutineVisit => "ROUTINE_VISIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BreachSeverity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaBreach {
    pub kind: BreachKind,
    pub entity_id: String,
    pub expected_by: DateTime<Utc>,
    /// Whole minutes past `expected_by`
    pub breach_minutes: i64,
    pub severity: BreachSeverity,
}

fn deadline(start: DateTime<Utc>, minutes: f64) -> DateTime<Utc> {
    start + Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Sweep alerts and people for open breaches as of `now`
///
/// - Active, unresponded alerts past the response deadline: Critical
/// - Responded, unresolved alerts past the resolution deadline: High
/// - Active people still pending verification past the visit window: Medium
/// - Active verified people with no visit, counted from the last one or
///   from registration, within the routine window: Medium
pub fn scan_breaches(
    alerts: &[EmergencyAlert],
    people: &[Person],
    policy: &SlaPolicy,
    now: DateTime<Utc>,
) -> Vec<SlaBreach> {
    let mut out = Vec::new();

    for alert in alerts {
        let (kind, minutes, severity) = match (alert.status, alert.responded_at, alert.resolved_at) {
            (AlertStatus::Active, None, _) => (
                BreachKind::SosResponse,
                policy.response_minutes,
                BreachSeverity::Critical,
            ),
            (AlertStatus::Responded, Some(_), None) => (
                BreachKind::SosResolution,
                policy.resolution_minutes,
                BreachSeverity::High,
            ),
            _ => continue,
        };
        let expected_by = deadline(alert.created_at, minutes);
        if now > expected_by {
            out.push(SlaBreach {
                kind,
                entity_id: alert.id.clone(),
                expected_by,
                breach_minutes: (now - expected_by).num_minutes(),
                severity,
            });
        }
    }

    let window = Duration::days(i64::from(policy.verification_visit_days));
    for person in people
        .iter()
        .filter(|p| p.is_active && p.verification_status == VerificationState::Pending)
    {
        let expected_by = person.created_at + window;
        if now > expected_by {
            out.push(SlaBreach {
                kind: BreachKind::VerificationVisit,
                entity_id: person.id.clone(),
                expected_by,
                breach_minutes: (now - expected_by).num_minutes(),
                severity: BreachSeverity::Medium,
            });
        }
    }

    let routine = Duration::days(i64::from(policy.routine_visit_days));
    for person in people
        .iter()
        .filter(|p| p.is_active && p.verification_status == VerificationState::Verified)
    {
        let expected_by = person.last_visit_at.unwrap_or(person.created_at) + routine;
        if now > expected_by {
            out.push(SlaBreach {
                kind: BreachKind::RoutineVisit,
                entity_id: person.id.clone(),
                expected_by,
                breach_minutes: (now - expected_by).num_minutes(),
                severity: BreachSeverity::Medium,
            });
        }
    }

    out
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hierarchy::HierarchyPath;
use crate::schedule::{TimeWindow, DEFAULT_VISIT_DURATION_MINUTES};
use crate::workflow::{normalize_state, VisitStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisitType {
    Routine,
    /// Never blocks and is never blocked by the officer's calendar
    Emergency,
    Verification,
    FollowUp,
}

impl VisitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitType::Routine => "Routine",
            VisitType::Emergency => "Emergency",
            VisitType::Verification => "Verification",
            VisitType::FollowUp => "FollowUp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_state(s).as_str() {
            "ROUTINE" => Some(VisitType::Routine),
            "EMERGENCY" => Some(VisitType::Emergency),
            "VERIFICATION" => Some(VisitType::Verification),
            "FOLLOWUP" => Some(VisitType::FollowUp),
            _ => None,
        }
    }

    pub fn is_conflict_exempt(&self) -> bool {
        matches!(self, VisitType::Emergency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisitPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl VisitPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitPriority::Low => "Low",
            VisitPriority::Normal => "Normal",
            VisitPriority::High => "High",
            VisitPriority::Urgent => "Urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_state(s).as_str() {
            "LOW" => Some(VisitPriority::Low),
            "NORMAL" | "MEDIUM" => Some(VisitPriority::Normal),
            "HIGH" => Some(VisitPriority::High),
            "URGENT" => Some(VisitPriority::Urgent),
            _ => None,
        }
    }
}

/// A field visit by one officer to one person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: String,
    pub person_id: String,
    pub officer_id: String,
    pub location: HierarchyPath,
    pub visit_type: VisitType,
    pub priority: VisitPriority,
    pub status: VisitStatus,
    pub scheduled_at: DateTime<Utc>,
    /// Minutes; `None` means the default duration
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
    /// Address the person had before a relocation, kept for the officer
    pub previous_address: Option<String>,
    pub risk_score: Option<u8>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Visit {
    /// The half-open interval this visit occupies on the officer's calendar
    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_start(
            self.scheduled_at,
            self.duration_minutes
                .unwrap_or(DEFAULT_VISIT_DURATION_MINUTES),
        )
    }
}

/// Input for creating a visit
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub person_id: String,
    /// `None` asks the engine to pick an officer by workload
    pub officer_id: Option<String>,
    pub visit_type: VisitType,
    pub priority: VisitPriority,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
    pub previous_address: Option<String>,
}

impl NewVisit {
    pub fn new(person_id: impl Into<String>, visit_type: VisitType, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            person_id: person_id.into(),
            officer_id: None,
            visit_type,
            priority: VisitPriority::Normal,
            scheduled_at,
            duration_minutes: None,
            notes: None,
            previous_address: None,
        }
    }

    pub fn with_officer(mut self, officer_id: impl Into<String>) -> Self {
        self.officer_id = Some(officer_id.into());
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_priority(mut self, priority: VisitPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

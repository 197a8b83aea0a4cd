//! Engine-level commands that write to the database

#![allow(clippy::result_large_err)]

use beatwatch_core::model::{EmergencyAlert, NewVisit, Person, Registration, Visit};
use beatwatch_core::sla::SlaBreach;
use beatwatch_core::workflow::{EntityKind, WorkflowState};
use beatwatch_core::Caller;
use beatwatch_store::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::cascade::{Relocation, RelocationOutcome};
use crate::context::EngineContext;
use crate::intake::NewPerson;
use crate::transition::{VisitCompletion, VisitOutcome};

/// Mutating engine commands
#[derive(Debug, Clone)]
pub enum EngineCommand {
    CreatePerson(NewPerson),
    SubmitRegistration {
        applicant_name: String,
        contact: Option<String>,
    },
    LinkRegistration {
        registration_id: String,
        person_id: String,
    },
    AssignOfficer {
        person_id: String,
    },
    ScheduleVisit(NewVisit),
    RescheduleVisit {
        visit_id: String,
        scheduled_at: DateTime<Utc>,
        duration_minutes: Option<u32>,
    },
    StartVisit {
        visit_id: String,
    },
    CompleteVisit {
        visit_id: String,
        outcome: VisitOutcome,
    },
    CancelVisit {
        visit_id: String,
        reason: String,
    },
    /// Generic status change; `notes` feeds alert notes or verification remarks
    UpdateStatus {
        kind: EntityKind,
        id: String,
        to: String,
        notes: Option<String>,
    },
    RelocatePerson {
        person_id: String,
        relocation: Relocation,
    },
    RaiseAlert {
        person_id: String,
        notes: Option<String>,
    },
    SweepSla,
}

/// Result of applying an engine command
#[derive(Debug, Clone)]
pub enum EngineCommandResult {
    PersonCreated(Person),
    Registration(Registration),
    OfficerAssigned(Option<String>),
    Visit(Visit),
    VisitCompleted(VisitCompletion),
    /// Canonical status the entity holds after the command
    StatusUpdated {
        kind: EntityKind,
        id: String,
        status: String,
    },
    PersonRelocated(RelocationOutcome),
    AlertRaised(EmergencyAlert),
    SlaBreaches(Vec<SlaBreach>),
}

/// Apply one command on behalf of `caller`
///
/// # Errors
///
/// Whatever the underlying operation returns.
pub fn apply_engine_command(
    cmd: EngineCommand,
    ctx: &EngineContext,
    caller: &Caller,
    conn: &mut Connection,
) -> Result<EngineCommandResult> {
    match cmd {
        EngineCommand::CreatePerson(input) => {
            crate::intake::create_person(ctx, caller, &input, conn)
                .map(EngineCommandResult::PersonCreated)
        }
        EngineCommand::SubmitRegistration {
            applicant_name,
            contact,
        } => crate::intake::submit_registration(ctx, &applicant_name, contact.as_deref(), conn)
            .map(EngineCommandResult::Registration),
        EngineCommand::LinkRegistration {
            registration_id,
            person_id,
        } => crate::transition::link_registration(ctx, caller, &registration_id, &person_id, conn)
            .map(EngineCommandResult::Registration),
        EngineCommand::AssignOfficer { person_id } => {
            crate::assignment::assign_officer_to_person(ctx, caller, &person_id, conn)
                .map(EngineCommandResult::OfficerAssigned)
        }
        EngineCommand::ScheduleVisit(new_visit) => {
            crate::scheduling::schedule_visit(ctx, caller, new_visit, conn)
                .map(EngineCommandResult::Visit)
        }
        EngineCommand::RescheduleVisit {
            visit_id,
            scheduled_at,
            duration_minutes,
        } => crate::scheduling::reschedule_visit(
            ctx,
            caller,
            &visit_id,
            scheduled_at,
            duration_minutes,
            conn,
        )
        .map(EngineCommandResult::Visit),
        EngineCommand::StartVisit { visit_id } => {
            crate::transition::start_visit(ctx, caller, &visit_id, conn)
                .map(EngineCommandResult::Visit)
        }
        EngineCommand::CompleteVisit { visit_id, outcome } => {
            crate::transition::complete_visit(ctx, caller, &visit_id, outcome, conn)
                .map(EngineCommandResult::VisitCompleted)
        }
        EngineCommand::CancelVisit { visit_id, reason } => {
            crate::transition::cancel_visit(ctx, caller, &visit_id, &reason, conn)
                .map(EngineCommandResult::Visit)
        }
        EngineCommand::UpdateStatus {
            kind,
            id,
            to,
            notes,
        } => {
            let status = update_status(ctx, caller, kind, &id, &to, notes, conn)?;
            Ok(EngineCommandResult::StatusUpdated { kind, id, status })
        }
        EngineCommand::RelocatePerson {
            person_id,
            relocation,
        } => crate::cascade::relocate_person(ctx, caller, &person_id, &relocation, conn)
            .map(EngineCommandResult::PersonRelocated),
        EngineCommand::RaiseAlert { person_id, notes } => {
            crate::alerts::raise_alert(ctx, caller, &person_id, notes, conn)
                .map(EngineCommandResult::AlertRaised)
        }
        EngineCommand::SweepSla => {
            crate::alerts::sweep_sla_breaches(ctx, conn).map(EngineCommandResult::SlaBreaches)
        }
    }
}

fn update_status(
    ctx: &EngineContext,
    caller: &Caller,
    kind: EntityKind,
    id: &str,
    to: &str,
    notes: Option<String>,
    conn: &mut Connection,
) -> Result<String> {
    let status = match kind {
        EntityKind::Person => crate::transition::update_person_status(ctx, caller, id, to, conn)?
            .target()
            .as_str(),
        EntityKind::VerificationRequest => {
            crate::transition::update_verification_status(ctx, caller, id, to, None, notes, conn)?
                .status
                .as_str()
        }
        EntityKind::Visit => crate::transition::update_visit_status(ctx, caller, id, to, conn)?
            .status
            .as_str(),
        EntityKind::EmergencyAlert => {
            crate::transition::update_alert_status(ctx, caller, id, to, notes, conn)?
                .status
                .as_str()
        }
        EntityKind::Registration => {
            crate::transition::update_registration_status(ctx, caller, id, to, conn)?
                .status
                .as_str()
        }
    };
    Ok(status.to_string())
}

// Notification outbox: queued after commit, drained through a sender,
// failures recorded without touching the primary operation

mod common;

use std::sync::Mutex;

use beatwatch_core::model::{NewVisit, VisitType};
use beatwatch_core::notify::{Channel, NotificationSender};
use beatwatch_engine::alerts::raise_alert;
use beatwatch_engine::notifications::{dispatch_pending, DispatchReport};
use beatwatch_engine::scheduling::schedule_visit;
use beatwatch_store::repo::{OutboxRepo, VisitRepo};
use common::{admin, at, ctx, setup, OFFICER_A_CONTACT, PERSON_1_CONTACT};

#[derive(Default)]
struct RecordingSender {
    accept: bool,
    sent: Mutex<Vec<(String, String, Channel)>>,
}

impl RecordingSender {
    fn accepting() -> Self {
        Self {
            accept: true,
            ..Self::default()
        }
    }

    fn deliveries(&self) -> Vec<(String, String, Channel)> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationSender for RecordingSender {
    fn send(&self, recipient: &str, message: &str, channel: Channel) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), message.to_string(), channel));
        self.accept
    }
}

#[test]
fn test_scheduled_visit_is_announced() {
    let (_dir, mut conn) = setup();
    let ctx = ctx();
    schedule_visit(
        &ctx,
        &admin(),
        NewVisit::new("p-1", VisitType::Routine, at(10, 0)).with_officer("off-a"),
        &mut conn,
    )
    .unwrap();

    let sender = RecordingSender::accepting();
    let report = dispatch_pending(&ctx, &sender, 10, &conn).unwrap();
    assert_eq!(report, DispatchReport { sent: 1, failed: 0 });

    let deliveries = sender.deliveries();
    assert_eq!(deliveries[0].0, PERSON_1_CONTACT);
    assert!(deliveries[0].1.contains("2026-03-02 10:00 UTC"));
    assert_eq!(deliveries[0].2, Channel::Sms);

    // Nothing left to send
    let report = dispatch_pending(&ctx, &sender, 10, &conn).unwrap();
    assert_eq!(report, DispatchReport::default());
}

#[test]
fn test_person_without_contact_queues_nothing() {
    let (_dir, mut conn) = setup();
    schedule_visit(
        &ctx(),
        &admin(),
        NewVisit::new("p-2", VisitType::Routine, at(10, 0)).with_officer("off-b"),
        &mut conn,
    )
    .unwrap();
    assert_eq!(OutboxRepo::counts(&conn).unwrap().pending, 0);
}

#[test]
fn test_alert_notifies_assigned_officer() {
    let (_dir, mut conn) = setup();
    raise_alert(&ctx(), &admin(), "p-1", None, &mut conn).unwrap();

    let sender = RecordingSender::accepting();
    dispatch_pending(&ctx(), &sender, 10, &conn).unwrap();
    let deliveries = sender.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, OFFICER_A_CONTACT);
    assert!(deliveries[0].1.contains("Asha Rao"));
}

#[test]
fn test_rejected_delivery_is_recorded_not_raised() {
    let (_dir, mut conn) = setup();
    let visit = schedule_visit(
        &ctx(),
        &admin(),
        NewVisit::new("p-1", VisitType::Routine, at(10, 0)).with_officer("off-a"),
        &mut conn,
    )
    .unwrap();

    let sender = RecordingSender::default();
    let report = dispatch_pending(&ctx(), &sender, 10, &conn).unwrap();
    assert_eq!(report, DispatchReport { sent: 0, failed: 1 });

    let counts = OutboxRepo::counts(&conn).unwrap();
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.pending, 0);

    // The visit itself stands
    assert!(VisitRepo::get(&conn, &visit.id).unwrap().is_some());
}

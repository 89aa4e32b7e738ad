//! Status lifecycle scenarios against a real database.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

mod common;

use chrono::{Duration, Utc};
use common::{TestApp, PNG_BYTES};
use gatepass_server::{
    error::AppError,
    models::{
        invite::{CreateInvite, ReinviteRequest},
        report::ReportOwner,
        timeline::TimelineOwner,
        visitor::RegisterVisitor,
        InviteStatus, Role, VisitorStatus,
    },
};
use rand::Rng;

fn unique_email(prefix: &str) -> String {
    let n: u64 = rand::thread_rng().gen();
    format!("{}-{:x}@gatepass.test", prefix, n)
}

fn registration(email: &str) -> RegisterVisitor {
    RegisterVisitor {
        name: "Jane Roe".to_string(),
        email: email.to_string(),
        phone: "+1 555 0100".to_string(),
        company: Some("Acme".to_string()),
        purpose: Some("Interview".to_string()),
    }
}

fn new_invite(email: &str) -> CreateInvite {
    CreateInvite {
        visitor_name: "Ana Guest".to_string(),
        visitor_email: email.to_string(),
        visitor_phone: None,
        purpose: Some("Audit".to_string()),
        visit_time: Utc::now(),
        expiry_time: None,
    }
}

#[tokio::test]
#[ignore]
async fn visitor_walks_through_a_full_visit() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let staff = app.claims(Role::Employee, 9001);

    let registered = services
        .visitors
        .register(&registration(&unique_email("walk")), None)
        .await
        .unwrap();
    assert!(!registered.returning);
    let id = registered.visitor.id;
    assert_eq!(registered.visitor.status, VisitorStatus::Pending);

    services.lifecycle.transition_visitor(id, "approved", Some(&staff)).await.unwrap();
    let checked_in = services.lifecycle.transition_visitor(id, "checked_in", Some(&staff)).await.unwrap();
    assert!(checked_in.check_in.is_some());

    let report = services.reports.get_by_owner(ReportOwner::Visitor(id)).await.unwrap().unwrap();
    assert_eq!(report.visit_count, 1);
    assert_eq!(report.check_in, checked_in.check_in);
    assert!(report.check_out.is_none());

    let checked_out = services.lifecycle.transition_visitor(id, "checked_out", Some(&staff)).await.unwrap();
    assert!(!checked_out.is_active);

    let report = services.reports.get_by_owner(ReportOwner::Visitor(id)).await.unwrap().unwrap();
    assert_eq!(report.check_out, checked_out.check_out);
    assert!(report.check_out.unwrap() >= report.check_in.unwrap());

    let timeline = services.lifecycle.timeline(TimelineOwner::Visitor(id)).await.unwrap();
    let statuses: Vec<&str> = timeline.iter().map(|e| e.status.as_str()).collect();
    assert_eq!(statuses, ["checked_out", "checked_in", "approved", "pending"]);
    assert_eq!(timeline[0].updated_by, Some(9001));
    assert_eq!(timeline[3].updated_by, None);
}

#[tokio::test]
#[ignore]
async fn repeating_the_current_status_changes_nothing() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let staff = app.claims(Role::Admin, 9002);

    let id = services
        .visitors
        .register(&registration(&unique_email("noop")), Some(&staff))
        .await
        .unwrap()
        .visitor
        .id;
    services.lifecycle.transition_visitor(id, "approved", Some(&staff)).await.unwrap();
    let mails_before = app.sent().len();

    let again = services.lifecycle.transition_visitor(id, "approved", Some(&staff)).await.unwrap();
    assert_eq!(again.status, VisitorStatus::Approved);

    let timeline = services.lifecycle.timeline(TimelineOwner::Visitor(id)).await.unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(app.sent().len(), mails_before);
}

#[tokio::test]
#[ignore]
async fn returning_visitor_opens_a_new_cycle() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let staff = app.claims(Role::Employee, 9003);
    let email = unique_email("again");

    let id = services.visitors.register(&registration(&email), None).await.unwrap().visitor.id;
    services.lifecycle.transition_visitor(id, "checked_in", Some(&staff)).await.unwrap();
    services.lifecycle.transition_visitor(id, "checked_out", Some(&staff)).await.unwrap();

    let returning = services.visitors.register(&registration(&email), None).await.unwrap();
    assert!(returning.returning);
    assert_eq!(returning.visitor.id, id);
    assert_eq!(returning.visitor.status, VisitorStatus::Revisit);
    assert!(returning.visitor.is_active);
    assert!(returning.visitor.check_in.is_none());

    let report = services.reports.get_by_owner(ReportOwner::Visitor(id)).await.unwrap().unwrap();
    assert_eq!(report.visit_count, 2);
    assert!(report.check_in.is_none());

    services.lifecycle.transition_visitor(id, "checked_in", Some(&staff)).await.unwrap();
    let report = services.reports.get_by_owner(ReportOwner::Visitor(id)).await.unwrap().unwrap();
    assert_eq!(report.visit_count, 2);
    assert!(report.check_in.is_some());
}

#[tokio::test]
#[ignore]
async fn parallel_check_ins_open_one_cycle() {
    let app = TestApp::connected().await;
    let staff = app.claims(Role::Employee, 9007);

    let id = app
        .state
        .services
        .visitors
        .register(&registration(&unique_email("race")), Some(&staff))
        .await
        .unwrap()
        .visitor
        .id;
    app.state
        .services
        .lifecycle
        .transition_visitor(id, "approved", Some(&staff))
        .await
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let services = app.state.services.clone();
            let staff = staff.clone();
            tokio::spawn(async move {
                services
                    .lifecycle
                    .transition_visitor(id, "checked_in", Some(&staff))
                    .await
            })
        })
        .collect();
    for handle in handles {
        let visitor = handle.await.unwrap().unwrap();
        assert_eq!(visitor.status, VisitorStatus::CheckedIn);
    }

    let services = &app.state.services;
    let visitor = services.visitors.get(id).await.unwrap();
    let report = services.reports.get_by_owner(ReportOwner::Visitor(id)).await.unwrap().unwrap();
    assert_eq!(report.visit_count, 1);
    assert_eq!(report.check_in, visitor.check_in);

    let timeline = services.lifecycle.timeline(TimelineOwner::Visitor(id)).await.unwrap();
    let check_ins = timeline.iter().filter(|e| e.status == "checked_in").count();
    assert_eq!(check_ins, 1);
}

#[tokio::test]
#[ignore]
async fn parallel_registrations_of_one_email_create_one_visitor() {
    let app = TestApp::connected().await;
    let email = unique_email("burst");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let services = app.state.services.clone();
            // Mixed case must still resolve to the same visitor
            let email = if i % 2 == 0 { email.clone() } else { email.to_uppercase() };
            tokio::spawn(async move { services.visitors.register(&registration(&email), None).await })
        })
        .collect();

    let mut ids = Vec::new();
    let mut first_time = 0;
    for handle in handles {
        let registered = handle.await.unwrap().unwrap();
        if !registered.returning {
            first_time += 1;
        }
        ids.push(registered.visitor.id);
    }
    assert_eq!(first_time, 1);
    ids.dedup();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
#[ignore]
async fn second_report_for_an_owner_is_a_duplicate() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let staff = app.claims(Role::Employee, 9008);

    let id = services
        .visitors
        .register(&registration(&unique_email("twice")), Some(&staff))
        .await
        .unwrap()
        .visitor
        .id;
    services.lifecycle.transition_visitor(id, "checked_in", Some(&staff)).await.unwrap();

    let mut conn = services.repository.pool.acquire().await.unwrap();
    let err = services
        .repository
        .reports
        .insert(&mut *conn, ReportOwner::Visitor(id), Some(Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateReport(_)));
}

#[tokio::test]
#[ignore]
async fn captured_visitor_receives_a_pass() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let staff = app.claims(Role::Employee, 9009);

    let id = services
        .visitors
        .register(&registration(&unique_email("photo")), Some(&staff))
        .await
        .unwrap()
        .visitor
        .id;
    let captured = services.visitors.capture_image(id, PNG_BYTES.to_vec()).await.unwrap();
    assert!(captured.image.is_some());
    assert!(captured
        .pass_image
        .as_deref()
        .unwrap_or_default()
        .starts_with("memory://visitors/pass/"));

    let report = services.reports.get_by_owner(ReportOwner::Visitor(id)).await.unwrap().unwrap();
    assert_eq!(report.visit_count, 1);
}

#[tokio::test]
#[ignore]
async fn list_filters_use_local_calendar_days() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let email = unique_email("today");

    let visitor = services.visitors.register(&registration(&email), None).await.unwrap().visitor;
    let tz = app.state.config.visits.tz();
    let today = visitor.created_at.with_timezone(&tz).date_naive().to_string();

    let query = gatepass_server::models::visitor::VisitorQuery {
        search: Some(email.clone()),
        start_date: Some(today.clone()),
        end_date: Some(today),
        ..Default::default()
    };
    let (found, total) = services.visitors.list(&query).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(found[0].id, visitor.id);
}

#[tokio::test]
#[ignore]
async fn check_out_without_check_in_leaves_no_report() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let staff = app.claims(Role::Employee, 9004);

    let id = services
        .visitors
        .register(&registration(&unique_email("early")), Some(&staff))
        .await
        .unwrap()
        .visitor
        .id;
    services.lifecycle.transition_visitor(id, "checked_out", Some(&staff)).await.unwrap();

    assert!(services.reports.get_by_owner(ReportOwner::Visitor(id)).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn invite_lifecycle_with_capture_and_reinvite() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let staff = app.claims(Role::Employee, 9005);
    let email = unique_email("guest");

    let invite = services.invites.create(&new_invite(&email), &staff).await.unwrap();
    assert_eq!(invite.status, InviteStatus::Created);
    assert_eq!(invite.invite_code.len(), 8);
    assert!(invite.qr_code.as_deref().unwrap_or_default().starts_with("memory://invites/qr/"));
    assert!(app.sent().iter().any(|m| m.to == email));

    let duplicate = services.invites.create(&new_invite(&email), &staff).await.unwrap_err();
    assert!(matches!(duplicate, AppError::Conflict(_)));

    let verified = services.invites.verify(&invite.invite_code.to_lowercase()).await.unwrap();
    assert_eq!(verified.id, invite.id);

    let captured = services
        .invites
        .capture(&invite.invite_code, PNG_BYTES.to_vec())
        .await
        .unwrap();
    assert_eq!(captured.status, InviteStatus::Pending);
    assert!(captured.pass_image.is_some());

    services.lifecycle.transition_invite(invite.id, "approved", Some(&staff)).await.unwrap();
    let checked_in = services
        .lifecycle
        .transition_invite(invite.id, "checked_in", Some(&staff))
        .await
        .unwrap();
    let report = services.reports.get_by_owner(ReportOwner::Invite(invite.id)).await.unwrap().unwrap();
    assert_eq!(report.visit_count, 1);
    assert_eq!(report.check_in, checked_in.check_in);
    assert!(report.visitor_id.is_none());

    let reissued = services
        .invites
        .reinvite(invite.id, &staff, &ReinviteRequest::default())
        .await
        .unwrap();
    assert_eq!(reissued.status, InviteStatus::Reinvited);
    assert_ne!(reissued.invite_code, invite.invite_code);
    assert!(reissued.check_in.is_none());

    let timeline = services.lifecycle.timeline(TimelineOwner::Invite(invite.id)).await.unwrap();
    assert_eq!(timeline.first().map(|e| e.status.as_str()), Some("reinvited"));
    assert_eq!(timeline.last().map(|e| e.status.as_str()), Some("created"));
}

#[tokio::test]
#[ignore]
async fn expired_invite_cannot_be_captured() {
    let app = TestApp::connected().await;
    let services = &app.state.services;
    let staff = app.claims(Role::Employee, 9006);

    let mut data = new_invite(&unique_email("late"));
    data.visit_time = Utc::now() - Duration::hours(5);
    data.expiry_time = Some(Utc::now() - Duration::hours(1));
    let invite = services.invites.create(&data, &staff).await.unwrap();

    let err = services.invites.verify(&invite.invite_code).await.unwrap_err();
    assert!(matches!(err, AppError::Expired(_)));

    let err = services
        .invites
        .capture(&invite.invite_code, PNG_BYTES.to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Expired(_)));
}

#[tokio::test]
#[ignore]
async fn unknown_entities_are_not_found() {
    let app = TestApp::connected().await;
    let services = &app.state.services;

    let err = services.lifecycle.transition_visitor(i32::MAX, "approved", None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services.invites.verify("ZZZZZZZZ").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services.lifecycle.timeline(TimelineOwner::Invite(i32::MAX)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn statistics_answer_on_a_live_database() {
    let app = TestApp::connected().await;
    let stats = &app.state.services.stats;

    let hourly = stats.hourly_activity().await.unwrap();
    assert_eq!(hourly.hours.len(), 24);

    let trends = stats.visitor_trends(&Default::default()).await.unwrap();
    assert_eq!(trends.points.len(), 7);

    let distribution = stats.status_distribution().await.unwrap();
    assert_eq!(distribution.entries.len(), 3);
}

//! Visit registration, codes, reviews and status transitions against a
//! real database. All tests here are `#[ignore]`d; see `common` for the
//! required environment.

mod common;

use std::sync::Arc;

use visit_manager_server::error::ApiError;
use visit_manager_server::events::topics;
use visit_manager_server::models::{PrincipalRole, VisitStatus};
use visit_manager_server::visits::{visit_code, VisitService};

use common::*;

fn service(pool: sqlx::PgPool, events: Arc<RecordingPublisher>) -> VisitService {
    VisitService::new(pool, events)
}

#[tokio::test]
#[ignore]
async fn registers_scheduled_visit_and_emits_event() {
    let pool = test_pool().await;
    let events = RecordingPublisher::shared();
    let visits = service(pool.clone(), events.clone());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit.clone()).await.unwrap();

    assert_eq!(visit.visit_id, new_visit.visit_id);
    assert_eq!(visit.status, VisitStatus::Pending);
    assert!(events.topics().contains(&topics::VISITS_REGISTERED.to_string()));
}

#[tokio::test]
#[ignore]
async fn duplicate_visit_id_is_rejected() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    visits.register_visit(new_visit.clone()).await.unwrap();

    let err = visits.register_visit(new_visit).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
}

#[tokio::test]
#[ignore]
async fn missing_reference_fails_whole_registration() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let mut new_visit = seed_new_visit(&pool).await;
    new_visit.vendor_id = uuid::Uuid::new_v4();

    let err = visits.register_visit(new_visit.clone()).await.unwrap_err();
    assert!(matches!(err, ApiError::ReferenceNotFound(_)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visit WHERE visit_id = $1")
        .bind(new_visit.visit_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore]
async fn visit_code_is_vendor_only_and_owner_only() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();

    let owner = principal(visit.vendor_id, PrincipalRole::Vendor);
    let code = visits.get_visit_code(visit.visit_id, &owner).await.unwrap();
    assert_eq!(code, visit_code(visit.visit_id));

    let other_vendor = principal(seed_vendor(&pool).await, PrincipalRole::Vendor);
    let err = visits
        .get_visit_code(visit.visit_id, &other_vendor)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let client = principal(visit.client_id, PrincipalRole::Client);
    let err = visits.get_visit_code(visit.visit_id, &client).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
#[ignore]
async fn client_verifies_code_without_learning_it() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();
    let client = principal(visit.client_id, PrincipalRole::Client);

    let good = visit_code(visit.visit_id);
    assert!(visits.check_visit_code(visit.visit_id, &good, &client).await.unwrap());
    assert!(!visits.check_visit_code(visit.visit_id, "000000", &client).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn opinion_requires_completed_visit() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();
    let client = principal(visit.client_id, PrincipalRole::Client);

    let err = visits
        .add_opinion(&client, visit.visit_id, 5, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
}

#[tokio::test]
#[ignore]
async fn opinion_updates_vendor_average_and_emits_event() {
    let pool = test_pool().await;
    let events = RecordingPublisher::shared();
    let visits = service(pool.clone(), events.clone());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();
    set_visit_status(&pool, visit.visit_id, VisitStatus::Completed).await;

    let client = principal(visit.client_id, PrincipalRole::Client);
    let avg = visits
        .add_opinion(&client, visit.visit_id, 4, Some("solid work".to_string()))
        .await
        .unwrap();
    assert_eq!(avg, 4.0);

    let recorded = events.recorded();
    let rating_event = recorded
        .iter()
        .find(|(t, _)| t == topics::VENDORS_RATING_UPDATED)
        .expect("rating event emitted");
    assert_eq!(
        rating_event.1["vendor_id"],
        serde_json::json!(visit.vendor_id)
    );
    assert_eq!(rating_event.1["new_avg"], serde_json::json!(4.0));
}

#[tokio::test]
#[ignore]
async fn opinion_score_out_of_range_is_rejected() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();
    set_visit_status(&pool, visit.visit_id, VisitStatus::Completed).await;

    let client = principal(visit.client_id, PrincipalRole::Client);
    for bad in [0, 6, -1] {
        let err = visits
            .add_opinion(&client, visit.visit_id, bad, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }
}

#[tokio::test]
#[ignore]
async fn vendor_confirms_then_completes_visit() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();
    let vendor = principal(visit.vendor_id, PrincipalRole::Vendor);

    let visit = visits
        .update_status(&vendor, visit.visit_id, VisitStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(visit.status, VisitStatus::Confirmed);

    let visit = visits
        .update_status(&vendor, visit.visit_id, VisitStatus::InProgress)
        .await
        .unwrap();
    let visit = visits
        .update_status(&vendor, visit.visit_id, VisitStatus::Completed)
        .await
        .unwrap();
    assert_eq!(visit.status, VisitStatus::Completed);

    // Completed is terminal.
    let err = visits
        .update_status(&vendor, visit.visit_id, VisitStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
}

#[tokio::test]
#[ignore]
async fn client_cannot_confirm_a_visit() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();
    let client = principal(visit.client_id, PrincipalRole::Client);

    let err = visits
        .update_status(&client, visit.visit_id, VisitStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    // But rejecting their own visit is allowed.
    let visit = visits
        .update_status(&client, visit.visit_id, VisitStatus::ClientRejected)
        .await
        .unwrap();
    assert_eq!(visit.status, VisitStatus::ClientRejected);
}

#[tokio::test]
#[ignore]
async fn outsider_sees_not_found_on_status_update() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();

    let outsider = principal(seed_client(&pool, None).await, PrincipalRole::Client);
    let err = visits
        .update_status(&outsider, visit.visit_id, VisitStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn visit_listings_are_scoped_to_caller() {
    let pool = test_pool().await;
    let visits = service(pool.clone(), RecordingPublisher::shared());

    let new_visit = seed_new_visit(&pool).await;
    let visit = visits.register_visit(new_visit).await.unwrap();

    let vendor = principal(visit.vendor_id, PrincipalRole::Vendor);
    let listed = visits.visits_for_vendor(&vendor).await.unwrap();
    assert!(listed.iter().any(|v| v.visit_id == visit.visit_id));

    let unrelated = principal(seed_vendor(&pool).await, PrincipalRole::Vendor);
    let listed = visits.visits_for_vendor(&unrelated).await.unwrap();
    assert!(listed.iter().all(|v| v.visit_id != visit.visit_id));
}

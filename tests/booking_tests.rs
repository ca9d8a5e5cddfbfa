//! Role-profile registration and the end-to-end booking path. All tests
//! here are `#[ignore]`d; see `common` for the required environment.

mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use visit_manager_server::error::ApiError;
use visit_manager_server::events::topics;
use visit_manager_server::models::{PrincipalRole, VisitStatus};
use visit_manager_server::users::{ClientRegistration, UserService, VendorRegistration};
use visit_manager_server::visits::{BookVisitRequest, VisitService};

use common::*;

fn vendor_registration(address_id: Uuid, service_type_ids: Vec<Uuid>) -> VendorRegistration {
    VendorRegistration {
        vendor_name: "Sparkle Cleaning".to_string(),
        phone_number: "+48111222333".to_string(),
        address_id,
        required_deposit_gr: Some(5000),
        offered_service_type_ids: service_type_ids,
    }
}

#[tokio::test]
#[ignore]
async fn registers_client_and_emits_event() {
    let pool = test_pool().await;
    let events = RecordingPublisher::shared();
    let users = UserService::new(pool.clone(), events.clone());

    let user = seed_user(&pool, "alice").await;
    let address_id = seed_address(&pool).await;

    let client = users
        .register_as_client(
            user.user_id,
            ClientRegistration {
                phone_number: "+48123123123".to_string(),
                address_id: Some(address_id),
            },
        )
        .await
        .unwrap();

    assert_eq!(client.client_id, user.user_id);
    assert!(events.topics().contains(&topics::USERS_REGISTERED.to_string()));
}

#[tokio::test]
#[ignore]
async fn second_profile_registration_is_rejected() {
    let pool = test_pool().await;
    let users = UserService::new(pool.clone(), RecordingPublisher::shared());

    let user = seed_user(&pool, "bob").await;
    let address_id = seed_address(&pool).await;

    users
        .register_as_vendor(user.user_id, vendor_registration(address_id, vec![]))
        .await
        .unwrap();

    // Neither a second vendor profile nor a client profile is allowed.
    let other_address = seed_address(&pool).await;
    let err = users
        .register_as_vendor(user.user_id, vendor_registration(other_address, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    let err = users
        .register_as_client(
            user.user_id,
            ClientRegistration {
                phone_number: "+48123123123".to_string(),
                address_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
}

#[tokio::test]
#[ignore]
async fn vendor_registration_requires_existing_address() {
    let pool = test_pool().await;
    let users = UserService::new(pool.clone(), RecordingPublisher::shared());

    let user = seed_user(&pool, "carol").await;
    let err = users
        .register_as_vendor(user.user_id, vendor_registration(Uuid::new_v4(), vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ReferenceNotFound(_)));
}

#[tokio::test]
#[ignore]
async fn non_positive_deposit_is_rejected() {
    let pool = test_pool().await;
    let users = UserService::new(pool.clone(), RecordingPublisher::shared());

    let user = seed_user(&pool, "dave").await;
    let address_id = seed_address(&pool).await;

    let mut registration = vendor_registration(address_id, vec![]);
    registration.required_deposit_gr = Some(0);

    let err = users
        .register_as_vendor(user.user_id, registration)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
}

#[tokio::test]
#[ignore]
async fn client_books_visit_by_vendor_email() {
    let pool = test_pool().await;
    let events = RecordingPublisher::shared();
    let users = UserService::new(pool.clone(), events.clone());
    let visits = VisitService::new(pool.clone(), events.clone());

    // Vendor with two offered service types; booking picks the first by name.
    let vendor_user = seed_user(&pool, "vendor-erin").await;
    let vendor_address = seed_address(&pool).await;
    let plumbing = seed_service_type(&pool, &format!("plumbing-{}", Uuid::new_v4())).await;
    let cleaning = seed_service_type(&pool, &format!("cleaning-{}", Uuid::new_v4())).await;
    users
        .register_as_vendor(
            vendor_user.user_id,
            vendor_registration(vendor_address, vec![plumbing, cleaning]),
        )
        .await
        .unwrap();

    let client_user = seed_user(&pool, "client-frank").await;
    let client_address = seed_address(&pool).await;
    users
        .register_as_client(
            client_user.user_id,
            ClientRegistration {
                phone_number: "+48123123123".to_string(),
                address_id: Some(client_address),
            },
        )
        .await
        .unwrap();

    let caller = principal(client_user.user_id, PrincipalRole::Client);
    let visit = visits
        .book_visit(
            &caller,
            BookVisitRequest {
                vendor_email: vendor_user.email.clone(),
                start_timestamp: Utc::now() + Duration::days(1),
                end_timestamp: Utc::now() + Duration::days(1) + Duration::hours(2),
                description: "Fix the sink".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(visit.client_id, client_user.user_id);
    assert_eq!(visit.vendor_id, vendor_user.user_id);
    assert_eq!(visit.address_id, client_address);
    assert_eq!(visit.status, VisitStatus::Confirmed);
    // "cleaning-*" sorts before "plumbing-*".
    assert_eq!(visit.service_type_id, cleaning);
    assert!(events.topics().contains(&topics::VISITS_REGISTERED.to_string()));
}

#[tokio::test]
#[ignore]
async fn booking_requires_client_role_and_profile() {
    let pool = test_pool().await;
    let visits = VisitService::new(pool.clone(), RecordingPublisher::shared());

    let request = || BookVisitRequest {
        vendor_email: "nobody@example.com".to_string(),
        start_timestamp: Utc::now(),
        end_timestamp: Utc::now() + Duration::hours(1),
        description: String::new(),
    };

    let vendor = principal(seed_vendor(&pool).await, PrincipalRole::Vendor);
    let err = visits.book_visit(&vendor, request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    // Authenticated but profile-less user.
    let bare_user = seed_user(&pool, "grace").await;
    let caller = principal(bare_user.user_id, PrincipalRole::Client);
    let err = visits.book_visit(&caller, request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
#[ignore]
async fn booking_fails_when_vendor_offers_nothing() {
    let pool = test_pool().await;
    let events = RecordingPublisher::shared();
    let users = UserService::new(pool.clone(), events.clone());
    let visits = VisitService::new(pool.clone(), events.clone());

    let vendor_user = seed_user(&pool, "vendor-henry").await;
    let vendor_address = seed_address(&pool).await;
    users
        .register_as_vendor(vendor_user.user_id, vendor_registration(vendor_address, vec![]))
        .await
        .unwrap();

    let client_address = seed_address(&pool).await;
    let client_id = seed_client(&pool, Some(client_address)).await;
    let caller = principal(client_id, PrincipalRole::Client);

    let err = visits
        .book_visit(
            &caller,
            BookVisitRequest {
                vendor_email: vendor_user.email.clone(),
                start_timestamp: Utc::now(),
                end_timestamp: Utc::now() + Duration::hours(1),
                description: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
}

#[tokio::test]
#[ignore]
async fn booking_without_stored_address_is_rejected() {
    let pool = test_pool().await;
    let events = RecordingPublisher::shared();
    let users = UserService::new(pool.clone(), events.clone());
    let visits = VisitService::new(pool.clone(), events.clone());

    let vendor_user = seed_user(&pool, "vendor-iris").await;
    let vendor_address = seed_address(&pool).await;
    let service = seed_service_type(&pool, &format!("gardening-{}", Uuid::new_v4())).await;
    users
        .register_as_vendor(
            vendor_user.user_id,
            vendor_registration(vendor_address, vec![service]),
        )
        .await
        .unwrap();

    let client_id = seed_client(&pool, None).await;
    let caller = principal(client_id, PrincipalRole::Client);

    let err = visits
        .book_visit(
            &caller,
            BookVisitRequest {
                vendor_email: vendor_user.email.clone(),
                start_timestamp: Utc::now(),
                end_timestamp: Utc::now() + Duration::hours(1),
                description: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
}

#[tokio::test]
#[ignore]
async fn role_resolution_follows_profile_registration() {
    let pool = test_pool().await;
    let users = UserService::new(pool.clone(), RecordingPublisher::shared());

    let user = seed_user(&pool, "judy").await;
    let role = users.resolve_role(user.user_id).await.unwrap();
    assert_eq!(role.as_str(), "unassigned");

    let address_id = seed_address(&pool).await;
    users
        .register_as_client(
            user.user_id,
            ClientRegistration {
                phone_number: "+48123123123".to_string(),
                address_id: Some(address_id),
            },
        )
        .await
        .unwrap();

    let role = users.resolve_role(user.user_id).await.unwrap();
    assert_eq!(role.as_str(), "client");

    let me = users.me(user.user_id).await.unwrap();
    assert_eq!(me.role, "client");
    assert!(me.client_profile.is_some());
    assert!(me.vendor_profile.is_none());
}

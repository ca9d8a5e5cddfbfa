//! Data models for the visit manager backend

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// User identity record
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registration_timestamp: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

/// Client role-profile (1:1 with User)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Client {
    pub client_id: Uuid,
    pub phone_number: String,
    pub address_id: Option<Uuid>,
    pub is_active: bool,
    pub registration_fee_payment_id: Option<Uuid>,
}

/// Vendor role-profile (1:1 with User)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Vendor {
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub phone_number: String,
    pub address_id: Uuid,
    pub required_deposit_gr: Option<i64>,
    pub is_active: bool,
    pub registration_fee_payment_id: Option<Uuid>,
}

/// Postal address, exclusively owned once assigned to a profile
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Address {
    pub address_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub street: String,
    pub city: String,
    pub state_or_region: String,
    pub country: String,
    pub zip_code: String,
}

/// A named service category, many-to-many with Vendor
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ServiceType {
    pub service_type_id: Uuid,
    pub name: String,
    pub description: String,
}

/// A scheduled service engagement between a client and a vendor
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Visit {
    pub visit_id: Uuid,
    pub client_id: Uuid,
    pub vendor_id: Uuid,
    pub start_timestamp: DateTime<Utc>,
    pub end_timestamp: DateTime<Utc>,
    pub description: String,
    pub service_type_id: Uuid,
    pub address_id: Uuid,
    pub deposit_id: Option<Uuid>,
    pub verification_code: Option<String>,
    pub review_opinion_score: Option<i32>,
    pub review_comment: Option<String>,
    pub status: VisitStatus,
}

/// Visit lifecycle status
///
/// `pending` waits for vendor confirmation; `confirmed` moves to
/// `in_progress` and then `completed`; either party may cancel any
/// non-terminal visit. A review is legal only from `completed`.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "visit_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Pending,
    VendorRejected,
    ClientRejected,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl Default for VisitStatus {
    fn default() -> Self {
        VisitStatus::Pending
    }
}

impl VisitStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VisitStatus::Completed
                | VisitStatus::Cancelled
                | VisitStatus::VendorRejected
                | VisitStatus::ClientRejected
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: VisitStatus) -> bool {
        use VisitStatus::*;
        match (*self, next) {
            (Pending, Confirmed) | (Pending, VendorRejected) | (Pending, ClientRejected) => true,
            (Confirmed, InProgress) => true,
            (InProgress, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Payment lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Processing,
    Cancelled,
    Error,
    Succeeded,
    Refunded,
}

/// Local record of an external processor charge
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub payment_id: Uuid,
    pub stripe_charge_id: String,
    pub value_gr: i64,
    pub currency: String,
    pub transaction_timestamp: DateTime<Utc>,
    pub status: PaymentStatus,
}

/// Resolved role-profile of a user, at most one at a time.
///
/// A user with no profile is "unassigned": authenticated but still pending
/// role selection.
#[derive(Debug, Clone)]
pub enum Role {
    Admin,
    Vendor(Vendor),
    Client(Client),
    Unassigned,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Vendor(_) => "vendor",
            Role::Client(_) => "client",
            Role::Unassigned => "unassigned",
        }
    }

    pub fn is_assigned(&self) -> bool {
        !matches!(self, Role::Unassigned)
    }
}

/// Role claim carried by an access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalRole {
    Admin,
    Vendor,
    Client,
    Unassigned,
}

impl PrincipalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalRole::Admin => "admin",
            PrincipalRole::Vendor => "vendor",
            PrincipalRole::Client => "client",
            PrincipalRole::Unassigned => "unassigned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(PrincipalRole::Admin),
            "vendor" => Some(PrincipalRole::Vendor),
            "client" => Some(PrincipalRole::Client),
            "unassigned" => Some(PrincipalRole::Unassigned),
            _ => None,
        }
    }
}

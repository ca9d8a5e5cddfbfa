//! Visit lifecycle service
//!
//! Booking, visit-code generation and verification, review collection with
//! vendor rating aggregation, and status transitions.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{on_constraint_violation, ApiError, ApiResult};
use crate::events::{emit_best_effort, topics, EventPublisher};
use crate::middleware::Principal;
use crate::models::{Client, PrincipalRole, ServiceType, Vendor, Visit, VisitStatus};

/// One-time visit code: the first 6 hex characters of the SHA-256 hash of
/// the visit id's canonical string form. Pure function of the visit id,
/// recomputed on every call; nothing is stored.
pub fn visit_code(visit_id: Uuid) -> String {
    let digest = Sha256::digest(visit_id.to_string().as_bytes());
    hex::encode(digest)[..6].to_string()
}

/// Accepts RFC 3339 timestamps as well as the scheduler's naive
/// `YYYY-MM-DDTHH:MM:SS` form, which is taken as UTC.
fn deserialize_flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// Fully-formed visit record, as emitted by the external scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVisit {
    pub visit_id: Uuid,
    pub client_id: Uuid,
    pub vendor_id: Uuid,
    #[serde(deserialize_with = "deserialize_flexible_timestamp")]
    pub start_timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_flexible_timestamp")]
    pub end_timestamp: DateTime<Utc>,
    pub description: String,
    pub service_type_id: Uuid,
    pub address_id: Uuid,
    #[serde(default)]
    pub status: VisitStatus,
}

/// Booking request from an authenticated client
#[derive(Debug, Deserialize)]
pub struct BookVisitRequest {
    pub vendor_email: String,
    #[serde(deserialize_with = "deserialize_flexible_timestamp")]
    pub start_timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_flexible_timestamp")]
    pub end_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

/// Visit lifecycle service
pub struct VisitService {
    pool: PgPool,
    events: Arc<dyn EventPublisher>,
}

impl VisitService {
    pub fn new(pool: PgPool, events: Arc<dyn EventPublisher>) -> Self {
        Self { pool, events }
    }

    /// Insert a scheduler-produced visit record.
    ///
    /// All referenced ids must already exist; a missing reference fails the
    /// whole operation. The `visits.registered` event is emitted only after
    /// the insert commits and its failure does not roll anything back.
    pub async fn register_visit(&self, new_visit: NewVisit) -> ApiResult<Visit> {
        let mut tx = self.pool.begin().await?;

        let visit = sqlx::query_as::<_, Visit>(
            r#"
            INSERT INTO visit (
                visit_id, client_id, vendor_id, start_timestamp, end_timestamp,
                description, service_type_id, address_id, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(new_visit.visit_id)
        .bind(new_visit.client_id)
        .bind(new_visit.vendor_id)
        .bind(new_visit.start_timestamp)
        .bind(new_visit.end_timestamp)
        .bind(&new_visit.description)
        .bind(new_visit.service_type_id)
        .bind(new_visit.address_id)
        .bind(new_visit.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_constraint_violation(e, "visit references a missing entity"))?;

        tx.commit().await?;

        let payload = serde_json::to_value(&new_visit).unwrap_or(Value::Null);
        emit_best_effort(
            self.events.as_ref(),
            topics::VISITS_REGISTERED,
            &visit.visit_id.to_string(),
            payload,
        )
        .await;

        Ok(visit)
    }

    /// Book a visit with a vendor identified by email.
    ///
    /// Uses the vendor's first offered service type and the client's stored
    /// address; the created visit is immediately confirmed.
    pub async fn book_visit(&self, principal: &Principal, req: BookVisitRequest) -> ApiResult<Visit> {
        if principal.role != PrincipalRole::Client {
            return Err(ApiError::Forbidden("Only clients can book visits".to_string()));
        }

        let client = sqlx::query_as::<_, Client>("SELECT * FROM client WHERE client_id = $1")
            .bind(principal.user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::Forbidden("Caller has no client profile".to_string()))?;

        let vendor = sqlx::query_as::<_, Vendor>(
            r#"
            SELECT v.* FROM vendor v
            JOIN app_user u ON u.user_id = v.vendor_id
            WHERE u.email = $1
            "#,
        )
        .bind(&req.vendor_email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden(format!("No vendor profile for {}", req.vendor_email))
        })?;

        // First offered service type, by name for determinism. Policy is a
        // placeholder pending product clarification.
        let service_type = sqlx::query_as::<_, ServiceType>(
            r#"
            SELECT st.* FROM service_type st
            JOIN vendor_offered_service_type vo ON vo.service_type_id = st.service_type_id
            WHERE vo.vendor_id = $1
            ORDER BY st.name
            LIMIT 1
            "#,
        )
        .bind(vendor.vendor_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::InvalidState("Vendor offers no service types".to_string()))?;

        let address_id = client.address_id.ok_or_else(|| {
            ApiError::ValidationError("Client has no address on file".to_string())
        })?;

        let new_visit = NewVisit {
            visit_id: Uuid::new_v4(),
            client_id: client.client_id,
            vendor_id: vendor.vendor_id,
            start_timestamp: req.start_timestamp,
            end_timestamp: req.end_timestamp,
            description: req.description,
            service_type_id: service_type.service_type_id,
            address_id,
            status: VisitStatus::Confirmed,
        };

        self.register_visit(new_visit).await
    }

    /// All visits assigned to the authenticated vendor.
    pub async fn visits_for_vendor(&self, principal: &Principal) -> ApiResult<Vec<Visit>> {
        if principal.role != PrincipalRole::Vendor {
            return Err(ApiError::Forbidden("Only for vendor".to_string()));
        }

        let visits = sqlx::query_as::<_, Visit>(
            "SELECT * FROM visit WHERE vendor_id = $1 ORDER BY start_timestamp",
        )
        .bind(principal.user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(visits)
    }

    /// All visits assigned to the authenticated client.
    pub async fn visits_for_client(&self, principal: &Principal) -> ApiResult<Vec<Visit>> {
        if principal.role != PrincipalRole::Client {
            return Err(ApiError::Forbidden("Only for client".to_string()));
        }

        let visits = sqlx::query_as::<_, Visit>(
            "SELECT * FROM visit WHERE client_id = $1 ORDER BY start_timestamp",
        )
        .bind(principal.user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(visits)
    }

    /// Generate the one-time visit code. Vendor-owner only; a visit owned by
    /// another vendor is indistinguishable from a missing one.
    pub async fn get_visit_code(&self, visit_id: Uuid, principal: &Principal) -> ApiResult<String> {
        if principal.role != PrincipalRole::Vendor {
            return Err(ApiError::Forbidden("Only for vendor".to_string()));
        }

        let visit = self.fetch_visit(visit_id).await?;
        match visit {
            Some(v) if v.vendor_id == principal.user_id => Ok(visit_code(visit_id)),
            _ => Err(ApiError::NotFound("Visit not found".to_string())),
        }
    }

    /// Check a code provided by the vendor against the recomputed value.
    /// Client-on-visit only; never mutates state.
    pub async fn check_visit_code(
        &self,
        visit_id: Uuid,
        code: &str,
        principal: &Principal,
    ) -> ApiResult<bool> {
        if principal.role != PrincipalRole::Client {
            return Err(ApiError::Forbidden("Only for client".to_string()));
        }

        let visit = self.fetch_visit(visit_id).await?;
        match visit {
            Some(v) if v.client_id == principal.user_id => Ok(code == visit_code(visit_id)),
            _ => Err(ApiError::NotFound("Visit not found".to_string())),
        }
    }

    /// Attach a review to a completed visit and recompute the vendor's
    /// average score. Returns the new average.
    ///
    /// The score write and the average recompute run as two sequential
    /// transactions; concurrent reviews of the same vendor may observe a
    /// transient stale average, corrected by the next review event.
    pub async fn add_opinion(
        &self,
        principal: &Principal,
        visit_id: Uuid,
        score: i32,
        comment: Option<String>,
    ) -> ApiResult<f64> {
        if principal.role != PrincipalRole::Client {
            return Err(ApiError::Forbidden("Only for client".to_string()));
        }

        let visit = match self.fetch_visit(visit_id).await? {
            Some(v) if v.client_id == principal.user_id => v,
            _ => return Err(ApiError::NotFound("Visit not found".to_string())),
        };

        if visit.status != VisitStatus::Completed {
            return Err(ApiError::InvalidState(
                "Visit has not been completed".to_string(),
            ));
        }

        if !(1..=5).contains(&score) {
            return Err(ApiError::ValidationError(
                "Score must be between 1 and 5".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE visit SET review_opinion_score = $1, review_comment = $2 WHERE visit_id = $3",
        )
        .bind(score)
        .bind(&comment)
        .bind(visit_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let new_avg = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(review_opinion_score)::DOUBLE PRECISION
            FROM visit
            WHERE vendor_id = $1 AND review_opinion_score IS NOT NULL
            "#,
        )
        .bind(visit.vendor_id)
        .fetch_one(&self.pool)
        .await?
        .unwrap_or(0.0);

        emit_best_effort(
            self.events.as_ref(),
            topics::VENDORS_RATING_UPDATED,
            &visit.vendor_id.to_string(),
            json!({ "vendor_id": visit.vendor_id, "new_avg": new_avg }),
        )
        .await;

        Ok(new_avg)
    }

    /// Move a visit through its lifecycle.
    ///
    /// The caller must be a party to the visit; each party may only request
    /// the transitions it owns, and the transition itself must be legal for
    /// the current status.
    pub async fn update_status(
        &self,
        principal: &Principal,
        visit_id: Uuid,
        new_status: VisitStatus,
    ) -> ApiResult<Visit> {
        let visit = match self.fetch_visit(visit_id).await? {
            Some(v) => v,
            None => return Err(ApiError::NotFound("Visit not found".to_string())),
        };

        let allowed = match principal.role {
            PrincipalRole::Client if visit.client_id == principal.user_id => matches!(
                new_status,
                VisitStatus::ClientRejected | VisitStatus::Cancelled
            ),
            PrincipalRole::Vendor if visit.vendor_id == principal.user_id => matches!(
                new_status,
                VisitStatus::Confirmed
                    | VisitStatus::VendorRejected
                    | VisitStatus::InProgress
                    | VisitStatus::Completed
                    | VisitStatus::Cancelled
            ),
            _ => return Err(ApiError::NotFound("Visit not found".to_string())),
        };

        if !allowed {
            return Err(ApiError::Forbidden(format!(
                "A {} may not set a visit to {:?}",
                principal.role.as_str(),
                new_status
            )));
        }

        if !visit.status.can_transition_to(new_status) {
            return Err(ApiError::InvalidState(format!(
                "Cannot move visit from {:?} to {:?}",
                visit.status, new_status
            )));
        }

        let updated = sqlx::query_as::<_, Visit>(
            "UPDATE visit SET status = $1 WHERE visit_id = $2 RETURNING *",
        )
        .bind(new_status)
        .bind(visit_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn fetch_visit(&self, visit_id: Uuid) -> ApiResult<Option<Visit>> {
        let visit = sqlx::query_as::<_, Visit>("SELECT * FROM visit WHERE visit_id = $1")
            .bind(visit_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(visit)
    }
}

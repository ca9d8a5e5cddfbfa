//! User and role-profile management
//!
//! A user owns at most one role-profile at a time; profile registration is
//! rejected outright when any profile already exists.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::{on_constraint_violation, ApiError, ApiResult};
use crate::events::{emit_best_effort, topics, EventPublisher};
use crate::models::{Client, Role, User, Vendor};

/// Client profile registration payload
#[derive(Debug, Deserialize, Validate)]
pub struct ClientRegistration {
    #[validate(length(min = 3, message = "phone_number is too short"))]
    pub phone_number: String,
    pub address_id: Option<Uuid>,
}

/// Vendor profile registration payload
#[derive(Debug, Deserialize, Validate)]
pub struct VendorRegistration {
    #[validate(length(min = 1, message = "vendor_name must not be empty"))]
    pub vendor_name: String,
    #[validate(length(min = 3, message = "phone_number is too short"))]
    pub phone_number: String,
    pub address_id: Uuid,
    pub required_deposit_gr: Option<i64>,
    #[serde(default)]
    pub offered_service_type_ids: Vec<Uuid>,
}

/// Projection returned by `GET /user/me`
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_profile: Option<Client>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_profile: Option<Vendor>,
}

/// User and role-profile service
pub struct UserService {
    pool: PgPool,
    events: Arc<dyn EventPublisher>,
}

impl UserService {
    pub fn new(pool: PgPool, events: Arc<dyn EventPublisher>) -> Self {
        Self { pool, events }
    }

    /// Look up a user by email, creating the identity record on first login.
    /// Existing users get their last-login timestamp touched.
    pub async fn get_or_create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> ApiResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO app_user (first_name, last_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET last_login = now()
            RETURNING *
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn get_user(&self, user_id: Uuid) -> ApiResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM app_user WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Resolve the user's role-profile with a single query.
    pub async fn resolve_role(&self, user_id: Uuid) -> ApiResult<Role> {
        let row = sqlx::query(
            r#"
            SELECT
                a.admin_id,
                c.client_id, c.phone_number AS client_phone, c.address_id AS client_address_id,
                c.is_active AS client_is_active,
                c.registration_fee_payment_id AS client_fee_payment_id,
                v.vendor_id, v.vendor_name, v.phone_number AS vendor_phone,
                v.address_id AS vendor_address_id, v.required_deposit_gr,
                v.is_active AS vendor_is_active,
                v.registration_fee_payment_id AS vendor_fee_payment_id
            FROM app_user u
            LEFT JOIN admin a ON a.admin_id = u.user_id
            LEFT JOIN client c ON c.client_id = u.user_id
            LEFT JOIN vendor v ON v.vendor_id = u.user_id
            WHERE u.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if row.try_get::<Option<Uuid>, _>("admin_id")?.is_some() {
            return Ok(Role::Admin);
        }

        if let Some(vendor_id) = row.try_get::<Option<Uuid>, _>("vendor_id")? {
            return Ok(Role::Vendor(Vendor {
                vendor_id,
                vendor_name: row.try_get("vendor_name")?,
                phone_number: row.try_get("vendor_phone")?,
                address_id: row.try_get("vendor_address_id")?,
                required_deposit_gr: row.try_get("required_deposit_gr")?,
                is_active: row.try_get("vendor_is_active")?,
                registration_fee_payment_id: row.try_get("vendor_fee_payment_id")?,
            }));
        }

        if let Some(client_id) = row.try_get::<Option<Uuid>, _>("client_id")? {
            return Ok(Role::Client(Client {
                client_id,
                phone_number: row.try_get("client_phone")?,
                address_id: row.try_get("client_address_id")?,
                is_active: row.try_get("client_is_active")?,
                registration_fee_payment_id: row.try_get("client_fee_payment_id")?,
            }));
        }

        Ok(Role::Unassigned)
    }

    /// Create a client profile for a profile-less user.
    pub async fn register_as_client(
        &self,
        user_id: Uuid,
        registration: ClientRegistration,
    ) -> ApiResult<Client> {
        registration.validate()?;

        let mut tx = self.pool.begin().await?;

        let user = self.fetch_user_in_tx(&mut tx, user_id).await?;
        self.ensure_no_profile(&mut tx, user_id).await?;

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO client (client_id, phone_number, address_id, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&registration.phone_number)
        .bind(registration.address_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_constraint_violation(e, "client references a missing address"))?;

        tx.commit().await?;

        self.emit_registered(&user, "client").await;

        Ok(client)
    }

    /// Create a vendor profile for a profile-less user.
    pub async fn register_as_vendor(
        &self,
        user_id: Uuid,
        registration: VendorRegistration,
    ) -> ApiResult<Vendor> {
        registration.validate()?;

        if let Some(deposit) = registration.required_deposit_gr {
            if deposit <= 0 {
                return Err(ApiError::ValidationError(
                    "required_deposit_gr must be greater than zero".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;

        let user = self.fetch_user_in_tx(&mut tx, user_id).await?;
        self.ensure_no_profile(&mut tx, user_id).await?;

        let vendor = sqlx::query_as::<_, Vendor>(
            r#"
            INSERT INTO vendor (
                vendor_id, vendor_name, phone_number, address_id,
                required_deposit_gr, is_active
            )
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&registration.vendor_name)
        .bind(&registration.phone_number)
        .bind(registration.address_id)
        .bind(registration.required_deposit_gr)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_constraint_violation(e, "vendor references a missing address"))?;

        for service_type_id in &registration.offered_service_type_ids {
            sqlx::query(
                r#"
                INSERT INTO vendor_offered_service_type (vendor_id, service_type_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(service_type_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| on_constraint_violation(e, "offered service type does not exist"))?;
        }

        tx.commit().await?;

        self.emit_registered(&user, "vendor").await;

        Ok(vendor)
    }

    /// User identity plus resolved role, for the `/user/me` projection.
    pub async fn me(&self, user_id: Uuid) -> ApiResult<MeResponse> {
        let user = self.get_user(user_id).await?;
        let role = self.resolve_role(user_id).await?;

        let (client_profile, vendor_profile) = match &role {
            Role::Client(c) => (Some(c.clone()), None),
            Role::Vendor(v) => (None, Some(v.clone())),
            _ => (None, None),
        };

        Ok(MeResponse {
            user_id: user.user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: role.as_str().to_string(),
            client_profile,
            vendor_profile,
        })
    }

    async fn fetch_user_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> ApiResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM app_user WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn ensure_no_profile(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> ApiResult<()> {
        let row = sqlx::query(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM admin WHERE admin_id = $1) AS is_admin,
                EXISTS(SELECT 1 FROM vendor WHERE vendor_id = $1) AS is_vendor,
                EXISTS(SELECT 1 FROM client WHERE client_id = $1) AS is_client
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

        if row.try_get::<bool, _>("is_vendor")? {
            return Err(ApiError::InvalidState("User is already a vendor".to_string()));
        }
        if row.try_get::<bool, _>("is_client")? {
            return Err(ApiError::InvalidState("User is already a client".to_string()));
        }
        if row.try_get::<bool, _>("is_admin")? {
            return Err(ApiError::InvalidState("User already has a profile".to_string()));
        }

        Ok(())
    }

    async fn emit_registered(&self, user: &User, role: &str) {
        emit_best_effort(
            self.events.as_ref(),
            topics::USERS_REGISTERED,
            &user.user_id.to_string(),
            json!({ "user_id": user.user_id, "email": user.email, "role": role }),
        )
        .await;
    }
}

//! Database connection and schema management
//!
//! The pool is constructed once at process start and passed by reference
//! into every request-scoped service; there is no global connection state.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Database connection error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to initialize schema: {0}")]
    SchemaError(String),
}

/// Create a database connection pool
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!("Connecting to database at {}", config.database_url_masked());

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url())
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    tracing::info!("Database connection pool created successfully");

    Ok(pool)
}

/// Check database connectivity (for health checks)
pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    Ok(())
}

/// Idempotent DDL, executed statement by statement at startup.
const SCHEMA: &[&str] = &[
    r#"DO $$ BEGIN
        CREATE TYPE visit_status AS ENUM (
            'pending', 'vendor_rejected', 'client_rejected', 'confirmed',
            'in_progress', 'completed', 'cancelled'
        );
    EXCEPTION WHEN duplicate_object THEN NULL; END $$"#,
    r#"DO $$ BEGIN
        CREATE TYPE payment_status AS ENUM (
            'processing', 'cancelled', 'error', 'succeeded', 'refunded'
        );
    EXCEPTION WHEN duplicate_object THEN NULL; END $$"#,
    r#"CREATE TABLE IF NOT EXISTS app_user (
        user_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        registration_timestamp TIMESTAMPTZ NOT NULL DEFAULT now(),
        last_login TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS address (
        address_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        street TEXT NOT NULL,
        city TEXT NOT NULL,
        state_or_region TEXT NOT NULL,
        country TEXT NOT NULL,
        zip_code TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS payment (
        payment_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        stripe_charge_id TEXT NOT NULL UNIQUE,
        value_gr BIGINT NOT NULL CHECK (value_gr > 0),
        currency TEXT NOT NULL,
        transaction_timestamp TIMESTAMPTZ NOT NULL,
        status payment_status NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS admin (
        admin_id UUID PRIMARY KEY REFERENCES app_user(user_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS client (
        client_id UUID PRIMARY KEY REFERENCES app_user(user_id),
        phone_number TEXT NOT NULL,
        address_id UUID UNIQUE REFERENCES address(address_id),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        registration_fee_payment_id UUID UNIQUE REFERENCES payment(payment_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS vendor (
        vendor_id UUID PRIMARY KEY REFERENCES app_user(user_id),
        vendor_name TEXT NOT NULL,
        phone_number TEXT NOT NULL,
        address_id UUID NOT NULL UNIQUE REFERENCES address(address_id),
        required_deposit_gr BIGINT CHECK (required_deposit_gr IS NULL OR required_deposit_gr > 0),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        registration_fee_payment_id UUID UNIQUE REFERENCES payment(payment_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS service_type (
        service_type_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS vendor_offered_service_type (
        vendor_id UUID NOT NULL REFERENCES vendor(vendor_id),
        service_type_id UUID NOT NULL REFERENCES service_type(service_type_id),
        PRIMARY KEY (vendor_id, service_type_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS visit (
        visit_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        client_id UUID NOT NULL REFERENCES client(client_id),
        vendor_id UUID NOT NULL REFERENCES vendor(vendor_id),
        start_timestamp TIMESTAMPTZ NOT NULL,
        end_timestamp TIMESTAMPTZ NOT NULL,
        description TEXT NOT NULL,
        service_type_id UUID NOT NULL REFERENCES service_type(service_type_id),
        address_id UUID NOT NULL REFERENCES address(address_id),
        deposit_id UUID UNIQUE REFERENCES payment(payment_id),
        verification_code TEXT,
        review_opinion_score INT CHECK (
            review_opinion_score IS NULL
            OR review_opinion_score BETWEEN 1 AND 5
        ),
        review_comment TEXT,
        status visit_status NOT NULL,
        CHECK (review_opinion_score IS NULL OR status = 'completed')
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_visit_client ON visit(client_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_visit_vendor ON visit(vendor_id)"#,
    r#"CREATE TABLE IF NOT EXISTS chat_session (
        chat_session_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES app_user(user_id),
        vendor_id UUID NOT NULL REFERENCES vendor(vendor_id),
        visit_id UUID REFERENCES visit(visit_id),
        UNIQUE (visit_id, user_id, vendor_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS attachment (
        attachment_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        object_uri TEXT NOT NULL,
        creation_timestamp TIMESTAMPTZ NOT NULL DEFAULT now(),
        modification_timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS visit_description_attachment (
        visit_id UUID NOT NULL REFERENCES visit(visit_id),
        attachment_id UUID NOT NULL REFERENCES attachment(attachment_id),
        PRIMARY KEY (visit_id, attachment_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS visit_review_attachment (
        visit_id UUID NOT NULL REFERENCES visit(visit_id),
        attachment_id UUID NOT NULL REFERENCES attachment(attachment_id),
        PRIMARY KEY (visit_id, attachment_id)
    )"#,
];

/// Create the relational schema if it does not exist yet
pub async fn init_schema(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DbError::SchemaError(e.to_string()))?;
    }

    tracing::info!("Database schema ready");

    Ok(())
}

//! `PostgreSQL` registration store.
//!
//! # Example
//!
//! ```no_run
//! use infest_registration::store::PostgresRegistrationStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgres://localhost/infest").await?;
//! let store = PostgresRegistrationStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use super::{InsertOutcome, PaymentUpdate, RegistrationStore};
use crate::error::StoreError;
use crate::types::{PaymentMode, PaymentStatus, Registration, TicketId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Unique index backing ticket id uniqueness.
const TICKET_ID_INDEX: &str = "registrations_ticket_id_key";

const COLUMNS: &str = "id, name, email, phone, whatsapp, college, year, department, events, \
                       project_link, payment_mode, payment_id, payment_status, ticket_id, \
                       qr_code, registration_time";

/// `PostgreSQL`-backed registration store.
#[derive(Clone)]
pub struct PostgresRegistrationStore {
    pool: PgPool,
}

impl PostgresRegistrationStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Raw row as stored.
#[derive(sqlx::FromRow)]
struct RegistrationRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    whatsapp: String,
    college: String,
    year: String,
    department: String,
    events: Vec<String>,
    project_link: Option<String>,
    payment_mode: String,
    payment_id: Option<String>,
    payment_status: String,
    ticket_id: String,
    qr_code: String,
    registration_time: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = StoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.to_string(),
            reason,
        };
        let payment_mode = PaymentMode::parse(&row.payment_mode)
            .ok_or_else(|| corrupt(format!("unknown payment_mode {:?}", row.payment_mode)))?;
        let payment_status = PaymentStatus::parse(&row.payment_status)
            .ok_or_else(|| corrupt(format!("unknown payment_status {:?}", row.payment_status)))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            whatsapp: row.whatsapp,
            college: row.college,
            year: row.year,
            department: row.department,
            events: row.events,
            project_link: row.project_link,
            payment_mode,
            payment_id: row.payment_id,
            payment_status,
            ticket_id: TicketId::from_stored(row.ticket_id),
            qr_code: row.qr_code,
            registration_time: row.registration_time,
        })
    }
}

fn decode(row: Option<RegistrationRow>) -> Result<Option<Registration>, StoreError> {
    row.map(Registration::try_from).transpose()
}

#[async_trait]
impl RegistrationStore for PostgresRegistrationStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError> {
        let row: Option<RegistrationRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM registrations WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        decode(row)
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Registration>, StoreError> {
        let row: Option<RegistrationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM registrations
             WHERE payment_id = $1
             ORDER BY registration_time
             LIMIT 1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;
        decode(row)
    }

    async fn insert_if_absent(
        &self,
        registration: &Registration,
    ) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(&format!(
            "INSERT INTO registrations ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (email) DO NOTHING"
        ))
        .bind(registration.id)
        .bind(&registration.name)
        .bind(&registration.email)
        .bind(&registration.phone)
        .bind(&registration.whatsapp)
        .bind(&registration.college)
        .bind(&registration.year)
        .bind(&registration.department)
        .bind(&registration.events)
        .bind(&registration.project_link)
        .bind(registration.payment_mode.as_str())
        .bind(&registration.payment_id)
        .bind(registration.payment_status.as_str())
        .bind(registration.ticket_id.as_str())
        .bind(&registration.qr_code)
        .bind(registration.registration_time)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(InsertOutcome::Inserted),
            Ok(_) => self
                .find_by_email(&registration.email)
                .await?
                .map(InsertOutcome::EmailTaken)
                .ok_or_else(|| {
                    StoreError::Database(format!(
                        "email conflict for {} but no registration found",
                        registration.email
                    ))
                }),
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(TICKET_ID_INDEX) =>
            {
                Ok(InsertOutcome::TicketIdTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn mark_paid(&self, payment_id: &str) -> Result<PaymentUpdate, StoreError> {
        let row: Option<RegistrationRow> = sqlx::query_as(&format!(
            "UPDATE registrations SET payment_status = 'paid'
             WHERE id = (
                 SELECT id FROM registrations
                 WHERE payment_id = $1
                 ORDER BY registration_time
                 LIMIT 1
             )
             AND payment_status = 'pending'
             RETURNING {COLUMNS}"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(updated) = decode(row)? {
            return Ok(PaymentUpdate::Updated(updated));
        }

        Ok(match self.find_by_payment_id(payment_id).await? {
            Some(existing) => PaymentUpdate::AlreadySettled(existing),
            None => PaymentUpdate::NotFound,
        })
    }
}

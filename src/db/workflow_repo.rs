// src/db/workflow_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{UnitOfWork, WorkflowStore},
    models::{
        appointment::{Appointment, AppointmentStatus, SelectedService},
        commanda::{AppliedPayment, Commanda, CommandaItem, CommandaStatus, SettlementOutcome},
    },
};

// Código do Postgres para violação de unicidade (PK ou índice parcial)
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
//  LINHAS (coleções filhas ficam em JSONB)
// =============================================================================

#[derive(FromRow)]
struct AppointmentRow {
    id: Uuid,
    customer_id: Uuid,
    professional_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    services: Json<Vec<SelectedService>>,
    status: AppointmentStatus,
    commanda_id: Option<Uuid>,
    rescheduled_from: Option<Uuid>,
    notes: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            customer_id: row.customer_id,
            professional_id: row.professional_id,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            services: row.services.0,
            status: row.status,
            commanda_id: row.commanda_id,
            rescheduled_from: row.rescheduled_from,
            notes: row.notes,
            completed_at: row.completed_at,
            canceled_at: row.canceled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

#[derive(FromRow)]
struct CommandaRow {
    id: Uuid,
    appointment_id: Option<Uuid>,
    customer_id: Option<Uuid>,
    professional_id: Option<Uuid>,
    status: CommandaStatus,
    items: Json<Vec<CommandaItem>>,
    payments: Json<Vec<AppliedPayment>>,
    discount: Decimal,
    leave_change_as_tip: bool,
    allow_debt: bool,
    outcome: Option<Json<SettlementOutcome>>,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl From<CommandaRow> for Commanda {
    fn from(row: CommandaRow) -> Self {
        Commanda {
            id: row.id,
            appointment_id: row.appointment_id,
            customer_id: row.customer_id,
            professional_id: row.professional_id,
            status: row.status,
            items: row.items.0,
            payments: row.payments.0,
            discount: row.discount,
            leave_change_as_tip: row.leave_change_as_tip,
            allow_debt: row.allow_debt,
            outcome: row.outcome.map(|o| o.0),
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            canceled_at: row.canceled_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

/// Conflito de versão ou de unicidade vira `ConcurrentModification`.
fn map_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return AppError::ConcurrentModification;
        }
    }
    AppError::DatabaseError(err)
}

// =============================================================================
//  ESCRITA
// =============================================================================

async fn save_appointment(
    tx: &mut Transaction<'_, Postgres>,
    a: &Appointment,
) -> Result<i64, AppError> {
    let version = if a.version == 0 {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO appointments (
                id, customer_id, professional_id, starts_at, ends_at, services, status,
                commanda_id, rescheduled_from, notes, completed_at, canceled_at,
                created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 1)
            RETURNING version
            "#,
        )
        .bind(a.id)
        .bind(a.customer_id)
        .bind(a.professional_id)
        .bind(a.starts_at)
        .bind(a.ends_at)
        .bind(Json(&a.services))
        .bind(a.status)
        .bind(a.commanda_id)
        .bind(a.rescheduled_from)
        .bind(a.notes.as_deref())
        .bind(a.completed_at)
        .bind(a.canceled_at)
        .bind(a.created_at)
        .bind(a.updated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?
    } else {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE appointments SET
                customer_id = $2, professional_id = $3, starts_at = $4, ends_at = $5,
                services = $6, status = $7, commanda_id = $8, rescheduled_from = $9,
                notes = $10, completed_at = $11, canceled_at = $12, updated_at = $13,
                version = version + 1
            WHERE id = $1 AND version = $14
            RETURNING version
            "#,
        )
        .bind(a.id)
        .bind(a.customer_id)
        .bind(a.professional_id)
        .bind(a.starts_at)
        .bind(a.ends_at)
        .bind(Json(&a.services))
        .bind(a.status)
        .bind(a.commanda_id)
        .bind(a.rescheduled_from)
        .bind(a.notes.as_deref())
        .bind(a.completed_at)
        .bind(a.canceled_at)
        .bind(a.updated_at)
        .bind(a.version)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_write_error)?
        .ok_or(AppError::ConcurrentModification)?
    };
    Ok(version)
}

async fn save_commanda(
    tx: &mut Transaction<'_, Postgres>,
    c: &Commanda,
) -> Result<i64, AppError> {
    let outcome = c.outcome.as_ref().map(Json);

    let version = if c.version == 0 {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO commandas (
                id, appointment_id, customer_id, professional_id, status, items, payments,
                discount, leave_change_as_tip, allow_debt, outcome,
                opened_at, closed_at, canceled_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 1)
            RETURNING version
            "#,
        )
        .bind(c.id)
        .bind(c.appointment_id)
        .bind(c.customer_id)
        .bind(c.professional_id)
        .bind(c.status)
        .bind(Json(&c.items))
        .bind(Json(&c.payments))
        .bind(c.discount)
        .bind(c.leave_change_as_tip)
        .bind(c.allow_debt)
        .bind(outcome)
        .bind(c.opened_at)
        .bind(c.closed_at)
        .bind(c.canceled_at)
        .bind(c.updated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?
    } else {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE commandas SET
                appointment_id = $2, customer_id = $3, professional_id = $4, status = $5,
                items = $6, payments = $7, discount = $8, leave_change_as_tip = $9,
                allow_debt = $10, outcome = $11, closed_at = $12, canceled_at = $13,
                updated_at = $14, version = version + 1
            WHERE id = $1 AND version = $15
            RETURNING version
            "#,
        )
        .bind(c.id)
        .bind(c.appointment_id)
        .bind(c.customer_id)
        .bind(c.professional_id)
        .bind(c.status)
        .bind(Json(&c.items))
        .bind(Json(&c.payments))
        .bind(c.discount)
        .bind(c.leave_change_as_tip)
        .bind(c.allow_debt)
        .bind(outcome)
        .bind(c.closed_at)
        .bind(c.canceled_at)
        .bind(c.updated_at)
        .bind(c.version)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_write_error)?
        .ok_or(AppError::ConcurrentModification)?
    };
    Ok(version)
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn load_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT id, customer_id, professional_id, starts_at, ends_at, services, status,
                   commanda_id, rescheduled_from, notes, completed_at, canceled_at,
                   created_at, updated_at, version
            FROM appointments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Appointment::from))
    }

    async fn load_commanda(&self, id: Uuid) -> Result<Option<Commanda>, AppError> {
        let row = sqlx::query_as::<_, CommandaRow>(
            r#"
            SELECT id, appointment_id, customer_id, professional_id, status, items, payments,
                   discount, leave_change_as_tip, allow_debt, outcome,
                   opened_at, closed_at, canceled_at, updated_at, version
            FROM commandas
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Commanda::from))
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<UnitOfWork, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut persisted = UnitOfWork::new();

        // Agendamentos antes (FK das comandas)
        for mut a in unit.appointments {
            a.version = save_appointment(&mut tx, &a).await?;
            persisted.appointments.push(a);
        }

        // Comandas que deixam de estar abertas vêm antes das abertas, senão o
        // índice parcial acusa duas OPEN para o mesmo agendamento.
        let mut commandas = unit.commandas;
        commandas.sort_by_key(|c| c.is_open());
        for mut c in commandas {
            c.version = save_commanda(&mut tx, &c).await?;
            persisted.commandas.push(c);
        }

        // Se algo falhou acima, o drop da transação faz o rollback
        tx.commit().await?;
        Ok(persisted)
    }
}

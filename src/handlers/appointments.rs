// src/handlers/appointments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        appointment::{
            AppointmentAction, AppointmentEdit, AppointmentView, NewAppointment, SelectedService,
            Slot,
        },
        commanda::CommandaView,
        workflow::TransitionView,
    },
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectedServicePayload {
    pub service_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Corte Masculino")]
    pub name: String,

    #[schema(example = "50.00")]
    pub price: Decimal,
}

impl From<SelectedServicePayload> for SelectedService {
    fn from(p: SelectedServicePayload) -> Self {
        SelectedService {
            service_id: p.service_id,
            name: p.name,
            price: p.price,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentPayload {
    pub customer_id: Uuid,
    pub professional_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    #[serde(default)]
    #[validate(nested)]
    pub services: Vec<SelectedServicePayload>,

    #[validate(length(max = 1000, message = "too_long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditAppointmentPayload {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub professional_id: Option<Uuid>,

    pub services: Option<Vec<SelectedServicePayload>>,

    #[validate(length(max = 1000, message = "too_long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    #[schema(example = "confirm")]
    pub action: AppointmentAction,
}

/// Sem horário, a remarcação repete o horário original.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReschedulePayload {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub professional_id: Option<Uuid>,
}

impl ReschedulePayload {
    fn into_slot(self) -> Result<Option<Slot>, AppError> {
        match (self.starts_at, self.ends_at) {
            (Some(starts_at), Some(ends_at)) => Ok(Some(Slot {
                starts_at,
                ends_at,
                professional_id: self.professional_id,
            })),
            (None, None) if self.professional_id.is_none() => Ok(None),
            _ => Err(AppError::InvalidSchedule(
                "informe início e término juntos".to_string(),
            )),
        }
    }
}

// =============================================================================
//  HANDLERS
// =============================================================================

// POST /api/appointments
#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "Appointments",
    request_body = BookAppointmentPayload,
    responses(
        (status = 201, description = "Agendamento criado (CREATED)", body = AppointmentView),
        (status = 400, description = "Horário ou serviços inválidos")
    )
)]
pub async fn book_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<BookAppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewAppointment {
        customer_id: payload.customer_id,
        professional_id: payload.professional_id,
        starts_at: payload.starts_at,
        ends_at: payload.ends_at,
        services: payload.services.into_iter().map(Into::into).collect(),
        notes: payload.notes,
    };

    let view = app_state
        .coordinator
        .book(input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/appointments/{id}
#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Agendamento com o menu de ações", body = AppointmentView),
        (status = 404, description = "Não encontrado")
    )
)]
pub async fn get_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .coordinator
        .get_appointment(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// PATCH /api/appointments/{id}
#[utoipa::path(
    patch,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    request_body = EditAppointmentPayload,
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Agendamento editado", body = AppointmentView),
        (status = 409, description = "Agendamento já encerrado")
    )
)]
pub async fn edit_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditAppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;
    for service in payload.services.iter().flatten() {
        service.validate().map_err(|e| {
            AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store)
        })?;
    }

    let changes = AppointmentEdit {
        starts_at: payload.starts_at,
        ends_at: payload.ends_at,
        professional_id: payload.professional_id,
        services: payload
            .services
            .map(|s| s.into_iter().map(Into::into).collect()),
        notes: payload.notes,
    };

    let view = app_state
        .coordinator
        .edit(id, changes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// POST /api/appointments/{id}/transition
#[utoipa::path(
    post,
    path = "/api/appointments/{id}/transition",
    tag = "Appointments",
    request_body = TransitionPayload,
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Transição aplicada", body = TransitionView),
        (status = 409, description = "Ação não permitida no status atual"),
        (status = 422, description = "Sem comanda ou comanda não pode fechar")
    )
)]
pub async fn transition_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .coordinator
        .transition(id, payload.action)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// POST /api/appointments/{id}/reschedule
#[utoipa::path(
    post,
    path = "/api/appointments/{id}/reschedule",
    tag = "Appointments",
    request_body = ReschedulePayload,
    params(("id" = Uuid, Path, description = "ID do agendamento encerrado")),
    responses(
        (status = 201, description = "Novo agendamento criado", body = AppointmentView),
        (status = 409, description = "Agendamento ainda não encerrado")
    )
)]
pub async fn reschedule_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let slot = payload
        .into_slot()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let view = app_state
        .coordinator
        .reschedule(id, slot)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(view)))
}

// POST /api/appointments/{id}/commanda
#[utoipa::path(
    post,
    path = "/api/appointments/{id}/commanda",
    tag = "Appointments",
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Comanda aberta do agendamento", body = CommandaView),
        (status = 409, description = "Agendamento já encerrado")
    )
)]
pub async fn open_appointment_commanda(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .coordinator
        .open_ledger(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// src/models/appointment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Created,
    Confirmed,
    CheckedIn,
    InService,
    AwaitingPayment,
    Done,
    NoShow,
    Canceled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 8] = [
        AppointmentStatus::Created,
        AppointmentStatus::Confirmed,
        AppointmentStatus::CheckedIn,
        AppointmentStatus::InService,
        AppointmentStatus::AwaitingPayment,
        AppointmentStatus::Done,
        AppointmentStatus::NoShow,
        AppointmentStatus::Canceled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Done | AppointmentStatus::NoShow | AppointmentStatus::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Created => "CREATED",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::CheckedIn => "CHECKED_IN",
            AppointmentStatus::InService => "IN_SERVICE",
            AppointmentStatus::AwaitingPayment => "AWAITING_PAYMENT",
            AppointmentStatus::Done => "DONE",
            AppointmentStatus::NoShow => "NO_SHOW",
            AppointmentStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ações do operador sobre um agendamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    Confirm,
    CheckIn,
    StartService,
    FinishService,
    CloseSettlement,
    CompleteWithoutSettlement,
    NoShow,
    Cancel,
    Reschedule,
    Edit,
    OpenLedger,
}

impl AppointmentAction {
    pub const ALL: [AppointmentAction; 11] = [
        AppointmentAction::Confirm,
        AppointmentAction::CheckIn,
        AppointmentAction::StartService,
        AppointmentAction::FinishService,
        AppointmentAction::CloseSettlement,
        AppointmentAction::CompleteWithoutSettlement,
        AppointmentAction::NoShow,
        AppointmentAction::Cancel,
        AppointmentAction::Reschedule,
        AppointmentAction::Edit,
        AppointmentAction::OpenLedger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentAction::Confirm => "confirm",
            AppointmentAction::CheckIn => "check_in",
            AppointmentAction::StartService => "start_service",
            AppointmentAction::FinishService => "finish_service",
            AppointmentAction::CloseSettlement => "close_settlement",
            AppointmentAction::CompleteWithoutSettlement => "complete_without_settlement",
            AppointmentAction::NoShow => "no_show",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::Reschedule => "reschedule",
            AppointmentAction::Edit => "edit",
            AppointmentAction::OpenLedger => "open_ledger",
        }
    }
}

impl std::fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Structs ---

/// Serviço escolhido no agendamento, com o preço capturado na hora da reserva.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectedService {
    pub service_id: Uuid,
    #[schema(example = "Corte Masculino")]
    pub name: String,
    #[schema(example = "50.00")]
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub professional_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub services: Vec<SelectedService>,
    pub status: AppointmentStatus,

    // Comanda vinculada (no máximo uma aberta por vez)
    pub commanda_id: Option<Uuid>,
    // Agendamento terminal que este aqui substitui
    pub rescheduled_from: Option<Uuid>,

    #[schema(example = "Cliente prefere tesoura")]
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Versão otimista; 0 = ainda não persistido.
    #[schema(example = 3)]
    pub version: i64,
}

/// Dados de uma nova reserva.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub customer_id: Uuid,
    pub professional_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub services: Vec<SelectedService>,
    pub notes: Option<String>,
}

/// Edição de horário/profissional/serviços. Campos `None` ficam como estão.
#[derive(Debug, Clone, Default)]
pub struct AppointmentEdit {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub professional_id: Option<Uuid>,
    pub services: Option<Vec<SelectedService>>,
    pub notes: Option<String>,
}

/// Novo horário para uma remarcação.
#[derive(Debug, Clone)]
pub struct Slot {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub professional_id: Option<Uuid>,
}

/// O que o front recebe: agendamento + menu de ações da tabela oficial.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub available_actions: Vec<AppointmentAction>,
}

// src/models/workflow.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{appointment::AppointmentView, commanda::CommandaView};

/// Resposta de uma transição: o agendamento e o que mudou junto com ele.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionView {
    pub appointment: AppointmentView,
    /// Comanda criada, fechada ou cancelada pela transição
    pub commanda: Option<CommandaView>,
    /// Novo agendamento (só na remarcação)
    pub rescheduled: Option<AppointmentView>,
}

/// Comanda fechada e, se vinculada, o agendamento concluído na mesma gravação.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosedLedgerView {
    pub commanda: CommandaView,
    pub appointment: Option<AppointmentView>,
}

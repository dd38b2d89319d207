use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::{
        appointment::{AppointmentAction, AppointmentStatus},
        commanda::{CloseReason, CommandaStatus},
    },
};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Regras de negócio violadas são valores de retorno normais; só banco e
// bugs internos viram 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Ciclo de vida do agendamento ---
    #[error("Transição inválida: '{action}' não é permitida a partir de {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: AppointmentAction,
    },

    #[error("Não há itens nem comanda aberta para encerrar o atendimento")]
    MissingLedger,

    #[error("Horário inválido: {0}")]
    InvalidSchedule(String),

    // --- Comanda / acerto ---
    #[error("Comanda não está aberta (status {status})")]
    LedgerClosed { status: CommandaStatus },

    #[error("Comanda não pode ser fechada: {0:?}")]
    Unclosable(Vec<CloseReason>),

    #[error("Forma de pagamento desconhecida ou inativa: {0}")]
    UnknownInstrument(Uuid),

    #[error("Valor inválido: {0}")]
    InvalidAmount(Decimal),

    #[error("Quantidade inválida: {0}")]
    InvalidQuantity(Decimal),

    #[error("Desconto inválido: {0}")]
    InvalidDiscount(String),

    #[error("Tabela de taxas inválida: {0}")]
    InvalidFeeSchedule(String),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Registro alterado por outra operação; recarregue e tente de novo")]
    ConcurrentModification,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

/// Erro já traduzido e pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    /// Chave de tradução de cada variante.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::MissingLedger => "missing_ledger",
            AppError::InvalidSchedule(_) => "invalid_schedule",
            AppError::LedgerClosed { .. } => "ledger_closed",
            AppError::Unclosable(_) => "unclosable",
            AppError::UnknownInstrument(_) => "unknown_instrument",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::InvalidQuantity(_) => "invalid_quantity",
            AppError::InvalidDiscount(_) => "invalid_discount",
            AppError::InvalidFeeSchedule(_) => "invalid_fee_schedule",
            AppError::ResourceNotFound(_) => "not_found",
            AppError::ConcurrentModification => "concurrent_modification",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidSchedule(_)
            | AppError::UnknownInstrument(_)
            | AppError::InvalidAmount(_)
            | AppError::InvalidQuantity(_)
            | AppError::InvalidDiscount(_)
            | AppError::InvalidFeeSchedule(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. }
            | AppError::LedgerClosed { .. }
            | AppError::ConcurrentModification => StatusCode::CONFLICT,
            AppError::MissingLedger | AppError::Unclosable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Detalhes estruturados para o front renderizar (todas as pendências de
    /// fechamento, todos os campos inválidos etc).
    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::InvalidTransition { from, action } => {
                Some(json!({ "from": from, "action": action }))
            }
            AppError::LedgerClosed { status } => Some(json!({ "status": status })),
            AppError::Unclosable(reasons) => Some(json!({ "reasons": reasons })),
            AppError::UnknownInstrument(id) => Some(json!({ "instrumentId": id })),
            AppError::InvalidAmount(v) | AppError::InvalidQuantity(v) => {
                Some(json!({ "value": v }))
            }
            AppError::InvalidDiscount(m)
            | AppError::InvalidSchedule(m)
            | AppError::InvalidFeeSchedule(m)
            | AppError::ResourceNotFound(m) => Some(json!({ "detail": m })),
            _ => None,
        }
    }

    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        ApiError {
            status,
            error: i18n.translate(&locale.0, self.message_key()),
            details: self.details(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

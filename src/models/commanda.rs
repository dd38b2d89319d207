// src/models/commanda.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::{error::AppError, money};
use crate::models::catalog::{InstrumentType, ItemKind};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "commanda_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandaStatus {
    Open,
    Closed,
    Canceled,
}

impl std::fmt::Display for CommandaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CommandaStatus::Open => "OPEN",
            CommandaStatus::Closed => "CLOSED",
            CommandaStatus::Canceled => "CANCELED",
        })
    }
}

/// Base do desconto de um item. Só uma é autoritativa por vez.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "basis", content = "amount", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemDiscount {
    Value(Decimal),
    Percentage(Decimal),
}

/// Por que uma comanda não pode fechar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    Shortfall {
        #[schema(example = "20.00")]
        amount: Decimal,
    },
    DebtNotAuthorized,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Shortfall { amount } => write!(f, "shortfall={}", amount),
            CloseReason::DebtNotAuthorized => f.write_str("debt_not_authorized"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseMode {
    /// Fechada pelo motor de acerto (pago ou fiado autorizado)
    Settled,
    /// Concluída sem acerto; o restante fica em aberto
    Unsettled,
}

/// Destino do troco no fechamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverageDisposition {
    None,
    ChangeOwed {
        amount: Decimal,
    },
    Gratuity {
        amount: Decimal,
        #[serde(rename = "professionalId")]
        professional_id: Option<Uuid>,
    },
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommandaItem {
    pub id: Uuid,
    pub kind: ItemKind,
    pub catalog_ref: Uuid,
    #[schema(example = "Corte Feminino")]
    pub name: String,
    #[schema(example = "50.00")]
    pub unit_price: Decimal,
    #[schema(example = "1")]
    pub quantity: Decimal,
    /// Última base de desconto informada (só para exibição)
    pub discount: Option<ItemDiscount>,
    #[schema(example = "5.00")]
    pub discount_value: Decimal,
    #[schema(example = "45.00")]
    pub final_price: Decimal,
}

impl CommandaItem {
    pub fn gross(&self) -> Result<Decimal, AppError> {
        Ok(money::round_money(money::checked_mul(self.unit_price, self.quantity)?))
    }
}

/// Pagamento aplicado, com a taxa da forma de pagamento congelada no momento
/// da aplicação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPayment {
    pub id: Uuid,
    pub commanda_id: Uuid,
    pub instrument_id: Uuid,
    #[schema(example = "Crédito Visa")]
    pub instrument_name: String,
    pub instrument_type: InstrumentType,

    #[schema(example = "100.00")]
    pub gross_amount: Decimal,
    #[schema(example = "3.00")]
    pub percentage_fee: Decimal,
    #[schema(example = "0.50")]
    pub fixed_fee: Decimal,
    #[schema(example = "3.50")]
    pub fee_amount: Decimal,
    #[schema(example = "96.50")]
    pub net_amount: Decimal,

    pub settlement_delay_days: i32,
    #[schema(value_type = String, format = Date, example = "2024-07-01")]
    pub expected_settlement_date: NaiveDate,
    pub applied_at: DateTime<Utc>,
}

/// Resultado gravado no fechamento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOutcome {
    pub mode: CloseMode,
    pub total: Decimal,
    pub total_received: Decimal,
    pub total_net: Decimal,
    pub total_fees: Decimal,
    /// Fiado (allow_debt) ou saldo de uma conclusão sem acerto
    pub amount_owed: Decimal,
    pub overage: OverageDisposition,
}

/// A comanda (conta aberta de um atendimento).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Commanda {
    pub id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub status: CommandaStatus,
    pub items: Vec<CommandaItem>,
    pub payments: Vec<AppliedPayment>,
    #[schema(example = "0.00")]
    pub discount: Decimal,
    pub leave_change_as_tip: bool,
    pub allow_debt: bool,
    pub outcome: Option<SettlementOutcome>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[schema(example = 1)]
    pub version: i64,
}

impl Commanda {
    pub fn subtotal(&self) -> Result<Decimal, AppError> {
        money::checked_sum(self.items.iter().map(|i| i.final_price))
    }

    /// subtotal - desconto da comanda, nunca negativo
    pub fn total(&self) -> Result<Decimal, AppError> {
        Ok(money::floor_zero(self.subtotal()? - self.discount))
    }

    pub fn total_received(&self) -> Result<Decimal, AppError> {
        money::checked_sum(self.payments.iter().map(|p| p.gross_amount))
    }

    pub fn is_open(&self) -> bool {
        self.status == CommandaStatus::Open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    #[schema(example = "50.00")]
    pub subtotal: Decimal,
    #[schema(example = "0.00")]
    pub discount: Decimal,
    #[schema(example = "50.00")]
    pub total: Decimal,
    #[schema(example = "30.00")]
    pub total_received: Decimal,
    #[schema(example = "30.00")]
    pub total_net: Decimal,
    #[schema(example = "0.00")]
    pub total_fees: Decimal,
    #[schema(example = "20.00")]
    pub shortfall: Decimal,
    #[schema(example = "0.00")]
    pub overage: Decimal,
}

/// Comanda + totais derivados, como o front exibe.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommandaView {
    #[serde(flatten)]
    pub commanda: Commanda,
    pub summary: SettlementSummary,
}

// src/models/catalog.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::{error::AppError, money};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "item_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Service,
    Product,
    Package,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "instrument_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentType {
    Cash,
    Pix,
    Credit,
    Debit,
    Transfer,
    Invoice, // Boleto
    Other,
}

// --- Structs ---

/// Entrada do catálogo (serviço, produto ou pacote) com o preço vigente.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: Uuid,
    pub kind: ItemKind,
    #[schema(example = "Escova Progressiva")]
    pub name: String,
    #[schema(example = "180.00")]
    pub unit_price: Decimal,
    pub is_active: bool,
}

/// Forma de pagamento com sua tabela de taxas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstrument {
    pub id: Uuid,
    #[schema(example = "Crédito Visa")]
    pub name: String,
    pub instrument_type: InstrumentType,
    #[schema(example = "VISA")]
    pub card_brand: Option<String>,

    /// Percentual (0..=100) cobrado sobre o valor bruto
    #[schema(example = "3.00")]
    pub percentage_fee: Decimal,
    /// Valor fixo cobrado uma vez por pagamento
    #[schema(example = "0.50")]
    pub fixed_fee: Decimal,
    #[schema(example = 30)]
    pub settlement_delay_days: i32,
    pub is_active: bool,
}

impl PaymentInstrument {
    /// Valida as invariantes da tabela de taxas.
    pub fn validate_fees(&self) -> Result<(), AppError> {
        if !money::is_valid_percentage(self.percentage_fee) {
            return Err(AppError::InvalidFeeSchedule(format!(
                "percentual {} fora de 0..=100",
                self.percentage_fee
            )));
        }
        if self.fixed_fee < Decimal::ZERO || self.fixed_fee > money::MAX_MONEY {
            return Err(AppError::InvalidFeeSchedule(format!(
                "taxa fixa {} fora de 0..={}",
                self.fixed_fee,
                money::MAX_MONEY
            )));
        }
        if self.settlement_delay_days < 0 {
            return Err(AppError::InvalidFeeSchedule(format!(
                "prazo de repasse negativo ({})",
                self.settlement_delay_days
            )));
        }
        Ok(())
    }
}

// src/db/catalog_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{CatalogLookup, PaymentInstrumentLookup},
    models::catalog::{CatalogEntry, ItemKind, PaymentInstrument},
};

/// Leitura do catálogo e das formas de pagamento mantidos pelo cadastro.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogLookup for PgCatalog {
    async fn find_entry(&self, kind: ItemKind, id: Uuid) -> Result<Option<CatalogEntry>, AppError> {
        let entry = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT id, kind, name, unit_price, is_active
            FROM catalog_entries
            WHERE id = $1 AND kind = $2
            "#,
        )
        .bind(id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }
}

#[async_trait]
impl PaymentInstrumentLookup for PgCatalog {
    async fn find_instrument(&self, id: Uuid) -> Result<Option<PaymentInstrument>, AppError> {
        let instrument = sqlx::query_as::<_, PaymentInstrument>(
            r#"
            SELECT id, name, instrument_type, card_brand, percentage_fee, fixed_fee,
                   settlement_delay_days, is_active
            FROM payment_instruments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(instrument)
    }
}

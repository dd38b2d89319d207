// src/db/memory_repo.rs

//! Implementação em memória dos repositórios. Usada nos testes e quando o
//! servidor sobe sem `DATABASE_URL`.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{CatalogLookup, PaymentInstrumentLookup, UnitOfWork, WorkflowStore},
    models::{
        appointment::Appointment,
        catalog::{CatalogEntry, ItemKind, PaymentInstrument},
        commanda::Commanda,
    },
};

#[derive(Default)]
struct Tables {
    appointments: HashMap<Uuid, Appointment>,
    commandas: HashMap<Uuid, Commanda>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_version(stored: Option<i64>, expected: i64) -> Result<(), AppError> {
    if stored.unwrap_or(0) != expected {
        return Err(AppError::ConcurrentModification);
    }
    Ok(())
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn load_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn load_commanda(&self, id: Uuid) -> Result<Option<Commanda>, AppError> {
        Ok(self.tables.read().await.commandas.get(&id).cloned())
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<UnitOfWork, AppError> {
        let mut tables = self.tables.write().await;

        // Valida tudo antes de gravar qualquer coisa
        for a in &unit.appointments {
            check_version(tables.appointments.get(&a.id).map(|s| s.version), a.version)?;
        }
        for c in &unit.commandas {
            check_version(tables.commandas.get(&c.id).map(|s| s.version), c.version)?;
            if c.is_open() {
                if let Some(appointment_id) = c.appointment_id {
                    let duplicate = tables.commandas.values().any(|other| {
                        other.id != c.id
                            && other.is_open()
                            && other.appointment_id == Some(appointment_id)
                            && !unit.commandas.iter().any(|u| u.id == other.id && !u.is_open())
                    });
                    if duplicate {
                        return Err(AppError::ConcurrentModification);
                    }
                }
            }
        }

        let mut persisted = UnitOfWork::new();
        for mut a in unit.appointments {
            a.version += 1;
            tables.appointments.insert(a.id, a.clone());
            persisted.appointments.push(a);
        }
        for mut c in unit.commandas {
            c.version += 1;
            tables.commandas.insert(c.id, c.clone());
            persisted.commandas.push(c);
        }
        Ok(persisted)
    }
}

/// Catálogo e formas de pagamento em memória.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    entries: Arc<RwLock<HashMap<Uuid, CatalogEntry>>>,
    instruments: Arc<RwLock<HashMap<Uuid, PaymentInstrument>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_entry(&self, entry: CatalogEntry) {
        self.entries.write().await.insert(entry.id, entry);
    }

    /// Rejeita tabelas de taxa inválidas, como o cadastro real faria.
    pub async fn upsert_instrument(&self, instrument: PaymentInstrument) -> Result<(), AppError> {
        instrument.validate_fees()?;
        self.instruments
            .write()
            .await
            .insert(instrument.id, instrument);
        Ok(())
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn find_entry(&self, kind: ItemKind, id: Uuid) -> Result<Option<CatalogEntry>, AppError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&id)
            .filter(|e| e.kind == kind)
            .cloned())
    }
}

#[async_trait]
impl PaymentInstrumentLookup for InMemoryCatalog {
    async fn find_instrument(&self, id: Uuid) -> Result<Option<PaymentInstrument>, AppError> {
        Ok(self.instruments.read().await.get(&id).cloned())
    }
}

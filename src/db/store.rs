// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        appointment::Appointment,
        catalog::{CatalogEntry, ItemKind, PaymentInstrument},
        commanda::Commanda,
    },
};

/// Tudo que uma operação alterou e precisa ser gravado junto.
///
/// `version` de cada agregado é a versão lida (0 = novo). O commit grava
/// tudo ou nada e devolve as cópias persistidas, com a versão incrementada.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    pub appointments: Vec<Appointment>,
    pub commandas: Vec<Commanda>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appointment(mut self, appointment: Appointment) -> Self {
        self.appointments.push(appointment);
        self
    }

    pub fn commanda(mut self, commanda: Commanda) -> Self {
        self.commandas.push(commanda);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty() && self.commandas.is_empty()
    }

    /// Primeiro agendamento gravado com esse id.
    pub fn take_appointment(&mut self, id: Uuid) -> Option<Appointment> {
        let pos = self.appointments.iter().position(|a| a.id == id)?;
        Some(self.appointments.swap_remove(pos))
    }

    pub fn take_commanda(&mut self, id: Uuid) -> Option<Commanda> {
        let pos = self.commandas.iter().position(|c| c.id == id)?;
        Some(self.commandas.swap_remove(pos))
    }
}

/// Persistência dos dois agregados.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn load_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError>;

    async fn load_commanda(&self, id: Uuid) -> Result<Option<Commanda>, AppError>;

    /// Grava a unidade atomicamente. Versão divergente em qualquer item
    /// => `ConcurrentModification` e nada é gravado.
    async fn commit(&self, unit: UnitOfWork) -> Result<UnitOfWork, AppError>;
}

/// Preço e nome vigentes de um item do catálogo.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn find_entry(&self, kind: ItemKind, id: Uuid) -> Result<Option<CatalogEntry>, AppError>;
}

/// Cadastro das formas de pagamento (somente leitura para o motor).
#[async_trait]
pub trait PaymentInstrumentLookup: Send + Sync {
    async fn find_instrument(&self, id: Uuid) -> Result<Option<PaymentInstrument>, AppError>;
}

// src/services/workflow.rs

//! Orquestra agendamento e comanda para quem está de fora (handlers, jobs).
//!
//! Cada operação trava os ids envolvidos (sempre agendamento antes da
//! comanda), recarrega os agregados, aplica a regra pura e grava tudo que
//! mudou num único `UnitOfWork`.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, locks::EntityLocks},
    db::store::{CatalogLookup, PaymentInstrumentLookup, UnitOfWork, WorkflowStore},
    models::{
        appointment::{
            Appointment, AppointmentAction, AppointmentEdit, AppointmentView, NewAppointment, Slot,
        },
        catalog::ItemKind,
        commanda::{AppliedPayment, Commanda, CommandaItem, CommandaView, SettlementSummary},
        workflow::{ClosedLedgerView, TransitionView},
    },
    services::{
        ledger::{self, DiscountInput},
        lifecycle, settlement,
    },
};

#[derive(Clone)]
pub struct WorkflowCoordinator {
    store: Arc<dyn WorkflowStore>,
    catalog: Arc<dyn CatalogLookup>,
    instruments: Arc<dyn PaymentInstrumentLookup>,
    appointment_locks: EntityLocks,
    commanda_locks: EntityLocks,
}

pub fn appointment_view(appointment: Appointment) -> AppointmentView {
    let available_actions = lifecycle::available_actions(appointment.status);
    AppointmentView {
        appointment,
        available_actions,
    }
}

pub fn commanda_view(commanda: Commanda) -> Result<CommandaView, AppError> {
    let summary = settlement::summarize(&commanda)?;
    Ok(CommandaView { commanda, summary })
}

impl WorkflowCoordinator {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        catalog: Arc<dyn CatalogLookup>,
        instruments: Arc<dyn PaymentInstrumentLookup>,
    ) -> Self {
        Self {
            store,
            catalog,
            instruments,
            appointment_locks: EntityLocks::new(),
            commanda_locks: EntityLocks::new(),
        }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    async fn load_appointment(&self, id: Uuid) -> Result<Appointment, AppError> {
        self.store
            .load_appointment(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Agendamento {}", id)))
    }

    async fn load_commanda(&self, id: Uuid) -> Result<Commanda, AppError> {
        self.store
            .load_commanda(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Comanda {}", id)))
    }

    async fn load_linked(&self, appointment: &Appointment) -> Result<Option<Commanda>, AppError> {
        match appointment.commanda_id {
            Some(id) => self.store.load_commanda(id).await,
            None => Ok(None),
        }
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<AppointmentView, AppError> {
        Ok(appointment_view(self.load_appointment(id).await?))
    }

    pub async fn get_ledger(&self, id: Uuid) -> Result<CommandaView, AppError> {
        commanda_view(self.load_commanda(id).await?)
    }

    pub async fn summarize(&self, ledger_id: Uuid) -> Result<SettlementSummary, AppError> {
        settlement::summarize(&self.load_commanda(ledger_id).await?)
    }

    // =========================================================================
    //  AGENDAMENTO
    // =========================================================================

    pub async fn book(&self, input: NewAppointment) -> Result<AppointmentView, AppError> {
        let appointment = lifecycle::book(input, Utc::now())?;
        let id = appointment.id;

        let mut saved = self
            .store
            .commit(UnitOfWork::new().appointment(appointment))
            .await?;
        let appointment = take_appointment(&mut saved, id)?;

        tracing::info!(
            appointment_id = %appointment.id,
            professional_id = %appointment.professional_id,
            "Agendamento criado"
        );
        Ok(appointment_view(appointment))
    }

    pub async fn edit(
        &self,
        appointment_id: Uuid,
        changes: AppointmentEdit,
    ) -> Result<AppointmentView, AppError> {
        let _guard = self.appointment_locks.lock(appointment_id).await;
        let current = self.load_appointment(appointment_id).await?;

        let updated = lifecycle::edit(&current, changes, Utc::now())?;
        let mut saved = self.store.commit(UnitOfWork::new().appointment(updated)).await?;

        tracing::info!(appointment_id = %appointment_id, "Agendamento editado");
        Ok(appointment_view(take_appointment(&mut saved, appointment_id)?))
    }

    /// Aplica uma ação da tabela. A comanda vinculada (se houver) é travada e
    /// gravada junto com o agendamento.
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        action: AppointmentAction,
    ) -> Result<TransitionView, AppError> {
        let _appointment_guard = self.appointment_locks.lock(appointment_id).await;
        let current = self.load_appointment(appointment_id).await?;

        let _commanda_guard = match current.commanda_id {
            Some(id) => Some(self.commanda_locks.lock(id).await),
            None => None,
        };
        let linked = self.load_linked(&current).await?;

        let outcome = lifecycle::apply(&current, action, linked.as_ref(), Utc::now())
            .inspect_err(|e| {
                tracing::warn!(
                    appointment_id = %appointment_id,
                    from = %current.status,
                    action = %action,
                    "Transição rejeitada: {}", e
                )
            })?;

        let mut unit = UnitOfWork::new();
        let appointment_changed = outcome.appointment != current;
        if appointment_changed {
            unit = unit.appointment(outcome.appointment.clone());
        }
        let commanda_id = outcome.commanda.as_ref().map(|c| c.id);
        if let Some(c) = outcome.commanda {
            unit = unit.commanda(c);
        }
        let created_id = outcome.created.as_ref().map(|a| a.id);
        if let Some(created) = outcome.created {
            unit = unit.appointment(created);
        }

        let mut saved = if unit.is_empty() {
            UnitOfWork::new()
        } else {
            self.store.commit(unit).await?
        };

        let appointment = if appointment_changed {
            take_appointment(&mut saved, appointment_id)?
        } else {
            current.clone()
        };
        let commanda = commanda_id.and_then(|id| saved.take_commanda(id));
        let rescheduled = created_id.and_then(|id| saved.take_appointment(id));

        tracing::info!(
            appointment_id = %appointment_id,
            from = %current.status,
            to = %appointment.status,
            action = %action,
            commanda_id = ?commanda.as_ref().map(|c| c.id),
            "Transição aplicada"
        );

        Ok(TransitionView {
            appointment: appointment_view(appointment),
            commanda: commanda.map(commanda_view).transpose()?,
            rescheduled: rescheduled.map(appointment_view),
        })
    }

    /// Remarca um agendamento terminal num novo horário (ou no mesmo, se `slot` vier vazio).
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        slot: Option<Slot>,
    ) -> Result<AppointmentView, AppError> {
        let _guard = self.appointment_locks.lock(appointment_id).await;
        let original = self.load_appointment(appointment_id).await?;

        let created = lifecycle::reschedule(&original, slot, Utc::now())?;
        let created_id = created.id;
        let mut saved = self.store.commit(UnitOfWork::new().appointment(created)).await?;

        tracing::info!(
            appointment_id = %appointment_id,
            rescheduled_to = %created_id,
            "Agendamento remarcado"
        );
        Ok(appointment_view(take_appointment(&mut saved, created_id)?))
    }

    // =========================================================================
    //  ABERTURA DE COMANDA
    // =========================================================================

    /// Devolve a comanda aberta do agendamento, criando-a se preciso.
    pub async fn open_ledger(&self, appointment_id: Uuid) -> Result<CommandaView, AppError> {
        let _appointment_guard = self.appointment_locks.lock(appointment_id).await;
        let current = self.load_appointment(appointment_id).await?;

        let _commanda_guard = match current.commanda_id {
            Some(id) => Some(self.commanda_locks.lock(id).await),
            None => None,
        };
        let linked = self.load_linked(&current).await?;

        let (updated, commanda, created) =
            lifecycle::ensure_ledger(&current, linked.as_ref(), Utc::now())?;
        if !created {
            return commanda_view(commanda);
        }

        let commanda_id = commanda.id;
        let mut saved = self
            .store
            .commit(UnitOfWork::new().appointment(updated).commanda(commanda))
            .await?;

        tracing::info!(
            appointment_id = %appointment_id,
            commanda_id = %commanda_id,
            "Comanda aberta para o agendamento"
        );
        commanda_view(take_commanda(&mut saved, commanda_id)?)
    }

    pub async fn open_ad_hoc_ledger(
        &self,
        customer_id: Option<Uuid>,
        professional_id: Option<Uuid>,
    ) -> Result<CommandaView, AppError> {
        let commanda = ledger::open_ad_hoc(customer_id, professional_id, Utc::now());
        let id = commanda.id;
        let mut saved = self.store.commit(UnitOfWork::new().commanda(commanda)).await?;

        tracing::info!(commanda_id = %id, "Comanda avulsa aberta");
        commanda_view(take_commanda(&mut saved, id)?)
    }

    // =========================================================================
    //  ITENS, DESCONTOS E PAGAMENTOS
    // =========================================================================

    /// Trava a comanda, aplica `f` numa cópia e grava. Se `f` falhar, ou se
    /// o resultado não puder ser totalizado, nada é gravado.
    async fn mutate_ledger<T, F>(
        &self,
        ledger_id: Uuid,
        f: F,
    ) -> Result<(T, CommandaView), AppError>
    where
        F: FnOnce(&mut Commanda) -> Result<T, AppError>,
    {
        let _guard = self.commanda_locks.lock(ledger_id).await;
        let mut commanda = self.load_commanda(ledger_id).await?;

        let result = f(&mut commanda)?;
        settlement::summarize(&commanda)?;
        let mut saved = self.store.commit(UnitOfWork::new().commanda(commanda)).await?;
        Ok((result, commanda_view(take_commanda(&mut saved, ledger_id)?)?))
    }

    pub async fn add_item(
        &self,
        ledger_id: Uuid,
        kind: ItemKind,
        catalog_ref: Uuid,
        quantity: Decimal,
        unit_price_override: Option<Decimal>,
    ) -> Result<(CommandaItem, CommandaView), AppError> {
        let entry = self
            .catalog
            .find_entry(kind, catalog_ref)
            .await?
            .ok_or_else(|| {
                AppError::ResourceNotFound(format!("Item de catálogo {}", catalog_ref))
            })?;

        let (item, view) = self
            .mutate_ledger(ledger_id, |c| {
                ledger::add_item(c, &entry, quantity, unit_price_override, Utc::now())
            })
            .await?;

        tracing::info!(
            commanda_id = %ledger_id,
            item_id = %item.id,
            final_price = %item.final_price,
            "Item adicionado"
        );
        Ok((item, view))
    }

    pub async fn remove_item(
        &self,
        ledger_id: Uuid,
        item_id: Uuid,
    ) -> Result<CommandaView, AppError> {
        let ((), view) = self
            .mutate_ledger(ledger_id, |c| ledger::remove_item(c, item_id, Utc::now()))
            .await?;
        tracing::info!(commanda_id = %ledger_id, item_id = %item_id, "Item removido");
        Ok(view)
    }

    pub async fn update_item_quantity(
        &self,
        ledger_id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
    ) -> Result<(CommandaItem, CommandaView), AppError> {
        self.mutate_ledger(ledger_id, |c| {
            ledger::update_item_quantity(c, item_id, quantity, Utc::now())
        })
        .await
    }

    pub async fn apply_item_discount(
        &self,
        ledger_id: Uuid,
        item_id: Uuid,
        input: DiscountInput,
    ) -> Result<(CommandaItem, CommandaView), AppError> {
        self.mutate_ledger(ledger_id, |c| {
            ledger::apply_item_discount(c, item_id, input, Utc::now())
        })
        .await
    }

    pub async fn set_ticket_discount(
        &self,
        ledger_id: Uuid,
        amount: Decimal,
    ) -> Result<CommandaView, AppError> {
        let ((), view) = self
            .mutate_ledger(ledger_id, |c| ledger::set_ticket_discount(c, amount, Utc::now()))
            .await?;
        Ok(view)
    }

    pub async fn set_settlement_options(
        &self,
        ledger_id: Uuid,
        allow_debt: Option<bool>,
        leave_change_as_tip: Option<bool>,
    ) -> Result<CommandaView, AppError> {
        let ((), view) = self
            .mutate_ledger(ledger_id, |c| {
                ledger::set_settlement_options(c, allow_debt, leave_change_as_tip, Utc::now())
            })
            .await?;
        tracing::info!(
            commanda_id = %ledger_id,
            allow_debt = view.commanda.allow_debt,
            leave_change_as_tip = view.commanda.leave_change_as_tip,
            "Opções de acerto alteradas"
        );
        Ok(view)
    }

    pub async fn add_payment(
        &self,
        ledger_id: Uuid,
        instrument_id: Uuid,
        gross_amount: Decimal,
    ) -> Result<(AppliedPayment, CommandaView), AppError> {
        let instrument = self.instruments.find_instrument(instrument_id).await?;

        let (payment, view) = self
            .mutate_ledger(ledger_id, |c| {
                let instrument = instrument.as_ref();
                settlement::add_payment(c, instrument_id, instrument, gross_amount, Utc::now())
            })
            .await
            .inspect_err(|e| {
                tracing::debug!(commanda_id = %ledger_id, "Pagamento rejeitado: {}", e)
            })?;

        tracing::info!(
            commanda_id = %ledger_id,
            payment_id = %payment.id,
            instrument = %payment.instrument_name,
            gross = %payment.gross_amount,
            net = %payment.net_amount,
            "Pagamento aplicado"
        );
        Ok((payment, view))
    }

    pub async fn remove_payment(
        &self,
        ledger_id: Uuid,
        payment_id: Uuid,
    ) -> Result<CommandaView, AppError> {
        let ((), view) = self
            .mutate_ledger(ledger_id, |c| settlement::remove_payment(c, payment_id, Utc::now()))
            .await?;
        tracing::info!(commanda_id = %ledger_id, payment_id = %payment_id, "Pagamento removido");
        Ok(view)
    }

    // =========================================================================
    //  FECHAMENTO
    // =========================================================================

    /// Fecha a comanda. Vinculada a um agendamento, o fechamento é a ação
    /// `close_settlement` e os dois são gravados juntos; avulsa, fecha sozinha.
    pub async fn close(&self, ledger_id: Uuid) -> Result<ClosedLedgerView, AppError> {
        // O vínculo com o agendamento nunca muda, então dá para lê-lo sem lock
        let appointment_id = self.load_commanda(ledger_id).await?.appointment_id;

        let result = match appointment_id {
            Some(appointment_id) => self.close_linked(appointment_id, ledger_id).await,
            None => self.close_ad_hoc(ledger_id).await,
        };

        match &result {
            Ok(closed) => tracing::info!(
                commanda_id = %ledger_id,
                total = %closed.commanda.summary.total,
                received = %closed.commanda.summary.total_received,
                "Comanda fechada"
            ),
            Err(e) => tracing::warn!(commanda_id = %ledger_id, "Fechamento recusado: {}", e),
        }
        result
    }

    async fn close_linked(
        &self,
        appointment_id: Uuid,
        ledger_id: Uuid,
    ) -> Result<ClosedLedgerView, AppError> {
        let _appointment_guard = self.appointment_locks.lock(appointment_id).await;
        let _commanda_guard = self.commanda_locks.lock(ledger_id).await;

        let appointment = self.load_appointment(appointment_id).await?;
        let commanda = self.load_commanda(ledger_id).await?;
        // Quem chega depois de um fechamento vê LedgerClosed, não a transição
        ledger::ensure_open(&commanda)?;

        let outcome = lifecycle::apply(
            &appointment,
            AppointmentAction::CloseSettlement,
            Some(&commanda),
            Utc::now(),
        )?;

        let mut unit = UnitOfWork::new().appointment(outcome.appointment);
        if let Some(c) = outcome.commanda {
            unit = unit.commanda(c);
        }
        let mut saved = self.store.commit(unit).await?;

        Ok(ClosedLedgerView {
            commanda: commanda_view(take_commanda(&mut saved, ledger_id)?)?,
            appointment: Some(appointment_view(take_appointment(&mut saved, appointment_id)?)),
        })
    }

    async fn close_ad_hoc(&self, ledger_id: Uuid) -> Result<ClosedLedgerView, AppError> {
        let ((), view) = self
            .mutate_ledger(ledger_id, |c| settlement::close(c, Utc::now()))
            .await?;
        Ok(ClosedLedgerView {
            commanda: view,
            appointment: None,
        })
    }
}

fn take_appointment(unit: &mut UnitOfWork, id: Uuid) -> Result<Appointment, AppError> {
    unit.take_appointment(id).ok_or_else(|| {
        AppError::InternalServerError(anyhow::anyhow!("agendamento {} não voltou do commit", id))
    })
}

fn take_commanda(unit: &mut UnitOfWork, id: Uuid) -> Result<Commanda, AppError> {
    unit.take_commanda(id).ok_or_else(|| {
        AppError::InternalServerError(anyhow::anyhow!("comanda {} não voltou do commit", id))
    })
}

// src/services/lifecycle.rs

//! Máquina de estados do agendamento.
//!
//! A tabela `TRANSITIONS` é a única fonte de verdade: o motor valida contra
//! ela e o menu de ações do front (`available_actions`) é derivado dela.
//! Não existe atalho CREATED -> CHECKED_IN nem CONFIRMED -> IN_SERVICE.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money},
    models::{
        appointment::{
            Appointment, AppointmentAction, AppointmentEdit, AppointmentStatus, NewAppointment,
            SelectedService, Slot,
        },
        commanda::Commanda,
    },
    services::{ledger, settlement},
};

use AppointmentAction as A;
use AppointmentStatus as S;

/// Destino de uma ação na tabela.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Status(AppointmentStatus),
    /// Remarcação: o original fica intacto e nasce um novo em CREATED
    NewAppointment,
}

pub const TRANSITIONS: [(AppointmentStatus, AppointmentAction, Target); 16] = [
    (S::Created, A::Confirm, Target::Status(S::Confirmed)),
    (S::Created, A::Cancel, Target::Status(S::Canceled)),
    (S::Confirmed, A::CheckIn, Target::Status(S::CheckedIn)),
    (S::Confirmed, A::NoShow, Target::Status(S::NoShow)),
    (S::Confirmed, A::Cancel, Target::Status(S::Canceled)),
    (S::CheckedIn, A::StartService, Target::Status(S::InService)),
    (S::CheckedIn, A::NoShow, Target::Status(S::NoShow)),
    (S::CheckedIn, A::Cancel, Target::Status(S::Canceled)),
    (S::InService, A::FinishService, Target::Status(S::AwaitingPayment)),
    (S::InService, A::Cancel, Target::Status(S::Canceled)),
    (S::AwaitingPayment, A::CloseSettlement, Target::Status(S::Done)),
    (S::AwaitingPayment, A::CompleteWithoutSettlement, Target::Status(S::Done)),
    (S::AwaitingPayment, A::Cancel, Target::Status(S::Canceled)),
    (S::Done, A::Reschedule, Target::NewAppointment),
    (S::NoShow, A::Reschedule, Target::NewAppointment),
    (S::Canceled, A::Reschedule, Target::NewAppointment),
];

/// Destino de `action` a partir de `from`, se a tabela permitir.
pub fn target_of(from: AppointmentStatus, action: AppointmentAction) -> Option<Target> {
    TRANSITIONS
        .iter()
        .find(|(f, a, _)| *f == from && *a == action)
        .map(|(_, _, t)| *t)
}

/// `edit` e `open_ledger` valem em qualquer estado não terminal e não mudam o status.
fn is_status_preserving(action: AppointmentAction) -> bool {
    matches!(action, A::Edit | A::OpenLedger)
}

pub fn is_permitted(from: AppointmentStatus, action: AppointmentAction) -> bool {
    if is_status_preserving(action) {
        return !from.is_terminal();
    }
    target_of(from, action).is_some()
}

/// Menu de ações para o front, na ordem da tabela.
pub fn available_actions(status: AppointmentStatus) -> Vec<AppointmentAction> {
    let mut actions: Vec<AppointmentAction> = TRANSITIONS
        .iter()
        .filter(|(f, _, _)| *f == status)
        .map(|(_, a, _)| *a)
        .collect();

    if !status.is_terminal() {
        actions.push(A::Edit);
        actions.push(A::OpenLedger);
    }
    actions
}

fn ensure_permitted(appointment: &Appointment, action: AppointmentAction) -> Result<(), AppError> {
    if is_permitted(appointment.status, action) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: appointment.status,
            action,
        })
    }
}

/// O que uma transição produziu e precisa ser gravado junto.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// O agendamento alvo, já atualizado (na remarcação, intacto)
    pub appointment: Appointment,
    /// Comanda criada ou alterada pela transição
    pub commanda: Option<Commanda>,
    /// Novo agendamento criado pela remarcação
    pub created: Option<Appointment>,
}

impl TransitionOutcome {
    fn only(appointment: Appointment) -> Self {
        Self {
            appointment,
            commanda: None,
            created: None,
        }
    }
}

// =============================================================================
//  CRIAÇÃO / EDIÇÃO
// =============================================================================

fn validate_slot(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), AppError> {
    if ends_at <= starts_at {
        return Err(AppError::InvalidSchedule(format!(
            "término ({}) precisa ser depois do início ({})",
            ends_at, starts_at
        )));
    }
    Ok(())
}

fn validate_services(services: &[SelectedService]) -> Result<(), AppError> {
    for s in services {
        if !money::is_valid_price(s.price) {
            return Err(AppError::InvalidAmount(s.price));
        }
    }
    // Viram itens da comanda, então a soma também tem de caber
    let sum = money::checked_sum(services.iter().map(|s| s.price))?;
    if sum > money::MAX_MONEY {
        return Err(AppError::InvalidAmount(sum));
    }
    Ok(())
}

/// Nova reserva, sempre em CREATED.
pub fn book(input: NewAppointment, now: DateTime<Utc>) -> Result<Appointment, AppError> {
    validate_slot(input.starts_at, input.ends_at)?;
    validate_services(&input.services)?;

    Ok(Appointment {
        id: Uuid::new_v4(),
        customer_id: input.customer_id,
        professional_id: input.professional_id,
        starts_at: input.starts_at,
        ends_at: input.ends_at,
        services: input.services,
        status: S::Created,
        commanda_id: None,
        rescheduled_from: None,
        notes: input.notes,
        completed_at: None,
        canceled_at: None,
        created_at: now,
        updated_at: now,
        version: 0,
    })
}

/// Edita horário/profissional/serviços sem mexer no status. Uma comanda já
/// aberta não é tocada (os preços dela já foram capturados).
pub fn edit(
    appointment: &Appointment,
    changes: AppointmentEdit,
    now: DateTime<Utc>,
) -> Result<Appointment, AppError> {
    ensure_permitted(appointment, A::Edit)?;

    let mut updated = appointment.clone();
    if let Some(starts_at) = changes.starts_at {
        updated.starts_at = starts_at;
    }
    if let Some(ends_at) = changes.ends_at {
        updated.ends_at = ends_at;
    }
    validate_slot(updated.starts_at, updated.ends_at)?;

    if let Some(professional_id) = changes.professional_id {
        updated.professional_id = professional_id;
    }
    if let Some(services) = changes.services {
        validate_services(&services)?;
        updated.services = services;
    }
    if changes.notes.is_some() {
        updated.notes = changes.notes;
    }
    updated.updated_at = now;
    Ok(updated)
}

/// Remarcação: cria um novo agendamento a partir de um terminal.
pub fn reschedule(
    appointment: &Appointment,
    slot: Option<Slot>,
    now: DateTime<Utc>,
) -> Result<Appointment, AppError> {
    ensure_permitted(appointment, A::Reschedule)?;

    let (starts_at, ends_at, professional_id) = match slot {
        Some(s) => (
            s.starts_at,
            s.ends_at,
            s.professional_id.unwrap_or(appointment.professional_id),
        ),
        None => (
            appointment.starts_at,
            appointment.ends_at,
            appointment.professional_id,
        ),
    };

    let mut created = book(
        NewAppointment {
            customer_id: appointment.customer_id,
            professional_id,
            starts_at,
            ends_at,
            services: appointment.services.clone(),
            notes: appointment.notes.clone(),
        },
        now,
    )?;
    created.rescheduled_from = Some(appointment.id);
    Ok(created)
}

// =============================================================================
//  COMANDA VINCULADA
// =============================================================================

/// Devolve a comanda aberta vinculada ou cria uma nova, semeada 1:1 com os
/// serviços do agendamento. O bool indica se foi criada agora.
pub fn ensure_ledger(
    appointment: &Appointment,
    linked: Option<&Commanda>,
    now: DateTime<Utc>,
) -> Result<(Appointment, Commanda, bool), AppError> {
    ensure_permitted(appointment, A::OpenLedger)?;

    if let Some(existing) = linked.filter(|c| c.is_open()) {
        return Ok((appointment.clone(), existing.clone(), false));
    }

    let commanda = ledger::open_for_appointment(appointment, now);
    let mut updated = appointment.clone();
    updated.commanda_id = Some(commanda.id);
    updated.updated_at = now;
    Ok((updated, commanda, true))
}

// =============================================================================
//  TRANSIÇÕES
// =============================================================================

/// Aplica `action` ao agendamento. `linked` é a comanda apontada por
/// `appointment.commanda_id`, se houver.
///
/// Não persiste nada: quem chama grava `appointment`, `commanda` e `created`
/// numa única unidade atômica.
pub fn apply(
    appointment: &Appointment,
    action: AppointmentAction,
    linked: Option<&Commanda>,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, AppError> {
    ensure_permitted(appointment, action)?;

    let open_ledger = linked.filter(|c| c.is_open());

    match action {
        A::Edit => Ok(TransitionOutcome::only(appointment.clone())),

        A::OpenLedger => {
            let (updated, commanda, created) = ensure_ledger(appointment, linked, now)?;
            Ok(TransitionOutcome {
                appointment: updated,
                commanda: created.then_some(commanda),
                created: None,
            })
        }

        A::Reschedule => Ok(TransitionOutcome {
            appointment: appointment.clone(),
            commanda: None,
            created: Some(reschedule(appointment, None, now)?),
        }),

        A::Confirm | A::CheckIn | A::StartService => {
            Ok(TransitionOutcome::only(move_to(appointment, action, now)))
        }

        A::FinishService => {
            // Reaproveita a comanda aberta; senão precisa de serviços para semear
            let commanda = match open_ledger {
                Some(_) => None,
                None if !appointment.services.is_empty() => {
                    Some(ledger::open_for_appointment(appointment, now))
                }
                None => return Err(AppError::MissingLedger),
            };

            let mut updated = move_to(appointment, action, now);
            if let Some(c) = &commanda {
                updated.commanda_id = Some(c.id);
            }
            Ok(TransitionOutcome {
                appointment: updated,
                commanda,
                created: None,
            })
        }

        A::CloseSettlement => {
            let mut commanda = linked_or_missing(linked)?;
            settlement::close(&mut commanda, now)?;
            let mut updated = move_to(appointment, action, now);
            updated.completed_at = Some(now);
            Ok(TransitionOutcome {
                appointment: updated,
                commanda: Some(commanda),
                created: None,
            })
        }

        A::CompleteWithoutSettlement => {
            let commanda = match open_ledger {
                Some(c) => {
                    let mut c = c.clone();
                    settlement::close_unsettled(&mut c, now)?;
                    Some(c)
                }
                None => None,
            };
            let mut updated = move_to(appointment, action, now);
            updated.completed_at = Some(now);
            Ok(TransitionOutcome {
                appointment: updated,
                commanda,
                created: None,
            })
        }

        A::Cancel | A::NoShow => {
            // Nenhuma comanda fica aberta pendurada num agendamento terminal
            let commanda = match open_ledger {
                Some(c) => {
                    let mut c = c.clone();
                    ledger::cancel(&mut c, now)?;
                    Some(c)
                }
                None => None,
            };
            let mut updated = move_to(appointment, action, now);
            if action == A::Cancel {
                updated.canceled_at = Some(now);
            }
            Ok(TransitionOutcome {
                appointment: updated,
                commanda,
                created: None,
            })
        }
    }
}

fn linked_or_missing(linked: Option<&Commanda>) -> Result<Commanda, AppError> {
    linked.cloned().ok_or(AppError::MissingLedger)
}

fn move_to(
    appointment: &Appointment,
    action: AppointmentAction,
    now: DateTime<Utc>,
) -> Appointment {
    let mut updated = appointment.clone();
    if let Some(Target::Status(to)) = target_of(appointment.status, action) {
        updated.status = to;
    }
    updated.updated_at = now;
    updated
}

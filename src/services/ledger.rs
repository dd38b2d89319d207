// src/services/ledger.rs

//! Itens e descontos da comanda. Tudo aqui é síncrono e puro: recebe a
//! comanda carregada, muta em memória e devolve erro sem efeito parcial.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money},
    models::{
        appointment::Appointment,
        catalog::{CatalogEntry, ItemKind},
        commanda::{Commanda, CommandaItem, CommandaStatus, ItemDiscount},
    },
};

/// Desconto como o operador digitou: valor, percentual ou os dois.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscountInput {
    pub value: Option<Decimal>,
    pub percentage: Option<Decimal>,
}

pub fn ensure_open(commanda: &Commanda) -> Result<(), AppError> {
    if commanda.status != CommandaStatus::Open {
        return Err(AppError::LedgerClosed {
            status: commanda.status,
        });
    }
    Ok(())
}

// =============================================================================
//  ABERTURA
// =============================================================================

pub fn open_ad_hoc(
    customer_id: Option<Uuid>,
    professional_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Commanda {
    Commanda {
        id: Uuid::new_v4(),
        appointment_id: None,
        customer_id,
        professional_id,
        status: CommandaStatus::Open,
        items: Vec::new(),
        payments: Vec::new(),
        discount: Decimal::ZERO,
        leave_change_as_tip: false,
        allow_debt: false,
        outcome: None,
        opened_at: now,
        closed_at: None,
        canceled_at: None,
        updated_at: now,
        version: 0,
    }
}

/// Comanda do agendamento, com um item SERVICE por serviço escolhido
/// (preço capturado na reserva, quantidade 1).
pub fn open_for_appointment(appointment: &Appointment, now: DateTime<Utc>) -> Commanda {
    let mut commanda = open_ad_hoc(
        Some(appointment.customer_id),
        Some(appointment.professional_id),
        now,
    );
    commanda.appointment_id = Some(appointment.id);
    commanda.items = appointment
        .services
        .iter()
        .map(|s| CommandaItem {
            id: Uuid::new_v4(),
            kind: ItemKind::Service,
            catalog_ref: s.service_id,
            name: s.name.clone(),
            unit_price: s.price,
            quantity: Decimal::ONE,
            discount: None,
            discount_value: Decimal::ZERO,
            final_price: money::to_cents_scale(money::floor_zero(s.price)),
        })
        .collect();
    commanda
}

pub fn cancel(commanda: &mut Commanda, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_open(commanda)?;
    commanda.status = CommandaStatus::Canceled;
    commanda.canceled_at = Some(now);
    commanda.updated_at = now;
    Ok(())
}

// =============================================================================
//  ITENS
// =============================================================================

fn validate_quantity(quantity: Decimal) -> Result<(), AppError> {
    if !money::is_valid_quantity(quantity) {
        return Err(AppError::InvalidQuantity(quantity));
    }
    Ok(())
}

/// O subtotal, com `item` entrando (ou substituindo o de mesmo id), não
/// pode passar de `MAX_MONEY`.
fn ensure_subtotal_fits(commanda: &Commanda, item: &CommandaItem) -> Result<(), AppError> {
    let others = commanda
        .items
        .iter()
        .filter(|i| i.id != item.id)
        .map(|i| i.final_price);
    let subtotal = money::checked_sum(others.chain(std::iter::once(item.final_price)))?;
    if subtotal > money::MAX_MONEY {
        return Err(AppError::InvalidAmount(subtotal));
    }
    Ok(())
}

fn store_item(commanda: &mut Commanda, item: CommandaItem) {
    if let Some(slot) = commanda.items.iter_mut().find(|i| i.id == item.id) {
        *slot = item;
    }
}

/// Adiciona um item do catálogo. O preço é copiado agora (não acompanha
/// mudanças futuras do catálogo), a menos que venha um override.
pub fn add_item(
    commanda: &mut Commanda,
    entry: &CatalogEntry,
    quantity: Decimal,
    unit_price_override: Option<Decimal>,
    now: DateTime<Utc>,
) -> Result<CommandaItem, AppError> {
    ensure_open(commanda)?;
    validate_quantity(quantity)?;
    if !entry.is_active {
        return Err(AppError::ResourceNotFound(format!(
            "Item de catálogo {} inativo",
            entry.id
        )));
    }

    let unit_price = unit_price_override.unwrap_or(entry.unit_price);
    if !money::is_valid_price(unit_price) {
        return Err(AppError::InvalidAmount(unit_price));
    }

    let mut item = CommandaItem {
        id: Uuid::new_v4(),
        kind: entry.kind,
        catalog_ref: entry.id,
        name: entry.name.clone(),
        unit_price,
        quantity,
        discount: None,
        discount_value: Decimal::ZERO,
        final_price: Decimal::ZERO,
    };
    reprice(&mut item)?;
    ensure_subtotal_fits(commanda, &item)?;

    commanda.items.push(item.clone());
    commanda.updated_at = now;
    Ok(item)
}

pub fn remove_item(
    commanda: &mut Commanda,
    item_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_open(commanda)?;
    let before = commanda.items.len();
    commanda.items.retain(|i| i.id != item_id);
    if commanda.items.len() == before {
        return Err(AppError::ResourceNotFound(format!("Item {}", item_id)));
    }
    commanda.updated_at = now;
    Ok(())
}

pub fn update_item_quantity(
    commanda: &mut Commanda,
    item_id: Uuid,
    quantity: Decimal,
    now: DateTime<Utc>,
) -> Result<CommandaItem, AppError> {
    ensure_open(commanda)?;
    validate_quantity(quantity)?;

    let mut item = find_item(commanda, item_id)?.clone();
    item.quantity = quantity;
    reprice(&mut item)?;
    ensure_subtotal_fits(commanda, &item)?;

    store_item(commanda, item.clone());
    commanda.updated_at = now;
    Ok(item)
}

fn find_item(commanda: &Commanda, item_id: Uuid) -> Result<&CommandaItem, AppError> {
    commanda
        .items
        .iter()
        .find(|i| i.id == item_id)
        .ok_or_else(|| AppError::ResourceNotFound(format!("Item {}", item_id)))
}

// =============================================================================
//  DESCONTOS
// =============================================================================

/// Decide a base autoritativa. Com os dois informados, eles precisam bater
/// (dentro de 1 centavo) e o valor prevalece.
fn resolve_discount(gross: Decimal, input: DiscountInput) -> Result<ItemDiscount, AppError> {
    if let Some(value) = input.value {
        if !money::is_valid_price(value) {
            return Err(AppError::InvalidDiscount(format!("valor {} inválido", value)));
        }
    }
    if let Some(pct) = input.percentage {
        if !money::is_valid_percentage(pct) {
            return Err(AppError::InvalidDiscount(format!(
                "percentual {} fora de 0..=100",
                pct
            )));
        }
    }

    match (input.value, input.percentage) {
        (Some(value), Some(pct)) => {
            let derived = money::percent_of(gross, pct)?;
            if !money::money_eq(value, derived) {
                return Err(AppError::InvalidDiscount(format!(
                    "valor {} não corresponde a {}% de {} ({})",
                    value, pct, gross, derived
                )));
            }
            Ok(ItemDiscount::Value(value))
        }
        (Some(value), None) => Ok(ItemDiscount::Value(value)),
        (None, Some(pct)) => Ok(ItemDiscount::Percentage(pct)),
        (None, None) => Err(AppError::InvalidDiscount(
            "informe valor ou percentual".to_string(),
        )),
    }
}

/// Recalcula `discount_value` e `final_price` a partir da base vigente.
fn reprice(item: &mut CommandaItem) -> Result<(), AppError> {
    let gross = item.gross()?;
    item.discount_value = money::to_cents_scale(match item.discount {
        Some(ItemDiscount::Value(v)) => v,
        Some(ItemDiscount::Percentage(pct)) => money::percent_of(gross, pct)?,
        None => Decimal::ZERO,
    });
    item.final_price = money::to_cents_scale(money::floor_zero(gross - item.discount_value));
    Ok(())
}

pub fn apply_item_discount(
    commanda: &mut Commanda,
    item_id: Uuid,
    input: DiscountInput,
    now: DateTime<Utc>,
) -> Result<CommandaItem, AppError> {
    ensure_open(commanda)?;

    let mut item = find_item(commanda, item_id)?.clone();
    let basis = resolve_discount(item.gross()?, input)?;
    item.discount = Some(basis);
    reprice(&mut item)?;

    store_item(commanda, item.clone());
    commanda.updated_at = now;
    Ok(item)
}

/// Desconto da comanda inteira, aplicado sobre o subtotal dos itens.
pub fn set_ticket_discount(
    commanda: &mut Commanda,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_open(commanda)?;
    if !money::is_valid_price(amount) {
        return Err(AppError::InvalidDiscount(format!("valor {} inválido", amount)));
    }
    commanda.discount = amount;
    commanda.updated_at = now;
    Ok(())
}

pub fn set_settlement_options(
    commanda: &mut Commanda,
    allow_debt: Option<bool>,
    leave_change_as_tip: Option<bool>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_open(commanda)?;
    if let Some(flag) = allow_debt {
        commanda.allow_debt = flag;
    }
    if let Some(flag) = leave_change_as_tip {
        commanda.leave_change_as_tip = flag;
    }
    commanda.updated_at = now;
    Ok(())
}

// src/services/settlement.rs

//! Motor de acerto da comanda: pagamentos em várias formas, taxa por forma de
//! pagamento e a decisão de se a comanda pode fechar.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money},
    models::{
        catalog::PaymentInstrument,
        commanda::{
            AppliedPayment, CloseMode, CloseReason, Commanda, CommandaStatus, OverageDisposition,
            SettlementOutcome, SettlementSummary,
        },
    },
    services::ledger::ensure_open,
};

/// Taxa retida e valor líquido de um pagamento.
///
/// Ordem: percentual sobre o bruto (arredondamento bancário), depois a taxa
/// fixa, e o líquido nunca fica negativo.
pub fn compute_fee(
    gross: Decimal,
    percentage_fee: Decimal,
    fixed_fee: Decimal,
) -> Result<(Decimal, Decimal), AppError> {
    let percentage_part = money::percent_of(gross, percentage_fee)?;
    let net = money::to_cents_scale(money::floor_zero(gross - percentage_part - fixed_fee));
    Ok((money::to_cents_scale(gross - net), net))
}

/// Aplica um pagamento. `instrument` é o resultado da consulta ao cadastro
/// (`None` = não existe). A tabela de taxas é copiada para o pagamento.
pub fn add_payment(
    commanda: &mut Commanda,
    instrument_id: Uuid,
    instrument: Option<&PaymentInstrument>,
    gross_amount: Decimal,
    now: DateTime<Utc>,
) -> Result<AppliedPayment, AppError> {
    ensure_open(commanda)?;

    let instrument = instrument
        .filter(|i| i.is_active)
        .ok_or(AppError::UnknownInstrument(instrument_id))?;
    instrument.validate_fees()?;

    if !money::is_valid_tender(gross_amount) {
        return Err(AppError::InvalidAmount(gross_amount));
    }
    let gross_amount = money::to_cents_scale(gross_amount);

    // O total recebido também precisa caber no limite
    let received = money::checked_sum(
        commanda
            .payments
            .iter()
            .map(|p| p.gross_amount)
            .chain(std::iter::once(gross_amount)),
    )?;
    if received > money::MAX_MONEY {
        return Err(AppError::InvalidAmount(received));
    }

    let (fee_amount, net_amount) =
        compute_fee(gross_amount, instrument.percentage_fee, instrument.fixed_fee)?;

    let payment = AppliedPayment {
        id: Uuid::new_v4(),
        commanda_id: commanda.id,
        instrument_id: instrument.id,
        instrument_name: instrument.name.clone(),
        instrument_type: instrument.instrument_type,
        gross_amount,
        percentage_fee: instrument.percentage_fee,
        fixed_fee: instrument.fixed_fee,
        fee_amount,
        net_amount,
        settlement_delay_days: instrument.settlement_delay_days,
        expected_settlement_date: now.date_naive()
            + Duration::days(i64::from(instrument.settlement_delay_days)),
        applied_at: now,
    };

    commanda.payments.push(payment.clone());
    commanda.updated_at = now;
    Ok(payment)
}

/// Remove um pagamento lançado por engano (só com a comanda aberta).
pub fn remove_payment(
    commanda: &mut Commanda,
    payment_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_open(commanda)?;
    let before = commanda.payments.len();
    commanda.payments.retain(|p| p.id != payment_id);
    if commanda.payments.len() == before {
        return Err(AppError::ResourceNotFound(format!("Pagamento {}", payment_id)));
    }
    commanda.updated_at = now;
    Ok(())
}

pub fn summarize(commanda: &Commanda) -> Result<SettlementSummary, AppError> {
    let subtotal = commanda.subtotal()?;
    let total = commanda.total()?;
    let total_received = commanda.total_received()?;
    let total_net = money::checked_sum(commanda.payments.iter().map(|p| p.net_amount))?;

    Ok(SettlementSummary {
        subtotal: money::to_cents_scale(subtotal),
        discount: money::to_cents_scale(commanda.discount),
        total: money::to_cents_scale(total),
        total_received: money::to_cents_scale(total_received),
        total_net: money::to_cents_scale(total_net),
        total_fees: money::to_cents_scale(total_received - total_net),
        shortfall: money::to_cents_scale(money::floor_zero(total - total_received)),
        overage: money::to_cents_scale(money::floor_zero(total_received - total)),
    })
}

/// Pode fechar se não falta nada ou se o fiado foi autorizado. Quando não
/// pode, devolve todas as pendências de uma vez em `Unclosable`.
pub fn can_close(commanda: &Commanda) -> Result<(), AppError> {
    let summary = summarize(commanda)?;
    let mut reasons = Vec::new();

    if summary.shortfall > Decimal::ZERO && !commanda.allow_debt {
        reasons.push(CloseReason::Shortfall {
            amount: summary.shortfall,
        });
        reasons.push(CloseReason::DebtNotAuthorized);
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(AppError::Unclosable(reasons))
    }
}

fn overage_disposition(commanda: &Commanda, overage: Decimal) -> OverageDisposition {
    if overage <= Decimal::ZERO {
        OverageDisposition::None
    } else if commanda.leave_change_as_tip {
        OverageDisposition::Gratuity {
            amount: overage,
            professional_id: commanda.professional_id,
        }
    } else {
        OverageDisposition::ChangeOwed { amount: overage }
    }
}

fn finalize(commanda: &mut Commanda, mode: CloseMode, now: DateTime<Utc>) -> Result<(), AppError> {
    let summary = summarize(commanda)?;
    commanda.outcome = Some(SettlementOutcome {
        mode,
        total: summary.total,
        total_received: summary.total_received,
        total_net: summary.total_net,
        total_fees: summary.total_fees,
        amount_owed: summary.shortfall,
        overage: overage_disposition(commanda, summary.overage),
    });
    commanda.status = CommandaStatus::Closed;
    commanda.closed_at = Some(now);
    commanda.updated_at = now;
    Ok(())
}

/// Fecha a comanda. O troco vira "troco a devolver" ou gorjeta do
/// profissional, conforme `leave_change_as_tip`; o que faltar com fiado
/// autorizado fica registrado em `amount_owed`.
pub fn close(commanda: &mut Commanda, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_open(commanda)?;
    can_close(commanda)?;
    finalize(commanda, CloseMode::Settled, now)
}

/// Fecha sem exigir acerto (concluir atendimento sem cobrança). O saldo em
/// aberto fica em `amount_owed`.
pub fn close_unsettled(commanda: &mut Commanda, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_open(commanda)?;
    finalize(commanda, CloseMode::Unsettled, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::InstrumentType;
    use crate::models::commanda::CommandaItem;
    use crate::models::catalog::ItemKind;
    use crate::services::ledger;
    use rust_decimal_macros::dec;

    fn instrument(kind: InstrumentType, pct: Decimal, fixed: Decimal) -> PaymentInstrument {
        PaymentInstrument {
            id: Uuid::new_v4(),
            name: format!("{:?}", kind),
            instrument_type: kind,
            card_brand: None,
            percentage_fee: pct,
            fixed_fee: fixed,
            settlement_delay_days: if kind == InstrumentType::Credit { 30 } else { 0 },
            is_active: true,
        }
    }

    fn cash() -> PaymentInstrument {
        instrument(InstrumentType::Cash, Decimal::ZERO, Decimal::ZERO)
    }

    fn ledger_of(total: Decimal) -> Commanda {
        let mut c = ledger::open_ad_hoc(None, Some(Uuid::new_v4()), Utc::now());
        c.items.push(CommandaItem {
            id: Uuid::new_v4(),
            kind: ItemKind::Service,
            catalog_ref: Uuid::new_v4(),
            name: "Corte".into(),
            unit_price: total,
            quantity: Decimal::ONE,
            discount: None,
            discount_value: Decimal::ZERO,
            final_price: total,
        });
        c
    }

    fn pay(c: &mut Commanda, i: &PaymentInstrument, amount: Decimal) -> AppliedPayment {
        add_payment(c, i.id, Some(i), amount, Utc::now()).unwrap()
    }

    #[test]
    fn cash_payment_pays_in_full() {
        let mut c = ledger_of(dec!(50.00));
        let p = pay(&mut c, &cash(), dec!(50.00));
        assert_eq!(p.net_amount, dec!(50.00));
        assert_eq!(summarize(&c).unwrap().shortfall, Decimal::ZERO);

        close(&mut c, Utc::now()).unwrap();
        assert_eq!(c.status, CommandaStatus::Closed);
        let outcome = c.outcome.unwrap();
        assert_eq!(outcome.mode, CloseMode::Settled);
        assert_eq!(outcome.amount_owed, Decimal::ZERO);
        assert_eq!(outcome.overage, OverageDisposition::None);
    }

    #[test]
    fn credit_card_fee_is_percentage_then_fixed() {
        let mut c = ledger_of(dec!(100.00));
        let credit = instrument(InstrumentType::Credit, dec!(3), dec!(0.50));
        let now = Utc::now();
        let p = add_payment(&mut c, credit.id, Some(&credit), dec!(100.00), now).unwrap();

        assert_eq!(p.net_amount, dec!(96.50));
        assert_eq!(p.fee_amount, dec!(3.50));
        assert_eq!(p.expected_settlement_date, now.date_naive() + Duration::days(30));
        let s = summarize(&c).unwrap();
        assert_eq!(s.total_fees, dec!(3.50));
        assert_eq!(s.total_net, dec!(96.50));
    }

    #[test]
    fn fee_uses_bankers_rounding_and_floors_at_zero() {
        // 2.5% de 10.10 = 0.2525 -> 0.25 ; 1.5% de 10.30 = 0.1545 -> 0.15
        assert_eq!(compute_fee(dec!(10.10), dec!(2.5), Decimal::ZERO).unwrap().1, dec!(9.85));
        assert_eq!(compute_fee(dec!(10.30), dec!(1.5), Decimal::ZERO).unwrap().1, dec!(10.15));
        // 0.5% de 1.00 = 0.005 -> 0.00 (par)
        assert_eq!(compute_fee(dec!(1.00), dec!(0.5), Decimal::ZERO).unwrap().0, Decimal::ZERO);
        // taxa fixa maior que o pagamento
        let (fee, net) = compute_fee(dec!(0.30), dec!(4), dec!(0.50)).unwrap();
        assert_eq!(net, Decimal::ZERO);
        assert_eq!(fee, dec!(0.30));
    }

    #[test]
    fn fee_schedule_is_captured_not_live() {
        let mut c = ledger_of(dec!(100.00));
        let mut credit = instrument(InstrumentType::Credit, dec!(3), dec!(0.50));
        let p = pay(&mut c, &credit, dec!(100.00));

        credit.percentage_fee = dec!(10);
        credit.fixed_fee = dec!(2);
        assert_eq!(c.payments[0], p);
        assert_eq!(summarize(&c).unwrap().total_net, dec!(96.50));
    }

    #[test]
    fn partial_payment_blocks_close_with_every_reason() {
        let mut c = ledger_of(dec!(50.00));
        pay(&mut c, &cash(), dec!(30.00));

        let expected = vec![
            CloseReason::Shortfall { amount: dec!(20.00) },
            CloseReason::DebtNotAuthorized,
        ];
        match can_close(&c) {
            Err(AppError::Unclosable(r)) => assert_eq!(r, expected),
            other => panic!("esperava Unclosable, veio {other:?}"),
        }
        match close(&mut c, Utc::now()) {
            Err(AppError::Unclosable(r)) => assert_eq!(r, expected),
            other => panic!("esperava Unclosable, veio {other:?}"),
        }
        assert_eq!(c.status, CommandaStatus::Open);
    }

    #[test]
    fn authorized_debt_closes_and_records_amount_owed() {
        let mut c = ledger_of(dec!(50.00));
        let p = pay(&mut c, &cash(), dec!(30.00));
        ledger::set_settlement_options(&mut c, Some(true), None, Utc::now()).unwrap();

        assert!(can_close(&c).is_ok());
        close(&mut c, Utc::now()).unwrap();
        assert_eq!(c.payments, vec![p]);
        assert_eq!(c.outcome.unwrap().amount_owed, dec!(20.00));
    }

    #[test]
    fn overage_becomes_change_or_gratuity() {
        let mut c = ledger_of(dec!(50.00));
        pay(&mut c, &cash(), dec!(60.00));
        let s = summarize(&c).unwrap();
        assert_eq!(s.overage, dec!(10.00));
        close(&mut c, Utc::now()).unwrap();
        assert_eq!(
            c.outcome.unwrap().overage,
            OverageDisposition::ChangeOwed { amount: dec!(10.00) }
        );

        let mut c = ledger_of(dec!(50.00));
        c.leave_change_as_tip = true;
        pay(&mut c, &cash(), dec!(60.00));
        close(&mut c, Utc::now()).unwrap();
        assert_eq!(
            c.outcome.unwrap().overage,
            OverageDisposition::Gratuity {
                amount: dec!(10.00),
                professional_id: c.professional_id
            }
        );
    }

    #[test]
    fn invalid_payments_leave_no_trace() {
        let mut c = ledger_of(dec!(50.00));
        let cash = cash();
        let mut inactive = cash.clone();
        inactive.is_active = false;

        assert!(matches!(
            add_payment(&mut c, cash.id, Some(&cash), Decimal::ZERO, Utc::now()),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            add_payment(&mut c, cash.id, Some(&cash), dec!(-5), Utc::now()),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            add_payment(&mut c, inactive.id, Some(&inactive), dec!(5), Utc::now()),
            Err(AppError::UnknownInstrument(_))
        ));
        let missing = Uuid::new_v4();
        assert!(matches!(
            add_payment(&mut c, missing, None, dec!(5), Utc::now()),
            Err(AppError::UnknownInstrument(id)) if id == missing
        ));
        assert!(c.payments.is_empty());
    }

    #[test]
    fn oversized_tender_is_rejected_without_panic() {
        let mut c = ledger_of(dec!(50.00));
        let credit = instrument(InstrumentType::Credit, dec!(3), Decimal::ZERO);

        let huge = dec!(50000000000000000000000000000);
        assert!(matches!(
            add_payment(&mut c, credit.id, Some(&credit), huge, Utc::now()),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            add_payment(&mut c, credit.id, Some(&credit), dec!(10000000000.00), Utc::now()),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(c.payments.is_empty());
    }

    #[test]
    fn cumulative_tenders_cannot_pass_the_money_limit() {
        let mut c = ledger_of(dec!(50.00));
        let cash = cash();
        pay(&mut c, &cash, money::MAX_MONEY);

        assert!(matches!(
            add_payment(&mut c, cash.id, Some(&cash), money::MAX_MONEY, Utc::now()),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            add_payment(&mut c, cash.id, Some(&cash), dec!(0.01), Utc::now()),
            Err(AppError::InvalidAmount(_))
        ));
        assert_eq!(c.payments.len(), 1);

        let s = summarize(&c).unwrap();
        assert_eq!(s.total_received, money::MAX_MONEY);
        assert_eq!(s.overage, money::MAX_MONEY - dec!(50.00));
        close(&mut c, Utc::now()).unwrap();
    }

    #[test]
    fn closed_ledger_is_frozen() {
        let mut c = ledger_of(dec!(50.00));
        let p = pay(&mut c, &cash(), dec!(50.00));
        close(&mut c, Utc::now()).unwrap();

        assert!(matches!(
            close(&mut c, Utc::now()),
            Err(AppError::LedgerClosed { status: CommandaStatus::Closed })
        ));
        assert!(matches!(
            add_payment(&mut c, p.instrument_id, Some(&cash()), dec!(1), Utc::now()),
            Err(AppError::LedgerClosed { .. })
        ));
        assert!(matches!(
            remove_payment(&mut c, p.id, Utc::now()),
            Err(AppError::LedgerClosed { .. })
        ));
    }

    #[test]
    fn remove_payment_reopens_shortfall() {
        let mut c = ledger_of(dec!(50.00));
        let p = pay(&mut c, &cash(), dec!(50.00));
        remove_payment(&mut c, p.id, Utc::now()).unwrap();
        assert_eq!(summarize(&c).unwrap().shortfall, dec!(50.00));
        assert!(matches!(
            remove_payment(&mut c, p.id, Utc::now()),
            Err(AppError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn money_is_conserved_across_mixed_tenders() {
        let mut c = ledger_of(dec!(187.35));
        let credit = instrument(InstrumentType::Credit, dec!(4.99), dec!(0.39));
        let debit = instrument(InstrumentType::Debit, dec!(1.37), Decimal::ZERO);
        let pix = instrument(InstrumentType::Pix, dec!(0.99), Decimal::ZERO);
        pay(&mut c, &credit, dec!(100.00));
        pay(&mut c, &debit, dec!(50.00));
        pay(&mut c, &pix, dec!(20.00));
        pay(&mut c, &cash(), dec!(20.00));

        let s = summarize(&c).unwrap();
        assert_eq!(s.total_received, dec!(190.00));
        assert_eq!(s.total_received, s.total + s.overage - s.shortfall);
        assert!(s.total_net <= s.total_received);
        for p in &c.payments {
            assert!(p.net_amount >= Decimal::ZERO);
            assert_eq!(p.net_amount + p.fee_amount, p.gross_amount);
        }

        close(&mut c, Utc::now()).unwrap();
        let outcome = c.outcome.unwrap();
        assert_eq!(outcome.total_received, outcome.total + dec!(2.65));
    }

    #[test]
    fn close_unsettled_keeps_outstanding() {
        let mut c = ledger_of(dec!(80.00));
        pay(&mut c, &cash(), dec!(30.00));
        close_unsettled(&mut c, Utc::now()).unwrap();
        let outcome = c.outcome.unwrap();
        assert_eq!(outcome.mode, CloseMode::Unsettled);
        assert_eq!(outcome.amount_owed, dec!(50.00));
    }
}

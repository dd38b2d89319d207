mod common;

use agenda_backend::{
    common::{error::AppError, money},
    models::{
        appointment::{AppointmentAction as A, AppointmentStatus as S, Slot},
        catalog::ItemKind,
        commanda::{CloseMode, CloseReason, CommandaStatus, OverageDisposition},
    },
    services::ledger::DiscountInput,
};
use chrono::Duration;
use common::{awaiting_payment, booking, drive, fixture, TO_AWAITING_PAYMENT};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn cash_payment_closes_ledger_and_completes_appointment() {
    let fx = fixture().await;
    let (appointment_id, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;

    let ledger = fx.coordinator.get_ledger(ledger_id).await.unwrap();
    assert_eq!(ledger.commanda.items.len(), 1);
    assert_eq!(ledger.commanda.items[0].final_price, dec!(50.00));
    assert_eq!(ledger.summary.total, dec!(50.00));

    let (payment, view) = fx
        .coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(50.00))
        .await
        .unwrap();
    assert_eq!(payment.net_amount, dec!(50.00));
    assert_eq!(view.summary.shortfall, Decimal::ZERO);

    let closed = fx.coordinator.close(ledger_id).await.unwrap();
    assert_eq!(closed.commanda.commanda.status, CommandaStatus::Closed);
    let appointment = closed.appointment.unwrap();
    assert_eq!(appointment.appointment.status, S::Done);
    assert!(appointment.appointment.completed_at.is_some());
    assert_eq!(appointment.available_actions, vec![A::Reschedule]);

    // O que foi gravado é o que voltou
    let stored = fx.coordinator.get_appointment(appointment_id).await.unwrap();
    assert_eq!(stored.appointment, appointment.appointment);
}

#[tokio::test]
async fn partial_payment_lists_every_blocking_reason() {
    let fx = fixture().await;
    let (appointment_id, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;
    fx.coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(30.00))
        .await
        .unwrap();

    match fx.coordinator.close(ledger_id).await {
        Err(AppError::Unclosable(reasons)) => assert_eq!(
            reasons,
            vec![
                CloseReason::Shortfall { amount: dec!(20.00) },
                CloseReason::DebtNotAuthorized
            ]
        ),
        other => panic!("esperava Unclosable, veio {other:?}"),
    }

    // Nada mudou
    let appointment = fx.coordinator.get_appointment(appointment_id).await.unwrap();
    assert_eq!(appointment.appointment.status, S::AwaitingPayment);
    let ledger = fx.coordinator.get_ledger(ledger_id).await.unwrap();
    assert_eq!(ledger.commanda.status, CommandaStatus::Open);
}

#[tokio::test]
async fn authorized_debt_closes_with_amount_owed() {
    let fx = fixture().await;
    let (_, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;
    let (payment, _) = fx
        .coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(30.00))
        .await
        .unwrap();
    fx.coordinator
        .set_settlement_options(ledger_id, Some(true), None)
        .await
        .unwrap();

    let closed = fx.coordinator.close(ledger_id).await.unwrap();
    let commanda = closed.commanda.commanda;
    assert_eq!(commanda.payments, vec![payment]);
    let outcome = commanda.outcome.unwrap();
    assert_eq!(outcome.mode, CloseMode::Settled);
    assert_eq!(outcome.amount_owed, dec!(20.00));
}

#[tokio::test]
async fn credit_card_fee_and_expected_settlement_date() {
    let fx = fixture().await;
    let (_, ledger_id) = awaiting_payment(&fx, dec!(100.00)).await;

    let (payment, view) = fx
        .coordinator
        .add_payment(ledger_id, fx.credit.id, dec!(100.00))
        .await
        .unwrap();
    assert_eq!(payment.net_amount, dec!(96.50));
    assert_eq!(payment.fee_amount, dec!(3.50));
    assert_eq!(
        payment.expected_settlement_date,
        payment.applied_at.date_naive() + Duration::days(30)
    );
    assert_eq!(view.summary.total_fees, dec!(3.50));

    // Mudar a tabela de taxas depois não altera o pagamento já aplicado
    let mut credit = fx.credit.clone();
    credit.percentage_fee = dec!(5);
    fx.catalog.upsert_instrument(credit).await.unwrap();
    let ledger = fx.coordinator.get_ledger(ledger_id).await.unwrap();
    assert_eq!(ledger.commanda.payments[0].net_amount, dec!(96.50));
}

#[tokio::test]
async fn overage_is_change_or_gratuity() {
    let fx = fixture().await;

    let (_, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;
    fx.coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(60.00))
        .await
        .unwrap();
    let closed = fx.coordinator.close(ledger_id).await.unwrap();
    assert_eq!(closed.commanda.summary.overage, dec!(10.00));
    assert_eq!(
        closed.commanda.commanda.outcome.unwrap().overage,
        OverageDisposition::ChangeOwed { amount: dec!(10.00) }
    );

    let (appointment_id, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;
    fx.coordinator
        .set_settlement_options(ledger_id, None, Some(true))
        .await
        .unwrap();
    fx.coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(60.00))
        .await
        .unwrap();
    let closed = fx.coordinator.close(ledger_id).await.unwrap();
    let professional_id = fx
        .coordinator
        .get_appointment(appointment_id)
        .await
        .unwrap()
        .appointment
        .professional_id;
    assert_eq!(
        closed.commanda.commanda.outcome.unwrap().overage,
        OverageDisposition::Gratuity {
            amount: dec!(10.00),
            professional_id: Some(professional_id)
        }
    );
}

#[tokio::test]
async fn check_in_straight_from_created_is_rejected() {
    let fx = fixture().await;
    let booked = fx.coordinator.book(booking(dec!(50.00))).await.unwrap();
    assert_eq!(booked.appointment.status, S::Created);
    assert_eq!(booked.available_actions, vec![A::Confirm, A::Cancel, A::Edit, A::OpenLedger]);

    let err = fx
        .coordinator
        .transition(booked.appointment.id, A::CheckIn)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition { from: S::Created, action: A::CheckIn }
    ));
}

#[tokio::test]
async fn finish_service_reuses_ledger_opened_early() {
    let fx = fixture().await;
    let booked = fx.coordinator.book(booking(dec!(50.00))).await.unwrap();
    let id = booked.appointment.id;
    drive(&fx.coordinator, id, &[A::Confirm, A::CheckIn]).await;

    let opened = fx.coordinator.open_ledger(id).await.unwrap();
    let ledger_id = opened.commanda.id;
    // Abrir de novo devolve a mesma comanda
    assert_eq!(fx.coordinator.open_ledger(id).await.unwrap().commanda.id, ledger_id);

    fx.coordinator
        .add_item(ledger_id, ItemKind::Product, fx.product.id, dec!(1), None)
        .await
        .unwrap();

    let after = drive(&fx.coordinator, id, &[A::StartService, A::FinishService]).await;
    assert_eq!(after.appointment.status, S::AwaitingPayment);
    assert_eq!(after.appointment.commanda_id, Some(ledger_id));

    let summary = fx.coordinator.summarize(ledger_id).await.unwrap();
    assert_eq!(summary.total, dec!(85.00));
}

#[tokio::test]
async fn finish_service_without_anything_to_bill_is_missing_ledger() {
    let fx = fixture().await;
    let mut input = booking(dec!(50.00));
    input.services.clear();
    let id = fx.coordinator.book(input).await.unwrap().appointment.id;
    drive(&fx.coordinator, id, &[A::Confirm, A::CheckIn, A::StartService]).await;

    let err = fx.coordinator.transition(id, A::FinishService).await.unwrap_err();
    assert!(matches!(err, AppError::MissingLedger));
    let current = fx.coordinator.get_appointment(id).await.unwrap();
    assert_eq!(current.appointment.status, S::InService);
}

#[tokio::test]
async fn cancel_cancels_open_ledger_in_the_same_commit() {
    let fx = fixture().await;
    let (appointment_id, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;

    let result = fx.coordinator.transition(appointment_id, A::Cancel).await.unwrap();
    assert_eq!(result.appointment.appointment.status, S::Canceled);
    assert_eq!(
        result.commanda.unwrap().commanda.status,
        CommandaStatus::Canceled
    );

    let err = fx
        .coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(10.00))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::LedgerClosed { status: CommandaStatus::Canceled }));
}

#[tokio::test]
async fn complete_without_settlement_leaves_balance_open() {
    let fx = fixture().await;
    let (appointment_id, ledger_id) = awaiting_payment(&fx, dec!(80.00)).await;
    fx.coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(30.00))
        .await
        .unwrap();

    let result = fx
        .coordinator
        .transition(appointment_id, A::CompleteWithoutSettlement)
        .await
        .unwrap();
    assert_eq!(result.appointment.appointment.status, S::Done);
    let outcome = result.commanda.unwrap().commanda.outcome.unwrap();
    assert_eq!(outcome.mode, CloseMode::Unsettled);
    assert_eq!(outcome.amount_owed, dec!(50.00));
}

#[tokio::test]
async fn close_requires_awaiting_payment() {
    let fx = fixture().await;
    let booked = fx.coordinator.book(booking(dec!(50.00))).await.unwrap();
    let id = booked.appointment.id;
    drive(&fx.coordinator, id, &[A::Confirm]).await;
    let ledger_id = fx.coordinator.open_ledger(id).await.unwrap().commanda.id;
    fx.coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(50.00))
        .await
        .unwrap();

    let err = fx.coordinator.close(ledger_id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition { from: S::Confirmed, action: A::CloseSettlement }
    ));
    let ledger = fx.coordinator.get_ledger(ledger_id).await.unwrap();
    assert!(ledger.commanda.is_open());
}

#[tokio::test]
async fn ad_hoc_ledger_closes_on_its_own() {
    let fx = fixture().await;
    let opened = fx.coordinator.open_ad_hoc_ledger(None, None).await.unwrap();
    let ledger_id = opened.commanda.id;

    let (item, _) = fx
        .coordinator
        .add_item(ledger_id, ItemKind::Product, fx.product.id, dec!(2), None)
        .await
        .unwrap();
    fx.coordinator
        .apply_item_discount(
            ledger_id,
            item.id,
            DiscountInput { value: None, percentage: Some(dec!(10)) },
        )
        .await
        .unwrap();
    let view = fx.coordinator.set_ticket_discount(ledger_id, dec!(3.00)).await.unwrap();
    assert_eq!(view.summary.subtotal, dec!(63.00));
    assert_eq!(view.summary.total, dec!(60.00));

    fx.coordinator
        .add_payment(ledger_id, fx.credit.id, dec!(60.00))
        .await
        .unwrap();
    let closed = fx.coordinator.close(ledger_id).await.unwrap();
    assert!(closed.appointment.is_none());
    assert_eq!(closed.commanda.commanda.status, CommandaStatus::Closed);

    // Segundo fechamento observa LedgerClosed
    assert!(matches!(
        fx.coordinator.close(ledger_id).await,
        Err(AppError::LedgerClosed { status: CommandaStatus::Closed })
    ));
}

#[tokio::test]
async fn unknown_catalog_entry_and_instrument_leave_no_trace() {
    let fx = fixture().await;
    let (_, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;
    let before = fx.coordinator.get_ledger(ledger_id).await.unwrap();

    let err = fx
        .coordinator
        .add_item(ledger_id, ItemKind::Service, fx.product.id, dec!(1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ResourceNotFound(_)));

    let err = fx
        .coordinator
        .add_payment(ledger_id, uuid::Uuid::new_v4(), dec!(10.00))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownInstrument(_)));

    let err = fx
        .coordinator
        .add_payment(ledger_id, fx.cash.id, dec!(10.005))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    let after = fx.coordinator.get_ledger(ledger_id).await.unwrap();
    assert_eq!(after.commanda, before.commanda);
}

#[tokio::test]
async fn oversized_payment_is_rejected_without_trace() {
    let fx = fixture().await;
    let (_, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;

    let err = fx
        .coordinator
        .add_payment(ledger_id, fx.credit.id, dec!(50000000000000000000000000000))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    let ledger = fx.coordinator.get_ledger(ledger_id).await.unwrap();
    assert!(ledger.commanda.payments.is_empty());
    assert_eq!(ledger.summary.shortfall, dec!(50.00));
}

fn huge_quantity() -> Decimal {
    dec!(10000000000000000000000000000)
}

#[tokio::test]
async fn oversized_quantity_is_rejected() {
    let fx = fixture().await;
    let (_, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;

    let err = fx
        .coordinator
        .add_item(ledger_id, ItemKind::Product, fx.product.id, huge_quantity(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity(_)));

    let ledger = fx.coordinator.get_ledger(ledger_id).await.unwrap();
    assert_eq!(ledger.commanda.items.len(), 1);
    assert_eq!(ledger.summary.total, dec!(50.00));
}

#[tokio::test]
async fn cumulative_payments_cannot_pass_the_money_limit() {
    let fx = fixture().await;
    let (_, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;
    fx.coordinator
        .add_payment(ledger_id, fx.cash.id, money::MAX_MONEY)
        .await
        .unwrap();

    let err = fx
        .coordinator
        .add_payment(ledger_id, fx.cash.id, money::MAX_MONEY)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    // A comanda continua legível e fecha normalmente
    let summary = fx.coordinator.summarize(ledger_id).await.unwrap();
    assert_eq!(summary.total_received, money::MAX_MONEY);
    let closed = fx.coordinator.close(ledger_id).await.unwrap();
    assert_eq!(closed.commanda.commanda.status, CommandaStatus::Closed);
    assert_eq!(
        closed.commanda.commanda.outcome.unwrap().overage,
        OverageDisposition::ChangeOwed {
            amount: money::MAX_MONEY - dec!(50.00)
        }
    );
}

#[tokio::test]
async fn removing_a_payment_reopens_the_shortfall() {
    let fx = fixture().await;
    let (_, ledger_id) = awaiting_payment(&fx, dec!(50.00)).await;
    let (payment, _) = fx
        .coordinator
        .add_payment(ledger_id, fx.credit.id, dec!(50.00))
        .await
        .unwrap();

    let view = fx.coordinator.remove_payment(ledger_id, payment.id).await.unwrap();
    assert!(view.commanda.payments.is_empty());
    assert_eq!(view.summary.shortfall, dec!(50.00));
}

#[tokio::test]
async fn edit_and_reschedule() {
    let fx = fixture().await;
    let booked = fx.coordinator.book(booking(dec!(50.00))).await.unwrap();
    let id = booked.appointment.id;

    let later = booked.appointment.starts_at + Duration::hours(3);
    let edited = fx
        .coordinator
        .edit(
            id,
            agenda_backend::models::appointment::AppointmentEdit {
                starts_at: Some(later),
                ends_at: Some(later + Duration::hours(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.appointment.status, S::Created);
    assert_eq!(edited.appointment.starts_at, later);

    // Só terminal pode ser remarcado
    assert!(matches!(
        fx.coordinator.reschedule(id, None).await,
        Err(AppError::InvalidTransition { action: A::Reschedule, .. })
    ));

    drive(&fx.coordinator, id, &[A::Confirm, A::NoShow]).await;

    let via_transition = fx.coordinator.transition(id, A::Reschedule).await.unwrap();
    let copy = via_transition.rescheduled.unwrap();
    assert_eq!(copy.appointment.status, S::Created);
    assert_eq!(copy.appointment.starts_at, later);
    assert_eq!(copy.appointment.rescheduled_from, Some(id));
    assert_eq!(via_transition.appointment.appointment.status, S::NoShow);

    let tomorrow = later + Duration::days(1);
    let moved = fx
        .coordinator
        .reschedule(
            id,
            Some(Slot {
                starts_at: tomorrow,
                ends_at: tomorrow + Duration::hours(1),
                professional_id: None,
            }),
        )
        .await
        .unwrap();
    assert_eq!(moved.appointment.starts_at, tomorrow);
    assert_eq!(moved.appointment.professional_id, booked.appointment.professional_id);

    // O original continua intacto
    let original = fx.coordinator.get_appointment(id).await.unwrap();
    assert_eq!(original.appointment.status, S::NoShow);
}

#[tokio::test]
async fn every_step_of_the_happy_path_is_reflected_in_the_menu() {
    let fx = fixture().await;
    let id = fx.coordinator.book(booking(dec!(50.00))).await.unwrap().appointment.id;

    let mut expected_status =
        [S::Confirmed, S::CheckedIn, S::InService, S::AwaitingPayment].into_iter();
    for action in TO_AWAITING_PAYMENT {
        let before = fx.coordinator.get_appointment(id).await.unwrap();
        assert!(before.available_actions.contains(&action));
        let after = fx.coordinator.transition(id, action).await.unwrap();
        assert_eq!(Some(after.appointment.appointment.status), expected_status.next());
        assert!(after.appointment.appointment.version > before.appointment.version);
    }
}

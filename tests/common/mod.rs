#![allow(dead_code)]

use std::sync::Arc;

use agenda_backend::{
    db::{InMemoryCatalog, InMemoryStore},
    models::{
        appointment::{AppointmentAction, AppointmentView, NewAppointment, SelectedService},
        catalog::{CatalogEntry, InstrumentType, ItemKind, PaymentInstrument},
    },
    services::WorkflowCoordinator,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

pub struct Fixture {
    pub coordinator: WorkflowCoordinator,
    pub catalog: InMemoryCatalog,
    pub cash: PaymentInstrument,
    pub credit: PaymentInstrument,
    pub product: CatalogEntry,
}

pub fn instrument(
    name: &str,
    kind: InstrumentType,
    percentage_fee: Decimal,
    fixed_fee: Decimal,
    settlement_delay_days: i32,
) -> PaymentInstrument {
    PaymentInstrument {
        id: Uuid::new_v4(),
        name: name.to_string(),
        instrument_type: kind,
        card_brand: None,
        percentage_fee,
        fixed_fee,
        settlement_delay_days,
        is_active: true,
    }
}

pub async fn fixture() -> Fixture {
    let catalog = InMemoryCatalog::new();

    let cash = instrument("Dinheiro", InstrumentType::Cash, Decimal::ZERO, Decimal::ZERO, 0);
    let credit = instrument("Crédito Visa", InstrumentType::Credit, dec!(3), dec!(0.50), 30);
    catalog.upsert_instrument(cash.clone()).await.unwrap();
    catalog.upsert_instrument(credit.clone()).await.unwrap();

    let product = CatalogEntry {
        id: Uuid::new_v4(),
        kind: ItemKind::Product,
        name: "Pomada Modeladora".into(),
        unit_price: dec!(35.00),
        is_active: true,
    };
    catalog.upsert_entry(product.clone()).await;

    let coordinator = WorkflowCoordinator::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(catalog.clone()),
        Arc::new(catalog.clone()),
    );

    Fixture {
        coordinator,
        catalog,
        cash,
        credit,
        product,
    }
}

/// Reserva com um serviço pelo preço informado.
pub fn booking(price: Decimal) -> NewAppointment {
    let starts_at = Utc::now() + Duration::hours(1);
    NewAppointment {
        customer_id: Uuid::new_v4(),
        professional_id: Uuid::new_v4(),
        starts_at,
        ends_at: starts_at + Duration::minutes(45),
        services: vec![SelectedService {
            service_id: Uuid::new_v4(),
            name: "Corte".into(),
            price,
        }],
        notes: None,
    }
}

pub const TO_AWAITING_PAYMENT: [AppointmentAction; 4] = [
    AppointmentAction::Confirm,
    AppointmentAction::CheckIn,
    AppointmentAction::StartService,
    AppointmentAction::FinishService,
];

pub async fn drive(
    coordinator: &WorkflowCoordinator,
    appointment_id: Uuid,
    actions: &[AppointmentAction],
) -> AppointmentView {
    let mut last = coordinator.get_appointment(appointment_id).await.unwrap();
    for action in actions {
        last = coordinator
            .transition(appointment_id, *action)
            .await
            .unwrap_or_else(|e| panic!("{action} falhou: {e}"))
            .appointment;
    }
    last
}

/// Agendamento de `price` já em AWAITING_PAYMENT; devolve (agendamento, comanda).
pub async fn awaiting_payment(fx: &Fixture, price: Decimal) -> (Uuid, Uuid) {
    let booked = fx.coordinator.book(booking(price)).await.unwrap();
    let id = booked.appointment.id;
    let view = drive(&fx.coordinator, id, &TO_AWAITING_PAYMENT).await;
    let ledger_id = view.appointment.commanda_id.expect("comanda vinculada");
    (id, ledger_id)
}

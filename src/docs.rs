// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Agenda & Comanda",
        description = "Ciclo de vida do agendamento e acerto da comanda em várias formas de pagamento"
    ),
    paths(
        // --- Agendamentos ---
        handlers::appointments::book_appointment,
        handlers::appointments::get_appointment,
        handlers::appointments::edit_appointment,
        handlers::appointments::transition_appointment,
        handlers::appointments::reschedule_appointment,
        handlers::appointments::open_appointment_commanda,

        // --- Comandas ---
        handlers::commandas::open_commanda,
        handlers::commandas::get_commanda,
        handlers::commandas::get_summary,
        handlers::commandas::add_item,
        handlers::commandas::update_item_quantity,
        handlers::commandas::remove_item,
        handlers::commandas::apply_item_discount,
        handlers::commandas::set_ticket_discount,
        handlers::commandas::set_settlement_options,
        handlers::commandas::add_payment,
        handlers::commandas::remove_payment,
        handlers::commandas::close_commanda,
    ),
    components(
        schemas(
            // --- Agendamento ---
            models::appointment::AppointmentStatus,
            models::appointment::AppointmentAction,
            models::appointment::SelectedService,
            models::appointment::Appointment,
            models::appointment::AppointmentView,

            // --- Catálogo ---
            models::catalog::ItemKind,
            models::catalog::InstrumentType,
            models::catalog::CatalogEntry,
            models::catalog::PaymentInstrument,

            // --- Comanda ---
            models::commanda::CommandaStatus,
            models::commanda::ItemDiscount,
            models::commanda::CloseReason,
            models::commanda::CloseMode,
            models::commanda::OverageDisposition,
            models::commanda::CommandaItem,
            models::commanda::AppliedPayment,
            models::commanda::SettlementOutcome,
            models::commanda::Commanda,
            models::commanda::SettlementSummary,
            models::commanda::CommandaView,

            models::workflow::TransitionView,
            models::workflow::ClosedLedgerView,

            // --- Payloads ---
            handlers::appointments::SelectedServicePayload,
            handlers::appointments::BookAppointmentPayload,
            handlers::appointments::EditAppointmentPayload,
            handlers::appointments::TransitionPayload,
            handlers::appointments::ReschedulePayload,
            handlers::commandas::OpenCommandaPayload,
            handlers::commandas::AddItemPayload,
            handlers::commandas::UpdateQuantityPayload,
            handlers::commandas::ItemDiscountPayload,
            handlers::commandas::TicketDiscountPayload,
            handlers::commandas::SettlementOptionsPayload,
            handlers::commandas::AddPaymentPayload,
        )
    ),
    tags(
        (name = "Appointments", description = "Agenda: reserva, transições e remarcação"),
        (name = "Commandas", description = "Comanda: itens, descontos, pagamentos e fechamento")
    )
)]
pub struct ApiDoc;

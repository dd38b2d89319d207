pub mod appointments;
pub mod commandas;

use axum::{
    routing::{get, patch, post, put},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc};

/// Monta o router completo com o estado já aplicado.
pub fn router(app_state: AppState) -> Router {
    let appointment_routes = Router::new()
        .route("/", post(appointments::book_appointment))
        .route(
            "/{id}",
            get(appointments::get_appointment).patch(appointments::edit_appointment),
        )
        .route("/{id}/transition", post(appointments::transition_appointment))
        .route("/{id}/reschedule", post(appointments::reschedule_appointment))
        .route("/{id}/commanda", post(appointments::open_appointment_commanda));

    let commanda_routes = Router::new()
        .route("/", post(commandas::open_commanda))
        .route("/{id}", get(commandas::get_commanda))
        .route("/{id}/summary", get(commandas::get_summary))
        .route("/{id}/items", post(commandas::add_item))
        .route(
            "/{id}/items/{item_id}",
            patch(commandas::update_item_quantity).delete(commandas::remove_item),
        )
        .route("/{id}/items/{item_id}/discount", post(commandas::apply_item_discount))
        .route("/{id}/discount", put(commandas::set_ticket_discount))
        .route("/{id}/options", put(commandas::set_settlement_options))
        .route("/{id}/payments", post(commandas::add_payment))
        .route(
            "/{id}/payments/{payment_id}",
            axum::routing::delete(commandas::remove_payment),
        )
        .route("/{id}/close", post(commandas::close_commanda));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/appointments", appointment_routes)
        .nest("/api/commandas", commanda_routes)
        .with_state(app_state)
}

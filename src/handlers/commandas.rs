// src/handlers/commandas.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::{ApiError, AppError},
        money,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        catalog::ItemKind,
        commanda::{CommandaView, SettlementSummary},
        workflow::ClosedLedgerView,
    },
    services::ledger::DiscountInput,
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenCommandaPayload {
    pub customer_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

fn validate_money_limit(val: &Decimal) -> Result<(), ValidationError> {
    if *val > money::MAX_MONEY {
        let mut err = ValidationError::new("range");
        err.add_param("max".into(), &money::MAX_MONEY.to_string());
        err.message = Some("O valor excede o limite permitido.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_quantity_limit(val: &Decimal) -> Result<(), ValidationError> {
    if *val > money::MAX_QUANTITY {
        let mut err = ValidationError::new("range");
        err.add_param("max".into(), &money::MAX_QUANTITY.to_string());
        err.message = Some("A quantidade excede o limite permitido.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemPayload {
    #[schema(example = "PRODUCT")]
    pub kind: ItemKind,
    pub catalog_ref: Uuid,

    #[validate(custom(function = "validate_quantity_limit"))]
    #[serde(default = "default_quantity")]
    #[schema(example = "1")]
    pub quantity: Decimal,

    /// Sobrescreve o preço do catálogo
    #[schema(example = "45.00")]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityPayload {
    #[validate(custom(function = "validate_quantity_limit"))]
    #[schema(example = "2")]
    pub quantity: Decimal,
}

/// Valor, percentual ou os dois (precisam bater).
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDiscountPayload {
    #[schema(example = "5.00")]
    pub value: Option<Decimal>,
    #[schema(example = "10")]
    pub percentage: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketDiscountPayload {
    #[validate(custom(function = "validate_money_limit"))]
    #[schema(example = "10.00")]
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOptionsPayload {
    pub allow_debt: Option<bool>,
    pub leave_change_as_tip: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentPayload {
    pub instrument_id: Uuid,
    #[validate(custom(function = "validate_money_limit"))]
    #[schema(example = "100.00")]
    pub amount: Decimal,
}

// =============================================================================
//  ABERTURA / LEITURA
// =============================================================================

// POST /api/commandas
#[utoipa::path(
    post,
    path = "/api/commandas",
    tag = "Commandas",
    request_body = OpenCommandaPayload,
    responses((status = 201, description = "Comanda avulsa aberta", body = CommandaView))
)]
pub async fn open_commanda(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<OpenCommandaPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .coordinator
        .open_ad_hoc_ledger(payload.customer_id, payload.professional_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/commandas/{id}
#[utoipa::path(
    get,
    path = "/api/commandas/{id}",
    tag = "Commandas",
    params(("id" = Uuid, Path, description = "ID da comanda")),
    responses(
        (status = 200, description = "Comanda com totais", body = CommandaView),
        (status = 404, description = "Não encontrada")
    )
)]
pub async fn get_commanda(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .coordinator
        .get_ledger(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// GET /api/commandas/{id}/summary
#[utoipa::path(
    get,
    path = "/api/commandas/{id}/summary",
    tag = "Commandas",
    params(("id" = Uuid, Path, description = "ID da comanda")),
    responses((status = 200, description = "Totais do acerto", body = SettlementSummary))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .coordinator
        .summarize(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(summary))
}

// =============================================================================
//  ITENS E DESCONTOS
// =============================================================================

// POST /api/commandas/{id}/items
#[utoipa::path(
    post,
    path = "/api/commandas/{id}/items",
    tag = "Commandas",
    request_body = AddItemPayload,
    params(("id" = Uuid, Path, description = "ID da comanda")),
    responses(
        (status = 201, description = "Item adicionado", body = CommandaView),
        (status = 404, description = "Item de catálogo inexistente ou inativo"),
        (status = 409, description = "Comanda não está aberta")
    )
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let (_, view) = app_state
        .coordinator
        .add_item(id, payload.kind, payload.catalog_ref, payload.quantity, payload.unit_price)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(view)))
}

// PATCH /api/commandas/{id}/items/{item_id}
#[utoipa::path(
    patch,
    path = "/api/commandas/{id}/items/{item_id}",
    tag = "Commandas",
    request_body = UpdateQuantityPayload,
    params(
        ("id" = Uuid, Path, description = "ID da comanda"),
        ("item_id" = Uuid, Path, description = "ID do item")
    ),
    responses((status = 200, description = "Quantidade alterada", body = CommandaView))
)]
pub async fn update_item_quantity(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuantityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let (_, view) = app_state
        .coordinator
        .update_item_quantity(id, item_id, payload.quantity)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// DELETE /api/commandas/{id}/items/{item_id}
#[utoipa::path(
    delete,
    path = "/api/commandas/{id}/items/{item_id}",
    tag = "Commandas",
    params(
        ("id" = Uuid, Path, description = "ID da comanda"),
        ("item_id" = Uuid, Path, description = "ID do item")
    ),
    responses((status = 200, description = "Item removido", body = CommandaView))
)]
pub async fn remove_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .coordinator
        .remove_item(id, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// POST /api/commandas/{id}/items/{item_id}/discount
#[utoipa::path(
    post,
    path = "/api/commandas/{id}/items/{item_id}/discount",
    tag = "Commandas",
    request_body = ItemDiscountPayload,
    params(
        ("id" = Uuid, Path, description = "ID da comanda"),
        ("item_id" = Uuid, Path, description = "ID do item")
    ),
    responses(
        (status = 200, description = "Desconto aplicado", body = CommandaView),
        (status = 400, description = "Desconto inválido ou valor e percentual divergentes")
    )
)]
pub async fn apply_item_discount(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ItemDiscountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let input = DiscountInput {
        value: payload.value,
        percentage: payload.percentage,
    };

    let (_, view) = app_state
        .coordinator
        .apply_item_discount(id, item_id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// PUT /api/commandas/{id}/discount
#[utoipa::path(
    put,
    path = "/api/commandas/{id}/discount",
    tag = "Commandas",
    request_body = TicketDiscountPayload,
    params(("id" = Uuid, Path, description = "ID da comanda")),
    responses((status = 200, description = "Desconto da comanda definido", body = CommandaView))
)]
pub async fn set_ticket_discount(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<TicketDiscountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let view = app_state
        .coordinator
        .set_ticket_discount(id, payload.amount)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// PUT /api/commandas/{id}/options
#[utoipa::path(
    put,
    path = "/api/commandas/{id}/options",
    tag = "Commandas",
    request_body = SettlementOptionsPayload,
    params(("id" = Uuid, Path, description = "ID da comanda")),
    responses((status = 200, description = "Fiado / troco como gorjeta", body = CommandaView))
)]
pub async fn set_settlement_options(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<SettlementOptionsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .coordinator
        .set_settlement_options(id, payload.allow_debt, payload.leave_change_as_tip)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// =============================================================================
//  PAGAMENTOS E FECHAMENTO
// =============================================================================

// POST /api/commandas/{id}/payments
#[utoipa::path(
    post,
    path = "/api/commandas/{id}/payments",
    tag = "Commandas",
    request_body = AddPaymentPayload,
    params(("id" = Uuid, Path, description = "ID da comanda")),
    responses(
        (status = 201, description = "Pagamento aplicado", body = CommandaView),
        (status = 400, description = "Forma de pagamento inválida ou valor inválido"),
        (status = 409, description = "Comanda não está aberta")
    )
)]
pub async fn add_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let (_, view) = app_state
        .coordinator
        .add_payment(id, payload.instrument_id, payload.amount)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(view)))
}

// DELETE /api/commandas/{id}/payments/{payment_id}
#[utoipa::path(
    delete,
    path = "/api/commandas/{id}/payments/{payment_id}",
    tag = "Commandas",
    params(
        ("id" = Uuid, Path, description = "ID da comanda"),
        ("payment_id" = Uuid, Path, description = "ID do pagamento")
    ),
    responses((status = 200, description = "Pagamento removido", body = CommandaView))
)]
pub async fn remove_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .coordinator
        .remove_payment(id, payment_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(view))
}

// POST /api/commandas/{id}/close
#[utoipa::path(
    post,
    path = "/api/commandas/{id}/close",
    tag = "Commandas",
    params(("id" = Uuid, Path, description = "ID da comanda")),
    responses(
        (
            status = 200,
            description = "Comanda fechada (e agendamento concluído)",
            body = ClosedLedgerView
        ),
        (status = 409, description = "Já fechada ou agendamento fora de AWAITING_PAYMENT"),
        (status = 422, description = "Todas as pendências que impedem o fechamento")
    )
)]
pub async fn close_commanda(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let closed = app_state
        .coordinator
        .close(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(closed))
}

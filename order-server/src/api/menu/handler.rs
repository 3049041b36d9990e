//! Customer API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::order::{Actor, OrderCommand, OrderCommandPayload, OrderSnapshot, SubmitOutcome};
use shared::request::{
    AdjustQuantityRequest, CancelOrderRequest, ConfirmPaymentRequest, RemoveItemRequest,
    SessionQuery, SessionRequest, SubmitOrderRequest,
};
use shared::response::{PaymentIntentResponse, SubmitOrderResponse};

use crate::api::convert::{order_from_response, require_session};
use crate::core::ServerState;
use crate::services::TableRef;

fn resolve_table(state: &ServerState, table_token: &str) -> AppResult<TableRef> {
    state
        .tables
        .resolve_token(table_token)
        .ok_or_else(|| AppError::new(ErrorCode::TableNotFound))
}

fn customer(session_token: &str) -> Actor {
    Actor::Customer {
        session_token: session_token.to_string(),
    }
}

/// Orders outside the table addressed by the link are invisible
fn ensure_at_table(order: &OrderSnapshot, table: &TableRef) -> AppResult<()> {
    if order.table_id != table.table_id {
        return Err(AppError::new(ErrorCode::OrderNotFound));
    }
    Ok(())
}

/// Run a customer command against an order at this table
fn run_order_command(
    state: &ServerState,
    table: &TableRef,
    session_token: &str,
    order_id: i64,
    payload: OrderCommandPayload,
) -> AppResult<Json<OrderSnapshot>> {
    let session = require_session(session_token)?;
    ensure_at_table(&state.manager.get_order(&table.tenant_id, order_id)?, table)?;
    let response = state.manager.execute_command(OrderCommand::new(
        &table.tenant_id,
        customer(session),
        payload,
    ));
    let order = order_from_response(response, &state.manager, &table.tenant_id, order_id)?;
    Ok(Json(order))
}

/// Table behind a QR link
pub async fn table_info(
    State(state): State<ServerState>,
    Path(table_token): Path<String>,
) -> AppResult<Json<TableRef>> {
    Ok(Json(resolve_table(&state, &table_token)?))
}

/// Every order this session placed at the table
pub async fn list_session_orders(
    State(state): State<ServerState>,
    Path(table_token): Path<String>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<Vec<OrderSnapshot>>> {
    let table = resolve_table(&state, &table_token)?;
    let session = require_session(&query.session)?;
    let orders =
        state
            .manager
            .list_session_orders(&table.tenant_id, table.table_id, session)?;
    Ok(Json(orders))
}

/// Submit the cart: creates an order or merges into the open one
pub async fn submit(
    State(state): State<ServerState>,
    Path(table_token): Path<String>,
    Json(req): Json<SubmitOrderRequest>,
) -> AppResult<Json<SubmitOrderResponse>> {
    let table = resolve_table(&state, &table_token)?;
    let session = require_session(&req.session_token)?;

    let mut cmd = OrderCommand::new(
        &table.tenant_id,
        customer(session),
        OrderCommandPayload::SubmitItems {
            table_id: table.table_id,
            items: req.items,
            notes: req.notes,
        },
    );
    if let Some(command_id) = req.command_id {
        cmd = cmd.with_command_id(command_id);
    }

    let response = state.manager.execute_command(cmd);
    if !response.success {
        return Err(response
            .error
            .map(AppError::from)
            .unwrap_or_else(|| AppError::new(ErrorCode::Unknown)));
    }

    let outcome = response.outcome;
    let order = match response.order {
        Some(order) => order,
        // Retried submission: the open order (or the latest one) already holds it
        None => state
            .manager
            .list_session_orders(&table.tenant_id, table.table_id, session)?
            .pop()
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?,
    };

    Ok(Json(SubmitOrderResponse {
        status: outcome.unwrap_or(SubmitOutcome::Merged),
        order,
    }))
}

pub async fn remove_item(
    State(state): State<ServerState>,
    Path((table_token, order_id, item_id)): Path<(String, i64, i64)>,
    Json(req): Json<RemoveItemRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    let table = resolve_table(&state, &table_token)?;
    let session = req.session_token.unwrap_or_default();
    run_order_command(
        &state,
        &table,
        &session,
        order_id,
        OrderCommandPayload::RemoveItem {
            order_id,
            item_id,
            reason: req.reason,
        },
    )
}

pub async fn adjust_quantity(
    State(state): State<ServerState>,
    Path((table_token, order_id, item_id)): Path<(String, i64, i64)>,
    Json(req): Json<AdjustQuantityRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    let table = resolve_table(&state, &table_token)?;
    run_order_command(
        &state,
        &table,
        &req.session_token,
        order_id,
        OrderCommandPayload::AdjustQuantity {
            order_id,
            item_id,
            quantity: req.quantity,
        },
    )
}

pub async fn cancel(
    State(state): State<ServerState>,
    Path((table_token, order_id)): Path<(String, i64)>,
    Json(req): Json<CancelOrderRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    let table = resolve_table(&state, &table_token)?;
    run_order_command(
        &state,
        &table,
        &req.session_token,
        order_id,
        OrderCommandPayload::CancelOrder {
            order_id,
            reason: req.reason,
        },
    )
}

pub async fn create_payment_intent(
    State(state): State<ServerState>,
    Path((table_token, order_id)): Path<(String, i64)>,
    Json(req): Json<SessionRequest>,
) -> AppResult<Json<PaymentIntentResponse>> {
    let table = resolve_table(&state, &table_token)?;
    let session = require_session(&req.session_token)?;
    ensure_at_table(&state.manager.get_order(&table.tenant_id, order_id)?, &table)?;
    let intent = state
        .payments
        .create_intent(&table.tenant_id, order_id, session)
        .await?;
    Ok(Json(intent))
}

pub async fn confirm_payment(
    State(state): State<ServerState>,
    Path((table_token, order_id)): Path<(String, i64)>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    let table = resolve_table(&state, &table_token)?;
    let session = require_session(&req.session_token)?;
    ensure_at_table(&state.manager.get_order(&table.tenant_id, order_id)?, &table)?;
    let order = state
        .payments
        .confirm(&table.tenant_id, order_id, session, &req.intent_id)
        .await?;
    Ok(Json(order))
}

//! Staff Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::error::AppResult;
use shared::order::{OrderCommand, OrderCommandPayload, OrderEvent, OrderSnapshot};
use shared::request::{
    ListOrdersQuery, MarkPaidRequest, RemoveItemRequest, UpdateItemStatusRequest,
    UpdateStatusRequest,
};
use shared::response::ReconcileResponse;

use crate::api::convert::order_from_response;
use crate::auth::StaffUser;
use crate::core::ServerState;

fn run(
    state: &ServerState,
    user: &StaffUser,
    order_id: i64,
    payload: OrderCommandPayload,
) -> AppResult<Json<OrderSnapshot>> {
    let response = state
        .manager
        .execute_command(OrderCommand::new(&user.tenant_id, user.actor(), payload));
    let order = order_from_response(response, &state.manager, &user.tenant_id, order_id)?;
    Ok(Json(order))
}

/// List tenant orders (open ones unless `include_closed`)
pub async fn list(
    State(state): State<ServerState>,
    user: StaffUser,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<Vec<OrderSnapshot>>> {
    let orders = state
        .manager
        .list_orders(&user.tenant_id, query.include_closed)?;
    Ok(Json(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: StaffUser,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderSnapshot>> {
    Ok(Json(state.manager.get_order(&user.tenant_id, id)?))
}

/// Audit trail of one order
pub async fn events(
    State(state): State<ServerState>,
    user: StaffUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<OrderEvent>>> {
    Ok(Json(state.manager.get_events_for_order(&user.tenant_id, id)?))
}

pub async fn update_status(
    State(state): State<ServerState>,
    user: StaffUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    run(
        &state,
        &user,
        id,
        OrderCommandPayload::UpdateStatus {
            order_id: id,
            status: req.status,
        },
    )
}

pub async fn update_item_status(
    State(state): State<ServerState>,
    user: StaffUser,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateItemStatusRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    run(
        &state,
        &user,
        id,
        OrderCommandPayload::UpdateItemStatus {
            order_id: id,
            item_id,
            status: req.status,
        },
    )
}

pub async fn remove_item(
    State(state): State<ServerState>,
    user: StaffUser,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(req): Json<RemoveItemRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    run(
        &state,
        &user,
        id,
        OrderCommandPayload::RemoveItem {
            order_id: id,
            item_id,
            reason: req.reason,
        },
    )
}

/// Cash / terminal settlement, bypassing the provider
pub async fn mark_paid(
    State(state): State<ServerState>,
    user: StaffUser,
    Path(id): Path<i64>,
    Json(req): Json<MarkPaidRequest>,
) -> AppResult<Json<OrderSnapshot>> {
    let order = state
        .payments
        .staff_mark_paid(&user.tenant_id, id, &user, &req.method)
        .await?;
    Ok(Json(order))
}

/// Cancel a stuck intent with the provider and clear it from the order
pub async fn abandon_payment(
    State(state): State<ServerState>,
    user: StaffUser,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderSnapshot>> {
    let order = state
        .payments
        .abandon_payment(&user.tenant_id, id, &user)
        .await?;
    Ok(Json(order))
}

/// Re-query the provider for an order stuck mid-payment
pub async fn reconcile_payment(
    State(state): State<ServerState>,
    user: StaffUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ReconcileResponse>> {
    let report = state.payments.reconcile(&user.tenant_id, id).await?;
    Ok(Json(report))
}

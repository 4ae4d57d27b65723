use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{Caller, LeadId, LeadLabel, LeadStage, PropertyId, PropertyStatus};
use super::error::MarketplaceError;
use super::extract::{ValidJson, ValidQuery};
use super::notifications::NotificationPublisher;
use super::receipts::ReceiptId;
use super::repository::MarketplaceStore;
use super::requests::{
    ConfirmDeal, LeadQuery, NewProperty, PropertyChanges, PropertySearch, ReceiptQuery,
};
use super::service::MarketplaceService;

type SharedService<S, N> = State<Arc<MarketplaceService<S, N>>>;

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChange {
    pub(crate) status: PropertyStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VisibilityChange {
    pub(crate) hidden: bool,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RatingInput {
    pub(crate) score: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelChange {
    pub(crate) label: LeadLabel,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StageChange {
    pub(crate) stage: LeadStage,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NoteInput {
    pub(crate) body: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CancelRequest {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

/// Router builder exposing listing, lead, and deal endpoints.
pub fn marketplace_router<S, N>(service: Arc<MarketplaceService<S, N>>) -> Router
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/properties",
            post(create_property::<S, N>).get(search_properties::<S, N>),
        )
        .route(
            "/api/v1/properties/:property_id",
            get(get_property::<S, N>)
                .patch(update_property::<S, N>)
                .delete(delete_property::<S, N>),
        )
        .route(
            "/api/v1/properties/:property_id/status",
            patch(change_status::<S, N>),
        )
        .route(
            "/api/v1/properties/:property_id/visibility",
            patch(set_visibility::<S, N>),
        )
        .route(
            "/api/v1/properties/:property_id/ratings",
            post(rate_property::<S, N>),
        )
        .route(
            "/api/v1/properties/:property_id/contact",
            post(record_contact::<S, N>),
        )
        .route("/api/v1/leads", get(list_leads::<S, N>))
        .route("/api/v1/leads/:lead_id", get(get_lead::<S, N>))
        .route("/api/v1/leads/:lead_id/label", patch(set_lead_label::<S, N>))
        .route("/api/v1/leads/:lead_id/stage", patch(set_lead_stage::<S, N>))
        .route("/api/v1/leads/:lead_id/notes", post(add_lead_note::<S, N>))
        .route("/api/v1/deals/confirm", post(confirm_deal::<S, N>))
        .route("/api/v1/deals/receipts", get(list_receipts::<S, N>))
        .route(
            "/api/v1/deals/receipts/:receipt_id",
            get(get_receipt::<S, N>),
        )
        .route(
            "/api/v1/deals/receipts/:receipt_id/cancel",
            patch(cancel_deal::<S, N>),
        )
        .route(
            "/api/v1/deals/receipts/:receipt_id/complete",
            patch(complete_deal::<S, N>),
        )
        .with_state(service)
}

pub(crate) async fn create_property<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    ValidJson(draft): ValidJson<NewProperty>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let property = service.create_property(&caller, draft)?;
    Ok((StatusCode::CREATED, Json(property)))
}

pub(crate) async fn search_properties<S, N>(
    State(service): SharedService<S, N>,
    caller: Option<Caller>,
    ValidQuery(search): ValidQuery<PropertySearch>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let page = service.search_properties(caller.as_ref(), search)?;
    Ok(Json(page))
}

pub(crate) async fn get_property<S, N>(
    State(service): SharedService<S, N>,
    caller: Option<Caller>,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let property = service.get_property(caller.as_ref(), &PropertyId(property_id))?;
    Ok(Json(property))
}

pub(crate) async fn update_property<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(property_id): Path<String>,
    ValidJson(changes): ValidJson<PropertyChanges>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let property = service.update_property(&caller, &PropertyId(property_id), changes)?;
    Ok(Json(property))
}

pub(crate) async fn delete_property<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let property = service.delete_property(&caller, &PropertyId(property_id))?;
    Ok(Json(property))
}

pub(crate) async fn change_status<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(property_id): Path<String>,
    ValidJson(change): ValidJson<StatusChange>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let property = service.change_status(&caller, &PropertyId(property_id), change.status)?;
    Ok(Json(property))
}

pub(crate) async fn set_visibility<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(property_id): Path<String>,
    ValidJson(change): ValidJson<VisibilityChange>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let property = service.set_visibility(
        &caller,
        &PropertyId(property_id),
        change.hidden,
        change.reason,
    )?;
    Ok(Json(property))
}

pub(crate) async fn rate_property<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(property_id): Path<String>,
    ValidJson(rating): ValidJson<RatingInput>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let property = service.rate_property(&caller, &PropertyId(property_id), rating.score)?;
    Ok(Json(serde_json::json!({
        "property_id": property.id,
        "rating": property.rating(),
    })))
}

pub(crate) async fn record_contact<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let lead = service.record_contact(&caller, &PropertyId(property_id))?;
    Ok(Json(lead))
}

pub(crate) async fn list_leads<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    ValidQuery(query): ValidQuery<LeadQuery>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(service.list_leads(&caller, query)?))
}

pub(crate) async fn get_lead<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(lead_id): Path<String>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(service.get_lead(&caller, &LeadId(lead_id))?))
}

pub(crate) async fn set_lead_label<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(lead_id): Path<String>,
    ValidJson(change): ValidJson<LabelChange>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(service.set_lead_label(
        &caller,
        &LeadId(lead_id),
        change.label,
    )?))
}

pub(crate) async fn set_lead_stage<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(lead_id): Path<String>,
    ValidJson(change): ValidJson<StageChange>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(service.set_lead_stage(
        &caller,
        &LeadId(lead_id),
        change.stage,
        change.reason,
    )?))
}

pub(crate) async fn add_lead_note<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(lead_id): Path<String>,
    ValidJson(note): ValidJson<NoteInput>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(service.add_lead_note(
        &caller,
        &LeadId(lead_id),
        &note.body,
    )?))
}

pub(crate) async fn confirm_deal<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    ValidJson(request): ValidJson<ConfirmDeal>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let receipt = service.confirm_deal(&caller, request)?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub(crate) async fn list_receipts<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    ValidQuery(query): ValidQuery<ReceiptQuery>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(service.list_receipts(&caller, query)?))
}

pub(crate) async fn get_receipt<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(receipt_id): Path<String>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(service.get_receipt(&caller, &ReceiptId(receipt_id))?))
}

pub(crate) async fn cancel_deal<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(receipt_id): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    let Json(request) = body.unwrap_or_default();
    let receipt = service.cancel_deal(&caller, &ReceiptId(receipt_id), request.reason)?;
    Ok(Json(receipt))
}

pub(crate) async fn complete_deal<S, N>(
    State(service): SharedService<S, N>,
    caller: Caller,
    Path(receipt_id): Path<String>,
) -> Result<impl IntoResponse, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: NotificationPublisher + 'static,
{
    Ok(Json(service.complete_deal(&caller, &ReceiptId(receipt_id))?))
}

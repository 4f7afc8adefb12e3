use axum::{extract::State, http::StatusCode, Json};
use garde::Validate;
use kernel::model::{
    event::event::DeleteEvent,
    id::EventId,
    registration::event::{CancelRegistration, CreateRegistration},
    role::policy,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::{AuthorizedUser, JsonBody, PathParam},
    model::{
        event::{
            CreateEventRequest, CreateEventRequestWithCreator, CreatedEventResponse,
            EventCapacityResponse, EventResponse, EventsResponse, UpdateEventRequest,
            UpdateEventRequestWithIds,
        },
        registration::{RegistrationResponse, RegistrationsResponse},
    },
};

pub async fn register_event(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    JsonBody(req): JsonBody<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<CreatedEventResponse>)> {
    user.require(policy::MANAGE_EVENTS)?;
    req.validate(&())?;
    req.check_schedule()?;

    let event_id = registry
        .event_repository()
        .create(CreateEventRequestWithCreator::new(user.id(), req).into())
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedEventResponse { event_id })))
}

pub async fn show_event_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventsResponse>> {
    user.require(policy::BROWSE_EVENTS)?;

    let items = registry
        .event_repository()
        .find_all()
        .await?
        .into_iter()
        .map(EventResponse::from)
        .collect();

    Ok(Json(EventsResponse { items }))
}

pub async fn show_event(
    user: AuthorizedUser,
    PathParam(event_id): PathParam<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventResponse>> {
    user.require(policy::BROWSE_EVENTS)?;

    registry
        .event_repository()
        .find_by_id(event_id)
        .await
        .and_then(|e| match e {
            Some(e) => Ok(Json(e.into())),
            None => Err(AppError::EntityNotFound("Evento não encontrado".into())),
        })
}

pub async fn update_event(
    user: AuthorizedUser,
    PathParam(event_id): PathParam<EventId>,
    State(registry): State<AppRegistry>,
    JsonBody(req): JsonBody<UpdateEventRequest>,
) -> AppResult<StatusCode> {
    user.require(policy::MANAGE_EVENTS)?;
    req.validate(&())?;
    req.check_schedule()?;

    registry
        .event_repository()
        .update(UpdateEventRequestWithIds::new(event_id, user.id(), req).into())
        .await
        .map(|_| StatusCode::OK)
}

pub async fn delete_event(
    user: AuthorizedUser,
    PathParam(event_id): PathParam<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    user.require(policy::DELETE_EVENTS)?;

    registry
        .event_repository()
        .delete(DeleteEvent::new(event_id, user.id()))
        .await
        .map(|_| StatusCode::OK)
}

pub async fn show_capacity(
    user: AuthorizedUser,
    PathParam(event_id): PathParam<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventCapacityResponse>> {
    user.require(policy::BROWSE_EVENTS)?;

    registry
        .event_repository()
        .capacity(event_id)
        .await
        .map(EventCapacityResponse::from)
        .map(Json)
}

pub async fn register_for_event(
    user: AuthorizedUser,
    PathParam(event_id): PathParam<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<(StatusCode, Json<RegistrationResponse>)> {
    user.require(policy::BROWSE_EVENTS)?;

    let registration = registry
        .registration_repository()
        .create(CreateRegistration::new(event_id, user.id()))
        .await?;

    // メール送信の失敗は登録自体の結果に影響させない
    if let Err(e) = registry.mailer().registration_received(&registration).await {
        tracing::warn!(
            registration_id = %registration.registration_id,
            error.message = %e,
            "failed to send registration mail"
        );
    }

    Ok((StatusCode::CREATED, Json(registration.into())))
}

pub async fn cancel_registration(
    user: AuthorizedUser,
    PathParam(event_id): PathParam<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .registration_repository()
        .cancel(CancelRegistration::new(event_id, user.id()))
        .await
        .map(|_| StatusCode::OK)
}

pub async fn show_event_registrations(
    user: AuthorizedUser,
    PathParam(event_id): PathParam<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<RegistrationsResponse>> {
    user.require(policy::MANAGE_REGISTRATIONS)?;

    // 存在しないイベントは空の一覧ではなく 404 にする
    if registry.event_repository().find_by_id(event_id).await?.is_none() {
        return Err(AppError::EntityNotFound("Evento não encontrado".into()));
    }

    registry
        .registration_repository()
        .find_all(Some(event_id))
        .await
        .map(RegistrationsResponse::from)
        .map(Json)
}

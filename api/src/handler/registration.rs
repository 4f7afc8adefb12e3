use axum::{extract::State, Json};
use kernel::model::{
    id::RegistrationId,
    registration::RegistrationStatus,
    role::policy,
};
use registry::AppRegistry;
use shared::error::AppResult;

use crate::{
    extractor::{AuthorizedUser, JsonBody, PathParam, QueryParam},
    model::registration::{
        RegistrationListQuery, RegistrationResponse, RegistrationsResponse,
        UpdateRegistrationStatusRequest, UpdateRegistrationStatusRequestWithIds,
    },
};

pub async fn show_registration_list(
    user: AuthorizedUser,
    QueryParam(query): QueryParam<RegistrationListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<RegistrationsResponse>> {
    user.require(policy::MANAGE_REGISTRATIONS)?;

    registry
        .registration_repository()
        .find_all(query.event_id)
        .await
        .map(RegistrationsResponse::from)
        .map(Json)
}

pub async fn update_registration_status(
    user: AuthorizedUser,
    PathParam(registration_id): PathParam<RegistrationId>,
    State(registry): State<AppRegistry>,
    JsonBody(req): JsonBody<UpdateRegistrationStatusRequest>,
) -> AppResult<Json<RegistrationResponse>> {
    user.require(policy::MANAGE_REGISTRATIONS)?;

    let registration = registry
        .registration_repository()
        .update_status(UpdateRegistrationStatusRequestWithIds::new(registration_id, user.id(), req).into())
        .await?;

    if registration.status == RegistrationStatus::Confirmed {
        if let Err(e) = registry.mailer().registration_confirmed(&registration).await {
            tracing::warn!(
                %registration_id,
                error.message = %e,
                "failed to send confirmation mail"
            );
        }
    }

    Ok(Json(registration.into()))
}

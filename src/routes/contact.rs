use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::contact::{ContactForm, ContactMessageList, ContactSubmitted},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ActionResponse, ApiResponse},
    routes::params::ContactListQuery,
    services::contact_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(contact_form).post(submit_contact))
}

#[utoipa::path(
    get,
    path = "/api/contact",
    responses((status = 200, description = "Contact form, pre-filled for signed-in users", body = ApiResponse<ContactForm>)),
    tag = "Contact"
)]
pub async fn contact_form(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> AppResult<Json<ApiResponse<ContactForm>>> {
    let resp = contact_service::contact_form(&state, user.as_ref()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactForm,
    responses((status = 200, description = "`success` tells whether the message was stored", body = ContactSubmitted)),
    tag = "Contact"
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(form): Json<ContactForm>,
) -> Json<ActionResponse<ContactSubmitted>> {
    let result = contact_service::submit_contact(&state, user.as_ref(), form)
        .await
        .map(|message_id| ContactSubmitted { message_id });
    Json(ActionResponse::from_result(
        result,
        "Thank you for contacting us. We will get back to you soon.",
        "An error occurred while sending your message. Please try again later.",
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/contact-messages",
    params(ContactListQuery),
    responses(
        (status = 200, description = "Contact inbox, newest first", body = ApiResponse<ContactMessageList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Contact"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ContactListQuery>,
) -> AppResult<Json<ApiResponse<ContactMessageList>>> {
    let resp = contact_service::list_contact_messages(&state, &user, query).await?;
    Ok(Json(resp))
}

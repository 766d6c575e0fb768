use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{normalize_email, required, Envelope, LoginRequest, SignupRequest},
        extractors::Payload,
        repo_types::User,
        services::Registration,
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Payload(payload): Payload<LoginRequest>,
) -> Result<Json<Envelope<User>>, AuthError> {
    let email = normalize_email(required("Email", &payload.email)?);
    let password = required("Password", &payload.password)?;

    match state.auth.authenticate(&email, password).await? {
        Some(user) => Ok(Json(Envelope::new("Login successful", user))),
        None => {
            warn!(%email, "login rejected");
            Err(AuthError::InvalidCredentials)
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Payload(payload): Payload<SignupRequest>,
) -> Result<(StatusCode, Json<Envelope<()>>), AuthError> {
    let name = required("Name", &payload.name)?.trim().to_string();
    let email = normalize_email(required("Email", &payload.email)?);
    let password = required("Password", &payload.password)?.to_string();

    // Fast path; the store's unique index still catches concurrent signups.
    if state.auth.check_email_exists(&email).await? {
        return Err(AuthError::EmailTaken);
    }

    state
        .auth
        .register_user(Registration {
            name,
            email,
            password,
            image: payload.image,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::empty("User registered successfully")),
    ))
}

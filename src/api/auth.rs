// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::{
    auth::AuthError,
    models::{AuthResponse, LoginRequest, RegisterRequest},
    state::AppState,
};

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AuthError::InvalidInput(rejection.body_text()))
}

/// Create an account and return a token for it.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 200, body = AuthResponse),
        (status = 400, description = "Missing fields, invalid username or user already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let request = json_body(payload)?;
    let email = request
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());

    let token = state
        .authenticator
        .register(request.username.trim(), &request.password, email)
        .await?;

    Ok(Json(AuthResponse {
        message: "User registered".to_string(),
        token,
    }))
}

/// Exchange credentials for a token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Incorrect credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let request = json_body(payload)?;
    let token = state
        .authenticator
        .login(request.username.trim(), &request.password)
        .await?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
    }))
}

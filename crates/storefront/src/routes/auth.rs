//! Authentication route handlers.
//!
//! Credentials are checked by the shop API; the storefront only keeps the
//! returned identity in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::Email;

use super::{Nav, with_query};
use crate::api::types::{LoginRequest, RegisterRequest};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::AuthContext;
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub username: String,
    pub email: String,
    pub error: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(auth: AuthContext, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        nav: Nav::new(auth.current_user()),
        email: String::new(),
        error: query.error,
        success: query.success,
    }
}

/// Handle login form submission.
#[instrument(skip(state, auth, form))]
pub async fn login(
    State(state): State<AppState>,
    mut auth: AuthContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let failed = |nav: Nav, email: String, error: String| {
        (
            StatusCode::UNAUTHORIZED,
            LoginTemplate {
                nav,
                email,
                error: Some(error),
                success: None,
            },
        )
            .into_response()
    };

    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            let nav = Nav::new(auth.current_user());
            return Ok(failed(nav, form.email, format!("Invalid email: {e}")));
        }
    };

    let request = LoginRequest {
        email: email.to_string(),
        password: form.password,
    };

    match state.api().login(&request).await {
        Ok(user) => {
            let user = CurrentUser::from(user);
            set_sentry_user(&user);
            tracing::info!(user_id = %user.id, "User logged in");
            auth.login(user).await?;
            Ok(Redirect::to("/products").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let nav = Nav::new(auth.current_user());
            Ok(failed(nav, email.into_inner(), e.user_message("Login failed")))
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(auth: AuthContext, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate {
        nav: Nav::new(auth.current_user()),
        username: String::new(),
        email: String::new(),
        error: query.error,
    }
}

/// Handle registration form submission.
///
/// On success the visitor is sent to the login page; registering does not
/// sign them in.
#[instrument(skip(state, auth, form))]
pub async fn register(
    State(state): State<AppState>,
    auth: AuthContext,
    Form(form): Form<RegisterForm>,
) -> Response {
    let username = form.username.trim().to_string();
    let failed = |error: String| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            RegisterTemplate {
                nav: Nav::new(auth.current_user()),
                username: username.clone(),
                email: form.email.clone(),
                error: Some(error),
            },
        )
            .into_response()
    };

    if username.is_empty() {
        return failed("Username is required".to_string());
    }
    if form.password.is_empty() {
        return failed("Password is required".to_string());
    }
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => return failed(format!("Invalid email: {e}")),
    };

    let request = RegisterRequest {
        username: username.clone(),
        email: email.to_string(),
        password: form.password.clone(),
    };

    match state.api().register(&request).await {
        Ok(_) => {
            tracing::info!("Account registered");
            Redirect::to(&with_query(
                "/auth/login",
                "success",
                "Registration successful. Please log in.",
            ))
            .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            failed(e.user_message("Registration failed"))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip(state, auth))]
pub async fn logout(State(state): State<AppState>, mut auth: AuthContext) -> Result<Redirect, AppError> {
    if let Some(user) = auth.logout().await? {
        state.carts().forget(user.id);
        tracing::info!(user_id = %user.id, "User logged out");
    }
    clear_sentry_user();

    Ok(Redirect::to("/products"))
}

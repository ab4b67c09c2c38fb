//! Authentication context and extractors.
//!
//! The signed-in identity lives in the session. Handlers receive it
//! explicitly through one of three extractors:
//!
//! - [`AuthContext`] - read the identity and drive login/logout
//! - [`RequireAuth`] - the identity, or a redirect to the login page
//! - [`OptionalAuth`] - the identity if there is one

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Path unauthenticated visitors are sent to.
pub const LOGIN_PATH: &str = "/auth/login";

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// The session layer is missing from the router.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::MissingSession => {
                AppError::Internal("session layer missing".to_string()).into_response()
            }
        }
    }
}

async fn load_current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// The session's authentication state.
///
/// Views that only need to know *who* is signed in should prefer
/// [`RequireAuth`] or [`OptionalAuth`]; this type is for handlers that change
/// the identity.
pub struct AuthContext {
    session: Session,
    current_user: Option<CurrentUser>,
}

impl AuthContext {
    /// Build a context from a session and its already-loaded identity.
    #[must_use]
    pub const fn new(session: Session, current_user: Option<CurrentUser>) -> Self {
        Self {
            session,
            current_user,
        }
    }

    #[must_use]
    pub const fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Sign `user` in. The session id is rotated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn login(&mut self, user: CurrentUser) -> Result<(), tower_sessions::session::Error> {
        self.session.cycle_id().await?;
        self.session
            .insert(session_keys::CURRENT_USER, &user)
            .await?;
        self.current_user = Some(user);
        Ok(())
    }

    /// Replace the stored identity details (e.g., after a profile edit).
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn refresh(&mut self, user: CurrentUser) -> Result<(), tower_sessions::session::Error> {
        if self.current_user.is_some() {
            self.session
                .insert(session_keys::CURRENT_USER, &user)
                .await?;
            self.current_user = Some(user);
        }
        Ok(())
    }

    /// Sign out, discarding everything stored in the session.
    ///
    /// Returns the identity that was signed in, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be cleared.
    pub async fn logout(&mut self) -> Result<Option<CurrentUser>, tower_sessions::session::Error> {
        self.session.flush().await?;
        Ok(self.current_user.take())
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSession)?;
        let current_user = load_current_user(&session).await;

        Ok(Self::new(session, current_user))
    }
}

/// Extractor that requires an authenticated user.
///
/// If the user is not logged in, the handler never runs and the visitor is
/// redirected to the login page, so no authenticated backend call is made.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        load_current_user(session)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not
/// logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => load_current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bazaar_core::{Email, UserId};
    use tower_sessions::MemoryStore;

    use super::*;

    fn user(id: i64, username: &str) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            username: username.to_string(),
            email: Email::parse(&format!("{username}@example.com")).unwrap(),
        }
    }

    fn new_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_login_refresh_logout() {
        let session = new_session();
        let mut auth = AuthContext::new(session.clone(), None);
        assert!(!auth.is_authenticated());

        auth.login(user(1, "ada")).await.unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(load_current_user(&session).await, Some(user(1, "ada")));

        auth.refresh(user(1, "lovelace")).await.unwrap();
        assert_eq!(auth.current_user().unwrap().username, "lovelace");
        assert_eq!(
            load_current_user(auth.session()).await.unwrap().username,
            "lovelace"
        );

        let previous = auth.logout().await.unwrap();
        assert_eq!(previous.unwrap().id, UserId::new(1));
        assert!(!auth.is_authenticated());
        assert!(load_current_user(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_does_not_sign_in() {
        let session = new_session();
        let mut auth = AuthContext::new(session.clone(), None);

        auth.refresh(user(2, "grace")).await.unwrap();
        assert!(auth.current_user().is_none());
        assert!(load_current_user(&session).await.is_none());
    }

    #[test]
    fn test_redirect_rejection_points_at_login() {
        let response = AuthRejection::RedirectToLogin.into_response();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers().get("location").unwrap(), LOGIN_PATH);
    }
}

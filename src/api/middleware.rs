use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};
use axum::http::Extensions;
use sea_orm::DatabaseConnection;

use super::session::Session;
use crate::entities::user::Role;
use crate::error::{AppError, AppResult};
use crate::services::accounts;

/// The logged-in user, inserted by `require_login` / `require_admin`.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: i32,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners see their own records, admins see everything.
    pub fn ensure_can_access(&self, owner_id: i32) -> AppResult<()> {
        if self.is_admin() || self.id == owner_id {
            Ok(())
        } else {
            Err(AppError::forbidden("You do not have access to this resource"))
        }
    }
}

fn session_user_id(extensions: &Extensions) -> AppResult<i32> {
    extensions
        .get::<Session>()
        .and_then(Session::user_id)
        .ok_or(AppError::Unauthorized)
}

/// Resolves the session's user against the database, so role changes and
/// deleted accounts take effect on the next request.
async fn current_user(
    db: &DatabaseConnection,
    extensions: &Extensions,
) -> AppResult<CurrentUser> {
    let id = session_user_id(extensions)?;
    match accounts::find(db, id).await {
        Ok(user) => Ok(CurrentUser {
            id: user.id,
            role: user.role,
        }),
        Err(AppError::NotFound(_)) => Err(AppError::Unauthorized),
        Err(e) => Err(e),
    }
}

pub async fn require_login(
    Extension(db): Extension<DatabaseConnection>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let user = current_user(&db, request.extensions()).await?;
    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub async fn require_admin(
    Extension(db): Extension<DatabaseConnection>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let user = current_user(&db, request.extensions()).await?;
    if !user.is_admin() {
        return Err(AppError::forbidden("Administrator access required"));
    }

    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

//! Cookie-identified sessions persisted in the `sessions` table.
//!
//! `load_session` runs on every request. It resolves the cookie to a row, hands the
//! handler a shared [`Session`], and writes the row back afterwards if the handler
//! changed it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use uuid::Uuid;

use crate::cart::Cart;
use crate::entities::{session, user::Role, Session as SessionRow};
use crate::error::AppResult;

pub const COOKIE_NAME: &str = "travelbook_session";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Option<i32>,
    pub user_name: Option<String>,
    pub role: Option<Role>,
    #[serde(default)]
    pub cart: Cart,
}

impl SessionData {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

#[derive(Debug)]
struct State {
    id: Option<Uuid>,
    /// Row to drop once the data is saved under a fresh id.
    replaced: Option<Uuid>,
    data: SessionData,
    changed: bool,
    destroyed: bool,
}

/// Handle to the current request's session. Clones share the same state.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<State>>,
}

impl Session {
    fn new(id: Option<Uuid>, data: SessionData) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                id,
                replaced: None,
                data,
                changed: false,
                destroyed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn data(&self) -> SessionData {
        self.lock().data.clone()
    }

    pub fn user_id(&self) -> Option<i32> {
        self.lock().data.user_id
    }

    /// Mutates the session data and marks it for saving.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut state = self.lock();
        state.changed = true;
        f(&mut state.data)
    }

    /// Moves the data to a new id. Called when the identity changes so an id
    /// handed out before login cannot be reused afterwards.
    pub fn regenerate(&self) {
        let mut state = self.lock();
        if let Some(old) = state.id.take() {
            state.replaced.get_or_insert(old);
        }
        state.changed = true;
    }

    /// Drops everything, including the stored row and the cookie.
    pub fn destroy(&self) {
        let mut state = self.lock();
        state.data = SessionData::default();
        state.destroyed = true;
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    db: DatabaseConnection,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(db: DatabaseConnection, ttl_days: i64) -> Self {
        Self {
            db,
            ttl: Duration::days(ttl_days),
        }
    }

    fn expiry(&self) -> NaiveDateTime {
        (Utc::now() + self.ttl).naive_utc()
    }

    pub async fn load(&self, id: Uuid) -> AppResult<Option<SessionData>> {
        let Some(row) = SessionRow::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        if row.expires_at <= Utc::now().naive_utc() {
            SessionRow::delete_by_id(id).exec(&self.db).await?;
            return Ok(None);
        }
        match serde_json::from_str(&row.data) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                tracing::warn!(session_id = %id, "discarding unreadable session: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, id: Uuid, data: &SessionData) -> AppResult<()> {
        let encoded = serde_json::to_string(data)
            .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
        let row = session::ActiveModel {
            id: Set(id),
            data: Set(encoded),
            expires_at: Set(self.expiry()),
        };
        SessionRow::insert(row)
            .on_conflict(
                OnConflict::column(session::Column::Id)
                    .update_columns([session::Column::Data, session::Column::ExpiresAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Pushes the expiry forward without rewriting the data.
    pub async fn touch(&self, id: Uuid) -> AppResult<()> {
        SessionRow::update_many()
            .col_expr(
                session::Column::ExpiresAt,
                sea_orm::sea_query::Expr::value(self.expiry()),
            )
            .filter(session::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        SessionRow::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> AppResult<u64> {
        let res = SessionRow::delete_many()
            .filter(session::Column::ExpiresAt.lte(Utc::now().naive_utc()))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}

fn session_cookie(id: Uuid) -> Cookie<'static> {
    let mut cookie = Cookie::new(COOKIE_NAME, id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

pub async fn load_session(
    Extension(store): Extension<SessionStore>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = cookies
        .get(COOKIE_NAME)
        .and_then(|c| Uuid::parse_str(c.value()).ok());

    let loaded = match existing {
        Some(id) => match store.load(id).await {
            Ok(data) => data.map(|data| (id, data)),
            Err(e) => return e.into_response(),
        },
        None => None,
    };
    let session = match loaded {
        Some((id, data)) => Session::new(Some(id), data),
        None => Session::new(None, SessionData::default()),
    };

    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    if let Err(e) = persist(&store, &cookies, &session).await {
        tracing::error!("failed to persist session: {}", e);
    }
    response
}

async fn persist(store: &SessionStore, cookies: &Cookies, session: &Session) -> AppResult<()> {
    let (id, replaced, data, changed, destroyed) = {
        let state = session.lock();
        (
            state.id,
            state.replaced,
            state.data.clone(),
            state.changed,
            state.destroyed,
        )
    };

    if let Some(old) = replaced {
        store.remove(old).await?;
    }

    if destroyed {
        if let Some(id) = id {
            store.remove(id).await?;
        }
        let mut removal = Cookie::from(COOKIE_NAME);
        removal.set_path("/");
        cookies.remove(removal);
        return Ok(());
    }

    match (id, changed) {
        (id, true) => {
            let id = id.unwrap_or_else(Uuid::new_v4);
            store.save(id, &data).await?;
            cookies.add(session_cookie(id));
        }
        (Some(id), false) => store.touch(id).await?,
        (None, false) => {}
    }
    Ok(())
}

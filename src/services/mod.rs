//! Business rules. Handlers in `api` stay thin and call into these.

pub mod accounts;
pub mod catalog;
pub mod reservations;

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};

use crate::error::{AppError, AppResult};

const LIKE_ESCAPE: char = '\\';

/// Escapes `%`, `_` and the escape character so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match that behaves the same on Postgres and SQLite.
pub(crate) fn contains_ci<C: IntoColumnRef>(column: C, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

/// Trims and drops empty strings; form fields arrive as `""` when left blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Rejects values wider than the `varchar` column they are stored in.
pub(crate) fn check_len(value: &str, max: usize, what: &str) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{what} cannot be longer than {max} characters"
        )));
    }
    Ok(())
}

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Datelike, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set, SqlErr,
};
use serde::Deserialize;

use super::check_len;
use crate::entities::{user, User};
use crate::error::{AppError, AppResult};
use crate::rut;

pub const MIN_AGE_YEARS: i32 = 18;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PHONE_LEN: usize = 20;
const MAX_EMAIL_LEN: usize = 120;
const MAX_RUT_LEN: usize = 20;

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub national_id: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub birth_date: NaiveDate,
    pub phone: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
}

/// Latest birth date that is still of age on `today`.
pub fn adult_cutoff(today: NaiveDate) -> NaiveDate {
    let year = today.year() - MIN_AGE_YEARS;
    today
        .with_year(year)
        // Feb 29 with a non-leap target year
        .or_else(|| NaiveDate::from_ymd_opt(year, today.month(), today.day() - 1))
        .unwrap_or(today)
}

pub fn validate_birth_date(birth_date: NaiveDate, today: NaiveDate) -> AppResult<()> {
    if birth_date > today {
        return Err(AppError::validation("Birth date cannot be in the future"));
    }
    if birth_date > adult_cutoff(today) {
        return Err(AppError::validation(format!(
            "You must be at least {MIN_AGE_YEARS} years old"
        )));
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Chilean mobile number: `912345678`, `56912345678` or `+56912345678`.
pub fn is_valid_mobile(phone: &str) -> bool {
    let local = phone
        .strip_prefix("+56")
        .or_else(|| phone.strip_prefix("56"))
        .unwrap_or(phone);
    local.len() == 9 && local.starts_with('9') && local.bytes().all(|b| b.is_ascii_digit())
}

/// Letters (accented included), spaces, hyphens and apostrophes.
pub fn is_valid_person_name(name: &str) -> bool {
    let len = name.chars().count();
    (2..=200).contains(&len)
        && name
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace() || c == '-' || c == '\'')
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub async fn register(
    db: &DatabaseConnection,
    form: Registration,
    today: NaiveDate,
) -> AppResult<user::Model> {
    let full_name = form.full_name.trim().to_string();
    let name_len = full_name.chars().count();
    if !(3..=200).contains(&name_len) {
        return Err(AppError::validation(
            "Full name must be between 3 and 200 characters",
        ));
    }

    let national_id = rut::normalize(&form.national_id)
        .ok_or_else(|| AppError::validation("The RUT is not valid"))?;
    check_len(&national_id, MAX_RUT_LEN, "RUT")?;

    let email = form.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::validation("The email is not valid"));
    }
    check_len(&email, MAX_EMAIL_LEN, "Email")?;

    if form.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if form.password != form.confirm_password {
        return Err(AppError::validation("Passwords do not match"));
    }

    validate_birth_date(form.birth_date, today)?;

    let phone = form.phone.trim().to_string();
    if phone.is_empty() {
        return Err(AppError::validation("Phone is required"));
    }
    check_len(&phone, MAX_PHONE_LEN, "Phone")?;

    if User::find()
        .filter(user::Column::NationalId.eq(national_id.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("RUT already registered"));
    }
    if User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        return Err(AppError::conflict("Email already registered"));
    }

    let new_user = user::ActiveModel {
        full_name: Set(full_name),
        national_id: Set(national_id),
        email: Set(email),
        password_hash: Set(hash_password(&form.password)?),
        birth_date: Set(form.birth_date),
        phone: Set(Some(phone)),
        role: Set(user::Role::Client),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    // The lookups above can race with a concurrent registration.
    new_user.insert(db).await.map_err(|e| {
        if unique_violation(&e) {
            AppError::conflict("Email or RUT already registered")
        } else {
            AppError::from(e)
        }
    })
}

pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> AppResult<user::Model> {
    let invalid = || AppError::InvalidCredentials("Invalid email or password".to_string());

    let user = User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    if verify_password(password, &user.password_hash) {
        Ok(user)
    } else {
        Err(invalid())
    }
}

pub async fn find(db: &DatabaseConnection, user_id: i32) -> AppResult<user::Model> {
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i32,
    update: ProfileUpdate,
    today: NaiveDate,
) -> AppResult<user::Model> {
    let user = find(db, user_id).await?;
    let mut active_user = user.into_active_model();

    if let Some(full_name) = update.full_name {
        let full_name = full_name.trim().to_string();
        if !is_valid_person_name(&full_name) {
            return Err(AppError::validation(
                "Name may only contain letters, spaces, hyphens and apostrophes (2 to 200 characters)",
            ));
        }
        active_user.full_name = Set(full_name);
    }
    if let Some(birth_date) = update.birth_date {
        validate_birth_date(birth_date, today)?;
        active_user.birth_date = Set(birth_date);
    }
    if let Some(phone) = update.phone {
        let phone = phone.trim().to_string();
        if !is_valid_mobile(&phone) {
            return Err(AppError::validation(
                "Phone must look like +56912345678 or 912345678",
            ));
        }
        active_user.phone = Set(Some(phone));
    }

    Ok(active_user.update(db).await?)
}

pub async fn promote_to_admin(db: &DatabaseConnection, email: &str) -> AppResult<user::Model> {
    let user = User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let mut active_user = user.into_active_model();
    active_user.role = Set(user::Role::Admin);
    Ok(active_user.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn adult_cutoff_is_eighteen_years_back() {
        assert_eq!(adult_cutoff(date(2026, 10, 19)), date(2008, 10, 19));
        // leap day maps to Feb 28 of a common year
        assert_eq!(adult_cutoff(date(2024, 2, 29)), date(2006, 2, 28));
    }

    #[test]
    fn birth_date_rules() {
        let today = date(2026, 10, 19);
        assert!(validate_birth_date(date(2008, 10, 19), today).is_ok());
        assert!(validate_birth_date(date(2008, 10, 20), today).is_err());
        assert!(validate_birth_date(date(2027, 1, 1), today).is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ana@example.cl"));
        assert!(!is_valid_email("ana.example.cl"));
        assert!(!is_valid_email("@example.cl"));
        assert!(!is_valid_email("ana@localhost"));
        assert!(!is_valid_email("ana@ex ample.cl"));
        assert!(!is_valid_email("ana@example.cl."));
    }

    #[test]
    fn mobile_numbers() {
        assert!(is_valid_mobile("912345678"));
        assert!(is_valid_mobile("56912345678"));
        assert!(is_valid_mobile("+56912345678"));
        assert!(!is_valid_mobile("812345678"));
        assert!(!is_valid_mobile("+5691234567"));
        assert!(!is_valid_mobile("+1912345678"));
    }

    #[test]
    fn person_names() {
        assert!(is_valid_person_name("María José O'Higgins-Riquelme"));
        assert!(!is_valid_person_name("R2D2"));
        assert!(!is_valid_person_name("A"));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("secreto1").unwrap();
        assert!(verify_password("secreto1", &hash));
        assert!(!verify_password("secreto2", &hash));
        assert!(!verify_password("secreto1", "not-a-phc-string"));
    }
}

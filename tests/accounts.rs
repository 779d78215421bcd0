mod common;

use common::*;
use travelbook_server::{
    entities::user::Role,
    error::AppError,
    services::accounts::{self, ProfileUpdate},
};

#[tokio::test]
async fn registration_normalizes_and_hashes() {
    let db = setup_db().await;
    let mut form = registration("Ana Rojas", "  Ana@Example.CL ", 0);
    form.national_id = "12.345.678-5".to_string();

    let user = accounts::register(&db, form, today()).await.unwrap();

    assert_eq!(user.email, "ana@example.cl");
    assert_eq!(user.national_id, "12345678-5");
    assert_eq!(user.role, Role::Client);
    assert_ne!(user.password_hash, "secret123");
    assert!(accounts::verify_password("secret123", &user.password_hash));
}

#[tokio::test]
async fn registration_rejects_minors_and_bad_ruts() {
    let db = setup_db().await;

    let mut minor = registration("Young One", "young@example.cl", 11111111);
    minor.birth_date = date(2010, 1, 1);
    assert!(matches!(
        accounts::register(&db, minor, today()).await,
        Err(AppError::Validation(_))
    ));

    let mut bad_rut = registration("Bad Rut", "bad@example.cl", 0);
    bad_rut.national_id = "12.345.678-9".to_string();
    assert!(matches!(
        accounts::register(&db, bad_rut, today()).await,
        Err(AppError::Validation(_))
    ));

    let mut mismatch = registration("Mismatch", "mm@example.cl", 22222222);
    mismatch.confirm_password = "other".to_string();
    assert!(matches!(
        accounts::register(&db, mismatch, today()).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn duplicate_email_or_rut_conflicts() {
    let db = setup_db().await;
    create_user(&db, "ana@example.cl", 11111111).await;

    let same_email = registration("Other Person", "ANA@example.cl", 22222222);
    assert!(matches!(
        accounts::register(&db, same_email, today()).await,
        Err(AppError::Conflict(_))
    ));

    let same_rut = registration("Other Person", "other@example.cl", 11111111);
    assert!(matches!(
        accounts::register(&db, same_rut, today()).await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn authenticate_checks_the_password() {
    let db = setup_db().await;
    let user = create_user(&db, "ana@example.cl", 11111111).await;

    let found = accounts::authenticate(&db, "ANA@example.cl", "secret123")
        .await
        .unwrap();
    assert_eq!(found.id, user.id);

    assert!(matches!(
        accounts::authenticate(&db, "ana@example.cl", "wrong").await,
        Err(AppError::InvalidCredentials(_))
    ));
    assert!(matches!(
        accounts::authenticate(&db, "nobody@example.cl", "secret123").await,
        Err(AppError::InvalidCredentials(_))
    ));
}

#[tokio::test]
async fn profile_update_validates_each_field() {
    let db = setup_db().await;
    let user = create_user(&db, "ana@example.cl", 11111111).await;

    let updated = accounts::update_profile(
        &db,
        user.id,
        ProfileUpdate {
            full_name: Some("Ana María O'Higgins".to_string()),
            birth_date: None,
            phone: Some("56987654321".to_string()),
        },
        today(),
    )
    .await
    .unwrap();
    assert_eq!(updated.full_name, "Ana María O'Higgins");
    assert_eq!(updated.phone.as_deref(), Some("56987654321"));

    let bad_phone = accounts::update_profile(
        &db,
        user.id,
        ProfileUpdate {
            phone: Some("22345678".to_string()),
            ..Default::default()
        },
        today(),
    )
    .await;
    assert!(matches!(bad_phone, Err(AppError::Validation(_))));

    let bad_name = accounts::update_profile(
        &db,
        user.id,
        ProfileUpdate {
            full_name: Some("R2-D2".to_string()),
            ..Default::default()
        },
        today(),
    )
    .await;
    assert!(matches!(bad_name, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn promote_to_admin_changes_the_role() {
    let db = setup_db().await;
    let admin = create_admin(&db, "boss@example.cl", 11111111).await;
    assert_eq!(admin.role, Role::Admin);

    assert!(matches!(
        accounts::promote_to_admin(&db, "ghost@example.cl").await,
        Err(AppError::NotFound("User"))
    ));
}

#[tokio::test]
async fn registration_rejects_values_wider_than_their_columns() {
    let db = setup_db().await;

    let long_email = format!("{}@example.cl", "a".repeat(120));
    let form = registration("Ana Rojas", &long_email, 11111111);
    assert!(matches!(
        accounts::register(&db, form, today()).await,
        Err(AppError::Validation(m)) if m.contains("Email")
    ));

    let mut long_phone = registration("Ana Rojas", "ana@example.cl", 11111111);
    long_phone.phone = "9".repeat(21);
    assert!(matches!(
        accounts::register(&db, long_phone, today()).await,
        Err(AppError::Validation(m)) if m.contains("Phone")
    ));
}

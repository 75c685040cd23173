//! Client account tests against a real DuckDB file
//!
//! Run with: cargo test --test client_auth_test

use std::sync::Arc;

use tempfile::TempDir;

use barberbook_core::adapters::duckdb::DuckDbRepository;
use barberbook_core::services::{ClientAuthService, PasswordService};
use barberbook_core::{Error, NewUser, UserProfilePatch};

fn setup() -> (TempDir, Arc<DuckDbRepository>, ClientAuthService) {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(DuckDbRepository::new(&dir.path().join("barberbook.duckdb")).unwrap());
    repo.ensure_schema().unwrap();
    let service = ClientAuthService::new(repo.clone(), PasswordService::default());
    (dir, repo, service)
}

#[test]
fn test_ada_account_lifecycle() {
    let (_dir, repo, auth) = setup();

    let ada = auth
        .create_user(NewUser::new("Ada", "+250788000000", "secret1"))
        .unwrap();
    assert_eq!(ada.name, "Ada");
    assert!(!serde_json::to_string(&ada).unwrap().contains("password"));

    let err = auth
        .create_user(NewUser::new("Ada Again", "+250788000000", "secret2"))
        .unwrap_err();
    assert!(matches!(&err, Error::Conflict(m) if m == "Phone number already exists"));
    assert_eq!(repo.count_users().unwrap(), 1);

    let logged_in = auth.login_user("+250788000000", "secret1").unwrap();
    assert_eq!(logged_in.id, ada.id);

    auth.change_user_password(&ada.id, "secret1", "newpass1").unwrap();
    assert!(matches!(
        auth.login_user("+250788000000", "secret1"),
        Err(Error::Auth(_))
    ));
    assert_eq!(auth.login_user("+250788000000", "newpass1").unwrap().id, ada.id);
}

#[test]
fn test_wrong_password_fails_every_time() {
    let (_dir, _repo, auth) = setup();
    auth.create_user(NewUser::new("Grace", "+15550001111", "hopper1"))
        .unwrap();

    for _ in 0..3 {
        let err = auth.login_user("+15550001111", "nope").unwrap_err();
        assert_eq!(err.message(), "Invalid credentials");
    }
}

#[test]
fn test_login_by_email() {
    let (_dir, _repo, auth) = setup();
    let user = auth
        .create_user(NewUser::new("Linus", "+15550002222", "kernel1").with_email("Linus@Example.com"))
        .unwrap();
    assert_eq!(user.email.as_deref(), Some("linus@example.com"));

    let logged_in = auth.login_user("linus@example.com", "kernel1").unwrap();
    assert_eq!(logged_in.id, user.id);
}

#[test]
fn test_profile_update_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("barberbook.duckdb");

    let id = {
        let repo = Arc::new(DuckDbRepository::new(&db_path).unwrap());
        repo.ensure_schema().unwrap();
        let auth = ClientAuthService::new(repo, PasswordService::default());
        let user = auth
            .create_user(NewUser::new("Margaret", "+15550003333", "apollo11").with_email("mh@example.com"))
            .unwrap();
        auth.update_user_profile(&user.id, UserProfilePatch::default().with_name("Margaret H").clear_email())
            .unwrap();
        user.id
    };

    let repo = Arc::new(DuckDbRepository::new(&db_path).unwrap());
    repo.ensure_schema().unwrap();
    let auth = ClientAuthService::new(repo, PasswordService::default());
    let user = auth.get_user_by_id(&id).unwrap();
    assert_eq!(user.name, "Margaret H");
    assert_eq!(user.email, None);
    assert!(user.created_at.is_some());
}

#[test]
fn test_phone_change_conflicts_with_other_user() {
    let (_dir, _repo, auth) = setup();
    auth.create_user(NewUser::new("A", "+15550004444", "secret1")).unwrap();
    let b = auth.create_user(NewUser::new("B", "+15550005555", "secret1")).unwrap();

    let err = auth
        .update_user_profile(&b.id, UserProfilePatch::default().with_phone("+15550004444"))
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // Keeping one's own phone is not a conflict
    let same = auth
        .update_user_profile(&b.id, UserProfilePatch::default().with_phone("+15550005555"))
        .unwrap();
    assert_eq!(same.phone, "+15550005555");
}

#[test]
fn test_pepper_must_match() {
    let (_dir, repo, _) = setup();
    let peppered = ClientAuthService::new(repo.clone(), PasswordService::new(Some("pepper".to_string())));
    peppered
        .create_user(NewUser::new("Ken", "+15550006666", "unix1969"))
        .unwrap();

    let plain = ClientAuthService::new(repo, PasswordService::default());
    assert!(matches!(plain.login_user("+15550006666", "unix1969"), Err(Error::Auth(_))));
    assert!(peppered.login_user("+15550006666", "unix1969").is_ok());
}

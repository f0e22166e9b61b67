mod common;

use auth_core::models::AuthType;
use auth_core::AuthError;
use common::TestApp;

#[tokio::test]
async fn test_login_with_confirmed_account() {
    let app = TestApp::spawn(AuthType::Horusec);
    let account = app.create_account("u@x.com", "u", "Sn4ke!!", true);

    let response = app.service.login("u@x.com", "Sn4ke!!").await.unwrap();

    assert_eq!(response.email, "u@x.com");
    assert_eq!(response.username, "u");
    assert!(!response.is_application_admin);

    let credential = app
        .service
        .account_from_token(&response.access_token)
        .await
        .unwrap();
    assert_eq!(credential.sub, account.account_id);
    assert!(credential.permissions.is_empty());
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::spawn(AuthType::Horusec);
    app.create_account("u@x.com", "u", "Sn4ke!!", true);

    assert!(app.service.login("U@X.com", "Sn4ke!!").await.is_ok());
}

#[tokio::test]
async fn test_unconfirmed_account_is_distinguishable() {
    let app = TestApp::spawn(AuthType::Horusec);
    app.create_account("u@x.com", "u", "Sn4ke!!", false);

    let result = app.service.login("u@x.com", "Sn4ke!!").await;
    assert!(matches!(result, Err(AuthError::AccountNotConfirmed)));
}

#[tokio::test]
async fn test_unconfirmed_account_with_wrong_password_is_invalid_credentials() {
    let app = TestApp::spawn(AuthType::Horusec);
    app.create_account("u@x.com", "u", "Sn4ke!!", false);

    let result = app.service.login("u@x.com", "wrong").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_credential_failures_collapse() {
    let app = TestApp::spawn(AuthType::Horusec);
    app.create_account("u@x.com", "u", "Sn4ke!!", true);

    for (identifier, password) in [
        ("u@x.com", "sn4ke!!"),
        ("nobody@x.com", "Sn4ke!!"),
        ("not-an-email", "Sn4ke!!"),
    ] {
        let result = app.service.login(identifier, password).await;
        assert!(
            matches!(result, Err(AuthError::InvalidCredentials)),
            "{} should be rejected as invalid credentials",
            identifier
        );
    }
}

#[tokio::test]
async fn test_login_stores_refresh_entry() {
    let app = TestApp::spawn(AuthType::Horusec);
    app.create_account("u@x.com", "u", "Sn4ke!!", true);

    assert!(app.cache.is_empty());
    app.service.login("u@x.com", "Sn4ke!!").await.unwrap();
    assert_eq!(app.cache.len(), 1);
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let app = TestApp::spawn(AuthType::Horusec);
    app.create_account("u@x.com", "u", "Sn4ke!!", true);
    let response = app.service.login("u@x.com", "Sn4ke!!").await.unwrap();

    let mut tampered = response.access_token.clone();
    tampered.push('x');

    assert!(matches!(
        app.service.account_from_token(&tampered).await,
        Err(AuthError::InvalidToken)
    ));
}

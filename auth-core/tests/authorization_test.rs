mod common;

use auth_core::models::{AuthType, AuthorizationRequest, AuthorizationType, Role, ScopeRoleAssignment};
use auth_core::AuthError;
use common::{test_config, TestApp, WorkspaceOutageStore};
use std::sync::Arc;
use uuid::Uuid;

async fn token_for(app: &TestApp, email: &str) -> String {
    app.service
        .login(email, "Sn4ke!!")
        .await
        .expect("Login failed")
        .access_token
}

#[tokio::test]
async fn test_workspace_admin_administers_unassigned_repository() {
    let app = TestApp::spawn(AuthType::Horusec);
    let account = app.create_account("u@x.com", "u", "Sn4ke!!", true);
    let (workspace_id, repository_id) = (Uuid::new_v4(), Uuid::new_v4());
    app.store.assign(ScopeRoleAssignment::workspace(
        account.account_id,
        workspace_id,
        Role::Admin,
    ));
    let token = token_for(&app, "u@x.com").await;

    let request = AuthorizationRequest::new(token, AuthorizationType::RepositoryAdmin)
        .with_workspace(workspace_id)
        .with_repository(repository_id);

    assert!(app.service.is_authorized(&request).await.unwrap());
}

#[tokio::test]
async fn test_role_hierarchy_per_type() {
    let app = TestApp::spawn(AuthType::Horusec);
    let account = app.create_account("u@x.com", "u", "Sn4ke!!", true);
    let (workspace_id, repository_id) = (Uuid::new_v4(), Uuid::new_v4());
    app.store.assign(ScopeRoleAssignment::repository(
        account.account_id,
        workspace_id,
        repository_id,
        Role::Supervisor,
    ));
    let token = token_for(&app, "u@x.com").await;

    let expectations = [
        (AuthorizationType::RepositoryMember, true),
        (AuthorizationType::RepositorySupervisor, true),
        (AuthorizationType::RepositoryAdmin, false),
    ];
    for (authorization_type, expected) in expectations {
        let request = AuthorizationRequest::new(token.clone(), authorization_type)
            .with_workspace(workspace_id)
            .with_repository(repository_id);
        assert_eq!(
            app.service.is_authorized(&request).await.unwrap(),
            expected,
            "{:?}",
            authorization_type
        );
    }
}

#[tokio::test]
async fn test_no_assignment_is_clean_denial() {
    let app = TestApp::spawn(AuthType::Horusec);
    app.create_account("u@x.com", "u", "Sn4ke!!", true);
    let token = token_for(&app, "u@x.com").await;

    let request = AuthorizationRequest::new(token, AuthorizationType::RepositoryMember)
        .with_workspace(Uuid::new_v4())
        .with_repository(Uuid::new_v4());

    assert!(!app.service.is_authorized(&request).await.unwrap());
}

#[tokio::test]
async fn test_application_admin_bypass_covers_every_type() {
    let config = test_config(AuthType::Horusec, &[("ENABLE_APPLICATION_ADMIN", "true")]);
    let app = TestApp::builder(config).build();
    app.create_admin("root@x.com", "root", "Sn4ke!!");
    let token = token_for(&app, "root@x.com").await;

    for authorization_type in [
        AuthorizationType::ApplicationAdmin,
        AuthorizationType::WorkspaceAdmin,
        AuthorizationType::WorkspaceMember,
        AuthorizationType::RepositoryAdmin,
        AuthorizationType::RepositorySupervisor,
        AuthorizationType::RepositoryMember,
    ] {
        let request = AuthorizationRequest::new(token.clone(), authorization_type)
            .with_workspace(Uuid::new_v4())
            .with_repository(Uuid::new_v4());
        assert!(app.service.is_authorized(&request).await.unwrap());
    }
}

#[tokio::test]
async fn test_application_admin_request_fails_when_mode_disabled() {
    let app = TestApp::spawn(AuthType::Horusec);
    app.create_admin("root@x.com", "root", "Sn4ke!!");
    let token = token_for(&app, "root@x.com").await;

    let request = AuthorizationRequest::new(token, AuthorizationType::ApplicationAdmin);
    assert!(matches!(
        app.service.is_authorized(&request).await,
        Err(AuthError::ApplicationAdminDisabled)
    ));
}

#[tokio::test]
async fn test_workspace_fallback_error_keeps_not_found_cause() {
    let builder = TestApp::builder(test_config(AuthType::Horusec, &[]));
    let outage = Arc::new(WorkspaceOutageStore {
        inner: builder.memory_store(),
    });
    let app = builder.store_override(outage).build();
    app.create_account("u@x.com", "u", "Sn4ke!!", true);
    let token = token_for(&app, "u@x.com").await;

    let request = AuthorizationRequest::new(token, AuthorizationType::RepositoryAdmin)
        .with_workspace(Uuid::new_v4())
        .with_repository(Uuid::new_v4());

    match app.service.is_authorized(&request).await {
        Err(AuthError::WorkspaceFallback {
            repository_cause,
            source,
        }) => {
            assert!(repository_cause.is_not_found());
            assert!(source.to_string().contains("workspace table unavailable"));
        }
        other => panic!("Expected workspace fallback error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_token_is_rejected_before_lookup() {
    let app = TestApp::spawn(AuthType::Horusec);
    let request = AuthorizationRequest::new("garbage", AuthorizationType::WorkspaceMember)
        .with_workspace(Uuid::new_v4());

    assert!(matches!(
        app.service.is_authorized(&request).await,
        Err(AuthError::InvalidToken)
    ));
}

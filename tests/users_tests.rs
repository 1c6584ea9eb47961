// tests/users_tests.rs

mod common;

use agritech_admin::{
    common::error::AppError,
    models::{
        tenancy::{NewOrganizationUser, UserRole},
        Id,
    },
    services::OrganizationUsers,
};
use common::{MockApi, ORG_ID};

#[tokio::test]
async fn members_are_scoped_to_the_current_organization() {
    let mock = MockApi::start().await;
    let mut users = OrganizationUsers::new(mock.logged_in().await);

    let members = users.load().await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].role_label(), "OWNER");
    assert_eq!(members[1].role_label(), "USER");
    assert_eq!(members[1].email(), Some("juma@farm.io"));

    assert_eq!(mock.requests_to("GET", &format!("/organization-users/{ORG_ID}")).len(), 1);
}

#[tokio::test]
async fn removal_waits_for_the_server() {
    let mock = MockApi::start().await;
    let mut users = OrganizationUsers::new(mock.logged_in().await);
    users.load().await.unwrap();

    mock.fail_deletes(true);
    let err = users.remove(&Id::Number(2)).await.unwrap_err();
    assert!(matches!(err, AppError::Server { status: 500, .. }));
    assert_eq!(users.members().len(), 2);
    assert_eq!(users.error(), Some("Database unavailable"));

    mock.fail_deletes(false);
    users.remove(&Id::Number(2)).await.unwrap();
    assert_eq!(users.members().len(), 1);
    assert!(users.error().is_none());
    assert_eq!(mock.requests_to("DELETE", "/organization-users/2").len(), 2);
}

#[tokio::test]
async fn invalid_new_user_is_caught_locally() {
    let mock = MockApi::start().await;
    let mut users = OrganizationUsers::new(mock.logged_in().await);
    let before = mock.request_count();

    let err = users
        .create_user(&NewOrganizationUser {
            email: "not-an-email".into(),
            password: String::new(),
            role: UserRole::Member,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(users.error(), Some("A senha é obrigatória. Formato de e-mail inválido."));
    assert_eq!(mock.request_count(), before);
}

#[tokio::test]
async fn new_user_is_bound_to_the_organization() {
    let mock = MockApi::start().await;
    let mut users = OrganizationUsers::new(mock.logged_in().await);

    let created = users
        .create_user(&NewOrganizationUser {
            email: "field@farm.io".into(),
            password: "s3cret!!".into(),
            role: UserRole::Admin,
        })
        .await
        .unwrap();
    assert_eq!(created.email, "field@farm.io");
    assert_eq!(created.role.as_deref(), Some("ADMIN"));

    let body = &mock.posted("/auth/create-user")[0];
    assert_eq!(body["organizationId"], ORG_ID);
    assert_eq!(body["role"], "ADMIN");
    let sent = mock.requests_to("POST", "/auth/create-user");
    assert!(sent[0].authorization.as_deref().unwrap().starts_with("Bearer "));
}

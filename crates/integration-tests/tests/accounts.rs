//! Account flows over the full router: registration, login, sessions and
//! self-service changes.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use cadastro_core::Email;
use cadastro_integration_tests::{DEFAULT_PASSWORD, Form, TestApp};

#[tokio::test]
async fn test_register_login_me_logout() {
    let app = TestApp::new();
    let mut client = app.client();

    let response = client
        .post_json(
            "/api/usuarios",
            &json!({ "nome": "Ana", "email": "ana@exemplo.com", "senha": "123456" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["nome"], "Ana");
    assert_eq!(body["mensagem"], "Usuário cadastrado com sucesso!");
    assert!(body.get("senha").is_none());
    assert!(!client.has_session());

    let response = client.get("/api/usuarios/me").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["mensagem"], "Usuário não autenticado");

    let response = client.login("ana@exemplo.com", "123456").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["mensagem"], "Login realizado com sucesso");
    assert!(client.has_session());

    let response = client.get("/api/usuarios/me").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["email"], "ana@exemplo.com");

    let response = client.post_json("/api/usuarios/logout", &json!({})).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = client.get("/api/usuarios/me").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stored_credential_is_hashed() {
    let app = TestApp::new();
    app.client().register("Ana", "ana@exemplo.com", "123456").await;

    let credential = app
        .state()
        .account_store()
        .credential_by_email(&Email::parse("ana@exemplo.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_ne!(credential.password, "123456");
    assert!(credential.password.starts_with("$argon2"));
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("Ana", "ana@exemplo.com", "123456").await;

    let response = client
        .post_json(
            "/api/usuarios",
            &json!({ "nome": "Outra Ana", "email": "ana@exemplo.com", "senha": "abcdef" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json()["mensagem"], "Email já cadastrado");
}

#[tokio::test]
async fn test_register_validation_reports_fields() {
    let app = TestApp::new();
    let response = app
        .client()
        .post_json(
            "/api/usuarios",
            &json!({ "nome": "", "email": "not-an-email", "senha": "123" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["mensagem"], "Dados inválidos");
    assert!(body["campos"].get("nome").is_some());
    assert!(body["campos"].get("email").is_some());
    assert!(body["campos"].get("senha").is_some());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("Ana", "ana@exemplo.com", "123456").await;

    let wrong_password = client.login("ana@exemplo.com", "errada").await;
    let unknown_email = client.login("ninguem@exemplo.com", "123456").await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.json()["mensagem"], "Email ou senha incorretos");
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let app = TestApp::new();
    let response = app
        .client()
        .post_json("/api/usuarios/login", &json!({ "email": "ana@exemplo.com" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["mensagem"], "Email e senha são obrigatórios");
}

#[tokio::test]
async fn test_legacy_plaintext_credential_still_logs_in() {
    let app = TestApp::new();
    let email = Email::parse("antigo@exemplo.com").unwrap();
    app.state()
        .account_store()
        .create("Antigo", &email, "senha-antiga")
        .await
        .unwrap();

    let mut client = app.client();
    let response = client.login("antigo@exemplo.com", "senha-antiga").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = client.login("antigo@exemplo.com", "senha-errada").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_and_change_password_own_account() {
    let app = TestApp::new();
    let mut client = app.client();
    let id = client.signup("Ana", "ana@exemplo.com").await;

    let response = client
        .put_json(
            &format!("/api/usuarios/{id}"),
            &json!({ "nome": "Ana Maria", "email": "ana.maria@exemplo.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["nome"], "Ana Maria");

    let response = client
        .put_json(
            &format!("/api/usuarios/{id}/senha"),
            &json!({ "senhaAtual": "errada", "novaSenha": "nova-senha" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["mensagem"], "Senha atual incorreta");

    let response = client
        .put_json(
            &format!("/api/usuarios/{id}/senha"),
            &json!({ "senhaAtual": DEFAULT_PASSWORD, "novaSenha": "nova-senha" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let mut other = app.client();
    let response = other.login("ana.maria@exemplo.com", DEFAULT_PASSWORD).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let response = other.login("ana.maria@exemplo.com", "nova-senha").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_short_new_password_reports_field() {
    let app = TestApp::new();
    let mut client = app.client();
    let id = client.signup("Ana", "ana@exemplo.com").await;

    let response = client
        .put_json(
            &format!("/api/usuarios/{id}/senha"),
            &json!({ "senhaAtual": DEFAULT_PASSWORD, "novaSenha": "123" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["mensagem"], "Dados inválidos");
    assert!(body["campos"].get("senha").is_some());
}

#[tokio::test]
async fn test_update_to_taken_email_is_conflict() {
    let app = TestApp::new();
    app.client().register("Bia", "bia@exemplo.com", "123456").await;

    let mut ana = app.client();
    let id = ana.signup("Ana", "ana@exemplo.com").await;

    let response = ana
        .put_json(
            &format!("/api/usuarios/{id}"),
            &json!({ "nome": "Ana", "email": "bia@exemplo.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.json()["mensagem"],
        "Email já cadastrado por outro usuário"
    );
}

#[tokio::test]
async fn test_cannot_touch_another_account() {
    let app = TestApp::new();
    let mut ana = app.client();
    ana.signup("Ana", "ana@exemplo.com").await;
    let mut bia = app.client();
    let bia_id = bia.signup("Bia", "bia@exemplo.com").await;

    let response = ana
        .put_json(
            &format!("/api/usuarios/{bia_id}"),
            &json!({ "nome": "Invadido", "email": "bia@exemplo.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ana.delete(&format!("/api/usuarios/{bia_id}")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = bia.get("/api/usuarios/me").await;
    assert_eq!(response.json()["nome"], "Bia");
}

#[tokio::test]
async fn test_account_listing_hides_credentials() {
    let app = TestApp::new();
    app.client().register("Ana", "ana@exemplo.com", "123456").await;
    app.client().register("Bia", "bia@exemplo.com", "123456").await;

    let response = app.client().get("/api/usuarios").await;
    assert_eq!(response.status, StatusCode::OK);
    let accounts = response.json();
    let accounts = accounts.as_array().unwrap();
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|a| a.get("senha").is_none()));

    let response = app.client().get("/api/usuarios/9999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["mensagem"], "Usuário não encontrado");
}

#[tokio::test]
async fn test_debug_route_only_when_enabled() {
    let app = TestApp::new();
    app.client().register("Ana", "ana@exemplo.com", "123456").await;
    let response = app.client().get("/api/usuarios/debug/todos").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let app = TestApp::with_debug_routes();
    app.client().register("Ana", "ana@exemplo.com", "123456").await;
    let response = app.client().get("/api/usuarios/debug/todos").await;
    assert_eq!(response.status, StatusCode::OK);
    let accounts = response.json();
    assert!(accounts[0]["senha"].as_str().unwrap().starts_with("$argon2"));
}

#[tokio::test]
async fn test_delete_account_removes_owned_data_and_images() {
    let app = TestApp::new();
    let mut ana = app.client();
    let id = ana.signup("Ana", "ana@exemplo.com").await;

    let response = ana
        .post_form(
            "/api/produtos",
            &Form::product("Widget", "3", "9.99", "ACME").file(
                "imagem",
                "w.png",
                "image/png",
                b"\x89PNG fake",
            ),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let reference = response.json()["caminhoImagem"].as_str().unwrap().to_string();
    assert!(app.upload_path(&reference).exists());

    let response = ana.delete(&format!("/api/usuarios/{id}")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["mensagem"], "Usuário excluído com sucesso!");
    assert!(!app.upload_path(&reference).exists());
    assert!(!ana.has_session());

    let response = app.client().login("ana@exemplo.com", DEFAULT_PASSWORD).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // a fresh account with the same email starts empty
    let mut again = app.client();
    again.signup("Ana", "ana@exemplo.com").await;
    let response = again.get("/api/produtos").await;
    assert_eq!(response.json().as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let mut client = app.client();

    let response = client.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"ok");

    let response = client.get("/health/ready").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let response = app.client().get("/health").await;
    assert!(response.headers.get("x-request-id").is_some());
}

//! Product lifecycle with local image storage.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use cadastro_integration_tests::{Form, MAX_UPLOAD_BYTES, TestApp};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake image body";

#[tokio::test]
async fn test_widget_lifecycle() {
    let app = TestApp::new();
    let mut ana = app.client();
    ana.signup("Ana", "ana@exemplo.com").await;

    let response = ana
        .post_form(
            "/api/produtos",
            &Form::product("Widget", "10", "19,90", "ACME").file(
                "imagem",
                "foto.PNG",
                "image/png",
                PNG,
            ),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let created = response.json();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["descricao"], "Widget");
    assert_eq!(created["quantidade"], 10);
    assert!((created["valor"].as_f64().unwrap() - 19.9).abs() < f64::EPSILON);
    assert_eq!(created["fornecedor"], "ACME");

    let reference = created["caminhoImagem"].as_str().unwrap().to_string();
    assert!(reference.starts_with("uploads/"));
    assert!(reference.ends_with(".png"));
    assert_eq!(std::fs::read(app.upload_path(&reference)).unwrap(), PNG);

    // local references double as site-relative URLs
    let response = ana.get(&format!("/{reference}")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], PNG);

    let response = ana.get(&format!("/api/produtos/{id}")).await;
    assert_eq!(response.json()["caminhoImagem"], reference.as_str());

    let response = ana.delete(&format!("/api/produtos/{id}")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["mensagem"], "Produto excluído com sucesso!");
    assert!(!app.upload_path(&reference).exists());

    let response = ana.get(&format!("/api/produtos/{id}")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["mensagem"], "Produto não encontrado");
}

#[tokio::test]
async fn test_update_replaces_or_keeps_image() {
    let app = TestApp::new();
    let mut ana = app.client();
    ana.signup("Ana", "ana@exemplo.com").await;

    let created = ana
        .post_form(
            "/api/produtos",
            &Form::product("Widget", "1", "5", "").file("imagem", "a.png", "image/png", PNG),
        )
        .await
        .json();
    let id = created["id"].as_i64().unwrap();
    let first = created["caminhoImagem"].as_str().unwrap().to_string();
    assert!(created["fornecedor"].is_null());

    // no file: image kept
    let response = ana
        .put_form(
            &format!("/api/produtos/{id}"),
            &Form::product("Widget azul", "2", "6", "ACME"),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let updated = response.json();
    assert_eq!(updated["descricao"], "Widget azul");
    assert_eq!(updated["caminhoImagem"], first.as_str());
    assert_eq!(updated["dataCadastro"], created["dataCadastro"]);
    assert!(app.upload_path(&first).exists());

    // new file: old blob removed
    let response = ana
        .put_form(
            &format!("/api/produtos/{id}"),
            &Form::product("Widget azul", "2", "6", "ACME").file(
                "imagem",
                "b.jpg",
                "image/jpeg",
                b"jpeg bytes",
            ),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let second = response.json()["caminhoImagem"].as_str().unwrap().to_string();
    assert_ne!(second, first);
    assert!(second.ends_with(".jpg"));
    assert!(!app.upload_path(&first).exists());
    assert!(app.upload_path(&second).exists());
}

#[tokio::test]
async fn test_empty_and_oversized_images_are_ignored() {
    let app = TestApp::new();
    let mut ana = app.client();
    ana.signup("Ana", "ana@exemplo.com").await;

    let response = ana
        .post_form(
            "/api/produtos",
            &Form::product("Sem imagem", "1", "1", "").file("imagem", "", "application/octet-stream", b""),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.json()["caminhoImagem"].is_null());

    let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
    let response = ana
        .post_form(
            "/api/produtos",
            &Form::product("Grande", "1", "1", "").file(
                "imagem",
                "big.png",
                "image/png",
                &oversized,
            ),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.json()["caminhoImagem"].is_null());
    assert_eq!(std::fs::read_dir(app.uploads_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_form_uploads_nothing() {
    let app = TestApp::new();
    let mut ana = app.client();
    ana.signup("Ana", "ana@exemplo.com").await;

    let response = ana
        .post_form(
            "/api/produtos",
            &Form::product("", "muitos", "-1", "").file("imagem", "a.png", "image/png", PNG),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let fields = response.json()["campos"].clone();
    assert!(fields.get("descricao").is_some());
    assert!(fields.get("quantidade").is_some());
    assert!(fields.get("valor").is_some());

    assert_eq!(std::fs::read_dir(app.uploads_dir()).unwrap().count(), 0);
    assert_eq!(
        ana.get("/api/produtos").await.json().as_array().unwrap().len(),
        0
    );
}

#[tokio::test]
async fn test_products_are_owner_scoped() {
    let app = TestApp::new();
    let mut ana = app.client();
    ana.signup("Ana", "ana@exemplo.com").await;
    let mut bia = app.client();
    bia.signup("Bia", "bia@exemplo.com").await;

    let created = ana
        .post_form(
            "/api/produtos",
            &Form::product("Widget", "1", "1", "").file("imagem", "a.png", "image/png", PNG),
        )
        .await
        .json();
    let id = created["id"].as_i64().unwrap();
    let reference = created["caminhoImagem"].as_str().unwrap().to_string();
    let uri = format!("/api/produtos/{id}");

    assert_eq!(bia.get(&uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        bia.put_form(&uri, &Form::product("Meu", "1", "1", "")).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(bia.delete(&uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        bia.get("/api/produtos").await.json().as_array().unwrap().len(),
        0
    );

    assert!(app.upload_path(&reference).exists());
    assert_eq!(ana.get(&uri).await.json()["descricao"], "Widget");
}

#[tokio::test]
async fn test_bearer_client_can_create_products() {
    let app = TestApp::new();
    let id = app.client().register("Ana", "ana@exemplo.com", "123456").await;

    let mut api = app.client().with_bearer(&app.token_for(id));
    let response = api
        .post_form("/api/produtos", &Form::product("Via token", "4", "2.50", ""))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let mut ana = app.client();
    ana.login("ana@exemplo.com", "123456").await;
    let listed = ana.get("/api/produtos").await.json();
    assert_eq!(listed[0]["descricao"], "Via token");
}

#[tokio::test]
async fn test_price_must_fit_in_cents() {
    let app = TestApp::new();
    let mut ana = app.client();
    ana.signup("Ana", "ana@exemplo.com").await;

    for price in ["9.999", "10000000000000000"] {
        let response = ana
            .post_form("/api/produtos", &Form::product("Widget", "1", price, ""))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{price}");
        assert!(response.json()["campos"].get("valor").is_some());
    }
}

// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers};

// fotos em base64 e planilhas grandes do coletor
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(app_state: AppState) -> Router {
    let prefix = app_state.settings.routes_prefix.clone();

    let tag_routes = Router::new()
        .route(
            "/",
            get(handlers::tags::list_tags).post(handlers::tags::create_tag),
        )
        .route("/estatisticas", get(handlers::tags::tag_statistics))
        .route(
            "/{id}",
            get(handlers::tags::get_tag).put(handlers::tags::update_tag),
        )
        .route("/{id}/foto", get(handlers::tags::get_tag_photo))
        .route("/{id}/destruir", post(handlers::tags::destroy_tag))
        .route("/{id}/restaurar", post(handlers::tags::restore_tag));

    let loan_routes = Router::new()
        .route(
            "/",
            get(handlers::loans::list_loans).post(handlers::loans::create_loan),
        )
        .route("/estatisticas", get(handlers::loans::loan_statistics))
        .route("/pendentes", get(handlers::loans::pending_loans))
        .route("/{id}", get(handlers::loans::get_loan))
        .route("/{id}/devolver", post(handlers::loans::return_loan))
        .route(
            "/colaborador/{id}/ativos",
            get(handlers::loans::active_by_collaborator),
        )
        .route(
            "/ferramenta/{hex}/historico",
            get(handlers::loans::tool_history),
        )
        .route(
            "/ferramenta/{hex}/disponibilidade",
            get(handlers::loans::tool_availability),
        );

    let inventory_routes = Router::new()
        .route(
            "/",
            get(handlers::inventories::list_inventories).post(handlers::inventories::create_inventory),
        )
        .route("/estatisticas", get(handlers::inventories::inventory_statistics))
        .route("/ultimo", get(handlers::inventories::latest_inventory))
        .route("/modelo-csv", get(handlers::inventories::csv_template))
        // caminho antigo, ainda usado pelos clientes do coletor
        .route("/download-template", get(handlers::inventories::csv_template))
        .route("/{id}", get(handlers::inventories::get_inventory))
        .route("/{id}/itens", get(handlers::inventories::list_items))
        .route("/{id}/itens/{hex}", put(handlers::inventories::update_item))
        .route("/{id}/processar-csv", post(handlers::inventories::process_csv))
        .route("/{id}/finalizar", post(handlers::inventories::finalize_inventory))
        .route("/{id}/exportar", get(handlers::inventories::export_inventory));

    let read_routes = Router::new()
        .route(
            "/",
            get(handlers::reads::list_reads).post(handlers::reads::ingest_reads),
        )
        .route("/estatisticas", get(handlers::reads::read_statistics))
        .route("/etiqueta/{hex}", get(handlers::reads::reads_by_tag))
        .route("/ultimas/{minutos}", get(handlers::reads::recent_reads));

    let ping_routes = Router::new()
        .route("/", get(handlers::pings::list_pings))
        .route("/estatisticas", get(handlers::pings::ping_statistics))
        .route("/etiqueta/{hex}", get(handlers::pings::pings_by_tag))
        .route("/ultimos/{minutos}", get(handlers::pings::recent_pings))
        .route("/antenas", get(handlers::pings::list_antennas))
        .route("/foto", get(handlers::pings::photo_at))
        .route("/foto/{hex}", get(handlers::pings::latest_photo))
        .route("/foto/{hex}/info", get(handlers::pings::photo_info));

    let api_routes = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/etiquetas", tag_routes)
        .nest("/emprestimos", loan_routes)
        .nest("/inventarios", inventory_routes)
        .nest("/leituras", read_routes)
        .nest("/ping", ping_routes);

    let mut openapi = ApiDoc::openapi();
    openapi.servers = Some(vec![utoipa::openapi::Server::new(prefix.clone())]);

    Router::new()
        .nest(&format!("{prefix}/api"), api_routes)
        .merge(
            SwaggerUi::new(format!("{prefix}/swagger-ui"))
                .url(format!("{prefix}/api-docs/openapi.json"), openapi),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Settings;

    // Banco nunca é tocado: cada caso falha (ou responde) antes da consulta.
    fn test_app() -> Router {
        let settings = Settings::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&settings.database_url)
            .unwrap();
        build_router(AppState::with_pool(pool, settings))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_answers_ok_under_prefix() {
        let response = test_app()
            .oneshot(Request::get("/RFID/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn routes_outside_prefix_are_not_found() {
        let response = test_app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn csv_template_is_an_attachment() {
        for path in ["modelo-csv", "download-template"] {
            let response = test_app()
                .oneshot(
                    Request::get(format!("/RFID/api/inventarios/{path}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
            assert!(content_type.starts_with("text/csv"));
            let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
            assert!(disposition.starts_with("attachment"));

            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            assert!(bytes.starts_with(b"EPC,Observacao"));
        }
    }

    #[tokio::test]
    async fn blank_tag_code_is_rejected() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/RFID/api/etiquetas",
                json!({ "etiquetaHex": "   ", "descricao": "Chave de torque" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Informe o código da etiqueta");
    }

    #[tokio::test]
    async fn loan_without_collaborator_is_rejected() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/RFID/api/emprestimos",
                json!({ "idColaborador": 0, "etiquetaHex": "AAA0AAAA0000000000001A2B" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Um ou mais campos são inválidos.");
        assert_eq!(body["details"]["id_colaborador"][0], "Informe o colaborador");
    }

    #[tokio::test]
    async fn validation_message_follows_accept_language() {
        let mut request = json_request(
            "POST",
            "/RFID/api/inventarios",
            json!({ "idColaborador": -3 }),
        );
        request
            .headers_mut()
            .insert(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9".parse().unwrap());

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "One or more fields are invalid.");
    }

    #[tokio::test]
    async fn inventory_status_filter_must_match_exactly() {
        let response = test_app()
            .oneshot(
                Request::get("/RFID/api/inventarios?status=finalizado")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Status inválido"));
    }

    #[tokio::test]
    async fn loan_status_filter_is_validated() {
        let response = test_app()
            .oneshot(
                Request::get("/RFID/api/emprestimos?status=perdido")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::get("/RFID/api/etiquetas?limite=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "O limite deve estar entre 1 e 1000");
    }

    #[tokio::test]
    async fn csv_without_epc_column_is_rejected() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/RFID/api/inventarios/7/processar-csv",
                json!({ "csvContent": "Codigo;Observacao\nAAA0AAAA0000000000001A2B;ok" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn csv_upload_needs_a_csv_file() {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"arquivo\"; filename=\"coletor.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             EPC\r\nAAA0AAAA0000000000001A2B\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::post("/RFID/api/inventarios/7/processar-csv")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "O arquivo deve ter extensão .csv");
    }

    #[tokio::test]
    async fn recent_pings_window_is_bounded() {
        for minutos in ["0", "1441"] {
            let response = test_app()
                .oneshot(
                    Request::get(format!("/RFID/api/ping/ultimos/{minutos}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn ping_antenna_filter_is_validated() {
        let response = test_app()
            .oneshot(
                Request::get("/RFID/api/ping?antena=norte")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn read_batch_must_not_be_empty() {
        let response = test_app()
            .oneshot(json_request("POST", "/RFID/api/leituras", json!({ "leituras": [] })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["details"]["leituras"][0], "Envie entre 1 e 500 leituras");
    }

    #[tokio::test]
    async fn recent_reads_need_a_positive_window() {
        let response = test_app()
            .oneshot(
                Request::get("/RFID/api/leituras/ultimas/0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "O período deve ser de pelo menos 1 minuto");
    }

    #[tokio::test]
    async fn read_statistics_reject_malformed_dates() {
        let response = test_app()
            .oneshot(
                Request::get("/RFID/api/leituras/estatisticas?horarioInicio=ontem")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("horarioInicio"));
    }

    #[tokio::test]
    async fn inventory_statistics_period_is_bounded() {
        let response = test_app()
            .oneshot(
                Request::get("/RFID/api/inventarios/estatisticas?dias=400")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = test_app()
            .oneshot(
                Request::get("/RFID/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["paths"]["/api/emprestimos"].is_object());
        assert!(body["paths"]["/api/leituras/ultimas/{minutos}"].is_object());
    }
}

//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    // RUST_LOG sobrescreve o filtro padrão
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("controle_rfid=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    // Sem banco ou configuração válida a aplicação não deve subir.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let addr = app_state.settings.bind_addr.clone();
    let prefix = app_state.settings.routes_prefix.clone();
    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    match listener.local_addr() {
        Ok(local) => tracing::info!("🚀 Servidor escutando em {} (rotas em {}/api)", local, prefix),
        Err(_) => tracing::info!("🚀 Servidor escutando em {}", addr),
    }
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}

//! Servidor web Axum que carrega o gazetteer na inicialização e anota documentos
//! via HTTP (resposta completa) ou WebSocket (eventos em tempo real).
//!
//! Variáveis de ambiente:
//! - `GAZETTEER_CONFIG`: arquivo JSON de configuração (opcional).
//! - `GAZETTEER_DICTIONARY`: arquivo do dicionário (sobrepõe `dictionary_path`).
//! - `GAZETTEER_ADDR`: endereço de escuta (padrão `0.0.0.0:3000`).
//! - `RUST_LOG`: filtro de log (padrão `info`).

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use gazetteer_core::{
    tokenizer::tokenize, Annotation, BoundaryRegion, GazetteerConfig, GazetteerError, GazetteerPipeline,
    PipelineEvent, Token,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Estado compartilhado da aplicação: o pipeline (e o autômato imutável dentro dele)
struct AppState {
    pipeline: GazetteerPipeline,
}

#[derive(Deserialize)]
struct AnnotateRequest {
    text: String,
    /// Tokens já processados pelo hospedeiro (com lemas); senão o texto é tokenizado aqui.
    #[serde(default)]
    tokens: Option<Vec<Token>>,
    #[serde(default)]
    regions: Option<Vec<BoundaryRegion>>,
}

/// Mensagem WebSocket recebida do cliente
#[derive(Deserialize)]
struct WsRequest {
    text: String,
    #[serde(default)]
    regions: Option<Vec<BoundaryRegion>>,
}

#[derive(Serialize)]
struct AnnotateResponse {
    annotations: Vec<Annotation>,
    tokens: Vec<Token>,
    total_matches: usize,
}

#[derive(Serialize)]
struct DictionaryStats {
    sequences: usize,
    values: usize,
    nodes: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Erros de dicionário ou configuração abortam a inicialização
    let pipeline = match load_pipeline() {
        Ok(p) => p,
        Err(e) => {
            error!("falha ao inicializar o gazetteer: {}", e);
            std::process::exit(1);
        }
    };
    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/annotate", post(annotate_handler))
        .route("/ws", get(ws_handler))
        .route("/dictionary", get(dictionary_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = std::env::var("GAZETTEER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("não foi possível escutar em {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("🚀 Servidor do gazetteer iniciado em http://{}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("servidor encerrado com erro: {}", e);
    }
}

/// Lê configuração e dicionário a partir do ambiente e compila o autômato.
fn load_pipeline() -> gazetteer_core::Result<GazetteerPipeline> {
    let mut config = match std::env::var("GAZETTEER_CONFIG") {
        Ok(path) => {
            info!("carregando configuração de {}", path);
            GazetteerConfig::from_file(path)?
        }
        Err(_) => {
            warn!("GAZETTEER_CONFIG não definido, usando configuração padrão");
            GazetteerConfig::default()
        }
    };

    if let Ok(path) = std::env::var("GAZETTEER_DICTIONARY") {
        config.dictionary_path = Some(PathBuf::from(path));
    }

    let pipeline = GazetteerPipeline::from_config_file(&config)?;
    let automaton = pipeline.automaton();
    info!(
        sequences = automaton.entry_count(),
        nodes = automaton.node_count(),
        adapter = ?config.adapter_variant,
        boundaries = ?config.boundary_region_source,
        "gazetteer pronto"
    );
    Ok(pipeline)
}

fn error_response(e: GazetteerError) -> Response {
    let status = if e.is_caller_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}

/// Anotação via HTTP POST (sem streaming)
async fn annotate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnnotateRequest>,
) -> Response {
    // A varredura é síncrona: roda fora do runtime, como no WebSocket
    let outcome = tokio::task::spawn_blocking(move || {
        let tokens = req.tokens.unwrap_or_else(|| tokenize(&req.text));
        state.pipeline.annotate_tokens(&req.text, tokens, req.regions)
    })
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("tarefa de anotação falhou: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match outcome {
        Ok(result) => Json(AnnotateResponse {
            annotations: result.annotations,
            tokens: result.tokens,
            total_matches: result.total_matches,
        })
        .into_response(),
        Err(e) => {
            warn!("documento rejeitado: {}", e);
            error_response(e)
        }
    }
}

/// Estatísticas do autômato carregado
async fn dictionary_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let automaton = state.pipeline.automaton();
    Json(DictionaryStats {
        sequences: automaton.entry_count(),
        values: automaton.value_count(),
        nodes: automaton.node_count(),
    })
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Recebe texto, executa o pipeline e devolve os eventos em ordem
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // JSON {text, regions}; senão a mensagem inteira é o texto
                let (text_str, regions) = match serde_json::from_str::<WsRequest>(&text) {
                    Ok(req) => (req.text, req.regions),
                    Err(_) => (text.to_string(), None),
                };

                if text_str.trim().is_empty() {
                    continue;
                }

                let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                let state_for_thread = Arc::clone(&state);

                // O pipeline é síncrono: roda fora do runtime
                let handle = tokio::task::spawn_blocking(move || {
                    state_for_thread.pipeline.annotate_streaming(&text_str, regions, tx);
                });
                if let Err(e) = handle.await {
                    error!("tarefa de anotação falhou: {}", e);
                    return;
                }

                let events: Vec<PipelineEvent> = rx.try_iter().collect();
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            return; // cliente desconectou
                        }
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

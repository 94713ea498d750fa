use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Multipart, State,
    },
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use mongodb::bson::{self, Bson};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::AppError,
    hub::HubMessage,
    model::{parse_diagnosis, DiagnosisRecord, DiagnosisResponse},
    state::AppState,
    utils::encode_image,
};

pub const IMAGE_FIELD: &str = "image";

pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DiagnosisResponse>, AppError> {
    let mut image_data = None;

    while let Some(field) = multipart.next_field().await? {
        // Only a file part counts; a plain text field named `image` is skipped.
        if field.name() == Some(IMAGE_FIELD) && field.file_name().is_some() {
            image_data = Some(field.bytes().await?);
            break;
        }
    }

    let image_data = image_data.ok_or(AppError::MissingImage)?;
    let base64_image = encode_image(&image_data);

    let text = state.inference.diagnose(&image_data, &base64_image).await?;
    let diagnosis = parse_diagnosis(&text)?;

    let record = DiagnosisRecord {
        diagnosis,
        base64_image,
    };
    let id = state.store.insert(bson::to_document(&record)?).await?;
    info!(id = %id, decision = ?record.diagnosis.decision, "Diagnosis stored");

    let response = DiagnosisResponse {
        record,
        id: id.to_hex(),
    };
    state
        .hub
        .broadcast(HubMessage::Result(response.clone()))
        .await;

    Ok(Json(response))
}

/// Every stored record as relaxed Extended JSON, so `_id` renders as `{"$oid": "..."}`.
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, AppError> {
    let documents = state.store.all().await?;

    let history = documents
        .into_iter()
        .map(|document| Bson::Document(document).into_relaxed_extjson())
        .collect();

    Ok(Json(history))
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (conn_id, mut rx) = state.hub.register().await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames are ignored; reading only detects the close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister(&conn_id).await;
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

//! ResultHub - WebSocket fan-out of finished analyses
//!
//! Every connected client gets its own unbounded queue. A broadcast serializes the message
//! once and pushes it into each queue; nothing is acknowledged and late joiners get nothing.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::model::DiagnosisResponse;

/// Wire format: `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum HubMessage {
    Result(DiagnosisResponse),
}

impl HubMessage {
    fn event(&self) -> &'static str {
        match self {
            HubMessage::Result(_) => "result",
        }
    }
}

pub struct ResultHub {
    connections: RwLock<HashMap<Uuid, mpsc::UnboundedSender<String>>>,
    connection_count: AtomicU64,
}

impl ResultHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.connections.write().await.insert(id, tx);
        self.connection_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(connection_id = %id, "Subscriber connected");

        (id, rx)
    }

    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Subscriber disconnected");
        }
    }

    pub async fn broadcast(&self, message: HubMessage) {
        let event = message.event();

        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, event, "Failed to serialize message");
                return;
            }
        };

        let connections = self.connections.read().await;
        tracing::info!(event, subscribers = connections.len(), "Broadcasting");

        for (id, tx) in connections.iter() {
            if let Err(e) = tx.send(json.clone()) {
                tracing::warn!(connection_id = %id, error = %e, "Failed to send message");
            }
        }
    }

    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for ResultHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::model::{Decision, Diagnosis, DiagnosisRecord};

    fn response() -> DiagnosisResponse {
        DiagnosisResponse {
            record: DiagnosisRecord {
                diagnosis: Diagnosis {
                    disease_name: "Powdery mildew".to_string(),
                    treatment: "Sulphur spray".to_string(),
                    reason: "Warm days and cool nights".to_string(),
                    decision: Decision::Diseased,
                },
                base64_image: "bGVhZg==".to_string(),
            },
            id: "65f0c0ffee0000000000beef".to_string(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let hub = ResultHub::new();
        let (_, mut first) = hub.register().await;
        let (_, mut second) = hub.register().await;

        hub.broadcast(HubMessage::Result(response())).await;

        for rx in [&mut first, &mut second] {
            let frame: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(frame["event"], "result");
            assert_eq!(frame["data"]["disease_name"], "Powdery mildew");
            assert_eq!(frame["data"]["id"], "65f0c0ffee0000000000beef");
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn unregistered_subscriber_gets_nothing() {
        let hub = ResultHub::new();
        let (id, mut rx) = hub.register().await;
        assert_eq!(hub.connection_count(), 1);

        hub.unregister(&id).await;
        hub.broadcast(HubMessage::Result(response())).await;

        assert_eq!(hub.connection_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_stop_broadcast() {
        let hub = ResultHub::new();
        let (_, gone) = hub.register().await;
        let (_, mut alive) = hub.register().await;
        drop(gone);

        hub.broadcast(HubMessage::Result(response())).await;

        assert!(alive.try_recv().is_ok());
    }
}

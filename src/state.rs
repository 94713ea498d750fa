use std::sync::Arc;

use crate::{
    config::Config,
    error::StartupError,
    hub::ResultHub,
    inference::{Inference, OpenAiClient},
    store::{DiagnosisStore, MongoStore},
};

/// Process-wide handles, built once at startup and shared by every request.
pub struct AppState {
    pub store: Arc<dyn DiagnosisStore>,
    pub inference: Arc<dyn Inference>,
    pub hub: Arc<ResultHub>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DiagnosisStore>,
        inference: Arc<dyn Inference>,
        hub: Arc<ResultHub>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            inference,
            hub,
        })
    }

    pub async fn connect(config: &Config) -> Result<Arc<Self>, StartupError> {
        let store = MongoStore::connect(config).await?;
        let inference = OpenAiClient::new(config)?;

        Ok(Self::new(
            Arc::new(store),
            Arc::new(inference),
            Arc::new(ResultHub::new()),
        ))
    }
}

use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "leaf_guard=info,tower_http=info".into()),
        )
        .init();

    if let Err(err) = leaf_guard::start_server().await {
        error!(error = %err, "Server failed");
        std::process::exit(1);
    }
}

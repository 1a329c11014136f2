use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use procurement_recon::{api, AppConfig};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    let state = api::AppState {
        config: Arc::new(config.clone()),
    };

    // 构建路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/api/opportunity", post(api::opportunity))
        .route("/api/opportunity/csv", post(api::opportunity_csv))
        .route("/api/open-po", post(api::open_po))
        .route("/api/open-po/csv", post(api::open_po_csv))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(config.server.max_upload_bytes)));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/opportunity       - opportunity analysis (field: file)");
    info!("  POST /api/opportunity/csv   - opportunity analysis as CSV");
    info!("  POST /api/open-po           - open PO reconciliation (fields: open_po, benchmark)");
    info!("  POST /api/open-po/csv       - open PO reconciliation as CSV");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

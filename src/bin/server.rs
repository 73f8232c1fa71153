use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cut_planner::solver::Solver;
use cut_planner::types::{CuttingParameters, DemandPart, PanelCount, Solution};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    #[serde(default)]
    params: CuttingParameters,
    parts: Vec<DemandPart>,
}

#[derive(Serialize)]
struct OptimizeResponse {
    #[serde(flatten)]
    solution: Solution,
    panel_counts: Vec<PanelCount>,
    panel_count: usize,
    waste_percent: f64,
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let solver = Solver::new(req.params).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let parts = req.parts;
    let solution = tokio::task::spawn_blocking(move || solver.solve(&parts))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let response = OptimizeResponse {
        panel_counts: solution.panel_counts(),
        panel_count: solution.plan_count(),
        waste_percent: solution.total_waste_percent(),
        solution,
    };

    Ok(Json(response))
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sciflow::clock::SystemClock;
use sciflow::config::Config;
use sciflow::notify::Notifier;
use sciflow::routes;
use sciflow::state::AppState;
use sciflow::store::{postgres, PgStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sciflow=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = postgres::create_pool(&config.database_url).await?;
    postgres::run_migrations(pool.as_ref()).await?;

    let notifier = Notifier::new(config.dashboard_url.clone())?;

    let state = Arc::new(AppState {
        store: Arc::new(PgStore::new(pool)),
        clock: Arc::new(SystemClock),
        config: config.clone(),
        notifier: Arc::new(notifier),
    });

    // Hourly (by default) deadline sweep: expired confirmations are
    // withdrawn and their slots escalated.
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(sweep_state.config.sweep_interval_secs));
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            let now = sweep_state.clock.now();
            match sweep_state.ranking().check_deadlines(now).await {
                Ok(report) => {
                    for notification in &report.notifications {
                        match sweep_state.store.get(notification.submission_id()).await {
                            Ok(Some(submission)) => {
                                sweep_state.notifier.dispatch(notification, &submission)
                            }
                            Ok(None) => {}
                            Err(err) => tracing::error!(%err, "sweep notification lookup failed"),
                        }
                    }
                    if !report.processed.is_empty() || !report.failures.is_empty() {
                        tracing::info!(
                            processed = report.processed.len(),
                            failures = report.failures.len(),
                            "deadline sweep finished"
                        );
                    }
                }
                Err(err) => tracing::error!(%err, "deadline sweep failed"),
            }
        }
    });

    let app = Router::new()
        .route(
            "/api/submissions",
            post(routes::create_submission).get(routes::my_submissions),
        )
        .route("/api/submissions/:id", get(routes::get_submission))
        .route("/api/submissions/:id/resubmit", post(routes::resubmit))
        .route("/api/submissions/:id/payment", post(routes::confirm_payment))
        .route("/api/submissions/:id/reviewer", post(routes::assign_reviewer))
        .route("/api/submissions/:id/review", post(routes::submit_review))
        .route("/api/submissions/:id/decision", post(routes::make_decision))
        .route("/api/submissions/:id/poster", post(routes::submit_poster))
        .route(
            "/api/submissions/:id/confirm",
            post(routes::confirm_presentation),
        )
        .route(
            "/api/submissions/:id/certificate",
            get(routes::download_certificate),
        )
        .route("/api/reviews/queue", get(routes::review_queue))
        .route("/api/ranking", get(routes::general_ranking))
        .route("/api/ranking/:event", get(routes::event_ranking))
        .route("/api/selection/run", post(routes::run_selection))
        .route("/api/selection/sweep", post(routes::run_deadline_sweep))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("SciFlow listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

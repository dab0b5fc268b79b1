use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::handlers::AppointmentState;
use appointment_cell::{
    AppointmentLifecycleService, AppointmentTaskHandler, PostgrestAppointmentStore,
};
use shared_config::AppConfig;
use task_queue_cell::{InMemoryTaskScheduler, RedisTaskQueue, TaskWorker, WorkerConfig};
use video_room_cell::HmsRoomClient;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting WebDoctor API server");

    // Load configuration
    let config = AppConfig::from_env();
    let state = Arc::new(config);

    let rooms = match HmsRoomClient::new(&state) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to initialize the video room client: {}", e);
            return;
        }
    };
    let store = Arc::new(PostgrestAppointmentStore::new(&state));

    // The appointment lifecycle needs a deferred task backend: the Redis
    // queue with its polling worker when configured, the in-process
    // scheduler otherwise.
    let lifecycle: Arc<AppointmentLifecycleService> = if state.redis_url.is_some() {
        let queue = match RedisTaskQueue::new(&state).await {
            Ok(queue) => Arc::new(queue),
            Err(e) => {
                error!("Failed to initialize the Redis task queue: {}", e);
                return;
            }
        };

        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            store,
            rooms,
            queue.clone(),
        ));
        let handler = Arc::new(AppointmentTaskHandler::new(lifecycle.clone()));
        let worker = TaskWorker::new(WorkerConfig::default(), queue, handler);
        tokio::spawn(async move { worker.start().await });

        lifecycle
    } else {
        warn!("REDIS_URL not set; deferred tasks run on the in-process scheduler");

        let scheduler = InMemoryTaskScheduler::new();
        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            store,
            rooms,
            Arc::new(scheduler.clone()),
        ));
        scheduler
            .set_handler(Arc::new(AppointmentTaskHandler::new(lifecycle.clone())))
            .await;

        lifecycle
    };

    let appointment_state = Arc::new(AppointmentState {
        config: state.clone(),
        lifecycle,
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state, appointment_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

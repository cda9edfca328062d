mod classify;
mod config;
mod notify;
mod store;
mod summary;
mod twilio;
mod twiml;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use config::Config;
use notify::Notifier;
use store::CallStore;
use twilio::voice;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Per-call dialogue state, keyed by CallSid.
    pub store: CallStore,
    pub notifier: Arc<Notifier>,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("--version") => println!("intake-line {VERSION}"),
        Some("--help") | Some("-h") => print_usage(),
        Some(other) => {
            eprintln!("Unknown option: {other}");
            print_usage();
            std::process::exit(1);
        }
        None => {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
            rt.block_on(server());
        }
    }
}

fn print_usage() {
    println!("intake-line {VERSION}");
    println!("Call-intake assistant for Twilio voice and SMS");
    println!();
    println!("Usage: intake-line [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --version   Print version");
    println!("  --help, -h  Print this help message");
    println!();
    println!("Without options, starts the webhook server.");
}

async fn server() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_line=info,tower_http=info".into()),
        )
        .init();

    // Load config
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        email_configured = config.email.is_configured(),
        "Starting intake-line"
    );

    // Build shared state
    let state = AppState {
        notifier: Arc::new(Notifier::new(&config.email)),
        store: CallStore::new(),
        config: config.clone(),
    };

    // Build router — one route per dialogue step, paths shared with the
    // gather actions in voice.rs
    let app = Router::new()
        .route(voice::ROUTE_INCOMING, post(voice::handle_incoming))
        .route(voice::ROUTE_NAME, post(voice::handle_name))
        .route(voice::ROUTE_CALLBACK, post(voice::handle_callback))
        .route(voice::ROUTE_TYPE, post(voice::handle_type))
        .route(voice::ROUTE_TOPIC, post(voice::handle_topic))
        .route(voice::ROUTE_URGENCY, post(voice::handle_urgency))
        .route(
            voice::ROUTE_CALLBACK_TIME,
            post(voice::handle_callback_time),
        )
        // SMS forwarding
        .route("/twilio/sms", post(twilio::sms::handle_sms))
        // Health check
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("Invalid server address");

    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}

async fn health() -> &'static str {
    "ok"
}

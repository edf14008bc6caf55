use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod model;
mod server;
mod store;

use server::{create_reusable_listener, start_server_loop, start_signal_handler, SignalHandler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config file path from the first argument; the extension is optional
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = config::Config::load_from(&config_path)?;

    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::write_info(&format!("[CONFIG] Using {workers} worker threads"));
    } else {
        logger::write_info("[CONFIG] Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let store = store::open(&cfg.storage)?;
    logger::log_store_opened(&cfg);

    let listener = create_reusable_listener(addr)?;

    let state = Arc::new(config::AppState::new(cfg, store));
    let active_connections = Arc::new(AtomicUsize::new(0));

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals))?;

    logger::log_server_start(&addr, &state.config);

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(start_server_loop(
            listener,
            state,
            active_connections,
            Arc::clone(&signals.shutdown),
        ))
        .await;

    if signals.shutdown_requested.load(Ordering::SeqCst) {
        logger::write_info("[Shutdown] Server stopped");
    }

    Ok(())
}

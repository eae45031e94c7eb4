use rust_xiangqi::config::AppConfig;
use rust_xiangqi::engine::GameEngine;
use rust_xiangqi::storage::FileStore;
use rust_xiangqi::terminal::Session;

fn main() {
    // Initialize tracing (structured logging). Logs go to stderr so they
    // never interleave with the board on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_xiangqi=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        "rust-xiangqi v{} starting: board {}, save file {}",
        env!("CARGO_PKG_VERSION"),
        config.board_size,
        config.save_path.display()
    );

    let engine = GameEngine::with_size(config.board_size);
    let store = FileStore::new(config.save_path.clone());
    let mut session = Session::new(engine, store, config.chinese);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    if let Err(e) = session.run(stdin.lock(), &mut stdout) {
        tracing::error!(error = %e, "terminal I/O failed");
        std::process::exit(1);
    }
}

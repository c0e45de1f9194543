mod surface;

use macro_buddy::{
    config,
    core::{AppController, LocalClock},
    errors::Result,
    session::{self, Intent, SessionHandle},
    source::OpenFoodFacts,
    storage::FileStore,
};
use std::sync::Arc;
use surface::{Command, help, parse_command, render};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible), on stderr so it stays out of the UI
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load configuration (.env, config.toml, environment overrides)
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 3. Open local storage and the nutrition source
    let store = FileStore::open(&app_config.data_dir)
        .inspect_err(|e| error!("Failed to open data directory: {}", e))?;
    let source = OpenFoodFacts::from_config(&app_config)
        .inspect_err(|e| error!("Failed to build nutrition source client: {}", e))?;

    // 4. Hydrate state and start the session
    let controller = AppController::open(&app_config, Arc::new(store), Arc::new(LocalClock));
    let handle = session::spawn(controller, Arc::new(source));
    info!("Session ready");

    println!("{}", help());
    println!("{}", render(&handle.snapshot()));
    run_terminal(&handle).await?;

    handle.shutdown().await;
    Ok(())
}

async fn run_terminal(handle: &SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut snapshots = handle.subscribe();
    snapshots.mark_unchanged();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(handle, &line).await? {
                    break;
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let text = render(&snapshots.borrow_and_update());
                println!("{text}");
            }
        }
    }
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn handle_line(handle: &SessionHandle, line: &str) -> Result<bool> {
    let card = |index: usize| {
        handle
            .snapshot()
            .displayed_products
            .get(index)
            .map(|c| c.product.clone())
    };

    let command = match parse_command(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(true),
        Err(e) => {
            println!("{e}");
            return Ok(true);
        }
    };
    let intent = match command {
        Command::Quit => return Ok(false),
        Command::Search { words } => Intent::Search(words.join(" ")),
        Command::Scan { code } => Intent::ScanResult(code),
        Command::Scanner => Intent::ToggleScanner,
        Command::Favs => Intent::ToggleFavoritesView,
        Command::Reset => Intent::ResetDaily,
        Command::Fav { card: index } | Command::Add { card: index } => {
            let Some(product) = card(index) else {
                println!("No card number {}", index + 1);
                return Ok(true);
            };
            if matches!(command, Command::Fav { .. }) {
                Intent::ToggleFavorite(product)
            } else {
                Intent::AddToDaily(product)
            }
        }
    };

    handle.send(intent).await?;
    Ok(true)
}

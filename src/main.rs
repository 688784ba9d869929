use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use live_chat::config;
use live_chat::network::{ChangeFeed, ChangeWatcher, ChatService, PersistenceGateway, WatcherSettings};
use live_chat::storage::MessageDatabase;
use live_chat::ui::ChatApp;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "live_chat", version, about = "Public live chat")]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Page to open the window on
    #[arg(long, default_value = "/", value_name = "PATH")]
    open: String,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, PartialEq, Eq)]
enum Mode {
    /// Print the most recent messages and exit
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Post one message without opening the window
    Post {
        content: String,
        #[arg(long, default_value = "")]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config);
    let database = MessageDatabase::with_path(&app_config.database_path)?;

    match cli.mode {
        Some(Mode::History { limit }) => {
            let limit = limit.unwrap_or(app_config.recent_limit);
            for message in database.fetch_recent(limit)? {
                println!("[{}] {}", message.time_label(), message);
            }
            Ok(())
        }
        Some(Mode::Post { content, username }) => {
            let message = database.insert(&content, &username)?;
            println!("{}", message.id);
            Ok(())
        }
        None => run_window(app_config, Arc::new(database), &cli.open),
    }
}

fn run_window(
    app_config: config::AppConfig,
    database: Arc<MessageDatabase>,
    start_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let feed = Arc::new(ChangeFeed::new());

    // Writes from this window, other windows and `post` all land in the
    // change log; the watcher turns them into feed events.
    let watcher = ChangeWatcher::new(
        Arc::clone(&database),
        Arc::clone(&feed),
        WatcherSettings::from(&app_config),
    )?;
    tokio::spawn(watcher.run());

    // UI -> chat service
    let (cmd_tx, cmd_rx) = mpsc::channel(app_config.channel_capacity.max(1));
    tokio::spawn(ChatService::new(database, cmd_rx).run());

    let settings = config::PageSettings::from(&app_config);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Live Public Chat")
            .with_inner_size([480.0, 640.0]),
        ..Default::default()
    };

    log::info!(
        "Opening chat window on {} (database {})",
        start_path,
        app_config.database_path
    );

    let start_path = start_path.to_string();
    eframe::run_native(
        "Live Public Chat",
        options,
        Box::new(move |cc| {
            Ok(Box::new(ChatApp::new(
                cc,
                feed,
                cmd_tx,
                settings,
                &start_path,
            )))
        }),
    )?;
    Ok(())
}

mod app;
mod events;
mod ui;

use std::io;
use std::sync::LazyLock;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use sift_client::DeploymentClient;
use sift_session::SessionConfig;

use crate::app::App;
use crate::events::EventHandler;

static DEPLOYMENT_URL: LazyLock<String> = LazyLock::new(|| {
    std::env::var("SIFT_DEPLOYMENT_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
});
static ACCESS_TOKEN: LazyLock<Option<String>> =
    LazyLock::new(|| std::env::var("SIFT_ACCESS_TOKEN").ok());

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Terminal chat for sift deployments")]
struct Cli {
    /// Deployment base URL (falls back to SIFT_DEPLOYMENT_URL)
    #[arg(long)]
    url: Option<String>,

    /// Chat provider configured on the deployment
    #[arg(long, default_value = "openai")]
    provider: String,

    /// Highlight entities via a deployed token classifier
    #[arg(long)]
    pii: bool,

    /// Classify the sentiment of submitted queries
    #[arg(long)]
    sentiment: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let base_url = cli.url.clone().unwrap_or_else(|| DEPLOYMENT_URL.clone());
    let mut client = DeploymentClient::new(&base_url);
    if let Some(token) = ACCESS_TOKEN.as_ref() {
        client = client.with_bearer_token(token);
    }
    let config = SessionConfig {
        provider: cli.provider.clone(),
        top_k: 1,
        token_classifier: cli.pii,
        sentiment_classifier: cli.sentiment,
    };

    // Create the app before touching the terminal so startup failures stay
    // readable.
    let app = match App::new(client, config).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize: {e:?}");
            return Err(e);
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let res = run_app(&mut terminal, app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> Result<()> {
    let mut event_handler = EventHandler::new(std::time::Duration::from_millis(100));

    loop {
        terminal.draw(|f| ui::draw(f, &mut app))?;

        match event_handler.next().await? {
            events::Event::Key(key_event) => {
                if app.handle_key_event(key_event) {
                    return Ok(());
                }
            }
            events::Event::Mouse(mouse_event) => {
                app.handle_mouse_event(mouse_event);
            }
            events::Event::Tick => {
                app.on_tick();
            }
        }
    }
}

/// The alternate screen owns stdout, so logs go to a file when SIFT_LOG
/// names one; otherwise logging stays off.
fn init_tracing() -> Result<()> {
    let Ok(path) = std::env::var("SIFT_LOG") else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

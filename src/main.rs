mod api;
mod app;
mod config;
mod logging;
mod markdown;
mod pages;
mod project;
mod text_input;
mod ui;
mod validators;
mod views;

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event,
    EventStream, KeyEventKind, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiMessage};
use crate::app::App;
use crate::config::Config;
use crate::project::Route;

/// Redraw and timer interval.
const TICK_RATE: Duration = Duration::from_millis(80);

/// Lines scrolled per mouse wheel step.
const MOUSE_SCROLL_LINES: u16 = 3;

/// Turn a requirements document into a prompt and generated code.
#[derive(Debug, Parser)]
#[command(name = "promptcodegen", version, about)]
struct Cli {
    /// Document to pre-fill on the upload screen
    file: Option<PathBuf>,

    /// Backend base URL (overrides config and PROMPTCODEGEN_API_URL)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Where downloaded projects are written
    #[arg(long, value_name = "DIR")]
    download_dir: Option<String>,

    /// Screen to start on, e.g. /upload
    #[arg(long, value_name = "PATH", default_value = "/")]
    route: Route,
}

/// Command-line flags win over file and environment configuration.
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.api_url {
        debug!("Overriding server.base_url from --api-url");
        config.server.base_url = url.clone();
    }
    if let Some(dir) = &cli.download_dir {
        debug!("Overriding downloads.directory from --download-dir");
        config.downloads.directory = dir.clone();
    }
}

type Tui = Terminal<CrosstermBackend<Stdout>>;

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        io::stdout(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )
}

/// Leave the alternate screen before a panic message is printed.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        default_hook(info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let start_time = Instant::now();

    // Initialize logging before anything else
    let logging_ctx = match logging::init() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };
    let logging_error = match &logging_ctx {
        Some(_) => None,
        None => Some("Logging unavailable".to_string()),
    };
    if let Some(ctx) = &logging_ctx {
        logging::cleanup_old_logs(&ctx.log_directory);
    }

    // Load configuration
    let loaded_config = config::load_config();
    debug!(
        config_path = %loaded_config.config_path.display(),
        project_config = ?loaded_config.project_config_path,
        status = ?loaded_config.status,
        "config_loaded"
    );
    let mut config = loaded_config.config;
    apply_cli_overrides(&mut config, &cli);
    if let Some(ctx) = &logging_ctx {
        ctx.apply_level(&config.logging.level);
    }

    let client = ApiClient::new(&config.server.base_url, config.request_timeout())?;
    info!(
        api_url = client.base_url(),
        timeout_secs = config.server.timeout_secs,
        "api_client_ready"
    );

    let session_id = logging_ctx.as_ref().map(|ctx| ctx.session_id.clone());
    let mut app = App::new(
        config,
        loaded_config.config_path,
        cli.file.as_ref().map(|p| p.display().to_string()),
        session_id.clone(),
        logging_ctx.as_ref().map(|ctx| ctx.log_directory.clone()),
        logging_error,
    );
    app.config_error = loaded_config.status.error_message().map(str::to_string);

    // Setup terminal
    install_panic_hook();
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_app(terminal, &mut app, client, cli.route).await;

    restore_terminal()?;

    if let Some(sid) = session_id {
        info!(
            session_id = %sid,
            duration_secs = start_time.elapsed().as_secs_f64(),
            "session_end"
        );
    }

    result
}

async fn run_app(mut terminal: Tui, app: &mut App, client: ApiClient, start: Route) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ApiMessage>();
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK_RATE);

    app.probe_health();
    app.navigate(start);

    loop {
        dispatch_requests(app, &client, &tx);
        if app.should_quit {
            return Ok(());
        }
        terminal.draw(|f| ui::draw_ui(f, app))?;

        tokio::select! {
            _ = ticker.tick() => app.tick(Instant::now()),
            Some(message) = rx.recv() => app.handle_response(message),
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => handle_event(app, event),
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}

/// Spawn one task per queued request; answers come back on `tx`.
fn dispatch_requests(app: &mut App, client: &ApiClient, tx: &mpsc::UnboundedSender<ApiMessage>) {
    for (ticket, request) in app.take_requests() {
        debug!(ticket, request = request.name(), "request_spawned");
        let client = client.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = client.execute(request).await;
            if tx.send(ApiMessage { ticket, response }).is_err() {
                debug!(ticket, "response_receiver_closed");
            }
        });
    }
}

fn handle_event(app: &mut App, event: Event) {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
        Event::Paste(text) => app.handle_paste(&text),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.scroll_up(MOUSE_SCROLL_LINES),
            MouseEventKind::ScrollDown => app.scroll_down(MOUSE_SCROLL_LINES),
            _ => {}
        },
        // Resize is picked up by the next draw
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["promptcodegen"]).unwrap();
        assert!(cli.file.is_none());
        assert_eq!(cli.route, Route::Home);
    }

    #[test]
    fn test_cli_parses_route_and_file() {
        let cli = Cli::try_parse_from([
            "promptcodegen",
            "docs/requirements.md",
            "--route",
            "/preview",
        ])
        .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("docs/requirements.md")));
        assert_eq!(cli.route, Route::Preview);
    }

    #[test]
    fn test_cli_rejects_unknown_route() {
        assert!(Cli::try_parse_from(["promptcodegen", "--route", "/settings"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "promptcodegen",
            "--api-url",
            "http://10.0.0.5:9000",
            "--download-dir",
            "/tmp/out",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.server.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let cli = Cli::try_parse_from(["promptcodegen"]).unwrap();
        let mut config = Config::default();
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.server.base_url, "http://localhost:8000");
        assert_eq!(config.downloads.directory, "~/Downloads");
    }
}

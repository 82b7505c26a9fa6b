use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::LevelFilter;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{env, io, path::PathBuf, time::Duration};

use mdstudio::buffer_store::{BufferStore, CURRENT_VERSION};
use mdstudio::clipboard::SystemClipboard;
use mdstudio::config::Config;
use mdstudio::default_document::DEFAULT_DOCUMENT;
use mdstudio::export::DirectorySink;
use mdstudio::session::Session;
use mdstudio::status_manager::{Notice, NoticeKind};
use mdstudio::storage::{FileStore, KeyValueStore, MemoryStore};
use mdstudio::{ui, App};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger with debug fallback for development
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("mdstudio", LevelFilter::Debug);
    }
    logger.init();

    let config = Config::load().await?;
    let mut app = build_app(config);

    // Load file from command line if provided
    if let Some(arg) = env::args().nth(1) {
        log::info!("Loading startup file: {}", arg);
        app.open_path(&PathBuf::from(&arg)).await?;
    }

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Converter panics are caught by the renderer and the session goes on
        if !tears_down_terminal() {
            log::error!("Markdown converter panicked: {}", panic_info);
            return;
        }
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    // Setup terminal
    if let Err(e) = enable_raw_mode() {
        eprintln!("Failed to initialize terminal: {}", e);
        return Err(e.into());
    }
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        let _ = disable_raw_mode();
        eprintln!("Failed to configure terminal: {}", e);
        return Err(e.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app).await;

    restore_terminal()?;

    if let Err(err) = res {
        eprintln!("Application error: {}", err);
        if let Some(source) = err.source() {
            eprintln!("Cause: {}", source);
        }
        log::error!("Application error: {}", err);
    }

    Ok(())
}

fn build_app(config: Config) -> App {
    let mut degraded = None;
    let storage: Box<dyn KeyValueStore> = match config.data_dir() {
        Some(dir) => match FileStore::in_dir(&dir) {
            Ok(store) => {
                log::info!("Persisting buffer to {}", store.path().display());
                Box::new(store)
            }
            Err(e) => {
                degraded = Some(format!("Storage unavailable, editing in memory: {}", e));
                Box::new(MemoryStore::new())
            }
        },
        None => {
            degraded = Some("No data directory available, editing in memory".to_string());
            Box::new(MemoryStore::new())
        }
    };

    let store = BufferStore::open(storage, CURRENT_VERSION, DEFAULT_DOCUMENT);
    let mut session = Session::new(
        store,
        Box::new(DirectorySink::new(config.export_dir())),
        Box::new(SystemClipboard::new()),
    )
    .with_sync_mode(config.sync.mode)
    .with_document_title(config.export.document_title.clone());

    // Stays on the status line until another notice replaces it
    if let Some(message) = degraded {
        session
            .status_mut()
            .push(Notice::permanent(message, NoticeKind::Warning));
    }

    log::info!("Application initialized successfully");
    App::new(config, session)
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    loop {
        if let Err(e) = terminal.draw(|f| ui::draw(f, &mut app)) {
            log::error!("Terminal draw error: {}", e);
        }
        app.after_draw();

        app.session.status_mut().update();

        if app.should_quit() {
            log::info!("Application shutdown requested");
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Err(e) = app.handle_key_event(key).await {
                        log::error!("Key event handling error: {}", e);
                        app.session
                            .status_mut()
                            .error(format!("Key handling error: {}", e));
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse_event(mouse),
                Event::Resize(_, _) => {
                    // Handled implicitly by the next draw
                }
                _ => {}
            }
        }
    }

    log::info!("Application loop ended successfully");
    Ok(())
}

/// Whether a panic raised right now ends the process.
fn tears_down_terminal() -> bool {
    !mdcore::is_converting()
}

/// Restore terminal to normal state
fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    let _ = execute!(stdout, crossterm::cursor::Show);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdcore::{GfmConverter, MarkupConverter};

    #[test]
    fn test_panics_outside_conversion_tear_down_terminal() {
        assert!(tears_down_terminal());
        GfmConverter::new().convert("# title").unwrap();
        assert!(tears_down_terminal());
    }
}

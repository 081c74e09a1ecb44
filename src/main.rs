use color_eyre::Result;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use stratus_tui::{
    api::SnapshotProvider,
    app::App,
    config::PipelineConfig,
    events::{Event, EventHandler, LoadCycle},
    logging, ui,
    weather::WeatherProvider,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::init();
    install_panic_hook();
    color_eyre::install()?;

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new();
    let mut events = EventHandler::new(150); // High tick rate for smooth animation

    let config = PipelineConfig::default();

    // First cycle starts immediately; later ones only on 'r'
    spawn_load_cycle(config.clone(), events.tx.clone());

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Tick => app.on_tick(),
                Event::Input(key) => app.handle_key(key),
                Event::CycleComplete(cycle) => app.apply_cycle(cycle),
                Event::CycleFailed => app.cycle_failed(),
            }
        }

        if app.refresh_requested {
            app.refresh_requested = false;
            app.loading = true;
            app.error = None;
            spawn_load_cycle(config.clone(), events.tx.clone());
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

/// Runs one load cycle off the UI loop: 24 snapshot fetches, assembly, then
/// weather enrichment. The pipeline absorbs its own request failures, so
/// the only way the cycle as a whole can be lost is the worker task dying;
/// that is caught at the join boundary and surfaced as one `CycleFailed`,
/// leaving the previous data on screen.
fn spawn_load_cycle(config: PipelineConfig, tx: UnboundedSender<Event>) {
    tokio::spawn(async move {
        let worker = tokio::spawn(async move {
            let snapshots = SnapshotProvider::new(config.clone());
            let weather = WeatherProvider::new(config);
            let history = snapshots.fetch_history().await;
            let summaries = weather.enrich_all(&history.tracks).await;
            LoadCycle { history, summaries }
        });

        match worker.await {
            Ok(cycle) => {
                info!(
                    "cycle complete: {} balloons tracked",
                    cycle.history.constellation.len()
                );
                tx.send(Event::CycleComplete(cycle)).ok();
            }
            Err(err) => {
                error!("load cycle lost: {}", err);
                tx.send(Event::CycleFailed).ok();
            }
        }
    });
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}

//! Event types and the main event loop driver for the Stratus TUI.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks, load cycle
//! results) and the [`EventHandler`], which runs a background task that polls
//! crossterm for key events and emits periodic [`Event::Tick`]s. The main
//! loop in `main.rs` receives events via [`EventHandler::next`]; the load
//! cycle task sends its outcome via a cloned [`EventHandler::tx`].

use crate::history::ConstellationHistory;
use crate::models::ExternalSummary;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Everything one load cycle hands back to the view.
pub struct LoadCycle {
    /// Assembled constellation, tracks and per-hour records.
    pub history: ConstellationHistory,
    /// Weather summary per balloon id, one entry per track.
    pub summaries: HashMap<String, ExternalSummary>,
}

/// Events processed by the application event loop.
pub enum Event {
    /// Periodic tick used for UI refresh and the loading spinner.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// A load cycle finished; its payload replaces the displayed data.
    CycleComplete(LoadCycle),
    /// The load cycle task died. The previous data stays on screen and the
    /// view shows a banner until the user refreshes.
    CycleFailed,
}

/// Multiplexes terminal input and ticks into a single event stream.
///
/// Holds an unbounded channel: the sender ([`tx`](EventHandler::tx)) can be
/// cloned and handed to the load cycle task, while the receiver is consumed
/// by [`next`](EventHandler::next) in the main loop. A background task polls
/// crossterm with a timeout and sends [`Event::Input`] on key press and
/// [`Event::Tick`] at the configured interval.
pub struct EventHandler {
    /// Sender for posting events from outside the input task.
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The spawned task runs until the process exits. It polls crossterm
    /// with a timeout of `tick_rate_ms`; when a key is pressed it sends
    /// [`Event::Input`], and when the tick interval elapses it sends
    /// [`Event::Tick`].
    ///
    /// # Arguments
    ///
    /// * `tick_rate_ms` - Interval in milliseconds between [`Event::Tick`] emissions.
    ///
    /// # Panics
    ///
    /// The background task may panic if crossterm `poll` or `read` fails
    /// (e.g. terminal disconnected). The main loop does not protect against
    /// this.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::ZERO);
                if event::poll(timeout).expect("Poll failed") {
                    if let CrosstermEvent::Key(key) = event::read().expect("Read failed") {
                        event_tx.send(Event::Input(key)).ok();
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    event_tx.send(Event::Tick).ok();
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel. Returns `None` when all
    /// senders have been dropped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

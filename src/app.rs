use crate::events::LoadCycle;
use crate::history::ConstellationHistory;
use crate::models::{ConstellationEntry, ExternalSummary};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use std::collections::HashMap;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ViewMode {
    Dashboard,
    Map,
}

impl Default for ViewMode {
    fn default() -> Self {
        ViewMode::Dashboard
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum InputMode {
    Normal,
    EditingFilter,
}

pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub history: ConstellationHistory,
    pub summaries: HashMap<String, ExternalSummary>,
    pub filter: String,
    pub selected_index: usize,
    pub tick_count: usize,
    pub should_quit: bool,

    // Load cycle state
    pub loading: bool,
    pub refresh_requested: bool,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Local>>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            view_mode: ViewMode::Dashboard,
            input_mode: InputMode::Normal,
            history: ConstellationHistory::default(),
            summaries: HashMap::new(),
            filter: String::new(),
            selected_index: 0,
            tick_count: 0,
            should_quit: false,
            loading: true, // The first cycle starts as soon as the loop does
            refresh_requested: false,
            error: None,
            last_update: None,
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count += 1;
    }

    /// Replaces the displayed data with a finished load cycle.
    pub fn apply_cycle(&mut self, cycle: LoadCycle) {
        self.history = cycle.history;
        self.summaries = cycle.summaries;
        self.loading = false;
        self.error = None;
        self.last_update = Some(Local::now());
        self.clamp_selection();
    }

    /// Marks the current cycle as lost. Previous data stays on screen; the
    /// banner clears on the next successful refresh.
    pub fn cycle_failed(&mut self) {
        self.loading = false;
        self.error = Some("Failed to load data robustly. Try Refresh.".to_string());
    }

    /// Constellation entries matching the current filter, in id order.
    pub fn filtered_constellation(&self) -> Vec<&ConstellationEntry> {
        if self.filter.is_empty() {
            return self.history.constellation.iter().collect();
        }
        let needle = self.filter.to_lowercase();
        self.history
            .constellation
            .iter()
            .filter(|entry| entry.id.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected_entry(&self) -> Option<&ConstellationEntry> {
        self.filtered_constellation().get(self.selected_index).copied()
    }

    pub fn summary_for(&self, id: &str) -> Option<&ExternalSummary> {
        self.summaries.get(id)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::EditingFilter => self.handle_filter_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let visible = self.filtered_constellation().len();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => {
                if visible > 0 {
                    self.selected_index = (self.selected_index + 1) % visible;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if visible > 0 {
                    self.selected_index = self.selected_index.checked_sub(1).unwrap_or(visible - 1);
                }
            }
            KeyCode::Char('r') => {
                // One cycle at a time; the key is ignored while one runs.
                if !self.loading {
                    self.refresh_requested = true;
                }
            }
            KeyCode::Char('/') => self.input_mode = InputMode::EditingFilter,
            KeyCode::Tab => {
                self.view_mode = match self.view_mode {
                    ViewMode::Dashboard => ViewMode::Map,
                    ViewMode::Map => ViewMode::Dashboard,
                };
            }
            KeyCode::Esc => {
                self.filter.clear();
                self.selected_index = 0;
            }
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Backspace => {
                self.filter.pop();
                self.selected_index = 0;
            }
            KeyCode::Char(c) => {
                self.filter.push(c);
                self.selected_index = 0;
            }
            _ => {}
        }
    }

    fn clamp_selection(&mut self) {
        let visible = self.filtered_constellation().len();
        self.selected_index = self.selected_index.min(visible.saturating_sub(1));
    }
}

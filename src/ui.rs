//! TUI rendering for the Stratus TUI
//!
//! This module handles all UI rendering logic using the `ratatui` crate,
//! including the constellation dashboard, the world map view and the
//! first-load screen.

use crate::app::{App, InputMode, ViewMode};
use crate::geo;
use crate::models::{ConstellationEntry, ExternalSummary};
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *}, // Imports Points, Map, Canvas, etc.
};

use ratatui::text::Line;
use ratatui::widgets::canvas::Line as CanvasLine;

const SPINNER: [&str; 6] = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"];

/// Renders one frame of the TUI based on current application state.
///
/// Before any data has arrived, draws the first-load screen. Afterwards
/// selects the view from [`App::view_mode`]: dashboard (list + status +
/// detail) or the world map.
///
/// # Arguments
///
/// * `f` - The ratatui frame to draw into (from `terminal.draw()`).
/// * `app` - Current application state (tracks, selection, view mode, etc.).
pub fn render(f: &mut Frame, app: &App) {
    if app.loading && app.history.constellation.is_empty() && app.error.is_none() {
        render_first_load_screen(f, app);
        return;
    }

    match app.view_mode {
        ViewMode::Dashboard => render_dashboard_view(f, app),
        ViewMode::Map => render_map_view(f, app),
    }
}

/// Dashboard view: balloon list sidebar (30%) + main area (70%).
///
/// The main area is split into a fixed-height constellation status block
/// and a detail paragraph for the selected balloon (track shape, drift,
/// weather enrichment). A footer row carries the filter and key hints.
fn render_dashboard_view(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    // Sidebar
    let visible = app.filtered_constellation();
    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if i == app.selected_index {
                Style::default()
                    .fg(Color::Cyan)
                    .bg(Color::Rgb(30, 30, 60))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let id: String = entry.id.chars().take(14).collect();
            let drift_km = geo::total_track_distance(&entry.history) / 1000.0;

            ListItem::new(Line::from(vec![
                Span::styled(format!(" {:<14}", id), style),
                Span::styled(
                    format!(" │ {:>9.2} km", drift_km),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Constellation ({}) ", visible.len()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(list, chunks[0]);

    // Main Panel
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(chunks[1]);

    render_status_panel(f, app, main_chunks[0]);

    // Balloon Details
    if let Some(entry) = app.selected_entry() {
        let mut details = vec![
            Line::from(vec![
                Span::styled("Balloon:      ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(&entry.id, Style::default().fg(Color::Yellow)),
            ]),
            Line::from(vec![
                Span::styled("Latest fix:   ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("{:.4}°, {:.4}°", entry.latest_lat, entry.latest_lon)),
            ]),
            Line::from(vec![
                Span::styled("Drift (24h):  ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("{:.2} km", geo::total_track_distance(&entry.history) / 1000.0),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
            Line::from(vec![
                Span::styled("Trail:        ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(trail_description(entry)),
            ]),
            Line::from(""),
        ];
        details.extend(weather_lines(app.summary_for(&entry.id)));

        let p = Paragraph::new(details).block(
            Block::default()
                .title(" Balloon Detail ")
                .borders(Borders::ALL)
                .padding(Padding::new(2, 2, 1, 1)),
        );
        f.render_widget(p, main_chunks[1]);
    } else {
        let p = Paragraph::new("No balloons match the filter.")
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .title(" Balloon Detail ")
                    .borders(Borders::ALL)
                    .padding(Padding::new(2, 2, 1, 1)),
            );
        f.render_widget(p, main_chunks[1]);
    }

    render_footer(f, app, rows[1]);
}

/// Constellation status block: totals, populated hours, cycle state and the
/// failure banner when the last cycle was lost.
fn render_status_panel(f: &mut Frame, app: &App, area: Rect) {
    let populated = app
        .history
        .raw_hours
        .iter()
        .filter(|records| !records.is_empty())
        .count();

    let cycle_state = if app.loading {
        Span::styled(
            format!("REFRESHING {}", SPINNER[app.tick_count % SPINNER.len()]),
            Style::default().fg(Color::Yellow),
        )
    } else {
        Span::styled("LIVE", Style::default().fg(Color::Green))
    };

    let updated = app
        .last_update
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    let status_line = match app.error {
        Some(ref message) => Line::from(Span::styled(
            format!("  {}", message),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled(
            "  r refresh │ Tab map view",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let stats_content = vec![
        Line::from(vec![
            Span::styled("  BALLOONS: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                app.history.constellation.len().to_string(),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  │  "),
            Span::styled("HOURS: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!("{}/24", populated), Style::default().fg(Color::Cyan)),
            Span::raw("  │  "),
            Span::styled("CYCLE: ", Style::default().add_modifier(Modifier::BOLD)),
            cycle_state,
        ]),
        Line::from(vec![
            Span::styled("  UPDATED: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(updated, Style::default().fg(Color::Magenta)),
        ]),
        Line::from(""), // Spacer
        status_line,
    ];

    let stats_block = Paragraph::new(stats_content)
        .block(
            Block::default()
                .title(" Constellation Status ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .alignment(Alignment::Left);

    f.render_widget(stats_block, area);
}

/// World map view: balloon sidebar (25%) + canvas (75%).
///
/// Draws coastlines, every balloon's latest position, the selected
/// balloon's trail oldest to newest and a labeled marker on its latest fix.
fn render_map_view(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(rows[0]);

    draw_balloon_sidebar(f, app, chunks[0]);

    let visible = app.filtered_constellation();
    let selected = app.selected_entry();

    let map_canvas = Canvas::default()
        .block(Block::bordered().title(" Constellation Map "))
        .marker(symbols::Marker::Braille)
        .x_bounds([-180.0, 180.0])
        .y_bounds([-90.0, 90.0])
        .paint(|ctx| {
            // Landmass Outlines
            ctx.draw(&Map {
                color: Color::Rgb(50, 50, 50),
                resolution: MapResolution::High,
            });

            // Trail for the selected balloon, oldest to newest
            if let Some(entry) = selected {
                for pair in entry.history.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: pair[0].lon,
                        y1: pair[0].lat,
                        x2: pair[1].lon,
                        y2: pair[1].lat,
                        color: Color::Rgb(60, 60, 90),
                    });
                }
            }

            // Balloon Rendering
            for (i, entry) in visible.iter().enumerate() {
                let is_selected = i == app.selected_index;

                if is_selected {
                    ctx.print(
                        entry.latest_lon,
                        entry.latest_lat,
                        Line::from(vec![
                            Span::styled(
                                " ◉ ",
                                Style::default()
                                    .fg(Color::Yellow)
                                    .add_modifier(Modifier::BOLD),
                            ),
                            Span::styled(
                                format!(" {} ", entry.id),
                                Style::default().fg(Color::Black).bg(Color::Yellow),
                            ),
                        ]),
                    );
                } else {
                    ctx.print(entry.latest_lon, entry.latest_lat, "·");
                }
            }
        });

    f.render_widget(map_canvas, chunks[1]);
    render_footer(f, app, rows[1]);
}

/// First-load screen shown until the first cycle delivers anything.
fn render_first_load_screen(f: &mut Frame, app: &App) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height / 2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let spinner = SPINNER[app.tick_count % SPINNER.len()];
    let headline = Paragraph::new(format!("{} Fetching constellation history {}", spinner, spinner))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(headline, chunks[1]);

    let msg = Paragraph::new("24 hourly snapshots, one request per hour")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(msg, chunks[2]);
}

/// Footer row: filter state on the left, key hints on the right.
fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let (filter_label, filter_style) = match app.input_mode {
        InputMode::EditingFilter => (
            format!(" Filter: {}▌", app.filter),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        InputMode::Normal if !app.filter.is_empty() => (
            format!(" Filter: {}", app.filter),
            Style::default().fg(Color::Cyan),
        ),
        InputMode::Normal => (" Filter: (none)".to_string(), Style::default().fg(Color::DarkGray)),
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(filter_label, filter_style),
        Span::raw("   "),
        Span::styled(
            "q quit │ j/k select │ / filter │ r refresh │ Tab view │ Esc clear",
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));

    f.render_widget(footer, area);
}

fn draw_balloon_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .filtered_constellation()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if i == app.selected_index {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(format!(" > {}", entry.id)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::bordered().title("Balloons"))
        .highlight_symbol(">> ");

    f.render_widget(list, area);
}

fn trail_description(entry: &ConstellationEntry) -> String {
    match (entry.history.first(), entry.history.last()) {
        (Some(oldest), Some(newest)) if entry.history.len() > 1 => format!(
            "{} fixes  |  hour {} → {}",
            entry.history.len(),
            oldest.hour,
            newest.hour
        ),
        (Some(only), _) => format!("1 fix  |  hour {}", only.hour),
        _ => "no fixes".to_string(),
    }
}

/// Weather block for the detail panel. Absent readings are simply left out;
/// a missing summary renders as a single muted line.
fn weather_lines(summary: Option<&ExternalSummary>) -> Vec<Line<'static>> {
    let Some(summary) = summary else {
        return vec![Line::from(Span::styled(
            "External data unavailable".to_string(),
            Style::default().fg(Color::DarkGray),
        ))];
    };

    let mut lines = vec![Line::from(vec![
        Span::styled("Weather:      ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(summary.source.clone(), Style::default().fg(Color::Magenta)),
    ])];

    if let Some(ref metrics) = summary.metrics {
        let unit = |key: &str| -> String {
            summary
                .units
                .as_ref()
                .and_then(|u| u.get(key).cloned())
                .unwrap_or_default()
        };

        let mut readings: Vec<String> = Vec::new();
        if let Some(t) = metrics.temperature_c {
            readings.push(format!("T {}{}", t, unit("temperature_2m")));
        }
        if let Some(w) = metrics.wind_speed {
            readings.push(format!("Wind {} {}", w, unit("wind_speed_10m")));
        }
        if let Some(d) = metrics.wind_direction_deg {
            readings.push(format!("Dir {}°", d));
        }
        if !readings.is_empty() {
            lines.push(Line::from(vec![
                Span::raw("              "),
                Span::styled(readings.join("  |  "), Style::default().fg(Color::Cyan)),
            ]));
        }
    }

    lines.push(Line::from(Span::styled(
        summary.note.clone(),
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

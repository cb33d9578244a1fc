//! Application core — event loop, focus management, action dispatch.

use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use waymark_core::{AddStatus, DeviceId, IconKey, Tracker, COLOR_PALETTE, MAX_DAY_RANGE};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::map_view::MapView;
use crate::sidebar::Sidebar;
use crate::theme;
use crate::tui::Tui;

/// How long a toast stays on screen.
const TOAST_DURATION: Duration = Duration::from_secs(2);

/// Connection status as seen by the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
    Reconnecting,
}

/// Which pane has input focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    Sidebar,
    Map,
}

/// Modal overlay state. At most one overlay is active at a time.
enum Overlay {
    None,
    /// Add-accessory dialog with its id input and lookup status line.
    Add { input: Input, status: AddStatus },
    /// Inline rename for one accessory.
    Rename { id: DeviceId, input: Input },
    /// Delete confirmation.
    ConfirmDelete { id: DeviceId, name: String },
}

/// Top-level application state and event loop.
pub struct App {
    tracker: Tracker,
    sidebar: Sidebar,
    map: MapView,
    focus: Focus,
    overlay: Overlay,
    running: bool,
    connection_status: ConnectionStatus,
    help_visible: bool,
    toast: Option<(Notification, Instant)>,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(tracker: Tracker, map: MapView) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        Self {
            tracker,
            sidebar: Sidebar::new(),
            map,
            focus: Focus::Sidebar,
            overlay: Overlay::None,
            running: true,
            connection_status: ConnectionStatus::default(),
            help_visible: false,
            toast: None,
            action_tx,
            action_rx,
        }
    }

    /// Run the main event loop. This is the heart of the TUI.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.sidebar.set_focused(true);

        let bridge_cancel = CancellationToken::new();
        tokio::spawn(crate::data_bridge::run_data_bridge(
            self.tracker.clone(),
            self.action_tx.clone(),
            bridge_cancel.clone(),
        ));

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => {
                    self.action_tx.send(Action::Resize(w, h))?;
                }
                Event::Tick => {
                    self.action_tx.send(Action::Tick)?;
                }
                Event::Render => {
                    self.action_tx.send(Action::Render)?;
                }
            }

            // Drain and process all queued actions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        bridge_cancel.cancel();
        self.tracker.shutdown();
        info!("TUI event loop ended");
        Ok(())
    }

    // ── Key handling ────────────────────────────────────────────────

    /// Map a key event to an action. Overlays swallow input; global
    /// keys come next; everything else goes to the focused pane.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if (key.modifiers, key.code) == (KeyModifiers::CONTROL, KeyCode::Char('c')) {
            return Ok(Some(Action::Quit));
        }

        if !matches!(self.overlay, Overlay::None) {
            return self.handle_overlay_key(key);
        }

        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        match key.code {
            KeyCode::Char('q') => return Ok(Some(Action::Quit)),
            KeyCode::Char('?') => return Ok(Some(Action::ToggleHelp)),

            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Sidebar => Focus::Map,
                    Focus::Map => Focus::Sidebar,
                };
                self.sidebar.set_focused(self.focus == Focus::Sidebar);
                self.map.set_focused(self.focus == Focus::Map);
                return Ok(None);
            }

            KeyCode::Esc => return Ok(Some(Action::Deselect)),

            KeyCode::Char('a') => return Ok(Some(Action::OpenAddDialog)),
            KeyCode::Char('n') => {
                if let Some(id) = self.target_id() {
                    return Ok(Some(Action::OpenRename(id)));
                }
                return Ok(None);
            }
            KeyCode::Char('d') => return Ok(Some(Action::DeleteSelected)),
            KeyCode::Char('y') => return Ok(Some(Action::CopyId)),
            KeyCode::Char('c') => return Ok(Some(Action::CopyCoordinates)),
            KeyCode::Char('C') => return Ok(Some(Action::CycleColor)),
            KeyCode::Char('i') => return Ok(Some(Action::CycleIcon)),

            KeyCode::Char('h') => {
                // Toggle the history trail for the selected device.
                let days = if self.tracker.day_range() == 0 { 1 } else { 0 };
                self.tracker.set_day_range(days);
                return Ok(None);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => return Ok(Some(Action::DayRangeUp)),
            KeyCode::Char('-') => return Ok(Some(Action::DayRangeDown)),
            KeyCode::Char('s') => return Ok(Some(Action::ToggleSatellite)),
            KeyCode::Char('r') => return Ok(Some(Action::Refresh)),

            _ => {}
        }

        match self.focus {
            Focus::Sidebar => self.sidebar.handle_key_event(key),
            Focus::Map => self.map.handle_key_event(key),
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match &mut self.overlay {
            Overlay::None => Ok(None),

            Overlay::Add { input, .. } => match key.code {
                KeyCode::Esc => Ok(Some(Action::CloseOverlay)),
                KeyCode::Enter => Ok(Some(Action::SubmitAdd(input.value().to_owned()))),
                _ => {
                    input.handle_event(&crossterm::event::Event::Key(key));
                    Ok(None)
                }
            },

            Overlay::Rename { id, input } => match key.code {
                KeyCode::Esc => Ok(Some(Action::CloseOverlay)),
                KeyCode::Enter => Ok(Some(Action::SubmitRename(
                    id.clone(),
                    input.value().to_owned(),
                ))),
                _ => {
                    input.handle_event(&crossterm::event::Event::Key(key));
                    Ok(None)
                }
            },

            Overlay::ConfirmDelete { id, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let id = id.clone();
                    self.overlay = Overlay::None;
                    let notification = match self.tracker.remove(&id) {
                        Ok(()) => Notification::success(format!("Removed {id}")),
                        Err(e) => Notification::error(e.to_string()),
                    };
                    Ok(Some(Action::Notify(notification)))
                }
                KeyCode::Char('n') | KeyCode::Esc => Ok(Some(Action::CloseOverlay)),
                _ => Ok(None),
            },
        }
    }

    /// The id a per-accessory command applies to: the active selection,
    /// or failing that the sidebar cursor.
    fn target_id(&self) -> Option<DeviceId> {
        self.tracker.selection().or_else(|| self.sidebar.cursor_id())
    }

    // ── Action processing ───────────────────────────────────────────

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.running = false;
            }

            Action::Tick => {
                if let Some((_, shown_at)) = &self.toast {
                    if shown_at.elapsed() >= TOAST_DURATION {
                        self.toast = None;
                    }
                }
            }

            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
            }

            Action::CloseOverlay => {
                self.overlay = Overlay::None;
            }

            Action::Connected => {
                self.connection_status = ConnectionStatus::Connected;
            }
            Action::Disconnected => {
                self.connection_status = ConnectionStatus::Disconnected;
            }
            Action::Reconnecting => {
                self.connection_status = ConnectionStatus::Reconnecting;
            }

            Action::AccessoriesUpdated(_) | Action::PositionsUpdated(_) => {
                let _ = self.sidebar.update(action)?;
                let _ = self.map.update(action)?;
                self.map.set_markers(self.tracker.marker_set());
            }
            Action::Camera(_) => {
                let _ = self.map.update(action)?;
            }

            Action::Activate => {
                if let Some(id) = self.sidebar.cursor_id() {
                    debug!(%id, "selecting accessory");
                    self.tracker.select(id.clone());
                    self.sidebar.set_selected(Some(id.clone()));
                    self.map.set_selected(Some(id));
                    self.map.set_markers(self.tracker.marker_set());
                }
            }
            Action::Deselect => {
                self.tracker.deselect();
                self.sidebar.set_selected(None);
                self.map.set_selected(None);
                self.map.set_markers(self.tracker.marker_set());
            }

            Action::OpenAddDialog => {
                self.overlay = Overlay::Add {
                    input: Input::default(),
                    status: AddStatus::New,
                };
            }
            Action::SubmitAdd(raw) => {
                self.spawn_add(raw.clone());
            }
            Action::AddResolved(status) => {
                if *status == AddStatus::Added {
                    self.overlay = Overlay::None;
                } else if let Overlay::Add {
                    status: dialog_status,
                    ..
                } = &mut self.overlay
                {
                    *dialog_status = *status;
                }
            }

            Action::OpenRename(id) => {
                let current = self
                    .tracker
                    .accessories()
                    .iter()
                    .find(|a| &a.id == id)
                    .map(|a| a.name.clone())
                    .unwrap_or_default();
                self.overlay = Overlay::Rename {
                    id: id.clone(),
                    input: Input::new(current),
                };
            }
            Action::SubmitRename(id, name) => {
                self.overlay = Overlay::None;
                if let Err(e) = self.tracker.rename(id, name) {
                    self.show_toast(Notification::error(e.to_string()));
                }
            }

            Action::DeleteSelected => {
                if let Some(id) = self.target_id() {
                    let name = self
                        .tracker
                        .accessories()
                        .iter()
                        .find(|a| a.id == id)
                        .map(|a| a.name.clone())
                        .unwrap_or_else(|| id.to_string());
                    self.overlay = Overlay::ConfirmDelete { id, name };
                }
            }

            Action::CopyId => {
                if let Some(id) = self.target_id() {
                    let notification = match self.tracker.id_text(&id) {
                        Ok(text) => Notification::success(format!("Copied: {text}")),
                        Err(e) => Notification::error(e.to_string()),
                    };
                    self.show_toast(notification);
                }
            }
            Action::CopyCoordinates => {
                if let Some(id) = self.target_id() {
                    let notification = match self.tracker.coordinates_text(&id) {
                        Ok(text) => Notification::success(format!("Copied: {text}")),
                        Err(e) => Notification::error(e.to_string()),
                    };
                    self.show_toast(notification);
                }
            }

            Action::CycleColor => {
                if let Some(id) = self.target_id() {
                    let accessories = self.tracker.accessories();
                    if let Some(accessory) = accessories.iter().find(|a| a.id == id) {
                        let next = next_color(&accessory.color);
                        if let Err(e) = self.tracker.recolor(&id, next) {
                            self.show_toast(Notification::error(e.to_string()));
                        }
                    }
                }
            }
            Action::CycleIcon => {
                if let Some(id) = self.target_id() {
                    let accessories = self.tracker.accessories();
                    if let Some(accessory) = accessories.iter().find(|a| a.id == id) {
                        let next = next_icon(accessory.icon);
                        if let Err(e) = self.tracker.set_icon(&id, next) {
                            self.show_toast(Notification::error(e.to_string()));
                        }
                    }
                }
            }

            Action::DayRangeUp => {
                let days = (self.tracker.day_range() + 1).min(MAX_DAY_RANGE);
                self.tracker.set_day_range(days);
            }
            Action::DayRangeDown => {
                let days = self.tracker.day_range().saturating_sub(1);
                self.tracker.set_day_range(days);
            }
            Action::ToggleSatellite => {
                self.tracker.toggle_satellite();
                self.map.set_satellite(self.tracker.satellite());
            }
            Action::Refresh => {
                self.tracker.refresh();
                self.show_toast(Notification::info("Refreshed"));
            }

            Action::Notify(notification) => {
                self.show_toast(notification.clone());
            }

            Action::Render | Action::Resize(..) => {}
        }

        Ok(())
    }

    fn show_toast(&mut self, notification: Notification) {
        self.toast = Some((notification, Instant::now()));
    }

    /// Resolve an add attempt off the event loop; the lookup is a
    /// network round-trip.
    fn spawn_add(&self, raw: String) {
        let tracker = self.tracker.clone();
        let action_tx = self.action_tx.clone();
        tokio::spawn(async move {
            let status = tracker.add_accessory(&raw).await;
            let _ = action_tx.send(Action::AddResolved(status));
            if status == AddStatus::Added {
                let _ = action_tx.send(Action::Notify(Notification::success(format!(
                    "Added {}",
                    raw.trim()
                ))));
            }
        });
    }

    // ── Rendering ───────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let rows = Layout::vertical([
            Constraint::Min(1),    // Panes
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        let panes = Layout::horizontal([
            Constraint::Length(36), // Sidebar
            Constraint::Min(20),    // Map
        ])
        .split(rows[0]);

        self.sidebar.render(frame, panes[0]);
        self.map.render(frame, panes[1]);
        self.render_status_bar(frame, rows[1]);

        match &self.overlay {
            Overlay::None => {}
            Overlay::Add { input, status } => self.render_add_dialog(frame, area, input, *status),
            Overlay::Rename { input, .. } => self.render_rename_dialog(frame, area, input),
            Overlay::ConfirmDelete { name, .. } => self.render_confirm(frame, area, name),
        }

        if self.help_visible {
            self.render_help_overlay(frame, area);
        }

        if let Some((notification, _)) = &self.toast {
            render_toast(frame, area, notification);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let connection_indicator = match self.connection_status {
            ConnectionStatus::Connected => {
                Span::styled("● connected", Style::default().fg(theme::SUCCESS_GREEN))
            }
            ConnectionStatus::Disconnected => {
                Span::styled("○ disconnected", Style::default().fg(theme::ERROR_RED))
            }
            ConnectionStatus::Reconnecting => Span::styled(
                "◐ reconnecting",
                Style::default().fg(theme::WARNING_YELLOW),
            ),
        };

        let day_range = self.tracker.day_range();
        let range_text = if day_range == 0 {
            " │ latest".to_owned()
        } else {
            format!(" │ history: {day_range}d")
        };

        let line = Line::from(vec![
            Span::raw(" "),
            connection_indicator,
            Span::styled(range_text, theme::key_hint()),
            Span::styled(" │ ? help  q quit", theme::key_hint()),
        ]);

        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_add_dialog(&self, frame: &mut Frame, area: Rect, input: &Input, status: AddStatus) {
        let dialog = centered_rect(area, 44, 6);
        frame.render_widget(Clear, dialog);

        let status_style = match status {
            AddStatus::New => theme::key_hint(),
            AddStatus::Added => Style::default().fg(theme::SUCCESS_GREEN),
            AddStatus::AlreadyDisplayed | AddStatus::Offline => {
                Style::default().fg(theme::WARNING_YELLOW)
            }
            AddStatus::NotFound => Style::default().fg(theme::ERROR_RED),
        };

        let block = Block::default()
            .title(" Add Accessory ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let text = vec![
            Line::from(vec![
                Span::styled(" Device id: ", theme::key_hint()),
                Span::styled(input.value().to_owned(), theme::list_row()),
                Span::styled("█", Style::default().fg(theme::ACCENT)),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled(" Status: ", theme::key_hint()),
                Span::styled(status.to_string(), status_style),
            ]),
            Line::from(Span::styled(
                " Enter submit · Esc cancel",
                theme::key_hint(),
            )),
        ];

        frame.render_widget(Paragraph::new(text).block(block), dialog);
    }

    fn render_rename_dialog(&self, frame: &mut Frame, area: Rect, input: &Input) {
        let dialog = centered_rect(area, 44, 5);
        frame.render_widget(Clear, dialog);

        let block = Block::default()
            .title(" Rename ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let text = vec![
            Line::from(vec![
                Span::styled(" Name: ", theme::key_hint()),
                Span::styled(input.value().to_owned(), theme::list_row()),
                Span::styled("█", Style::default().fg(theme::ACCENT)),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                " Enter submit · Esc cancel · blank resets",
                theme::key_hint(),
            )),
        ];

        frame.render_widget(Paragraph::new(text).block(block), dialog);
    }

    fn render_confirm(&self, frame: &mut Frame, area: Rect, name: &str) {
        let dialog = centered_rect(area, 44, 5);
        frame.render_widget(Clear, dialog);

        let block = Block::default()
            .title(" Confirm ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::ERROR_RED));

        let text = vec![
            Line::from(Span::styled(
                format!(" Delete {name}? This cannot be undone."),
                theme::list_row(),
            )),
            Line::from(""),
            Line::from(Span::styled(" y confirm · n cancel", theme::key_hint())),
        ];

        frame.render_widget(Paragraph::new(text).block(block), dialog);
    }

    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let help = centered_rect(area, 52, 18);
        frame.render_widget(Clear, help);
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            help,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let inner = block.inner(help);
        frame.render_widget(block, help);

        let rows: &[(&str, &str)] = &[
            ("j/k ↑/↓", "Move cursor"),
            ("Enter", "Select accessory"),
            ("Esc", "Deselect / close"),
            ("Tab", "Switch pane focus"),
            ("a", "Add accessory"),
            ("n", "Rename"),
            ("d", "Delete"),
            ("y / c", "Copy id / coordinates"),
            ("C / i", "Cycle color / icon"),
            ("h  +/-", "History trail, day range"),
            ("s", "Satellite layer"),
            ("r", "Refresh"),
            ("←→↑↓ z/x", "Pan / zoom map (map focus)"),
            ("q", "Quit"),
        ];

        let mut text = vec![Line::from("")];
        for (key, label) in rows {
            text.push(Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled((*label).to_owned(), theme::key_hint()),
            ]));
        }
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            "                    Esc or ? to close",
            theme::key_hint(),
        )));

        frame.render_widget(Paragraph::new(text), inner);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    Rect::new(area.x + x, area.y + y, width, height)
}

fn render_toast(frame: &mut Frame, area: Rect, notification: &Notification) {
    let width = (notification.message.len() as u16 + 4).min(area.width.saturating_sub(2));
    let toast_area = Rect::new(
        area.width.saturating_sub(width + 1),
        area.height.saturating_sub(4),
        width,
        3,
    );
    frame.render_widget(Clear, toast_area);

    let border_color = match notification.level {
        NotificationLevel::Success => theme::SUCCESS_GREEN,
        NotificationLevel::Error => theme::ERROR_RED,
        NotificationLevel::Info => theme::ACCENT,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {} ", notification.message),
            theme::list_row(),
        )))
        .block(block),
        toast_area,
    );
}

/// The palette color after `current`, wrapping around.
fn next_color(current: &str) -> &'static str {
    let index = COLOR_PALETTE.iter().position(|c| *c == current);
    match index {
        Some(i) => COLOR_PALETTE[(i + 1) % COLOR_PALETTE.len()],
        // Custom color: step back onto the palette.
        None => COLOR_PALETTE[0],
    }
}

/// The icon after `current` in catalog order, wrapping around.
fn next_icon(current: IconKey) -> IconKey {
    let all: Vec<IconKey> = IconKey::iter().collect();
    let index = all.iter().position(|i| *i == current).unwrap_or(0);
    all[(index + 1) % all.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn color_cycle_wraps() {
        assert_eq!(next_color("red"), "grey");
        assert_eq!(next_color("yellow"), "red");
        assert_eq!(next_color("#123456"), "red");
    }

    #[test]
    fn icon_cycle_wraps() {
        assert_eq!(next_icon(IconKey::Pin), IconKey::Luggage);
        assert_eq!(next_icon(IconKey::Camera), IconKey::Pin);
    }

    #[test]
    fn centered_rect_fits_inside_area() {
        let area = Rect::new(0, 0, 80, 24);
        let dialog = centered_rect(area, 44, 6);
        assert!(dialog.width <= area.width);
        assert!(dialog.x + dialog.width <= area.width);
        assert!(dialog.y + dialog.height <= area.height);
    }
}

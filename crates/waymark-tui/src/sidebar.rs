//! Accessory sidebar — the device list pane.
//!
//! Shows every registered accessory in insertion order with its status
//! dot, name, and last known location string. The cursor (j/k) is
//! purely visual; Enter commits it as the active selection, which is
//! what drives fetches and the camera.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState};

use waymark_core::{Accessory, DeviceId};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::status_indicator;

pub struct Sidebar {
    focused: bool,
    accessories: Arc<Vec<Accessory>>,
    cursor: usize,
    selected: Option<DeviceId>,
}

impl Sidebar {
    pub fn new() -> Self {
        Self {
            focused: false,
            accessories: Arc::new(Vec::new()),
            cursor: 0,
            selected: None,
        }
    }

    /// The accessory under the cursor, if any.
    pub fn cursor_id(&self) -> Option<DeviceId> {
        self.accessories.get(self.cursor).map(|a| a.id.clone())
    }

    pub fn selected(&self) -> Option<&DeviceId> {
        self.selected.as_ref()
    }

    pub fn set_selected(&mut self, id: Option<DeviceId>) {
        self.selected = id;
    }

    /// Display name of the selected accessory, when it is still listed.
    fn selected_name(&self) -> Option<&str> {
        let selected = self.selected.as_ref()?;
        self.accessories
            .iter()
            .find(|a| &a.id == selected)
            .map(|a| a.name.as_str())
    }

    fn clamp_cursor(&mut self) {
        if self.accessories.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.accessories.len() {
            self.cursor = self.accessories.len() - 1;
        }
    }

    fn row(&self, accessory: &Accessory) -> ListItem<'static> {
        let selected_marker = if self.selected.as_ref() == Some(&accessory.id) {
            "▶ "
        } else {
            "  "
        };

        let name_line = Line::from(vec![
            Span::raw(selected_marker),
            status_indicator::status_span(accessory.status),
            Span::raw(" "),
            Span::styled(
                crate::map_view::icon_glyph(accessory.icon),
                theme::key_hint_key(),
            ),
            Span::raw(" "),
            Span::styled(accessory.name.clone(), theme::list_row()),
        ]);
        let location_line = Line::from(Span::styled(
            format!("     {}", accessory.location),
            theme::key_hint(),
        ));

        ListItem::new(vec![name_line, location_line])
    }
}

impl Component for Sidebar {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.accessories.is_empty() {
                    self.cursor = (self.cursor + 1).min(self.accessories.len() - 1);
                }
                Ok(None)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                Ok(None)
            }
            KeyCode::Char('g') => {
                self.cursor = 0;
                Ok(None)
            }
            KeyCode::Char('G') => {
                self.cursor = self.accessories.len().saturating_sub(1);
                Ok(None)
            }
            KeyCode::Enter => Ok(Some(Action::Activate)),
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::AccessoriesUpdated(accessories) = action {
            self.accessories = Arc::clone(accessories);
            self.clamp_cursor();
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        // Title follows the selection, like the original header.
        let title = match self.selected_name() {
            Some(name) => format!(" {name} "),
            None => format!(" Your accessories ({}) ", self.accessories.len()),
        };
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });

        if self.accessories.is_empty() {
            let empty = ratatui::widgets::Paragraph::new(Line::from(Span::styled(
                "  No accessories — press a to add one",
                theme::key_hint(),
            )))
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem<'static>> = self.accessories.iter().map(|a| self.row(a)).collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(theme::list_selected());

        let mut state = ListState::default();
        state.select(Some(self.cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

//! Map pane — canvas-rendered live map of accessory markers.
//!
//! The camera (center + zoom) belongs to this pane. It only ever moves
//! itself on user input (arrow pan, z/x zoom); programmatic moves
//! arrive as [`CameraAction`]s from the tracker, which already
//! enforces the focus-once-per-selection rule.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::canvas::{Canvas, Context};
use ratatui::widgets::{Block, BorderType, Borders};

use waymark_core::{
    Accessory, CameraAction, CustomMarker, DeviceId, GeoPoint, IconKey, MarkerPosition, MarkerSet,
    ICON_ZOOM,
};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

const MIN_ZOOM: u8 = 3;
const MAX_ZOOM: u8 = ICON_ZOOM;

/// Terminal glyph for an accessory icon, used in the sidebar and at
/// close zoom on the map.
pub fn icon_glyph(icon: IconKey) -> &'static str {
    match icon {
        IconKey::Pin => "◉",
        IconKey::Luggage => "▣",
        IconKey::Car => "⊟",
        IconKey::Backpack => "◘",
        IconKey::Key => "⚿",
        IconKey::Wallet => "▤",
        IconKey::Suitcase => "▥",
        IconKey::Bicycle => "∞",
        IconKey::PersonWalking => "ᛉ",
        IconKey::Laptop => "⌗",
        IconKey::Guitar => "♪",
        IconKey::Camera => "◎",
    }
}

pub struct MapView {
    focused: bool,
    markers: MarkerSet,
    accessories: Arc<Vec<Accessory>>,
    selected: Option<DeviceId>,
    center: GeoPoint,
    zoom: u8,
    satellite: bool,
}

impl MapView {
    pub fn new(center: GeoPoint, zoom: u8, satellite: bool) -> Self {
        Self {
            focused: false,
            markers: MarkerSet::Custom(Vec::new()),
            accessories: Arc::new(Vec::new()),
            selected: None,
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            satellite,
        }
    }

    pub fn set_markers(&mut self, markers: MarkerSet) {
        self.markers = markers;
    }

    pub fn set_selected(&mut self, selected: Option<DeviceId>) {
        self.selected = selected;
    }

    pub fn set_satellite(&mut self, satellite: bool) {
        self.satellite = satellite;
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Apply a camera directive from the tracker.
    pub fn apply_camera(&mut self, action: CameraAction) {
        match action {
            CameraAction::None => {}
            CameraAction::FocusSelection { bounds, zoom } => {
                self.center = GeoPoint {
                    lat: (bounds.south_west.lat + bounds.north_east.lat) / 2.0,
                    lng: (bounds.south_west.lng + bounds.north_east.lng) / 2.0,
                };
                self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
            }
            CameraAction::ResetToDefault { center, zoom } => {
                self.center = center;
                self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
            }
        }
    }

    /// Degrees of latitude visible at the current zoom.
    fn lat_span(&self) -> f64 {
        360.0 / f64::from(1u32 << self.zoom)
    }

    fn pan(&mut self, dx: f64, dy: f64) {
        let step = self.lat_span() / 8.0;
        self.center.lng += dx * step * 2.0;
        self.center.lat = (self.center.lat + dy * step).clamp(-85.0, 85.0);
    }

    fn draw_history(ctx: &mut Context<'_>, pins: &[MarkerPosition]) {
        // Trail lines between consecutive fixes, oldest to newest.
        for pair in pins.windows(2) {
            ctx.draw(&ratatui::widgets::canvas::Line {
                x1: pair[0].lng,
                y1: pair[0].lat,
                x2: pair[1].lng,
                y2: pair[1].lat,
                color: theme::BORDER_GRAY,
            });
        }
        for pin in pins {
            ctx.print(
                pin.lng,
                pin.lat,
                Span::styled("•", Style::default().fg(theme::ACCENT)),
            );
        }
    }

    fn draw_custom(&self, ctx: &mut Context<'_>, markers: &[CustomMarker]) {
        for marker in markers {
            let color = theme::marker_color(&marker.color);
            let glyph = if self.zoom >= ICON_ZOOM {
                self.accessories
                    .iter()
                    .find(|a| a.id == marker.position.id)
                    .map_or("◉", |a| icon_glyph(a.icon))
            } else {
                "▼"
            };

            let style = if self.selected.as_ref() == Some(&marker.position.id) {
                Style::default().fg(color).bg(theme::BG_HIGHLIGHT)
            } else {
                Style::default().fg(color)
            };
            ctx.print(marker.position.lng, marker.position.lat, Span::styled(glyph, style));

            // Label the selected marker with its name.
            if self.selected.as_ref() == Some(&marker.position.id) {
                if let Some(accessory) = self
                    .accessories
                    .iter()
                    .find(|a| a.id == marker.position.id)
                {
                    ctx.print(
                        marker.position.lng,
                        marker.position.lat - self.lat_span() / 20.0,
                        Span::styled(accessory.name.clone(), Style::default().fg(theme::DIM_WHITE)),
                    );
                }
            }
        }
    }
}

impl Component for MapView {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Left => self.pan(-1.0, 0.0),
            KeyCode::Right => self.pan(1.0, 0.0),
            KeyCode::Up => self.pan(0.0, 1.0),
            KeyCode::Down => self.pan(0.0, -1.0),
            KeyCode::Char('z') => self.zoom = (self.zoom + 1).min(MAX_ZOOM),
            KeyCode::Char('x') => self.zoom = self.zoom.saturating_sub(1).max(MIN_ZOOM),
            _ => return Ok(None),
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::AccessoriesUpdated(accessories) => {
                self.accessories = Arc::clone(accessories);
            }
            Action::Camera(camera) => self.apply_camera(*camera),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let layer = if self.satellite { "satellite" } else { "streets" };
        let title = format!(
            " Map · zoom {} · {layer} · {} marker{} ",
            self.zoom,
            self.markers.len(),
            if self.markers.len() == 1 { "" } else { "s" },
        );
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

        let background = if self.satellite {
            theme::MAP_SATELLITE
        } else {
            theme::MAP_STREETS
        };

        let lat_span = self.lat_span();
        let lng_span = lat_span * 2.0;

        let canvas = Canvas::default()
            .block(block)
            .background_color(background)
            .x_bounds([
                self.center.lng - lng_span / 2.0,
                self.center.lng + lng_span / 2.0,
            ])
            .y_bounds([
                self.center.lat - lat_span / 2.0,
                self.center.lat + lat_span / 2.0,
            ])
            .paint(|ctx| match &self.markers {
                MarkerSet::HistoryPins(pins) => Self::draw_history(ctx, pins),
                MarkerSet::Custom(markers) => self.draw_custom(ctx, markers),
            });

        frame.render_widget(canvas, area);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::{Bounds, DEFAULT_CENTER, DEFAULT_ZOOM};

    fn map() -> MapView {
        MapView::new(DEFAULT_CENTER, DEFAULT_ZOOM, false)
    }

    #[test]
    fn zoom_clamps_to_range() {
        let mut view = map();
        for _ in 0..30 {
            let _ = view.handle_key_event(KeyEvent::new(
                KeyCode::Char('z'),
                crossterm::event::KeyModifiers::NONE,
            ));
        }
        assert_eq!(view.zoom(), MAX_ZOOM);

        for _ in 0..30 {
            let _ = view.handle_key_event(KeyEvent::new(
                KeyCode::Char('x'),
                crossterm::event::KeyModifiers::NONE,
            ));
        }
        assert_eq!(view.zoom(), MIN_ZOOM);
    }

    #[test]
    fn focus_action_recenters_on_selection() {
        let mut view = map();
        let point = GeoPoint { lat: 41.0, lng: -77.0 };
        view.apply_camera(CameraAction::FocusSelection {
            bounds: Bounds::around(point),
            zoom: ICON_ZOOM,
        });
        assert!((view.center.lat - 41.0).abs() < f64::EPSILON);
        assert!((view.center.lng + 77.0).abs() < f64::EPSILON);
        assert_eq!(view.zoom(), ICON_ZOOM);
    }

    #[test]
    fn reset_action_returns_home() {
        let mut view = map();
        view.pan(3.0, -2.0);
        view.apply_camera(CameraAction::ResetToDefault {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        });
        assert!((view.center.lat - DEFAULT_CENTER.lat).abs() < f64::EPSILON);
        assert_eq!(view.zoom(), DEFAULT_ZOOM);
    }

    #[test]
    fn every_icon_has_a_glyph() {
        use strum::IntoEnumIterator;
        for icon in IconKey::iter() {
            assert!(!icon_glyph(icon).is_empty());
        }
    }
}

//! Color palette and semantic styling for the dashboard.

use ratatui::style::{Color, Modifier, Style};

// ── Core palette ────────────────────────────────────────────────────

pub const ACCENT: Color = Color::Rgb(128, 255, 234); // #80ffea
pub const HIGHLIGHT: Color = Color::Rgb(225, 53, 255); // #e135ff
pub const SUCCESS_GREEN: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const WARNING_YELLOW: Color = Color::Rgb(241, 250, 140); // #f1fa8c
pub const ERROR_RED: Color = Color::Rgb(255, 99, 99); // #ff6363

pub const DIM_WHITE: Color = Color::Rgb(189, 193, 207); // #bdc1cf
pub const BORDER_GRAY: Color = Color::Rgb(98, 114, 164); // #6272a4
pub const BG_HIGHLIGHT: Color = Color::Rgb(40, 42, 54); // #282a36
pub const BG_DARK: Color = Color::Rgb(30, 31, 41); // #1e1f29

// Map backgrounds: muted land tone for streets, darker green for
// satellite rendering.
pub const MAP_STREETS: Color = Color::Rgb(44, 48, 58);
pub const MAP_SATELLITE: Color = Color::Rgb(24, 38, 28);

// ── Semantic styles ─────────────────────────────────────────────────

/// Title text for blocks/panels.
pub fn title_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

/// Border for a focused panel.
pub fn border_focused() -> Style {
    Style::default().fg(HIGHLIGHT)
}

/// Border for an unfocused panel.
pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Normal list row text.
pub fn list_row() -> Style {
    Style::default().fg(DIM_WHITE)
}

/// Selected / highlighted list row.
pub fn list_selected() -> Style {
    Style::default()
        .fg(HIGHLIGHT)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Key-hint label text.
pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Key-hint key text.
pub fn key_hint_key() -> Style {
    Style::default().fg(ACCENT)
}

/// Map a marker's CSS color name to a terminal color.
pub fn marker_color(name: &str) -> Color {
    match name {
        "red" => Color::Rgb(255, 85, 85),
        "grey" | "gray" => Color::Rgb(150, 150, 160),
        "blue" => Color::Rgb(98, 160, 255),
        "orange" => Color::Rgb(255, 170, 66),
        "yellow" => WARNING_YELLOW,
        "green" => SUCCESS_GREEN,
        "purple" => HIGHLIGHT,
        other => parse_hex(other).unwrap_or(DIM_WHITE),
    }
}

fn parse_hex(value: &str) -> Option<Color> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    // get() rejects multi-byte input instead of panicking mid-char.
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

//! Accessory status indicator — ●/◐/○ with color mapping.

use ratatui::style::Style;
use ratatui::text::Span;
use waymark_core::AccessoryStatus;

use crate::theme;

/// Returns a styled `Span` with the appropriate status dot and color.
pub fn status_span(status: AccessoryStatus) -> Span<'static> {
    let (symbol, color) = match status {
        AccessoryStatus::Online => ("●", theme::SUCCESS_GREEN),
        AccessoryStatus::Pending => ("◐", theme::WARNING_YELLOW),
        AccessoryStatus::Offline => ("○", theme::ERROR_RED),
    };
    Span::styled(symbol, Style::default().fg(color))
}

/// Returns the status dot character without styling.
pub fn status_char(status: AccessoryStatus) -> &'static str {
    match status {
        AccessoryStatus::Online => "●",
        AccessoryStatus::Pending => "◐",
        AccessoryStatus::Offline => "○",
    }
}

// ── Icon catalog ──
//
// The twelve accessory icons, keyed by the strings stored in the
// registry file. `svg()` yields the serialized vector markup embedded
// in render payloads; terminal glyph mapping lives in the TUI crate.

use serde::{Deserialize, Serialize};

/// Symbolic key of an accessory icon.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IconKey {
    #[default]
    Pin,
    Luggage,
    Car,
    Backpack,
    Key,
    Wallet,
    Suitcase,
    Bicycle,
    PersonWalking,
    Laptop,
    Guitar,
    Camera,
}

impl IconKey {
    /// Serialized vector markup for this icon, sized for a marker badge.
    pub fn svg(self) -> &'static str {
        match self {
            Self::Pin => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M12 2a7 7 0 0 0-7 7c0 5.25 7 13 7 13s7-7.75 7-13a7 7 0 0 0-7-7zm0 9.5A2.5 2.5 0 1 1 12 6.5a2.5 2.5 0 0 1 0 5z"/></svg>"#
            }
            Self::Luggage => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M17 6h-2V3H9v3H7a2 2 0 0 0-2 2v11a2 2 0 0 0 2 2h10a2 2 0 0 0 2-2V8a2 2 0 0 0-2-2zm-6-1h2v1h-2V5zm-1 12H8V9h2v8zm6 0h-2V9h2v8z"/></svg>"#
            }
            Self::Car => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M18.9 5.9A1.5 1.5 0 0 0 17.5 5h-11a1.5 1.5 0 0 0-1.4.9L3 11v8a1 1 0 0 0 1 1h1a1 1 0 0 0 1-1v-1h12v1a1 1 0 0 0 1 1h1a1 1 0 0 0 1-1v-8l-2.1-5.1zM6.5 15A1.5 1.5 0 1 1 8 13.5 1.5 1.5 0 0 1 6.5 15zm11 0a1.5 1.5 0 1 1 1.5-1.5 1.5 1.5 0 0 1-1.5 1.5zM5 10l1.5-4h11L19 10H5z"/></svg>"#
            }
            Self::Backpack => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M17 6.3V5a3 3 0 0 0-3-3h-4a3 3 0 0 0-3 3v1.3A4 4 0 0 0 4 10v9a3 3 0 0 0 3 3h10a3 3 0 0 0 3-3v-9a4 4 0 0 0-3-3.7zM9 5a1 1 0 0 1 1-1h4a1 1 0 0 1 1 1v1H9V5zm8 10H7v-2h10v2z"/></svg>"#
            }
            Self::Key => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M21 10h-8.35A5.99 5.99 0 0 0 7 6a6 6 0 1 0 5.65 8H14l2 2 2-2 2 2 3-3.08L21 10zM7 15a3 3 0 1 1 3-3 3 3 0 0 1-3 3z"/></svg>"#
            }
            Self::Wallet => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M20 7V5a2 2 0 0 0-2-2H5a3 3 0 0 0-3 3v12a3 3 0 0 0 3 3h15a2 2 0 0 0 2-2V9a2 2 0 0 0-2-2zm-3 8a2 2 0 1 1 2-2 2 2 0 0 1-2 2zM5 7a1 1 0 0 1 0-2h13v2H5z"/></svg>"#
            }
            Self::Suitcase => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M19 7h-3V5a2 2 0 0 0-2-2h-4a2 2 0 0 0-2 2v2H5a2 2 0 0 0-2 2v10a2 2 0 0 0 2 2h14a2 2 0 0 0 2-2V9a2 2 0 0 0-2-2zm-9-2h4v2h-4V5zm-2 13H7V9h1v9zm9 0h-1V9h1v9z"/></svg>"#
            }
            Self::Bicycle => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M5 13a4 4 0 1 0 4 4 4 4 0 0 0-4-4zm0 6.5A2.5 2.5 0 1 1 7.5 17 2.5 2.5 0 0 1 5 19.5zm14-6.5a4 4 0 1 0 4 4 4 4 0 0 0-4-4zm0 6.5A2.5 2.5 0 1 1 21.5 17 2.5 2.5 0 0 1 19 19.5zM14.8 7.5 17 12h-4.2l-2-4.5h4zm-6.3-2H5v1.5h2.5l.8 1.8L6 13h2l1.8-3.8L11 12h1.7L9.9 5.5h-1.4z"/></svg>"#
            }
            Self::PersonWalking => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M13.5 5.5a2 2 0 1 0-2-2 2 2 0 0 0 2 2zM9.8 8.9 7 23h2.1l1.8-8 2.1 2v6h2v-7.5l-2.1-2 .6-3A7.3 7.3 0 0 0 19 13v-2a5.2 5.2 0 0 1-4.5-2.5l-1-1.6a2 2 0 0 0-1.7-.9 2 2 0 0 0-.7.1L6 7.8V13h2V9.6l1.8-.7"/></svg>"#
            }
            Self::Laptop => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M20 18V6a2 2 0 0 0-2-2H6a2 2 0 0 0-2 2v12H2v2h20v-2h-2zM6 6h12v10H6V6z"/></svg>"#
            }
            Self::Guitar => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M19.6 3 21 4.4l-4.2 4.2.6 1.5a5.1 5.1 0 0 1-1.2 5.3 5.6 5.6 0 0 1-3.3 1.5 3.2 3.2 0 0 0-2.1.9 3.6 3.6 0 0 1-5.1 0 3.6 3.6 0 0 1 0-5.1 3.2 3.2 0 0 0 .9-2.1 5.6 5.6 0 0 1 1.5-3.3 5.1 5.1 0 0 1 5.3-1.2l1.5.6L19.6 3zM9.5 13a1.5 1.5 0 1 0 1.5 1.5A1.5 1.5 0 0 0 9.5 13z"/></svg>"#
            }
            Self::Camera => {
                r#"<svg viewBox="0 0 24 24" width="20" height="20" fill="currentColor"><path d="M20 6h-3.2L15 4H9L7.2 6H4a2 2 0 0 0-2 2v11a2 2 0 0 0 2 2h16a2 2 0 0 0 2-2V8a2 2 0 0 0-2-2zm-8 11a4.5 4.5 0 1 1 4.5-4.5A4.5 4.5 0 0 1 12 17zm0-7a2.5 2.5 0 1 0 2.5 2.5A2.5 2.5 0 0 0 12 10z"/></svg>"#
            }
        }
    }
}

// ── New-accessory color palette ─────────────────────────────────────

/// Colors assigned to freshly added accessories.
pub const COLOR_PALETTE: [&str; 5] = ["red", "grey", "blue", "orange", "yellow"];

/// Deterministic palette pick from a device id.
pub fn default_color(id: &str) -> &'static str {
    let sum: usize = id.bytes().map(usize::from).sum();
    COLOR_PALETTE[sum % COLOR_PALETTE.len()]
}

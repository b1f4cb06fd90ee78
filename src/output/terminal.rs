//! Terminal colors

use console::Style;

/// 256-color palette
pub mod colors {
    pub const GREY: u8 = 102;      // #7D7D7D - Punctuation, secondary
    pub const AQUA: u8 = 109;      // #7A9EB5 - Numbers, info
    pub const ORANGE: u8 = 208;    // #F2913D - Warnings, PUT/PATCH
    pub const RED: u8 = 167;       // #E34F45 - Errors, DELETE
    pub const BLUE: u8 = 68;       // #426BD1 - Names, labels
    pub const GREEN: u8 = 71;      // #63C27A - Success, GET
    pub const YELLOW: u8 = 185;    // #CCCC3D - POST, redirects
}

/// Paints text, or passes it through when colors are off
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn colorize(&self, text: &str, color: u8) -> String {
        self.apply(text, Style::new().color256(color))
    }

    pub fn bold(&self, text: &str, color: u8) -> String {
        self.apply(text, Style::new().color256(color).bold())
    }

    pub fn label(&self, text: &str) -> String {
        self.colorize(text, colors::BLUE)
    }

    pub fn muted(&self, text: &str) -> String {
        self.colorize(text, colors::GREY)
    }

    pub fn status(&self, text: &str, code: u16) -> String {
        self.bold(text, http_status(code))
    }

    pub fn method(&self, method: &str) -> String {
        self.bold(method, http_method(method))
    }

    fn apply(&self, text: &str, style: Style) -> String {
        if self.enabled {
            style.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// HTTP status code color
pub fn http_status(code: u16) -> u8 {
    match code / 100 {
        1 => colors::AQUA,   // Informational
        2 => colors::GREEN,  // Success
        3 => colors::YELLOW, // Redirect
        4 => colors::ORANGE, // Client error
        5 => colors::RED,    // Server error
        _ => colors::GREY,
    }
}

/// HTTP method color
pub fn http_method(method: &str) -> u8 {
    match method.to_uppercase().as_str() {
        "GET" | "HEAD" | "OPTIONS" => colors::GREEN,
        "POST" => colors::YELLOW,
        "PUT" | "PATCH" => colors::ORANGE,
        "DELETE" => colors::RED,
        _ => colors::GREY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_painter_is_plain() {
        let painter = Painter::new(false);
        assert_eq!(painter.status("200 OK", 200), "200 OK");
    }

    #[test]
    fn test_enabled_painter_uses_palette() {
        let painter = Painter::new(true);
        let painted = painter.bold("FAIL", colors::RED);
        assert!(painted.contains("38;5;167m"));
        assert!(painted.contains("FAIL"));
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(http_status(204), colors::GREEN);
        assert_eq!(http_status(404), colors::ORANGE);
        assert_eq!(http_status(503), colors::RED);
        assert_eq!(http_method("delete"), colors::RED);
    }
}

//! Response output

pub mod terminal;

pub use terminal::Painter;

use crate::client::{ResponseBody, ResponseResult};

/// Headers worth showing for an API call
const SHOWN_HEADERS: &[&str] = &["content-type", "content-length", "location", "date", "retry-after"];

fn is_shown(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SHOWN_HEADERS.contains(&lower.as_str())
        || lower.starts_with("x-ratelimit")
        || lower.starts_with("ratelimit")
        || lower.ends_with("request-id")
        || lower == "x-correlation-id"
}

/// Render the status line, selected headers and body of a response
pub fn render_response(response: &ResponseResult, painter: &Painter) -> String {
    let mut out = String::new();

    let status_line = match &response.reason {
        Some(reason) => format!("{} {}", response.status, reason),
        None => response.status.to_string(),
    };
    out.push_str(&format!(
        "Response Status: {} {}\n",
        painter.status(&status_line, response.status),
        painter.muted(&format!("({} ms)", response.elapsed.as_millis()))
    ));

    for (name, value) in response.headers.iter().filter(|(n, _)| is_shown(n)) {
        out.push_str(&format!("{}: {}\n", painter.label(name), value));
    }

    match &response.body {
        ResponseBody::Json(value) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            out.push('\n');
            out.push_str(&pretty);
            out.push('\n');
        }
        ResponseBody::Text(text) => {
            out.push('\n');
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
        ResponseBody::Empty => {}
    }

    out
}

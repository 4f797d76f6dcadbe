//! Mock terminal
//!
//! Nothing is executed. Input is echoed back and "running" a file produces a
//! canned transcript chosen by extension, all delivered as `terminal:data`
//! events.

use std::path::Path;

use tracing::debug;

use crate::events::EventBroadcaster;

/// First thing a freshly connected terminal sees
pub const GREETING: &str = "Terminal emulation active (node-pty removed)\r\n$ ";

const PROMPT: &str = "\r\n$ ";

/// Echo-only terminal that writes to the realtime channel
#[derive(Clone)]
pub struct MockTerminal {
    events: EventBroadcaster,
}

impl MockTerminal {
    pub fn new(events: EventBroadcaster) -> Self {
        Self { events }
    }

    /// Echo input back to every client
    pub fn write(&self, data: &str) {
        self.events.terminal_data(echo(data));
    }

    /// Stream a mock run of `path`
    pub async fn run(&self, path: &Path) {
        debug!(path = %path.display(), "Mock run requested");
        for chunk in transcript(path).await {
            self.events.terminal_data(chunk);
        }
    }
}

pub fn echo(data: &str) -> String {
    format!("> {}\r\n", data)
}

/// Output chunks for a mock run of `path`, in emission order
pub async fn transcript(path: &Path) -> Vec<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    let mut out = vec![format!("\r\n> Running file: {}\r\n", name)];

    match extension.as_str() {
        ".js" => {
            out.push(format!("$ node {}\r\n", name));
            out.extend(
                simulated_output(
                    path,
                    &name,
                    "console.log",
                    "Console output would appear here",
                    "No console output",
                )
                .await,
            );
        }
        ".py" => {
            out.push(format!("$ python {}\r\n", name));
            out.extend(
                simulated_output(
                    path,
                    &name,
                    "print",
                    "Print output would appear here",
                    "No print output",
                )
                .await,
            );
        }
        ".html" => {
            out.push(format!("$ Opening {} in browser\r\n", name));
            out.push("HTML files can be previewed in a browser\r\n".to_string());
        }
        _ => {
            out.push(format!("Unsupported file type: {}\r\n", extension));
            out.push("Currently supporting: .js, .py, .html\r\n".to_string());
        }
    }

    out.push(PROMPT.to_string());
    out
}

async fn simulated_output(
    path: &Path,
    name: &str,
    marker: &str,
    found: &str,
    missing: &str,
) -> Vec<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let line = if content.contains(marker) { found } else { missing };
            vec![
                format!("Output from {}:\r\n", name),
                format!("{}\r\n", line),
            ]
        }
        Err(e) => vec![format!("Error: {}\r\n", e)],
    }
}

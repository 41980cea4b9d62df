//! Log sanitization for personal data and secrets.
//!
//! Applied to every formatted log line through [`SanitizingMakeWriter`]:
//! - E-mail addresses, phone numbers and UUIDs
//! - Database URLs with embedded credentials
//! - `password=`/`token=` style secrets
//! - Raw health measurements (`peso=82`, `height: 170`, `bmi=24.2`)
//!
//! The pipeline logs field names and counts, not values. This layer catches
//! what slips through.
//!
//! Input is capped at `HEARTWISE_SANITIZE_MAX_BYTES` (default 16 KiB) per call.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

pub const SANITIZE_MAX_BYTES_ENV: &str = "HEARTWISE_SANITIZE_MAX_BYTES";

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// Emitted instead of a line when the patterns failed to compile.
const UNSANITIZABLE: &str = "[REDACTED-UNSANITIZABLE-LINE]";

static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    set: RegexSet,
    rules: Vec<Rule>,
}

const RULES: [(&str, &str); 7] = [
    (
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        "[REDACTED-UUID]",
    ),
    (
        r"(?i)\b([a-z][a-z0-9+.-]*://)[^\s:/@]+:[^\s/@]+@",
        "${1}[REDACTED-CREDENTIALS]@",
    ),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
        "[REDACTED-PHONE]",
    ),
    (
        r"\+[0-9]{2,3}[-.\s]?[0-9]{3}[-.\s]?[0-9]{3}[-.\s]?[0-9]{3}\b",
        "[REDACTED-PHONE]",
    ),
    (
        r#"(?i)\b(password|passwd|pwd|secret|token|api[_-]?key)\b(["']?\s*[:=]\s*)[^\s,;"']+"#,
        "${1}${2}[REDACTED-SECRET]",
    ),
    (
        r#"(?i)\b(peso|weight|altura|height|imc|bmi|edad|age)\b(["']?\s*[:=]\s*)-?[0-9]+(?:\.[0-9]+)?"#,
        "${1}${2}[REDACTED-MEASUREMENT]",
    ),
];

fn compile() -> Option<Patterns> {
    let set = RegexSet::new(RULES.iter().map(|(p, _)| *p)).ok()?;
    let rules = RULES
        .iter()
        .map(|&(pattern, replacement)| {
            Regex::new(pattern).ok().map(|regex| Rule {
                regex,
                replacement,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Patterns { set, rules })
}

fn patterns() -> Option<&'static Patterns> {
    PATTERNS.get_or_init(compile).as_ref()
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var(SANITIZE_MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Redact personal data and secrets from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let Some(patterns) = patterns() else {
        return UNSANITIZABLE.to_string();
    };
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
        if input.ends_with('\n') {
            result.push('\n');
        }
    }
    result
}

/// Whether `input` contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let Some(patterns) = patterns() else {
        return true;
    };
    let (prefix, _) = truncate_to_char_boundary(input, max_sanitize_bytes());
    patterns.set.is_match(prefix)
}

/// A `tracing_subscriber` writer wrapper that sanitizes each formatted line
/// before it reaches the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let sanitized = sanitize(&String::from_utf8_lossy(bytes));
        self.inner.write_all(sanitized.as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A formatter writing one huge line must not buffer without bound.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if self.buffer.len() > hard_cap {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
            if pending.last() != Some(&b'\n') {
                self.inner.write_all(b"\n")?;
            }
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

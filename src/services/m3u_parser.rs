use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::io::BufRead;
use thiserror::Error;

use crate::models::{Playlist, PlaylistEntry};

pub const EXT_M3U: &str = "#EXTM3U";
pub const EXT_INF: &str = "#EXTINF";
pub const EXT_VLC_OPT: &str = "#EXTVLCOPT";

lazy_static! {
    /// Regex to parse a single VLC option (`#EXTVLCOPT:http-referrer=http://...`)
    /// Key stops at the first `=`, so values may contain `=` themselves
    static ref VLC_OPT_REGEX: Regex = Regex::new(r"^#EXTVLCOPT:\s*([^=]+)=(.*)$").unwrap();
}

/// Errors raised while parsing a playlist
#[derive(Debug, Error)]
pub enum ParseError {
    /// The first non-empty line is not `#EXTM3U`
    #[error("Invalid file header. Header doesn't start with #EXTM3U")]
    InvalidHeader,
    #[error("Failed to read playlist: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed EXTINF line data
#[derive(Debug, Default)]
struct ExtinfData {
    title: Option<String>,
    attributes: HashMap<String, String>,
}

/// State collected between an EXTINF line and its URL line
#[derive(Debug, Default)]
struct PendingEntry {
    title: Option<String>,
    attributes: HashMap<String, String>,
    extra_params: HashMap<String, String>,
}

impl PendingEntry {
    /// Consume the pending state and build an entry for the given URL line
    fn into_entry(self, line: &str) -> Option<PlaylistEntry> {
        let title = self.title?;
        let (url, mut url_params) = split_url_line(line);
        if url.is_empty() {
            return None;
        }

        let mut params = self.extra_params;
        let mut attributes = self.attributes;

        Some(PlaylistEntry {
            url,
            title,

            user_agent: params
                .remove("http-user-agent")
                .or_else(|| url_params.remove("user-agent")),
            referer: params
                .remove("http-referrer")
                .or_else(|| params.remove("http-referer"))
                .or_else(|| url_params.remove("referer"))
                .or_else(|| url_params.remove("referrer")),

            drm_key: url_params.remove("key").or_else(|| attributes.remove("key")),
            drm_key_id: url_params
                .remove("keyid")
                .or_else(|| attributes.remove("keyid")),

            channel_id: attributes.remove("tvg-id"),
            logo_url: attributes.remove("tvg-logo"),
            group_title: attributes.remove("group-title"),
        })
    }
}

/// Line-by-line accumulator for one parse call
#[derive(Debug, Default)]
struct ParseState {
    items: Vec<PlaylistEntry>,
    pending: PendingEntry,
    dropped: usize,
}

impl ParseState {
    fn feed(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }

        if line.starts_with(EXT_INF) {
            let extinf = parse_extinf(line);
            self.pending.title = extinf.title;
            self.pending.attributes = extinf.attributes;
            // Reset in case the previous entry never got its URL line
            self.pending.extra_params.clear();
        } else if line.starts_with(EXT_VLC_OPT) {
            if let Some((key, value)) = parse_vlc_opt(line) {
                self.pending.extra_params.insert(key, value);
            }
        } else if !line.starts_with('#') {
            let pending = std::mem::take(&mut self.pending);
            match pending.into_entry(line) {
                Some(entry) => self.items.push(entry),
                None => self.dropped += 1,
            }
        }
    }
}

/// Parser for extended M3U playlists as published by iptv-org
pub struct PlaylistParser;

impl PlaylistParser {
    /// Parse M3U content into a [`Playlist`]
    ///
    /// Fails only when the first non-empty line doesn't start with `#EXTM3U`.
    /// Incomplete entries are skipped.
    pub fn parse(content: &str) -> Result<Playlist, ParseError> {
        Self::parse_lines(content.lines().map(Ok::<_, std::io::Error>))
    }

    /// Parse M3U content from a buffered reader
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<Playlist, ParseError> {
        Self::parse_lines(reader.lines())
    }

    fn parse_lines<I, S>(lines: I) -> Result<Playlist, ParseError>
    where
        I: IntoIterator<Item = std::io::Result<S>>,
        S: AsRef<str>,
    {
        let mut lines = lines.into_iter();

        let mut found_header = false;
        for line in lines.by_ref() {
            let line = line?;
            let trimmed = line.as_ref().trim_start_matches('\u{feff}').trim();
            if trimmed.is_empty() {
                continue;
            }
            found_header = is_extended_m3u(trimmed);
            break;
        }

        if !found_header {
            return Err(ParseError::InvalidHeader);
        }

        let mut state = ParseState::default();
        for line in lines {
            let line = line?;
            state.feed(line.as_ref().trim());
        }

        tracing::debug!(
            entries = state.items.len(),
            dropped = state.dropped,
            "Playlist parsed"
        );

        Ok(Playlist { items: state.items })
    }
}

/// Check if the header line marks an extended M3U playlist
fn is_extended_m3u(line: &str) -> bool {
    line.starts_with(EXT_M3U)
}

/// Remove all double quotes and trim
fn strip_quotes(text: &str) -> String {
    text.replace('"', "").trim().to_string()
}

/// Split at the first `delimiter` that is not inside double quotes
fn split_unquoted(text: &str, delimiter: char) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    for (i, c) in text.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            return Some((&text[..i], &text[i + c.len_utf8()..]));
        }
    }
    None
}

/// Split on whitespace that is not inside double quotes
fn split_unquoted_whitespace(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;

    for (i, c) in text.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        }
        if c.is_whitespace() && !in_quotes {
            if let Some(token_start) = start.take() {
                tokens.push(&text[token_start..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }

    if let Some(token_start) = start {
        tokens.push(&text[token_start..]);
    }

    tokens
}

/// Parse an EXTINF line
/// Format: #EXTINF:-1 tvg-id="..." tvg-logo="..." group-title="...",Title
///
/// The title is everything after the first comma outside of quoted
/// attribute values, so titles may contain commas themselves. A stray
/// quote in an attribute falls back to the last comma.
fn parse_extinf(line: &str) -> ExtinfData {
    let content = &line[EXT_INF.len()..];

    match split_unquoted(content, ',').or_else(|| content.rsplit_once(',')) {
        Some((header, title)) => ExtinfData {
            title: Some(strip_quotes(title)),
            attributes: parse_attributes(header),
        },
        None => ExtinfData {
            title: None,
            attributes: parse_attributes(content),
        },
    }
}

/// Get `key="value"` attributes from the EXTINF header
///
/// Tokens without `=` (the `:-1` duration) are ignored.
fn parse_attributes(header: &str) -> HashMap<String, String> {
    let tokens = if header.matches('"').count() % 2 == 0 {
        split_unquoted_whitespace(header)
    } else {
        header.split_whitespace().collect()
    };

    tokens
        .into_iter()
        .filter_map(|token| {
            let (key, value) = token.split_once('=')?;
            let key = strip_quotes(key).to_lowercase();
            if key.is_empty() {
                return None;
            }
            Some((key, strip_quotes(value)))
        })
        .collect()
}

/// Get key and value from a `#EXTVLCOPT:key=value` line
fn parse_vlc_opt(line: &str) -> Option<(String, String)> {
    let caps = VLC_OPT_REGEX.captures(line)?;
    let key = caps.get(1)?.as_str().trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    let value = caps.get(2).map(|m| strip_quotes(m.as_str())).unwrap_or_default();
    Some((key, value))
}

/// Split a URL line into the URL and its `|`-appended parameters
///
/// Example: `http://host/video.mp4|User-Agent=Mozilla&Referer=http://ref/`
fn split_url_line(line: &str) -> (String, HashMap<String, String>) {
    match line.split_once('|') {
        Some((url, params)) => (strip_quotes(url), parse_url_parameters(params)),
        None => (strip_quotes(line), HashMap::new()),
    }
}

/// Parse `&`-joined `key=value` pairs, keys lower-cased
fn parse_url_parameters(params: &str) -> HashMap<String, String> {
    strip_quotes(params)
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                return None;
            }
            Some((key, value.trim().to_string()))
        })
        .collect()
}

// src/ingest/feed.rs
//! RSS 2.0 / Atom extraction into `RawEntry`.
//!
//! Dialect detection is structural: the first element of the document decides
//! (`<feed>` → Atom, `<rss>` → RSS 2.0). Field picking follows the usual
//! fallbacks of each dialect (RSS `description` then `content:encoded`, Atom
//! `summary` then `content`, ...).

use anyhow::{anyhow, Context, Result};
use metrics::histogram;
use quick_xml::de::from_str;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use std::borrow::Cow;

use crate::ingest::types::RawEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Rss,
    Atom,
}

/// Element text, whatever attributes the element carries.
#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

/* ----------------------------
RSS 2.0
---------------------------- */

// The deserializer matches local names, so `dc:date` arrives as `date` and
// `content:encoded` as `encoded`. Prefixed lookalikes (`media:title`,
// `atom:link`) collide with plain fields; every field is a list and the first
// non-empty value wins.

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(default)]
    link: Vec<Text>,
    #[serde(rename = "pubDate", default)]
    pub_date: Vec<Text>,
    #[serde(rename = "date", default)]
    dc_date: Vec<Text>,
    #[serde(default)]
    description: Vec<Text>,
    #[serde(rename = "encoded", default)]
    content_encoded: Vec<Text>,
    #[serde(default)]
    guid: Vec<Text>,
    #[serde(rename = "category", default)]
    categories: Vec<Text>,
}

impl From<RssItem> for RawEntry {
    fn from(it: RssItem) -> Self {
        RawEntry {
            id: first(it.guid),
            title: first(it.title),
            url: first(it.link),
            summary: first(it.description).or_else(|| first(it.content_encoded)),
            published: first(it.pub_date).or_else(|| first(it.dc_date)),
            categories: it.categories.into_iter().filter_map(text).collect(),
            ..Default::default()
        }
    }
}

/* ----------------------------
Atom
---------------------------- */

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(default)]
    id: Vec<Text>,
    #[serde(default)]
    published: Vec<Text>,
    #[serde(default)]
    updated: Vec<Text>,
    #[serde(default)]
    summary: Vec<Text>,
    #[serde(default)]
    content: Vec<Text>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term", default)]
    term: String,
}

impl AtomEntry {
    /// `rel="alternate"` first, then whatever link comes first.
    fn best_link(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .or_else(|| self.links.first())
            .map(|l| l.href.trim().to_string())
            .filter(|h| !h.is_empty())
    }
}

impl From<AtomEntry> for RawEntry {
    fn from(e: AtomEntry) -> Self {
        let url = e.best_link();
        RawEntry {
            id: first(e.id),
            title: first(e.title),
            url,
            summary: first(e.summary).or_else(|| first(e.content)),
            published: first(e.published).or_else(|| first(e.updated)),
            categories: e
                .categories
                .into_iter()
                .map(|c| c.term.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            ..Default::default()
        }
    }
}

fn text(t: Text) -> Option<String> {
    Some(t.value.trim().to_string()).filter(|s| !s.is_empty())
}

fn first(values: Vec<Text>) -> Option<String> {
    values.into_iter().find_map(text)
}

/// Atom `type="xhtml"` bodies are inline markup, not text. Re-escape the inner
/// markup of `summary`/`content` so it deserializes as an HTML fragment, the
/// same shape `type="html"` content has. Unreadable XML is returned as is and
/// left for the deserializer to report.
fn inline_xhtml_bodies(xml: &str) -> Cow<'_, str> {
    let mut reader = Reader::from_str(xml);
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut open: Option<(usize, usize)> = None; // (inner start, nesting depth)

    loop {
        let before = reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(_) => return Cow::Borrowed(xml),
        };
        match event {
            Event::Start(e) => match open {
                Some((start, depth)) => open = Some((start, depth + 1)),
                None if is_xhtml_body(&e) => open = Some((reader.buffer_position() as usize, 0)),
                None => {}
            },
            Event::End(_) => match open {
                Some((start, 0)) => {
                    spans.push((start, before));
                    open = None;
                }
                Some((start, depth)) => open = Some((start, depth - 1)),
                None => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if spans.is_empty() {
        return Cow::Borrowed(xml);
    }
    let mut out = String::with_capacity(xml.len() + 64);
    let mut at = 0;
    for (start, end) in spans {
        out.push_str(&xml[at..start]);
        out.push_str(&escape(&xml[start..end]));
        at = end;
    }
    out.push_str(&xml[at..]);
    Cow::Owned(out)
}

fn is_xhtml_body(e: &BytesStart<'_>) -> bool {
    matches!(e.local_name().as_ref(), b"summary" | b"content")
        && e
            .try_get_attribute("type")
            .ok()
            .flatten()
            .is_some_and(|a| a.value.as_ref() == b"xhtml")
}

/// Structural check on the first element of the document.
pub fn detect_dialect(xml: &str) -> Option<Dialect> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"feed" => Some(Dialect::Atom),
                    b"rss" => Some(Dialect::Rss),
                    _ => None,
                };
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parse a feed payload of either dialect.
/// Anything that is not RSS 2.0 or Atom is an error (the caller treats the
/// source as empty).
pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(xml.trim_start_matches('\u{feff}'));

    let entries: Vec<RawEntry> = match detect_dialect(&xml) {
        Some(Dialect::Rss) => {
            let rss: Rss = from_str(&xml).context("parsing rss xml")?;
            rss.channel.items.into_iter().map(RawEntry::from).collect()
        }
        Some(Dialect::Atom) => {
            let feed: AtomFeed = from_str(&inline_xhtml_bodies(&xml)).context("parsing atom xml")?;
            feed.entries.into_iter().map(RawEntry::from).collect()
        }
        None => return Err(anyhow!("payload is neither RSS 2.0 nor Atom")),
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(entries)
}

/// HTML named entities that are not defined in XML, rewritten as numeric
/// references so the XML parser accepts them.
fn scrub_html_entities_for_xml(s: &str) -> String {
    const ENTITIES: [(&str, &str); 12] = [
        ("&nbsp;", "&#160;"),
        ("&ndash;", "&#8211;"),
        ("&mdash;", "&#8212;"),
        ("&ldquo;", "&#8220;"),
        ("&rdquo;", "&#8221;"),
        ("&lsquo;", "&#8216;"),
        ("&rsquo;", "&#8217;"),
        ("&hellip;", "&#8230;"),
        ("&laquo;", "&#171;"),
        ("&raquo;", "&#187;"),
        ("&copy;", "&#169;"),
        ("&eacute;", "&#233;"),
    ];
    let mut out = s.to_string();
    for (named, numeric) in ENTITIES {
        if out.contains(named) {
            out = out.replace(named, numeric);
        }
    }
    out
}

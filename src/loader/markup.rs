use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use regex::{Captures, Regex};

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static CDATA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
static PI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<\?.*?\?>").unwrap());
static DOCTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<!DOCTYPE[^\[>]*(\[.*?\])?\s*>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#?[A-Za-z0-9]+;").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Visible text of an HTML page: scripts, styles, comments and tags removed.
pub fn html_to_text(html: &str) -> String {
    // comments first: a commented-out <script> must not pair with a real </script>
    let text = COMMENT_RE.replace_all(html, " ");
    let text = SCRIPT_RE.replace_all(&text, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    collapse_whitespace(&decode_entities(&text))
}

/// Narrative text of an XML document. Regex stripping, no schema awareness:
/// structure, tables and attribute values are lost.
pub fn xml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut last = 0;

    // CDATA bodies are literal text and must not go through tag stripping
    for caps in CDATA_RE.captures_iter(xml) {
        let whole = caps.get(0).unwrap();
        out.push_str(&strip_xml_markup(&xml[last..whole.start()]));
        out.push(' ');
        out.push_str(&caps[1]);
        out.push(' ');
        last = whole.end();
    }
    out.push_str(&strip_xml_markup(&xml[last..]));

    collapse_whitespace(&out)
}

fn strip_xml_markup(xml: &str) -> String {
    let text = COMMENT_RE.replace_all(xml, " ");
    let text = PI_RE.replace_all(&text, " ");
    let text = DOCTYPE_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    decode_entities(&text).into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Decode XML predefined, numeric and the common HTML named entities.
/// Unknown entities are left as written.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let raw = &caps[0];
        unescape_with(raw, |entity| resolve_predefined_entity(entity).or_else(|| html_entity(entity)))
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string())
    })
}

fn html_entity(name: &str) -> Option<&'static str> {
    let s = match name {
        "nbsp" => " ",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "hellip" => "\u{2026}",
        "sect" => "\u{00A7}",
        "para" => "\u{00B6}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        "euro" => "\u{20AC}",
        "pound" => "\u{00A3}",
        "yen" => "\u{00A5}",
        "cent" => "\u{00A2}",
        "deg" => "\u{00B0}",
        "times" => "\u{00D7}",
        "bull" => "\u{2022}",
        _ => return None,
    };
    Some(s)
}

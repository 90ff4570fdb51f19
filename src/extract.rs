//! Lenient tag and attribute extraction primitives.
//!
//! Feeds in the wild are loosely specified and frequently malformed, so instead
//! of building a document tree the parsers compose a handful of pure
//! regex-based primitives over a single unit of markup (one `<item>` or one
//! `<entry>`). A primitive that finds nothing returns an empty string; it never
//! fails, which keeps a broken unit from affecting its neighbours.
//!
//! # Primitives
//!
//! - [`first_tag_inner`]: raw inner markup of the first matching tag
//! - [`first_tag_text`]: decoded inner text of the first matching tag
//! - [`first_attr`]: decoded attribute value from the first matching opening tag
//! - [`text_content`]: human-readable text of a tag body, escaped HTML included
//! - [`decode_entities`]: reverse the standard XML/HTML entities
//! - [`strip_markup`]: drop every tag and collapse whitespace
//! - [`unwrap_cdata`]: replace `<![CDATA[ ... ]]>` sections with their content

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static CDATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
// Only tag-shaped runs count as markup, so text like `<3` or `a < b > c` survives.
static MARKUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][A-Za-z0-9:_-]*(?:\s[^<>]*)?/?>").unwrap()
});
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Return the trimmed inner markup of the first tag among `tag_names`, with
/// CDATA sections unwrapped but entities left alone.
///
/// Names are tried in priority order and the first one with non-empty content
/// wins. Matching is case-insensitive and non-greedy.
///
/// A name only matches when followed by whitespace or `>`: `title` does not
/// match `<media:title>` and `link` does not match `<linkfoo>`. Self-closing
/// tags (`<link href="..."/>`) have no content and are skipped.
pub fn first_tag_inner(block: &str, tag_names: &[&str]) -> String {
    for name in tag_names {
        let pattern = format!(
            r"(?is)<{0}(?:\s[^>]*[^/>])?\s*>(.*?)</{0}\s*>",
            regex::escape(name)
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(block) {
            let inner = unwrap_cdata(&caps[1]);
            let inner = inner.trim();
            if !inner.is_empty() {
                return inner.to_string();
            }
        }
    }
    String::new()
}

/// Return the decoded, trimmed inner text of the first tag among `tag_names`.
///
/// Used for scalar fields (links, dates, names). Nested markup is returned
/// as-is for the caller to deal with; see [`text_content`] for prose.
///
/// # Examples
///
/// ```ignore
/// let unit = "<item><title><![CDATA[Tour &amp; more]]></title></item>";
/// assert_eq!(first_tag_text(unit, &["title"]), "Tour & more");
/// ```
pub fn first_tag_text(block: &str, tag_names: &[&str]) -> String {
    decode_entities(&first_tag_inner(block, tag_names))
        .trim()
        .to_string()
}

/// Return the value of `attr_name` on the first opening tag matching `tag_pattern`.
///
/// `tag_pattern` is a regex fragment matched immediately after `<`, which lets
/// callers pin a tag by its other attributes, e.g.
/// `link\b[^>]*\brel\s*=\s*["']alternate["']`. Double-quoted, single-quoted and
/// bare attribute values are accepted; the value is entity-decoded.
pub fn first_attr(block: &str, tag_pattern: &str, attr_name: &str) -> String {
    let Ok(tag_re) = Regex::new(&format!(r"(?is)<(?:{tag_pattern})[^>]*>")) else {
        return String::new();
    };
    let Ok(attr_re) = Regex::new(&format!(
        r#"(?is)\s{}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
        regex::escape(attr_name)
    )) else {
        return String::new();
    };

    tag_re
        .find(block)
        .and_then(|tag| {
            attr_re
                .captures(tag.as_str())
                .and_then(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
                .map(|m| decode_entities(m.as_str().trim()))
        })
        .unwrap_or_default()
}

/// Plain text of a tag body.
///
/// Real markup is stripped before entities are decoded, so an escaped `&lt;3`
/// stays text. Bodies that carry HTML escaped once more (news-search
/// descriptions) get a second strip after decoding, and their leftover
/// `&nbsp;` runs become spaces.
pub fn text_content(inner: &str) -> String {
    let stripped = strip_markup(inner);
    let decoded = decode_entities(&stripped).replace("&nbsp;", " ");
    strip_markup(&decoded)
}

/// Reverse `&amp; &lt; &gt; &quot; &#39;` (plus `&apos;`, `&nbsp;` and numeric
/// references).
///
/// quick-xml's unescaper handles the well-formed case. Text carrying other
/// HTML-only named entities such as `&hellip;` makes it bail out, in which
/// case only the standard entities are replaced and everything else is left
/// untouched.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let text = text.replace("&nbsp;", " ");
    match quick_xml::escape::unescape(&text) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => text
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    }
}

/// Remove every tag and comment, collapse whitespace runs and trim.
pub fn strip_markup(text: &str) -> String {
    let without_tags = MARKUP_RE.replace_all(text, " ");
    WS_RE.replace_all(&without_tags, " ").trim().to_string()
}

/// Replace each `<![CDATA[ ... ]]>` section with its raw content.
pub fn unwrap_cdata(text: &str) -> Cow<'_, str> {
    CDATA_RE.replace_all(text, "$1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tag_text_unwraps_cdata_and_decodes() {
        let unit = "<item><title><![CDATA[Tour &amp; Merch]]></title></item>";
        assert_eq!(first_tag_text(unit, &["title"]), "Tour & Merch");
    }

    #[test]
    fn test_first_tag_text_is_case_insensitive_and_non_greedy() {
        let unit = "<TITLE type=\"text\">First</TITLE><title>Second</title>";
        assert_eq!(first_tag_text(unit, &["title"]), "First");
    }

    #[test]
    fn test_first_tag_text_respects_name_priority() {
        let unit = "<updated>2024-01-02T00:00:00Z</updated><published>2024-01-01T00:00:00Z</published>";
        assert_eq!(
            first_tag_text(unit, &["published", "updated"]),
            "2024-01-01T00:00:00Z"
        );
        assert_eq!(first_tag_text(unit, &["missing", "updated"]), "2024-01-02T00:00:00Z");
    }

    #[test]
    fn test_first_tag_text_does_not_match_prefixed_names() {
        let unit = "<media:title>Wrong</media:title><linkfoo>x</linkfoo>";
        assert_eq!(first_tag_text(unit, &["title"]), "");
        assert_eq!(first_tag_text(unit, &["link"]), "");
    }

    #[test]
    fn test_first_tag_text_skips_self_closing() {
        let unit = r#"<link href="https://a.example/x"/><title>T</title>"#;
        assert_eq!(first_tag_text(unit, &["link"]), "");
        assert_eq!(first_tag_text(unit, &["title"]), "T");
    }

    #[test]
    fn test_first_attr_quotes_and_pattern() {
        let unit = r#"<link rel="self" href="https://a/self"/><link rel='alternate' href='https://a/watch?v=1&amp;t=2'/>"#;
        assert_eq!(
            first_attr(unit, r#"link\b[^>]*\brel\s*=\s*["']alternate["']"#, "href"),
            "https://a/watch?v=1&t=2"
        );
        assert_eq!(first_attr(unit, r"link\b", "href"), "https://a/self");
        assert_eq!(first_attr("<img src=pic.jpg>", r"img\b", "src"), "pic.jpg");
        assert_eq!(first_attr(unit, r"img\b", "src"), "");
    }

    #[test]
    fn test_first_attr_ignores_prefixed_attribute_names() {
        let tag = r#"<media:content data-url="wrong" url="right"/>"#;
        assert_eq!(first_attr(tag, r"media:content\b", "url"), "right");
    }

    #[test]
    fn test_decode_entities_standard_set() {
        assert_eq!(
            decode_entities("&lt;b&gt; &quot;x&quot; &#39;y&#39; &amp;amp;"),
            "<b> \"x\" 'y' &amp;"
        );
    }

    #[test]
    fn test_decode_entities_falls_back_on_unknown_entity() {
        assert_eq!(decode_entities("a&hellip;b &amp; c"), "a&hellip;b & c");
    }

    #[test]
    fn test_strip_markup_collapses_whitespace() {
        assert_eq!(
            strip_markup("  <p>New <b>single</b></p>\n<p>out now</p> "),
            "New single out now"
        );
    }

    #[test]
    fn test_decode_entities_maps_nbsp_to_space() {
        assert_eq!(decode_entities("a&nbsp;b &amp; c"), "a b & c");
        assert_eq!(decode_entities("x&nbsp;&hellip;"), "x &hellip;");
    }

    #[test]
    fn test_strip_markup_keeps_non_tag_angle_brackets() {
        assert_eq!(strip_markup("we <3 fans > all"), "we <3 fans > all");
        assert_eq!(strip_markup("a<!-- note -->b<br/>c"), "a b c");
    }

    #[test]
    fn test_text_content_keeps_escaped_text_literal() {
        assert_eq!(text_content("OSIAH &lt;3 fans &gt;"), "OSIAH <3 fans >");
        assert_eq!(text_content("<b>Tour</b> &amp; merch"), "Tour & merch");
    }

    #[test]
    fn test_text_content_strips_double_escaped_html() {
        let inner = "&lt;a href=\"https://k.example/x\"&gt;OSIAH tease new single&lt;/a&gt;&amp;nbsp;&amp;nbsp;&lt;font color=\"#6f6f6f\"&gt;Kerrang!&lt;/font&gt;";
        assert_eq!(text_content(inner), "OSIAH tease new single Kerrang!");
    }

    #[test]
    fn test_first_tag_inner_leaves_entities_encoded() {
        let unit = "<title>Fans &lt;3</title>";
        assert_eq!(first_tag_inner(unit, &["title"]), "Fans &lt;3");
        assert_eq!(first_tag_text(unit, &["title"]), "Fans <3");
    }
}

//! Markdown-like message text to display-safe HTML.

use std::sync::LazyLock;

use regex::Regex;

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("code block pattern"));
static FORMATTED_PARAGRAPHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:<p>[^<>*_`]*</p>)+$").expect("paragraph pattern"));
static LANGUAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_+#-]+)\n").expect("language tag pattern"));
static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\* (.+)$").expect("bullet pattern"));
static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\. (.+)$").expect("numbered pattern"));
static STRONG_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern"));
static STRONG_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.*?)__").expect("bold pattern"));
static EM_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern"));
static EM_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(.*?)_").expect("italic pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    fn tag(&self) -> &'static str {
        match self {
            ListKind::Bullet => "ul",
            ListKind::Numbered => "ol",
        }
    }
}

/// Formats raw message text as HTML.
///
/// Input is escaped first, so every tag in the result was produced here.
/// Paragraph wrapping only happens when no `<pre>`, `<ul>` or `<ol>` was
/// emitted. Plain paragraphs this function produced are returned as is, so
/// formatting them again is a no-op.
pub fn format_message(content: &str) -> String {
    if FORMATTED_PARAGRAPHS.is_match(content) {
        return content.to_string();
    }

    let escaped = escape_html(&normalize_line_breaks(content));

    let mut formatted = String::new();
    let mut has_blocks = false;
    let mut last_end = 0;

    for captures in CODE_BLOCK.captures_iter(&escaped) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        let text = escaped[last_end..whole.start()].trim_matches('\n');
        if !text.is_empty() {
            formatted.push_str(&format_text(text, &mut has_blocks));
        }

        formatted.push_str(&format_code_block(inner.as_str()));
        has_blocks = true;
        last_end = whole.end();
    }

    let text = escaped[last_end..].trim_matches('\n');
    if !text.is_empty() {
        formatted.push_str(&format_text(text, &mut has_blocks));
    }

    if has_blocks {
        return formatted;
    }

    formatted
        .split("<br><br>")
        .map(|paragraph| paragraph.replace("<br>", " ").trim().to_string())
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| format!("<p>{}</p>", paragraph))
        .collect()
}

/// The trailing citation line, if there is anything to cite.
pub fn format_sources(sources: &[String]) -> Option<String> {
    if sources.is_empty() {
        return None;
    }
    Some(escape_html(&format!("Sources: {}", sources.join(", "))))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// A language tag only counts when it sits on the opening fence line.
fn format_code_block(inner: &str) -> String {
    let tagged = LANGUAGE_TAG
        .captures(inner)
        .and_then(|captures| Some((captures.get(0)?, captures.get(1)?)));

    let (language, code) = match tagged {
        Some((whole, language)) => (Some(language.as_str()), &inner[whole.end()..]),
        None => (None, inner.strip_prefix('\n').unwrap_or(inner)),
    };
    let code = code.strip_suffix('\n').unwrap_or(code);

    match language {
        Some(language) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            language, code
        ),
        None => format!("<pre><code>{}</code></pre>", code),
    }
}

fn list_item(line: &str) -> Option<(ListKind, &str)> {
    if let Some(item) = BULLET_ITEM.captures(line).and_then(|c| c.get(1)) {
        return Some((ListKind::Bullet, item.as_str()));
    }
    NUMBERED_ITEM
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|item| (ListKind::Numbered, item.as_str()))
}

/// Groups list lines, joins the rest with `<br>`, then applies emphasis.
fn format_text(text: &str, has_blocks: &mut bool) -> String {
    let mut out = String::new();
    let mut list: Option<(ListKind, Vec<&str>)> = None;
    let mut after_inline = false;

    for line in text.split('\n') {
        match list_item(line) {
            Some((kind, item)) => {
                let same_kind = matches!(&list, Some((current, _)) if *current == kind);
                if let (true, Some((_, items))) = (same_kind, list.as_mut()) {
                    items.push(item);
                } else {
                    flush_list(&mut out, list.take(), has_blocks);
                    list = Some((kind, vec![item]));
                    after_inline = false;
                }
            }
            None => {
                if list.is_some() {
                    flush_list(&mut out, list.take(), has_blocks);
                    after_inline = false;
                }
                if after_inline {
                    out.push_str("<br>");
                }
                out.push_str(line);
                after_inline = true;
            }
        }
    }
    flush_list(&mut out, list, has_blocks);

    apply_emphasis(&out)
}

fn flush_list(out: &mut String, list: Option<(ListKind, Vec<&str>)>, has_blocks: &mut bool) {
    let Some((kind, items)) = list else {
        return;
    };

    out.push_str(&format!("<{}>", kind.tag()));
    for item in items {
        out.push_str(&format!("<li>{}</li>", item));
    }
    out.push_str(&format!("</{}>", kind.tag()));
    *has_blocks = true;
}

fn apply_emphasis(text: &str) -> String {
    let text = STRONG_STARS.replace_all(text, "<strong>${1}</strong>");
    let text = STRONG_UNDERSCORES.replace_all(&text, "<strong>${1}</strong>");
    let text = EM_STARS.replace_all(&text, "<em>${1}</em>");
    EM_UNDERSCORES.replace_all(&text, "<em>${1}</em>").into_owned()
}

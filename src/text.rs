//! Tutor replies mix light markdown with math notation. This turns a reply
//! into HTML with the math spans marked for a typesetter to pick up.

use crate::service::{ChatMessage, Role};
use once_cell::sync::Lazy;
use regex::Regex;

static DELIMITED_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$([\s\S]*?)\$\$|\$([^$]+)\$").expect("valid math regex"));

static BARE_LATEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:\\(?:sqrt|frac|int|sum|prod|lim|alpha|beta|gamma|delta|theta|pi|infty|partial|nabla",
        r"|cdot|times|div|pm|mp|leq|geq|neq|approx|equiv|subset|supset|cup|cap|in|notin|forall",
        r"|exists|rightarrow|leftarrow|Rightarrow|Leftarrow|ldots|cdots|vdots|ddots)",
        r"(?:\{[^}]*\}|\[[^\]]*\]|[_^][^{}\s]|\s)*)+",
    ))
    .expect("valid latex regex")
});

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("valid italic regex"));
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid code regex"));

pub fn render_math_text(input: &str) -> String {
    let escaped = escape_html(input);
    let mut out = String::with_capacity(escaped.len());
    let mut last = 0;

    for caps in DELIMITED_MATH.captures_iter(&escaped) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&render_prose(&escaped[last..whole.start()]));
        if let Some(block) = caps.get(1) {
            out.push_str(&format!(
                "<div class=\"math-block\">{}</div>",
                block.as_str().trim()
            ));
        } else if let Some(inline) = caps.get(2) {
            out.push_str(&math_span(inline.as_str().trim()));
        }
        last = whole.end();
    }
    out.push_str(&render_prose(&escaped[last..]));
    out
}

/// Text outside `$` delimiters: wrap bare LaTeX commands, format the rest.
fn render_prose(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for found in BARE_LATEX.find_iter(text) {
        out.push_str(&render_markdown(&text[last..found.start()]));
        let latex = found.as_str();
        let trimmed = latex.trim_end();
        out.push_str(&math_span(trimmed));
        out.push_str(&latex[trimmed.len()..]);
        last = found.end();
    }
    out.push_str(&render_markdown(&text[last..]));
    out
}

fn render_markdown(text: &str) -> String {
    let text = BOLD.replace_all(text, "<strong>$1</strong>");
    let text = ITALIC.replace_all(&text, "<em>$1</em>");
    CODE.replace_all(&text, "<code>$1</code>").into_owned()
}

/// Standalone HTML page with one block per message.
pub fn transcript_html(messages: &[ChatMessage]) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Tutor session</title></head><body>\n",
    );
    for message in messages {
        let (class, who) = match message.role {
            Role::Assistant => ("ai", "Socratic Tutor"),
            Role::User => ("user", "You"),
        };
        out.push_str(&format!(
            "<div class=\"message {class}\"><b>{who}</b><p class=\"math-text\">{}</p></div>\n",
            render_math_text(&message.content)
        ));
    }
    out.push_str("</body></html>\n");
    out
}

fn math_span(latex: &str) -> String {
    format!("<span class=\"math\">{latex}</span>")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

//! Speech text sanitizer.
//!
//! Generated replies are markdown. Providers should only ever be asked to
//! pronounce plain prose, so every fragment passes through [`speech_text`]
//! before it is registered.

use super::chunking::collapse_whitespace;

/// Strip markdown formatting from a fragment, producing plain text for TTS.
///
/// Handles:
/// - Code fence lines (```` ``` ````) → removed
/// - Inline code (`` `…` ``) → unwrapped
/// - Headers, blockquotes and list markers → text only
/// - Bold / italic / strikethrough markers → removed
/// - Links `[text](url)` → text only
/// - Images `![alt](url)` → "image: alt"
/// - HTML tags → removed
/// - Horizontal rules → removed
#[must_use]
pub fn speech_text(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());

    for line in fragment.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || is_horizontal_rule(trimmed) {
            continue;
        }
        let plain = strip_line(trimmed);
        if !plain.trim().is_empty() {
            out.push(' ');
            out.push_str(&plain);
        }
    }

    collapse_whitespace(&out)
}

/// Whether a fragment contains anything worth sending to a provider.
#[must_use]
pub fn is_speakable(fragment: &str) -> bool {
    speech_text(fragment).chars().any(char::is_alphanumeric)
}

fn is_horizontal_rule(line: &str) -> bool {
    let mut marks = line.chars().filter(|c| !c.is_whitespace());
    match marks.next() {
        Some(first @ ('-' | '*' | '_')) => {
            let rest: Vec<char> = marks.collect();
            rest.len() >= 2 && rest.iter().all(|&c| c == first)
        }
        _ => false,
    }
}

fn strip_line(line: &str) -> String {
    let mut s = line;
    while let Some(rest) = s.strip_prefix('>') {
        s = rest.trim_start();
    }
    s = s.trim_start_matches('#').trim_start();
    s = strip_list_marker(s);

    let s = strip_images_and_links(s);
    let s = strip_inline_code(&s);
    let s = strip_emphasis(&s);
    strip_html_tags(&s)
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
    {
        return rest;
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &line[digits..];
        if let Some(rest) = after.strip_prefix(". ").or_else(|| after.strip_prefix(") ")) {
            return rest;
        }
    }
    line
}

/// `![alt](url)` → `image: alt`, `[text](url)` → `text`.
fn strip_images_and_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let image = c == '!' && chars.peek() == Some(&'[');
        if image {
            chars.next();
        } else if c != '[' {
            out.push(c);
            continue;
        }

        let label: String = chars.by_ref().take_while(|&c| c != ']').collect();
        if chars.peek() == Some(&'(') {
            chars.by_ref().take_while(|&c| c != ')').for_each(drop);
            if image && !label.is_empty() {
                out.push_str("image: ");
            }
            out.push_str(&label);
        } else {
            if image {
                out.push('!');
            }
            out.push('[');
            out.push_str(&label);
            out.push(']');
        }
    }

    out
}

fn strip_inline_code(text: &str) -> String {
    text.replace('`', "")
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "")
        .replace("__", "")
        .replace("~~", "")
        .replace('*', "")
}

fn strip_html_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;

    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_emphasis_and_code() {
        assert_eq!(
            speech_text("**Hello** world! This is *italic* and `code`."),
            "Hello world! This is italic and code."
        );
    }

    #[test]
    fn unwraps_links_and_describes_images() {
        assert_eq!(
            speech_text("Check [this link](https://example.com) and ![a cat](cat.png)."),
            "Check this link and image: a cat."
        );
    }

    #[test]
    fn strips_block_markers() {
        assert_eq!(speech_text("## Header"), "Header");
        assert_eq!(speech_text("> quoted text."), "quoted text.");
        assert_eq!(speech_text("- First\n2. Second"), "First Second");
    }

    #[test]
    fn drops_fences_rules_and_tags() {
        assert_eq!(speech_text("Above.\n---\nBelow."), "Above. Below.");
        assert_eq!(speech_text("```rust\nSee <b>this</b>."), "See this.");
    }

    #[test]
    fn unmatched_brackets_survive() {
        assert_eq!(speech_text("an [aside] here"), "an [aside] here");
    }

    #[test]
    fn speakable_requires_letters_or_digits() {
        assert!(is_speakable("Hi."));
        assert!(!is_speakable("**"));
        assert!(!is_speakable("```"));
        assert!(!is_speakable("---"));
    }
}

//! Small HTML helpers shared by the collector and the renderer.

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Drops anything that looks like a tag. Unterminated tags are dropped to the end.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match (in_tag, c) {
            (false, '<') => in_tag = true,
            (true, '>') => in_tag = false,
            (false, _) => out.push(c),
            (true, _) => {}
        }
    }
    out
}

/// Collapses whitespace runs to one space, drops whitespace between `>` and `<`
/// and trims both ends.
pub fn minify_html(html: &str) -> String {
    let mut collapsed = String::with_capacity(html.len());
    let mut pending_space = false;
    for c in html.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            let prev_is_gt = collapsed.ends_with('>');
            let between_tags = prev_is_gt && c == '<';
            if !collapsed.is_empty() && !between_tags {
                collapsed.push(' ');
            }
            pending_space = false;
        }
        collapsed.push(c);
    }
    collapsed
}

//! Minimal HTML to Markdown conversion for Confluence storage bodies.
//!
//! Covers the elements Confluence actually emits for prose pages:
//! headings, paragraphs, lists, code blocks, emphasis, and links.
//! Unknown elements are transparent; their children are still
//! rendered. Scripts and styles are dropped.

use scraper::{ElementRef, Html};

/// Convert an HTML fragment to Markdown.
pub fn html_to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render_children(fragment.root_element(), &mut out, 0);
    normalize_blank_lines(&out)
}

fn render_children(element: ElementRef, out: &mut String, list_depth: usize) {
    for child in element.children() {
        match child.value() {
            scraper::node::Node::Text(text) => {
                push_inline_text(out, &text.text);
            }
            scraper::node::Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    render_element(child_element, out, list_depth);
                }
            }
            _ => {}
        }
    }
}

fn render_element(element: ElementRef, out: &mut String, list_depth: usize) {
    let tag = element.value().name();
    match tag {
        "script" | "style" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            end_block(out);
            out.push_str(&"#".repeat(level));
            out.push(' ');
            out.push_str(inline_text(element).trim());
            end_block(out);
        }
        "p" | "div" | "blockquote" => {
            end_block(out);
            if tag == "blockquote" {
                out.push_str("> ");
            }
            render_children(element, out, list_depth);
            end_block(out);
        }
        "ul" | "ol" => {
            let ordered_from = (tag == "ol").then_some(1);
            // A nested list continues its parent item; only top-level
            // lists are separated as blocks.
            if list_depth == 0 {
                end_block(out);
            } else if !out.ends_with('\n') {
                out.push('\n');
            }
            render_list(element, out, list_depth, ordered_from);
            if list_depth == 0 {
                end_block(out);
            }
        }
        "pre" => {
            end_block(out);
            out.push_str("```\n");
            let code: String = element.text().collect();
            out.push_str(code.trim_end_matches('\n'));
            out.push_str("\n```");
            end_block(out);
        }
        "code" => {
            out.push('`');
            out.push_str(&inline_text(element));
            out.push('`');
        }
        "strong" | "b" => {
            out.push_str("**");
            render_children(element, out, list_depth);
            out.push_str("**");
        }
        "em" | "i" => {
            out.push('*');
            render_children(element, out, list_depth);
            out.push('*');
        }
        "a" => {
            let text = inline_text(element);
            match element.value().attr("href") {
                Some(href) if !href.is_empty() => {
                    out.push('[');
                    out.push_str(text.trim());
                    out.push_str("](");
                    out.push_str(href);
                    out.push(')');
                }
                _ => out.push_str(&text),
            }
        }
        "br" => out.push('\n'),
        _ => render_children(element, out, list_depth),
    }
}

fn render_list(element: ElementRef, out: &mut String, list_depth: usize, ordered_from: Option<usize>) {
    let mut counter = ordered_from;
    for child in element.children() {
        let Some(item) = ElementRef::wrap(child) else {
            continue;
        };
        if item.value().name() != "li" {
            continue;
        }

        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&"  ".repeat(list_depth));
        match counter {
            Some(n) => {
                out.push_str(&format!("{n}. "));
                counter = Some(n + 1);
            }
            None => out.push_str("- "),
        }
        render_children(item, out, list_depth + 1);
    }
}

/// Flattened text of an element with whitespace runs collapsed.
fn inline_text(element: ElementRef) -> String {
    let raw: String = element.text().collect();
    collapse_whitespace(&raw)
}

fn push_inline_text(out: &mut String, text: &str) {
    let collapsed = collapse_whitespace(text);
    if collapsed.trim().is_empty() {
        return;
    }
    // Inter-element whitespace matters between inline runs.
    if collapsed.starts_with(' ') && !out.is_empty() && !out.ends_with([' ', '\n']) {
        out.push(' ');
    }
    out.push_str(collapsed.trim());
    if collapsed.ends_with(' ') {
        out.push(' ');
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                result.push(' ');
            }
            in_whitespace = true;
        } else {
            result.push(c);
            in_whitespace = false;
        }
    }
    result
}

fn end_block(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with("\n\n") {
        while out.ends_with('\n') {
            out.pop();
        }
        out.push_str("\n\n");
    }
}

/// Trim the output and cap runs of blank lines at one.
fn normalize_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_pending = false;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_pending = !lines.is_empty();
        } else {
            if blank_pending {
                lines.push("");
                blank_pending = false;
            }
            lines.push(line.trim_end());
        }
    }
    let mut result = lines.join("\n");
    if !result.is_empty() {
        result.push('\n');
    }
    result
}

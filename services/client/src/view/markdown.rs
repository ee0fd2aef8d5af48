//! Markdown → plain terminal lines.
//!
//! Bot answers arrive as markdown (bullet lists, bold, code). The terminal
//! transcript shows them as indented plain text with bullets kept.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

pub fn markdown_to_lines(md: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    // One entry per open list: `Some(n)` is the next number of an ordered list.
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut in_code_block = false;

    for event in Parser::new(md) {
        match event {
            // ── Headings ─────────────────────────────────────────
            Event::Start(Tag::Heading { .. }) => flush(&mut current, &mut lines),
            Event::End(TagEnd::Heading(_)) => {
                let width = current.chars().count();
                flush(&mut current, &mut lines);
                lines.push("─".repeat(width.max(3)));
            }

            // ── Code ─────────────────────────────────────────────
            Event::Code(code) => {
                current.push('`');
                current.push_str(&code);
                current.push('`');
            }
            Event::Start(Tag::CodeBlock(_)) => {
                flush(&mut current, &mut lines);
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                lines.push(String::new());
            }

            // ── Lists ────────────────────────────────────────────
            Event::Start(Tag::List(start)) => {
                flush(&mut current, &mut lines);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    lines.push(String::new());
                }
            }
            Event::Start(Tag::Item) => {
                flush(&mut current, &mut lines);
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                let bullet = match lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{n}. ");
                        *n += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                current.push_str(&indent);
                current.push_str(&bullet);
            }
            Event::End(TagEnd::Item) => flush(&mut current, &mut lines),

            // ── Paragraphs & text ────────────────────────────────
            Event::End(TagEnd::Paragraph) => {
                flush(&mut current, &mut lines);
                if lists.is_empty() {
                    lines.push(String::new());
                }
            }
            Event::Text(text) => {
                if in_code_block {
                    for line in text.lines() {
                        lines.push(format!("    {line}"));
                    }
                } else {
                    current.push_str(&text);
                }
            }
            Event::SoftBreak => current.push(' '),
            Event::HardBreak => flush(&mut current, &mut lines),
            Event::Rule => {
                flush(&mut current, &mut lines);
                lines.push("─".repeat(20));
            }
            _ => {}
        }
    }

    flush(&mut current, &mut lines);
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn flush(current: &mut String, lines: &mut Vec<String>) {
    if !current.trim().is_empty() {
        lines.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

//! services/client/src/app/export.rs
//!
//! Plain-text transcript export, generated entirely on the client.

use chrono::{DateTime, Utc};
use docchat_core::domain::{Message, Role};
use std::fmt::Write;

const RULE: &str = "==================================================";
pub const BANNER_TITLE: &str = "DocChat transcript";
pub const FOOTER: &str = "End of transcript";

fn role_prefix(role: Role) -> &'static str {
    match role {
        Role::User => "[You]",
        Role::Bot => "[Assistant]",
        Role::System => "[System]",
    }
}

pub fn render_transcript(title: &str, messages: &[Message], exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, " {BANNER_TITLE}");
    let _ = writeln!(out, " Thread: {title}");
    let _ = writeln!(
        out,
        " Exported: {}",
        exported_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "{RULE}");
    out.push('\n');

    for message in messages {
        let _ = writeln!(out, "{} {}", role_prefix(message.role), message.text.trim_end());
        if !message.citations.is_empty() {
            let labels: Vec<String> = message.citations.iter().map(|c| c.label()).collect();
            let _ = writeln!(out, "    Sources: {}", labels.join(", "));
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, " {FOOTER}");
    let _ = writeln!(out, "{RULE}");
    out
}

/// `docchat-<title>-<YYYYmmdd-HHMMSS>.txt`, with the title reduced to a file-safe slug.
pub fn export_file_name(title: &str, exported_at: DateTime<Utc>) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "chat" } else { slug };
    format!("docchat-{}-{}.txt", slug, exported_at.format("%Y%m%d-%H%M%S"))
}

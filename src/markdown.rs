//! Markdown rendering of cards for terminal output.

use crate::model::{ArticleCard, Topic};

/// Escape characters that break Markdown link syntax: `[`, `]`, `(`, `)`.
pub(crate) fn escape_md_link(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '[' | ']' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Sanitize model output for embedding in a Markdown heading.
/// Replaces newlines (which would break heading structure) with spaces.
pub(crate) fn sanitize_heading(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// One list entry per card: title, topic, teaser and id.
pub fn card_list(cards: &[ArticleCard], empty_note: &str) -> String {
    if cards.is_empty() {
        return format!("({empty_note})\n");
    }
    let mut out = String::new();
    for card in cards {
        let marker = if card.is_read { " " } else { "*" };
        out.push_str(&format!("{marker} **{}**", sanitize_heading(&card.title)));
        if !card.topic_query.is_empty() {
            out.push_str(&format!(" _{}_", sanitize_heading(&card.topic_query)));
        }
        out.push_str(&format!(
            "\n    {}\n    id: `{}`\n",
            sanitize_heading(&card.teaser),
            card.id
        ));
    }
    out
}

/// Full article view with sources.
pub fn article(card: &ArticleCard) -> String {
    let mut out = format!(
        "# {}\n\n_{} · {}_\n\n![]({})\n\n{}\n\n{}\n",
        sanitize_heading(&card.title),
        sanitize_heading(&card.topic_query),
        card.generated_at.format("%Y-%m-%d %H:%M UTC"),
        card.image_url,
        card.teaser,
        card.content
    );
    if !card.sources.is_empty() {
        out.push_str("\n---\n**Sources:**\n");
        for source in &card.sources {
            out.push_str(&format!(
                "- [{}]({})\n",
                escape_md_link(&source.title),
                escape_md_link(&source.uri)
            ));
        }
    }
    out
}

pub fn topic_list(topics: &[Topic]) -> String {
    if topics.is_empty() {
        return "(no topics)\n".to_string();
    }
    topics
        .iter()
        .map(|t| {
            let icon = t.icon.as_deref().map(|i| format!("{i} ")).unwrap_or_default();
            format!("- {icon}{}  `{}`\n", sanitize_heading(&t.query), t.id)
        })
        .collect()
}

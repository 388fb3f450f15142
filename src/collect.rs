use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::{DEFAULT_GRID_DATE_FORMAT, DEFAULT_LIST_DATE_FORMAT, SiteConfig};
use crate::formats::{ChapterId, ChapterPost, PostStatus, StoryContext};
use crate::html::{escape_html, strip_tags};
use crate::source::ChapterSource;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChapterIcon {
    Text(String),
    Symbol(String),
    Default,
}

/// Display-ready chapter, built once per render and never mutated.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Chapter {
    pub id: ChapterId,
    pub link: String,
    pub timestamp: String,
    pub list_date: String,
    pub grid_date: String,
    pub icon: ChapterIcon,
    pub prefix: Option<String>,
    pub title: String,
    pub list_title: Option<String>,
    pub group: Option<String>,
    pub words: u64,
    pub warning: String,
    pub warning_style: String,
    pub password: bool,
}

/// Walks the story's chapter ids in order and keeps the published, visible ones.
pub fn collect_chapters(
    story: &StoryContext,
    source: &dyn ChapterSource,
    config: &SiteConfig,
) -> Vec<Chapter> {
    let mut seen = HashSet::new();
    let mut chapters = Vec::with_capacity(story.chapter_ids.len());

    for &id in &story.chapter_ids {
        if !seen.insert(id) {
            tracing::debug!(
                story_id = story.id,
                chapter_id = id,
                "duplicate chapter id; skipping"
            );
            continue;
        }
        let Some(post) = source.chapter(id) else {
            tracing::debug!(
                story_id = story.id,
                chapter_id = id,
                "chapter not found; skipping"
            );
            continue;
        };
        if post.status != PostStatus::Publish {
            tracing::debug!(
                story_id = story.id,
                chapter_id = id,
                status = ?post.status,
                "chapter not published; skipping"
            );
            continue;
        }
        if post.hidden {
            continue;
        }
        chapters.push(chapter_from_post(post, config));
    }

    tracing::debug!(
        story_id = story.id,
        requested = story.chapter_ids.len(),
        collected = chapters.len(),
        "collected chapters"
    );
    chapters
}

pub fn chapter_from_post(post: &ChapterPost, config: &SiteConfig) -> Chapter {
    let list_date = format_date(
        &post.published_at,
        &config.list_date_format,
        DEFAULT_LIST_DATE_FORMAT,
    );
    let grid_date = format_date(
        &post.published_at,
        &config.grid_date_format,
        DEFAULT_GRID_DATE_FORMAT,
    );
    let title = safe_title(post, &list_date);

    let list_title = non_empty(post.list_title.as_deref())
        .map(|t| escape_html(strip_tags(t).trim()))
        .filter(|t| !t.is_empty() && *t != title);

    let warning_style = match non_empty(post.warning_color.as_deref()) {
        Some(color) => format!("color: {};", color.trim()),
        None => String::new(),
    };

    Chapter {
        id: post.id,
        link: chapter_link(post, config.site_url.as_deref()),
        timestamp: post.published_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        list_date,
        grid_date,
        icon: chapter_icon(post),
        prefix: non_empty(post.prefix.as_deref()).map(str::to_owned),
        title,
        list_title,
        group: non_empty(post.group.as_deref()).map(|g| g.trim().to_owned()),
        words: post.word_count,
        warning: non_empty(post.warning.as_deref()).unwrap_or_default().to_owned(),
        warning_style,
        password: post.password.as_deref().is_some_and(|p| !p.is_empty()),
    }
}

fn safe_title(post: &ChapterPost, list_date: &str) -> String {
    let stripped = strip_tags(&post.title);
    let trimmed = stripped.trim();
    if !trimmed.is_empty() {
        return escape_html(trimmed);
    }
    let time = post.published_at.format("%H:%M");
    escape_html(&format!("{list_date} {time}"))
}

fn chapter_icon(post: &ChapterPost) -> ChapterIcon {
    if let Some(text) = non_empty(post.text_icon.as_deref()) {
        return ChapterIcon::Text(text.trim().to_owned());
    }
    match non_empty(post.icon.as_deref()) {
        Some(icon) if icon.contains("fa-") => ChapterIcon::Symbol(icon.trim().to_owned()),
        _ => ChapterIcon::Default,
    }
}

fn chapter_link(post: &ChapterPost, site_url: Option<&str>) -> String {
    if let Some(permalink) = non_empty(post.permalink.as_deref()) {
        return permalink.trim().to_owned();
    }
    let Some(base) = site_url.and_then(|u| url::Url::parse(u).ok()) else {
        return String::new();
    };
    let joined = match non_empty(post.slug.as_deref()) {
        Some(slug) => base.join(&format!("{}/", slug.trim().trim_matches('/'))),
        None => base.join(&format!("?p={}", post.id)),
    };
    match joined {
        Ok(url) => url.to_string(),
        Err(err) => {
            tracing::debug!(chapter_id = post.id, ?err, "could not build chapter link");
            String::new()
        }
    }
}

/// An invalid `pattern` falls back to `default`.
pub fn format_date(ts: &DateTime<Utc>, pattern: &str, default: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", ts.format(pattern)).is_ok() {
        return out;
    }
    tracing::debug!(pattern, "invalid date format; using default");
    ts.format(default).to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone as _;

    use super::*;

    fn post(id: ChapterId) -> ChapterPost {
        ChapterPost {
            id,
            status: PostStatus::Publish,
            hidden: false,
            title: format!("Chapter {id}"),
            list_title: None,
            icon: None,
            text_icon: None,
            prefix: None,
            group: None,
            word_count: 0,
            warning: None,
            warning_color: None,
            password: None,
            published_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
            permalink: None,
            slug: None,
        }
    }

    fn story(ids: &[ChapterId]) -> StoryContext {
        StoryContext {
            id: 1,
            title: "Story".to_owned(),
            chapter_ids: ids.to_vec(),
            hide_icons: false,
            disable_groups: false,
            disable_folding: false,
        }
    }

    #[test]
    fn skips_hidden_missing_and_unpublished_chapters() {
        let mut hidden = post(2);
        hidden.hidden = true;
        let mut draft = post(4);
        draft.status = PostStatus::Draft;
        let source: HashMap<ChapterId, ChapterPost> =
            HashMap::from([(1, post(1)), (2, hidden), (3, post(3)), (4, draft)]);

        let chapters = collect_chapters(&story(&[1, 2, 3, 4, 5]), &source, &SiteConfig::default());
        let ids = chapters.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn keeps_story_order_and_drops_repeated_ids() {
        let source: HashMap<ChapterId, ChapterPost> =
            HashMap::from([(1, post(1)), (2, post(2)), (3, post(3))]);
        let chapters = collect_chapters(&story(&[3, 1, 3, 2]), &source, &SiteConfig::default());
        let ids = chapters.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn formats_dates_and_timestamp() {
        let chapter = chapter_from_post(&post(1), &SiteConfig::default());
        assert_eq!(chapter.timestamp, "2024-03-09T14:05:00Z");
        assert_eq!(chapter.list_date, "March 9, 2024");
        assert_eq!(chapter.grid_date, "Mar 9, '24");
    }

    #[test]
    fn invalid_grid_format_falls_back_to_default() {
        let config = SiteConfig {
            grid_date_format: "%Q".to_owned(),
            ..SiteConfig::default()
        };
        let chapter = chapter_from_post(&post(1), &config);
        assert_eq!(chapter.grid_date, "Mar 9, '24");
    }

    #[test]
    fn text_icon_beats_symbol_and_bad_symbols_use_default() {
        let mut p = post(1);
        p.icon = Some("fa-solid fa-star".to_owned());
        assert_eq!(
            chapter_from_post(&p, &SiteConfig::default()).icon,
            ChapterIcon::Symbol("fa-solid fa-star".to_owned())
        );

        p.text_icon = Some("EX".to_owned());
        assert_eq!(
            chapter_from_post(&p, &SiteConfig::default()).icon,
            ChapterIcon::Text("EX".to_owned())
        );

        let mut p = post(2);
        p.icon = Some("star".to_owned());
        assert_eq!(chapter_from_post(&p, &SiteConfig::default()).icon, ChapterIcon::Default);
    }

    #[test]
    fn title_is_escaped_and_falls_back_to_date() {
        let mut p = post(1);
        p.title = "<b>Fish</b> & Chips".to_owned();
        assert_eq!(chapter_from_post(&p, &SiteConfig::default()).title, "Fish &amp; Chips");

        p.title = "   ".to_owned();
        assert_eq!(chapter_from_post(&p, &SiteConfig::default()).title, "March 9, 2024 14:05");
    }

    #[test]
    fn list_title_only_kept_when_distinct() {
        let mut p = post(1);
        p.list_title = Some("Chapter 1".to_owned());
        assert_eq!(chapter_from_post(&p, &SiteConfig::default()).list_title, None);

        p.list_title = Some("Ch. 1".to_owned());
        assert_eq!(
            chapter_from_post(&p, &SiteConfig::default()).list_title.as_deref(),
            Some("Ch. 1")
        );
    }

    #[test]
    fn password_and_warning_fields() {
        let mut p = post(1);
        p.password = Some(String::new());
        p.warning = Some("Gore".to_owned());
        let chapter = chapter_from_post(&p, &SiteConfig::default());
        assert!(!chapter.password);
        assert_eq!(chapter.warning, "Gore");
        assert_eq!(chapter.warning_style, "");

        p.password = Some("hunter2".to_owned());
        p.warning_color = Some("#f00".to_owned());
        let chapter = chapter_from_post(&p, &SiteConfig::default());
        assert!(chapter.password);
        assert_eq!(chapter.warning_style, "color: #f00;");
    }

    #[test]
    fn links_prefer_permalink_then_slug_then_id() {
        let config = SiteConfig {
            site_url: Some("https://example.com/".to_owned()),
            ..SiteConfig::default()
        };
        let mut p = post(9);
        assert_eq!(chapter_from_post(&p, &config).link, "https://example.com/?p=9");

        p.slug = Some("the-end".to_owned());
        assert_eq!(chapter_from_post(&p, &config).link, "https://example.com/the-end/");

        p.permalink = Some("https://example.com/chapter/the-end/".to_owned());
        assert_eq!(
            chapter_from_post(&p, &config).link,
            "https://example.com/chapter/the-end/"
        );

        assert_eq!(chapter_from_post(&post(9), &SiteConfig::default()).link, "");
    }
}

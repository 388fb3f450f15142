use chrono::Duration;

use crate::cache::FragmentCache;
use crate::collect::collect_chapters;
use crate::config::SiteConfig;
use crate::folding::FoldingPolicy;
use crate::formats::{StoryContext, StoryId};
use crate::group::{GroupedChapters, assign_groups};
use crate::html::minify_html;
use crate::render::{RenderOptions, render_chapter_list};
use crate::source::ChapterSource;

pub const CACHE_TTL_HOURS: i64 = 24;

pub fn cache_ttl() -> Duration {
    Duration::hours(CACHE_TTL_HOURS)
}

pub fn cache_key(story_id: StoryId) -> String {
    format!("story_chapter_list_html_{story_id}")
}

/// Story flags combined with installation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveFlags {
    pub groups_enabled: bool,
    pub hide_icons: bool,
    pub folding: FoldingPolicy,
    pub checkmarks: bool,
}

impl EffectiveFlags {
    pub fn resolve(story: &StoryContext, config: &SiteConfig) -> Self {
        Self {
            groups_enabled: config.enable_chapter_groups && !story.disable_groups,
            hide_icons: story.hide_icons || config.hide_chapter_icons,
            folding: FoldingPolicy::new(
                !story.disable_folding && !config.disable_chapter_folding,
                config.folding_threshold,
            ),
            checkmarks: config.enable_checkmarks,
        }
    }
}

/// Collects and groups the story's chapters without rendering them.
pub fn group_story_chapters(
    story: &StoryContext,
    source: &dyn ChapterSource,
    config: &SiteConfig,
) -> GroupedChapters {
    let flags = EffectiveFlags::resolve(story, config);
    let chapters = collect_chapters(story, source, config);
    assign_groups(chapters, flags.groups_enabled, &config.unassigned_group_label)
}

/// Uncached pipeline: collect, group, fold, render, minify.
pub fn build_chapter_list(
    story: &StoryContext,
    source: &dyn ChapterSource,
    config: &SiteConfig,
) -> String {
    let flags = EffectiveFlags::resolve(story, config);
    let grouped = group_story_chapters(story, source, config);
    let options = RenderOptions {
        hide_icons: flags.hide_icons,
        checkmarks: flags.checkmarks,
        default_icon: config.default_chapter_icon.clone(),
    };
    let html = render_chapter_list(story.id, &grouped, &flags.folding, &options);
    minify_html(&html)
}

/// Serves the stored fragment when caching is on and an entry is live; otherwise
/// renders and (if caching is on) stores the result. Cache failures are logged and
/// never reach the caller.
pub async fn cached_chapter_list(
    story: &StoryContext,
    source: &dyn ChapterSource,
    config: &SiteConfig,
    cache: &dyn FragmentCache,
) -> String {
    let caching = config.enable_story_chapter_caching;
    let key = cache_key(story.id);

    if caching {
        match cache.get(&key).await {
            Ok(Some(fragment)) => {
                tracing::debug!(story_id = story.id, "chapter list cache hit");
                return fragment;
            }
            Ok(None) => tracing::debug!(story_id = story.id, "chapter list cache miss"),
            Err(err) => {
                tracing::warn!(story_id = story.id, ?err, "chapter list cache read failed");
            }
        }
    }

    let fragment = build_chapter_list(story, source, config);

    if caching && let Err(err) = cache.set(&key, &fragment, cache_ttl()).await {
        tracing::warn!(story_id = story.id, ?err, "chapter list cache write failed");
    }

    fragment
}

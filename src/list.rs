use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::cache::{FragmentCache, InMemoryFragmentCache, LocalFsFragmentCache};
use crate::cli::{InspectArgs, RenderArgs};
use crate::config::SiteConfig;
use crate::folding::{Row, plan_rows};
use crate::formats::StoryId;
use crate::group::ChapterGroup;
use crate::pipeline::{EffectiveFlags, cached_chapter_list, group_story_chapters};
use crate::source::StoryFileSource;

pub async fn render(args: RenderArgs) -> anyhow::Result<()> {
    let config = SiteConfig::load(args.config.as_deref().map(Path::new)).context("load config")?;
    let source = StoryFileSource::load(Path::new(&args.story)).context("load story")?;

    let cache: Box<dyn FragmentCache> = match args.cache_dir.as_deref() {
        Some(dir) => Box::new(LocalFsFragmentCache::new(dir)),
        None => Box::new(InMemoryFragmentCache::new()),
    };

    let story = source.story();
    tracing::info!(
        story_id = story.id,
        chapters = story.chapter_ids.len(),
        caching = config.enable_story_chapter_caching,
        "render chapter list"
    );
    let fragment = cached_chapter_list(story, &source, &config, cache.as_ref()).await;

    match args.out.as_deref() {
        Some(out) => write_output(&PathBuf::from(out), &fragment, args.force)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(fragment.as_bytes())
                .context("write fragment to stdout")?;
            stdout.write_all(b"\n").context("write stdout newline")?;
            stdout.flush().context("flush stdout")?;
        }
    }

    Ok(())
}

pub fn inspect(args: InspectArgs) -> anyhow::Result<()> {
    let config = SiteConfig::load(args.config.as_deref().map(Path::new)).context("load config")?;
    let source = StoryFileSource::load(Path::new(&args.story)).context("load story")?;

    let plan = inspect_plan(&source, &config);
    let json = serde_json::to_string_pretty(&plan).context("serialize chapter plan")?;
    println!("{json}");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ChapterListPlan {
    pub story_id: StoryId,
    pub chapter_count: usize,
    pub groups_enabled: bool,
    pub group_headers: bool,
    pub groups: Vec<GroupPlan>,
}

#[derive(Debug, Serialize)]
pub struct GroupPlan {
    pub key: String,
    pub name: String,
    pub folding_active: bool,
    pub folded_count: usize,
    pub rows: Vec<RowPlan>,
}

#[derive(Debug, Serialize)]
pub struct RowPlan {
    #[serde(flatten)]
    pub row: Row,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

pub fn inspect_plan(source: &StoryFileSource, config: &SiteConfig) -> ChapterListPlan {
    let story = source.story();
    let flags = EffectiveFlags::resolve(story, config);
    let grouped = group_story_chapters(story, source, config);

    ChapterListPlan {
        story_id: story.id,
        chapter_count: grouped.chapter_count(),
        groups_enabled: grouped.groups_enabled,
        group_headers: grouped.has_group_headers(),
        groups: grouped
            .groups
            .iter()
            .map(|group| group_plan(group, &flags))
            .collect(),
    }
}

fn group_plan(group: &ChapterGroup, flags: &EffectiveFlags) -> GroupPlan {
    let count = group.chapters.len();
    let rows = plan_rows(count, &flags.folding)
        .into_iter()
        .map(|row| {
            let chapter = match row {
                Row::Chapter { index, .. } => group.chapters.get(index),
                Row::FoldToggle { .. } => None,
            };
            RowPlan {
                row,
                chapter_id: chapter.map(|c| c.id),
                title: chapter.map(|c| c.title.clone()),
            }
        })
        .collect();

    GroupPlan {
        key: group.key.clone(),
        name: group.name.clone(),
        folding_active: flags.folding.is_active(count),
        folded_count: flags.folding.folded_count(count),
        rows,
    }
}

fn write_output(out_path: &Path, fragment: &str, force: bool) -> anyhow::Result<()> {
    if out_path.exists() && !force {
        anyhow::bail!("fragment output already exists: {}", out_path.display());
    }
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut out = options
        .open(out_path)
        .with_context(|| format!("open fragment output: {}", out_path.display()))?;
    out.write_all(fragment.as_bytes())
        .with_context(|| format!("write fragment: {}", out_path.display()))?;
    out.flush().context("flush fragment")?;

    tracing::info!(out = %out_path.display(), bytes = fragment.len(), "wrote chapter list");
    Ok(())
}

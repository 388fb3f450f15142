use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;

use crate::formats::{ChapterId, ChapterPost, StoryContext, StoryFile};

/// Read-only access to the content store that owns chapter posts.
pub trait ChapterSource {
    fn chapter(&self, id: ChapterId) -> Option<&ChapterPost>;
}

impl ChapterSource for HashMap<ChapterId, ChapterPost> {
    fn chapter(&self, id: ChapterId) -> Option<&ChapterPost> {
        self.get(&id)
    }
}

/// A story and its chapters loaded from a `story.yaml` export.
#[derive(Debug, Clone)]
pub struct StoryFileSource {
    story: StoryContext,
    chapters: HashMap<ChapterId, ChapterPost>,
}

impl StoryFileSource {
    pub fn from_story_file(file: StoryFile) -> Self {
        let mut chapters = HashMap::with_capacity(file.chapters.len());
        for post in file.chapters {
            if let Some(previous) = chapters.insert(post.id, post) {
                tracing::warn!(
                    chapter_id = previous.id,
                    "duplicate chapter id in story file; keeping the last record"
                );
            }
        }
        Self {
            story: file.story,
            chapters,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read story: {}", path.display()))?;
        let file: StoryFile = serde_yaml::from_str(&yaml)
            .with_context(|| format!("parse story: {}", path.display()))?;
        tracing::debug!(
            story_id = file.story.id,
            chapter_ids = file.story.chapter_ids.len(),
            chapter_posts = file.chapters.len(),
            "loaded story file"
        );
        Ok(Self::from_story_file(file))
    }

    pub fn story(&self) -> &StoryContext {
        &self.story
    }
}

impl ChapterSource for StoryFileSource {
    fn chapter(&self, id: ChapterId) -> Option<&ChapterPost> {
        self.chapters.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_duplicate_wins() -> anyhow::Result<()> {
        let file: StoryFile = serde_yaml::from_str(
            "story:\n  id: 1\n  chapter_ids: [5]\nchapters:\n  - id: 5\n    title: Old\n    published_at: 2024-01-01T00:00:00Z\n  - id: 5\n    title: New\n    published_at: 2024-01-01T00:00:00Z\n",
        )?;
        let source = StoryFileSource::from_story_file(file);
        let post = source
            .chapter(5)
            .ok_or_else(|| anyhow::anyhow!("chapter 5 missing"))?;
        assert_eq!(post.title, "New");
        assert!(source.chapter(6).is_none());
        Ok(())
    }
}

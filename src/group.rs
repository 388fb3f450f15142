use std::collections::HashMap;

use serde::Serialize;

use crate::collect::Chapter;

pub const ALL_CHAPTERS_KEY: &str = "all_chapters";
const EMPTY_SLUG_KEY: &str = "unassigned";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChapterGroup {
    pub key: String,
    pub name: String,
    pub chapters: Vec<Chapter>,
}

/// Groups in first-seen order; chapters keep their story order inside each group.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupedChapters {
    pub groups: Vec<ChapterGroup>,
    pub groups_enabled: bool,
}

impl GroupedChapters {
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.chapters.is_empty())
    }

    pub fn chapter_count(&self) -> usize {
        self.groups.iter().map(|g| g.chapters.len()).sum()
    }

    /// Collapsible group sections are only worth it with real groups and more than one of them.
    pub fn has_group_headers(&self) -> bool {
        self.groups_enabled && self.groups.len() > 1
    }
}

pub fn assign_groups(
    chapters: Vec<Chapter>,
    groups_enabled: bool,
    unassigned_label: &str,
) -> GroupedChapters {
    let mut groups: Vec<ChapterGroup> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for chapter in chapters {
        let name = chapter
            .group
            .clone()
            .unwrap_or_else(|| unassigned_label.to_owned());
        let key = if groups_enabled {
            slugify(&name)
        } else {
            ALL_CHAPTERS_KEY.to_owned()
        };

        let idx = *index_by_key.entry(key.clone()).or_insert_with(|| {
            groups.push(ChapterGroup {
                key,
                name,
                chapters: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].chapters.push(chapter);
    }

    tracing::debug!(groups = groups.len(), groups_enabled, "assigned chapter groups");
    GroupedChapters {
        groups,
        groups_enabled,
    }
}

/// Lowercase slug: alphanumerics survive, every other run becomes one `-`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;
    for c in label.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        return EMPTY_SLUG_KEY.to_owned();
    }
    slug
}

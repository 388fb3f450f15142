use serde::Serialize;

/// Rows get `ORDER_BASE - row_position` as their CSS `order`, so the list can be
/// flipped visually without re-querying.
pub const ORDER_BASE: usize = 99_999;

/// Extra chapters beyond `2 * threshold` required before folding kicks in.
pub const FOLDING_MARGIN: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct FoldingPolicy {
    pub enabled: bool,
    pub threshold: usize,
}

impl FoldingPolicy {
    pub fn new(enabled: bool, threshold: usize) -> Self {
        Self {
            enabled,
            threshold: threshold.max(1),
        }
    }

    pub fn is_active(&self, chapter_count: usize) -> bool {
        // Same as `chapter_count >= 2 * threshold + FOLDING_MARGIN` without overflow.
        self.enabled && chapter_count.saturating_sub(FOLDING_MARGIN) / 2 >= self.threshold
    }

    /// Number of chapters hidden behind the toggle; zero when folding is inactive.
    pub fn folded_count(&self, chapter_count: usize) -> usize {
        if self.is_active(chapter_count) {
            chapter_count - self.threshold * 2
        } else {
            0
        }
    }

    /// `position` is the 1-based chapter position inside the group.
    pub fn is_folded(&self, position: usize, chapter_count: usize) -> bool {
        self.is_active(chapter_count)
            && position > self.threshold
            && position <= chapter_count - self.threshold
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum Row {
    /// `index` points into the group's chapter list.
    Chapter {
        index: usize,
        position: usize,
        folded: bool,
        order: usize,
    },
    FoldToggle {
        hidden_count: usize,
        order: usize,
    },
}

impl Row {
    pub fn order(&self) -> usize {
        match self {
            Row::Chapter { order, .. } | Row::FoldToggle { order, .. } => *order,
        }
    }
}

/// Lays out one group: chapter rows with fold flags, plus the toggle row placed
/// right before the first folded chapter.
pub fn plan_rows(chapter_count: usize, policy: &FoldingPolicy) -> Vec<Row> {
    let active = policy.is_active(chapter_count);
    let mut rows = Vec::with_capacity(chapter_count + usize::from(active));
    let mut row_position = 0usize;

    for index in 0..chapter_count {
        let position = index + 1;

        if active && position == policy.threshold + 1 {
            row_position += 1;
            rows.push(Row::FoldToggle {
                hidden_count: policy.folded_count(chapter_count),
                order: ORDER_BASE.saturating_sub(row_position),
            });
        }

        row_position += 1;
        rows.push(Row::Chapter {
            index,
            position,
            folded: policy.is_folded(position, chapter_count),
            order: ORDER_BASE.saturating_sub(row_position),
        });
    }

    rows
}

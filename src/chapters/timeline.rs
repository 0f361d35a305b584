/// Navigation and auto-skip queries over a finalized chapter list
use super::model::{Chapter, ChapterCategory};

/// Read-only view used by a player for chapter navigation
#[derive(Debug, Clone, Default)]
pub struct ChapterTimeline {
    chapters: Vec<Chapter>,
}

impl ChapterTimeline {
    /// Wrap an ordered, non-overlapping list
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Index of the chapter playing at `position`
    pub fn index_at(&self, position: f64) -> Option<usize> {
        let candidate = self
            .chapters
            .partition_point(|c| c.start_time <= position)
            .checked_sub(1)?;
        self.chapters[candidate]
            .contains(position)
            .then_some(candidate)
    }

    pub fn chapter_at(&self, position: f64) -> Option<&Chapter> {
        self.index_at(position).map(|i| &self.chapters[i])
    }

    /// Start of the first chapter beginning after `position`
    pub fn next_chapter_start(&self, position: f64) -> Option<f64> {
        self.chapters
            .iter()
            .map(|c| c.start_time)
            .find(|start| *start > position)
    }

    /// Start of the chapter before the one playing; restarts the current one
    /// when playback is more than `restart_threshold` seconds into it
    pub fn previous_chapter_start(&self, position: f64, restart_threshold: f64) -> Option<f64> {
        let index = match self.index_at(position) {
            Some(index) => index,
            None => {
                return self
                    .chapters
                    .iter()
                    .rev()
                    .map(|c| c.start_time)
                    .find(|start| *start < position)
            }
        };
        let current = &self.chapters[index];
        if position - current.start_time > restart_threshold || index == 0 {
            Some(current.start_time)
        } else {
            Some(self.chapters[index - 1].start_time)
        }
    }

    /// Where playback should jump when `position` falls in an active skip
    /// segment; contiguous skip segments are jumped in one go
    pub fn skip_target(&self, position: f64) -> Option<f64> {
        let mut index = self.index_at(position)?;
        if !self.chapters[index].should_skip() {
            return None;
        }

        let mut target = self.chapters[index].end_time?;
        while let Some(next) = self.chapters.get(index + 1) {
            if !next.should_skip() || next.start_time > target {
                break;
            }
            match next.end_time {
                Some(end) => target = end,
                None => break,
            }
            index += 1;
        }
        Some(target)
    }

    /// Start of the first active highlight marker
    pub fn highlight(&self) -> Option<f64> {
        self.chapters
            .iter()
            .find(|c| c.is_active && c.category == ChapterCategory::POIHighlight)
            .map(|c| c.start_time)
    }

    /// Total seconds an auto-skipping player would jump over
    pub fn skippable_seconds(&self) -> f64 {
        self.chapters
            .iter()
            .filter(|c| c.should_skip())
            .filter_map(|c| c.duration)
            .sum()
    }

    pub fn into_inner(self) -> Vec<Chapter> {
        self.chapters
    }
}

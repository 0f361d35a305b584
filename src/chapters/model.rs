/// Chapter / skip-segment value type and its category taxonomy
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default timestamp jitter (seconds) tolerated between independently produced sources
pub const DEFAULT_TOLERANCE: f64 = 2.0;

/// Where a chapter came from and what a player should do with it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChapterCategory {
    /// Plain chapter from the video description, no skip semantics
    Native,
    Sponsor,
    SelfPromo,
    Interaction,
    Intro,
    Outro,
    Preview,
    MusicOffTopic,
    Filler,
    #[serde(rename = "poi_highlight")]
    POIHighlight,
    /// Titled chapter submitted to the crowd service
    ExternalChapter,
    /// Crowd segment with a category this crate does not know about
    Skip,
    /// Synthetic filler covering an otherwise uncovered span
    Generated,
    /// Soft-deleted marker kept for UI toggling
    Inactive,
}

impl ChapterCategory {
    /// True for everything sourced from the skip-segment service
    pub fn is_external(&self) -> bool {
        !matches!(
            self,
            ChapterCategory::Native | ChapterCategory::Generated | ChapterCategory::Inactive
        )
    }

    /// Categories a player may jump over automatically
    pub fn is_skippable(&self) -> bool {
        self.is_external()
            && !matches!(self, ChapterCategory::ExternalChapter | ChapterCategory::POIHighlight)
    }

    /// Short human label used when a segment carries no title
    pub fn label(&self) -> &'static str {
        match self {
            ChapterCategory::Native => "Chapter",
            ChapterCategory::Sponsor => "Sponsor",
            ChapterCategory::SelfPromo => "Self promotion",
            ChapterCategory::Interaction => "Interaction reminder",
            ChapterCategory::Intro => "Intro",
            ChapterCategory::Outro => "Outro",
            ChapterCategory::Preview => "Preview",
            ChapterCategory::MusicOffTopic => "Non-music section",
            ChapterCategory::Filler => "Filler",
            ChapterCategory::POIHighlight => "Highlight",
            ChapterCategory::ExternalChapter => "Chapter",
            ChapterCategory::Skip => "Skip",
            ChapterCategory::Generated => "",
            ChapterCategory::Inactive => "Inactive",
        }
    }
}

/// A titled or untitled span of a video's timeline.
///
/// `duration` is derived and always follows `end_time - start_time`; use the
/// setters rather than writing `start_time`/`end_time` directly when the
/// value is kept around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    /// Human label, absent for fillers and most skip segments
    pub title: Option<String>,
    /// Seconds from video start
    pub start_time: f64,
    /// Seconds from video start, `None` only before end-time inference
    pub end_time: Option<f64>,
    /// Derived from the bounds, never read back from input
    #[serde(default, skip_deserializing)]
    pub duration: Option<f64>,
    pub category: ChapterCategory,
    /// Inactive chapters keep their slot but are ignored by skip logic
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Chapter {
    /// Create a chapter with explicit bounds
    pub fn new(
        title: Option<String>,
        start_time: f64,
        end_time: Option<f64>,
        category: ChapterCategory,
    ) -> Self {
        let mut chapter = Self {
            title,
            start_time,
            end_time,
            duration: None,
            category,
            is_active: true,
        };
        chapter.refresh_duration();
        chapter
    }

    /// Native description chapter; its end is filled in by inference
    pub fn native(title: impl Into<String>, start_time: f64) -> Self {
        Self::new(Some(title.into()), start_time, None, ChapterCategory::Native)
    }

    /// Skip segment with definite bounds
    pub fn segment(category: ChapterCategory, start_time: f64, end_time: f64) -> Self {
        Self::new(None, start_time, Some(end_time), category)
    }

    /// Synthetic filler covering `[start_time, end_time)`
    pub fn generated(start_time: f64, end_time: f64) -> Self {
        Self::new(None, start_time, Some(end_time), ChapterCategory::Generated)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_end(mut self, end_time: f64) -> Self {
        self.set_end_time(end_time);
        self
    }

    pub fn is_external(&self) -> bool {
        self.category.is_external()
    }

    /// Whether a player should jump over this chapter automatically
    pub fn should_skip(&self) -> bool {
        self.is_active && self.category.is_skippable()
    }

    pub fn set_start_time(&mut self, start_time: f64) {
        self.start_time = start_time;
        self.refresh_duration();
    }

    pub fn set_end_time(&mut self, end_time: f64) {
        self.end_time = Some(end_time);
        self.refresh_duration();
    }

    /// Recompute `duration` from the current bounds
    pub fn refresh_duration(&mut self) {
        self.duration = self.end_time.map(|end| end - self.start_time);
    }

    /// Spans with a known end at or before their start
    pub fn is_degenerate(&self) -> bool {
        matches!(self.end_time, Some(end) if end <= self.start_time)
    }

    /// Check if a playback position falls inside this chapter
    pub fn contains(&self, position: f64) -> bool {
        match self.end_time {
            Some(end) => position >= self.start_time && position < end,
            None => position >= self.start_time,
        }
    }

    /// Disable without removing from the timeline
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Title to show in a chapter list
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.clone(),
            _ => self.category.label().to_string(),
        }
    }
}

/// Order chapters by start time, keeping input order for equal starts
pub fn sort_by_start(chapters: &mut [Chapter]) {
    chapters.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(Ordering::Equal)
    });
}

/// Native chapter as handed over by the metadata collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NativeChapter {
    pub title: String,
    pub start_time: f64,
}

impl NativeChapter {
    pub fn new(title: impl Into<String>, start_time: f64) -> Self {
        Self {
            title: title.into(),
            start_time,
        }
    }
}

impl From<NativeChapter> for Chapter {
    fn from(native: NativeChapter) -> Self {
        Chapter::native(native.title, native.start_time)
    }
}

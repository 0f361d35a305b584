/// Raw skip-segment records as returned by the crowd service
use super::model::{sort_by_start, Chapter, ChapterCategory};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Span given to zero-length highlight points so they survive the merge
pub const HIGHLIGHT_MARKER_SECONDS: f64 = 1.0;

/// One crowd-submitted segment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSegment {
    pub category: String,
    /// `[start, end]` in seconds; extra entries are tolerated
    pub segment: Vec<f64>,
    #[serde(rename = "UUID", default)]
    pub uuid: Option<String>,
    #[serde(rename = "actionType", default)]
    pub action_type: Option<String>,
    #[serde(rename = "videoDuration", default)]
    pub video_duration: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RawSegment {
    pub fn new(category: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            category: category.into(),
            segment: vec![start, end],
            uuid: None,
            action_type: None,
            video_duration: None,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Map the service's category name onto the local taxonomy
    pub fn chapter_category(&self) -> ChapterCategory {
        category_from_str(&self.category)
    }

    /// Convert into a chapter, `None` when the segment has no usable bounds
    pub fn into_chapter(self) -> Option<Chapter> {
        let category = self.chapter_category();
        let start = *self.segment.first()?;
        let end = *self.segment.last()?;
        if !start.is_finite() || !end.is_finite() {
            debug!("Ignoring segment with non-finite bounds: {:?}", self.segment);
            return None;
        }
        let (start, mut end) = if end < start { (end, start) } else { (start, end) };
        if end <= 0.0 && category != ChapterCategory::POIHighlight {
            debug!("Ignoring segment before video start: {:?}", self.segment);
            return None;
        }
        let start = start.max(0.0);
        end = end.max(0.0);
        if category == ChapterCategory::POIHighlight && end - start < HIGHLIGHT_MARKER_SECONDS {
            end = start + HIGHLIGHT_MARKER_SECONDS;
        }
        if end <= start {
            debug!("Ignoring zero-length segment at {:.1}s", start);
            return None;
        }

        let title = match category {
            ChapterCategory::ExternalChapter => self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            _ => None,
        };

        Some(Chapter::new(title, start, Some(end), category))
    }
}

/// Category name used by the crowd service to our enum; unknown names skip generically
pub fn category_from_str(category: &str) -> ChapterCategory {
    match category.trim().to_ascii_lowercase().as_str() {
        "sponsor" => ChapterCategory::Sponsor,
        "selfpromo" => ChapterCategory::SelfPromo,
        "interaction" => ChapterCategory::Interaction,
        "intro" => ChapterCategory::Intro,
        "outro" => ChapterCategory::Outro,
        "preview" => ChapterCategory::Preview,
        "music_offtopic" => ChapterCategory::MusicOffTopic,
        "poi_highlight" => ChapterCategory::POIHighlight,
        "filler" => ChapterCategory::Filler,
        "chapter" => ChapterCategory::ExternalChapter,
        _ => ChapterCategory::Skip,
    }
}

/// Everything the skip-segment collaborator hands back for one video
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SegmentResponse {
    pub segments: Vec<RawSegment>,
    /// Total video duration if the service knows it
    pub video_duration: Option<f64>,
}

impl SegmentResponse {
    /// Build from bare records, picking up a duration reported on any of them
    pub fn from_segments(segments: Vec<RawSegment>) -> Self {
        let video_duration = segments
            .iter()
            .filter_map(|s| s.video_duration)
            .filter(|d| d.is_finite() && *d > 0.0)
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));
        Self {
            segments,
            video_duration,
        }
    }

    /// Decode a JSON array of raw records
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let segments: Vec<RawSegment> = serde_json::from_str(json)?;
        Ok(Self::from_segments(segments))
    }

    /// Chapters ordered by start, unusable records dropped
    pub fn into_chapters(self) -> Vec<Chapter> {
        let mut chapters: Vec<Chapter> = self
            .segments
            .into_iter()
            .filter_map(RawSegment::into_chapter)
            .collect();
        sort_by_start(&mut chapters);
        chapters
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

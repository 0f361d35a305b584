/// Chapter and skip-segment timeline handling
///
/// Native chapters from a video's description and crowd-submitted skip
/// segments are reconciled into one ordered, non-overlapping timeline that a
/// player can use for navigation and auto-skip.

pub mod model;
pub mod inference;
pub mod merge;
pub mod generator;
pub mod staleness;
pub mod segments;
pub mod description;
pub mod timeline;

// Re-export main types
pub use model::{Chapter, ChapterCategory, NativeChapter, DEFAULT_TOLERANCE};
pub use inference::{infer_end_times, InferenceReport};
pub use merge::{
    cleanup_merged_chapters, clamp_to_duration, merge_chapters, pad_to_duration,
    validate_timeline,
};
pub use generator::generate_chapters;
pub use staleness::{RefreshReason, StalenessPolicy, StalenessRecord, MAX_WINDOW_HOURS};
pub use segments::{RawSegment, SegmentResponse};
pub use description::parse_description_chapters;
pub use timeline::ChapterTimeline;

/// Build the finalized timeline for one video from whatever sources exist.
///
/// Native chapters present: infer their ends and merge the segments in.
/// Only segments: scaffold fillers around them, then resolve overlaps
/// between segments. Neither: empty list.
pub fn build_timeline(
    native: Vec<Chapter>,
    external: Vec<Chapter>,
    total_duration: Option<f64>,
    tolerance: f64,
) -> Vec<Chapter> {
    if !native.is_empty() {
        merge_chapters(native, external, total_duration, tolerance)
    } else if !external.is_empty() {
        let mut external = external;
        merge::clamp_to_duration(&mut external, total_duration);
        model::sort_by_start(&mut external);
        let generated = generate_chapters(external, total_duration, tolerance);
        let mut chapters = cleanup_merged_chapters(generated, tolerance);
        merge::pad_to_duration(&mut chapters, total_duration, tolerance);
        chapters
    } else {
        Vec::new()
    }
}

/// feedqueue - chapter and skip-segment engine for a personal video queue
///
/// Reconciles a video's native description chapters with crowd-submitted
/// skip segments into one ordered, non-overlapping timeline, and decides
/// when the skip-segment service is worth asking again.

pub mod chapters;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sources;
pub mod state;

// Re-export main types for easy access
pub use crate::chapters::{
    build_timeline, cleanup_merged_chapters, generate_chapters, infer_end_times, merge_chapters,
    Chapter, ChapterCategory, ChapterTimeline, StalenessPolicy,
};
pub use crate::config::Config;
pub use crate::error::{ChapterError, Result};
pub use crate::pipeline::{ChapterPipeline, ChapterRefresh, PipelineOptions, RefreshOutcome};
pub use crate::sources::{FixtureSource, MetadataSource, SegmentSource, VideoMetadata};
pub use crate::state::{StateManager, VideoRecord};

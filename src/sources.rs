/// Collaborators that feed the chapter pipeline
///
/// Network clients for the feed, metadata and skip-segment services live
/// outside this crate; they plug in through these traits.
use crate::chapters::{parse_description_chapters, NativeChapter, RawSegment, SegmentResponse};
use crate::error::{ChapterError, Result};
use crate::state::validate_video_id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the feed/metadata collaborator knows about a video
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoMetadata {
    pub video_id: String,
    /// Native chapters ordered by start
    pub native_chapters: Vec<NativeChapter>,
    /// Total duration in seconds
    pub duration: Option<f64>,
    pub published_date: Option<DateTime<Utc>>,
}

/// Feed / metadata API client
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata>;
}

/// Crowd skip-segment API client
#[async_trait]
pub trait SegmentSource: Send + Sync {
    async fn fetch_segments(&self, video_id: &str) -> Result<SegmentResponse>;
}

/// One video as stored in a fixture directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoFixture {
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<f64>,
    /// Description text; chapters are parsed from it when `chapters` is empty
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub chapters: Vec<NativeChapter>,
    /// Raw skip-segment records; absent means the service has nothing
    #[serde(default)]
    pub segments: Option<Vec<RawSegment>>,
}

/// Serves metadata and segments from `<dir>/<video_id>.json` fixtures
#[derive(Debug, Clone)]
pub struct FixtureSource {
    dir: PathBuf,
}

impl FixtureSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load(&self, video_id: &str) -> Result<VideoFixture> {
        let path = self.dir.join(format!("{}.json", video_id));
        let content = tokio::fs::read_to_string(&path).await?;
        let fixture = serde_json::from_str(&content)?;
        debug!("📁 Loaded fixture {}", path.display());
        Ok(fixture)
    }
}

#[async_trait]
impl MetadataSource for FixtureSource {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        validate_video_id(video_id)?;
        let fixture = self
            .load(video_id)
            .await
            .map_err(|e| ChapterError::metadata(video_id, e))?;

        let native_chapters = if fixture.chapters.is_empty() {
            fixture
                .description
                .as_deref()
                .map(parse_description_chapters)
                .unwrap_or_default()
        } else {
            fixture.chapters
        };

        Ok(VideoMetadata {
            video_id: video_id.to_string(),
            native_chapters,
            duration: fixture.duration,
            published_date: fixture.published_date,
        })
    }
}

#[async_trait]
impl SegmentSource for FixtureSource {
    async fn fetch_segments(&self, video_id: &str) -> Result<SegmentResponse> {
        validate_video_id(video_id)?;
        let fixture = self
            .load(video_id)
            .await
            .map_err(|e| ChapterError::fetch(video_id, e))?;
        Ok(SegmentResponse::from_segments(fixture.segments.unwrap_or_default()))
    }
}

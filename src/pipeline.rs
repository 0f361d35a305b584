/// Chapter pipeline: staleness check, segment fetch, merge, persist
use crate::chapters::{build_timeline, Chapter, StalenessPolicy};
use crate::config::Config;
use crate::error::{ChapterError, Result};
use crate::sources::{MetadataSource, SegmentSource};
use crate::state::{validate_video_id, StateManager};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Switches for one pipeline instance, taken from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Fetch and merge crowd skip segments
    pub enable_skip_segments: bool,
    /// Use native description chapters
    pub merge_native_chapters: bool,
    /// Boundary tolerance in seconds
    pub tolerance: f64,
    pub staleness: StalenessPolicy,
    /// Batch refresh concurrency
    pub max_concurrent: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enable_skip_segments: config.chapters.enable_skip_segments,
            merge_native_chapters: config.chapters.merge_native_chapters,
            tolerance: config.chapters.tolerance_seconds,
            staleness: config.staleness.policy(),
            max_concurrent: config.performance.max_concurrent_refreshes.max(1),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Where the returned chapters came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Segments were fetched and merged just now
    Fetched,
    /// Segment data was fresh; persisted chapters reused
    Cached,
    /// Skip segments disabled, native chapters only
    NativeOnly,
}

/// Result of refreshing one video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRefresh {
    pub video_id: String,
    pub chapters: Vec<Chapter>,
    pub outcome: RefreshOutcome,
    /// Check stamp written for this refresh, if a fetch was issued
    pub checked_at: Option<DateTime<Utc>>,
}

/// Coordinates collaborators, the merge engine and persisted state
#[derive(Clone)]
pub struct ChapterPipeline {
    options: PipelineOptions,
    metadata: Arc<dyn MetadataSource>,
    segments: Arc<dyn SegmentSource>,
    state: StateManager,
}

impl ChapterPipeline {
    pub fn new(
        options: PipelineOptions,
        metadata: Arc<dyn MetadataSource>,
        segments: Arc<dyn SegmentSource>,
        state: StateManager,
    ) -> Self {
        info!(
            "🔍 Chapter pipeline initialized (skip segments: {}, tolerance: {:.1}s)",
            options.enable_skip_segments, options.tolerance
        );
        Self {
            options,
            metadata,
            segments,
            state,
        }
    }

    /// Build from a loaded configuration, rejecting settings that do not validate
    pub fn from_config(
        config: &Config,
        metadata: Arc<dyn MetadataSource>,
        segments: Arc<dyn SegmentSource>,
        state: StateManager,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ChapterError::Config(e.to_string()))?;
        Ok(Self::new(
            PipelineOptions::from_config(config),
            metadata,
            segments,
            state,
        ))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Refresh chapters for one video using the current time
    pub async fn refresh_chapters(&self, video_id: &str, force: bool) -> Result<ChapterRefresh> {
        self.refresh_chapters_at(video_id, force, Utc::now()).await
    }

    /// Refresh chapters for one video as of `now`.
    ///
    /// On a failed segment fetch the persisted chapters are left as they
    /// were and the error is returned.
    pub async fn refresh_chapters_at(
        &self,
        video_id: &str,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<ChapterRefresh> {
        validate_video_id(video_id)?;
        let metadata = self.metadata.fetch_metadata(video_id).await?;
        self.state
            .update_metadata(video_id, metadata.published_date, metadata.duration)
            .await?;

        let native: Vec<Chapter> = if self.options.merge_native_chapters {
            metadata.native_chapters.into_iter().map(Chapter::from).collect()
        } else {
            Vec::new()
        };
        let tolerance = self.options.tolerance;

        if !self.options.enable_skip_segments {
            debug!("🔕 Skip segments disabled, using native chapters for {}", video_id);
            return Ok(ChapterRefresh {
                video_id: video_id.to_string(),
                chapters: build_timeline(native, Vec::new(), metadata.duration, tolerance),
                outcome: RefreshOutcome::NativeOnly,
                checked_at: None,
            });
        }

        let should_fetch = self
            .state
            .claim_refresh(video_id, force, now, &self.options.staleness)
            .await?;

        if !should_fetch {
            let persisted = self
                .state
                .get_record(video_id)
                .await
                .map(|r| r.chapters)
                .unwrap_or_default();
            let chapters = if persisted.is_empty() {
                build_timeline(native, Vec::new(), metadata.duration, tolerance)
            } else {
                persisted
            };
            return Ok(ChapterRefresh {
                video_id: video_id.to_string(),
                chapters,
                outcome: RefreshOutcome::Cached,
                checked_at: None,
            });
        }

        let response = match self.segments.fetch_segments(video_id).await {
            Ok(response) => response,
            Err(e) => {
                warn!("❌ Failed to fetch skip segments for {}: {}", video_id, e);
                return Err(match e {
                    ChapterError::Fetch { .. } => e,
                    other => ChapterError::fetch(video_id, other),
                });
            }
        };

        let duration = metadata.duration.or(response.video_duration);
        let external = response.into_chapters();
        let segment_count = external.len();
        let chapters = build_timeline(native, external, duration, tolerance);

        if chapters.is_empty() {
            info!("📭 No chapters or segments for {}", video_id);
        } else {
            info!(
                "✅ {} chapters for {} ({} skip segments)",
                chapters.len(),
                video_id,
                segment_count
            );
        }

        self.state
            .store_chapters(video_id, chapters.clone(), duration)
            .await?;

        Ok(ChapterRefresh {
            video_id: video_id.to_string(),
            chapters,
            outcome: RefreshOutcome::Fetched,
            checked_at: Some(now),
        })
    }

    /// Refresh many videos concurrently; results come back in input order
    pub async fn refresh_many(
        &self,
        video_ids: &[String],
        force: bool,
    ) -> Vec<(String, Result<ChapterRefresh>)> {
        let mut results: Vec<(usize, String, Result<ChapterRefresh>)> =
            stream::iter(video_ids.iter().cloned().enumerate())
                .map(|(index, video_id)| async move {
                    let result = self.refresh_chapters(&video_id, force).await;
                    (index, video_id, result)
                })
                .buffer_unordered(self.options.max_concurrent)
                .collect()
                .await;

        results.sort_by_key(|(index, _, _)| *index);

        let failed = results.iter().filter(|(_, _, r)| r.is_err()).count();
        info!(
            "🎉 Refreshed {} videos ({} failed)",
            results.len() - failed,
            failed
        );

        results
            .into_iter()
            .map(|(_, video_id, result)| (video_id, result))
            .collect()
    }
}

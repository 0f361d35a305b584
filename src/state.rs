use crate::chapters::{Chapter, StalenessPolicy, StalenessRecord};
use crate::error::{ChapterError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Persisted state for a single video
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoRecord {
    /// Video identifier from the feed
    pub video_id: String,

    /// Upload time, if the feed reported one
    pub published_date: Option<DateTime<Utc>>,

    /// Stamped right before a skip segment fetch is issued
    pub last_skip_segment_check: Option<DateTime<Utc>>,

    /// Total video duration in seconds
    pub total_duration: Option<f64>,

    /// Last finalized chapter list
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

impl VideoRecord {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            ..Self::default()
        }
    }

    pub fn staleness(&self) -> StalenessRecord {
        StalenessRecord {
            published_date: self.published_date,
            last_skip_segment_check: self.last_skip_segment_check,
        }
    }
}

/// Reject ids that cannot name a state record or fixture file
pub fn validate_video_id(video_id: &str) -> Result<()> {
    let unusable = video_id.trim().is_empty()
        || video_id == "."
        || video_id == ".."
        || video_id.contains(['/', '\\', '\0']);
    if unusable {
        return Err(ChapterError::InvalidInput(format!(
            "unusable video id {:?}",
            video_id
        )));
    }
    Ok(())
}

/// State manager for per-video chapter state
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Base directory for state files
    state_dir: PathBuf,

    /// In-memory state cache (thread-safe)
    state_cache: Arc<RwLock<HashMap<String, VideoRecord>>>,
}

impl StateManager {
    /// Create a new state manager
    pub async fn new(state_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&state_dir).await?;

        let manager = Self {
            state_dir,
            state_cache: Arc::new(RwLock::new(HashMap::new())),
        };

        manager.load_existing_records().await?;

        let cache_len = manager.state_cache.read().await.len();
        info!("📊 State manager initialized with {} cached records", cache_len);

        Ok(manager)
    }

    /// Load existing record files from disk
    async fn load_existing_records(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.state_dir).await?;
        let mut loaded_count = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                match self.load_record_file(&path).await {
                    Ok(record) => {
                        self.state_cache
                            .write()
                            .await
                            .insert(record.video_id.clone(), record);
                        loaded_count += 1;
                    }
                    Err(e) => {
                        warn!("Failed to load state file {}: {}", path.display(), e);
                    }
                }
            }
        }

        debug!("📁 Loaded {} state files from disk", loaded_count);
        Ok(())
    }

    async fn load_record_file(&self, path: &Path) -> Result<VideoRecord> {
        let content = fs::read_to_string(path).await?;
        let mut record: VideoRecord = serde_json::from_str(&content)?;
        for chapter in &mut record.chapters {
            chapter.refresh_duration();
        }
        Ok(record)
    }

    /// Percent-encoded so distinct ids never share a file
    fn record_path(&self, video_id: &str) -> Result<PathBuf> {
        validate_video_id(video_id)?;
        let filename = urlencoding::encode(video_id);
        Ok(self.state_dir.join(format!("{}.json", filename)))
    }

    /// Get a record if one exists
    pub async fn get_record(&self, video_id: &str) -> Option<VideoRecord> {
        self.state_cache.read().await.get(video_id).cloned()
    }

    /// Get or create the record for a video
    pub async fn get_or_create_record(&self, video_id: &str) -> VideoRecord {
        if let Some(record) = self.get_record(video_id).await {
            return record;
        }
        debug!("🆕 New state record for: {}", video_id);
        VideoRecord::new(video_id)
    }

    /// Insert or replace a record, writing it through to disk
    pub async fn upsert_record(&self, record: VideoRecord) -> Result<()> {
        self.save_record_to_disk(&record).await?;
        self.state_cache
            .write()
            .await
            .insert(record.video_id.clone(), record);
        Ok(())
    }

    async fn save_record_to_disk(&self, record: &VideoRecord) -> Result<()> {
        let path = self.record_path(&record.video_id)?;
        let json_content = serde_json::to_string_pretty(record)?;
        fs::write(&path, json_content).await?;
        debug!("💾 Saved state for: {}", record.video_id);
        Ok(())
    }

    /// Record feed metadata that the staleness policy depends on
    pub async fn update_metadata(
        &self,
        video_id: &str,
        published_date: Option<DateTime<Utc>>,
        total_duration: Option<f64>,
    ) -> Result<()> {
        let mut record = self.get_or_create_record(video_id).await;
        let changed = (published_date.is_some() && record.published_date != published_date)
            || (total_duration.is_some() && record.total_duration != total_duration);
        if !changed {
            return Ok(());
        }
        if published_date.is_some() {
            record.published_date = published_date;
        }
        if total_duration.is_some() {
            record.total_duration = total_duration;
        }
        self.upsert_record(record).await
    }

    /// Decide whether skip segments should be fetched now and, if so, stamp
    /// the check time before returning.
    ///
    /// The read and the stamp are separate critical sections; two callers
    /// racing on the same video can both get `true`.
    pub async fn claim_refresh(
        &self,
        video_id: &str,
        force: bool,
        now: DateTime<Utc>,
        policy: &StalenessPolicy,
    ) -> Result<bool> {
        let mut record = self.get_or_create_record(video_id).await;

        let Some(reason) = policy.refresh_reason(&record.staleness(), force, now) else {
            debug!("⏰ Skip segments for {} are fresh", video_id);
            return Ok(false);
        };

        record.last_skip_segment_check = Some(now);
        self.upsert_record(record).await?;
        debug!("🔄 Skip segment refresh for {} ({:?})", video_id, reason);
        Ok(true)
    }

    /// Replace the persisted chapter list for a video
    pub async fn store_chapters(
        &self,
        video_id: &str,
        chapters: Vec<Chapter>,
        total_duration: Option<f64>,
    ) -> Result<()> {
        let mut record = self.get_or_create_record(video_id).await;
        record.chapters = chapters;
        if total_duration.is_some() {
            record.total_duration = total_duration;
        }
        info!("💾 Stored {} chapters for {}", record.chapters.len(), video_id);
        self.upsert_record(record).await
    }

    /// Drop all state for a video
    pub async fn reset_record(&self, video_id: &str) -> Result<bool> {
        let path = self.record_path(video_id)?;
        let removed = self.state_cache.write().await.remove(video_id).is_some();
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        if removed {
            info!("🗑️ Reset state for: {}", video_id);
        }
        Ok(removed)
    }

    /// All records, sorted by video id
    pub async fn list_records(&self) -> Vec<VideoRecord> {
        let mut records: Vec<VideoRecord> =
            self.state_cache.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.video_id.cmp(&b.video_id));
        records
    }

    /// Get state statistics
    pub async fn get_statistics(&self) -> StateManagerStats {
        let cache = self.state_cache.read().await;
        StateManagerStats {
            total_videos: cache.len(),
            videos_with_chapters: cache.values().filter(|r| !r.chapters.is_empty()).count(),
            never_checked: cache
                .values()
                .filter(|r| r.last_skip_segment_check.is_none())
                .count(),
        }
    }
}

/// State manager statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateManagerStats {
    pub total_videos: usize,
    pub videos_with_chapters: usize,
    pub never_checked: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::ChapterCategory;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_claim_refresh_stamps_before_returning() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StateManager::new(temp_dir.path().to_path_buf()).await.unwrap();
        let policy = StalenessPolicy::default();
        let now = Utc::now();

        assert!(manager.claim_refresh("abc", false, now, &policy).await.unwrap());
        let record = manager.get_record("abc").await.unwrap();
        assert_eq!(record.last_skip_segment_check, Some(now));

        // A second caller right after sees the fresh stamp
        let later = now + Duration::minutes(1);
        assert!(!manager.claim_refresh("abc", false, later, &policy).await.unwrap());
        assert!(manager.claim_refresh("abc", true, later, &policy).await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_upload_keeps_refreshing() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StateManager::new(temp_dir.path().to_path_buf()).await.unwrap();
        let policy = StalenessPolicy::default();
        let now = Utc::now();

        manager
            .update_metadata("new", Some(now - Duration::hours(2)), Some(600.0))
            .await
            .unwrap();

        assert!(manager.claim_refresh("new", false, now, &policy).await.unwrap());
        assert!(manager
            .claim_refresh("new", false, now + Duration::minutes(5), &policy)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_records_survive_restart() {
        let temp_dir = TempDir::new().unwrap();
        let chapters = vec![
            Chapter::native("Intro", 0.0).with_end(30.0),
            Chapter::segment(ChapterCategory::Sponsor, 30.0, 60.0),
        ];

        {
            let manager = StateManager::new(temp_dir.path().to_path_buf()).await.unwrap();
            manager
                .store_chapters("video:1", chapters.clone(), Some(60.0))
                .await
                .unwrap();
        }

        let manager = StateManager::new(temp_dir.path().to_path_buf()).await.unwrap();
        let record = manager.get_record("video:1").await.unwrap();
        assert_eq!(record.chapters, chapters);
        assert_eq!(record.total_duration, Some(60.0));
        assert_eq!(record.chapters[1].duration, Some(30.0));

        let stats = manager.get_statistics().await;
        assert_eq!(stats.total_videos, 1);
        assert_eq!(stats.videos_with_chapters, 1);
    }

    #[tokio::test]
    async fn test_reset_record() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StateManager::new(temp_dir.path().to_path_buf()).await.unwrap();
        manager.store_chapters("gone", Vec::new(), None).await.unwrap();

        assert!(manager.reset_record("gone").await.unwrap());
        assert!(manager.get_record("gone").await.is_none());
        assert!(!manager.reset_record("gone").await.unwrap());
        assert!(manager.list_records().await.is_empty());
    }

    #[tokio::test]
    async fn test_similar_ids_keep_separate_files() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StateManager::new(temp_dir.path().to_path_buf()).await.unwrap();
        let chapters = vec![Chapter::segment(ChapterCategory::Sponsor, 0.0, 10.0)];

        manager.store_chapters("video 1", chapters.clone(), None).await.unwrap();
        manager.store_chapters("video_1", chapters, None).await.unwrap();
        assert!(manager.reset_record("video 1").await.unwrap());

        let manager = StateManager::new(temp_dir.path().to_path_buf()).await.unwrap();
        assert!(manager.get_record("video 1").await.is_none());
        assert_eq!(manager.get_record("video_1").await.unwrap().chapters.len(), 1);
    }

    #[tokio::test]
    async fn test_path_like_ids_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let manager = StateManager::new(temp_dir.path().to_path_buf()).await.unwrap();

        for id in ["video/1", "..", "a\\b", ""] {
            let err = manager.store_chapters(id, Vec::new(), None).await.unwrap_err();
            assert!(matches!(err, ChapterError::InvalidInput(_)), "{:?}", id);
        }
        assert!(manager.reset_record("../escape").await.is_err());
        assert!(manager.list_records().await.is_empty());
    }
}

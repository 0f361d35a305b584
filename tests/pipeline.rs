use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use feedqueue::chapters::{ChapterCategory, NativeChapter, RawSegment, SegmentResponse};
use feedqueue::{
    ChapterError, ChapterPipeline, MetadataSource, PipelineOptions, RefreshOutcome, Result,
    SegmentSource, StateManager, VideoMetadata,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

struct FakeFeed {
    videos: HashMap<String, VideoMetadata>,
}

impl FakeFeed {
    fn new(videos: Vec<VideoMetadata>) -> Self {
        Self {
            videos: videos.into_iter().map(|v| (v.video_id.clone(), v)).collect(),
        }
    }
}

#[async_trait]
impl MetadataSource for FakeFeed {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        self.videos
            .get(video_id)
            .cloned()
            .ok_or_else(|| ChapterError::metadata(video_id, "unknown video"))
    }
}

struct FakeSegments {
    segments: Vec<RawSegment>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeSegments {
    fn new(segments: Vec<RawSegment>) -> Arc<Self> {
        Arc::new(Self {
            segments,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentSource for FakeSegments {
    async fn fetch_segments(&self, video_id: &str) -> Result<SegmentResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChapterError::fetch(video_id, "service unavailable"));
        }
        Ok(SegmentResponse::from_segments(self.segments.clone()))
    }
}

fn video(id: &str, published: DateTime<Utc>, chapters: Vec<NativeChapter>) -> VideoMetadata {
    VideoMetadata {
        video_id: id.to_string(),
        native_chapters: chapters,
        duration: Some(300.0),
        published_date: Some(published),
    }
}

fn talk_chapters() -> Vec<NativeChapter> {
    vec![
        NativeChapter::new("Welcome", 0.0),
        NativeChapter::new("Talk", 45.0),
        NativeChapter::new("Questions", 240.0),
    ]
}

async fn setup(
    dir: &TempDir,
    videos: Vec<VideoMetadata>,
    segments: Arc<FakeSegments>,
) -> ChapterPipeline {
    let state = StateManager::new(dir.path().to_path_buf()).await.unwrap();
    ChapterPipeline::new(
        PipelineOptions::default(),
        Arc::new(FakeFeed::new(videos)),
        segments,
        state,
    )
}

#[tokio::test]
async fn test_recent_upload_refreshes_on_every_call() {
    let dir = TempDir::new().unwrap();
    let segments = FakeSegments::new(vec![RawSegment::new("sponsor", 60.0, 90.0)]);
    let pipeline = setup(
        &dir,
        vec![video("fresh", now() - Duration::hours(2), talk_chapters())],
        segments.clone(),
    )
    .await;

    let first = pipeline.refresh_chapters_at("fresh", false, now()).await.unwrap();
    assert_eq!(first.outcome, RefreshOutcome::Fetched);

    let later = now() + Duration::hours(1);
    let second = pipeline.refresh_chapters_at("fresh", false, later).await.unwrap();
    assert_eq!(second.outcome, RefreshOutcome::Fetched);
    assert_eq!(second.checked_at, Some(later));
    assert_eq!(segments.calls(), 2);
}

#[tokio::test]
async fn test_old_video_checked_recently_is_cached_until_expiry() {
    let dir = TempDir::new().unwrap();
    let segments = FakeSegments::new(vec![RawSegment::new("sponsor", 60.0, 90.0)]);
    let pipeline = setup(
        &dir,
        vec![video("old", now() - Duration::days(365), talk_chapters())],
        segments.clone(),
    )
    .await;

    let checked = pipeline
        .refresh_chapters_at("old", false, now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(checked.outcome, RefreshOutcome::Fetched);

    let cached = pipeline.refresh_chapters_at("old", false, now()).await.unwrap();
    assert_eq!(cached.outcome, RefreshOutcome::Cached);
    assert_eq!(cached.chapters, checked.chapters);
    assert_eq!(segments.calls(), 1);

    let expired = pipeline
        .refresh_chapters_at("old", false, now() + Duration::days(4))
        .await
        .unwrap();
    assert_eq!(expired.outcome, RefreshOutcome::Fetched);
    assert_eq!(segments.calls(), 2);
}

#[tokio::test]
async fn test_failed_fetch_keeps_persisted_chapters() {
    let dir = TempDir::new().unwrap();
    let segments = FakeSegments::new(vec![RawSegment::new("sponsor", 60.0, 90.0)]);
    let pipeline = setup(
        &dir,
        vec![video("flaky", now() - Duration::days(30), talk_chapters())],
        segments.clone(),
    )
    .await;

    let stored = pipeline.refresh_chapters_at("flaky", false, now()).await.unwrap();
    assert_eq!(stored.chapters.len(), 5);

    segments.failing.store(true, Ordering::SeqCst);
    let retry_at = now() + Duration::hours(1);
    let err = pipeline
        .refresh_chapters_at("flaky", true, retry_at)
        .await
        .unwrap_err();
    assert!(matches!(err, ChapterError::Fetch { .. }));

    let record = pipeline.state().get_record("flaky").await.unwrap();
    assert_eq!(record.chapters, stored.chapters);
    // The stamp is written before the fetch goes out
    assert_eq!(record.last_skip_segment_check, Some(retry_at));
}

#[tokio::test]
async fn test_unknown_video_is_a_metadata_error() {
    let dir = TempDir::new().unwrap();
    let pipeline = setup(&dir, Vec::new(), FakeSegments::new(Vec::new())).await;

    let err = pipeline.refresh_chapters_at("missing", false, now()).await.unwrap_err();
    assert!(err.is_fetch_failure());
    assert!(pipeline.state().get_record("missing").await.is_none());
}

#[tokio::test]
async fn test_segments_only_video_gets_generated_chapters() {
    let dir = TempDir::new().unwrap();
    let segments = FakeSegments::new(vec![
        RawSegment::new("intro", 0.0, 15.0),
        RawSegment::new("sponsor", 100.0, 130.0),
    ]);
    let pipeline = setup(
        &dir,
        vec![video("bare", now() - Duration::days(10), Vec::new())],
        segments,
    )
    .await;

    let refresh = pipeline.refresh_chapters_at("bare", false, now()).await.unwrap();
    let categories: Vec<ChapterCategory> = refresh.chapters.iter().map(|c| c.category).collect();
    assert_eq!(
        categories,
        vec![
            ChapterCategory::Intro,
            ChapterCategory::Generated,
            ChapterCategory::Sponsor,
            ChapterCategory::Generated,
        ]
    );
    assert_eq!(refresh.chapters.last().unwrap().end_time, Some(300.0));
}

#[test]
fn test_state_survives_pipeline_restart() {
    let dir = TempDir::new().unwrap();
    let segments = FakeSegments::new(vec![RawSegment::new("selfpromo", 250.0, 270.0)]);
    let videos = vec![video("kept", now() - Duration::days(90), talk_chapters())];

    let first = tokio_test::block_on(async {
        let pipeline = setup(&dir, videos.clone(), segments.clone()).await;
        pipeline.refresh_chapters_at("kept", false, now()).await.unwrap()
    });

    let reopened = tokio_test::block_on(async {
        let pipeline = setup(&dir, videos, segments.clone()).await;
        pipeline
            .refresh_chapters_at("kept", false, now() + Duration::hours(2))
            .await
            .unwrap()
    });

    assert_eq!(reopened.outcome, RefreshOutcome::Cached);
    assert_eq!(reopened.chapters, first.chapters);
    assert_eq!(segments.calls(), 1);
}

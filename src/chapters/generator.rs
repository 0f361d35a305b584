/// Gap-filler generation for videos that only have skip segments
use super::model::Chapter;
use tracing::warn;

/// Scaffold `Generated` fillers around start-ordered external chapters.
///
/// Gaps wider than `tolerance` between consecutive chapters (and before the
/// first one) become fillers; a trailing filler pads up to `total_duration`
/// when it is known. Chapters without an end or with no length are skipped,
/// and fillers never start before zero.
pub fn generate_chapters(
    external: Vec<Chapter>,
    total_duration: Option<f64>,
    tolerance: f64,
) -> Vec<Chapter> {
    let mut output = Vec::with_capacity(external.len() * 2 + 1);
    let mut previous_end: f64 = 0.0;

    for mut chapter in external {
        let Some(end) = chapter.end_time else {
            warn!(
                "⚠️ Skipping segment at {:.1}s without end time while generating chapters",
                chapter.start_time
            );
            continue;
        };
        if chapter.is_degenerate() {
            continue;
        }

        if chapter.start_time - previous_end > tolerance {
            output.push(Chapter::generated(previous_end, chapter.start_time));
        }
        chapter.refresh_duration();
        output.push(chapter);
        previous_end = previous_end.max(end);
    }

    if let Some(duration) = total_duration {
        if duration - previous_end > tolerance {
            output.push(Chapter::generated(previous_end, duration));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::model::ChapterCategory;

    #[test]
    fn test_fills_gaps_and_tail() {
        let segments = vec![
            Chapter::segment(ChapterCategory::Sponsor, 10.0, 20.0),
            Chapter::segment(ChapterCategory::SelfPromo, 50.0, 60.0),
        ];

        let chapters = generate_chapters(segments, Some(90.0), 2.0);

        let expected = vec![
            (0.0, 10.0, ChapterCategory::Generated),
            (10.0, 20.0, ChapterCategory::Sponsor),
            (20.0, 50.0, ChapterCategory::Generated),
            (50.0, 60.0, ChapterCategory::SelfPromo),
            (60.0, 90.0, ChapterCategory::Generated),
        ];
        let actual: Vec<_> = chapters
            .iter()
            .map(|c| (c.start_time, c.end_time.unwrap(), c.category))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_small_gaps_are_not_filled() {
        let segments = vec![
            Chapter::segment(ChapterCategory::Intro, 1.0, 20.0),
            Chapter::segment(ChapterCategory::Sponsor, 21.5, 40.0),
        ];

        let chapters = generate_chapters(segments, Some(41.0), 2.0);

        assert_eq!(chapters.len(), 2);
        assert!(chapters.iter().all(|c| c.category != ChapterCategory::Generated));
    }

    #[test]
    fn test_nested_segment_does_not_pull_filler_back() {
        let segments = vec![
            Chapter::segment(ChapterCategory::Sponsor, 10.0, 60.0),
            Chapter::segment(ChapterCategory::Interaction, 20.0, 30.0),
            Chapter::segment(ChapterCategory::Outro, 80.0, 90.0),
            Chapter::segment(ChapterCategory::Sponsor, -4.0, -1.0),
        ];

        let chapters = generate_chapters(segments, Some(90.0), 2.0);

        let fillers: Vec<_> = chapters
            .iter()
            .filter(|c| c.category == ChapterCategory::Generated)
            .map(|c| (c.start_time, c.end_time.unwrap()))
            .collect();
        assert_eq!(fillers, vec![(0.0, 10.0), (60.0, 80.0)]);
    }

    #[test]
    fn test_unknown_duration_has_no_tail() {
        let segments = vec![Chapter::segment(ChapterCategory::Outro, 100.0, 120.0)];
        let chapters = generate_chapters(segments, None, 2.0);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].category, ChapterCategory::Generated);
        assert_eq!(chapters[1].end_time, Some(120.0));
    }

    #[test]
    fn test_open_segments_are_skipped() {
        let open = Chapter::new(None, 30.0, None, ChapterCategory::Sponsor);
        let chapters = generate_chapters(vec![open], Some(60.0), 2.0);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].start_time, 0.0);
        assert_eq!(chapters[0].end_time, Some(60.0));
    }
}

/// End-time inference for native chapters
use super::model::Chapter;
use tracing::{debug, warn};

/// What an inference pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferenceReport {
    /// Entries whose end was taken from the next entry's start
    pub inferred: usize,
    /// A trailing `Generated` filler was appended up to the total duration
    pub filler_appended: bool,
    /// The last entry still has no end (no total duration known)
    pub unresolved_tail: bool,
}

/// Fill in missing end times in place.
///
/// `chapters` must be ordered by start. Every entry but the last takes the next
/// entry's start as its end when it has none. The tail is closed against
/// `total_duration`: an open last entry ends at the duration, and a gap wider
/// than `tolerance` after a closed last entry gets one `Generated` filler.
pub fn infer_end_times(
    chapters: &mut Vec<Chapter>,
    total_duration: Option<f64>,
    tolerance: f64,
) -> InferenceReport {
    let mut report = InferenceReport::default();
    if chapters.is_empty() {
        return report;
    }

    for i in 0..chapters.len() - 1 {
        if chapters[i].end_time.is_none() {
            let next_start = chapters[i + 1].start_time;
            chapters[i].set_end_time(next_start);
            report.inferred += 1;
        }
    }

    let last_index = chapters.len() - 1;
    match (chapters[last_index].end_time, total_duration) {
        (Some(last_end), Some(duration)) if duration - last_end > tolerance => {
            debug!("Padding tail [{:.1}, {:.1}) with generated filler", last_end, duration);
            chapters.push(Chapter::generated(last_end, duration));
            report.filler_appended = true;
        }
        (None, Some(duration)) => {
            let last = &mut chapters[last_index];
            if duration - last.start_time > 0.0 {
                last.set_end_time(duration);
                report.inferred += 1;
            } else {
                warn!(
                    "⚠️ Last chapter starts at {:.1}s, at or beyond video duration {:.1}s",
                    last.start_time, duration
                );
                last.set_end_time(duration);
            }
        }
        (None, None) => {
            warn!(
                "⚠️ Cannot close last chapter at {:.1}s: total duration unknown",
                chapters[last_index].start_time
            );
            report.unresolved_tail = true;
        }
        _ => {}
    }

    report
}

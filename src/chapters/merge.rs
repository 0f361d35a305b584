/// Merge engine: reconciles native chapters with crowd-sourced skip segments
///
/// Both sources carry imprecise timestamps, so boundaries closer than the
/// tolerance are treated as the same boundary. The walk compares every
/// candidate against the last interval already emitted and applies the first
/// matching resolution rule; the result is ordered and non-overlapping.
use super::inference::infer_end_times;
use super::model::{sort_by_start, Chapter};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// How a candidate was reconciled with the previously emitted interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// One side had no end time; candidate appended as-is
    MissingEnd,
    /// Same start, candidate runs longer; candidate starts where last ends
    SameStartTrimCurrent,
    /// Same start, candidate is nested; candidate goes first, last keeps the tail
    SameStartInsertBefore,
    /// Same end; last is cut back to the candidate's start
    SameEnd,
    /// Candidate strictly inside last; last is split around it
    Split,
    /// Overlap or gap, external last wins the border
    BorderFromLast,
    /// Overlap or gap, candidate's start becomes the border
    BorderFromCurrent,
    /// Boundaries already coincide
    NoConflict,
}

/// Append-only output with explicit edits of its tail
#[derive(Debug, Default)]
struct MergeBuffer {
    items: Vec<Chapter>,
}

impl MergeBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    fn last(&self) -> Option<&Chapter> {
        self.items.last()
    }

    fn last_mut(&mut self) -> Option<&mut Chapter> {
        self.items.last_mut()
    }

    fn push(&mut self, chapter: Chapter) {
        self.items.push(chapter);
    }

    fn pop(&mut self) -> Option<Chapter> {
        self.items.pop()
    }

    /// Place `chapter` in front of the current last element, which stays last
    fn insert_before_last(&mut self, chapter: Chapter) {
        let index = self.items.len().saturating_sub(1);
        self.items.insert(index, chapter);
    }

    fn replace_last(&mut self, chapter: Chapter) {
        if let Some(last) = self.items.last_mut() {
            *last = chapter;
        } else {
            self.items.push(chapter);
        }
    }

    fn into_inner(self) -> Vec<Chapter> {
        self.items
    }
}

/// Candidates still to be walked, ordered by start
#[derive(Debug, Default)]
struct Pending {
    queue: VecDeque<Chapter>,
}

impl Pending {
    fn new(chapters: Vec<Chapter>) -> Self {
        Self {
            queue: chapters.into(),
        }
    }

    fn pop(&mut self) -> Option<Chapter> {
        self.queue.pop_front()
    }

    fn next_start(&self) -> Option<f64> {
        self.queue.front().map(|c| c.start_time)
    }

    /// Re-enter a chapter whose start moved forward, after equal starts
    fn requeue(&mut self, chapter: Chapter) {
        let index = self
            .queue
            .partition_point(|c| c.start_time <= chapter.start_time);
        self.queue.insert(index, chapter);
    }
}

/// Emit a piece whose start may have moved past pending candidates
fn emit(output: &mut MergeBuffer, pending: &mut Pending, chapter: Chapter) {
    if chapter.is_degenerate() {
        debug!("Dropping interval trimmed to nothing at {:.1}s", chapter.start_time);
        return;
    }
    match pending.next_start() {
        Some(next_start) if next_start < chapter.start_time => pending.requeue(chapter),
        _ => output.push(chapter),
    }
}

/// Re-check the last emitted piece after its bounds were edited
fn settle_last(output: &mut MergeBuffer, pending: &mut Pending) {
    let needs_settling = match (output.last(), pending.next_start()) {
        (Some(last), _) if last.is_degenerate() => true,
        (Some(last), Some(next_start)) => next_start < last.start_time,
        _ => false,
    };
    if needs_settling {
        if let Some(last) = output.pop() {
            emit(output, pending, last);
        }
    }
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Pick the rule that applies to `current` given the last emitted interval
pub fn classify(last: &Chapter, current: &Chapter, tolerance: f64) -> Resolution {
    let (last_end, current_end) = match (last.end_time, current.end_time) {
        (Some(l), Some(c)) => (l, c),
        _ => return Resolution::MissingEnd,
    };

    let same_start = close(current.start_time, last.start_time, tolerance);
    let same_end = close(current_end, last_end, tolerance);
    let starts_later = current.start_time - last.start_time > tolerance;

    if same_start && !same_end {
        if last_end < current_end {
            Resolution::SameStartTrimCurrent
        } else {
            Resolution::SameStartInsertBefore
        }
    } else if same_end && starts_later {
        Resolution::SameEnd
    } else if starts_later && last_end - current_end > tolerance {
        Resolution::Split
    } else if last_end != current.start_time {
        if last.is_external() {
            Resolution::BorderFromLast
        } else {
            Resolution::BorderFromCurrent
        }
    } else {
        Resolution::NoConflict
    }
}

/// Make neighbours meet exactly; an external chapter keeps its end and the
/// next one is pulled back, otherwise the earlier chapter grows
fn close_gaps(chapters: &mut [Chapter]) {
    for i in 1..chapters.len() {
        let Some(previous_end) = chapters[i - 1].end_time else {
            continue;
        };
        if chapters[i].start_time > previous_end {
            if chapters[i - 1].is_external() {
                chapters[i].set_start_time(previous_end);
            } else {
                let border = chapters[i].start_time;
                chapters[i - 1].set_end_time(border);
            }
        }
    }
}

/// Resolve overlaps in a start-ordered list of native chapters and segments.
///
/// Never fails: intervals without an end are passed through with a warning,
/// and zero-length candidates or spans trimmed to nothing are dropped. A
/// piece whose start is pushed past candidates not yet walked goes back into
/// the walk so the output stays ordered. Gaps left between neighbours are
/// closed and every surviving interval has its duration recomputed.
pub fn cleanup_merged_chapters(chapters: Vec<Chapter>, tolerance: f64) -> Vec<Chapter> {
    let total = chapters.len();
    let candidates: Vec<Chapter> = chapters
        .into_iter()
        .filter(|chapter| !chapter.is_degenerate())
        .collect();
    if candidates.len() != total {
        debug!("Ignoring {} zero-length intervals", total - candidates.len());
    }

    let mut output = MergeBuffer::with_capacity(candidates.len() + 2);
    let mut pending = Pending::new(candidates);

    while let Some(mut current) = pending.pop() {
        let Some(last) = output.last() else {
            output.push(current);
            continue;
        };

        match classify(last, &current, tolerance) {
            Resolution::MissingEnd => {
                warn!(
                    "⚠️ Chapter without end time at {:.1}s during merge; appending unresolved",
                    current.start_time
                );
                output.push(current);
            }
            Resolution::SameStartTrimCurrent | Resolution::BorderFromLast => {
                let border = last.end_time.unwrap_or(current.start_time);
                current.set_start_time(border);
                emit(&mut output, &mut pending, current);
            }
            Resolution::SameStartInsertBefore => {
                let tail_start = current.end_time.unwrap_or(current.start_time);
                if let Some(last) = output.last_mut() {
                    last.set_start_time(tail_start);
                }
                output.insert_before_last(current);
                settle_last(&mut output, &mut pending);
            }
            Resolution::SameEnd => {
                if let Some(last) = output.last_mut() {
                    last.set_end_time(current.start_time);
                }
                settle_last(&mut output, &mut pending);
                output.push(current);
            }
            Resolution::BorderFromCurrent => {
                // Near-duplicates: whatever of `last` outlives `current` stays
                let remainder = match (last.end_time, current.end_time) {
                    (Some(last_end), Some(current_end)) if last_end > current_end => {
                        let mut tail = last.clone();
                        tail.set_start_time(current_end);
                        Some(tail)
                    }
                    _ => None,
                };
                if let Some(last) = output.last_mut() {
                    last.set_end_time(current.start_time);
                }
                settle_last(&mut output, &mut pending);
                output.push(current);
                if let Some(tail) = remainder {
                    emit(&mut output, &mut pending, tail);
                }
            }
            Resolution::Split => {
                let original = last.clone();
                let current_end = current.end_time.unwrap_or(current.start_time);

                let mut head = original.clone();
                head.set_end_time(current.start_time);
                let mut tail = original;
                tail.set_start_time(current_end);

                output.replace_last(head);
                output.push(current);
                emit(&mut output, &mut pending, tail);
            }
            Resolution::NoConflict => output.push(current),
        }
    }

    let mut merged = output.into_inner();
    let before = merged.len();
    merged.retain(|chapter| !chapter.is_degenerate());
    if merged.len() != before {
        debug!("Dropped {} degenerate intervals after merge", before - merged.len());
    }
    close_gaps(&mut merged);
    for chapter in &mut merged {
        chapter.refresh_duration();
    }
    merged
}

/// Keep intervals inside `[0, total_duration]`: spans ending at or before
/// zero or starting at or after the end are dropped, the rest are cut
pub fn clamp_to_duration(chapters: &mut Vec<Chapter>, total_duration: Option<f64>) {
    chapters.retain(|c| !matches!(c.end_time, Some(end) if end <= 0.0));
    if let Some(duration) = total_duration {
        chapters.retain(|c| c.start_time < duration);
    }
    for chapter in chapters.iter_mut() {
        if chapter.start_time < 0.0 {
            chapter.set_start_time(0.0);
        }
        match (chapter.end_time, total_duration) {
            (Some(end), Some(duration)) if end > duration => chapter.set_end_time(duration),
            _ => {}
        }
    }
}

/// Append a `Generated` filler when the timeline stops more than `tolerance`
/// short of the known duration
pub fn pad_to_duration(chapters: &mut Vec<Chapter>, total_duration: Option<f64>, tolerance: f64) {
    let (Some(duration), Some(last_end)) =
        (total_duration, chapters.last().and_then(|c| c.end_time))
    else {
        return;
    };
    if duration - last_end > tolerance {
        debug!("Padding tail [{:.1}, {:.1}) after merge", last_end, duration);
        chapters.push(Chapter::generated(last_end, duration));
    }
}

/// Combine native chapters and external segments into one finalized timeline.
///
/// Native chapters get their end times inferred against `total_duration`
/// first; the concatenation is then sorted by start (natives first on equal
/// starts), cleaned up and padded to the duration.
pub fn merge_chapters(
    native: Vec<Chapter>,
    external: Vec<Chapter>,
    total_duration: Option<f64>,
    tolerance: f64,
) -> Vec<Chapter> {
    let mut native = native;
    sort_by_start(&mut native);
    infer_end_times(&mut native, total_duration, tolerance);

    let mut combined = native;
    combined.extend(external);
    clamp_to_duration(&mut combined, total_duration);
    sort_by_start(&mut combined);

    let mut merged = cleanup_merged_chapters(combined, tolerance);
    pad_to_duration(&mut merged, total_duration, tolerance);
    debug!("Merged timeline has {} chapters", merged.len());
    merged
}

/// Check the finalized-list invariants, returning the first violation found
pub fn validate_timeline(
    chapters: &[Chapter],
    total_duration: Option<f64>,
    tolerance: f64,
) -> Result<(), String> {
    for chapter in chapters {
        if chapter.is_degenerate() {
            return Err(format!(
                "chapter at {:.1}s has non-positive length",
                chapter.start_time
            ));
        }
    }

    for pair in chapters.windows(2) {
        if pair[1].start_time < pair[0].start_time {
            return Err(format!(
                "chapters out of order at {:.1}s / {:.1}s",
                pair[0].start_time, pair[1].start_time
            ));
        }
        if let Some(end) = pair[0].end_time {
            if end > pair[1].start_time + tolerance {
                return Err(format!(
                    "chapter ending at {:.1}s overlaps next start {:.1}s",
                    end, pair[1].start_time
                ));
            }
        }
    }

    if let (Some(duration), Some(last)) = (total_duration, chapters.last()) {
        match last.end_time {
            Some(end) if close(end, duration, tolerance) => {}
            other => {
                return Err(format!(
                    "last chapter ends at {:?}, expected {:.1}s",
                    other, duration
                ))
            }
        }
    }

    Ok(())
}

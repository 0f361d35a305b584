/// Native chapter extraction from a video description's timestamp list
use super::model::NativeChapter;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn timestamp_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // "0:00 Intro", "(1:02:03) - Title", "[12:30] | Title", "Title - 4:05"
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:(?P<pre>.*?)\s*[-–—|:]?\s*)?[\(\[]?(?P<ts>(?:\d{1,2}:)?\d{1,2}:\d{2})[\)\]]?(?P<post>.*)$")
            .expect("timestamp pattern is valid")
    })
}

/// Parse `[H:]MM:SS` into seconds
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let numbers: Option<Vec<u32>> = parts.iter().map(|p| p.parse::<u32>().ok()).collect();
    match numbers?.as_slice() {
        [m, s] if *s < 60 => Some((m * 60 + s) as f64),
        [h, m, s] if *m < 60 && *s < 60 => Some((h * 3600 + m * 60 + s) as f64),
        _ => None,
    }
}

fn clean_title(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| matches!(c, '-' | '–' | '—' | '|' | ':' | '•' | '·'))
        .trim()
        .to_string()
}

/// Extract chapters from description text.
///
/// Returns chapters sorted by start with duplicate starts removed. A text
/// with fewer than two timestamped lines yields nothing.
pub fn parse_description_chapters(description: &str) -> Vec<NativeChapter> {
    let pattern = timestamp_line();
    let mut chapters: Vec<NativeChapter> = Vec::new();

    for line in description.lines() {
        let Some(captures) = pattern.captures(line) else {
            continue;
        };

        let Some(start_time) = parse_timestamp(&captures["ts"]) else {
            continue;
        };

        let after = clean_title(captures.name("post").map_or("", |m| m.as_str()));
        let before = clean_title(captures.name("pre").map_or("", |m| m.as_str()));
        let title = if !after.is_empty() { after } else { before };
        chapters.push(NativeChapter::new(title, start_time));
    }

    if chapters.len() < 2 {
        return Vec::new();
    }

    chapters.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    chapters.dedup_by(|b, a| a.start_time == b.start_time);

    debug!("Extracted {} chapters from description", chapters.len());
    chapters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("0:00"), Some(0.0));
        assert_eq!(parse_timestamp("12:34"), Some(754.0));
        assert_eq!(parse_timestamp("1:02:03"), Some(3723.0));
        assert_eq!(parse_timestamp("1:75"), None);
        assert_eq!(parse_timestamp("abc"), None);
    }

    #[test]
    fn test_extracts_common_layouts() {
        let description = "Thanks for watching!\n\
                           0:00 Intro\n\
                           (1:30) - Setting up the guard\n\
                           [12:05] | Sweeps\n\
                           1:02:03 Q&A\n\
                           Follow me on social media";

        let chapters = parse_description_chapters(description);

        assert_eq!(chapters.len(), 4);
        assert_eq!(chapters[0], NativeChapter::new("Intro", 0.0));
        assert_eq!(chapters[1], NativeChapter::new("Setting up the guard", 90.0));
        assert_eq!(chapters[2], NativeChapter::new("Sweeps", 725.0));
        assert_eq!(chapters[3], NativeChapter::new("Q&A", 3723.0));
    }

    #[test]
    fn test_title_before_timestamp() {
        let description = "Opening - 0:00\nMain topic - 4:05";
        let chapters = parse_description_chapters(description);
        assert_eq!(chapters[0].title, "Opening");
        assert_eq!(chapters[1].start_time, 245.0);
    }

    #[test]
    fn test_single_timestamp_is_not_a_chapter_list() {
        assert!(parse_description_chapters("The best part is at 3:15 so skip ahead").is_empty());
    }

    #[test]
    fn test_duplicates_and_order() {
        let description = "5:00 Later\n0:00 Start\n5:00 Duplicate";
        let chapters = parse_description_chapters(description);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Start");
        assert_eq!(chapters[1].title, "Later");
    }
}

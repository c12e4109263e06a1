use crate::error::{ClipsmithError, Result};
use crate::transcript::{validate_words, Word};
use tracing::debug;

/// Shortest span worth turning into a clip.
pub const DEFAULT_MIN_DURATION: f64 = 15.0;
/// Span at which a window is closed and emitted.
pub const DEFAULT_MAX_DURATION: f64 = 60.0;
/// Resource cap on clips per run, earliest windows win.
pub const DEFAULT_MAX_WINDOWS: usize = 5;

/// Duration bounds and cap for highlight segmentation.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Minimum window duration in seconds.
    pub min_duration: f64,
    /// Duration at which the current window is emitted and a new one starts.
    pub max_duration: f64,
    /// Maximum number of windows returned (earliest first, no scoring).
    pub max_windows: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            max_windows: DEFAULT_MAX_WINDOWS,
        }
    }
}

impl SegmentConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_duration.is_finite() || self.min_duration <= 0.0 {
            return Err(ClipsmithError::Config(format!(
                "min_duration must be positive, got {}",
                self.min_duration
            )));
        }
        if !self.max_duration.is_finite() || self.max_duration < self.min_duration {
            return Err(ClipsmithError::Config(format!(
                "max_duration ({}) must be >= min_duration ({})",
                self.max_duration, self.min_duration
            )));
        }
        if self.max_windows == 0 {
            return Err(ClipsmithError::Config(
                "max_windows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A contiguous speech-dense span of the source, ready for composition.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightWindow {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl HighlightWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Where the next window starts.
///
/// `Awaiting` means the previous window closed on a word with no usable
/// `start`; the next word carrying both timestamps becomes the anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Seed {
    Awaiting,
    At(f64),
}

/// Split a word stream into highlight windows.
///
/// Single greedy forward pass: words accumulate until the span since the
/// seed reaches `max_duration`, at which point the window is emitted and
/// the triggering word's `start` seeds the next one. Words without an
/// `end` timestamp are skipped outright. A trailing accumulation is kept
/// if it reaches `min_duration`.
///
/// Returns an empty vector for empty input, input with no usable
/// timestamps, or input whose total span never reaches `min_duration`.
pub fn segment(words: &[Word], config: &SegmentConfig) -> Result<Vec<HighlightWindow>> {
    config.validate()?;
    validate_words(words)?;

    let mut windows: Vec<HighlightWindow> = Vec::new();
    let mut accumulated: Vec<&str> = Vec::new();
    let mut seed = Seed::Awaiting;
    let mut last_end: Option<f64> = None;

    for word in words {
        // A word with a start anchors a pending window even when a
        // missing end keeps it out of the accumulator below.
        if seed == Seed::Awaiting {
            if let Some(s) = word.start {
                seed = Seed::At(s);
            }
        }

        let Some(end) = word.end else {
            // No end timestamp: cannot advance the duration, not appended.
            continue;
        };
        let Seed::At(start) = seed else {
            continue;
        };

        accumulated.push(word.text.trim());
        last_end = Some(end);
        let duration = end - start;

        if duration >= config.max_duration {
            if duration >= config.min_duration {
                windows.push(HighlightWindow {
                    start,
                    end,
                    text: accumulated.join(" "),
                });
            }
            accumulated.clear();
            last_end = None;
            seed = match word.start {
                Some(s) => Seed::At(s),
                None => Seed::Awaiting,
            };
        }
    }

    // Trailing accumulation becomes a final window if long enough.
    if !accumulated.is_empty() {
        if let (Seed::At(start), Some(end)) = (seed, last_end) {
            if end - start >= config.min_duration {
                windows.push(HighlightWindow {
                    start,
                    end,
                    text: accumulated.join(" "),
                });
            }
        }
    }

    debug!(
        "Segmenter found {} windows from {} words (cap {})",
        windows.len(),
        words.len(),
        config.max_windows
    );

    windows.truncate(config.max_windows);
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(min: f64, max: f64, cap: usize) -> SegmentConfig {
        SegmentConfig {
            min_duration: min,
            max_duration: max,
            max_windows: cap,
        }
    }

    /// One word every second, each 0.8s long.
    fn steady_words(count: usize) -> Vec<Word> {
        (0..count)
            .map(|i| Word::new(format!("w{i}"), i as f64, i as f64 + 0.8))
            .collect()
    }

    #[test]
    fn test_empty_input_yields_no_windows() {
        let windows = segment(&[], &SegmentConfig::default()).unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_no_usable_timestamps_yields_no_windows() {
        let words: Vec<Word> = (0..10)
            .map(|i| Word {
                text: format!("w{i}"),
                start: None,
                end: None,
            })
            .collect();
        let windows = segment(&words, &SegmentConfig::default()).unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_short_transcript_yields_no_windows() {
        // Total span 9.8s, below the 15s minimum.
        let words = steady_words(10);
        let windows = segment(&words, &SegmentConfig::default()).unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_trailing_window_emitted_when_long_enough() {
        // 20.8s span with default 15/60: no max trigger, one trailing window.
        let words = steady_words(21);
        let windows = segment(&words, &SegmentConfig::default()).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, 0.0);
        assert_eq!(windows[0].end, 20.8);
        assert!(windows[0].text.starts_with("w0 w1"));
        assert!(windows[0].text.ends_with("w20"));
    }

    #[test]
    fn test_max_duration_closes_windows() {
        let words = steady_words(25);
        let windows = segment(&words, &cfg(2.0, 10.0, 10)).unwrap();
        assert!(windows.len() >= 2);
        for w in &windows {
            assert!(w.duration() >= 2.0);
            // Overshoot is bounded by the triggering word's own duration.
            assert!(w.duration() <= 10.0 + 0.8 + f64::EPSILON);
        }
    }

    #[test]
    fn test_windows_increase_strictly_and_own_disjoint_words() {
        let words = steady_words(50);
        let windows = segment(&words, &cfg(2.0, 10.0, 10)).unwrap();
        assert!(windows.len() >= 3);
        for pair in windows.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
        // Each word's text lands in exactly one window.
        let all_text: Vec<&str> = windows.iter().map(|w| w.text.as_str()).collect();
        for i in 0..50 {
            let token = format!("w{i}");
            let owners = all_text
                .iter()
                .filter(|t| t.split(' ').any(|w| w == token))
                .count();
            assert!(owners <= 1, "word {token} appears in {owners} windows");
        }
    }

    #[test]
    fn test_words_without_end_are_skipped() {
        let mut words = steady_words(25);
        // Strip end from a word mid-stream: it must not appear in any text.
        words[5].end = None;
        let windows = segment(&words, &cfg(2.0, 10.0, 10)).unwrap();
        for w in &windows {
            assert!(!w.text.split(' ').any(|t| t == "w5"));
        }
    }

    #[test]
    fn test_triggering_word_start_seeds_next_window() {
        let words = steady_words(25);
        let windows = segment(&words, &cfg(2.0, 10.0, 10)).unwrap();
        // Trigger fires at w10 (end 10.8); w10's start seeds window two.
        assert_eq!(windows[0].end, 10.8);
        assert_eq!(windows[1].start, 10.0);
    }

    #[test]
    fn test_awaiting_seed_when_trigger_lacks_start() {
        // The word that closes the first window has no start; the next
        // fully timestamped word must anchor the second window instead.
        let mut words = steady_words(30);
        words[10].start = None;
        let windows = segment(&words, &cfg(2.0, 10.0, 10)).unwrap();
        assert_eq!(windows[0].end, 10.8);
        assert_eq!(windows[1].start, 11.0);
        // w10 still belongs to the first window's text, nothing is lost.
        assert!(windows[0].text.split(' ').any(|t| t == "w10"));
    }

    #[test]
    fn test_leading_word_without_end_anchors_the_first_window() {
        // The opening word has a start but no end: it seeds the window
        // at 0.0 even though its text never accumulates.
        let mut words = steady_words(25);
        words[0].end = None;
        let windows = segment(&words, &cfg(2.0, 10.0, 10)).unwrap();
        assert_eq!(windows[0].start, 0.0);
        assert!(!windows[0].text.split(' ').any(|t| t == "w0"));
        assert!(windows[0].text.starts_with("w1"));
    }

    #[test]
    fn test_result_truncated_to_max_windows() {
        let words = steady_words(200);
        let capped = segment(&words, &cfg(2.0, 10.0, 3)).unwrap();
        let uncapped = segment(&words, &cfg(2.0, 10.0, 100)).unwrap();
        assert_eq!(capped.len(), 3);
        assert!(uncapped.len() > 3);
        // Truncation keeps the earliest windows.
        assert_eq!(capped[..], uncapped[..3]);
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let words = steady_words(120);
        let a = segment(&words, &SegmentConfig::default()).unwrap();
        let b = segment(&words, &SegmentConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_words_are_fatal() {
        let words = vec![Word::new("a", 5.0, 4.0)];
        assert!(matches!(
            segment(&words, &SegmentConfig::default()),
            Err(ClipsmithError::InvalidTranscript(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let words = steady_words(30);
        assert!(segment(&words, &cfg(0.0, 10.0, 5)).is_err());
        assert!(segment(&words, &cfg(20.0, 10.0, 5)).is_err());
        assert!(segment(&words, &cfg(2.0, 10.0, 0)).is_err());
    }

    #[test]
    fn test_text_joined_with_single_spaces() {
        // Whisper emits words with leading spaces; they must not double up.
        let words = vec![
            Word::new(" hello", 0.0, 1.0),
            Word::new(" there", 1.0, 2.0),
            Word::new(" friend", 2.0, 16.0),
        ];
        let windows = segment(&words, &SegmentConfig::default()).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "hello there friend");
    }
}

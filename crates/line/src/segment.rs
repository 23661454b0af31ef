//! Splitting long text into LINE-sized text messages.

use {relay_channels::Segment, relay_config::OutboundConfig};

/// LINE's practical limit for one reply text.
pub const DEFAULT_MAX_SEGMENT_LENGTH: usize = 2000;

/// Sentence terminators used when no newline falls inside the window.
pub const DEFAULT_TERMINATORS: &str = "。！？";

/// What ended a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Cut at a newline, which belongs to neither segment.
    Newline,
    /// Cut right after a sentence terminator (kept in the segment).
    Terminator,
    /// No boundary fitted, cut at exactly the maximum length.
    Hard,
    /// Last segment of the text.
    End,
}

/// Splits text into segments of at most `max_len` characters, preferring
/// paragraph then sentence boundaries.
#[derive(Debug, Clone)]
pub struct Segmenter {
    max_len: usize,
    terminators: Vec<char>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEGMENT_LENGTH, DEFAULT_TERMINATORS)
    }
}

impl Segmenter {
    /// `max_len` is clamped to at least one character.
    pub fn new(max_len: usize, terminators: &str) -> Self {
        Self {
            max_len: max_len.max(1),
            terminators: terminators.chars().filter(|c| *c != '\n').collect(),
        }
    }

    pub fn from_config(config: &OutboundConfig) -> Self {
        Self::new(config.max_segment_length, &config.sentence_terminators)
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Split `text` into segments. Empty text yields no segments.
    pub fn split(&self, text: &str) -> Vec<Segment> {
        self.split_with_boundaries(text)
            .into_iter()
            .map(|(segment, _)| segment)
            .collect()
    }

    /// Like [`split`](Self::split), also reporting how each segment ended.
    ///
    /// Concatenating the segments, with a `\n` re-inserted after every
    /// [`Boundary::Newline`], reproduces `text` exactly.
    pub fn split_with_boundaries(&self, text: &str) -> Vec<(Segment, Boundary)> {
        let mut pieces = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            // Byte offset of the first char past the window, if the rest is too long.
            let Some((window_end, _)) = rest.char_indices().nth(self.max_len) else {
                pieces.push((Segment::text(rest), Boundary::End));
                break;
            };
            let window = &rest[..window_end];

            let (cut, resume, boundary) = if let Some(at) = self.newline_cut(rest, window_end) {
                (at, at + 1, Boundary::Newline)
            } else if let Some(after) = self.terminator_cut(window) {
                (after, after, Boundary::Terminator)
            } else {
                (window_end, window_end, Boundary::Hard)
            };

            pieces.push((Segment::text(&rest[..cut]), boundary));
            rest = &rest[resume..];
        }

        pieces
    }

    /// Last newline at char offset `1..=max_len`. A newline right at the
    /// cursor would leave an empty segment.
    fn newline_cut(&self, rest: &str, window_end: usize) -> Option<usize> {
        if rest[window_end..].starts_with('\n') {
            return Some(window_end);
        }
        rest[..window_end].rfind('\n').filter(|at| *at > 0)
    }

    /// Byte offset just past the rightmost terminator inside the window.
    fn terminator_cut(&self, window: &str) -> Option<usize> {
        window
            .char_indices()
            .rev()
            .find(|(_, c)| self.terminators.contains(c))
            .map(|(i, c)| i + c.len_utf8())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn contents(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(Segment::content).collect()
    }

    fn reassemble(pieces: &[(Segment, Boundary)]) -> String {
        let mut out = String::new();
        for (segment, boundary) in pieces {
            out.push_str(segment.content());
            if *boundary == Boundary::Newline {
                out.push('\n');
            }
        }
        out
    }

    #[test]
    fn empty_text_has_no_segments() {
        assert!(Segmenter::default().split("").is_empty());
    }

    #[rstest]
    #[case("hello")]
    #[case("line one\nline two")]
    #[case("第一句。第二句！")]
    fn short_text_is_returned_whole(#[case] text: &str) {
        let segments = Segmenter::new(20, DEFAULT_TERMINATORS).split(text);
        assert_eq!(contents(&segments), vec![text]);
    }

    #[test]
    fn text_exactly_at_limit_is_one_segment() {
        let text = "字".repeat(2000);
        let segments = Segmenter::default().split(&text);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].char_len(), 2000);
    }

    #[test]
    fn unbroken_text_is_hard_cut_at_the_limit() {
        let text = "a".repeat(3 * 2000);
        let pieces = Segmenter::default().split_with_boundaries(&text);
        assert_eq!(pieces.len(), 3);
        for (segment, _) in &pieces {
            assert_eq!(segment.char_len(), 2000);
        }
        assert_eq!(pieces[0].1, Boundary::Hard);
        assert_eq!(pieces[1].1, Boundary::Hard);
        assert_eq!(pieces[2].1, Boundary::End);
    }

    #[test]
    fn prefers_last_newline_in_window() {
        let seg = Segmenter::new(10, DEFAULT_TERMINATORS);
        let pieces = seg.split_with_boundaries("abc\ndef\nghijklmnop");
        assert_eq!(pieces[0], (Segment::text("abc\ndef"), Boundary::Newline));
        assert_eq!(pieces[1], (Segment::text("ghijklmnop"), Boundary::End));
    }

    #[test]
    fn newline_right_after_window_is_used() {
        let seg = Segmenter::new(5, "");
        let pieces = seg.split_with_boundaries("abcde\nfgh");
        assert_eq!(pieces[0], (Segment::text("abcde"), Boundary::Newline));
        assert_eq!(pieces[1], (Segment::text("fgh"), Boundary::End));
    }

    #[test]
    fn newline_beats_a_later_terminator() {
        let seg = Segmenter::new(10, DEFAULT_TERMINATORS);
        let pieces = seg.split_with_boundaries("ab\ncdefg。hijkl");
        assert_eq!(pieces[0].0.content(), "ab");
        assert_eq!(pieces[0].1, Boundary::Newline);
    }

    #[test]
    fn rightmost_fitting_terminator_wins() {
        let seg = Segmenter::new(8, DEFAULT_TERMINATORS);
        let segments = seg.split("一二。三四！五六七八九");
        assert_eq!(contents(&segments), vec!["一二。三四！", "五六七八九"]);
    }

    #[test]
    fn terminator_as_last_char_of_window_fits() {
        let seg = Segmenter::new(4, DEFAULT_TERMINATORS);
        let pieces = seg.split_with_boundaries("一二三？四五");
        assert_eq!(pieces[0], (Segment::text("一二三？"), Boundary::Terminator));
        assert_eq!(pieces[1], (Segment::text("四五"), Boundary::End));
    }

    #[test]
    fn leading_newline_is_not_a_cut_point() {
        let seg = Segmenter::new(3, "");
        let pieces = seg.split_with_boundaries("\nabcdef");
        assert_eq!(pieces[0], (Segment::text("\nab"), Boundary::Hard));
        assert_eq!(reassemble(&pieces), "\nabcdef");
    }

    #[test]
    fn custom_terminators() {
        let seg = Segmenter::new(6, ".");
        assert_eq!(contents(&seg.split("ab. cdefgh")), vec!["ab.", " cdefg", "h"]);
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    #[case(50)]
    fn segments_fit_and_reassemble(#[case] max_len: usize) {
        let text = "今天天氣很好。我們去公園散步吧！\n好啊？\n\n\
                    This paragraph has no terminators at all and runs long\n\
                    最後一段。";
        let pieces = Segmenter::new(max_len, DEFAULT_TERMINATORS).split_with_boundaries(text);
        assert!(pieces.iter().all(|(s, _)| s.char_len() <= max_len));
        assert!(pieces.iter().all(|(s, _)| !s.content().is_empty()));
        assert_eq!(reassemble(&pieces), text);
    }

    #[test]
    fn multibyte_text_never_splits_inside_a_char() {
        let text = format!("{}лz", "a".repeat(1999));
        let segments = Segmenter::default().split(&text);
        assert_eq!(contents(&segments), vec![format!("{}л", "a".repeat(1999)).as_str(), "z"]);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let seg = Segmenter::new(0, "");
        assert_eq!(seg.max_len(), 1);
        assert_eq!(contents(&seg.split("ab")), vec!["a", "b"]);
    }
}

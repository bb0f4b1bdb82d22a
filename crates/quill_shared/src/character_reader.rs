//! Buffered character reader
//!
//! The reader is a pull-based cursor over decoded input text. It keeps a window of characters
//! in memory that is refilled from the remaining input once the cursor passes the split point.
//! A mark can be placed before speculative lookahead; buffered data behind an active mark is
//! never discarded on refill.
use std::fmt;
use std::io::Read;

use derive_more::Display;

/// Default number of characters kept in the buffer window
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;
/// Smallest window we allow. Literal lookahead is guaranteed for a quarter of the window.
pub const MIN_BUFFER_SIZE: usize = 16;

/// A single character read from the reader, or the end-of-stream sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Character {
    /// Standard UTF character
    Ch(char),
    /// End of stream reached
    StreamEnd,
}

use Character::{Ch, StreamEnd};

impl Character {
    pub fn is_eof(&self) -> bool {
        matches!(self, StreamEnd)
    }

    /// Returns true when the character is an ASCII letter
    pub fn is_ascii_alphabetic(&self) -> bool {
        matches!(self, Ch(c) if c.is_ascii_alphabetic())
    }

    /// Returns true when the character is one of the HTML whitespace characters
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Ch('\t' | '\n' | '\x0c' | ' '))
    }
}

impl From<Character> for char {
    fn from(c: Character) -> Self {
        match c {
            Ch(c) => c,
            StreamEnd => '\0',
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ch(ch) => write!(f, "{ch}"),
            StreamEnd => write!(f, "StreamEnd"),
        }
    }
}

/// Location holds the start position of the given element in the data source
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("({line}:{column})")]
pub struct Location {
    /// Line number, starting with 1. Zero when line tracking is disabled.
    pub line: usize,
    /// Column number, starting with 1. Zero when line tracking is disabled.
    pub column: usize,
    /// Character offset, starting with 0
    pub offset: usize,
}

impl Default for Location {
    /// Default to line 1, column 1
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl Location {
    /// Create a new Location
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}

/// Start and end location of a token or node in the source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    /// Number of source characters covered by this span
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration of the reader
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Number of characters kept in the buffer window
    pub buffer_size: usize,
    /// Keep track of newline offsets, so line and column numbers can be computed
    pub track_lines: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            track_lines: false,
        }
    }
}

/// Buffered, mark/rewind-capable cursor over the input text
pub struct CharacterReader {
    /// Remaining input that has not been pulled into the buffer yet
    source: std::vec::IntoIter<char>,
    /// Current window of characters
    buffer: Vec<char>,
    /// Cursor position inside the buffer
    buf_pos: usize,
    /// When the cursor reaches this point, the buffer is refilled
    buf_split_point: usize,
    /// Rewind point inside the buffer
    buf_mark: Option<usize>,
    /// Absolute offset of buffer[0] in the input
    reader_pos: usize,
    /// True when the source has been drained into the buffer
    read_fully: bool,
    config: Config,
    /// Absolute offsets of every '\n' that has been buffered (only when tracking lines)
    newline_positions: Vec<usize>,
    /// Last query and the absolute offset where it was found by contains_ignore_case
    last_contains_query: Option<(String, Option<usize>)>,
}

impl fmt::Debug for CharacterReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharacterReader")
            .field("pos", &self.pos())
            .field("buffered", &self.buffer.len())
            .field("mark", &self.buf_mark)
            .field("read_fully", &self.read_fully)
            .finish()
    }
}

impl CharacterReader {
    /// Creates a new reader over the given string with the default configuration
    pub fn new(input: &str) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Creates a new reader over the given string
    pub fn with_config(input: &str, config: Config) -> Self {
        let config = Config {
            buffer_size: config.buffer_size.max(MIN_BUFFER_SIZE),
            ..config
        };

        let mut reader = Self {
            source: normalize_newlines(input).into_iter(),
            buffer: Vec::with_capacity(config.buffer_size.min(input.len() + 1)),
            buf_pos: 0,
            buf_split_point: 0,
            buf_mark: None,
            reader_pos: 0,
            read_fully: false,
            config,
            newline_positions: Vec::new(),
            last_contains_query: None,
        };
        reader.fill(config.buffer_size);
        reader
    }

    /// Creates a reader from raw bytes. A byte order mark takes precedence over the given
    /// encoding; without both, UTF-8 is assumed. Malformed sequences decode to U+FFFD.
    pub fn from_bytes(bytes: &[u8], encoding: Option<&'static encoding_rs::Encoding>, config: Config) -> Self {
        let encoding = encoding.unwrap_or(encoding_rs::UTF_8);
        let (decoded, used, had_errors) = encoding.decode(bytes);
        if had_errors {
            log::debug!("malformed {} sequences replaced while decoding input", used.name());
        }

        Self::with_config(&decoded, config)
    }

    /// Reads everything from the given reader and decodes it as [`CharacterReader::from_bytes`] does
    pub fn from_reader(
        mut r: impl Read,
        encoding: Option<&'static encoding_rs::Encoding>,
        config: Config,
    ) -> Result<Self, crate::types::Error> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;

        Ok(Self::from_bytes(&bytes, encoding, config))
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Pulls characters from the source until the buffer holds `target_len` characters or the
    /// source is drained.
    fn fill(&mut self, target_len: usize) {
        while self.buffer.len() < target_len {
            match self.source.next() {
                Some(c) => {
                    if c == '\n' && self.config.track_lines {
                        self.newline_positions.push(self.reader_pos + self.buffer.len());
                    }
                    self.buffer.push(c);
                }
                None => {
                    self.read_fully = true;
                    break;
                }
            }
        }

        self.buf_split_point = if self.read_fully {
            self.buffer.len()
        } else {
            self.buffer.len().saturating_sub(self.config.buffer_size / 4)
        };
    }

    /// Refills the buffer when the cursor has passed the split point. Data in front of the
    /// cursor (or in front of the mark, when one is set) is dropped.
    fn buffer_up(&mut self) {
        if self.read_fully || self.buf_pos < self.buf_split_point {
            return;
        }

        let keep_from = self.buf_mark.unwrap_or(self.buf_pos);
        if keep_from > 0 {
            self.buffer.drain(..keep_from);
            self.reader_pos += keep_from;
            self.buf_pos -= keep_from;
            if let Some(mark) = self.buf_mark.as_mut() {
                *mark -= keep_from;
            }
        }

        self.fill(self.buf_pos + self.config.buffer_size);
    }

    /// Makes sure at least `n` characters from the cursor are buffered, unless the input ends
    /// before that.
    fn ensure_available(&mut self, n: usize) {
        self.buffer_up();
        if !self.read_fully && self.buf_pos + n > self.buffer.len() {
            self.fill(self.buf_pos + n.max(self.config.buffer_size));
        }
    }

    /// Absolute character offset of the cursor
    pub fn pos(&self) -> usize {
        self.reader_pos + self.buf_pos.min(self.buffer.len())
    }

    /// Returns true when the cursor is at the end of the input
    pub fn is_empty(&mut self) -> bool {
        self.buffer_up();
        self.buf_pos >= self.buffer.len()
    }

    /// Returns the character at the cursor without consuming it
    pub fn current(&mut self) -> Character {
        self.buffer_up();
        match self.buffer.get(self.buf_pos) {
            Some(&c) => Ch(c),
            None => StreamEnd,
        }
    }

    /// Returns the character at the cursor and advances. Past the end, the cursor stays at the
    /// end and `StreamEnd` is returned.
    pub fn consume(&mut self) -> Character {
        self.buffer_up();
        match self.buffer.get(self.buf_pos) {
            Some(&c) => {
                self.buf_pos += 1;
                Ch(c)
            }
            None => {
                // Still counts as a consumed position, so unconsume() stays symmetric.
                self.buf_pos += 1;
                StreamEnd
            }
        }
    }

    /// Advances the cursor by one character
    pub fn advance(&mut self) {
        self.consume();
    }

    /// Steps back exactly one character. Only valid directly after a consume().
    pub fn unconsume(&mut self) {
        assert!(self.buf_pos > 0, "no buffer left to unconsume");
        self.buf_pos -= 1;
    }

    /// Sets the rewind point at the cursor
    pub fn mark(&mut self) {
        self.ensure_available(self.config.buffer_size / 4);
        self.buf_mark = Some(self.buf_pos);
    }

    /// Removes the rewind point
    pub fn unmark(&mut self) {
        self.buf_mark = None;
    }

    /// Moves the cursor back to the rewind point and removes it. Calling this without a mark is
    /// a programming error.
    pub fn rewind_to_mark(&mut self) {
        assert!(self.buf_mark.is_some(), "rewind without an active mark");
        if let Some(mark) = self.buf_mark.take() {
            self.buf_pos = mark;
            self.last_contains_query = None;
        }
    }

    /// Returns up to `n` upcoming characters without consuming them
    pub fn peek_str(&mut self, n: usize) -> String {
        self.ensure_available(n);
        let end = (self.buf_pos + n).min(self.buffer.len());
        self.buffer
            .get(self.buf_pos..end)
            .map(|s| s.iter().collect())
            .unwrap_or_default()
    }

    /// Consumes characters while the predicate holds and returns them
    fn consume_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        loop {
            self.buffer_up();
            let start = self.buf_pos;
            while let Some(&c) = self.buffer.get(self.buf_pos) {
                if !pred(c) {
                    break;
                }
                self.buf_pos += 1;
            }
            out.extend(&self.buffer[start.min(self.buffer.len())..self.buf_pos.min(self.buffer.len())]);

            // Either we hit a delimiter, or the end of the buffered data. Only in the latter case
            // and when more input exists, we need another round.
            if self.buf_pos < self.buffer.len() || self.read_fully {
                return out;
            }
        }
    }

    /// Consumes up to (not including) the given character, or to the end of input
    pub fn consume_to(&mut self, c: char) -> String {
        self.consume_while(|ch| ch != c)
    }

    /// Consumes up to (not including) the given sequence, or to the end of input
    pub fn consume_to_seq(&mut self, seq: &str) -> String {
        let Some(first) = seq.chars().next() else {
            return String::new();
        };

        let mut out = String::new();
        loop {
            out.push_str(&self.consume_to(first));
            if self.is_empty() || self.matches_seq(seq) {
                return out;
            }
            out.push(char::from(self.consume()));
        }
    }

    /// Consumes up to any of the given characters, or to the end of input
    pub fn consume_to_any(&mut self, chars: &[char]) -> String {
        self.consume_while(|ch| !chars.contains(&ch))
    }

    /// Consumes everything that is left
    pub fn consume_to_end(&mut self) -> String {
        self.consume_while(|_| true)
    }

    /// Consumes a run of text for the data state. Stops at '&', '<' and NUL.
    pub fn consume_data(&mut self) -> String {
        self.consume_while(|ch| !matches!(ch, '&' | '<' | '\0'))
    }

    /// Consumes a run of text for the RAWTEXT, script data and PLAINTEXT states. Stops at '<' and NUL.
    pub fn consume_raw_data(&mut self) -> String {
        self.consume_while(|ch| !matches!(ch, '<' | '\0'))
    }

    /// Consumes the characters that can be part of a tag name as-is (no case folding)
    pub fn consume_tag_name(&mut self) -> String {
        self.consume_while(|ch| !matches!(ch, '\t' | '\n' | '\x0c' | ' ' | '/' | '>' | '\0'))
    }

    /// Consumes the plain part of a quoted attribute value
    pub fn consume_attribute_quoted(&mut self, single: bool) -> String {
        let quote = if single { '\'' } else { '"' };
        self.consume_while(|ch| ch != quote && ch != '&' && ch != '\0')
    }

    pub fn consume_letter_sequence(&mut self) -> String {
        self.consume_while(|ch| ch.is_ascii_alphabetic())
    }

    /// Consumes letters followed by digits (the shape of a named character reference)
    pub fn consume_letter_then_digit_sequence(&mut self) -> String {
        let mut out = self.consume_letter_sequence();
        out.push_str(&self.consume_digit_sequence());
        out
    }

    pub fn consume_digit_sequence(&mut self) -> String {
        self.consume_while(|ch| ch.is_ascii_digit())
    }

    pub fn consume_hex_sequence(&mut self) -> String {
        self.consume_while(|ch| ch.is_ascii_hexdigit())
    }

    /// Returns true when the character at the cursor is `c`
    pub fn matches(&mut self, c: char) -> bool {
        self.current() == Ch(c)
    }

    /// Returns true when the upcoming characters equal `seq`
    pub fn matches_seq(&mut self, seq: &str) -> bool {
        let len = seq.chars().count();
        self.ensure_available(len);
        let Some(window) = self.buffer.get(self.buf_pos..self.buf_pos + len) else {
            return false;
        };
        window.iter().copied().eq(seq.chars())
    }

    /// Returns true when the upcoming characters equal `seq`, ignoring ASCII case
    pub fn matches_ignore_case(&mut self, seq: &str) -> bool {
        let len = seq.chars().count();
        self.ensure_available(len);
        let Some(window) = self.buffer.get(self.buf_pos..self.buf_pos + len) else {
            return false;
        };
        window
            .iter()
            .zip(seq.chars())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b))
    }

    /// Returns true when the character at the cursor is one of `chars`
    pub fn matches_any(&mut self, chars: &[char]) -> bool {
        matches!(self.current(), Ch(c) if chars.contains(&c))
    }

    pub fn matches_letter(&mut self) -> bool {
        self.current().is_ascii_alphabetic()
    }

    pub fn matches_digit(&mut self) -> bool {
        matches!(self.current(), Ch(c) if c.is_ascii_digit())
    }

    /// Consumes `seq` when the upcoming characters equal it
    pub fn match_consume(&mut self, seq: &str) -> bool {
        if self.matches_seq(seq) {
            self.buf_pos += seq.chars().count();
            return true;
        }
        false
    }

    /// Consumes `seq` when the upcoming characters equal it, ignoring ASCII case
    pub fn match_consume_ignore_case(&mut self, seq: &str) -> bool {
        if self.matches_ignore_case(seq) {
            self.buf_pos += seq.chars().count();
            return true;
        }
        false
    }

    /// Returns true when `seq` occurs anywhere between the cursor and the end of input, ignoring
    /// ASCII case. The last query is cached, so repeated calls without the cursor passing the
    /// found position are answered without scanning.
    pub fn contains_ignore_case(&mut self, seq: &str) -> bool {
        let pos = self.pos();
        if let Some((query, found)) = &self.last_contains_query {
            if query == seq {
                match found {
                    None => return false,
                    Some(offset) if *offset >= pos => return true,
                    Some(_) => {}
                }
            }
        }

        let needle: Vec<char> = seq.chars().map(|c| c.to_ascii_lowercase()).collect();
        if needle.is_empty() {
            return true;
        }

        // The rest of the input is scanned in place, the window itself is left alone
        self.buffer_up();
        let buffered = self.buffer.get(self.buf_pos..).unwrap_or_default();
        let remaining = self.source.as_slice();

        let char_at = |idx: usize| match buffered.get(idx) {
            Some(&c) => c,
            None => remaining[idx - buffered.len()],
        };

        let haystack_len = buffered.len() + remaining.len();
        let found = (0..(haystack_len + 1).saturating_sub(needle.len()))
            .find(|&start| {
                needle
                    .iter()
                    .enumerate()
                    .all(|(idx, c)| char_at(start + idx).to_ascii_lowercase() == *c)
            })
            .map(|idx| pos + idx);

        self.last_contains_query = Some((seq.to_string(), found));
        found.is_some()
    }

    /// Returns the 1-based line number of the given absolute offset. Returns 0 when lines are
    /// not tracked.
    pub fn line_number(&self, pos: usize) -> usize {
        if !self.config.track_lines {
            return 0;
        }
        self.newline_positions.partition_point(|&nl| nl < pos) + 1
    }

    /// Returns the 1-based column number of the given absolute offset. Returns 0 when lines are
    /// not tracked.
    pub fn column_number(&self, pos: usize) -> usize {
        if !self.config.track_lines {
            return 0;
        }
        match self.newline_positions.partition_point(|&nl| nl < pos) {
            0 => pos + 1,
            idx => pos - self.newline_positions[idx - 1],
        }
    }

    /// Location of the given absolute offset
    pub fn location_at(&self, pos: usize) -> Location {
        Location::new(self.line_number(pos), self.column_number(pos), pos)
    }

    /// Location of the cursor
    pub fn location(&self) -> Location {
        self.location_at(self.pos())
    }
}

/// Input stream preprocessing: CR LF pairs and lone CRs become a single LF.
fn normalize_newlines(input: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    fn small_reader(input: &str) -> CharacterReader {
        CharacterReader::with_config(
            input,
            Config {
                buffer_size: MIN_BUFFER_SIZE,
                track_lines: true,
            },
        )
    }

    #[test]
    fn test_reader() {
        let mut r = CharacterReader::new("one <two>");
        assert_eq!(r.current(), Ch('o'));
        assert_eq!(r.consume(), Ch('o'));
        assert_eq!(r.consume_to('<'), "ne ");
        assert!(r.matches('<'));
        assert_eq!(r.pos(), 4);
        r.advance();
        assert_eq!(r.consume_tag_name(), "two");
        assert_eq!(r.consume(), Ch('>'));
        assert!(r.is_empty());
        assert_eq!(r.consume(), StreamEnd);
        assert_eq!(r.current(), StreamEnd);
    }

    #[test]
    fn test_unconsume() {
        let mut r = CharacterReader::new("ab");
        assert_eq!(r.consume(), Ch('a'));
        r.unconsume();
        assert_eq!(r.consume(), Ch('a'));
        assert_eq!(r.consume(), Ch('b'));
        assert_eq!(r.consume(), StreamEnd);
        r.unconsume();
        assert!(r.is_empty());
        r.unconsume();
        assert_eq!(r.consume(), Ch('b'));
    }

    #[test]
    #[should_panic(expected = "no buffer left to unconsume")]
    fn unconsume_without_consume() {
        let mut r = CharacterReader::new("ab");
        r.unconsume();
    }

    #[test]
    #[should_panic(expected = "rewind without an active mark")]
    fn rewind_without_mark() {
        let mut r = CharacterReader::new("ab");
        r.rewind_to_mark();
    }

    #[test]
    fn mark_and_rewind() {
        let mut r = CharacterReader::new("<!DOCTYPE html>");
        r.advance();
        r.mark();
        assert!(r.match_consume("!DOC"));
        assert_eq!(r.pos(), 5);
        r.rewind_to_mark();
        assert_eq!(r.pos(), 1);
        assert!(r.match_consume_ignore_case("!doctype"));
        r.unmark();
        assert_eq!(r.consume(), Ch(' '));
    }

    #[test]
    fn mark_survives_refill() {
        let input: String = "abcdefghij".repeat(20);
        let mut r = small_reader(&input);
        for _ in 0..5 {
            r.advance();
        }
        r.mark();
        let consumed = r.consume_to_end();
        assert_eq!(consumed.len(), 195);
        r.rewind_to_mark();
        assert_eq!(r.pos(), 5);
        assert_eq!(r.consume_to_end(), &input[5..]);
    }

    #[test]
    fn bulk_scans_cross_refills() {
        let input = format!("{}<tail", "x".repeat(100));
        let mut r = small_reader(&input);
        assert_eq!(r.consume_data().len(), 100);
        assert!(r.matches('<'));

        let input = format!("{}]]>rest", "y".repeat(61));
        let mut r = small_reader(&input);
        assert_eq!(r.consume_to_seq("]]>"), "y".repeat(61));
        assert!(r.match_consume("]]>"));
        assert_eq!(r.consume_to_end(), "rest");
    }

    #[test]
    fn matches_across_buffer_boundary() {
        // The literal starts 2 characters before the end of the first window
        let input = format!("{}</script>", "z".repeat(MIN_BUFFER_SIZE - 2));
        let mut r = small_reader(&input);
        r.consume_to('<');
        assert!(r.matches_ignore_case("</SCRIPT>"));
        assert!(r.match_consume("</script>"));
        assert!(r.is_empty());
    }

    #[test_case("abc123def", "abc123", "def" ; "letters then digits")]
    #[test_case("123abc", "123", "abc" ; "digits without letters")]
    #[test_case("x1F;", "x1", "F;" ; "hex is not a digit")]
    #[test_case("", "", "" ; "empty input")]
    fn letter_then_digit_sequence(input: &str, sequence: &str, rest: &str) {
        let mut r = CharacterReader::new(input);
        assert_eq!(r.consume_letter_then_digit_sequence(), sequence);
        assert_eq!(r.consume_to_end(), rest);
    }

    #[test]
    fn sequences() {
        let mut r = CharacterReader::new("abc123def x1F;");
        assert_eq!(r.consume_letter_then_digit_sequence(), "abc123");
        assert_eq!(r.consume_letter_sequence(), "def");
        assert!(r.matches_any(&[' ', '\t']));
        r.advance();
        r.advance();
        assert_eq!(r.consume_hex_sequence(), "1F");
        assert_eq!(r.consume_digit_sequence(), "");
        assert_eq!(r.peek_str(10), ";");
        assert_eq!(r.consume_to_any(&[';']), "");
    }

    #[test]
    fn contains_ignore_case() {
        let mut r = CharacterReader::new("<title>foo</TITLE>");
        assert!(r.contains_ignore_case("</title"));
        assert!(!r.contains_ignore_case("</script"));
        // cached answers
        assert!(!r.contains_ignore_case("</script"));
        assert!(r.contains_ignore_case("</title"));
        r.consume_to_end();
        assert!(!r.contains_ignore_case("</title"));
    }

    #[test_case(200 ; "far beyond the window")]
    #[test_case(MIN_BUFFER_SIZE - 3 ; "straddling the window end")]
    #[test_case(MIN_BUFFER_SIZE ; "right after the window")]
    fn contains_ignore_case_beyond_window(prefix_len: usize) {
        let input = format!("{}</style>", "s".repeat(prefix_len));
        let mut r = small_reader(&input);
        assert!(r.contains_ignore_case("</STYLE"));
        assert!(!r.contains_ignore_case("</script"));
        assert!(r.buffer.len() <= MIN_BUFFER_SIZE);

        assert_eq!(r.consume_raw_data().len(), prefix_len);
        assert!(r.match_consume("</style>"));
    }

    #[test]
    fn contains_ignore_case_keeps_window_bounded() {
        let input = format!("<title>{}</title>", "t".repeat(10 * MIN_BUFFER_SIZE));
        let mut r = small_reader(&input);
        r.consume_to('>');
        r.advance();

        while r.contains_ignore_case("</title") && !r.matches('<') {
            r.advance();
            assert!(r.buffer.len() <= 2 * MIN_BUFFER_SIZE);
        }
        assert!(r.match_consume("</title>"));
    }

    #[test]
    fn test_newlines() {
        let mut r = CharacterReader::with_config(
            "one\r\ntwo\rthree\nfour",
            Config {
                track_lines: true,
                ..Config::default()
            },
        );
        assert_eq!(r.consume_to_end(), "one\ntwo\nthree\nfour");
        assert_eq!(r.location_at(0), Location::new(1, 1, 0));
        assert_eq!(r.location_at(3), Location::new(1, 4, 3));
        assert_eq!(r.location_at(4), Location::new(2, 1, 4));
        assert_eq!(r.location_at(9), Location::new(3, 2, 9));
        assert_eq!(r.location().line, 4);
    }

    #[test]
    fn lines_not_tracked() {
        let mut r = CharacterReader::new("a\nb");
        r.consume_to_end();
        assert_eq!(r.location(), Location::new(0, 0, 3));
    }

    #[test_case(b"\xEF\xBB\xBFhello", None, "hello" ; "utf8 bom")]
    #[test_case(b"caf\xe9", Some(encoding_rs::WINDOWS_1252), "caf\u{e9}" ; "windows-1252 label")]
    #[test_case(b"\xFF\xFEh\x00i\x00", None, "hi" ; "utf16le bom")]
    #[test_case(b"bad \xff byte", None, "bad \u{FFFD} byte" ; "malformed utf8")]
    #[test_case(b"a\r\nb\rc", None, "a\nb\nc" ; "newlines normalised")]
    fn from_bytes(bytes: &[u8], encoding: Option<&'static encoding_rs::Encoding>, expected: &str) {
        let r = &mut CharacterReader::from_bytes(bytes, encoding, Config::default());
        assert_eq!(r.consume_to_end(), expected);
    }

    #[test]
    fn from_reader() {
        let r = CharacterReader::from_reader(&b"\xEF\xBB\xBFhello"[..], None, Config::default());
        assert!(r.is_ok());
        if let Ok(mut r) = r {
            assert_eq!(r.consume_to_end(), "hello");
        }
    }

    #[test]
    fn location_display() {
        assert_eq!(Location::new(3, 14, 40).to_string(), "(3:14)");
        assert_eq!(format!("{:?}", Location::default()), "(1:1)");
    }
}

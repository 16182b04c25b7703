//! Semantic-first text splitting.
//!
//! A [`TextSplitter`] walks a text left to right. At each step it looks at the
//! next `max_chars` characters and cuts at the last occurrence of the most
//! semantic separator found in the second half of that window (file markers,
//! then paragraph breaks, then lines, then spaces), falling back to a raw
//! character cut. The next chunk
//! starts `overlap` characters before the cut, nudged forward to a whitespace
//! boundary when one is close.
//!
//! Chunks borrow from the input and carry their byte range, so the iterator is
//! lazy, cheap to clone, and restartable by calling [`TextSplitter::chunks`] again.

/// Separators for a concatenated repository corpus, most semantic first
pub const CORPUS_SEPARATORS: &[&str] = &["\nFile:", "\n\n", "\n", " "];

/// Separators for prose and summaries
pub const TEXT_SEPARATORS: &[&str] = &["\n\n", "\n", " "];

/// One chunk of a larger text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Position of the chunk in the sequence, starting at 0
    pub ordinal: usize,
    /// Byte offset of the first character in the source text
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// The chunk text, `&source[start..end]`
    pub text: &'a str,
}

/// Splits text into bounded, overlapping chunks
#[derive(Debug, Clone)]
pub struct TextSplitter {
    max_chars: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Creates a splitter with [`TEXT_SEPARATORS`].
    ///
    /// `max_chars` is at least 1 and `overlap` is clamped below `max_chars`.
    pub fn new(max_chars: usize, overlap: usize) -> Self {
        let max_chars = max_chars.max(1);
        Self {
            max_chars,
            overlap: overlap.min(max_chars - 1),
            separators: TEXT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Creates a splitter tuned for concatenated repository files
    pub fn for_corpus(max_chars: usize, overlap: usize) -> Self {
        Self::new(max_chars, overlap).with_separators(CORPUS_SEPARATORS)
    }

    /// Replaces the separator list; earlier entries are preferred
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.separators = separators
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    /// Maximum chunk length in characters
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Overlap between consecutive chunks in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily splits `text`
    pub fn chunks<'a>(&'a self, text: &'a str) -> Chunks<'a> {
        Chunks {
            splitter: self,
            text,
            cursor: 0,
            ordinal: 0,
            finished: text.is_empty(),
        }
    }

    /// Splits `text` into owned strings
    pub fn split(&self, text: &str) -> Vec<String> {
        self.chunks(text).map(|chunk| chunk.text.to_string()).collect()
    }

    /// The first chunk of `text`: a bounded excerpt that ends on the best boundary available
    pub fn excerpt<'a>(&'a self, text: &'a str) -> &'a str {
        self.chunks(text).next().map(|chunk| chunk.text).unwrap_or("")
    }

    /// Byte length of the chunk to cut from `window`, which holds exactly `max_chars` characters.
    ///
    /// The cut must leave more than `min_len` bytes so the following chunk makes progress,
    /// and separators in the first half of the window are passed over for a less
    /// semantic one later on.
    fn find_cut(&self, window: &str, min_len: usize) -> usize {
        let floor = min_len.max(window.len() / 2);
        self.separators
            .iter()
            .find_map(|sep| window.rfind(sep.as_str()).filter(|&pos| pos > floor))
            .unwrap_or(window.len())
    }

    /// Byte offset inside `chunk` where the next chunk should begin
    fn next_start(&self, chunk: &str) -> usize {
        if self.overlap == 0 {
            return chunk.len();
        }
        let raw = chunk
            .char_indices()
            .rev()
            .nth(self.overlap - 1)
            .map(|(i, _)| i)
            .unwrap_or(0);

        // Prefer starting on a word boundary within the overlap region
        chunk[raw..]
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| raw + i + c.len_utf8())
            .filter(|&snapped| snapped < chunk.len())
            .unwrap_or(raw)
    }
}

/// Iterator over the chunks of one text; see [`TextSplitter::chunks`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    splitter: &'a TextSplitter,
    text: &'a str,
    cursor: usize,
    ordinal: usize,
    finished: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let start = self.cursor;
        let rest = &self.text[start..];
        let window_len = byte_len_of_chars(rest, self.splitter.max_chars);

        let end = if window_len == rest.len() {
            self.finished = true;
            self.text.len()
        } else {
            let window = &rest[..window_len];
            let min_len = byte_len_of_chars(window, self.splitter.overlap);
            let cut = self.splitter.find_cut(window, min_len);
            let end = start + cut;
            self.cursor = start + self.splitter.next_start(&self.text[start..end]);
            end
        };

        let chunk = Chunk {
            ordinal: self.ordinal,
            start,
            end,
            text: &self.text[start..end],
        };
        self.ordinal += 1;
        Some(chunk)
    }
}

/// Number of characters in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    &text[..byte_len_of_chars(text, max_chars)]
}

/// Byte length of the first `n` characters of `text` (or all of it)
fn byte_len_of_chars(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map(|(i, _)| i).unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Rebuilds the source from the non-overlapping part of each chunk
    fn reconstruct(chunks: &[Chunk<'_>]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for chunk in chunks {
            assert!(chunk.start <= covered, "gap before chunk {}", chunk.ordinal);
            out.push_str(&chunk.text[covered - chunk.start..]);
            covered = chunk.end;
        }
        out
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let splitter = TextSplitter::new(100, 10);
        assert_eq!(splitter.chunks("").count(), 0);
        assert_eq!(splitter.excerpt(""), "");
    }

    #[test]
    fn test_small_input_is_single_chunk() {
        let splitter = TextSplitter::for_corpus(3000, 200);
        let text = "File: src/main.rs\nfn main() {}\n\n";
        let chunks: Vec<_> = splitter.chunks(text).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!((chunks[0].start, chunks[0].end), (0, text.len()));
    }

    #[test]
    fn test_exactly_max_chars_is_single_chunk() {
        let splitter = TextSplitter::new(10, 3);
        assert_eq!(splitter.split("abcdefghij"), vec!["abcdefghij"]);
    }

    #[test]
    fn test_prefers_file_markers() {
        let first = format!("File: a.rs\n{}\n\nmore", "x".repeat(40));
        let second = format!("File: b.rs\n{}", "y".repeat(40));
        let text = format!("{}\n{}", first, second);
        let splitter = TextSplitter::for_corpus(80, 0);

        let chunks = splitter.split(&text);
        assert_eq!(chunks[0], first);
        assert!(chunks[1].starts_with("\nFile: b.rs"));
    }

    #[test]
    fn test_falls_back_to_paragraphs_then_lines() {
        let text = "alpha alpha\n\nbeta beta beta\ngamma gamma";
        let splitter = TextSplitter::new(20, 0);
        let chunks = splitter.split(text);
        assert_eq!(chunks[0], "alpha alpha");
        assert!(chunks.iter().all(|c| char_len(c) <= 20));
    }

    #[test]
    fn test_character_fallback_without_separators() {
        let text = "z".repeat(25);
        let splitter = TextSplitter::new(10, 2);
        let chunks: Vec<_> = splitter.chunks(&text).collect();
        assert_eq!(chunks[0].text.len(), 10);
        assert_eq!(chunks[1].start, 8);
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_overlap_snaps_to_word_boundary() {
        let text = "one two three four five six seven eight nine ten";
        let splitter = TextSplitter::new(20, 8);
        let chunks: Vec<_> = splitter.chunks(text).collect();
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let shared = pair[0].end - pair[1].start;
            assert!(shared <= 8);
            assert!(!pair[1].text.starts_with(' '));
        }
    }

    #[test]
    fn test_iterator_is_restartable() {
        let text = "a b c d e f g h i j k l m n o p";
        let splitter = TextSplitter::new(6, 2);
        let chunks = splitter.chunks(text);
        let first: Vec<_> = chunks.clone().collect();
        let second: Vec<_> = chunks.collect();
        assert_eq!(first, second);
        assert_eq!(first, splitter.chunks(text).collect::<Vec<_>>());
    }

    #[test]
    fn test_multibyte_text() {
        let text = "héllo wörld ünïcödé ✓✓✓ 日本語のテキスト";
        let splitter = TextSplitter::new(7, 2);
        let chunks: Vec<_> = splitter.chunks(text).collect();
        assert!(chunks.iter().all(|c| char_len(c.text) <= 7));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let text = format!("{}\n\n{}", "a".repeat(600), "b".repeat(600));
        let splitter = TextSplitter::new(1000, 0);
        assert_eq!(splitter.excerpt(&text), "a".repeat(600));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("añb", 2), "añ");
        assert_eq!(truncate_chars("ab", 5), "ab");
        assert_eq!(truncate_chars("ab", 0), "");
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let splitter = TextSplitter::new(5, 50);
        assert_eq!(splitter.overlap(), 4);
        let text = "abcdefghijklmnop";
        let chunks: Vec<_> = splitter.chunks(text).collect();
        assert_eq!(reconstruct(&chunks), text);
    }

    proptest! {
        #[test]
        fn prop_chunks_are_bounded_and_reconstruct(
            text in "(File: [a-z]{1,8}\n|[a-zé✓ ]{0,30}|\n\n|\n){0,40}",
            max_chars in 1usize..120,
            overlap in 0usize..60,
        ) {
            let splitter = TextSplitter::for_corpus(max_chars, overlap);
            let chunks: Vec<_> = splitter.chunks(&text).collect();

            prop_assert_eq!(chunks.is_empty(), text.is_empty());
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.ordinal, i);
                prop_assert!(char_len(chunk.text) <= splitter.max_chars());
                prop_assert!(!chunk.text.is_empty());
            }
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].start > pair[0].start);
                prop_assert!(pair[1].end > pair[0].end);
                prop_assert!(char_len(&text[pair[1].start..pair[0].end]) <= splitter.overlap());
            }
            prop_assert_eq!(reconstruct(&chunks), text);
        }

        #[test]
        fn prop_short_input_is_one_chunk(text in "[a-z \n]{1,50}", extra in 0usize..20) {
            let max_chars = char_len(&text) + extra;
            let splitter = TextSplitter::for_corpus(max_chars, max_chars / 2);
            let chunks = splitter.split(&text);
            prop_assert_eq!(chunks, vec![text.clone()]);
        }
    }
}

const SENTENCE_ENDINGS: &[char] = &['。', '．', '！', '？', '.', '!', '?'];
const CLAUSE_BREAKS: &[char] = &['、', '，', ',', ';', '；', ':', '：'];

/// Splits `text` into contiguous pieces of at most `max_chars` characters.
///
/// A cut lands after the latest sentence ending inside the window, else after the
/// latest clause break, else after the latest whitespace, else exactly at the
/// window edge. Joining the pieces gives back `text`.
pub fn split_segments(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        // Byte offset of every char boundary in the window, plus the window end.
        let boundaries: Vec<usize> = rest
            .char_indices()
            .map(|(offset, _)| offset)
            .take(max_chars + 1)
            .collect();
        if boundaries.len() <= max_chars {
            segments.push(rest);
            break;
        }
        let window_end = boundaries[max_chars];
        let window = &rest[..window_end];
        let cut = last_break(window).unwrap_or(window_end);
        let (head, tail) = rest.split_at(cut);
        segments.push(head);
        rest = tail;
    }
    segments
}

fn last_break(window: &str) -> Option<usize> {
    let after = |(offset, c): (usize, char)| offset + c.len_utf8();
    let find = |pred: &dyn Fn(char) -> bool| {
        window
            .char_indices()
            .filter(|(_, c)| pred(*c))
            .last()
            .map(after)
    };
    find(&|c| SENTENCE_ENDINGS.contains(&c))
        .or_else(|| find(&|c| CLAUSE_BREAKS.contains(&c)))
        .or_else(|| find(&|c| c.is_whitespace()))
}

#[cfg(test)]
mod tests {
    use super::split_segments;

    #[test]
    fn short_text_is_one_segment() {
        let text = "あ".repeat(200);
        assert_eq!(split_segments(&text, 200), vec![text.as_str()]);
        assert_eq!(split_segments("でんしゃ", 200), vec!["でんしゃ"]);
    }

    #[test]
    fn unpunctuated_text_is_cut_at_the_limit() {
        let text = "あ".repeat(450);
        let segments = split_segments(&text, 200);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].chars().count(), 200);
        assert_eq!(segments[1].chars().count(), 200);
        assert_eq!(segments[2].chars().count(), 50);
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn prefers_sentence_end_over_comma_and_space() {
        let text = "きょうは、いい てんき。あしたも はれ";
        let segments = split_segments(text, 14);
        assert_eq!(segments[0], "きょうは、いい てんき。");
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn falls_back_to_comma_then_whitespace() {
        assert_eq!(split_segments("あいう、えおかき", 6), vec!["あいう、", "えおかき"]);
        assert_eq!(split_segments("abc defgh", 6), vec!["abc ", "defgh"]);
    }

    #[test]
    fn boundary_exactly_at_cutoff_counts() {
        assert_eq!(split_segments("あいうえ。かき", 5), vec!["あいうえ。", "かき"]);
    }

    #[test]
    fn every_segment_respects_limit() {
        let text = "これは、とても ながい ぶんしょう です。".repeat(30);
        for segment in split_segments(&text, 200) {
            assert!(segment.chars().count() <= 200);
        }
        assert_eq!(split_segments(&text, 200).concat(), text);
    }
}

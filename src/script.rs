/// CJK unified ideographs plus extension A. Kana and Latin fall outside.
pub fn is_kanji(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9faf}' | '\u{3400}'..='\u{4dbf}')
}

pub fn has_kanji(text: &str) -> bool {
    text.chars().any(is_kanji)
}

pub fn is_hiragana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3096}')
}

pub fn is_katakana(c: char) -> bool {
    matches!(c, '\u{30a1}'..='\u{30fa}')
}

/// Maps katakana that has a hiragana twin onto it; everything else passes through.
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{30a1}'..='\u{30f6}' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}

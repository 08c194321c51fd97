use regex::Regex;
use std::sync::LazyLock;

const CONSONANTS: &str = "bcdfghjklmnpqrstvwxyz";

static CLUSTER_THEN_SYLLABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)((?:sh|ch|ts)[aeiou]|[{c}]y[aeiou])({onset}[aeiou])",
        c = CONSONANTS,
        onset = onset()
    ))
    .expect("cluster pattern")
});

static VOWEL_THEN_SYLLABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)([aeiou])({onset}[aeiou])", onset = onset()))
        .expect("vowel pattern")
});

// Any `n` before a consonant-vowel pair, except where `n` + `y` forms the onset.
static SYLLABIC_N_THEN_SYLLABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(n)((?:sh|ch|ts|[{c}]y|[{no_y}])[aeiou])",
        c = CONSONANTS,
        no_y = CONSONANTS.replace('y', "")
    ))
    .expect("syllabic n pattern")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

fn onset() -> String {
    format!("(?:sh|ch|ts|[{c}]y|[{c}])", c = CONSONANTS)
}

/// Adds readability spaces between the syllables of unspaced romaji.
///
/// Input that already contains a space is treated as hand-edited and returned as is.
/// The segmentation is a heuristic; geminates and long vowels stay glued to their
/// neighbours.
pub fn space_romaji(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    if input.contains(' ') {
        return input.to_string();
    }

    let mut spaced = input.to_string();
    for pass in [
        &*CLUSTER_THEN_SYLLABLE,
        &*VOWEL_THEN_SYLLABLE,
        &*SYLLABIC_N_THEN_SYLLABLE,
    ] {
        spaced = apply_until_stable(pass, spaced);
    }
    WHITESPACE_RUN.replace_all(&spaced, " ").trim().to_string()
}

// Matches never overlap within one sweep, so a syllable that ends one match cannot
// start the next; sweep again until nothing changes.
fn apply_until_stable(pattern: &Regex, mut text: String) -> String {
    loop {
        let next = pattern.replace_all(&text, "$1 $2").into_owned();
        if next == text {
            return text;
        }
        text = next;
    }
}

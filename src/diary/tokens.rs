/// Multiplier for Latin words: English averages a bit more than one model
/// token per word.
const WORD_TOKEN_FACTOR: f64 = 1.3;

fn is_cjk(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&ch)
}

/// Rough token estimate: CJK characters count one token each, ASCII-alphabetic
/// word runs count 1.3 each, truncated to an integer. Only used for batch
/// sizing against the provider's per-minute ceiling, never for correctness,
/// so it deliberately leans conservative on dense-script content.
pub fn estimate_tokens(text: &str) -> usize {
    let mut cjk_chars = 0usize;
    let mut words = 0usize;
    let mut in_word = false;

    for ch in text.chars() {
        if is_cjk(ch) {
            cjk_chars += 1;
            in_word = false;
        } else if ch.is_ascii_alphabetic() {
            if !in_word {
                words += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }

    cjk_chars + (words as f64 * WORD_TOKEN_FACTOR) as usize
}

#[cfg(test)]
mod tests {
    use super::estimate_tokens;

    #[test]
    fn counts_cjk_characters_individually() {
        assert_eq!(estimate_tokens("今天天气很好"), 6);
    }

    #[test]
    fn counts_latin_words_with_factor() {
        // 10 words * 1.3 = 13.0, truncated to 13.
        assert_eq!(
            estimate_tokens("one two three four five six seven eight nine ten"),
            13
        );
    }

    #[test]
    fn mixes_scripts_and_ignores_punctuation_and_digits() {
        // 4 CJK chars + 2 words * 1.3 = 4 + 2.6 -> 6.
        assert_eq!(estimate_tokens("今天 meeting 123, 很好 ok!"), 6);
    }

    #[test]
    fn empty_text_estimates_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }
}

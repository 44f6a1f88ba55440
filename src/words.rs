//! Word-frequency dictionary scoring and the greedy local refinement pass
//! that polishes a recovered key against real English words.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::alphabet;
use crate::TpResult;

const UNKNOWN_WORD_PENALTY: u64 = 10_000_000;

/// Word list ranked by frequency: line number is the rank, lower is more
/// common.
#[derive(Debug, Clone, Default)]
pub struct WordDict {
    ranks: HashMap<String, u64>,
}

impl WordDict {
    pub fn load<P: AsRef<Path>>(path: P) -> TpResult<Self> {
        Ok(Self::from_lines(&fs::read_to_string(path)?))
    }

    pub fn from_lines(text: &str) -> Self {
        let ranks = text
            .lines()
            .enumerate()
            .map(|(rank, word)| (word.trim().to_string(), rank as u64))
            .collect();
        WordDict { ranks }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// How well a candidate plaintext matches the dictionary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    /// Sum of word ranks, with a large penalty per unknown word. Lower is
    /// better.
    pub rank_sum: u64,
    /// Fraction of words found in the dictionary.
    pub matched_fraction: f64,
    /// Total number of alphabetic words seen.
    pub word_count: usize,
}

/// Score `text` against the dictionary: split into maximal alphabetic runs,
/// lowercase them, and look each up.
pub fn score_text(text: &str, dict: &WordDict) -> MatchScore {
    let mut rank_sum = 0u64;
    let mut matched = 0usize;
    let mut word_count = 0usize;

    let mut word = String::new();
    for ch in text.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_alphabetic() {
            word.push(ch.to_ascii_lowercase());
        } else if !word.is_empty() {
            match dict.ranks.get(&word) {
                Some(&rank) => {
                    rank_sum += rank;
                    matched += 1;
                }
                None => rank_sum += UNKNOWN_WORD_PENALTY,
            }
            word_count += 1;
            word.clear();
        }
    }

    let matched_fraction = if word_count == 0 {
        0.0
    } else {
        matched as f64 / word_count as f64
    };

    MatchScore {
        rank_sum,
        matched_fraction,
        word_count,
    }
}

/// True when the key value at a position deciphers to a lowercase letter.
/// The refinement pass only perturbs these positions.
fn maps_to_lowercase(value: u16) -> bool {
    alphabet::char_at(value as usize).is_ascii_lowercase()
}

/// Greedy local refinement of a decipher key.
///
/// Proposes `attempts` random swaps of two key positions whose current
/// values both decode to lowercase letters, accepting a swap only when the
/// matched-word fraction improves and the word count does not drop.
/// Returns the refined key and its final score.
pub fn refine_key(
    key: &[u16],
    ciphered: &str,
    dict: &WordDict,
    attempts: usize,
    rng: &mut fastrand::Rng,
) -> (Vec<u16>, MatchScore) {
    let mut key = key.to_vec();
    let mut score = score_text(&alphabet::apply_key(ciphered, &key), dict);
    let dim = key.len();

    for _ in 0..attempts {
        let a = rng.usize(0..dim);
        let mut b = rng.usize(0..dim - 1);
        if b >= a {
            b += 1;
        }

        if !(maps_to_lowercase(key[a]) && maps_to_lowercase(key[b])) {
            continue;
        }

        key.swap(a, b);
        let proposed = score_text(&alphabet::apply_key(ciphered, &key), dict);

        if proposed.matched_fraction > score.matched_fraction
            && proposed.word_count >= score.word_count
        {
            score = proposed;
        } else {
            key.swap(a, b);
        }
    }

    (key, score)
}

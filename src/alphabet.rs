//! Printable-ASCII cipher alphabet: the 95 characters from space (32) to
//! tilde (126), indexed `0..95`. Cipher keys are permutations over these
//! indices.

/// Number of symbols in the cipher alphabet.
pub const ALPHABET_SIZE: usize = 95;

/// Index of a character in the cipher alphabet. Characters outside the
/// printable range collapse onto index 0 (space), matching how the count
/// matrices are built.
#[inline]
pub fn index_of(ch: char) -> usize {
    let code = ch as u32;
    if (32..=126).contains(&code) {
        (code - 32) as usize
    } else {
        0
    }
}

/// Character for an alphabet index. Out-of-range indices map to space.
#[inline]
pub fn char_at(idx: usize) -> char {
    if idx < ALPHABET_SIZE {
        char::from_u32(idx as u32 + 32).unwrap_or(' ')
    } else {
        ' '
    }
}

/// Apply a key to one character: symbol `i` becomes symbol `key[i]`.
#[inline]
pub fn substitute(ch: char, key: &[u16]) -> char {
    char_at(key[index_of(ch)] as usize)
}

/// Apply a key to a whole string.
pub fn apply_key(text: &str, key: &[u16]) -> String {
    text.chars().map(|ch| substitute(ch, key)).collect()
}

/// Invert a substitution key: if `key[i] == j` then `inverse[j] == i`.
/// The decipher key of a cipher key, and vice versa.
pub fn invert_key(key: &[u16]) -> Vec<u16> {
    let mut inverse = vec![0u16; key.len()];
    for (i, &j) in key.iter().enumerate() {
        inverse[j as usize] = i as u16;
    }
    inverse
}

/// Identity key of the given dimension.
pub fn identity_key(dim: usize) -> Vec<u16> {
    (0..dim as u16).collect()
}

/// Uniformly random permutation key.
pub fn random_key(dim: usize, rng: &mut fastrand::Rng) -> Vec<u16> {
    let mut key = identity_key(dim);
    rng.shuffle(&mut key);
    key
}

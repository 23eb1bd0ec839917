//! Base-62 short code codec.
//!
//! Maps a record identifier to a short code and back. Codes are positional
//! base-62 numerals, most-significant digit first, left-padded with the zero
//! symbol (`a`) to [`MIN_CODE_LENGTH`] characters.

/// Digit alphabet: lowercase, then uppercase, then digits. Index = digit value.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Shortest code [`encode`] produces.
pub const MIN_CODE_LENGTH: usize = 6;

const BASE: u64 = ALPHABET.len() as u64;

/// Encodes an identifier as a short code.
///
/// The result is always at least [`MIN_CODE_LENGTH`] characters long and uses
/// only [`ALPHABET`] symbols.
///
/// # Examples
///
/// ```
/// use short_url::utils::codec::encode;
///
/// assert_eq!(encode(1), "aaaaab");
/// assert_eq!(encode(62), "aaaaba");
/// ```
pub fn encode(id: u64) -> String {
    let mut digits = Vec::with_capacity(MIN_CODE_LENGTH + 5);
    let mut value = id;

    while value > 0 {
        digits.push(ALPHABET[(value % BASE) as usize]);
        value /= BASE;
    }

    while digits.len() < MIN_CODE_LENGTH {
        digits.push(ALPHABET[0]);
    }

    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Decodes a short code back to its identifier.
///
/// The whole input is read as a base-62 numeral. Leading zero symbols are
/// accepted and the minimum length is not enforced, so `"b"`, `"aab"` and
/// `"aaaaab"` all decode to `1`.
///
/// Returns `None` for empty input, for any character outside [`ALPHABET`],
/// and for values that do not fit in a `u64`.
pub fn decode(code: &str) -> Option<u64> {
    if code.is_empty() {
        return None;
    }

    code.bytes().try_fold(0u64, |acc, byte| {
        let digit = digit_value(byte)?;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}

/// Returns `true` if every character of `code` is an alphabet symbol.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| digit_value(b).is_some())
}

fn digit_value(byte: u8) -> Option<u64> {
    let value = match byte {
        b'a'..=b'z' => byte - b'a',
        b'A'..=b'Z' => byte - b'A' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        _ => return None,
    };
    Some(u64::from(value))
}

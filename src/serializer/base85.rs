//! Base85 codec using the RFC 1924 alphabet
//!
//! Output is unpadded: a trailing group of `n` bytes (n < 4) encodes to `n + 1`
//! characters, so `b"123"` becomes `"F)}j"` and the empty input stays empty.

use crate::error::{Result, TraceError};

const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(4) * 5);

    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let mut acc = u32::from_be_bytes(word);

        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = ALPHABET[(acc % 85) as usize];
            acc /= 85;
        }

        for &digit in &digits[..chunk.len() + 1] {
            out.push(digit as char);
        }
    }

    out
}

pub fn decode(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 5 * 4 + 4);

    for chunk in bytes.chunks(5) {
        if chunk.len() == 1 {
            return Err(TraceError::Decode(format!(
                "base85 input has a dangling character: {text:?}"
            )));
        }

        let mut acc: u64 = 0;
        for i in 0..5 {
            let digit = match chunk.get(i) {
                Some(&c) => digit_value(c).ok_or_else(|| {
                    TraceError::Decode(format!("invalid base85 character {:?}", c as char))
                })?,
                None => 84,
            };
            acc = acc * 85 + digit as u64;
        }

        if acc > u32::MAX as u64 {
            return Err(TraceError::Decode(format!(
                "base85 group overflows 32 bits in {text:?}"
            )));
        }

        let word = (acc as u32).to_be_bytes();
        out.extend_from_slice(&word[..chunk.len() - 1]);
    }

    Ok(out)
}

fn digit_value(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u8)
}

//! ABI encoding of reporter messages.
//!
//! Two message shapes exist:
//!
//! ```text
//! price:    (string "prices", uint64 timestamp, string symbol, uint64 value)
//! rotation: (string "rotate", address newReporter)
//! ```
//!
//! Both use the standard head/tail layout: static values and string offsets
//! in 32-byte head words, string lengths and right-padded bytes in the tail.
//! Decoding validates every offset and length against the buffer and rejects
//! integers with dirty high bytes.

use alloy_primitives::Address;

use crate::{OracleError, Result};

/// Kind tag of a price report.
pub const PRICES_KIND: &str = "prices";

/// Kind tag of a reporter rotation.
pub const ROTATE_KIND: &str = "rotate";

const WORD: usize = 32;

/// Decoded body of a price message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceMessage {
    pub timestamp: u64,
    /// The symbol exactly as signed.
    pub symbol: String,
    /// 6-decimal USD value.
    pub value: u64,
}

/// Encode a price report. The symbol is uppercased.
pub fn encode_price_message(timestamp: u64, symbol: &str, value: u64) -> Vec<u8> {
    let symbol = symbol.to_uppercase();
    encode(&[
        Token::String(PRICES_KIND),
        Token::Uint(timestamp),
        Token::String(&symbol),
        Token::Uint(value),
    ])
}

/// Encode a reporter rotation naming `new_reporter`.
pub fn encode_rotation_message(new_reporter: Address) -> Vec<u8> {
    encode(&[Token::String(ROTATE_KIND), Token::Address(new_reporter)])
}

/// Decode a price message.
///
/// # Errors
///
/// - [`OracleError::MalformedMessage`] if the layout is invalid
/// - [`OracleError::InvalidMessageKind`] if the kind tag is not `"prices"`
pub fn decode_price_message(message: &[u8]) -> Result<PriceMessage> {
    let reader = Reader::new(message, 4)?;
    let kind = reader.string(0)?;
    if kind != PRICES_KIND {
        return Err(OracleError::InvalidMessageKind(kind));
    }
    Ok(PriceMessage {
        timestamp: reader.uint64(1)?,
        symbol: reader.string(2)?,
        value: reader.uint64(3)?,
    })
}

/// Decode a rotation message, returning the proposed new reporter.
///
/// # Errors
///
/// - [`OracleError::MalformedMessage`] if the layout is invalid
/// - [`OracleError::InvalidMessageKind`] if the kind tag is not `"rotate"`
pub fn decode_rotation_message(message: &[u8]) -> Result<Address> {
    let reader = Reader::new(message, 2)?;
    let kind = reader.string(0)?;
    if kind != ROTATE_KIND {
        return Err(OracleError::InvalidMessageKind(kind));
    }
    reader.address(1)
}

pub(crate) enum Token<'a> {
    Uint(u64),
    Address(Address),
    String(&'a str),
}

pub(crate) fn encode(tokens: &[Token<'_>]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Address(address) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(address.as_slice());
                head.extend_from_slice(&word);
            }
            Token::String(text) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(text.len() as u64));
                tail.extend_from_slice(text.as_bytes());
                let padding = (WORD - text.len() % WORD) % WORD;
                tail.resize(tail.len() + padding, 0);
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn malformed(reason: impl Into<String>) -> OracleError {
    OracleError::MalformedMessage(reason.into())
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], head_words: usize) -> Result<Self> {
        if data.len() < head_words * WORD {
            return Err(malformed(format!(
                "expected at least {} bytes, got {}",
                head_words * WORD,
                data.len()
            )));
        }
        Ok(Self { data })
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8]> {
        let end = offset
            .checked_add(WORD)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| malformed(format!("word at {offset} out of bounds")))?;
        Ok(&self.data[offset..end])
    }

    fn uint64(&self, index: usize) -> Result<u64> {
        word_to_u64(self.word_at(index * WORD)?)
    }

    fn address(&self, index: usize) -> Result<Address> {
        let word = self.word_at(index * WORD)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(malformed("address has dirty high bytes"));
        }
        Ok(Address::from_slice(&word[12..]))
    }

    fn string(&self, index: usize) -> Result<String> {
        let offset = usize::try_from(self.uint64(index)?)
            .map_err(|_| malformed("string offset too large"))?;
        let len = usize::try_from(word_to_u64(self.word_at(offset)?)?)
            .map_err(|_| malformed("string length too large"))?;
        let start = offset + WORD;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| malformed(format!("string of {len} bytes at {offset} out of bounds")))?;
        String::from_utf8(self.data[start..end].to_vec())
            .map_err(|_| malformed("string is not valid UTF-8"))
    }
}

fn word_to_u64(word: &[u8]) -> Result<u64> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(malformed("integer does not fit in 64 bits"));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(bytes))
}

//! Liveness challenge scheme
//!
//! When a release request names an allocated address, the server sends
//! ADDRESS_CHALLENGE(nonce) to that address and reads one byte back. The
//! nonce is the request's dispute byte.
//!
//! - A holder that still wants the address answers
//!   `crc8([key, address, nonce])`.
//! - A holder that is itself releasing answers the bitwise inverse.
//! - Anything else, including silence, marks the holder as stale.
//!
//! The verdict depends only on `(key, address, nonce, answer)`.

use lumabus_protocol::Address;

/// What the server concluded from a holder's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Holder answered correctly and keeps the address
    Live,
    /// Holder confirmed it is giving the address up
    Yielded,
    /// No answer or a wrong one
    Stale,
}

/// CRC-8, polynomial 0x07, initial value 0x00
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Answer of a holder that keeps its address
pub fn expected_response(key: u8, holder: Address, nonce: u8) -> u8 {
    crc8(&[key, holder.as_u8(), nonce])
}

/// Answer of a holder that is releasing its address
pub fn yield_response(key: u8, holder: Address, nonce: u8) -> u8 {
    !expected_response(key, holder, nonce)
}

/// Classify a challenge answer
pub fn judge(key: u8, holder: Address, nonce: u8, answer: Option<u8>) -> Verdict {
    match answer {
        Some(byte) if byte == expected_response(key, holder, nonce) => Verdict::Live,
        Some(byte) if byte == yield_response(key, holder, nonce) => Verdict::Yielded,
        _ => Verdict::Stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_check_value() {
        assert_eq!(crc8(b"123456789"), 0xF4);
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn test_judge() {
        let holder = Address::new(0x21).unwrap();
        let expected = expected_response(0x4C, holder, 7);

        assert_eq!(judge(0x4C, holder, 7, Some(expected)), Verdict::Live);
        assert_eq!(judge(0x4C, holder, 7, Some(!expected)), Verdict::Yielded);
        assert_eq!(judge(0x4C, holder, 7, Some(expected ^ 0x01)), Verdict::Stale);
        assert_eq!(judge(0x4C, holder, 7, None), Verdict::Stale);
    }

    #[test]
    fn test_answer_depends_on_key_and_address() {
        let a = Address::new(0x21).unwrap();
        let b = Address::new(0x22).unwrap();
        assert_ne!(expected_response(0x4C, a, 7), expected_response(0x4C, b, 7));
        assert_ne!(expected_response(0x4C, a, 7), expected_response(0x4D, a, 7));
    }
}

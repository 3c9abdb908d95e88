// PKCS#7 padding, plus the looser length-byte strip used on recovered
// plaintext (the attacker cannot verify pad bytes it never decrypted
// positions for, so only the length byte is range-checked).
use crate::{AttackError, BLOCK_SIZE};

pub fn pkcs7_pad(bytes: &[u8], block_size: u8) -> Vec<u8> {
    let n_pad = if bytes.len() % block_size as usize == 0 {
        block_size
    } else {
        block_size - (bytes.len() % block_size as usize) as u8
    };
    let mut out = Vec::with_capacity(bytes.len() + n_pad as usize);
    out.extend_from_slice(bytes);
    (0..n_pad).for_each(|_| out.push(n_pad));
    out
}

pub fn pkcs7_unpad(bytes: &mut Vec<u8>) -> Result<(), AttackError> {
    if let Some(n_pad) = is_pkcs7_padded(bytes) {
        bytes.truncate(bytes.len() - n_pad as usize);
        return Ok(());
    }
    Err(AttackError::Padding)
}

fn is_pkcs7_padded(bytes: &[u8]) -> Option<u8> {
    if let Some(n_pad) = bytes.last() {
        if *n_pad == 0 || *n_pad as usize > bytes.len() {
            return None;
        }
        let padded = &bytes[(bytes.len() - *n_pad as usize)..];
        if padded.iter().all(|el| el == n_pad) {
            return Some(*n_pad);
        }
    }
    None
}

/// Drop the padding from a recovered message: the final byte names the
/// number of trailing bytes to discard.
pub fn strip_padding(message: &mut Vec<u8>) -> Result<(), AttackError> {
    let n_pad = *message.last().ok_or(AttackError::Padding)? as usize;
    if n_pad == 0 || n_pad > BLOCK_SIZE || n_pad > message.len() {
        return Err(AttackError::Padding);
    }
    message.truncate(message.len() - n_pad);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("YELL", 4, "YELL\x04\x04\x04\x04")]
    #[case("YELLOWS!!!", 6, "YELLOWS!!!\x02\x02")]
    #[case("YELLOW SUBMARINE", 20, "YELLOW SUBMARINE\x04\x04\x04\x04")]
    fn pkcs7_pad_pads_message(#[case] msg: &str, #[case] block_size: u8, #[case] expected: &str) {
        let padded = pkcs7_pad(msg.as_bytes(), block_size);

        assert_eq!(padded, expected.as_bytes());
    }

    #[test]
    fn pkcs7_unpad_unpads_message() {
        let mut msg = b"ICE ICE BABY\x04\x04\x04\x04".to_vec();

        let unpadded = pkcs7_unpad(&mut msg);

        assert!(unpadded.is_ok());
        assert_eq!(msg, b"ICE ICE BABY");
    }

    #[rstest]
    #[case("ICE ICE BABY\x05\x05\x05\x05")]
    #[case("ICE ICE BABY\x01\x02\x03\x04")]
    #[case("ICE ICE BABY\x00")]
    fn pkcs7_unpad_returns_err_given_invalid_padding(#[case] padded: &str) {
        let mut msg = padded.as_bytes().to_vec();

        assert!(pkcs7_unpad(&mut msg).is_err());
    }

    #[test]
    fn strip_padding_drops_length_byte_count() {
        let mut msg = b"HELLO WORLD\x03\x01\x02\x03".to_vec();

        strip_padding(&mut msg).unwrap();

        // Only the final byte is interpreted; the pad bytes themselves are
        // not checked.
        assert_eq!(msg, b"HELLO WORLD\x03");
    }

    #[rstest]
    #[case(b"".to_vec())]
    #[case(b"AB\x00".to_vec())]
    #[case(b"AB\x11".to_vec())]
    #[case(b"AB\x05".to_vec())]
    fn strip_padding_rejects_out_of_range_lengths(#[case] mut msg: Vec<u8>) {
        assert!(matches!(strip_padding(&mut msg), Err(AttackError::Padding)));
    }
}

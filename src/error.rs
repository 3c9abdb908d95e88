use thiserror::Error;

/// Everything that can go wrong on the attacker side of the protocol.
#[derive(Debug, Error)]
pub enum AttackError {
    #[error("invalid hex string: {0}")]
    Hex(String),

    #[error("ciphertext length {0} is not a positive multiple of 16 bytes")]
    CiphertextLength(usize),

    #[error("oracle accepted no guess for byte {index} of block {block}")]
    ByteNotFound { block: usize, index: usize },

    #[error("recovered message has malformed padding")]
    Padding,

    #[error("recovered message is shorter than the {0}-byte authentication tag")]
    TagLength(usize),

    #[error("recovered plaintext is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("oracle still failing after {0} attempts")]
    OracleExhausted(usize),

    #[error("oracle rejected the unmodified ciphertext: {0}")]
    InvalidMessage(String),
}

mod attack;
mod error;
mod hex;
mod oracle;
mod padding;
pub mod server;

pub use attack::{
    decrypt_blocks, recover_message, AttackConfig, InitialCheckPolicy, Strategy, BLOCK_SIZE,
};
pub use error::AttackError;
pub use hex::{bytes_to_hex, hex_to_bytes};
pub use oracle::{HttpOracle, Oracle, OracleStatus, VerifyResponse};
pub use padding::{pkcs7_pad, pkcs7_unpad, strip_padding};

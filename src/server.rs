// A local implementation of the verification oracle, for tests and for
// running the whole attack end to end without the real endpoint.
//
// Message layout on the wire: IV | AES-128-CBC(plaintext | tag, PKCS#7),
// hex encoded. Verification decrypts, checks the padding, then checks an
// HMAC-SHA256 tag over the body. A message whose padding parses but whose
// tag does not match reports "invalid_mac" — which is exactly the signal
// the attack feeds on.
use crate::{hex_to_bytes, pkcs7_pad, pkcs7_unpad, OracleStatus, VerifyResponse, BLOCK_SIZE};

use aes::Aes128;
use axum::extract::Form;
use axum::routing::post;
use axum::{Json, Router};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::net::{TcpListener, ToSocketAddrs};

use std::sync::Arc;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Width of the HMAC-SHA256 tag appended to authenticated plaintexts.
pub const TAG_SIZE: usize = 32;

/// Serve `handler` on the verify route in a background task and return
/// the full URL to query.
pub async fn spawn_server(address: impl ToSocketAddrs, handler: &VerifyRequestHandler) -> String {
    let app = Router::new().route(
        "/verify",
        post({
            let handler = Arc::new(handler.clone());
            move |form| {
                let handler = handler.clone();
                async move { handler.handle_request(form).await }
            }
        }),
    );
    let listener = TcpListener::bind(address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/verify", addr)
}

#[derive(Debug, Clone)]
pub struct VerifyRequestHandler {
    enc_key: [u8; BLOCK_SIZE],
    /// With `None` the handler never finds a tag to accept: every
    /// well-padded message reports "invalid_mac", making it a pure
    /// padding oracle.
    mac_key: Option<Vec<u8>>,
}

impl VerifyRequestHandler {
    pub fn new(enc_key: [u8; BLOCK_SIZE], mac_key: Option<&[u8]>) -> Self {
        Self {
            enc_key,
            mac_key: mac_key.map(|k| k.to_vec()),
        }
    }

    /// Answer one POST of repeated `message` form fields with a status
    /// per message, in submission order.
    pub async fn handle_request(
        &self,
        Form(params): Form<Vec<(String, String)>>,
    ) -> Json<Vec<VerifyResponse>> {
        let statuses = params
            .iter()
            .filter(|(key, _)| key == "message")
            .map(|(_, hex)| VerifyResponse {
                status: self.verify(hex).wire().to_string(),
            })
            .collect();
        Json(statuses)
    }

    /// Classify one hex-encoded message.
    pub fn verify(&self, hex: &str) -> OracleStatus {
        let Ok(message) = hex_to_bytes(hex) else {
            return OracleStatus::Other("invalid_message".to_string());
        };
        if message.len() < 2 * BLOCK_SIZE || message.len() % BLOCK_SIZE != 0 {
            return OracleStatus::Other("invalid_message".to_string());
        }
        let (iv, ciphertext) = message.split_at(BLOCK_SIZE);
        let decryptor =
            Aes128CbcDec::new(&self.enc_key.into(), GenericArray::from_slice(iv));
        let Ok(mut plaintext) = decryptor.decrypt_padded_vec_mut::<NoPadding>(ciphertext) else {
            return OracleStatus::Other("invalid_message".to_string());
        };
        if pkcs7_unpad(&mut plaintext).is_err() {
            return OracleStatus::Other("invalid_padding".to_string());
        }
        let Some(mac_key) = &self.mac_key else {
            return OracleStatus::InvalidMac;
        };
        if plaintext.len() < TAG_SIZE {
            return OracleStatus::InvalidMac;
        }
        let (body, tag) = plaintext.split_at(plaintext.len() - TAG_SIZE);
        let mut mac = HmacSha256::new_from_slice(mac_key).expect("HMAC accepts any key length");
        mac.update(body);
        if mac.verify_slice(tag).is_ok() {
            OracleStatus::Valid
        } else {
            OracleStatus::InvalidMac
        }
    }

    /// Produce a protocol-shaped ciphertext for `plaintext`: tag it (when
    /// a MAC key is set), pad, CBC-encrypt and prepend the IV.
    pub fn encrypt_message(&self, plaintext: &[u8], iv: &[u8; BLOCK_SIZE]) -> Vec<u8> {
        let mut body = plaintext.to_vec();
        if let Some(mac_key) = &self.mac_key {
            let mut mac = HmacSha256::new_from_slice(mac_key).expect("HMAC accepts any key length");
            mac.update(plaintext);
            body.extend_from_slice(&mac.finalize().into_bytes());
        }
        let padded = pkcs7_pad(&body, BLOCK_SIZE as u8);
        let ciphertext = Aes128CbcEnc::new(&self.enc_key.into(), iv.into())
            .encrypt_padded_vec_mut::<NoPadding>(&padded);
        [iv.as_slice(), &ciphertext].concat()
    }
}

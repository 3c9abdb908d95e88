// Run a local verification oracle with demo keys, and print a ciphertext
// worth attacking:
//
//   $ cargo run --bin oracle_server
//   $ cargo run --bin decrypt -- http://127.0.0.1:9000/verify <hex>
use padding_oracle::server::VerifyRequestHandler;
use padding_oracle::{bytes_to_hex, BLOCK_SIZE};

const DEMO_MESSAGE: &[u8] = b"The secret ingredient is more padding.";

#[tokio::main]
async fn main() {
    env_logger::init();
    let handler = VerifyRequestHandler::new(*b"demo encrypt key", Some(b"demo mac key"));
    let iv: [u8; BLOCK_SIZE] = rand::random();
    println!("sample ciphertext: {}", bytes_to_hex(&handler.encrypt_message(DEMO_MESSAGE, &iv)));

    let url = padding_oracle::server::spawn_server("127.0.0.1:9000", &handler).await;
    println!("oracle listening at {url}");
    // spawn_server serves from a background task; park this one.
    std::future::pending::<()>().await;
}

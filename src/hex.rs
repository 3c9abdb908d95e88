use crate::AttackError;

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .fold(String::new(), |s, hb| s + &hb)
}

pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, AttackError> {
    if hex.len() % 2 != 0 {
        return Err(AttackError::Hex(format!(
            "odd number of hex digits ({})",
            hex.len()
        )));
    }
    let chars: Vec<char> = hex.chars().collect();
    chars.chunks(2).map(hex_item_to_byte).collect()
}

fn hex_item_to_byte(item: &[char]) -> Result<u8, AttackError> {
    let pair: String = item.iter().collect();
    u8::from_str_radix(&pair, 16).map_err(|e| AttackError::Hex(format!("'{pair}': {e}")))
}

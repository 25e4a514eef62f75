//! Hardware address generation

use rand::RngCore;

/// Random unicast, locally administered MAC in `aa:bb:cc:dd:ee:ff` form
pub fn random_mac() -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);

    // locally administered, unicast
    bytes[0] = (bytes[0] | 0x02) & 0xFE;

    format_mac(&bytes)
}

pub fn format_mac(bytes: &[u8; 6]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

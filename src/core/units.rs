/*!
 * Unit Formatting
 * Human-readable byte counts and addresses for logs and Display impls
 */

use super::types::{Address, Size};

const UNITS: [&str; 4] = ["bytes", "KiB", "MiB", "GiB"];

/// Format a byte count with binary units, at most two decimals (`1.5 MiB`)
pub fn format_bytes(bytes: Size) -> String {
    if bytes == 0 {
        return "0 bytes".to_string();
    }

    let mut unit = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }

    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Format an address as upper-case hex padded to six digits (`0x1F0000`)
pub fn format_address(address: Address) -> String {
    format!("0x{:06X}", address)
}

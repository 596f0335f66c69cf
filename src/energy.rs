//! Energy figures
//!
//! Meter registers count watt-hours. Notifications and the session log
//! show kilowatt-hours with a locale decimal separator.

/// Watt-hours as kWh text, e.g. `15000` -> `15,0`, `1234` -> `1,234`
pub fn format_kwh(raw_wh: u32, separator: char) -> String {
    let kwh = f64::from(raw_wh) / 1000.0;
    // Debug keeps a trailing ".0" on whole numbers and uses the shortest
    // representation otherwise
    format!("{:?}", kwh).replace('.', &separator.to_string())
}

/// Session energy; a zero reading is shown as a bare `0`
pub fn format_charged(raw_wh: u32, separator: char) -> String {
    if raw_wh > 0 {
        format_kwh(raw_wh, separator)
    } else {
        "0".to_string()
    }
}

/// Energy delivered since `baseline_wh`, tolerating meter resets
pub fn delivered_since(baseline_wh: u32, total_wh: u32) -> Option<u32> {
    total_wh.checked_sub(baseline_wh)
}

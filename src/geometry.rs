// Polyline geometry codec
//
// The upstream service delivers trip geometry as polyline-encoded strings
// with a precision factor of 10^6 (six decimal places), not the more common
// 10^5. Coordinates are (latitude, longitude) pairs in decimal degrees.

use crate::errors::BonusdriveError;

const PRECISION: f64 = 1e6;

/// Encodes an ordered sequence of (latitude, longitude) pairs.
pub fn encode(points: &[(f64, f64)]) -> String {
    let mut output = String::with_capacity(points.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;
    for &(latitude, longitude) in points {
        let lat = (latitude * PRECISION).round() as i64;
        let lon = (longitude * PRECISION).round() as i64;
        encode_component(lat - prev_lat, &mut output);
        encode_component(lon - prev_lon, &mut output);
        prev_lat = lat;
        prev_lon = lon;
    }
    output
}

/// Decodes a polyline string into (latitude, longitude) pairs.
///
/// An empty string decodes to an empty sequence. Truncated input, bytes
/// outside the polyline alphabet, and overlong values are all rejected.
pub fn decode(encoded: &str) -> Result<Vec<(f64, f64)>, BonusdriveError> {
    let mut bytes = encoded.bytes().peekable();
    let mut points = Vec::new();
    let mut lat = 0i64;
    let mut lon = 0i64;

    while bytes.peek().is_some() {
        lat += decode_component(&mut bytes)?;
        lon += decode_component(&mut bytes)?;
        points.push((lat as f64 / PRECISION, lon as f64 / PRECISION));
    }
    Ok(points)
}

fn encode_component(value: i64, output: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        output.push((((v & 0x1f) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    output.push((v as u8 + 63) as char);
}

fn decode_component(
    bytes: &mut std::iter::Peekable<std::str::Bytes<'_>>,
) -> Result<i64, BonusdriveError> {
    let mut result = 0i64;
    let mut shift = 0u32;
    loop {
        let byte = bytes.next().ok_or_else(|| malformed("truncated polyline"))?;
        if !(63..=126).contains(&byte) {
            return Err(malformed(&format!("byte 0x{byte:02x} outside polyline alphabet")));
        }
        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        if chunk & 0x20 == 0 {
            break;
        }
        shift += 5;
        if shift > 60 {
            return Err(malformed("polyline component overflows"));
        }
    }
    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn malformed(reason: &str) -> BonusdriveError {
    BonusdriveError::MalformedResponse {
        context: "trip geometry".to_string(),
        reason: reason.to_string(),
    }
}

//! Frame encoding and checksum validation
//!
//! Outbound frame format:
//! - 1 byte: command code
//! - N bytes: ASCII data, or a single pad byte when the command has none
//! - 1 byte: checksum (one's complement of the sum of all preceding bytes)

use super::commands::{INVALID_DATA, PAD_BYTE, SETTINGS_CONFLICT, UNRECOGNIZED_COMMAND};
use super::error::ResponseError;
use super::ProtocolError;

/// Calculate the protocol checksum of `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum: u32 = bytes.iter().map(|&b| u32::from(b)).sum();
    !(sum as u8)
}

/// Encode a command frame, padding when `data` is absent or empty
pub fn encode_command(code: u8, data: Option<&[u8]>) -> Vec<u8> {
    let data = match data {
        Some(d) if !d.is_empty() => d,
        _ => &[PAD_BYTE],
    };

    let mut frame = Vec::with_capacity(data.len() + 2);
    frame.push(code);
    frame.extend_from_slice(data);
    frame.push(checksum(&frame));
    frame
}

/// Classify the error condition carried by a response frame, if any.
///
/// Checks run in priority order: unrecognized command, invalid data,
/// settings conflict, checksum mismatch.
pub fn classify_error(frame: &[u8]) -> Option<ResponseError> {
    let (&actual, body) = frame.split_last()?;

    if frame[0] == UNRECOGNIZED_COMMAND {
        return Some(ResponseError::UnrecognizedCommand);
    }
    match frame.get(1) {
        Some(&INVALID_DATA) => return Some(ResponseError::InvalidData),
        Some(&SETTINGS_CONFLICT) => return Some(ResponseError::SettingsConflict),
        _ => {}
    }

    let expected = checksum(body);
    if expected != actual {
        return Some(ResponseError::ChecksumMismatch { expected, actual });
    }
    None
}

/// Format `value` as zero-padded ASCII digits of exactly `width` bytes
pub fn ascii_digits(value: u32, width: usize) -> Result<Vec<u8>, ProtocolError> {
    let digits = format!("{:0width$}", value, width = width);
    if digits.len() != width {
        let max = 10u32.checked_pow(width as u32).map_or(u32::MAX, |m| m - 1);
        return Err(ProtocolError::ValueOutOfRange {
            what: "ascii field",
            value,
            min: 0,
            max,
        });
    }
    Ok(digits.into_bytes())
}

/// Split a payload of concatenated `width`-digit ASCII numbers
pub fn parse_fixed_width_fields(
    payload: &[u8],
    width: usize,
) -> Result<Vec<u32>, ProtocolError> {
    if width == 0 || payload.len() % width != 0 {
        return Err(ProtocolError::MalformedPayload(format!(
            "{} bytes cannot be split into {}-digit fields",
            payload.len(),
            width
        )));
    }

    payload
        .chunks(width)
        .map(|field| {
            std::str::from_utf8(field)
                .ok()
                .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or_else(|| {
                    ProtocolError::MalformedPayload(format!("non-numeric field {:02X?}", field))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(b"Q@"), b'n');
        assert_eq!(checksum(&[0xFF, 0xFF, 0x02]), !0x00);
        assert_eq!(checksum(&[]), 0xFF);
    }

    #[test]
    fn test_encode_pads_missing_data() {
        assert_eq!(encode_command(b'Q', None), b"Q@n".to_vec());
        assert_eq!(encode_command(b'Q', Some(&[])), b"Q@n".to_vec());
    }

    #[test]
    fn test_encode_with_digits() {
        let frame = encode_command(b'@', Some(b"050"));
        assert_eq!(frame.len(), 5);
        assert_eq!(&frame[..4], b"@050");
        assert_eq!(checksum(&frame[..4]), frame[4]);
    }

    #[test]
    fn test_classify_short_frames() {
        assert_eq!(classify_error(b""), None);
        // Single byte: checksum over nothing is 0xFF
        assert_eq!(classify_error(&[0xFF]), None);
        assert_eq!(
            classify_error(&[0x00]),
            Some(ResponseError::ChecksumMismatch {
                expected: 0xFF,
                actual: 0x00
            })
        );
    }

    #[test]
    fn test_ascii_digits() {
        assert_eq!(ascii_digits(7, 3).unwrap(), b"007".to_vec());
        assert_eq!(ascii_digits(100, 3).unwrap(), b"100".to_vec());
        assert!(matches!(
            ascii_digits(1000, 3),
            Err(ProtocolError::ValueOutOfRange { max: 999, .. })
        ));
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(
            parse_fixed_width_fields(b"050000010", 3).unwrap(),
            vec![50, 0, 10]
        );
        assert!(parse_fixed_width_fields(b"05000001", 3).is_err());
        assert!(parse_fixed_width_fields(b"05a000010", 3).is_err());
        assert!(parse_fixed_width_fields(b"+50000010", 3).is_err());
    }
}

//! Fixed-layout byte image of a [`DiagnosticRecord`].
//!
//! Used when the record has to outlive a reset that does not preserve RAM, or
//! has to be handed to a host. All multi-byte fields are little-endian.
//!
//! | Offset | Size | Field                       |
//! |--------|------|-----------------------------|
//! | 0      | 4    | tag `LQDG`                  |
//! | 4      | 1    | format version              |
//! | 5      | 1    | `diag_magic`                |
//! | 6      | 1    | `boot_flag`                 |
//! | 7      | 1    | `reset_cause`               |
//! | 8      | 1    | `notify_code`               |
//! | 9      | 1    | reserved (zero)             |
//! | 10     | 2    | `comm_state`                |
//! | 12     | 2    | `ntwk_state`                |
//! | 14     | 2    | `signal_state`              |
//! | 16     | 2    | `file_id`                   |
//! | 18     | 2    | `line`                      |
//! | 20     | 4    | `pc`                        |
//! | 24     | 4    | `lr`                        |
//! | 28     | 20   | `notify_msg`                |
//! | 48     | 4    | CRC-32 of bytes 0..48       |
//!
//! The notification callback is never part of the image.

use crate::error::{DiagnosticsError, DiagnosticsResult};
use crate::record::{DiagnosticRecord, NOTIFY_MSG_LEN, NotifyMessage};

/// Size of an encoded image.
pub const IMAGE_LEN: usize = 52;

/// Leading tag of every image.
pub const IMAGE_TAG: [u8; 4] = *b"LQDG";

/// Current image format version.
pub const IMAGE_VERSION: u8 = 1;

const CRC_OFFSET: usize = IMAGE_LEN - 4;
const MSG_OFFSET: usize = 28;

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    bytes
        .get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .unwrap_or([0; N])
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(read_array(bytes, offset))
}

fn i16_at(bytes: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes(read_array(bytes, offset))
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(read_array(bytes, offset))
}

fn put(out: &mut [u8; IMAGE_LEN], offset: usize, src: &[u8]) {
    if let Some(dst) = out.get_mut(offset..offset + src.len()) {
        dst.copy_from_slice(src);
    }
}

fn byte_at(bytes: &[u8], offset: usize) -> u8 {
    bytes.get(offset).copied().unwrap_or(0)
}

impl DiagnosticRecord {
    /// Encode into the persisted image layout.
    #[must_use]
    pub fn to_image(&self) -> [u8; IMAGE_LEN] {
        let mut out = [0u8; IMAGE_LEN];
        put(&mut out, 0, &IMAGE_TAG);
        put(
            &mut out,
            4,
            &[
                IMAGE_VERSION,
                self.diag_magic,
                self.boot_flag,
                self.reset_cause,
                self.notify_code,
                0,
            ],
        );
        put(&mut out, 10, &self.comm_state.to_le_bytes());
        put(&mut out, 12, &self.ntwk_state.to_le_bytes());
        put(&mut out, 14, &self.signal_state.to_le_bytes());
        put(&mut out, 16, &self.file_id.to_le_bytes());
        put(&mut out, 18, &self.line.to_le_bytes());
        put(&mut out, 20, &self.pc.to_le_bytes());
        put(&mut out, 24, &self.lr.to_le_bytes());
        put(&mut out, MSG_OFFSET, self.notify_msg.as_bytes());

        let crc = crc32fast::hash(out.get(..CRC_OFFSET).unwrap_or_default());
        put(&mut out, CRC_OFFSET, &crc.to_le_bytes());
        out
    }

    /// Decode a persisted image.
    ///
    /// # Errors
    ///
    /// Fails if `bytes` is shorter than [`IMAGE_LEN`], carries the wrong tag
    /// or version, or its CRC does not match. Trailing bytes are ignored.
    pub fn from_image(bytes: &[u8]) -> DiagnosticsResult<Self> {
        let bytes = bytes
            .get(..IMAGE_LEN)
            .ok_or_else(|| DiagnosticsError::image_too_short(IMAGE_LEN, bytes.len()))?;

        if read_array::<4>(bytes, 0) != IMAGE_TAG {
            return Err(DiagnosticsError::BadImageTag);
        }
        let version = byte_at(bytes, 4);
        if version != IMAGE_VERSION {
            return Err(DiagnosticsError::UnsupportedImageVersion(version));
        }

        let expected = u32_at(bytes, CRC_OFFSET);
        let actual = crc32fast::hash(bytes.get(..CRC_OFFSET).unwrap_or_default());
        if expected != actual {
            return Err(DiagnosticsError::ImageChecksumMismatch { expected, actual });
        }

        Ok(Self {
            diag_magic: byte_at(bytes, 5),
            boot_flag: byte_at(bytes, 6),
            reset_cause: byte_at(bytes, 7),
            notify_code: byte_at(bytes, 8),
            comm_state: i16_at(bytes, 10),
            ntwk_state: i16_at(bytes, 12),
            signal_state: i16_at(bytes, 14),
            file_id: u16_at(bytes, 16),
            line: u16_at(bytes, 18),
            pc: u32_at(bytes, 20),
            lr: u32_at(bytes, 24),
            notify_msg: NotifyMessage::from_array(read_array::<NOTIFY_MSG_LEN>(bytes, MSG_OFFSET)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DiagnosticRecord {
        DiagnosticRecord {
            diag_magic: 0x5A,
            boot_flag: 2,
            reset_cause: 4,
            notify_code: 9,
            comm_state: 3,
            ntwk_state: -1,
            signal_state: -71,
            file_id: 0x0102,
            line: 431,
            notify_msg: NotifyMessage::from_str_truncated("MQTT DROP"),
            pc: 0x0800_1234,
            lr: 0x0800_1001,
        }
    }

    #[test]
    fn test_image_layout() {
        let image = sample().to_image();
        assert_eq!(&image[..4], b"LQDG");
        assert_eq!(image[4], IMAGE_VERSION);
        assert_eq!(&image[5..10], &[0x5A, 2, 4, 9, 0]);
        assert_eq!(&image[14..16], &(-71i16).to_le_bytes());
        assert_eq!(&image[16..18], &[0x02, 0x01]);
        assert_eq!(&image[20..24], &[0x34, 0x12, 0x00, 0x08]);
        assert_eq!(&image[28..37], b"MQTT DROP");
    }

    #[test]
    fn test_image_decodes_to_same_record() {
        let record = sample();
        assert_eq!(DiagnosticRecord::from_image(&record.to_image()), Ok(record));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut buf = [0xEEu8; IMAGE_LEN + 8];
        buf[..IMAGE_LEN].copy_from_slice(&sample().to_image());
        assert_eq!(DiagnosticRecord::from_image(&buf), Ok(sample()));
    }

    #[test]
    fn test_short_image_rejected() {
        let image = sample().to_image();
        assert_eq!(
            DiagnosticRecord::from_image(&image[..10]),
            Err(DiagnosticsError::ImageTooShort {
                expected: IMAGE_LEN,
                actual: 10
            })
        );
    }

    #[test]
    fn test_bad_tag_rejected() {
        let mut image = sample().to_image();
        image[0] = b'X';
        assert_eq!(
            DiagnosticRecord::from_image(&image),
            Err(DiagnosticsError::BadImageTag)
        );
    }

    #[test]
    fn test_version_checked_before_crc() {
        let mut image = sample().to_image();
        image[4] = 7;
        assert_eq!(
            DiagnosticRecord::from_image(&image),
            Err(DiagnosticsError::UnsupportedImageVersion(7))
        );
    }

    #[test]
    fn test_flipped_payload_bit_rejected() {
        let mut image = sample().to_image();
        image[21] ^= 0x10;
        assert!(matches!(
            DiagnosticRecord::from_image(&image),
            Err(DiagnosticsError::ImageChecksumMismatch { .. })
        ));
    }
}

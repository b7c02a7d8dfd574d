//! Minimal GGUF metadata reader.
//!
//! Only the header and the key/value section are read, and only up to the
//! `general.name` key. Tensor data is never touched.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::LaunchError;

/// "GGUF" as a little-endian u32.
const GGUF_MAGIC: u32 = 0x4655_4747;

/// Longest string read into memory; anything longer is skipped.
const MAX_STRING_LEN: u64 = 1 << 20;

/// Value type tags from the GGUF format.
const TYPE_STRING: u32 = 8;
const TYPE_ARRAY: u32 = 9;

const NAME_KEY: &str = "general.name";

/// Read `general.name` from a GGUF file, if it has one.
pub(crate) fn read_general_name(path: &Path) -> Result<Option<String>, LaunchError> {
    let file = File::open(path)?;
    general_name(&mut BufReader::new(file))
}

/// Scan the metadata section of a GGUF stream for `general.name`.
pub(crate) fn general_name<R: Read>(reader: &mut R) -> Result<Option<String>, LaunchError> {
    let magic = read_u32(reader)?;
    if magic != GGUF_MAGIC {
        return Err(LaunchError::Lookup("not a GGUF file".to_string()));
    }
    let _version = read_u32(reader)?;
    let _tensor_count = read_u64(reader)?;
    let kv_count = read_u64(reader)?;

    for _ in 0..kv_count {
        let key = read_string(reader)?;
        let value_type = read_u32(reader)?;

        if value_type == TYPE_STRING && key.as_deref() == Some(NAME_KEY) {
            return Ok(read_string(reader)?.filter(|name| !name.trim().is_empty()));
        }
        skip_value(reader, value_type)?;
    }

    Ok(None)
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a length-prefixed string. Oversized or non-UTF-8 strings yield `None`.
fn read_string<R: Read>(reader: &mut R) -> io::Result<Option<String>> {
    let len = read_u64(reader)?;
    if len > MAX_STRING_LEN {
        skip(reader, len)?;
        return Ok(None);
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf).ok())
}

fn skip<R: Read>(reader: &mut R, len: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped < len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
    }
    Ok(())
}

/// Byte width of a fixed-size value type.
fn scalar_width(value_type: u32) -> Option<u64> {
    match value_type {
        0 | 1 | 7 => Some(1), // u8, i8, bool
        2 | 3 => Some(2),     // u16, i16
        4..=6 => Some(4),     // u32, i32, f32
        10..=12 => Some(8),   // u64, i64, f64
        _ => None,
    }
}

fn skip_value<R: Read>(reader: &mut R, value_type: u32) -> Result<(), LaunchError> {
    if let Some(width) = scalar_width(value_type) {
        skip(reader, width)?;
        return Ok(());
    }
    match value_type {
        TYPE_STRING => {
            let len = read_u64(reader)?;
            skip(reader, len)?;
        }
        TYPE_ARRAY => {
            let elem_type = read_u32(reader)?;
            let count = read_u64(reader)?;
            if let Some(width) = scalar_width(elem_type) {
                let total = count.checked_mul(width).ok_or_else(|| {
                    LaunchError::Lookup("GGUF array length overflows".to_string())
                })?;
                skip(reader, total)?;
            } else {
                for _ in 0..count {
                    skip_value(reader, elem_type)?;
                }
            }
        }
        other => {
            return Err(LaunchError::Lookup(format!(
                "unknown GGUF value type {}",
                other
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Builds GGUF headers for tests.
    #[derive(Default)]
    pub(crate) struct GgufBuilder {
        entries: Vec<(String, u32, Vec<u8>)>,
    }

    fn string_bytes(s: &str) -> Vec<u8> {
        let mut out = (s.len() as u64).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    impl GgufBuilder {
        pub(crate) fn string(mut self, key: &str, value: &str) -> Self {
            self.entries
                .push((key.to_string(), TYPE_STRING, string_bytes(value)));
            self
        }

        pub(crate) fn u32(mut self, key: &str, value: u32) -> Self {
            self.entries
                .push((key.to_string(), 4, value.to_le_bytes().to_vec()));
            self
        }

        pub(crate) fn string_array(mut self, key: &str, values: &[&str]) -> Self {
            let mut payload = TYPE_STRING.to_le_bytes().to_vec();
            payload.extend_from_slice(&(values.len() as u64).to_le_bytes());
            for value in values {
                payload.extend(string_bytes(value));
            }
            self.entries.push((key.to_string(), TYPE_ARRAY, payload));
            self
        }

        pub(crate) fn f32_array(mut self, key: &str, values: &[f32]) -> Self {
            let mut payload = 6u32.to_le_bytes().to_vec();
            payload.extend_from_slice(&(values.len() as u64).to_le_bytes());
            for value in values {
                payload.extend_from_slice(&value.to_le_bytes());
            }
            self.entries.push((key.to_string(), TYPE_ARRAY, payload));
            self
        }

        pub(crate) fn build(self) -> Vec<u8> {
            let mut out = GGUF_MAGIC.to_le_bytes().to_vec();
            out.extend_from_slice(&3u32.to_le_bytes());
            out.extend_from_slice(&0u64.to_le_bytes());
            out.extend_from_slice(&(self.entries.len() as u64).to_le_bytes());
            for (key, value_type, payload) in self.entries {
                out.extend(string_bytes(&key));
                out.extend_from_slice(&value_type.to_le_bytes());
                out.extend(payload);
            }
            out
        }
    }

    fn name_of(bytes: Vec<u8>) -> Result<Option<String>, LaunchError> {
        general_name(&mut Cursor::new(bytes))
    }

    #[test]
    fn test_name_after_other_values() {
        let bytes = GgufBuilder::default()
            .string("general.architecture", "llama")
            .u32("llama.context_length", 8192)
            .f32_array("tokenizer.scores", &[0.5, -1.0, 2.0])
            .string_array("tokenizer.tokens", &["<s>", "</s>", "hello"])
            .string("general.name", "Meta Llama 3 8B Instruct")
            .build();
        assert_eq!(
            name_of(bytes).unwrap().as_deref(),
            Some("Meta Llama 3 8B Instruct")
        );
    }

    #[test]
    fn test_no_name_key() {
        let bytes = GgufBuilder::default()
            .string("general.architecture", "llama")
            .build();
        assert_eq!(name_of(bytes).unwrap(), None);
    }

    #[test]
    fn test_blank_name_is_none() {
        let bytes = GgufBuilder::default().string("general.name", "  ").build();
        assert_eq!(name_of(bytes).unwrap(), None);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = GgufBuilder::default().build();
        bytes[0] = b'X';
        assert!(matches!(name_of(bytes), Err(LaunchError::Lookup(_))));
    }

    #[test]
    fn test_truncated_file() {
        let mut bytes = GgufBuilder::default()
            .string("general.name", "Mistral 7B")
            .build();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(name_of(bytes), Err(LaunchError::Io(_))));
    }

    #[test]
    fn test_unknown_value_type() {
        let mut bytes = GgufBuilder::default().u32("odd", 1).build();
        // Rewrite the type tag of the only entry.
        let tag_offset = 24 + 8 + "odd".len();
        bytes[tag_offset..tag_offset + 4].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(name_of(bytes), Err(LaunchError::Lookup(_))));
    }
}

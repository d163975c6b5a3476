//! The write command protocol.
//!
//! Callers hand a [`WriteChunk`] to a writable stream: either raw content or a
//! [`WriteParams`] record. Records may be missing their payload (they are
//! also accepted from JSON), so every chunk is validated into a [`Command`]
//! before a sink sees it.

use bytes::Bytes;
use serde::{Deserialize, Deserializer};

use crate::blob::{Blob, File};
use crate::error::{Error, Result};

/// Tagged write record: `{"type": "write" | "seek" | "truncate", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WriteParams {
    Write {
        #[serde(default)]
        position: Option<u64>,
        #[serde(default, deserialize_with = "text_as_blob")]
        data: Option<Blob>,
    },
    Seek {
        #[serde(default)]
        position: Option<u64>,
    },
    Truncate {
        #[serde(default)]
        size: Option<u64>,
    },
}

impl WriteParams {
    /// Write at the current cursor.
    pub fn write(data: impl Into<Blob>) -> Self {
        WriteParams::Write {
            position: None,
            data: Some(data.into()),
        }
    }

    /// Move the cursor to `position`, then write.
    pub fn write_at(position: u64, data: impl Into<Blob>) -> Self {
        WriteParams::Write {
            position: Some(position),
            data: Some(data.into()),
        }
    }

    pub fn seek(position: u64) -> Self {
        WriteParams::Seek {
            position: Some(position),
        }
    }

    pub fn truncate(size: u64) -> Self {
        WriteParams::Truncate { size: Some(size) }
    }

    /// Parse a JSON write record.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Syntax(e.to_string()))
    }
}

fn text_as_blob<'de, D>(deserializer: D) -> std::result::Result<Option<Blob>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(Blob::from))
}

/// Anything a writable stream accepts.
#[derive(Debug, Clone)]
pub enum WriteChunk {
    Data(Blob),
    Params(WriteParams),
}

impl From<WriteParams> for WriteChunk {
    fn from(params: WriteParams) -> Self {
        WriteChunk::Params(params)
    }
}

impl From<Blob> for WriteChunk {
    fn from(blob: Blob) -> Self {
        WriteChunk::Data(blob)
    }
}

impl From<File> for WriteChunk {
    fn from(file: File) -> Self {
        WriteChunk::Data(file.into_blob())
    }
}

impl From<&str> for WriteChunk {
    fn from(text: &str) -> Self {
        WriteChunk::Data(Blob::from(text))
    }
}

impl From<String> for WriteChunk {
    fn from(text: String) -> Self {
        WriteChunk::Data(Blob::from(text))
    }
}

impl From<&[u8]> for WriteChunk {
    fn from(data: &[u8]) -> Self {
        WriteChunk::Data(Blob::from(data))
    }
}

impl From<Vec<u8>> for WriteChunk {
    fn from(data: Vec<u8>) -> Self {
        WriteChunk::Data(Blob::from(data))
    }
}

impl From<Bytes> for WriteChunk {
    fn from(data: Bytes) -> Self {
        WriteChunk::Data(Blob::from(data))
    }
}

/// A validated sink instruction.
#[derive(Debug, Clone)]
pub enum Command {
    /// Splice `data` in at `position` (or the cursor), advancing the cursor.
    Write { position: Option<u64>, data: Blob },
    /// Move the cursor without writing.
    Seek(u64),
    /// Shrink or zero-extend to exactly this many bytes.
    Truncate(u64),
}

impl TryFrom<WriteChunk> for Command {
    type Error = Error;

    fn try_from(chunk: WriteChunk) -> Result<Self> {
        match chunk {
            WriteChunk::Data(data) => Ok(Command::Write {
                position: None,
                data,
            }),
            WriteChunk::Params(WriteParams::Write { position, data }) => {
                let data = data.ok_or_else(|| Error::syntax("write requires a data argument"))?;
                Ok(Command::Write { position, data })
            }
            WriteChunk::Params(WriteParams::Seek { position }) => position
                .map(Command::Seek)
                .ok_or_else(|| Error::syntax("seek requires a position argument")),
            WriteChunk::Params(WriteParams::Truncate { size }) => size
                .map(Command::Truncate)
                .ok_or_else(|| Error::syntax("truncate requires a size argument")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_raw_data_is_a_write() {
        let cmd = Command::try_from(WriteChunk::from("abc")).unwrap();
        assert!(matches!(cmd, Command::Write { position: None, ref data } if data.text() == "abc"));
    }

    #[test]
    fn test_missing_payloads_are_syntax_errors() {
        let cases = [
            (r#"{"type":"write"}"#, "write requires a data argument"),
            (r#"{"type":"seek"}"#, "seek requires a position argument"),
            (r#"{"type":"truncate"}"#, "truncate requires a size argument"),
        ];
        for (json, detail) in cases {
            let params = WriteParams::from_json(json).unwrap();
            let err = Command::try_from(WriteChunk::from(params)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Syntax);
            assert!(err.to_string().ends_with(detail), "{}", err);
        }
    }

    #[test]
    fn test_json_records() {
        let params = WriteParams::from_json(r#"{"type":"write","position":2,"data":"xy"}"#).unwrap();
        match Command::try_from(WriteChunk::from(params)).unwrap() {
            Command::Write { position, data } => {
                assert_eq!(position, Some(2));
                assert_eq!(data.text(), "xy");
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let params = WriteParams::from_json(r#"{"type":"truncate","size":5}"#).unwrap();
        assert!(matches!(
            Command::try_from(WriteChunk::from(params)).unwrap(),
            Command::Truncate(5)
        ));
    }

    #[test]
    fn test_malformed_json_is_syntax_error() {
        let err = WriteParams::from_json(r#"{"type":"seek","position":-1}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        let err = WriteParams::from_json(r#"{"type":"rewind"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }
}

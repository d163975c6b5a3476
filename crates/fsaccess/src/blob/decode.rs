//! Incremental UTF-8 decoding.

/// Streaming UTF-8 decoder.
///
/// Feed chunks with [`decode`](Utf8Decoder::decode); an incomplete trailing
/// sequence is held back until the next chunk completes it. Malformed bytes
/// become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, appending complete characters to `out`.
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        if self.pending.is_empty() {
            let rest = decode_into(chunk, out);
            self.pending.extend_from_slice(rest);
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            let rest = decode_into(&joined, out);
            self.pending = rest.to_vec();
        }
    }

    /// Flush: a dangling incomplete sequence decodes to a single U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            out.push(char::REPLACEMENT_CHARACTER);
            self.pending.clear();
        }
    }
}

/// Decode as much of `input` as possible; returns the incomplete tail.
fn decode_into<'a>(mut input: &'a [u8], out: &mut String) -> &'a [u8] {
    loop {
        match std::str::from_utf8(input) {
            Ok(valid) => {
                out.push_str(valid);
                return &[];
            }
            Err(e) => {
                let (valid, rest) = input.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        input = &rest[bad..];
                    }
                    None => return rest,
                }
            }
        }
    }
}

//! Immutable, structurally shared byte sequences.
//!
//! A [`Blob`] is an ordered list of parts, each either a raw [`Bytes`] span or
//! a nested `Blob`. Slicing never copies: the result references sub-ranges of
//! the existing spans. [`File`] adds a name and a modification timestamp.
//!
//! ```text
//! Blob [ "hello " | Blob [ "wor" | "ld" ] | "!" ]
//!          slice(3..9) ──► Blob [ "lo " | Blob [ "wor" ] ]
//! ```

mod decode;
pub(crate) mod file;

pub use decode::Utf8Decoder;
pub use file::{File, FileBuilder, LastModified};

use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};

/// Chunk size used by [`Blob::stream`] for raw spans (64 KiB).
pub const POOL_SIZE: usize = 64 * 1024;

/// One element of a [`Blob`].
#[derive(Clone)]
pub enum BlobPart {
    /// Raw immutable span.
    Bytes(Bytes),
    /// Nested sequence, shared with whoever else holds it.
    Blob(Blob),
}

impl BlobPart {
    pub fn size(&self) -> u64 {
        match self {
            BlobPart::Bytes(b) => b.len() as u64,
            BlobPart::Blob(b) => b.size,
        }
    }

    fn sub(&self, start: u64, end: u64) -> BlobPart {
        match self {
            BlobPart::Bytes(b) => BlobPart::Bytes(b.slice(start as usize..end as usize)),
            BlobPart::Blob(b) => BlobPart::Blob(b.sub(start, end, String::new())),
        }
    }
}

impl fmt::Debug for BlobPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobPart::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            BlobPart::Blob(b) => f.debug_tuple("Blob").field(b).finish(),
        }
    }
}

// Borrowed inputs are copied once so later mutation of the caller's buffer
// cannot reach into the blob. Owned inputs are moved in.
impl From<&[u8]> for BlobPart {
    fn from(data: &[u8]) -> Self {
        BlobPart::Bytes(Bytes::copy_from_slice(data))
    }
}

impl<const N: usize> From<&[u8; N]> for BlobPart {
    fn from(data: &[u8; N]) -> Self {
        BlobPart::Bytes(Bytes::copy_from_slice(data))
    }
}

impl From<Vec<u8>> for BlobPart {
    fn from(data: Vec<u8>) -> Self {
        BlobPart::Bytes(Bytes::from(data))
    }
}

impl From<Bytes> for BlobPart {
    fn from(data: Bytes) -> Self {
        BlobPart::Bytes(data)
    }
}

impl From<&str> for BlobPart {
    fn from(text: &str) -> Self {
        BlobPart::Bytes(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<String> for BlobPart {
    fn from(text: String) -> Self {
        BlobPart::Bytes(Bytes::from(text.into_bytes()))
    }
}

impl From<Blob> for BlobPart {
    fn from(blob: Blob) -> Self {
        BlobPart::Blob(blob)
    }
}

impl From<&Blob> for BlobPart {
    fn from(blob: &Blob) -> Self {
        BlobPart::Blob(blob.clone())
    }
}

impl From<File> for BlobPart {
    fn from(file: File) -> Self {
        BlobPart::Blob(file.into_blob())
    }
}

/// Immutable byte sequence built from heterogeneous parts.
///
/// Cloning is cheap: the part list is reference counted.
#[derive(Clone, Default)]
pub struct Blob {
    parts: Arc<[BlobPart]>,
    size: u64,
    content_type: String,
}

impl Blob {
    /// Build a blob with an empty content type.
    pub fn new<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<BlobPart>,
    {
        Self::with_type(parts, "")
    }

    /// Build a blob with the given content type.
    ///
    /// Types containing anything outside printable ASCII are replaced by `""`.
    pub fn with_type<I, P>(parts: I, content_type: &str) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<BlobPart>,
    {
        let parts: Vec<BlobPart> = parts.into_iter().map(Into::into).collect();
        Self::from_parts(parts, sanitize_type(content_type))
    }

    fn from_parts(parts: Vec<BlobPart>, content_type: String) -> Self {
        let size = parts.iter().map(BlobPart::size).sum();
        Self {
            parts: parts.into(),
            size,
            content_type,
        }
    }

    /// Concatenate blobs into a flat part list.
    ///
    /// Nested parts are inlined rather than wrapped, so repeatedly splicing a
    /// staged buffer does not deepen the tree. Spans are still shared.
    pub(crate) fn concat<'a>(pieces: impl IntoIterator<Item = &'a Blob>) -> Self {
        let mut parts = Vec::new();
        for piece in pieces {
            parts.extend(piece.spans().filter(|s| !s.is_empty()).cloned().map(BlobPart::Bytes));
        }
        Self::from_parts(parts, String::new())
    }

    /// Zero-filled blob of `len` bytes.
    pub(crate) fn zeroed(len: u64) -> Self {
        if len == 0 {
            return Self::default();
        }
        Self::from_parts(
            vec![BlobPart::Bytes(BytesMut::zeroed(len as usize).freeze())],
            String::new(),
        )
    }

    /// Total length in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Content (MIME) type, `""` when unknown.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn parts(&self) -> &[BlobPart] {
        &self.parts
    }

    /// Sub-sequence with an empty content type. See [`Blob::slice_with_type`].
    pub fn slice(&self, range: impl RangeBounds<i64>) -> Blob {
        self.slice_with_type(range, "")
    }

    /// Sub-sequence sharing this blob's storage.
    ///
    /// Negative bounds count back from the end; all bounds are clamped to
    /// `[0, size]`. The content type is lower-cased.
    pub fn slice_with_type(&self, range: impl RangeBounds<i64>, content_type: &str) -> Blob {
        let size = self.size as i64;
        let relative = |v: i64| if v < 0 { (size + v).max(0) } else { v.min(size) };

        let start = match range.start_bound() {
            Bound::Included(&s) => relative(s),
            Bound::Excluded(&s) => (relative(s) + 1).min(size),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => (relative(e) + 1).min(size),
            Bound::Excluded(&e) => relative(e),
            Bound::Unbounded => size,
        };

        self.sub(
            start as u64,
            end.max(start) as u64,
            sanitize_type(content_type).to_ascii_lowercase(),
        )
    }

    /// Walk the parts, skipping those wholly before `start`, cutting the part
    /// that straddles each boundary and stopping once the span is filled.
    fn sub(&self, start: u64, end: u64, content_type: String) -> Blob {
        let span = end.saturating_sub(start);
        let mut relative_start = start;
        let mut relative_end = end;
        let mut added = 0u64;
        let mut parts = Vec::new();

        for part in self.parts.iter() {
            if added >= span {
                break;
            }

            let size = part.size();
            if relative_start != 0 && size <= relative_start {
                relative_start -= size;
                relative_end -= size;
            } else {
                let chunk = part.sub(relative_start, size.min(relative_end));
                added += chunk.size();
                relative_end = relative_end.saturating_sub(size);
                parts.push(chunk);
                relative_start = 0;
            }
        }

        Blob {
            parts: parts.into(),
            size: span,
            content_type,
        }
    }

    /// Raw spans in order, descending into nested blobs.
    pub fn spans(&self) -> Spans<'_> {
        Spans {
            stack: vec![self.parts.iter()],
        }
    }

    /// Decode the whole sequence as UTF-8.
    ///
    /// Multi-byte characters split across part boundaries are preserved;
    /// malformed input decodes to U+FFFD.
    pub fn text(&self) -> String {
        let mut decoder = Utf8Decoder::new();
        let mut out = String::with_capacity(self.size as usize);
        for span in self.spans() {
            decoder.decode(span, &mut out);
        }
        decoder.finish(&mut out);
        out
    }

    /// Materialize the sequence into one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        // A single span can be handed out without copying.
        if let [BlobPart::Bytes(only)] = &self.parts[..] {
            return only.clone();
        }
        let mut data = BytesMut::with_capacity(self.size as usize);
        for span in self.spans() {
            data.extend_from_slice(span);
        }
        data.freeze()
    }

    /// Materialize into a `Vec<u8>`.
    pub fn array_buffer(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.size as usize];
        let mut offset = 0;
        for span in self.spans() {
            data[offset..offset + span.len()].copy_from_slice(span);
            offset += span.len();
        }
        data
    }

    /// Lazily yield the content chunk by chunk.
    ///
    /// Raw spans are cut into [`POOL_SIZE`] pieces; nested blobs delegate to
    /// their own stream. Chunks share storage with the blob.
    pub fn stream(&self) -> BoxStream<'static, Bytes> {
        let parts = Arc::clone(&self.parts);
        stream::iter(0..parts.len())
            .flat_map(move |i| match &parts[i] {
                BlobPart::Bytes(span) => stream::iter(pool_chunks(span)).boxed(),
                BlobPart::Blob(nested) => nested.stream(),
            })
            .boxed()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("size", &self.size)
            .field("type", &self.content_type)
            .field("parts", &self.parts.len())
            .finish()
    }
}

impl From<&str> for Blob {
    fn from(text: &str) -> Self {
        Blob::new([text])
    }
}

impl From<String> for Blob {
    fn from(text: String) -> Self {
        Blob::new([text])
    }
}

impl From<Vec<u8>> for Blob {
    fn from(data: Vec<u8>) -> Self {
        Blob::new([data])
    }
}

impl From<&[u8]> for Blob {
    fn from(data: &[u8]) -> Self {
        Blob::new([data])
    }
}

impl From<Bytes> for Blob {
    fn from(data: Bytes) -> Self {
        Blob::new([data])
    }
}

impl From<File> for Blob {
    fn from(file: File) -> Self {
        file.into_blob()
    }
}

/// Depth-first iterator over the raw spans of a [`Blob`].
pub struct Spans<'a> {
    stack: Vec<std::slice::Iter<'a, BlobPart>>,
}

impl<'a> Iterator for Spans<'a> {
    type Item = &'a Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(BlobPart::Bytes(span)) => return Some(span),
                Some(BlobPart::Blob(nested)) => self.stack.push(nested.parts.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

fn pool_chunks(span: &Bytes) -> Vec<Bytes> {
    (0..span.len())
        .step_by(POOL_SIZE)
        .map(|offset| span.slice(offset..(offset + POOL_SIZE).min(span.len())))
        .collect()
}

fn sanitize_type(content_type: &str) -> String {
    if content_type.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        content_type.to_string()
    } else {
        String::new()
    }
}

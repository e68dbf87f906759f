//! Attachments and their content sources.

use mailforge_mime::{ContentType, Headers, Part};
use std::borrow::Cow;
use std::path::PathBuf;

/// Prefix for names given to attachments without a file name.
pub const FALLBACK_FILENAME_PREFIX: &str = "file_";

/// Where an attachment's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// A file read from disk at build time.
    FilePath(PathBuf),
    /// Content already in memory.
    Bytes(Vec<u8>),
}

/// One file to attach to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Display file name. Empty means "use a positional fallback".
    pub filename: String,
    /// Content source.
    pub source: AttachmentSource,
}

impl Attachment {
    /// Creates an attachment read from `path` when the message is built.
    #[must_use]
    pub fn from_path(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            source: AttachmentSource::FilePath(path.into()),
        }
    }

    /// Creates an attachment from in-memory content.
    #[must_use]
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            source: AttachmentSource::Bytes(bytes.into()),
        }
    }

    /// Returns true if the source can supply content: the file exists, or
    /// the in-memory content is non-empty.
    #[must_use]
    pub fn has_source(&self) -> bool {
        match &self.source {
            AttachmentSource::FilePath(path) => path.exists(),
            AttachmentSource::Bytes(bytes) => !bytes.is_empty(),
        }
    }

    /// Returns the name used in the message for the attachment at `index`.
    #[must_use]
    pub fn resolved_filename(&self, index: usize) -> Cow<'_, str> {
        if self.filename.is_empty() {
            Cow::Owned(format!("{FALLBACK_FILENAME_PREFIX}{index}"))
        } else {
            Cow::Borrowed(&self.filename)
        }
    }

    /// Builds the MIME part for the attachment at `index`.
    ///
    /// File-backed parts get a content type inferred from the file name;
    /// in-memory parts are `application/octet-stream`.
    pub(crate) fn to_part(&self, index: usize) -> mailforge_mime::Result<Part> {
        let filename = self.resolved_filename(index);
        Headers::check_value("filename", &filename)?;

        match &self.source {
            AttachmentSource::FilePath(path) => Part::from_file(path, &filename),
            AttachmentSource::Bytes(bytes) => Ok(Part::attachment(
                &filename,
                ContentType::octet_stream(),
                bytes,
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_filename_fallback() {
        let unnamed = Attachment::from_bytes("", b"data".to_vec());
        assert_eq!(unnamed.resolved_filename(3), "file_3");

        let named = Attachment::from_bytes("notes.txt", b"data".to_vec());
        assert_eq!(named.resolved_filename(3), "notes.txt");
    }

    #[test]
    fn test_has_source() {
        assert!(Attachment::from_bytes("a", vec![1]).has_source());
        assert!(!Attachment::from_bytes("a", Vec::new()).has_source());
        assert!(!Attachment::from_path("a", "/no/such/file.bin").has_source());
        assert!(!Attachment::from_path("a", PathBuf::new()).has_source());
    }

    #[test]
    fn test_bytes_part_is_octet_stream() {
        let part = Attachment::from_bytes("", vec![1, 2, 3]).to_part(0).unwrap();

        assert_eq!(part.filename().as_deref(), Some("file_0"));
        assert_eq!(
            part.content_type().unwrap().essence(),
            "application/octet-stream"
        );
        assert_eq!(part.decode_body().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_filename_with_line_break_is_rejected() {
        let attachment = Attachment::from_bytes("a\r\nb.txt", vec![1]);
        assert!(attachment.to_part(0).is_err());
    }
}

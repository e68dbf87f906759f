//! # mailforge
//!
//! Fluent builder that assembles a multipart MIME email message (sender,
//! recipient, subject, plain-text or HTML body, optional attachments) for
//! handoff to whatever transport the caller uses.
//!
//! Encoding, boundaries and serialization are handled by
//! [`mailforge_mime`]; this crate only decides what goes into the message.
//!
//! ## Quick Start
//!
//! ```
//! use mailforge::{Attachment, MessageBuilder, Session};
//!
//! let session = Session::new("mail.example.com");
//!
//! let message = MessageBuilder::new()
//!     .from("Build Bot <bot@example.com>")
//!     .to("team@example.com")
//!     .subject("Nightly report")
//!     .text("Everything passed.")
//!     .attachments(vec![
//!         Attachment::from_bytes("summary.txt", "42 tests, 0 failures"),
//!         Attachment::from_path("coverage.html", "/tmp/does-not-exist.html"),
//!     ])
//!     .build(&session)?;
//!
//! // The missing file is skipped, the in-memory attachment is kept.
//! assert_eq!(message.attachments().count(), 1);
//!
//! let wire = message.to_bytes()?;
//! assert!(wire.starts_with(b"From: Build Bot <bot@example.com>\r\n"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Attachment sources
//!
//! An [`Attachment`] is either a file path ([`AttachmentSource::FilePath`])
//! read at build time, or bytes already in memory
//! ([`AttachmentSource::Bytes`]). A path that does not exist, or empty
//! bytes, means the attachment is skipped. This is not an error; the skip is
//! logged through `tracing` at `warn` (missing file) or `debug` (empty
//! content) level.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod builder;
mod error;
mod session;

pub use attachment::{Attachment, AttachmentSource, FALLBACK_FILENAME_PREFIX};
pub use builder::{BodyKind, MessageBuilder};
pub use error::{Error, ErrorKind, Field, Result};
pub use session::{DEFAULT_HOSTNAME, Session};

pub use mailforge_mime::Message;

//! # mailforge-mime
//!
//! MIME message model and serialization used by `mailforge`.
//!
//! ## Features
//!
//! - **Message model**: headers, parts and multipart/mixed assembly
//! - **Serialization**: RFC 5322 output with CRLF line endings
//! - **Encoding/Decoding**: Base64, Quoted-Printable, RFC 2047 header
//!   encoding, RFC 2231 parameter encoding
//! - **Content types**: parsing, display and inference from file names
//! - **Addresses**: mailbox parsing with optional display names
//! - **serde** (optional feature): `Serialize`/`Deserialize` for the model
//!   types; addresses are validated when deserialized
//!
//! ## Quick Start
//!
//! ```
//! use mailforge_mime::{ContentType, Headers, Message, Part};
//!
//! let mut headers = Headers::new();
//! headers.add("from", "sender@example.com");
//! headers.add("to", "recipient@example.com");
//! headers.add("subject", "Test");
//!
//! let mut message = Message::mixed(headers);
//! message.push_part(Part::text("Hello, World!", &ContentType::text_plain()));
//! message.push_part(Part::attachment(
//!     "data.bin",
//!     ContentType::octet_stream(),
//!     &[0, 1, 2, 3],
//! ));
//!
//! let wire = message.to_bytes()?;
//! assert!(wire.starts_with(b"From: sender@example.com\r\n"));
//! # Ok::<(), mailforge_mime::Error>(())
//! ```
//!
//! ### Encoding/Decoding
//!
//! ```
//! use mailforge_mime::encoding::{decode_rfc2047, encode_quoted_printable, encode_rfc2047};
//!
//! let encoded = encode_quoted_printable("Héllo, Wørld!");
//! assert!(encoded.contains("=C3=A9"));
//!
//! let subject = encode_rfc2047("Héllo", "utf-8")?;
//! assert_eq!(decode_rfc2047(&subject)?, "Héllo");
//! # Ok::<(), mailforge_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod disposition;
mod error;
mod header;
mod message;
mod params;

pub mod encoding;

pub use address::{Address, Mailbox};
pub use content_type::ContentType;
pub use disposition::{ContentDisposition, DispositionKind};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding, generate_boundary, generate_message_id};
pub use params::Parameters;

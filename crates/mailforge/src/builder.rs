//! Fluent message builder.

use crate::attachment::{Attachment, AttachmentSource};
use crate::error::{Error, Field, Result};
use crate::session::Session;
use chrono::Local;
use mailforge_mime::{ContentType, Headers, Mailbox, Message, Part, generate_message_id};
use tracing::{debug, warn};

/// Kind of the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    /// `text/plain`.
    #[default]
    Plain,
    /// `text/html`.
    Html,
}

/// Accumulates message fields and assembles a `multipart/mixed` message.
///
/// Setters never validate; all checks happen in [`MessageBuilder::build`].
///
/// ```
/// use mailforge::{Attachment, MessageBuilder, Session};
///
/// let message = MessageBuilder::new()
///     .from("sender@example.com")
///     .to("recipient@example.com")
///     .subject("Quarterly numbers")
///     .html("<p>See attached.</p>")
///     .attach(Attachment::from_bytes("numbers.csv", "q,total\n1,42\n"))
///     .build(&Session::default())?;
///
/// assert_eq!(message.parts.len(), 2);
/// # Ok::<(), mailforge::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Option<String>,
    subject: Option<String>,
    body: Option<String>,
    body_kind: BodyKind,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Sets the recipient address.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to = Some(address.into());
        self
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets a plain-text body.
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.body_kind = BodyKind::Plain;
        self
    }

    /// Sets an HTML body.
    #[must_use]
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.body_kind = BodyKind::Html;
        self
    }

    /// Replaces the attachment list.
    ///
    /// An optional list can be passed as `list.into_iter().flatten()`;
    /// `None` then clears the attachments.
    #[must_use]
    pub fn attachments<I>(mut self, attachments: I) -> Self
    where
        I: IntoIterator<Item = Attachment>,
    {
        self.attachments = attachments.into_iter().collect();
        self
    }

    /// Appends one attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Returns the current body kind.
    #[must_use]
    pub const fn body_kind(&self) -> BodyKind {
        self.body_kind
    }

    /// Assembles the message.
    ///
    /// The result is `multipart/mixed`: one body part followed by one part
    /// per attachment, in order. Attachments whose source is missing (a path
    /// that does not exist, or empty content) are skipped without error;
    /// unnamed attachments are called `file_<index>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if from, to, subject or body is unset,
    /// before anything is constructed. Returns [`Error::Construction`] if an
    /// address is invalid, a header value contains a line break, or an
    /// attachment file cannot be read.
    pub fn build(&self, session: &Session) -> Result<Message> {
        let from = require(self.from.as_deref(), Field::From)?;
        let to = require(self.to.as_deref(), Field::To)?;
        let subject = require(self.subject.as_deref(), Field::Subject)?;
        let body = require(self.body.as_deref(), Field::Body)?;

        Headers::check_value("from", from)?;
        Headers::check_value("to", to)?;
        Headers::check_value("subject", subject)?;
        let sender = Mailbox::parse(from)?;
        Mailbox::parse(to)?;

        let mut headers = Headers::new();
        headers.add("from", from);
        headers.add("to", to);
        headers.add("subject", subject);
        headers.add(
            "message-id",
            generate_message_id(session.message_id_domain(sender.address.domain())),
        );
        if let Some(mailer) = &session.mailer {
            Headers::check_value("x-mailer", mailer)?;
            headers.add("x-mailer", mailer.as_str());
        }

        let mut message = Message::mixed(headers);
        if session.include_date {
            message.set_date(&Local::now());
        }

        message.push_part(self.body_part(body));

        for (index, attachment) in self.attachments.iter().enumerate() {
            if !attachment.has_source() {
                match &attachment.source {
                    AttachmentSource::FilePath(path) => warn!(
                        index,
                        path = %path.display(),
                        "Skipping attachment, file does not exist"
                    ),
                    AttachmentSource::Bytes(_) => {
                        debug!(index, "Skipping attachment with empty content");
                    }
                }
                continue;
            }
            message.push_part(attachment.to_part(index)?);
        }

        debug!(
            parts = message.parts.len(),
            kind = ?self.body_kind,
            "Assembled message"
        );
        Ok(message)
    }

    fn body_part(&self, body: &str) -> Part {
        let content_type = match self.body_kind {
            BodyKind::Plain => ContentType::text_plain(),
            BodyKind::Html => ContentType::text_html(),
        };
        Part::text(body, &content_type)
    }
}

fn require(value: Option<&str>, field: Field) -> Result<&str> {
    value.ok_or(Error::MissingField(field))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::needless_collect,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn complete() -> MessageBuilder {
        MessageBuilder::new()
            .from("sender@example.com")
            .to("recipient@example.com")
            .subject("Status")
            .text("All good.")
    }

    fn session() -> Session {
        Session::new("mx.example.com").with_date(false)
    }

    #[test]
    fn test_build_headers() {
        let message = complete().build(&session()).unwrap();

        assert_eq!(message.from(), Some("sender@example.com"));
        assert_eq!(message.to(), Some("recipient@example.com"));
        assert_eq!(message.subject(), Some("Status"));
        assert!(message.message_id().unwrap().ends_with("@mx.example.com>"));
        assert!(message.date().is_none());
        assert!(message.is_multipart().unwrap());
    }

    #[test]
    fn test_plain_body_part() {
        let message = complete().build(&session()).unwrap();

        assert_eq!(message.parts.len(), 1);
        let ct = message.parts[0].content_type().unwrap();
        assert_eq!(ct.essence(), "text/plain");
        assert_eq!(ct.charset(), Some("UTF-8"));
        assert_eq!(message.text_part().unwrap(), "All good.");
    }

    #[test]
    fn test_html_body_part() {
        let message = complete().html("<b>All good.</b>").build(&session()).unwrap();

        let content_type = message.parts[0].headers.get("content-type").unwrap();
        assert!(content_type.contains("text/html"));
        assert!(content_type.contains("UTF-8"));
        assert_eq!(message.html_part().unwrap(), "<b>All good.</b>");
    }

    #[test]
    fn test_last_body_setter_wins() {
        let builder = complete().html("<i>x</i>").text("plain again");
        assert_eq!(builder.body_kind(), BodyKind::Plain);

        let message = builder.build(&session()).unwrap();
        assert_eq!(message.text_part().unwrap(), "plain again");
    }

    #[test]
    fn test_missing_fields_in_order() {
        let err = MessageBuilder::new().build(&session()).unwrap_err();
        assert_eq!(err.missing_field(), Some(Field::From));

        let err = MessageBuilder::new()
            .from("a@example.com")
            .build(&session())
            .unwrap_err();
        assert_eq!(err.missing_field(), Some(Field::To));

        let err = MessageBuilder::new()
            .from("a@example.com")
            .to("b@example.com")
            .build(&session())
            .unwrap_err();
        assert_eq!(err.missing_field(), Some(Field::Subject));

        let err = MessageBuilder::new()
            .from("a@example.com")
            .to("b@example.com")
            .subject("s")
            .build(&session())
            .unwrap_err();
        assert_eq!(err.missing_field(), Some(Field::Body));
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
    }

    #[test]
    fn test_missing_field_checked_before_address() {
        let err = MessageBuilder::new()
            .from("not an address")
            .subject("s")
            .text("b")
            .build(&session())
            .unwrap_err();
        assert_eq!(err.missing_field(), Some(Field::To));
    }

    #[test]
    fn test_invalid_sender() {
        let err = complete().from("nobody").build(&session()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MessageConstructionFailure);
    }

    #[test]
    fn test_subject_injection_rejected() {
        let err = complete()
            .subject("Hi\r\nBcc: someone@example.com")
            .build(&session())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Construction(mailforge_mime::Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_address_line_breaks_rejected() {
        let err = complete()
            .to("recipient@example.com\r\n")
            .build(&session())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Construction(mailforge_mime::Error::InvalidHeader(_))
        ));

        let err = complete()
            .from("sender@example.com\nBcc: x@example.com")
            .build(&session())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MessageConstructionFailure);
    }

    #[test]
    fn test_unquoted_list_recipient_rejected() {
        for to in ["Doe, John <j@example.com>", "Zoë, X <z@example.com>"] {
            let err = complete().to(to).build(&session()).unwrap_err();
            assert!(matches!(
                err,
                Error::Construction(mailforge_mime::Error::InvalidAddress(_))
            ));
        }
    }

    #[test]
    fn test_message_id_falls_back_to_sender_domain() {
        let message = complete().build(&Session::new("")).unwrap();
        assert!(message.message_id().unwrap().ends_with("@example.com>"));
    }

    #[test]
    fn test_session_mailer_and_date() {
        let session = Session::new("mx.example.com").with_mailer("mailforge-tests");
        let message = complete().build(&session).unwrap();

        assert_eq!(message.headers.get("x-mailer"), Some("mailforge-tests"));
        assert!(message.date().is_some());
    }

    #[test]
    fn test_attachment_order_and_fallback_names() {
        let message = complete()
            .attachments(vec![
                Attachment::from_bytes("", b"first".to_vec()),
                Attachment::from_bytes("report.pdf", b"second".to_vec()),
            ])
            .build(&session())
            .unwrap();

        let names: Vec<String> = message
            .attachments()
            .map(|part| part.filename().unwrap())
            .collect();
        assert_eq!(names, vec!["file_0", "report.pdf"]);
    }

    #[test]
    fn test_skipped_attachment_keeps_index() {
        let message = complete()
            .attachments(vec![
                Attachment::from_bytes("empty.bin", Vec::new()),
                Attachment::from_bytes("", b"content".to_vec()),
            ])
            .build(&session())
            .unwrap();

        let names: Vec<String> = message
            .attachments()
            .map(|part| part.filename().unwrap())
            .collect();
        assert_eq!(names, vec!["file_1"]);
    }

    #[test]
    fn test_absent_attachment_list() {
        let none: Option<Vec<Attachment>> = None;
        let message = complete()
            .attach(Attachment::from_bytes("dropped.txt", b"x".to_vec()))
            .attachments(none.into_iter().flatten())
            .build(&session())
            .unwrap();

        assert_eq!(message.parts.len(), 1);
    }

    #[test]
    fn test_build_twice_is_equivalent() {
        let builder = complete().attach(Attachment::from_bytes("a.bin", vec![7; 64]));

        let first = builder.build(&session()).unwrap();
        let second = builder.build(&session()).unwrap();

        assert_eq!(first.from(), second.from());
        assert_eq!(first.to(), second.to());
        assert_eq!(first.subject(), second.subject());
        assert_eq!(first.parts, second.parts);
    }
}

//! Integration tests for message assembly.
//!
//! File-backed attachments are written to temporary directories; the
//! assembled messages are checked both as object graphs and as serialized
//! RFC 5322 text.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::sync::Once;

use mailforge::{Attachment, ErrorKind, Field, MessageBuilder, Session};
use mailforge_mime::{Headers, TransferEncoding};
use proptest::prelude::*;
use tempfile::TempDir;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("mailforge=debug"))
            .with_test_writer()
            .try_init();
    });
}

fn base() -> MessageBuilder {
    MessageBuilder::new()
        .from("sender@example.com")
        .to("recipient@example.com")
        .subject("Files")
        .text("See attachments.")
}

fn session() -> Session {
    Session::new("mx.example.com")
}

#[test]
fn test_file_attachments_named_in_order() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    let report = dir.path().join("report.pdf");
    fs::write(&notes, "remember the milk").unwrap();
    fs::write(&report, b"%PDF-1.4 fake").unwrap();

    let message = base()
        .attachments(vec![
            Attachment::from_path("", &notes),
            Attachment::from_path("report.pdf", &report),
        ])
        .build(&session())
        .unwrap();

    assert_eq!(message.parts.len(), 3);
    let attachments: Vec<_> = message.attachments().collect();
    assert_eq!(attachments[0].filename().as_deref(), Some("file_0"));
    assert_eq!(attachments[1].filename().as_deref(), Some("report.pdf"));

    // Content type comes from the file, not the display name
    assert_eq!(
        attachments[0].content_type().unwrap().essence(),
        "text/plain"
    );
    assert_eq!(
        attachments[1].content_type().unwrap().essence(),
        "application/pdf"
    );
    assert_eq!(attachments[0].decode_body().unwrap(), b"remember the milk");
    assert_eq!(attachments[1].transfer_encoding(), TransferEncoding::Base64);
}

#[test]
fn test_missing_sources_are_skipped() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let kept = dir.path().join("kept.csv");
    fs::write(&kept, "a,b\n1,2\n").unwrap();

    let message = base()
        .attachments(vec![
            Attachment::from_path("ghost.txt", dir.path().join("ghost.txt")),
            Attachment::from_bytes("empty.bin", Vec::new()),
            Attachment::from_path("kept.csv", &kept),
        ])
        .build(&session())
        .unwrap();

    let names: Vec<String> = message
        .attachments()
        .map(|part| part.filename().unwrap())
        .collect();
    assert_eq!(names, vec!["kept.csv"]);
}

#[test]
fn test_unreadable_path_fails_build() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    // A directory exists but cannot be read as a file
    let err = base()
        .attach(Attachment::from_path("dir", dir.path()))
        .build(&session())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MessageConstructionFailure);
    assert!(matches!(
        err,
        mailforge::Error::Construction(mailforge_mime::Error::Io(_))
    ));
}

#[test]
fn test_no_attachments_only_body() {
    let message = base().build(&session()).unwrap();
    assert_eq!(message.parts.len(), 1);
    assert_eq!(message.attachments().count(), 0);
}

#[test]
fn test_invalid_recipient_wraps_cause() {
    let err = base().to("not-an-address").build(&session()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MessageConstructionFailure);
    let cause = std::error::Error::source(&err).unwrap();
    assert!(cause.to_string().contains("not-an-address"));
}

#[test]
fn test_missing_body() {
    let err = MessageBuilder::new()
        .from("sender@example.com")
        .to("recipient@example.com")
        .subject("No body")
        .build(&session())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
    assert_eq!(err.missing_field(), Some(Field::Body));
}

#[test]
fn test_serialized_message() {
    let message = MessageBuilder::new()
        .from("Zoë Sender <zoe@example.com>")
        .to("recipient@example.com")
        .subject("Grüße aus Köln")
        .html("<p>Schöne Grüße</p>")
        .attach(Attachment::from_bytes("größe.bin", vec![0_u8, 159, 146, 150]))
        .build(&session())
        .unwrap();

    let boundary = message
        .content_type()
        .unwrap()
        .boundary()
        .unwrap()
        .to_string();
    let wire = String::from_utf8(message.to_bytes().unwrap()).unwrap();

    assert!(wire.is_ascii());
    assert!(wire.contains("MIME-Version: 1.0\r\n"));
    assert!(wire.contains("Content-Type: text/html; charset=UTF-8\r\n"));
    assert!(wire.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
    assert!(wire.contains("filename*=utf-8''gr%C3%B6%C3%9Fe.bin"));
    assert_eq!(wire.matches(&format!("--{boundary}\r\n")).count(), 2);
    assert!(wire.ends_with(&format!("--{boundary}--\r\n")));

    let headers = Headers::parse(&wire);
    assert_eq!(
        Headers::decode_value(headers.get("subject").unwrap()).unwrap(),
        "Grüße aus Köln"
    );
    assert!(headers.get("from").unwrap().ends_with("<zoe@example.com>"));
}

#[test]
fn test_long_headers_stay_within_line_limit() {
    let subject = "status ".repeat(250).trim_end().to_string();
    let filename = format!("{}.txt", "quarterly-report-".repeat(20));
    let message = base()
        .subject(&subject)
        .attach(Attachment::from_bytes(filename.as_str(), b"totals".to_vec()))
        .build(&session())
        .unwrap();

    let wire = String::from_utf8(message.to_bytes().unwrap()).unwrap();
    assert!(wire.split("\r\n").all(|line| line.len() <= 998));
    assert_eq!(Headers::parse(&wire).get("subject"), Some(subject.as_str()));

    let attachment = message.attachments().next().unwrap();
    assert_eq!(attachment.filename().as_deref(), Some(filename.as_str()));
}

#[test]
fn test_multiline_plain_body() {
    let message = base()
        .text("line one\nline two\n")
        .build(&session())
        .unwrap();

    assert_eq!(message.text_part().unwrap(), "line one\r\nline two\r\n");
}

proptest! {
    #[test]
    fn headers_match_inputs(
        from in "[a-z][a-z0-9._]{0,15}@[a-z]{1,12}\\.(com|org|net)",
        to in "[a-z][a-z0-9._]{0,15}@[a-z]{1,12}\\.(com|org|net)",
        subject in "[^\r\n]{0,80}",
        body in "[^\r]{0,200}",
        html in any::<bool>(),
    ) {
        let builder = MessageBuilder::new().from(&from).to(&to).subject(&subject);
        let builder = if html { builder.html(&body) } else { builder.text(&body) };

        let message = builder.build(&Session::default().with_date(false)).unwrap();

        prop_assert_eq!(message.from(), Some(from.as_str()));
        prop_assert_eq!(message.to(), Some(to.as_str()));
        prop_assert_eq!(message.subject(), Some(subject.as_str()));
        prop_assert_eq!(message.parts.len(), 1);
        prop_assert_eq!(message.parts[0].body_text().unwrap(), body.replace('\n', "\r\n"));
        prop_assert!(message.to_bytes().is_ok());
    }
}

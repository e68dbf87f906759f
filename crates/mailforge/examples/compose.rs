//! Assemble a message from command-line arguments and print it.
//!
//! Usage:
//!   cargo run --example compose -- <from> <to> <subject> <body> [attachment paths...]
//!
//! Set `RUST_LOG=mailforge=debug` to see which attachments were skipped.

use std::path::Path;

use anyhow::{Context, bail};
use mailforge::{Attachment, MessageBuilder, Session};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailforge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [from, to, subject, body, paths @ ..] = args.as_slice() else {
        bail!("usage: compose <from> <to> <subject> <body> [attachment paths...]");
    };

    let attachments = paths.iter().map(|path| {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Attachment::from_path(name, path)
    });

    let builder = MessageBuilder::new()
        .from(from)
        .to(to)
        .subject(subject)
        .attachments(attachments);
    let builder = if body.trim_start().starts_with('<') {
        builder.html(body)
    } else {
        builder.text(body)
    };

    let session = Session::default().with_mailer(concat!("mailforge/", env!("CARGO_PKG_VERSION")));
    let message = builder.build(&session).context("failed to build message")?;
    info!(parts = message.parts.len(), "Built message");

    let wire = message.to_bytes().context("failed to serialize message")?;
    print!("{}", String::from_utf8_lossy(&wire));

    Ok(())
}

//! Export the terms of a glossary as CSV with the async `GlossaryClient`.
//!
//! Run:
//! `GLOSSARY_ENDPOINT=... GLOSSARY_ACCESS_TOKEN=<token> GLOSSARY_GUID=<guid> cargo run --example async_export_terms -- <term-guid>...`
//!
//! The CSV is streamed to stdout.

use std::io::Write;

use futures::TryStreamExt;
use glossary_client::{DEFAULT_API_VERSION, GlossaryClient, OperationCall, ReqwestTransport, ops};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (Ok(endpoint), Ok(token), Ok(glossary_guid)) = (
        std::env::var("GLOSSARY_ENDPOINT"),
        std::env::var("GLOSSARY_ACCESS_TOKEN"),
        std::env::var("GLOSSARY_GUID"),
    ) else {
        eprintln!("Set GLOSSARY_ENDPOINT, GLOSSARY_ACCESS_TOKEN and GLOSSARY_GUID first.");
        std::process::exit(2);
    };
    let term_guids: Vec<String> = std::env::args().skip(1).collect();

    let transport = ReqwestTransport::new().with_authorization_token(token);
    let client =
        GlossaryClient::with_transport(endpoint, transport)?.with_api_version(DEFAULT_API_VERSION);

    let call = OperationCall::new(ops::EXPORT_GLOSSARY_TERMS_AS_CSV)
        .path_param("glossaryGuid", glossary_guid)
        .json_body(&term_guids)?;
    let mut body = client.invoke_streaming(call).await?.body;

    let mut stdout = std::io::stdout().lock();
    while let Some(chunk) = body.try_next().await? {
        stdout.write_all(&chunk)?;
    }
    Ok(())
}

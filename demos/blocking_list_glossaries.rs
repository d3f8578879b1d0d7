//! List glossaries with the `BlockingGlossaryClient`.
//!
//! Run:
//! `GLOSSARY_ENDPOINT=https://<account>.purview.azure.com/catalog/api GLOSSARY_ACCESS_TOKEN=<token> cargo run --example blocking_list_glossaries`
//!
//! Optional env vars:
//! - `GLOSSARY_LIMIT` (defaults to `5`)

use glossary_client::{
    BlockingGlossaryClient, OperationCall, ReqwestTransport, ops, unwrap_json,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Ok(endpoint) = std::env::var("GLOSSARY_ENDPOINT") else {
        eprintln!("Set GLOSSARY_ENDPOINT before running this example.");
        std::process::exit(2);
    };
    let limit = std::env::var("GLOSSARY_LIMIT").unwrap_or_else(|_| "5".to_owned());

    let mut transport = ReqwestTransport::new();
    if let Ok(token) = std::env::var("GLOSSARY_ACCESS_TOKEN") {
        transport = transport.with_authorization_token(token);
    }
    let client = BlockingGlossaryClient::with_transport(endpoint, transport)?;

    let call = OperationCall::new(ops::LIST_GLOSSARIES)
        .query("limit", limit)
        .query("offset", "0");
    let glossaries: Option<serde_json::Value> = unwrap_json(client.invoke(call))?;

    match glossaries {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("no glossaries returned"),
    }
    Ok(())
}

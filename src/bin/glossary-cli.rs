use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use futures::TryStreamExt;
use glossary_client::{GlossaryClient, OperationCall, RequestBody, ReqwestTransport, RouteRegistry};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "glossary-cli",
    version,
    about = "Small async CLI for the catalog glossary API"
)]
struct Cli {
    /// Catalog endpoint, e.g. https://<account>.purview.azure.com/catalog/api.
    #[arg(long, env = "GLOSSARY_ENDPOINT")]
    endpoint: Option<String>,

    /// Access token sent as a bearer Authorization header.
    #[arg(long, env = "GLOSSARY_ACCESS_TOKEN")]
    access_token: Option<String>,

    /// API version supplied to routes that require one.
    #[arg(long, env = "GLOSSARY_API_VERSION")]
    api_version: Option<String>,

    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the operation ids of the route table.
    Routes {
        /// Filter routes by case-insensitive substring match on operation id.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Call an operation by id.
    Call(CallArgs),
}

#[derive(Debug, Args)]
struct CallArgs {
    /// Operation id (for example: listGlossaries).
    operation_id: String,

    /// Path parameter in form key=value. Repeat as needed.
    #[arg(long = "path-param", value_name = "KEY=VALUE")]
    path_param: Vec<String>,

    /// Query parameter in form key=value. Repeat as needed.
    #[arg(long = "query", value_name = "KEY=VALUE")]
    query: Vec<String>,

    #[command(flatten)]
    body: BodyInput,

    /// Write the raw response body to this file instead of printing JSON.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[group(multiple = false)]
struct BodyInput {
    /// JSON request body literal.
    #[arg(long)]
    body_json: Option<String>,

    /// Path to a file containing a JSON request body.
    #[arg(long, value_name = "PATH")]
    body_file: Option<PathBuf>,

    /// CSV file uploaded as multipart form data (import routes).
    #[arg(long, value_name = "PATH")]
    csv_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // `routes` is metadata-only; it does not require an endpoint.
    if let Command::Routes { filter } = &cli.command {
        print_routes(filter.as_deref());
        return Ok(());
    }

    let Some(endpoint) = &cli.endpoint else {
        bail!("no endpoint configured; pass --endpoint or set GLOSSARY_ENDPOINT");
    };
    let mut transport = ReqwestTransport::new();
    if let Some(token) = &cli.access_token {
        transport = transport.with_authorization_token(token.clone());
    }
    let mut client = GlossaryClient::with_transport(endpoint, transport)
        .with_context(|| format!("failed to create client for endpoint '{endpoint}'"))?;
    if let Some(version) = &cli.api_version {
        client = client.with_api_version(version.clone());
    }

    match &cli.command {
        Command::Routes { .. } => unreachable!("handled above"),
        Command::Call(args) => call_operation(&client, args, cli.compact)
            .await
            .with_context(|| format!("operation call failed: '{}'", args.operation_id)),
    }
}

/// Prints the route table, optionally filtered by operation id.
fn print_routes(filter: Option<&str>) {
    let filter = filter.map(str::to_ascii_lowercase);
    let registry = RouteRegistry::glossary();

    let routes: Vec<_> = registry
        .routes()
        .iter()
        .filter(|route| {
            filter
                .as_ref()
                .is_none_or(|needle| route.operation_id.to_ascii_lowercase().contains(needle))
        })
        .collect();

    let (id_width, method_width) = routes.iter().fold((0usize, 0usize), |(id, method), route| {
        (id.max(route.operation_id.len()), method.max(route.method.len()))
    });

    for route in routes {
        println!(
            "{:<id_width$}  {:<method_width$}  {}",
            route.operation_id, route.method, route.path_template
        );
    }
}

/// Builds the call from CLI args and prints or saves the response.
async fn call_operation(client: &GlossaryClient, args: &CallArgs, compact: bool) -> Result<()> {
    let mut call = OperationCall::new(&args.operation_id);
    for (key, value) in parse_pairs(&args.path_param, "--path-param")? {
        call = call.path_param(key, value);
    }
    for (key, value) in parse_pairs(&args.query, "--query")? {
        call = call.query(key, value);
    }
    if let Some(body) = parse_body(&args.body).context("failed to parse request body input")? {
        call = call.body(body);
    }

    if let Some(path) = &args.output {
        return save_streamed(client, call, path).await;
    }

    let result = client.invoke(call).await?;
    let value: Option<Value> = glossary_client::unwrap_json(Ok(result))
        .context("response body is not JSON; use --output to save it raw")?;
    match value {
        Some(value) => print_json(&value, compact),
        None => {
            eprintln!("(no content)");
            Ok(())
        }
    }
}

/// Streams the response body to `path`.
async fn save_streamed(client: &GlossaryClient, call: OperationCall, path: &Path) -> Result<()> {
    let streamed = client.invoke_streaming(call).await?;
    let mut file =
        fs::File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
    let mut body = streamed.body;
    let mut written = 0usize;
    while let Some(chunk) = body.try_next().await? {
        file.write_all(&chunk)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        written += chunk.len();
    }
    eprintln!("wrote {written} bytes to {}", path.display());
    Ok(())
}

/// Parses repeated `key=value` arguments into owned key/value pairs.
fn parse_pairs(values: &[String], flag_name: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(values.len());
    for item in values {
        let Some((key, value)) = item.split_once('=') else {
            bail!("invalid {flag_name} value '{item}': expected key=value");
        };
        if key.is_empty() {
            bail!("invalid {flag_name} value '{item}': empty key");
        }
        pairs.push((key.to_owned(), value.to_owned()));
    }
    Ok(pairs)
}

/// Reads the optional request body from inline JSON, a JSON file, or a CSV file.
fn parse_body(body: &BodyInput) -> Result<Option<RequestBody>> {
    if let Some(raw) = &body.body_json {
        let value: Value =
            serde_json::from_str(raw).context("failed to parse JSON from --body-json")?;
        return Ok(Some(RequestBody::json(&value)?));
    }
    if let Some(path) = &body.body_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read --body-file '{}'", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse JSON in --body-file '{}'", path.display()))?;
        return Ok(Some(RequestBody::json(&value)?));
    }
    if let Some(path) = &body.csv_file {
        let content = fs::read(path)
            .with_context(|| format!("failed to read --csv-file '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "terms.csv".to_owned(), |name| name.to_string_lossy().into_owned());
        return Ok(Some(RequestBody::csv_file(file_name, content)));
    }
    Ok(None)
}

fn print_json(value: &Value, compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}

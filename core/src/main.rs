//! `tinyget`: send one request and show the response.
//!
//! ```bash
//! tinyget https://example.com/api/status
//! tinyget -X POST -d grant_type=authorization_code -d code=abc https://auth.example.com/token
//! tinyget -H "Authorization: Bearer $TOKEN" --json https://api.example.com/userinfo
//! RUST_LOG=tinyweb_core=debug tinyget --raw http://localhost:3000/
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

use tinyweb_core::{json, FormFields, HttpClient, HttpMethod, HttpResponse, TransportConfig};

/// Send a single HTTP/1.0 request over a raw socket.
#[derive(Parser, Debug)]
#[command(name = "tinyget")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target URL (http or https)
    url: Url,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    method: HttpMethod,

    /// Extra header line, e.g. "Authorization: Bearer abc" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Form field for POST/PUT as key=value (repeatable)
    #[arg(short = 'd', long = "data", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// TOML file with transport settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the bytes exactly as received
    #[arg(long, conflicts_with = "json")]
    raw: bool,

    /// Pretty-print the body as JSON whatever its content type
    #[arg(long)]
    json: bool,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_field(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{arg}'"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!(code = e.code(), "{e}");
            eprintln!("error {}: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> tinyweb_core::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => TransportConfig::load(path)?,
        None => TransportConfig::default(),
    };
    let client = HttpClient::new(config)?;
    let settings = client.transport().config();
    debug!(
        connect_timeout_secs = settings.connect_timeout_secs,
        read_timeout_secs = settings.read_timeout_secs,
        write_timeout_secs = settings.write_timeout_secs,
        buffer_size = settings.buffer_size,
        "transport configured"
    );

    let mut request = client.request(cli.method, &cli.url)?;
    for header in &cli.headers {
        request.push_header(header.clone());
    }
    let fields: FormFields = cli.fields.iter().cloned().collect();
    let response = client.send(request, &fields)?;

    Ok(show(cli, &response))
}

fn show(cli: &Cli, response: &HttpResponse) -> ExitCode {
    if cli.raw {
        let mut stdout = std::io::stdout().lock();
        if stdout.write_all(&response.raw).and_then(|()| stdout.flush()).is_err() {
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    println!("{}", response.status);
    println!("{}", response.content_type);
    if !(cli.json || response.is_json()) {
        println!("{}", response.body);
        return ExitCode::SUCCESS;
    }

    let value = json::parse(&response.body);
    println!("{value}");
    if value.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

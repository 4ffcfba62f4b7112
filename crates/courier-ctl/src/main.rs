//! courier-ctl — command-line client for the Courier fetch daemon.

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use courier_client::{ProxyClient, ProxyResponse, ReqwestFetcher, UnixTransport};
use courier_core::{Body, CourierConfig, FetchOptions};

// ── Argument parsing ──────────────────────────────────────────────────────────

struct FetchArgs {
    url: String,
    method: Option<String>,
    body: Option<String>,
    headers: Vec<(String, String)>,
    stream: bool,
    direct: bool,
    socket: Option<String>,
}

fn parse_fetch_args(args: &[String]) -> Result<FetchArgs> {
    let mut url = None;
    let mut method = None;
    let mut body = None;
    let mut headers = Vec::new();
    let mut stream = false;
    let mut direct = false;
    let mut socket = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--method" => {
                i += 1;
                method = Some(args.get(i).context("--method requires a value")?.clone());
            }
            "--body" => {
                i += 1;
                body = Some(args.get(i).context("--body requires a value")?.clone());
            }
            "--header" => {
                i += 1;
                let raw = args.get(i).context("--header requires a value")?;
                let (key, value) = raw
                    .split_once(':')
                    .context("--header must look like 'key: value'")?;
                headers.push((key.trim().to_string(), value.trim().to_string()));
            }
            "--socket" => {
                i += 1;
                socket = Some(args.get(i).context("--socket requires a value")?.clone());
            }
            "--stream" => stream = true,
            "--direct" => direct = true,
            other if url.is_none() && !other.starts_with("--") => {
                url = Some(other.to_string());
            }
            other => anyhow::bail!("unknown argument: {}", other),
        }
        i += 1;
    }

    Ok(FetchArgs {
        url: url.context("fetch requires a URL")?,
        method,
        body,
        headers,
        stream,
        direct,
        socket,
    })
}

// ── Output ────────────────────────────────────────────────────────────────────

async fn print_response(mut response: ProxyResponse) -> Result<()> {
    eprintln!("{} {}", response.status, response.status_text);
    for (key, value) in &response.headers {
        eprintln!("{}: {}", key, value);
    }
    eprintln!();

    let mut stdout = tokio::io::stdout();
    if let Some(mut stream) = response.body.take() {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("body stream failed")?;
            stdout.write_all(&chunk).await?;
            stdout.flush().await?;
        }
    } else {
        let text = response.text().await.context("failed to read body")?;
        stdout.write_all(text.as_bytes()).await?;
    }
    stdout.write_all(b"\n").await?;
    Ok(())
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_fetch(args: FetchArgs) -> Result<()> {
    let mut options = FetchOptions::new().stream(args.stream);
    if let Some(method) = &args.method {
        options = options.method(method);
    }
    if let Some(body) = &args.body {
        options = options.body(Body::Text(body.clone()));
    }
    if !args.headers.is_empty() {
        options = options.headers(args.headers.clone());
    }

    let response = if args.direct {
        ReqwestFetcher::new()
            .fetch(&args.url, &options)
            .await
            .context("direct fetch failed")?
    } else {
        let socket = match &args.socket {
            Some(path) => path.into(),
            None => {
                let config = CourierConfig::load().unwrap_or_default();
                config.daemon.socket_path
            }
        };
        let client = ProxyClient::new(UnixTransport::new(socket), ReqwestFetcher::new());
        client
            .fetch(&args.url, options)
            .await
            .context("fetch failed")?
    };

    print_response(response).await
}

fn print_usage() {
    println!("Usage: courier-ctl fetch <url> [options]");
    println!();
    println!("Options:");
    println!("  --method <verb>      HTTP method (default: GET)");
    println!("  --body <text>        Request body");
    println!("  --header <k: v>      Add a request header (repeatable)");
    println!("  --stream             Stream the body as it arrives");
    println!("  --direct             Skip the daemon, fetch directly");
    println!("  --socket <path>      Daemon socket (default: from config)");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.split_first() {
        Some((command, rest)) if command == "fetch" => {
            cmd_fetch(parse_fetch_args(rest)?).await
        }
        Some((command, _)) if command == "help" || command == "--help" || command == "-h" => {
            print_usage();
            Ok(())
        }
        Some((command, _)) => {
            eprintln!("Unknown command: {}", command);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
        None => {
            print_usage();
            Ok(())
        }
    }
}

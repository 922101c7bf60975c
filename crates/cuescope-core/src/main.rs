use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use cuescope_core::telemetry::init_tracing;
use cuescope_core::{
    AdmissionError, CueCli, ServeRequest, ServeResponse, ServiceConfig, ValidateRequest,
    ValidationService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

fn cli() -> Command {
    Command::new("cuescope")
        .version(cuescope_core::VERSION)
        .about("Validate configuration documents and recover their structure")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("compiler")
                .long("compiler")
                .global(true)
                .help("Compiler executable (overrides the configuration)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("check")
                .about("Analyze one file and print the result as JSON")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Document to validate"),
                )
                .arg(
                    Arg::new("timeout-ms")
                        .long("timeout-ms")
                        .value_parser(value_parser!(u64))
                        .help("Compiler timeout in milliseconds"),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Answer newline-delimited JSON requests from stdin"),
        )
}

fn load_config(matches: &ArgMatches) -> Result<ServiceConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::new(),
    };
    if let Some(program) = matches.get_one::<String>("compiler") {
        config.compiler.program.clone_from(program);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = load_config(&matches)?;
    let service = Arc::new(ValidationService::from_config(config));

    match matches.subcommand() {
        Some(("check", args)) => check(&service, args).await,
        Some(("serve", _)) => serve(service).await,
        _ => anyhow::bail!("no subcommand given"),
    }
}

async fn check(service: &ValidationService<CueCli>, args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("file")
        .context("missing file argument")?;
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let mut request = ValidateRequest::new(ulid::Ulid::new().to_string(), text);
    if let Some(ms) = args.get_one::<u64>("timeout-ms") {
        request = request.with_timeout_ms(*ms);
    }

    let result = service.handle("cli", request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn serve(service: Arc<ValidationService<CueCli>>) -> Result<()> {
    info!(
        max_concurrency = service.config().max_concurrency,
        rate_limit = service.config().rate_limit,
        "serving requests on stdin"
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<ServeResponse>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = rx.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        anyhow::Ok(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let service = Arc::clone(&service);
        let tx = tx.clone();
        tasks.spawn(async move {
            let response = respond(&service, &line).await;
            if tx.send(response).is_err() {
                warn!("response writer stopped");
            }
        });
    }

    while tasks.join_next().await.is_some() {}
    drop(tx);
    writer.await.context("response writer panicked")?
}

async fn respond(service: &ValidationService<CueCli>, line: &str) -> ServeResponse {
    let ServeRequest { client_id, request } = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(err) => {
            let err = AdmissionError::InvalidRequest(err.to_string());
            return ServeResponse::refused("", &err);
        }
    };

    let request_id = request.request_id.clone();
    match service.handle(&client_id, request).await {
        Ok(result) => ServeResponse::Analysis(result),
        Err(err) => ServeResponse::refused(request_id, &err),
    }
}

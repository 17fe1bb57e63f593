//! CLI binary for pdf4me-jobs.
//!
//! A thin shim over the library crate: maps CLI flags to a `ClientConfig`
//! and one `JobRequest` per input file, runs the jobs and saves the results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pdf4me_jobs::{
    endpoints, save, AsyncJobClient, CancellationToken, ClientConfig, ContentKind, Endpoint,
    JobFailure, JobObserver, JobOutcome, JobRequest, PollPolicy, SavedOutput, TransportError,
    DEFAULT_BASE_URL,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Per-job spinner using indicatif ──────────────────────────────────────────

/// One spinner line per job, driven by client lifecycle events.
struct JobSpinner {
    bar: ProgressBar,
}

impl JobSpinner {
    fn new(multi: &MultiProgress, input: &Path) -> Arc<Self> {
        let bar = multi.add(ProgressBar::new_spinner());
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix(display_name(input));
        bar.set_message("Preparing…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl JobObserver for JobSpinner {
    fn on_submit(&self, _url: &str, payload_len: usize) {
        self.bar
            .set_message(format!("Uploading {}", dim(&format!("{payload_len} bytes"))));
    }

    fn on_accepted(&self, _poll_handle: &str) {
        self.bar.set_message("Accepted, waiting for result…");
    }

    fn on_poll_attempt(&self, _handle: &str, attempt: u32, max_attempts: u32) {
        self.bar
            .set_message(format!("Checking status {attempt}/{max_attempts}"));
    }

    fn on_transport_retry(&self, attempt: u32, error: &TransportError) {
        self.bar.println(format!(
            "  {} {}  attempt {attempt}: {}",
            cyan("⚠"),
            self.bar.prefix(),
            dim(&error.to_string())
        ));
    }

    fn on_completed(&self, artifact_len: usize, content_kind: ContentKind) {
        self.bar.finish_with_message(format!(
            "{} {}",
            green("✓"),
            dim(&format!("{artifact_len} bytes ({content_kind})"))
        ));
    }

    fn on_failed(&self, failure: &JobFailure) {
        self.bar
            .finish_with_message(format!("{} {}", red("✗"), red(&truncate(&failure.to_string(), 100))));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a Word document to PDF (writes letter_ConvertToPdf.pdf)
  pdf4me ConvertToPdf letter.docx

  # Compress with a profile, explicit output path
  pdf4me CompressPdf report.pdf -p optimizeProfile=Web -o report.min.pdf

  # Many files, 8 at a time, results into ./out
  pdf4me CreatePdfA scans/*.pdf --out-dir out --concurrency 8

  # Endpoint not in the catalog, parameters from a file
  pdf4me /api/v2/SomethingNew input.pdf --params-file params.json

  # Machine-readable summary
  pdf4me SplitPdf book.pdf -p splitAction=RecurringSplitAfterPage -p splitActionNumber=2 --json

POLLING:
  Deferred jobs (HTTP 202) are polled with the endpoint's catalog defaults.
  Override with --max-attempts and --interval. Ctrl-C stops polling; the job
  may still finish on the server.

ENVIRONMENT VARIABLES:
  PDF4ME_API_KEY     API key, sent as `Authorization: Basic <key>`
  PDF4ME_BASE_URL    Override the API root (default https://api.pdf4me.com/)
  RUST_LOG           Override log filtering (e.g. pdf4me_jobs=debug)
"#;

/// Run PDF4me API jobs on local files.
#[derive(Parser, Debug)]
#[command(
    name = "pdf4me",
    version,
    about = "Run PDF4me API jobs on local files",
    long_about = "Submit local documents to a PDF4me endpoint, wait for deferred jobs to \
finish, and save the results next to the inputs (or wherever --output / --out-dir say).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Endpoint name (e.g. ConvertToPdf) or API path (e.g. /api/v2/Merge).
    #[arg(required_unless_present = "list_endpoints")]
    endpoint: Option<String>,

    /// Input files; each one becomes an independent job.
    #[arg(required_unless_present = "list_endpoints")]
    inputs: Vec<PathBuf>,

    /// Write the result to this file (single input only).
    #[arg(short, long, conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Directory for results (default: next to each input).
    #[arg(long, env = "PDF4ME_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Endpoint parameter; VALUE is parsed as JSON, else taken as a string.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, Value)>,

    /// JSON object file with endpoint parameters (--param entries win).
    #[arg(long)]
    params_file: Option<PathBuf>,

    /// Do not send `"async": true` in the request body.
    #[arg(long)]
    no_async: bool,

    /// Poll attempts before giving up (default: per endpoint).
    #[arg(long, env = "PDF4ME_MAX_ATTEMPTS",
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,

    /// Seconds between poll attempts (default: per endpoint).
    #[arg(long, env = "PDF4ME_POLL_INTERVAL", value_parser = parse_seconds)]
    interval: Option<Duration>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "PDF4ME_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Number of jobs in flight at once.
    #[arg(short, long, env = "PDF4ME_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// API root URL.
    #[arg(long, env = "PDF4ME_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// API key.
    #[arg(long, env = "PDF4ME_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Print the endpoint catalog and exit.
    #[arg(long)]
    list_endpoints: bool,

    /// Print a JSON summary instead of human-readable output.
    #[arg(long)]
    json: bool,

    /// Disable spinners.
    #[arg(long, env = "PDF4ME_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF4ME_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF4ME_QUIET")]
    quiet: bool,
}

/// Result line for one input, also the `--json` output element.
#[derive(Debug, Serialize)]
struct JobSummary {
    input: PathBuf,
    status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    outputs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    duration_ms: u64,
}

impl JobSummary {
    fn failed(&self) -> bool {
        self.status != "completed"
    }
}

/// Everything a job needs besides its input path.
struct JobContext {
    client: AsyncJobClient,
    policy: PollPolicy,
    cancel: CancellationToken,
    endpoint_name: &'static str,
    output: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    params: Map<String, Value>,
    no_async: bool,
    multi: Option<MultiProgress>,
}

impl JobContext {
    async fn run(&self, input: &Path) -> JobSummary {
        let start = Instant::now();
        let result = self.run_inner(input).await;

        let mut summary = JobSummary {
            input: input.to_path_buf(),
            status: "failed",
            outputs: Vec::new(),
            error_kind: None,
            http_status: None,
            error: None,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        match result {
            Ok(Ok(saved)) => {
                summary.status = "completed";
                summary.outputs = saved.paths().into_iter().map(Path::to_path_buf).collect();
            }
            Ok(Err(failure)) => {
                summary.error_kind = Some(failure.kind());
                summary.http_status = failure.http_status();
                summary.error = Some(failure.to_string());
            }
            Err(e) => {
                summary.error_kind = Some("local");
                summary.error = Some(format!("{e:#}"));
            }
        }
        summary
    }

    async fn run_inner(&self, input: &Path) -> Result<Result<SavedOutput, JobFailure>> {
        let mut request = JobRequest::from_file(input)?.params(self.params.clone());
        if self.no_async {
            request = request.async_flag(None);
        }

        let client = match &self.multi {
            Some(multi) => self.client.clone().with_observer(JobSpinner::new(multi, input)),
            None => self.client.clone(),
        };
        let outcome = client.run_with(&request, self.policy, &self.cancel).await;

        let (artifact, content_kind) = match &outcome {
            JobOutcome::Completed {
                artifact,
                content_kind,
            } => (artifact, *content_kind),
            JobOutcome::Failed(failure) => return Ok(Err(failure.clone())),
            JobOutcome::Pending { poll_handle } => {
                return Ok(Err(JobFailure::still_pending(poll_handle)))
            }
        };

        let target = match &self.output {
            Some(path) => path.clone(),
            None => output_path(
                input,
                self.out_dir.as_deref(),
                self.endpoint_name,
                save::guess_extension(artifact, content_kind),
            ),
        };
        Ok(save::save_outcome(&outcome, &target).await?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Spinners provide the feedback that matters; keep library INFO logs
    // from tearing through them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_endpoints {
        return print_endpoints(cli.json);
    }

    // ── Resolve endpoint and config ──────────────────────────────────────
    let endpoint = resolve_endpoint_arg(cli.endpoint.as_deref().unwrap_or_default())?;
    if cli.output.is_some() && cli.inputs.len() > 1 {
        bail!("--output takes a single input; use --out-dir for {} inputs", cli.inputs.len());
    }
    if cli.output.is_none() {
        if let Some((first, second)) =
            find_target_collision(&cli.inputs, cli.out_dir.as_deref(), endpoint.name)
        {
            bail!(
                "{:?} and {:?} would be saved to the same file; run them with different --out-dir values",
                first,
                second
            );
        }
    }

    let policy = PollPolicy::new(
        cli.max_attempts.unwrap_or(endpoint.poll.max_attempts),
        cli.interval.unwrap_or(endpoint.poll.interval),
    );
    let config = ClientConfig::builder()
        .base_url(cli.base_url.clone())
        .api_key(cli.api_key.clone().unwrap_or_default())
        .request_timeout(Duration::from_secs(cli.timeout))
        .poll(policy)
        .build()
        .context("Invalid configuration (set PDF4ME_API_KEY or pass --api-key)")?;
    let client = AsyncJobClient::for_endpoint(config, &endpoint)?.with_poll_policy(policy);

    let mut params = match &cli.params_file {
        Some(path) => load_params_file(path).await?,
        None => Map::new(),
    };
    params.extend(cli.params.iter().cloned());

    // ── Cancellation ─────────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        let quiet = cli.quiet;
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                if !quiet {
                    eprintln!("{} Interrupted, cancelling jobs…", cyan("◆"));
                }
                cancel.cancel();
            }
        });
    }

    // ── Run jobs ─────────────────────────────────────────────────────────
    let ctx = JobContext {
        client,
        policy,
        cancel,
        endpoint_name: endpoint.name,
        output: cli.output.clone(),
        out_dir: cli.out_dir.clone(),
        params,
        no_async: cli.no_async,
        multi: show_progress.then(MultiProgress::new),
    };

    if show_progress {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "{} → {} ({} file{}, up to {} polls × {:?}, {:?} max wait)",
                endpoint.name,
                ctx.client.endpoint_url(),
                cli.inputs.len(),
                if cli.inputs.len() == 1 { "" } else { "s" },
                policy.max_attempts,
                policy.interval,
                policy.max_wait(),
            ))
        );
    }

    let started = Instant::now();
    let ctx = &ctx;
    let mut summaries: Vec<(usize, JobSummary)> = stream::iter(cli.inputs.iter().enumerate())
        .map(|(i, input)| async move { (i, ctx.run(input).await) })
        .buffer_unordered(cli.concurrency.max(1))
        .collect()
        .await;
    summaries.sort_by_key(|(i, _)| *i);
    let summaries: Vec<JobSummary> = summaries.into_iter().map(|(_, s)| s).collect();

    // ── Report ───────────────────────────────────────────────────────────
    let failed = summaries.iter().filter(|s| s.failed()).count();
    let total = summaries.len();

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        print_summaries(&summaries, show_progress);
        let elapsed = format!("{:.1}s", started.elapsed().as_secs_f64());
        if failed == 0 {
            eprintln!(
                "{} {} job{} completed  {}",
                green("✔"),
                bold(&total.to_string()),
                if total == 1 { "" } else { "s" },
                dim(&elapsed)
            );
        } else {
            eprintln!(
                "{} {}/{} jobs completed  ({} failed)  {}",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&(total - failed).to_string()),
                total,
                red(&failed.to_string()),
                dim(&elapsed)
            );
        }
    }

    if failed > 0 {
        bail!("{failed} of {total} jobs failed");
    }
    Ok(())
}

fn print_summaries(summaries: &[JobSummary], spinners_shown: bool) {
    for s in summaries {
        if s.failed() {
            // Spinner lines already carry the failure message.
            if !spinners_shown {
                eprintln!(
                    "  {} {}  {}",
                    red("✗"),
                    display_name(&s.input),
                    red(s.error.as_deref().unwrap_or("failed"))
                );
            }
            continue;
        }
        for out in &s.outputs {
            eprintln!(
                "  {} {}  →  {}",
                green("✓"),
                display_name(&s.input),
                bold(&out.display().to_string())
            );
        }
    }
}

fn print_endpoints(json: bool) -> Result<()> {
    if json {
        let list: Vec<Value> = endpoints::ENDPOINTS
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "path": e.path,
                    "poll": e.poll,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&list).context("Failed to serialise endpoint list")?
        );
        return Ok(());
    }

    println!("{:<30} {:<40} POLLING", "ENDPOINT", "PATH");
    for e in endpoints::ENDPOINTS {
        println!(
            "{:<30} {:<40} {} × {}s",
            e.name,
            e.path,
            e.poll.max_attempts,
            e.poll.interval.as_secs()
        );
    }
    Ok(())
}

/// Catalog lookup, falling back to a raw path or URL for unknown names.
fn resolve_endpoint_arg(name: &str) -> Result<Endpoint> {
    match endpoints::lookup(name) {
        Ok(endpoint) => Ok(*endpoint),
        Err(_) if name.contains('/') => Ok(Endpoint::custom(name, PollPolicy::default())),
        Err(e) => Err(e).context("Run `pdf4me --list-endpoints` to see known endpoints"),
    }
}

/// Parse `--param KEY=VALUE`. VALUE is JSON if it parses, otherwise a string.
fn parse_param(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{s}'"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Parse a (possibly fractional) number of seconds.
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of seconds: '{s}'"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{s}': {e}"))
}

async fn load_params_file(path: &Path) -> Result<Map<String, Value>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read parameters from {:?}", path))?;
    match serde_json::from_str::<Value>(&text)
        .with_context(|| format!("{:?} is not valid JSON", path))?
    {
        Value::Object(map) => Ok(map),
        other => bail!("{:?} must hold a JSON object, found {}", path, json_type(&other)),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `<dir>/<input stem>_<Endpoint>.<ext>`, where dir defaults to the input's.
fn output_path(input: &Path, out_dir: Option<&Path>, endpoint_name: &str, ext: &str) -> PathBuf {
    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("output");
    dir.join(format!("{stem}_{endpoint_name}.{ext}"))
}

/// First pair of inputs whose results would land on the same target.
///
/// The extension is only known once a result arrives, so inputs are
/// compared on directory and stem alone.
fn find_target_collision<'a>(
    inputs: &'a [PathBuf],
    out_dir: Option<&Path>,
    endpoint_name: &str,
) -> Option<(&'a Path, &'a Path)> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::with_capacity(inputs.len());
    for input in inputs {
        let key = output_path(input, out_dir, endpoint_name, "");
        if let Some(first) = seen.insert(key, input.as_path()) {
            return Some((first, input.as_path()));
        }
    }
    None
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{cut}\u{2026}")
}

//! CLI binary for paperfeed.
//!
//! A thin shim over the library crate that maps CLI flags to `FeedConfig`,
//! wires up the Slack client, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use paperfeed::{
    answer_question, fetch_daily_papers, run_daily_feed, FeedConfig, FeedProgress, FeedReport,
    SlackClient,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus per-paper log lines.
struct FeedProgressBar {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl FeedProgressBar {
    /// The bar length is set dynamically once discovery reports its count.
    fn new_dynamic() -> Self {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Discovering");
        bar.set_message("Fetching listing…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            bar,
            errors: AtomicUsize::new(0),
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl FeedProgress for FeedProgressBar {
    fn on_discovery_complete(&self, candidates: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} papers  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(candidates as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Feeding");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Discovered {candidates} papers"))
        ));
    }

    fn on_paper_start(&self, _index: usize, _total: usize, id: &str) {
        self.bar.set_message(id.to_string());
    }

    fn on_paper_complete(&self, index: usize, total: usize, id: &str, images: usize) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            green("✓"),
            index,
            total,
            id,
            dim(&format!("{images} images")),
        ));
        self.bar.inc(1);
    }

    fn on_paper_error(&self, index: usize, total: usize, id: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            red("✗"),
            index,
            total,
            id,
            red(&msg),
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Post today's digest to the channel once
  paperfeed feed

  # Run as a long-lived daily job at 09:00 local time
  paperfeed feed --daily 09:00

  # Raise the bar: top 3 papers with at least 20 upvotes
  paperfeed feed --count 3 --threshold 20

  # Preview discovery without touching Slack
  paperfeed discover --count 10

  # Ask about a previously fed paper
  paperfeed ask 2401.00001 "What is the key contribution?"

  # Curate the category taxonomy
  paperfeed categories similar "Prompt Engineering"
  paperfeed categories add "Prompt Engineering"

ENVIRONMENT VARIABLES:
  SLACK_BOT_TOKEN         Bot OAuth token (xoxb-…), required for `feed`
  SLACK_CHANNEL_ID        Channel receiving the digest, required for `feed`
  UPSTAGE_API_KEY         Document-parse service key
  OPENAI_API_KEY          OpenAI API key (Q&A, category suggestion)
  ANTHROPIC_API_KEY       Anthropic API key
  PAPERFEED_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  PAPERFEED_MODEL         Override model ID
  PAPERFEED_DATA_DIR      Cache root (default: data)

SETUP:
  1. Set keys:        export SLACK_BOT_TOKEN=xoxb-… UPSTAGE_API_KEY=… OPENAI_API_KEY=sk-…
  2. Pick a channel:  export SLACK_CHANNEL_ID=C0123456789
  3. Feed:            paperfeed feed

  A .env file in the working directory is loaded automatically.
"#;

/// Trending-paper digests for Slack, with LLM-backed paper Q&A.
#[derive(Parser, Debug)]
#[command(
    name = "paperfeed",
    version,
    about = "Discover trending papers, post digests to Slack, answer questions about them",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Cache root for PDFs, parse results, snapshots, and categories.
    #[arg(long, global = true, env = "PAPERFEED_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// LLM model ID (e.g. gpt-4o-mini).
    #[arg(long, global = true, env = "PAPERFEED_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, global = true, env = "PAPERFEED_LLM_PROVIDER")]
    provider: Option<String>,

    /// Document-parse service API key.
    #[arg(long, global = true, env = "UPSTAGE_API_KEY", hide_env_values = true)]
    parse_api_key: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPERFEED_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAPERFEED_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover papers and post the digest to the Slack channel.
    Feed {
        /// Bot OAuth token (xoxb-…).
        #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
        slack_token: String,

        /// Channel the digest is posted to.
        #[arg(long, env = "SLACK_CHANNEL_ID")]
        channel: String,

        /// Minimum upvotes for a paper to qualify.
        #[arg(short, long, default_value_t = 0)]
        threshold: u32,

        /// How many papers to feed.
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,

        /// Composite images per paper.
        #[arg(long, default_value_t = 3)]
        images: usize,

        /// How many days back the listing date points.
        #[arg(long, default_value_t = 7)]
        days_back: i64,

        /// Keep running and fire every day at this local time (HH:MM).
        #[arg(long, value_name = "HH:MM")]
        daily: Option<String>,

        /// Disable the progress bar.
        #[arg(long, env = "PAPERFEED_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Discover and rank papers without posting anywhere.
    Discover {
        /// Minimum upvotes for a paper to qualify.
        #[arg(short, long, default_value_t = 0)]
        threshold: u32,

        /// How many papers to list.
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,

        /// How many days back the listing date points.
        #[arg(long, default_value_t = 7)]
        days_back: i64,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Ask a question about a previously fed paper.
    Ask {
        /// Paper identifier (e.g. 2401.00001).
        id: String,

        /// The question, as free text.
        #[arg(trailing_var_arg = true, required = true)]
        question: Vec<String>,
    },

    /// Inspect and curate the category taxonomy.
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
}

#[derive(Subcommand, Debug)]
enum CategoriesAction {
    /// Suggest up to three categories for a paper, drawn from a named list.
    Suggest {
        /// Taxonomy file to draw candidates from (e.g. "nlp", "custom").
        #[arg(long)]
        list: String,

        /// Paper title.
        #[arg(long)]
        title: String,

        /// Paper abstract (optional).
        #[arg(long, default_value = "")]
        r#abstract: String,
    },

    /// Check a proposed category against the curated custom list.
    Similar {
        /// The proposed category name.
        name: String,
    },

    /// Approve a new custom category (the taxonomy's only mutation).
    Add {
        /// The category name to append.
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library logs go to stderr; progress bars and results own stdout.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    match &cli.command {
        Command::Feed {
            slack_token,
            channel,
            threshold,
            count,
            images,
            days_back,
            daily,
            no_progress,
        } => {
            let config = build_config(&cli)
                .min_upvotes(*threshold)
                .max_papers(*count)
                .max_images(*images)
                .date_offset_days(*days_back)
                .build()
                .context("Invalid configuration")?;
            let config = apply_overrides(config, &cli);

            let http = http_client(&config)?;
            let slack = SlackClient::new(http.clone(), slack_token.as_str());
            let show_progress = !cli.quiet && !no_progress;

            match daily {
                Some(at) => {
                    let (hour, minute) = parse_daily_time(at)?;
                    run_daily_loop(&http, &slack, channel, &config, hour, minute, show_progress)
                        .await
                }
                None => {
                    let report =
                        run_feed_once(&http, &slack, channel, &config, show_progress).await?;
                    if !cli.quiet {
                        print_report(&report);
                    }
                    Ok(())
                }
            }
        }

        Command::Discover {
            threshold,
            count,
            days_back,
            json,
        } => {
            let config = build_config(&cli)
                .min_upvotes(*threshold)
                .max_papers(*count)
                .date_offset_days(*days_back)
                .build()
                .context("Invalid configuration")?;
            let config = apply_overrides(config, &cli);

            let http = http_client(&config)?;
            let papers = fetch_daily_papers(&http, &config)
                .await
                .context("Discovery failed")?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&papers).context("Failed to serialise papers")?
                );
            } else {
                for (i, paper) in papers.iter().enumerate() {
                    println!(
                        "{:>3}. ▲{:<5} {}  {}",
                        i + 1,
                        paper.upvotes,
                        dim(&paper.arxiv_id),
                        bold(&paper.title),
                    );
                    if !paper.authors.is_empty() {
                        println!("      {}", dim(&paper.authors.join(", ")));
                    }
                }
            }
            Ok(())
        }

        Command::Ask { id, question } => {
            let config = build_config(&cli).build().context("Invalid configuration")?;
            let config = apply_overrides(config, &cli);

            let answer = answer_question(id, &question.join(" "), &config)
                .await
                .context("Question answering failed")?;

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(answer.as_bytes())
                .context("Failed to write to stdout")?;
            if !answer.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(())
        }

        Command::Categories { action } => {
            let config = build_config(&cli).build().context("Invalid configuration")?;
            let config = apply_overrides(config, &cli);
            run_categories(action, &config).await
        }
    }
}

async fn run_categories(action: &CategoriesAction, config: &FeedConfig) -> Result<()> {
    use paperfeed::{add_custom_category, load_categories, similar_categories, suggest_categories};

    match action {
        CategoriesAction::Suggest {
            list,
            title,
            r#abstract,
        } => {
            let candidates = load_categories(config, list)
                .await
                .context("Failed to load the category list")?;
            let suggested = suggest_categories(title, r#abstract, &candidates, config)
                .await
                .context("Category suggestion failed")?;
            if suggested.is_empty() {
                println!("{}", dim("no matching categories"));
            } else {
                for category in suggested {
                    println!("{category}");
                }
            }
        }
        CategoriesAction::Similar { name } => {
            let matched = similar_categories(name, config)
                .await
                .context("Category comparison failed")?;
            if matched.exists {
                println!("{} '{name}' already exists", green("✔"));
            } else if matched.similar.is_empty() {
                println!("{} no similar custom categories", dim("·"));
            } else {
                println!("similar to:");
                for category in matched.similar {
                    println!("  {category}");
                }
            }
        }
        CategoriesAction::Add { name } => {
            add_custom_category(config, name)
                .await
                .context("Failed to append the category")?;
            println!("{} added '{name}' to the custom list", green("✔"));
        }
    }
    Ok(())
}

/// Start a config builder from the global CLI args.
fn build_config(cli: &Cli) -> paperfeed::FeedConfigBuilder {
    FeedConfig::builder().data_dir(cli.data_dir.clone())
}

/// Apply fields the builder pattern does not thread through subcommands.
fn apply_overrides(mut config: FeedConfig, cli: &Cli) -> FeedConfig {
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    config.parse_api_key = cli.parse_api_key.clone();
    config
}

/// One shared HTTP client with the configured download timeout.
fn http_client(config: &FeedConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.download_timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

async fn run_feed_once(
    http: &reqwest::Client,
    slack: &SlackClient,
    channel: &str,
    config: &FeedConfig,
    show_progress: bool,
) -> Result<FeedReport> {
    if show_progress {
        let progress = FeedProgressBar::new_dynamic();
        let report = run_daily_feed(http, slack, channel, config, Some(&progress))
            .await
            .context("Feed run failed");
        progress.finish();
        report
    } else {
        run_daily_feed(http, slack, channel, config, None)
            .await
            .context("Feed run failed")
    }
}

/// Fire the feed every day at `hour:minute` local time. A failed run is
/// logged and the loop waits for the next day; there are no retries.
async fn run_daily_loop(
    http: &reqwest::Client,
    slack: &SlackClient,
    channel: &str,
    config: &FeedConfig,
    hour: u32,
    minute: u32,
    show_progress: bool,
) -> Result<()> {
    loop {
        let wait = until_next_occurrence(hour, minute);
        eprintln!(
            "{} next run in {}",
            cyan("◷"),
            bold(&format_duration(wait))
        );
        tokio::time::sleep(wait).await;

        match run_feed_once(http, slack, channel, config, show_progress).await {
            Ok(report) => print_report(&report),
            Err(e) => eprintln!("{} feed run failed: {e:#}", red("✘")),
        }
    }
}

/// Duration until the next local occurrence of `hour:minute`.
fn until_next_occurrence(hour: u32, minute: u32) -> Duration {
    use chrono::{Duration as ChronoDuration, Local};

    let now = Local::now();
    let today_at = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).unwrap());

    let mut next = today_at;
    if next <= now.naive_local() {
        next += ChronoDuration::days(1);
    }
    (next - now.naive_local())
        .to_std()
        .unwrap_or(Duration::from_secs(60))
}

fn parse_daily_time(s: &str) -> Result<(u32, u32)> {
    let (h, m) = s
        .split_once(':')
        .with_context(|| format!("Invalid --daily time '{s}', expected HH:MM"))?;
    let hour: u32 = h.parse().with_context(|| format!("Invalid hour in '{s}'"))?;
    let minute: u32 = m
        .parse()
        .with_context(|| format!("Invalid minute in '{s}'"))?;
    if hour > 23 || minute > 59 {
        anyhow::bail!("Invalid --daily time '{s}': hour must be 0-23, minute 0-59");
    }
    Ok((hour, minute))
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
}

fn print_report(report: &FeedReport) {
    eprintln!(
        "{}  {}/{} papers fed  {} images  {}ms  →  {}",
        if report.skipped == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        report.fed,
        report.discovered,
        report.images_uploaded,
        report.duration_ms,
        bold(&report.snapshot_path.display().to_string()),
    );
    if report.skipped > 0 {
        eprintln!("   {} papers skipped", red(&report.skipped.to_string()));
    }
}

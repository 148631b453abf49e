//! gifchat CLI: Two-pane GIF chat in the terminal

use clap::{Parser, Subcommand};
use gifchat_engine::{
    Config, GifCandidate, SuggestionClient, SuggestionMode, SuggestionQuery, SuggestionResult,
};
use gifchat_tui::Delivery;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Two-party chat with contextual GIF suggestions
#[derive(Parser)]
#[command(name = "gifchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: .gifchat/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the suggestion backend URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat TUI (default when no command specified)
    Tui {
        /// Deliver messages through an in-process relay instead of the shared store
        #[arg(long)]
        relay: bool,

        /// Write logs here (default: <tmp>/gifchat.log)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Fetch GIF suggestions once and print them
    Suggest {
        /// Search for the text instead of replying to it
        #[arg(long)]
        search: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Message or search text
        text: String,
    },

    /// Print the effective config
    Config {
        /// Write the effective config to the config file if it does not exist
        #[arg(long)]
        init: bool,
    },
}

const CONFIG_PATH: &str = ".gifchat/config.json";
const LOG_FILE: &str = "gifchat.log";

fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
    let config = match load_config(&config_path, cli.backend_url.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    match cli.command {
        None => cmd_tui(config, false, None),
        Some(Commands::Tui { relay, log_file }) => cmd_tui(config, relay, log_file),
        Some(Commands::Suggest { search, json, text }) => {
            init_logging(None);
            cmd_suggest(&config, search, json, text);
        }
        Some(Commands::Config { init }) => cmd_config(&config_path, &config, init),
    }
}

fn load_config(path: &Path, backend_url: Option<&str>) -> Result<Config, gifchat_engine::ConfigError> {
    let mut config = Config::load_or_default(path)?;
    if let Some(url) = backend_url {
        config.backend.base_url = url.to_string();
    }
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over the `info` default.
///
/// With a log file, output goes there instead of stderr so the TUI's screen stays clean.
fn init_logging(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
            Err(e) => eprintln!("Warning: logging disabled, cannot open {}: {e}", path.display()),
        },
        None => builder.with_writer(std::io::stderr).init(),
    }
}

fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_tui(config: Config, relay: bool, log_file: Option<PathBuf>) {
    let log_file = log_file.unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE));
    init_logging(Some(&log_file));

    let delivery = if relay {
        Delivery::Relay
    } else {
        Delivery::Local
    };
    if let Err(e) = runtime().block_on(gifchat_tui::run_tui(config, delivery)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_suggest(config: &Config, search: bool, json: bool, text: String) {
    let mode = if search {
        SuggestionMode::Search
    } else {
        SuggestionMode::Reply
    };
    let query = SuggestionQuery::new(text, mode);

    let client = match SuggestionClient::new(&config.backend) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match runtime().block_on(client.try_fetch(&query)) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {} request failed: {e}", mode.label());
            std::process::exit(1);
        }
    };
    let shown = result.gifs.len().min(config.policy.max_suggestions);

    if json {
        let body = serde_json::json!({
            "mode": mode,
            "query": query.text,
            "gifs": &result.gifs[..shown],
            "debug_info": result.debug_info,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
        );
    } else {
        print!("{}", format_result(&query, &result, shown));
    }
}

fn format_candidate(index: usize, gif: &GifCandidate) -> String {
    let score = gif
        .similarity
        .map(|s| format!("  ({s:.2})"))
        .unwrap_or_default();
    format!("  {}. {}  {}{score}\n", index + 1, gif.display_title(), gif.url)
}

fn format_result(query: &SuggestionQuery, result: &SuggestionResult, shown: usize) -> String {
    let mut out = format!(
        "{}: {} result(s) for \"{}\"\n",
        query.mode.label(),
        result.gifs.len(),
        query.text
    );
    for (i, gif) in result.gifs.iter().take(shown).enumerate() {
        out.push_str(&format_candidate(i, gif));
    }
    if let Some(info) = &result.debug_info {
        out.push_str(&format!("\nSearch query: {}\n", info.search_query));
        for (label, values) in [
            ("Replies", &info.replies),
            ("Contexts", &info.contexts),
            ("Adjectives", &info.adjectives),
        ] {
            if !values.is_empty() {
                out.push_str(&format!("{label}: {}\n", values.join(", ")));
            }
        }
    }
    out
}

fn cmd_config(path: &Path, config: &Config, init: bool) {
    if !init {
        match serde_json::to_string_pretty(config) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if path.exists() {
        eprintln!("Config already exists: {}", path.display());
        std::process::exit(1);
    }
    if let Err(e) = config.save(path) {
        eprintln!("Error: failed to write {}: {e}", path.display());
        std::process::exit(1);
    }
    println!("Wrote {}", path.display());
}

use std::path::Path;
use std::process;

use softcode::cli::{self, ConfigFile};
use softcode::config::Config;
use softcode::plugins;
use softcode::{Context, Parser, Plugin, Scope};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("softcode: {e}");
            eprintln!("Usage: softcode [-dm] [-f[<file>]] [-l<labels>] [-s<token>=<value>]... [<text>...]");
            process::exit(1);
        }
    };

    init_tracing(args.debug);

    // ── Function library and rendering tables ───────────────────────────────
    let mut parser = Parser::new();
    let mut installed: Vec<&dyn Plugin> = Vec::new();
    installed.push(&plugins::arithmetic);
    installed.push(&plugins::strings);
    if args.markup {
        installed.push(&plugins::markup);
    }
    if let Err(e) = parser.install_plugins(&installed) {
        eprintln!("softcode: {e}");
        process::exit(1);
    }

    // ── Config file ─────────────────────────────────────────────────────────
    let config = match args.config {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(path) => load_config(&path),
        ConfigFile::Search => cli::find_user_config().and_then(|path| load_config(&path)),
    };
    if let Some(cfg) = &config {
        if let Err(e) = parser.install(cfg) {
            eprintln!("softcode: {e}");
            process::exit(1);
        }
    }

    // -s entries override config defaults.
    let mut vars: Vec<(String, String)> = config
        .map(|cfg| cfg.vars.into_iter().collect())
        .unwrap_or_default();
    vars.extend(args.scope);
    let scope: Scope = vars.into_iter().collect();
    let ctx = Context::new().with_scope(scope);

    // ── Render ──────────────────────────────────────────────────────────────
    if !args.texts.is_empty() {
        for text in &args.texts {
            println!("{}", parser.stringify(&args.labels, &ctx, text).await);
        }
        return;
    }

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => println!("{}", parser.stringify(&args.labels, &ctx, &line).await),
            Ok(None) => break,
            Err(e) => {
                eprintln!("softcode: stdin: {e}");
                process::exit(1);
            }
        }
    }
}

/// Load a config file, logging (but otherwise tolerating) bad lines.
fn load_config(path: &Path) -> Option<Config> {
    match Config::load_file(path) {
        Ok((cfg, errors)) => {
            for e in &errors {
                warn!(path = %path.display(), "{e}");
            }
            info!(
                path = %path.display(),
                rules = cfg.substitutions.len(),
                vars = cfg.vars.len(),
                "loaded config"
            );
            Some(cfg)
        }
        Err(e) => {
            warn!(path = %path.display(), "cannot read config: {e}");
            None
        }
    }
}

/// Log to stderr.  `RUST_LOG` wins; otherwise `-d` selects `debug` and the
/// default is `warn`.
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

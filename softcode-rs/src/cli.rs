//! Command-line argument parsing.
//!
//! Usage:
//!   softcode [-dm] [-f[<file>]] [-l<labels>] [-s<token>=<value>]... [<text>...]

use std::path::PathBuf;

use directories::ProjectDirs;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Install the markup plugin (`-m`).
    pub markup: bool,
    /// Config-file specification.
    pub config: ConfigFile,
    /// Substitution labels applied after evaluation (`-l<labels>`).
    pub labels: String,
    /// Scope entries from `-s<token>=<value>`, in order.
    pub scope: Vec<(String, String)>,
    /// Messages to render; empty means read stdin.
    pub texts: Vec<String>,
}

/// How to choose the config file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search the standard locations (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip config.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            args.texts.extend(argv[i + 1..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            args.texts.push(arg.to_owned());
            i += 1;
            continue;
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'm' => args.markup = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -l<labels>
                'l' => {
                    let labels = take_value(&chars, &mut j, argv, &mut i)
                        .ok_or("-l requires a label list")?;
                    if !args.labels.is_empty() {
                        args.labels.push(' ');
                    }
                    args.labels.push_str(&labels);
                }

                // -s<token>=<value>
                's' => {
                    let entry = take_value(&chars, &mut j, argv, &mut i)
                        .ok_or("-s requires <token>=<value>")?;
                    let (token, value) = entry
                        .split_once('=')
                        .filter(|(t, _)| !t.is_empty())
                        .ok_or_else(|| format!("-s: expected <token>=<value>, got '{entry}'"))?;
                    args.scope.push((token.to_owned(), value.to_owned()));
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

/// Value of a flag: the rest of this argument, or the next argument.
fn take_value(chars: &[char], j: &mut usize, argv: &[String], i: &mut usize) -> Option<String> {
    if *j + 1 < chars.len() {
        let s: String = chars[*j + 1..].iter().collect();
        *j = chars.len();
        Some(s)
    } else if *i + 1 < argv.len() {
        *i += 1;
        Some(argv[*i].clone())
    } else {
        None
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the config file.  Returns the first path that exists, or
/// `None`.
///
/// Order: `$SOFTCODE_CONFIG`, the platform config directory's
/// `softcode.conf`, then `./.softcoderc`.
pub fn find_user_config() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(p) = std::env::var("SOFTCODE_CONFIG") {
        candidates.push(PathBuf::from(p));
    }
    if let Some(dirs) = ProjectDirs::from("", "", "softcode") {
        candidates.push(dirs.config_dir().join("softcode.conf"));
    }
    candidates.push(PathBuf::from("./.softcoderc"));
    candidates.into_iter().find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

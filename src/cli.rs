use anyhow::Result;
use chrono::Utc;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where the digest is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Traversal root; also the base of every path in the digest.
    pub root: PathBuf,
    pub output: OutputTarget,
    /// Ignore file to load instead of `<root>/.gitignore`.
    pub ignore_file: Option<PathBuf>,
    /// Glob patterns applied on top of the ignore file's.
    pub extra_patterns: Vec<String>,
    pub ignored_extensions: HashSet<String>,
    pub include_image_metadata: bool,
    pub verbosity: u8,
}

impl Config {
    /// Digest of `root` into stdout with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: OutputTarget::Stdout,
            ignore_file: None,
            extra_patterns: Vec::new(),
            ignored_extensions: HashSet::new(),
            include_image_metadata: true,
            verbosity: 0,
        }
    }
}

pub fn command() -> Command {
    Command::new("treedigest")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Flattens a directory tree into a single annotated digest")
        .arg(
            Arg::new("root")
                .value_name("ROOT")
                .help("Directory to digest (defaults to the current directory)")
                .num_args(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Sets the output file path")
                .num_args(1)
                .conflicts_with("stdout"),
        )
        .arg(
            Arg::new("stdout")
                .long("stdout")
                .help("Writes the digest to stdout")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ignore-file")
                .short('i')
                .long("ignore-file")
                .value_name("FILE")
                .help("Ignore file to use instead of ROOT/.gitignore")
                .num_args(1),
        )
        .arg(
            Arg::new("exclude")
                .short('x')
                .long("exclude")
                .value_name("PATTERN")
                .help("Extra glob pattern to exclude, relative to ROOT")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("ignore-ext")
                .short('e')
                .long("ignore-ext")
                .value_name("EXT")
                .help("File extension to exclude, e.g. log or .log")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("no-image-metadata")
                .long("no-image-metadata")
                .help("Copies images verbatim instead of summarising them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increases log verbosity (-v, -vv, -vvv)")
                .action(ArgAction::Count),
        )
}

pub fn parse_args() -> Result<Config> {
    config_from_matches(&command().get_matches())
}

pub fn config_from_matches(matches: &ArgMatches) -> Result<Config> {
    let root = match matches.get_one::<String>("root") {
        Some(root) => PathBuf::from(root),
        None => std::env::current_dir()?,
    };

    let output = if matches.get_flag("stdout") {
        OutputTarget::Stdout
    } else {
        let path = matches
            .get_one::<String>("output")
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join(default_output_name(&root)));
        OutputTarget::File(path)
    };

    let strings = |id: &str| -> Vec<String> {
        matches
            .get_many::<String>(id)
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default()
    };

    Ok(Config {
        output,
        ignore_file: matches.get_one::<String>("ignore-file").map(PathBuf::from),
        extra_patterns: strings("exclude"),
        ignored_extensions: strings("ignore-ext").into_iter().collect(),
        include_image_metadata: !matches.get_flag("no-image-metadata"),
        verbosity: matches.get_count("verbose"),
        root,
    })
}

/// `{folder}_digest_{epoch}.md`
fn default_output_name(root: &Path) -> String {
    let folder_name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_owned))
        .unwrap_or_else(|| "project".to_string());

    let timestamp = Utc::now().timestamp();
    format!("{folder_name}_digest_{timestamp}.md")
}

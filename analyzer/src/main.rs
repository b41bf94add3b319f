//! Command-line front end for editing an analyzer's pass sequence and decoding
//! the engine's per-pass output.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use analyzer::core::formatter::{FormatOptions, format_rule};
use analyzer::core::sequence::EditOutcome;
use analyzer::core::types::{Direction, Position, Selection};
use analyzer::decode::Decoder;
use analyzer::exit_codes;
use analyzer::io::config::load_config;
use analyzer::io::init::{AnalyzerPaths, InitOptions, init_analyzer};
use analyzer::io::run_lock::{clear_run_lock, read_run_lock};
use analyzer::pass::{FileKind, PassKey, PassKind};
use analyzer::passes::{EditReport, list_from_root, open_store};
use analyzer::validate::validate_analyzer;

#[derive(Parser)]
#[command(
    name = "analyzer",
    version,
    about = "Edit a rule-engine pass sequence and decode its output"
)]
struct Cli {
    /// Analyzer directory (holds `spec/`, `input/` and `analyzer.toml`).
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `spec/analyzer.seq`, `input/` and `analyzer.toml`.
    Init {
        /// Overwrite an existing descriptor and config.
        #[arg(short, long)]
        force: bool,
    },
    /// List or edit the pass sequence.
    #[command(subcommand)]
    Passes(PassesCommand),
    /// Check descriptor invariants and report missing pass files.
    Validate {
        #[arg(long)]
        json: bool,
    },
    /// Decode engine output for one input and pass.
    #[command(subcommand)]
    Decode(DecodeCommand),
    /// Reformat a rule body read from a file (or stdin).
    Format {
        file: Option<PathBuf>,
        /// Overrides `format.tab_width` from the config.
        #[arg(long)]
        tab_width: Option<usize>,
    },
    /// Show whether an analysis run is in flight.
    Status {
        /// Remove a lock left behind by a run that died.
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum PassesCommand {
    /// Print every pass with its ordinal.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add an existing `.pat`/`.rec` file, copying it into `spec/` if needed.
    Insert {
        file: PathBuf,
        #[command(flatten)]
        after: After,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Create a new pass file from the starter template.
    New {
        name: String,
        #[arg(long, value_enum, default_value_t = FileKindArg::Pat)]
        kind: FileKindArg,
        #[command(flatten)]
        after: After,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Add an empty folder.
    Folder {
        name: String,
        #[command(flatten)]
        after: After,
    },
    /// Remove a pass, or a folder with everything in it.
    Delete {
        #[command(flatten)]
        target: Target,
    },
    /// Move a pass or folder one step.
    Move {
        #[command(flatten)]
        target: Target,
        #[arg(long, value_enum)]
        direction: DirectionArg,
    },
    /// Rename a pass (and its file) or a folder.
    Rename {
        #[command(flatten)]
        target: Target,
        new_name: String,
    },
    /// Enable a disabled pass or disable an enabled one.
    Toggle {
        #[command(flatten)]
        target: Target,
    },
    /// Switch a pass between `pat` and `rec`.
    Kind {
        #[command(flatten)]
        target: Target,
        #[arg(value_enum)]
        new_kind: FileKindArg,
    },
}

#[derive(Subcommand)]
enum DecodeCommand {
    /// Map a selection in the highlight copy to raw input offsets.
    Map {
        #[command(flatten)]
        source: Source,
        /// Selection start as LINE:COLUMN (zero-based).
        #[arg(long)]
        start: Position,
        /// Selection end as LINE:COLUMN (zero-based, exclusive).
        #[arg(long)]
        end: Position,
        #[arg(long)]
        json: bool,
    },
    /// Report the highlight, fired rule and pass behind one position.
    Span {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        at: Position,
        #[arg(long)]
        json: bool,
    },
    /// Generate a rule skeleton from a selection and append it to the pass file.
    Rule {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        start: Position,
        #[arg(long)]
        end: Position,
        /// Print the rule without touching the pass file.
        #[arg(long)]
        dry_run: bool,
    },
    /// List every highlighted span of the pass.
    Highlights {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct After {
    /// Insert after this pass or folder (default: at the end).
    #[arg(long)]
    after: Option<String>,
}

#[derive(Args)]
struct Target {
    name: String,
    /// Disambiguate when a stub, file and folder share a name.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
}

impl Target {
    fn key(&self) -> PassKey {
        match self.kind {
            Some(kind) => PassKey::of_kind(&self.name, kind.into()),
            None => PassKey::named(&self.name),
        }
    }
}

#[derive(Args)]
struct Source {
    /// Input file, relative to `input/` unless absolute.
    #[arg(long)]
    input: PathBuf,
    /// Pass ordinal whose output to read.
    #[arg(long = "pass")]
    ordinal: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum FileKindArg {
    Pat,
    Rec,
}

impl From<FileKindArg> for FileKind {
    fn from(value: FileKindArg) -> Self {
        match value {
            FileKindArg::Pat => FileKind::Pat,
            FileKindArg::Rec => FileKind::Rec,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Pat,
    Rec,
    Folder,
    End,
    Stub,
}

impl From<KindArg> for PassKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Pat => PassKind::RuleFile,
            KindArg::Rec => PassKind::RecordFile,
            KindArg::Folder => PassKind::FolderBegin,
            KindArg::End => PassKind::FolderEnd,
            KindArg::Stub => PassKind::Stub,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Up,
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Up => Direction::Up,
            DirectionArg::Down => Direction::Down,
        }
    }
}

fn main() {
    analyzer::logging::init();
    let code = match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let root = cli.root.as_path();
    match cli.command {
        Command::Init { force } => {
            let paths = init_analyzer(root, &InitOptions { force })?;
            println!("initialized {}", paths.root.display());
            Ok(exit_codes::OK)
        }
        Command::Passes(command) => cmd_passes(root, command),
        Command::Validate { json } => cmd_validate(root, json),
        Command::Decode(command) => cmd_decode(root, command),
        Command::Format { file, tab_width } => cmd_format(root, file.as_deref(), tab_width),
        Command::Status { clear } => cmd_status(root, clear),
    }
}

fn cmd_passes(root: &Path, command: PassesCommand) -> Result<i32> {
    let store = open_store(root);
    let report = match command {
        PassesCommand::List { json } => {
            let rows = list_from_root(root)?;
            if json {
                print_json(&rows)?;
            } else {
                for row in &rows {
                    println!("{}", row.render());
                }
            }
            return Ok(exit_codes::OK);
        }
        PassesCommand::Insert {
            file,
            after,
            comment,
        } => {
            let target = after.after.map(PassKey::named);
            let outcome = store.insert_file(target.as_ref(), &file, &comment)?;
            EditReport::from_edit(&outcome, &format!("inserted {}", file.display()))
        }
        PassesCommand::New {
            name,
            kind,
            after,
            comment,
        } => {
            let target = after.after.map(PassKey::named);
            let outcome = store.insert_new_file(target.as_ref(), kind.into(), &name, &comment)?;
            EditReport::from_edit(&outcome, &format!("created {name}"))
        }
        PassesCommand::Folder { name, after } => {
            let target = after.after.map(PassKey::named);
            let outcome = store.insert_folder(target.as_ref(), &name)?;
            EditReport::from_edit(&outcome, &format!("added folder {name}"))
        }
        PassesCommand::Delete { target } => {
            let outcome = store.delete(&target.key())?;
            EditReport::from_edit(&outcome, &format!("deleted {}", target.name))
        }
        PassesCommand::Move { target, direction } => {
            let direction = Direction::from(direction);
            let outcome = store.move_pass(&target.key(), direction)?;
            EditReport::from_move(
                &outcome,
                &format!("moved {} {}", target.name, direction.as_str()),
            )
        }
        PassesCommand::Rename { target, new_name } => {
            let outcome = store.rename(&target.key(), &new_name)?;
            EditReport::from_edit(
                &outcome,
                &format!("renamed {} to {new_name}", target.name),
            )
        }
        PassesCommand::Toggle { target } => {
            let key = target.key();
            let sequence = store.load()?;
            let active = sequence
                .find(&key)
                .map(|row| sequence.passes()[row].active);
            match active {
                Some(active) => {
                    let outcome = store.set_active(&key, !active)?;
                    let state = if active { "disabled" } else { "enabled" };
                    EditReport::from_edit(&outcome, &format!("{state} {}", target.name))
                }
                None => EditReport::from_edit(&EditOutcome::NotFound, ""),
            }
        }
        PassesCommand::Kind { target, new_kind } => {
            let kind = FileKind::from(new_kind);
            let outcome = store.set_file_kind(&target.key(), kind)?;
            EditReport::from_edit(
                &outcome,
                &format!("{} is now {}", target.name, kind.keyword()),
            )
        }
    };
    if report.exit_code == exit_codes::OK {
        println!("{}", report.message);
    } else {
        eprintln!("{}", report.message);
    }
    Ok(report.exit_code)
}

fn cmd_validate(root: &Path, json: bool) -> Result<i32> {
    let outcome = validate_analyzer(root)?;
    if json {
        print_json(&outcome)?;
    } else {
        for violation in &outcome.violations {
            println!("invariant: {violation}");
        }
        for missing in &outcome.missing {
            println!("missing: {} ({})", missing.name, missing.path.display());
        }
        if outcome.run_in_flight {
            println!("note: an analysis run is in flight");
        }
        if outcome.is_valid() {
            println!("ok: {} active passes", outcome.active_passes);
        }
    }
    Ok(if outcome.is_valid() {
        exit_codes::OK
    } else {
        exit_codes::INVALID
    })
}

fn cmd_decode(root: &Path, command: DecodeCommand) -> Result<i32> {
    let paths = AnalyzerPaths::new(root);
    let config = load_config(&paths.config_path)?;
    let decoder = Decoder::new(paths, config);
    match command {
        DecodeCommand::Map {
            source,
            start,
            end,
            json,
        } => {
            let selection = Selection::new(start, end);
            let Some(span) = decoder.map_selection_to_raw(&source.input, source.ordinal, selection)?
            else {
                return Ok(no_output(&source));
            };
            if json {
                print_json(&span)?;
            } else {
                println!("{} {}", span.start, span.end);
            }
        }
        DecodeCommand::Span { source, at, json } => {
            let Some(origin) = decoder.find_span_at(&source.input, source.ordinal, at)? else {
                return Ok(no_output(&source));
            };
            if json {
                print_json(&origin)?;
            } else {
                println!("raw offset: {}", origin.raw);
                match &origin.highlight {
                    Some(h) => println!("highlight: {} [{}, {})", h.kind, h.raw_start, h.raw_end),
                    None => println!("highlight: none"),
                }
                match &origin.fired {
                    Some(f) => println!(
                        "fired: pass {} line {} [{}, {}]{}",
                        f.pass_ordinal,
                        f.rule_line,
                        f.from,
                        f.to,
                        if f.built { " built" } else { "" }
                    ),
                    None => println!("fired: none"),
                }
                if let Some(pass) = &origin.pass {
                    match &pass.file {
                        Some(file) => println!("pass: {} ({})", pass.name, file.display()),
                        None => println!("pass: {}", pass.name),
                    }
                }
            }
        }
        DecodeCommand::Rule {
            source,
            start,
            end,
            dry_run,
        } => {
            let selection = Selection::new(start, end);
            let Some(rule) = decoder.generate_rule_skeleton(
                &source.input,
                source.ordinal,
                selection,
                !dry_run,
            )?
            else {
                return Ok(no_output(&source));
            };
            print!("{}", rule.text);
            if let Some(file) = &rule.appended_to {
                eprintln!("appended to {}", file.display());
            }
        }
        DecodeCommand::Highlights { source, json } => {
            let Some(ranges) = decoder.highlights(&source.input, source.ordinal)? else {
                return Ok(no_output(&source));
            };
            if json {
                print_json(&ranges)?;
            } else {
                for range in &ranges {
                    println!("{} {} {}", range.kind, range.raw_start, range.raw_end);
                }
            }
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_format(root: &Path, file: Option<&Path>, tab_width: Option<usize>) -> Result<i32> {
    let text = match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            buf
        }
    };
    let tab_width = match tab_width {
        Some(width) => width,
        None => {
            let paths = AnalyzerPaths::new(root);
            load_config(&paths.config_path)?.format.tab_width
        }
    };
    if tab_width == 0 {
        bail!("tab width must be greater than zero");
    }
    print!("{}", format_rule(&text, FormatOptions { tab_width }));
    Ok(exit_codes::OK)
}

fn cmd_status(root: &Path, clear: bool) -> Result<i32> {
    let paths = AnalyzerPaths::new(root);
    if clear {
        let cleared = clear_run_lock(&paths.lock_path)?;
        println!("{}", if cleared { "lock cleared" } else { "no lock" });
        return Ok(exit_codes::OK);
    }
    match read_run_lock(&paths.lock_path)? {
        Some(lock) => {
            let input = lock.input.as_deref().unwrap_or("unknown input");
            println!(
                "analysis in flight: pid {} since {} ({input})",
                lock.pid, lock.started_at
            );
        }
        None => println!("idle"),
    }
    Ok(exit_codes::OK)
}

fn no_output(source: &Source) -> i32 {
    eprintln!(
        "no output for pass {} of {} yet",
        source.ordinal,
        source.input.display()
    );
    exit_codes::NO_OUTPUT
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["analyzer", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.root, PathBuf::from("."));
    }

    #[test]
    fn parse_move_with_kind() {
        let cli = Cli::parse_from([
            "analyzer",
            "--root",
            "/tmp/a",
            "passes",
            "move",
            "dates",
            "--kind",
            "folder",
            "--direction",
            "up",
        ]);
        let Command::Passes(PassesCommand::Move { target, direction }) = cli.command else {
            panic!("expected passes move");
        };
        assert_eq!(target.key(), PassKey::of_kind("dates", PassKind::FolderBegin));
        assert_eq!(Direction::from(direction), Direction::Up);
        assert_eq!(cli.root, PathBuf::from("/tmp/a"));
    }

    #[test]
    fn parse_decode_positions() {
        let cli = Cli::parse_from([
            "analyzer", "decode", "map", "--input", "a.txt", "--pass", "3", "--start", "0:2",
            "--end", "1:0",
        ]);
        let Command::Decode(DecodeCommand::Map {
            source, start, end, ..
        }) = cli.command
        else {
            panic!("expected decode map");
        };
        assert_eq!(source.ordinal, 3);
        assert_eq!(start, Position::new(0, 2));
        assert_eq!(end, Position::new(1, 0));
    }

    #[test]
    fn rejects_bad_position() {
        assert!(
            Cli::try_parse_from([
                "analyzer", "decode", "span", "--input", "a.txt", "--pass", "1", "--at", "x",
            ])
            .is_err()
        );
    }
}

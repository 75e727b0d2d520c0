use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use edited_lines::{
    EditedLinesDiffer, EditedLinesError, Git, RevisionRange, common_root, format_line_refs,
    modified_files, run_linter,
};
use log::{error, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit status for every fatal error
const FATAL_EXIT: u8 = 123;

#[derive(Parser)]
#[command(name = "edited-lines")]
#[command(about = "Find the lines edited since a git revision")]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long, global = true)]
    cwd: Option<PathBuf>,

    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RangeArgs {
    /// Revision range, e.g. HEAD, main..., v1.0..HEAD or :PRE-COMMIT:
    #[arg(short, long, default_value = "HEAD")]
    revision: String,

    /// Files or directories to consider (defaults to the working directory)
    paths: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List changed source files
    Files {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Print edited lines of changed source files as FILE:REFS
    Lines {
        #[command(flatten)]
        range: RangeArgs,

        /// Lines of context to include around each edited line
        #[arg(short, long, default_value_t = 0)]
        context: usize,
    },
    /// Run a linter and show only messages about edited lines
    Lint {
        #[command(flatten)]
        range: RangeArgs,

        /// Linter command line, e.g. "flake8 --select E"
        #[arg(short = 'L', long)]
        linter: String,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
    /// Generate a man page
    Man,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(FATAL_EXIT)
        }
    }
}

fn run(cli: Cli) -> Result<(), EditedLinesError> {
    match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "edited-lines", &mut io::stdout());
            Ok(())
        }
        Commands::Man => Ok(clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?),
        Commands::Files { range } => {
            let (root, paths) = locate(cli.cwd.as_deref(), &range.paths)?;
            let revrange = RevisionRange::parse(&range.revision)?;
            for path in modified_files(&paths, &revrange, &root)? {
                println!("{}", path.display());
            }
            Ok(())
        }
        Commands::Lines { range, context } => {
            let (root, paths) = locate(cli.cwd.as_deref(), &range.paths)?;
            let revrange = RevisionRange::parse(&range.revision)?;
            let differ = EditedLinesDiffer::new(&root, &revrange)?;
            for path in modified_files(&paths, &revrange, &root)? {
                let linenums = differ.compare_revisions(&path, context)?;
                if !linenums.is_empty() {
                    println!("{}:{}", path.display(), format_line_refs(&linenums));
                }
            }
            Ok(())
        }
        Commands::Lint { range, linter } => {
            let (root, paths) = locate(cli.cwd.as_deref(), &range.paths)?;
            let revrange = RevisionRange::parse(&range.revision)?;
            let paths = modified_files(&paths, &revrange, &root)?;
            for line in run_linter(&linter, &root, &paths, &revrange)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// Repository root and absolute candidate paths for a command
///
/// Relative paths are taken from `cwd` (or the current directory), which is
/// also the only candidate when no paths are given. The repository is the
/// one containing all candidates.
fn locate(
    cwd: Option<&Path>,
    paths: &[PathBuf],
) -> Result<(PathBuf, Vec<PathBuf>), EditedLinesError> {
    let current = std::env::current_dir()?;
    let base = match cwd {
        Some(dir) => current.join(dir),
        None => current,
    };
    let paths = if paths.is_empty() {
        vec![base.clone()]
    } else {
        paths.iter().map(|path| base.join(path)).collect()
    };
    for path in &paths {
        if !path.exists() {
            warn!("{} doesn't exist", path.display());
        }
    }
    let start = common_root(&paths).unwrap_or(base);
    let root = Git::new(&start).repo_root()?;
    Ok((root, paths))
}

//! difftour CLI entry point.
//!
//! Acquires a diff, asks a narrator to walk through it and plays the
//! narration back with the referenced code rendered inline.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWrite;

use difftour::application::narration::RenderStyle;
use difftour::application::playback::{Continuation, PlaybackMode, TerminalContinuation};
use difftour::application::walkthrough::{self, WalkthroughOptions};
use difftour::domain::NarrationError;
use difftour::infra::app_config::{AppConfig, load_config};
use difftour::infra::cli::diff::{self, DiffSource};
use difftour::infra::diff::DiffIndex;
use difftour::infra::narrator::{NarrationEngine, NarratorRegistry, ReplayNarrator};

#[derive(Parser, Debug)]
#[command(name = "difftour")]
#[command(version)]
#[command(about = "Narrated walkthroughs of a diff", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(flatten)]
    source: SourceArgs,

    /// Narrator to use (claude, codex, gemini, or one from config)
    #[arg(short, long)]
    agent: Option<String>,

    /// Play a recorded narration file instead of calling a narrator
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Pause after each part until Enter is pressed
    #[arg(long, conflicts_with = "continuous")]
    paged: bool,

    /// Print the whole walkthrough without pausing
    #[arg(long)]
    continuous: bool,

    /// Emit Markdown (fenced diff blocks) instead of terminal colours
    #[arg(long)]
    markdown: bool,

    /// Write the walkthrough to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Refuse diffs with more changed lines than this
    #[arg(long, value_name = "N")]
    max_lines: Option<usize>,

    /// Extra notes for the narrator (e.g. what to focus on)
    #[arg(long, value_name = "FILE")]
    context: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
struct SourceArgs {
    /// Branch, tag, or commit to diff from
    #[arg()]
    from: Option<String>,

    /// Branch, tag, or commit to diff to (default: working tree)
    #[arg(requires = "from")]
    to: Option<String>,

    /// PR reference (owner/repo#number or URL)
    #[arg(short, long)]
    pr: Option<String>,

    /// Review uncommitted changes
    #[arg(long)]
    status: bool,

    /// Read the diff from stdin
    #[arg(long)]
    stdin: bool,

    /// Read the diff from a patch file
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

impl SourceArgs {
    fn into_source(self) -> DiffSource {
        if let Some(reference) = self.pr {
            DiffSource::GitHubPr { reference }
        } else if self.status {
            DiffSource::GitStatus
        } else if let Some(path) = self.file {
            DiffSource::File(path)
        } else if self.stdin {
            DiffSource::Stdin
        } else if let Some(from) = self.from {
            DiffSource::GitDiff { from, to: self.to }
        } else if !std::io::stdin().is_terminal() {
            DiffSource::Stdin
        } else {
            DiffSource::GitStatus
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List narrators and whether they are installed
    Agents,

    /// Print the annotated diff that would be sent to the narrator
    Enrich {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print file, hunk and line counts for a diff
    Stats {
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();
    init_logging(args.verbose);
    let config = load_config();

    match args.command.take() {
        Some(Commands::Agents) => {
            list_agents(&config);
            Ok(())
        }
        Some(Commands::Enrich { source }) => {
            let input = diff::acquire(source.into_source()).await?;
            print!("{}", DiffIndex::new(&input.diff).enrich());
            Ok(())
        }
        Some(Commands::Stats { source }) => {
            let input = diff::acquire(source.into_source()).await?;
            let index = DiffIndex::new(&input.diff);
            let stats = index.stats();
            println!("source:  {}", input.description);
            println!("files:   {}", stats.files);
            println!("hunks:   {}", stats.hunks);
            println!("added:   {}", stats.added);
            println!("removed: {}", stats.removed);
            println!("lines:   {}", stats.lines);
            print!("{}", index.hunk_manifest());
            Ok(())
        }
        None => review(args, config).await,
    }
}

fn list_agents(config: &AppConfig) {
    let registry = NarratorRegistry::with_configured(&config.narrators);
    for narrator in registry.narrators() {
        let marker = if narrator.id() == config.narrator { "*" } else { " " };
        let status = if narrator.is_available() {
            "available"
        } else {
            "not installed"
        };
        println!(
            "{marker} {:<10} {:<20} {status}",
            narrator.id(),
            narrator.display_name()
        );
    }
}

async fn review(args: Args, config: AppConfig) -> Result<()> {
    let source = args.source.clone().into_source();
    let stdin_taken = matches!(source, DiffSource::Stdin);
    let input = diff::acquire(source).await?;
    log::debug!("reviewing {}", input.description);

    let max_diff_lines = args.max_lines.unwrap_or(config.max_diff_lines);
    let index = walkthrough::index_diff(&input.diff, max_diff_lines)?;

    let replay;
    let registry;
    let narrator: &dyn NarrationEngine = match &args.replay {
        Some(path) => {
            replay = ReplayNarrator::from_file(path).with_delay(Duration::from_millis(15));
            &replay
        }
        None => {
            registry = NarratorRegistry::with_configured(&config.narrators);
            let id = args.agent.as_deref().unwrap_or(&config.narrator);
            registry.select(id)?
        }
    };
    if !narrator.is_available() {
        return Err(NarrationError::Unavailable(narrator.id().to_string()).into());
    }

    let to_terminal = args.output.is_none() && std::io::stdout().is_terminal();
    let mode = if args.paged {
        PlaybackMode::Paged
    } else if args.continuous {
        PlaybackMode::Continuous
    } else {
        config.mode.unwrap_or(if to_terminal {
            PlaybackMode::Paged
        } else {
            PlaybackMode::Continuous
        })
    };
    let style = if args.markdown || !to_terminal {
        RenderStyle::Markdown
    } else {
        RenderStyle::Ansi
    };
    let extra_context = match &args.context {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read context file {}", path.display()))?,
        ),
        None => None,
    };

    let options = WalkthroughOptions {
        mode,
        style,
        max_diff_lines,
        idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        extra_context,
    };

    let mut sink: Box<dyn AsyncWrite + Unpin + Send> = match &args.output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };
    let mut prompt_out = tokio::io::stderr();
    let mut terminal = match mode {
        PlaybackMode::Paged => TerminalContinuation::open(!stdin_taken).await,
        PlaybackMode::Continuous => None,
    };
    let continuation = terminal.as_mut().map(|t| t as &mut dyn Continuation);

    walkthrough::run(
        narrator,
        index,
        &input.commit_messages,
        &options,
        &mut sink,
        &mut prompt_out,
        continuation,
    )
    .await?;
    Ok(())
}

//! `vcs-log`: renders the visible commit log of a snapshot fixture and
//! jumps to commits in it.

mod render;

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tracing::debug;
use vcs_log_core::JumpOutcome;
use vcs_log_core::LogConfig;
use vcs_log_core::LogSession;
use vcs_log_core::LogSessionInit;
use vcs_log_core::NotFoundReason;
use vcs_log_core::PresentationModel;
use vcs_log_core::RecordedSignals;
use vcs_log_core::StagedStorage;
use vcs_log_core::init_tracing;
use vcs_log_core::log_event_channel;
use vcs_log_graph::GraphSnapshot;
use vcs_log_protocol::BranchFilter;
use vcs_log_protocol::CommitId;
use vcs_log_protocol::FilterSet;
use vcs_log_protocol::GraphAction;
use vcs_log_protocol::Hash;
use vcs_log_protocol::RootId;
use vcs_log_protocol::SortMode;
use vcs_log_protocol::TextFilter;

use crate::render::format_row;

#[derive(Debug, Parser)]
#[command(name = "vcs-log", version, about = "Browse a commit graph snapshot")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the visible rows
    Rows(RowsArgs),

    /// Find the row of a commit
    Jump(JumpArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Snapshot fixture (JSON) to read commits from
    #[arg(long, value_name = "PATH")]
    pub fixture: PathBuf,

    /// Row order
    #[arg(long, value_name = "MODE")]
    pub sort: Option<SortMode>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Debug, Default, Args)]
pub struct FilterArgs {
    /// Only commits by this user; `me` is the current user of each root
    #[arg(long = "user", value_name = "USER")]
    pub users: Vec<String>,

    /// Only commits reachable from this branch; `-name` excludes it
    #[arg(long = "branch", value_name = "BRANCH", allow_hyphen_values = true)]
    pub branches: Vec<String>,

    /// Only commits touching a path under this prefix
    #[arg(long = "path", value_name = "PREFIX")]
    pub paths: Vec<String>,

    /// Only commits whose subject or hash matches
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Treat --text as a regular expression
    #[arg(long, requires = "text")]
    pub regex: bool,

    /// Match --text case-sensitively
    #[arg(long, requires = "text")]
    pub match_case: bool,
}

impl FilterArgs {
    pub fn to_filter_set(&self) -> FilterSet {
        let mut filters = FilterSet::default();
        if !self.users.is_empty() {
            filters = filters.with_users(self.users.iter().cloned());
        }
        if !self.branches.is_empty() {
            filters = filters.with_branch_filter(BranchFilter::from_tokens(&self.branches));
        }
        if !self.paths.is_empty() {
            filters = filters.with_paths(self.paths.iter().cloned());
        }
        if let Some(text) = &self.text {
            let text = if self.regex {
                TextFilter::regex(text)
            } else {
                TextFilter::plain(text)
            };
            filters = filters.with_text(text.match_case(self.match_case));
        }
        filters
    }
}

#[derive(Debug, Parser)]
pub struct RowsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Collapse every merged branch before printing
    #[arg(long)]
    pub collapse_all: bool,

    /// Print every row instead of the first page
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Parser)]
pub struct JumpArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Full hash, or a hash prefix when --root is not given
    #[arg(value_name = "HASH")]
    pub target: String,

    /// Root the commit belongs to
    #[arg(long, value_name = "ROOT")]
    pub root: Option<String>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => LogConfig::load(path)?,
            None => LogConfig::default(),
        };
        init_tracing(&config)?;
        match self.command {
            Command::Rows(args) => run_rows(config, args).await,
            Command::Jump(args) => run_jump(config, args).await,
        }
    }
}

async fn open_session(
    config: LogConfig,
    source: &SourceArgs,
    view: Rc<RecordedSignals>,
) -> Result<LogSession> {
    let snapshot = GraphSnapshot::load_fixture(&source.fixture)
        .with_context(|| format!("failed to load snapshot {}", source.fixture.display()))?;
    debug!(commits = snapshot.len(), "snapshot loaded");

    let (log_event_tx, log_event_rx) = log_event_channel();
    let storage = Rc::new(StagedStorage::new([Arc::new(snapshot)], log_event_tx.clone()));
    let mut session = LogSession::new(LogSessionInit::new(
        config,
        storage,
        view,
        log_event_tx,
        log_event_rx,
    ));

    let mut rebuilding = session.set_filters(source.filters.to_filter_set())?;
    if let Some(sort) = source.sort {
        rebuilding |= session.set_sort(sort);
    }
    if !rebuilding {
        session.start();
    }
    session.settle().await;
    if session.current_pack().is_none() {
        bail!("no visible pack could be built");
    }
    Ok(session)
}

async fn run_rows(config: LogConfig, args: RowsArgs) -> Result<()> {
    let view = Rc::new(RecordedSignals::default());
    let mut session = open_session(config, &args.source, view).await?;

    if args.collapse_all {
        session.perform_action(GraphAction::CollapseAll);
        session.settle().await;
    }
    if args.all {
        let model = session.model();
        while model.can_request_more() {
            model.request_more(Box::new(|| {}));
        }
    }

    let Some(pack) = session.current_pack() else {
        bail!("no visible pack could be built");
    };
    let rows = session.model().rows();
    for (index, row) in rows.iter().enumerate() {
        println!(
            "{}",
            format_row(pack.snapshot(), row, &session.highlights(index))
        );
    }
    let hidden = pack.graph().len().saturating_sub(rows.len());
    if hidden > 0 {
        println!("... {hidden} more rows (use --all)");
    }
    Ok(())
}

async fn run_jump(config: LogConfig, args: JumpArgs) -> Result<()> {
    let view = Rc::new(RecordedSignals::default());
    let mut session = open_session(config, &args.source, view.clone()).await?;

    let mut handle = match &args.root {
        Some(root) => {
            let id = CommitId::new(Hash::parse(&args.target)?, RootId::new(root.as_str())?);
            session.jump_to(id)
        }
        None => session.jump_to_partial_hash(&args.target),
    };
    session.settle().await;

    match handle.try_outcome() {
        Some(JumpOutcome::Found(row)) => {
            let Some(pack) = session.current_pack() else {
                bail!("no visible pack could be built");
            };
            if let Some(found) = pack.graph().row(row) {
                println!(
                    "row {row}: {}",
                    format_row(pack.snapshot(), found, &session.highlights(row))
                );
            }
            debug!(selections = ?view.selections(), "jump finished");
            Ok(())
        }
        Some(JumpOutcome::NotFound(NotFoundReason::Existing)) => {
            bail!("{} exists but is hidden by the active filters", args.target)
        }
        Some(JumpOutcome::NotFound(NotFoundReason::Unknown)) => {
            bail!("{} is not a known commit", args.target)
        }
        Some(JumpOutcome::Abandoned) => bail!("jump to {} was abandoned", args.target),
        None => bail!("{} is not loaded yet", args.target),
    }
}

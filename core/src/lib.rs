//! Presentation layer of the commit log: turns snapshots from storage into
//! visible packs on background tasks, publishes them on the coordinating
//! thread, and runs navigation and structural actions against them.

mod affinity;
mod bus;
mod config;
mod error;
mod event;
mod executor;
mod filterer;
mod highlight;
mod model;
mod navigation;
mod pack;
mod pipeline;
mod progress;
mod selection;
mod session;
mod storage;
mod telemetry;

pub use bus::ChangeBus;
pub use bus::ListenerId;
pub use bus::PackChange;
pub use config::LogConfig;
pub use error::LogError;
pub use error::Result;
pub use event::LogEvent;
pub use event::LogEventSender;
pub use event::log_event_channel;
pub use executor::LocalExecutor;
pub use filterer::Filterer;
pub use filterer::FiltererState;
pub use filterer::Published;
pub use highlight::Highlight;
pub use highlight::MergeCommitHighlighter;
pub use highlight::MyCommitsHighlighter;
pub use highlight::RowHighlighter;
pub use model::GraphTableModel;
pub use model::PresentationModel;
pub use model::RecordedSignals;
pub use model::ViewSignals;
pub use navigation::JumpHandle;
pub use navigation::JumpOutcome;
pub use navigation::JumpTarget;
pub use navigation::NavigationEngine;
pub use navigation::NavigationState;
pub use navigation::NotFoundReason;
pub use pack::VisiblePack;
pub use pipeline::ActionPipeline;
pub use pipeline::ActionResolution;
pub use pipeline::ActionStage;
pub use pipeline::ActionTicket;
pub use progress::BackgroundProgress;
pub use progress::InlineProgress;
pub use progress::ProgressBody;
pub use progress::ProgressIndicator;
pub use progress::ProgressScope;
pub use selection::SelectionTracker;
pub use session::LogSession;
pub use session::LogSessionInit;
pub use storage::LogStorage;
pub use storage::StagedStorage;
pub use telemetry::init_tracing;

pub mod cache;
pub mod error_handler;
pub mod notify;
pub mod prompt;
pub mod step;
pub mod text;
pub mod tracker;
pub mod updater;
pub mod visit;

pub use cache::SummaryCache;
pub use error_handler::{LoggingErrorHandler, UpdateErrorHandler, UpdateOperation};
pub use notify::{ChannelNotifier, Notification, NotificationRole, NotificationSink, TracingNotifier};
pub use prompt::PromptTemplate;
pub use step::{PlannedAction, StepEvent, StepResult, Verdict};
pub use tracker::{DomainTracker, TrackerSettings, TriggeredUpdate, UpdateOutcome};
pub use updater::{ContextUpdater, ProviderSummarizer, Summarizer, UpdateRequest};
pub use visit::VisitBuffer;

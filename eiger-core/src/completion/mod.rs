pub mod fanout;
pub mod models;
pub mod outbox;
pub mod recorder;

pub use fanout::{FanoutConfig, FanoutOutcome, MetricFanout};
pub use models::{
    ArmProtocol, ClimberMetric, CompletedWorkout, CompletionPayload, CompletionPercentage,
    CompletionReceipt, CompletionSubmission, GripType, PayloadKind,
};
pub use outbox::{OutboxCounts, OutboxEntry, OutboxStatus, SqliteOutboxStore};
pub use recorder::CompletionRecorder;

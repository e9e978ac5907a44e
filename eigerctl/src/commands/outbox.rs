use clap::{Args, Subcommand, ValueEnum};
use eiger_core::OutboxStatus;

#[derive(Subcommand, Debug)]
pub enum OutboxCommands {
    /// Show outbox counters and recent entries
    Status(OutboxStatusArgs),
    /// Deliver every entry that is due now
    Drain,
    /// Keep delivering entries until interrupted
    Work,
    /// Give a dead entry a fresh set of attempts
    Requeue(OutboxRequeueArgs),
}

#[derive(Args, Debug)]
pub struct OutboxStatusArgs {
    #[arg(long, value_enum)]
    pub status: Option<OutboxStatusArg>,
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct OutboxRequeueArgs {
    pub outbox_id: i64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutboxStatusArg {
    Pending,
    InProgress,
    Done,
    Dead,
}

impl From<OutboxStatusArg> for OutboxStatus {
    fn from(value: OutboxStatusArg) -> Self {
        match value {
            OutboxStatusArg::Pending => OutboxStatus::Pending,
            OutboxStatusArg::InProgress => OutboxStatus::InProgress,
            OutboxStatusArg::Done => OutboxStatus::Done,
            OutboxStatusArg::Dead => OutboxStatus::Dead,
        }
    }
}

use std::fs;
use std::future::Future;
use std::io;
use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use eiger_core::{
    load_eiger_config, Category, ClimberMetric, CompletionReceipt, Day, DayDetail, EigerConfig,
    EigerError, EigerStores, EntityKind, Exercise, ExerciseSelection, ExerciseType,
    ExerciseVariation, FanoutConfig, FanoutOutcome, OutboxCounts, OutboxEntry, PendingReview,
    PlanOverview, PlanSummary, Rpe, TrainingPlanTree, Workout,
};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod commands;

use commands::catalog::{
    CategoryCommands, ExerciseCommands, MetricsArgs, RpeCommands, VariationCommands,
};
use commands::outbox::{OutboxCommands, OutboxStatusArgs};
use commands::plan::{DayCommands, PlanCommands, WorkoutCommands};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] eiger_core::ConfigError),
    #[error("{0}")]
    Core(#[from] EigerError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Eiger training plan control interface", long_about = None)]
pub struct Cli {
    /// Path of eiger.toml
    #[arg(long, default_value = "configs/eiger.toml")]
    pub config: PathBuf,
    /// Database file, overriding paths.database
    #[arg(long)]
    pub database: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset, overriding logging.filter
    #[arg(long)]
    pub log_filter: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema
    Init,
    /// Exercise categories and types
    #[command(subcommand)]
    Category(CategoryCommands),
    /// Exercise catalog
    #[command(subcommand)]
    Exercise(ExerciseCommands),
    /// Perceived effort scale
    #[command(subcommand)]
    Rpe(RpeCommands),
    /// Training plans
    #[command(subcommand)]
    Plan(PlanCommands),
    /// Days of a plan
    #[command(subcommand)]
    Day(DayCommands),
    /// Scheduled workouts
    #[command(subcommand)]
    Workout(WorkoutCommands),
    /// Climber metrics derived from test completions
    Metrics(MetricsArgs),
    /// Metric fan-out queue
    #[command(subcommand)]
    Outbox(OutboxCommands),
    /// Database maintenance
    #[command(subcommand)]
    Db(DbCommands),
    /// Print shell completions
    Completions(CompletionsArgs),
}

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Copy the live database to a backup file
    Backup(DbBackupArgs),
}

#[derive(Args, Debug)]
pub struct DbBackupArgs {
    /// Destination file; defaults to a timestamped file in paths.backup_dir
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(args.shell, &mut command, "eigerctl", &mut io::stdout());
        return Ok(());
    }

    let context = AppContext::new(&cli)?;
    init_tracing(
        cli.log_filter
            .as_deref()
            .unwrap_or(&context.config.logging.filter),
    );

    match &cli.command {
        Commands::Init => render(&context.init()?, cli.format)?,
        Commands::Exercise(command) => match command {
            ExerciseCommands::Add(args) => {
                let exercise = context.stores.catalog.add_exercise(&args.to_new_exercise())?;
                render(&exercise, cli.format)?;
            }
            ExerciseCommands::List(args) => {
                let rows = context.stores.catalog.list_exercises(args.reviewed)?;
                render(&ExerciseList { rows }, cli.format)?;
            }
            ExerciseCommands::Review(args) => {
                let catalog = &context.stores.catalog;
                catalog.set_reviewed(&args.exercise_id, !args.revoke)?;
                render(&context.exercise(&args.exercise_id)?, cli.format)?;
            }
            ExerciseCommands::Metrics(args) => {
                let catalog = &context.stores.catalog;
                catalog.set_metric_types(&args.exercise_id, &args.metric_types())?;
                render(&context.exercise(&args.exercise_id)?, cli.format)?;
            }
            ExerciseCommands::Edit(args) => {
                let exercise = context.stores.catalog.update_exercise(
                    &args.exercise_id,
                    &args.trainer,
                    &args.to_edit(),
                )?;
                render(&exercise, cli.format)?;
            }
            ExerciseCommands::Pending(args) => {
                render(&context.stores.catalog.pending_review(&args.trainer)?, cli.format)?;
            }
            ExerciseCommands::Variation(command) => {
                let catalog = &context.stores.catalog;
                match command {
                    VariationCommands::Add(args) => {
                        render(&catalog.add_variation(&args.to_new_variation())?, cli.format)?;
                    }
                    VariationCommands::Update(args) => {
                        let variation = catalog.update_variation(
                            &args.variation_id,
                            &args.trainer,
                            &args.targets.to_targets(),
                        )?;
                        render(&variation, cli.format)?;
                    }
                    VariationCommands::Review(args) => {
                        let variation =
                            catalog.set_variation_reviewed(&args.variation_id, !args.revoke)?;
                        render(&variation, cli.format)?;
                    }
                    VariationCommands::List(args) => {
                        let rows = catalog.list_variations(&args.exercise_id, args.reviewed)?;
                        render(&VariationList { rows }, cli.format)?;
                    }
                }
            }
        },
        Commands::Category(command) => match command {
            CategoryCommands::Add(args) => {
                let category = context.stores.catalog.add_category(&args.to_new_category())?;
                render(&category, cli.format)?;
            }
            CategoryCommands::List => {
                let rows = context.stores.catalog.list_categories()?;
                render(&CategoryList { rows }, cli.format)?;
            }
            CategoryCommands::AddType(args) => {
                let exercise_type = context
                    .stores
                    .catalog
                    .add_exercise_type(&args.category_id, &args.name)?;
                render(&exercise_type, cli.format)?;
            }
            CategoryCommands::Types(args) => {
                let rows = context.stores.catalog.list_exercise_types(&args.category_id)?;
                render(&ExerciseTypeList { rows }, cli.format)?;
            }
        },
        Commands::Rpe(command) => match command {
            RpeCommands::Add(args) => {
                let rpe = context.stores.catalog.add_rpe(
                    args.scale,
                    &args.display_text,
                    &args.description,
                )?;
                render(&rpe, cli.format)?;
            }
            RpeCommands::List => {
                let rows = context.stores.catalog.list_rpe()?;
                render(&RpeList { rows }, cli.format)?;
            }
        },
        Commands::Plan(command) => match command {
            PlanCommands::Create(args) => {
                let tree = context.stores.plans.create_plan(&args.to_new_plan())?;
                render(&tree, cli.format)?;
            }
            PlanCommands::Clone(args) => {
                let tree = context
                    .stores
                    .plans
                    .clone_plan(&args.source_plan_id, &args.to_request())?;
                render(&tree, cli.format)?;
            }
            PlanCommands::List(args) => {
                let today = args.today.unwrap_or_else(|| Local::now().date_naive());
                let overview = context.stores.plans.overview(&args.climber, today)?;
                render(&overview, cli.format)?;
            }
            PlanCommands::Show(args) => {
                let tree = context
                    .stores
                    .plans
                    .retrieve_plan(&args.plan_id, &args.climber)?;
                render(&tree, cli.format)?;
            }
            PlanCommands::Delete(args) => {
                let rows_removed = context
                    .stores
                    .plans
                    .delete_plan(&args.plan_id, &args.climber)?;
                let report = DeleteReport {
                    plan_id: args.plan_id.clone(),
                    rows_removed,
                };
                render(&report, cli.format)?;
            }
        },
        Commands::Day(command) => match command {
            DayCommands::Show(args) => {
                render(&context.stores.plans.fetch_day(&args.day_id)?, cli.format)?;
            }
            DayCommands::SelectExercises(args) => {
                let selection = context
                    .stores
                    .plans
                    .select_exercises(&args.day_id, &args.exercises)?;
                render(&selection, cli.format)?;
            }
            DayCommands::Move(args) => {
                let day = context.stores.plans.move_day(&args.day_id, args.new_date)?;
                render(&day, cli.format)?;
            }
            DayCommands::Notes(args) => {
                let plans = &context.stores.plans;
                plans.update_day_notes(&args.day_id, &args.notes)?;
                render(&plans.fetch_day(&args.day_id)?.day, cli.format)?;
            }
        },
        Commands::Workout(command) => match command {
            WorkoutCommands::Update(args) => {
                let workout = context
                    .stores
                    .plans
                    .update_workout(&args.workout_id, &args.to_update())?;
                render(&workout, cli.format)?;
            }
            WorkoutCommands::Complete(args) => {
                let receipt = context.stores.completions.record_completion(
                    &args.workout_id,
                    &args.climber,
                    &args.to_submission(),
                    Utc::now(),
                )?;
                render(&receipt, cli.format)?;
            }
        },
        Commands::Metrics(args) => {
            let rows = context
                .stores
                .completions
                .list_metrics(&args.climber, args.metric.map(Into::into))?;
            render(&MetricList { rows }, cli.format)?;
        }
        Commands::Outbox(command) => match command {
            OutboxCommands::Status(args) => render(&context.outbox_status(args)?, cli.format)?,
            OutboxCommands::Drain => {
                let outcomes = block_on(context.drain_outbox())??;
                render(&DrainReport { outcomes }, cli.format)?;
            }
            OutboxCommands::Work => {
                let fanout = context.stores.fanout(context.fanout_config());
                info!("metric fan-out worker started");
                block_on(fanout.run_loop())??;
            }
            OutboxCommands::Requeue(args) => {
                let outbox = &context.stores.outbox;
                outbox.requeue(args.outbox_id, Utc::now())?;
                let entry = outbox.fetch(args.outbox_id)?.ok_or_else(|| {
                    EigerError::not_found(
                        EntityKind::OutboxEntry,
                        args.outbox_id.to_string(),
                    )
                })?;
                render(&entry, cli.format)?;
            }
        },
        Commands::Db(DbCommands::Backup(args)) => {
            render(&context.backup(args)?, cli.format)?;
        }
        Commands::Completions(_) => {}
    }

    Ok(())
}

/// Installs the fmt subscriber on stderr. `RUST_LOG` wins over `fallback`.
pub fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug)]
struct AppContext {
    config: EigerConfig,
    stores: EigerStores,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = load_eiger_config(&cli.config)?;
        if let Some(database) = &cli.database {
            let database = if database.is_absolute() {
                database.clone()
            } else {
                std::env::current_dir()?.join(database)
            };
            config.paths.database = database.to_string_lossy().into_owned();
        }
        let database = config.database_path();
        if let Some(parent) = database.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let stores = EigerStores::from_config(&config)?;
        Ok(Self { config, stores })
    }

    fn fanout_config(&self) -> FanoutConfig {
        FanoutConfig::from(&self.config.outbox)
    }

    fn init(&self) -> Result<InitReport> {
        self.stores.initialize()?;
        Ok(InitReport {
            node_name: self.config.system.node_name.clone(),
            environment: self.config.system.environment.clone(),
            database: self.stores.db.path().to_path_buf(),
        })
    }

    fn exercise(&self, exercise_id: &str) -> Result<Exercise> {
        let exercise = self
            .stores
            .catalog
            .fetch_exercise(exercise_id)?
            .ok_or_else(|| {
                EigerError::not_found(EntityKind::Exercise, exercise_id)
            })?;
        Ok(exercise)
    }

    fn outbox_status(&self, args: &OutboxStatusArgs) -> Result<OutboxReport> {
        let outbox = &self.stores.outbox;
        Ok(OutboxReport {
            counts: outbox.counts()?,
            entries: outbox.list(args.status.map(Into::into), args.limit)?,
        })
    }

    async fn drain_outbox(&self) -> Result<Vec<FanoutOutcome>> {
        let fanout = self.stores.fanout(self.fanout_config());
        Ok(fanout.drain(Utc::now()).await?)
    }

    fn backup(&self, args: &DbBackupArgs) -> Result<BackupReport> {
        let destination = args.output.clone().unwrap_or_else(|| {
            self.config.backup_dir().join(format!(
                "eiger-{}.sqlite",
                Utc::now().format("%Y%m%dT%H%M%S")
            ))
        });
        self.stores.db.backup_to(&destination)?;
        Ok(BackupReport {
            source: self.stores.db.path().to_path_buf(),
            destination,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct InitReport {
    pub node_name: String,
    pub environment: String,
    pub database: PathBuf,
}

impl DisplayFallback for InitReport {
    fn display(&self) -> String {
        format!(
            "Schema ready at {} (node: {}, env: {})",
            self.database.display(),
            self.node_name,
            self.environment
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ExerciseList {
    pub rows: Vec<Exercise>,
}

impl DisplayFallback for ExerciseList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No exercises found".to_string();
        }
        self.rows
            .iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DisplayFallback for Exercise {
    fn display(&self) -> String {
        let mut flags = Vec::new();
        if self.reviewed {
            flags.push("reviewed".to_string());
        }
        if self.is_test {
            match self.test_configuration {
                Some(config) => flags.push(format!("test={config}")),
                None => flags.push("test".to_string()),
            }
        }
        if !self.metric_types.is_empty() {
            let metrics: Vec<&str> = self.metric_types.iter().map(|m| m.as_str()).collect();
            flags.push(format!("metrics={}", metrics.join(",")));
        }
        format!("{} | {} | {}", self.exercise_id, self.name, flags.join(" "))
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub rows: Vec<Category>,
}

impl DisplayFallback for CategoryList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No categories yet".to_string();
        }
        self.rows
            .iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DisplayFallback for Category {
    fn display(&self) -> String {
        format!("{} | {} | {}", self.category_id, self.name, self.color)
    }
}

#[derive(Debug, Serialize)]
pub struct ExerciseTypeList {
    pub rows: Vec<ExerciseType>,
}

impl DisplayFallback for ExerciseTypeList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No exercise types in this category".to_string();
        }
        self.rows
            .iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DisplayFallback for ExerciseType {
    fn display(&self) -> String {
        format!("{} | {}", self.exercise_type_id, self.name)
    }
}

#[derive(Debug, Serialize)]
pub struct VariationList {
    pub rows: Vec<ExerciseVariation>,
}

impl DisplayFallback for VariationList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No variations".to_string();
        }
        self.rows
            .iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DisplayFallback for ExerciseVariation {
    fn display(&self) -> String {
        let targets = &self.targets;
        let parts: Vec<String> = [
            (targets.sets, "sets"),
            (targets.repetitions, "reps"),
            (targets.seconds_per_repetition, "s/rep"),
            (targets.rest_per_set_in_seconds, "s rest/set"),
            (targets.rest_per_repetition_in_seconds, "s rest/rep"),
            (targets.weight_in_kilos, "kg"),
        ]
        .into_iter()
        .filter_map(|(value, unit)| value.map(|value| format!("{value} {unit}")))
        .collect();
        let status = if self.reviewed { "reviewed" } else { "pending" };
        format!(
            "{} | {} | {} | {status}",
            self.variation_id,
            self.exercise_id,
            parts.join(", ")
        )
    }
}

impl DisplayFallback for PendingReview {
    fn display(&self) -> String {
        let mut lines = vec![format!("Exercises pending review: {}", self.exercises.len())];
        lines.extend(self.exercises.iter().map(|e| format!("  {}", e.display())));
        lines.push(format!("Variations pending review: {}", self.variations.len()));
        lines.extend(self.variations.iter().map(|v| format!("  {}", v.display())));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct RpeList {
    pub rows: Vec<Rpe>,
}

impl DisplayFallback for RpeList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "Perceived effort scale is empty".to_string();
        }
        self.rows
            .iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DisplayFallback for Rpe {
    fn display(&self) -> String {
        format!("{} | {} | {}", self.rpe_id, self.scale, self.display_text)
    }
}

impl DisplayFallback for TrainingPlanTree {
    fn display(&self) -> String {
        let plan = &self.plan;
        let mut lines = vec![format!(
            "{} | {} | climber={} | {} to {}",
            plan.plan_id,
            plan.name,
            plan.climber_id,
            plan.starting_date,
            self.end_date()
        )];
        for week in &self.weeks {
            lines.push(format!("  Week {}", week.week.number));
            for day in &week.days {
                lines.push(format!(
                    "    {} {} ({} workouts) [{}]",
                    day.day.day_of_week,
                    day.day.date,
                    day.workouts.len(),
                    day.day.day_id
                ));
                for workout in &day.workouts {
                    lines.push(format!("      - {}", workout.display()));
                }
            }
        }
        lines.join("\n")
    }
}

impl DisplayFallback for PlanOverview {
    fn display(&self) -> String {
        let mut lines = Vec::new();
        let groups = [
            ("In progress", &self.in_progress),
            ("Upcoming", &self.upcoming),
            ("Completed", &self.completed),
        ];
        for (title, plans) in groups {
            lines.push(format!("{title}:"));
            if plans.is_empty() {
                lines.push("  -".to_string());
            }
            for summary in plans.iter() {
                lines.push(format!("  {}", summary.display()));
            }
        }
        lines.push("Today:".to_string());
        if self.planned_workouts_for_today.is_empty() {
            lines.push("  nothing scheduled".to_string());
        }
        for scheduled in &self.planned_workouts_for_today {
            let mark = if scheduled.completed { "x" } else { " " };
            lines.push(format!(
                "  [{mark}] {} ({})",
                scheduled.exercise_name, scheduled.workout.workout_id
            ));
        }
        lines.join("\n")
    }
}

impl DisplayFallback for PlanSummary {
    fn display(&self) -> String {
        let progress = match (self.current_week, self.progress_percentage) {
            (Some(week), Some(percentage)) => {
                format!(" | week {week}/{} ({percentage:.0}%)", self.total_weeks)
            }
            _ => String::new(),
        };
        format!(
            "{} | {} | {} to {}{}",
            self.plan.plan_id, self.plan.name, self.plan.starting_date, self.end_date, progress
        )
    }
}

impl DisplayFallback for DayDetail {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "{} | week {} | {}",
            self.day.display(),
            self.week_number,
            self.plan_id
        )];
        if !self.day.notes.is_empty() {
            lines.push(format!("Notes: {}", self.day.notes));
        }
        for workout in &self.workouts {
            lines.push(format!("  - {}", workout.display()));
        }
        let dates: Vec<String> = self
            .available_dates
            .iter()
            .map(|date| date.to_string())
            .collect();
        lines.push(format!("Can move to: {}", dates.join(", ")));
        lines.join("\n")
    }
}

impl DisplayFallback for Day {
    fn display(&self) -> String {
        format!("{} {} [{}]", self.day_of_week, self.date, self.day_id)
    }
}

impl DisplayFallback for Workout {
    fn display(&self) -> String {
        let targets = &self.targets;
        let mut parts = vec![format!("{} sets", targets.sets)];
        if let Some(repetitions) = targets.target_repetitions {
            parts.push(format!("{repetitions} reps"));
        }
        if let Some(time) = targets.target_time() {
            let unit = targets
                .target_time_unit
                .map(|unit| unit.as_str())
                .unwrap_or("seconds");
            parts.push(format!("{time} {unit}"));
        }
        if let Some(weight) = targets.target_weight_in_kilos {
            parts.push(format!("+{weight} kg"));
        }
        format!(
            "{} exercise={} {}",
            self.workout_id,
            self.exercise_id,
            parts.join(", ")
        )
    }
}

impl DisplayFallback for ExerciseSelection {
    fn display(&self) -> String {
        format!(
            "Plan {}: {} workouts added, {} removed",
            self.plan_id,
            self.added.len(),
            self.removed.len()
        )
    }
}

impl DisplayFallback for CompletionReceipt {
    fn display(&self) -> String {
        let mut line = format!(
            "Workout {} completed at {}",
            self.completed.workout_id, self.completed.completion_percentage
        );
        if let Some(outbox_id) = self.outbox_id {
            line.push_str(&format!(" (metrics queued as #{outbox_id})"));
        }
        line
    }
}

#[derive(Debug, Serialize)]
pub struct MetricList {
    pub rows: Vec<ClimberMetric>,
}

impl DisplayFallback for MetricList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No metrics recorded".to_string();
        }
        self.rows
            .iter()
            .map(|metric| {
                let recorded = metric
                    .created_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "{recorded} | {} | {} | workout {}",
                    metric.metric_type.label(),
                    metric.value,
                    metric.workout_id
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteReport {
    pub plan_id: String,
    pub rows_removed: usize,
}

impl DisplayFallback for DeleteReport {
    fn display(&self) -> String {
        format!("Plan {} deleted ({} rows)", self.plan_id, self.rows_removed)
    }
}

#[derive(Debug, Serialize)]
pub struct OutboxReport {
    pub counts: OutboxCounts,
    pub entries: Vec<OutboxEntry>,
}

impl DisplayFallback for OutboxReport {
    fn display(&self) -> String {
        let counts = &self.counts;
        let mut lines = vec![format!(
            "pending={} in_progress={} done={} dead={} total={}",
            counts.pending,
            counts.in_progress,
            counts.done,
            counts.dead,
            counts.total()
        )];
        for entry in &self.entries {
            let error = entry.last_error.as_deref().unwrap_or("-");
            lines.push(format!(
                "#{id} status={status} attempts={attempts} next={next} value={value} error={error}",
                id = entry.outbox_id,
                status = entry.status,
                attempts = entry.attempts,
                next = entry.next_attempt_at.format("%Y-%m-%d %H:%M:%S"),
                value = entry.value,
            ));
        }
        lines.join("\n")
    }
}

impl DisplayFallback for OutboxEntry {
    fn display(&self) -> String {
        format!(
            "#{} status={} attempts={}",
            self.outbox_id, self.status, self.attempts
        )
    }
}

#[derive(Debug, Serialize)]
pub struct DrainReport {
    pub outcomes: Vec<FanoutOutcome>,
}

impl DisplayFallback for DrainReport {
    fn display(&self) -> String {
        if self.outcomes.is_empty() {
            return "Nothing due".to_string();
        }
        self.outcomes
            .iter()
            .map(|outcome| match outcome {
                FanoutOutcome::Delivered {
                    outbox_id,
                    metrics_written,
                } => format!("#{outbox_id} delivered ({metrics_written} metrics)"),
                FanoutOutcome::Retried {
                    outbox_id,
                    attempts,
                    next_attempt_at,
                } => format!(
                    "#{outbox_id} failed (attempt {attempts}), retry at {}",
                    next_attempt_at.format("%Y-%m-%d %H:%M:%S")
                ),
                FanoutOutcome::Dead {
                    outbox_id,
                    attempts,
                } => format!("#{outbox_id} dead after {attempts} attempts"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct BackupReport {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl DisplayFallback for BackupReport {
    fn display(&self) -> String {
        format!(
            "Backed up {} to {}",
            self.source.display(),
            self.destination.display()
        )
    }
}

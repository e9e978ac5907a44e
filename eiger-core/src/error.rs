use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Field-keyed validation messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(())` when no message was collected.
    pub fn into_result(self) -> EigerResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(EigerError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    TrainingPlan,
    Week,
    Day,
    Workout,
    Exercise,
    Category,
    ExerciseType,
    ExerciseVariation,
    Rpe,
    OutboxEntry,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::TrainingPlan => "training plan",
            EntityKind::Week => "week",
            EntityKind::Day => "day",
            EntityKind::Workout => "workout",
            EntityKind::Exercise => "exercise",
            EntityKind::Category => "category",
            EntityKind::ExerciseType => "exercise type",
            EntityKind::ExerciseVariation => "exercise variation",
            EntityKind::Rpe => "rpe",
            EntityKind::OutboxEntry => "outbox entry",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EigerError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("workout {workout_id} already completed")]
    AlreadyCompleted { workout_id: String },
    #[error("integrity error: {0}")]
    Integrity(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("store path not configured")]
    MissingStore,
    #[error("failed to open database at {path}: {source}")]
    OpenDatabase {
        path: PathBuf,
        source: rusqlite::Error,
    },
}

impl EigerError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        EigerError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EigerError::Validation(ValidationErrors::single(field, message))
    }
}

pub type EigerResult<T> = std::result::Result<T, EigerError>;

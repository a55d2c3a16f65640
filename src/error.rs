use crate::{data::student::StudentId, import_export::ImportProblem};
use snafu::Snafu;
use std::{num::ParseIntError, path::PathBuf, process::ExitCode};

pub type RosterResult<T> = Result<T, RosterError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ValidationError {
    #[snafu(display("`{}` must be at most {} characters, found {}", field, max, found))]
    TooLong {
        field: &'static str,
        max: usize,
        found: usize,
    },
    #[snafu(display("`{}` may not be blank", field))]
    Blank { field: &'static str },
    #[snafu(display("`{}` may not contain NUL characters", field))]
    NulCharacter { field: &'static str },
    #[snafu(display("Unable to parse birth date {:?}, expected YYYY-MM-DD", original))]
    BadBirthDate {
        source: time::error::Parse,
        original: String,
    },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RosterError {
    #[snafu(display("Error opening database"))]
    OpenDatabase { source: sqlx::Error },
    #[snafu(display("Error getting db connection"))]
    GetDatabaseConnection { source: sqlx::Error },
    #[snafu(display("Error making SQL query"))]
    MakeQuery { source: sqlx::Error },
    #[snafu(display("Error commiting SQL transaction"))]
    CommitTransaction { source: sqlx::Error },
    #[snafu(display("Error rolling back SQL transaction"))]
    RollbackTransaction { source: sqlx::Error },
    #[snafu(display("Error migrating DB schema"))]
    Migrate { source: sqlx::migrate::MigrateError },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse `{}` as a number", name))]
    ParseInt {
        source: ParseIntError,
        name: &'static str,
    },
    #[snafu(context(false), display("Invalid student: {}", source))]
    Invalid { source: ValidationError },
    #[snafu(display("Unable to find student with ID: {}", id))]
    MissingStudent { id: StudentId },
    #[snafu(display("Error with CSVs: {}", source))]
    Csv { source: csv::Error },
    #[snafu(display("Error writing CSV: {}", source))]
    WriteCsv { source: csv::Error },
    #[snafu(display("Error accessing {}", path.display()))]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Error formatting date"))]
    FormatDate { source: time::error::Format },
    #[snafu(display("Import rejected, {} problem(s) found", problems.len()))]
    ImportRejected { problems: Vec<ImportProblem> },
}

impl RosterError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::MissingStudent { .. })
    }

    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::ImportRejected { .. })
    }

    #[allow(clippy::match_same_arms)]
    pub const fn exit_status(&self) -> u8 {
        const FAILURE: u8 = 1; //anything infrastructural
        const BAD_INPUT: u8 = 2;
        const NOT_FOUND: u8 = 3;

        match self {
            Self::OpenDatabase { .. } | Self::GetDatabaseConnection { .. } => FAILURE,
            Self::MakeQuery { .. } => FAILURE,
            Self::CommitTransaction { .. } | Self::RollbackTransaction { .. } => FAILURE,
            Self::Migrate { .. } => FAILURE,
            Self::BadEnvVar { .. } | Self::ParseInt { .. } => FAILURE,
            Self::Invalid { .. } => BAD_INPUT,
            Self::MissingStudent { .. } => NOT_FOUND,
            Self::Csv { .. } => BAD_INPUT,
            Self::WriteCsv { .. } => FAILURE,
            Self::Io { .. } => FAILURE,
            Self::FormatDate { .. } => FAILURE,
            Self::ImportRejected { .. } => BAD_INPUT,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

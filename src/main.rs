#![warn(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::single_match_else)]

use clap::{Parser, Subcommand, ValueHint};
use futures::TryStreamExt;
use roster::{
    config::RuntimeConfiguration,
    data::student::{NewStudent, Student, StudentId, StudentPatch, format_birth_date, parse_birth_date},
    error::{IoSnafu, RosterError, RosterResult},
    import_export::{draft_students_from_path, export_students_csv, import_students},
    state::RosterState,
    store::{StudentStore, postgres::PostgresStudentStore},
};
use snafu::ResultExt;
use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};
use time::Date;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[macro_use]
extern crate tracing;

#[derive(Parser)]
#[command(
    name = "roster",
    version,
    about = "Keep track of students",
    long_about = None,
    after_help = r#"Database settings come from DB_USER, DB_PASSWORD, DB_PATH, DB_PORT and DB_NAME,
either in the environment or in a .env file. Set RUST_LOG to see logs.

EXAMPLES
  $ roster create --name Ana --city Lisbon --address "Rua 1" --birth-date 2000-01-01
  $ roster update 1 --city Porto
  $ roster import students.csv --check
  $ roster export students.csv"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every student
    List,
    /// Show one student
    Get { id: StudentId },
    /// Add a student
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        address: String,
        #[arg(long, value_parser = parse_birth_date, help = "YYYY-MM-DD")]
        birth_date: Date,
        #[arg(long, help = "Mark the student as inactive")]
        inactive: bool,
    },
    /// Change some fields of a student
    Update {
        id: StudentId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, value_parser = parse_birth_date, help = "YYYY-MM-DD")]
        birth_date: Option<Date>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Remove a student
    Delete { id: StudentId },
    /// Add every student in a CSV file, or none if any row is bad
    Import {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(long, help = "Only check the file, don't touch the database")]
        check: bool,
    },
    /// Write every student as CSV, to stdout if no file is given
    Export {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
}

fn student_line(student: &Student) -> RosterResult<String> {
    Ok(format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        student.id,
        student.name,
        student.city,
        format_birth_date(student.birth_date)?,
        student.is_active,
        student.address
    ))
}

const HEADER_LINE: &str = "id\tname\tcity\tbirth_date\tis_active\taddress";

async fn connect() -> RosterResult<(RosterState, PostgresStudentStore)> {
    let config = RuntimeConfiguration::new()?;
    let state = RosterState::new(&config).await?;
    Ok((state.clone(), PostgresStudentStore::new(state)))
}

async fn dispatch(store: &dyn StudentStore, command: Command) -> RosterResult<()> {
    match command {
        Command::List => {
            let mut students = store.list();
            println!("{HEADER_LINE}");
            while let Some(student) = students.try_next().await? {
                println!("{}", student_line(&student)?);
            }
        }
        Command::Get { id } => {
            let student = store.get(id).await?;
            println!("{HEADER_LINE}\n{}", student_line(&student)?);
        }
        Command::Create {
            name,
            city,
            address,
            birth_date,
            inactive,
        } => {
            let mut to_be_added = NewStudent::new(name, city, address, birth_date);
            if inactive {
                to_be_added = to_be_added.inactive();
            }

            let student = store.create(to_be_added).await?;
            println!("{HEADER_LINE}\n{}", student_line(&student)?);
        }
        Command::Update {
            id,
            name,
            city,
            address,
            birth_date,
            active,
        } => {
            let patch = StudentPatch {
                name,
                city,
                address,
                birth_date,
                is_active: active,
            };
            if patch.is_empty() {
                warn!(id, "No fields given to update");
            }

            let student = store.update(id, patch).await?;
            println!("{HEADER_LINE}\n{}", student_line(&student)?);
        }
        Command::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted student {id}");
        }
        Command::Import { file, .. } => {
            let drafts = draft_students_from_path(&file)?;
            let created = import_students(store, drafts).await?;
            println!("Imported {} students", created.len());
        }
        Command::Export { file } => {
            let writer: Box<dyn Write + Send> = match &file {
                Some(path) => Box::new(File::create(path).context(IoSnafu { path })?),
                None => Box::new(io::stdout()),
            };
            let n = export_students_csv(store, writer).await?;
            if let Some(path) = file {
                println!("Exported {n} students to {}", path.display());
            }
        }
    }

    Ok(())
}

async fn run(command: Command) -> RosterResult<()> {
    if let Command::Import { file, check: true } = &command {
        let drafts = draft_students_from_path(file)?;
        println!("{} students ready to import", drafts.len());
        return Ok(());
    }

    let (state, store) = connect().await?;
    let result = dispatch(&store, command).await;
    state.sensible_shutdown().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let dotenv_result = dotenvy::dotenv();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .finish(),
    )
    .expect("unable to set tracing subscriber");

    if let Err(e) = dotenv_result {
        debug!(?e, "No .env file loaded");
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(?e, "Error!");
            eprintln!("error: {e}");
            if let RosterError::ImportRejected { problems } = &e {
                for problem in problems {
                    eprintln!("  {problem}");
                }
            }
            e.exit_code()
        }
    }
}

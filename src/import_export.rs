//! Bulk CSV import and export of students.
//!
//! Import is checked in full before anything is written: either every row becomes a student or
//! the caller gets back every problem found, each tagged with its line in the file.

use crate::{
    data::student::{NewStudent, Student, StudentId, format_birth_date, parse_birth_date},
    error::{CsvSnafu, IoSnafu, RosterError, RosterResult, WriteCsvSnafu},
    store::StudentStore,
};
use csv::StringRecord;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::{
    fmt::{Display, Formatter},
    fs::File,
    io::{Read, Write},
    path::Path,
};

#[derive(Deserialize)]
struct CsvStudent {
    name: String,
    city: String,
    address: String,
    birth_date: String,
    is_active: Option<bool>,
}

#[derive(Serialize)]
struct ExportedStudent<'a> {
    id: StudentId,
    name: &'a str,
    city: &'a str,
    address: &'a str,
    birth_date: String,
    is_active: bool,
}

impl<'a> ExportedStudent<'a> {
    fn new(student: &'a Student) -> RosterResult<Self> {
        Ok(Self {
            id: student.id,
            name: &student.name,
            city: &student.city,
            address: &student.address,
            birth_date: format_birth_date(student.birth_date)?,
            is_active: student.is_active,
        })
    }
}

#[derive(Debug)]
pub struct ImportProblem {
    pub line: Option<u64>,
    pub error: RosterError,
}

impl Display for ImportProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

fn draft_from_record(record: &StringRecord, headers: &StringRecord) -> RosterResult<NewStudent> {
    let CsvStudent {
        name,
        city,
        address,
        birth_date,
        is_active,
    } = record.deserialize(Some(headers)).context(CsvSnafu)?;

    let draft = NewStudent {
        name,
        city,
        address,
        birth_date: parse_birth_date(&birth_date)?,
        is_active: is_active.unwrap_or(true),
    };

    Ok(draft.tidied()?)
}

/// Reads `name,city,address,birth_date[,is_active]` rows, other columns are ignored.
pub fn draft_students_from_csv(reader: impl Read) -> RosterResult<Vec<NewStudent>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().context(CsvSnafu)?.clone();

    let mut drafts = vec![];
    let mut problems = vec![];

    for record in rdr.records() {
        let record = match record {
            Ok(x) => x,
            Err(source) => {
                problems.push(ImportProblem {
                    line: source.position().map(csv::Position::line),
                    error: RosterError::Csv { source },
                });
                continue;
            }
        };

        match draft_from_record(&record, &headers) {
            Ok(draft) => drafts.push(draft),
            Err(error) => problems.push(ImportProblem {
                line: record.position().map(csv::Position::line),
                error,
            }),
        }
    }

    if !problems.is_empty() {
        warn!(n = problems.len(), "Rejecting student import");
        return Err(RosterError::ImportRejected { problems });
    }

    debug!(n = drafts.len(), "Read student drafts");
    Ok(drafts)
}

pub fn draft_students_from_path(path: &Path) -> RosterResult<Vec<NewStudent>> {
    let file = File::open(path).context(IoSnafu { path })?;
    draft_students_from_csv(file)
}

pub async fn import_students(
    store: &dyn StudentStore,
    drafts: Vec<NewStudent>,
) -> RosterResult<Vec<Student>> {
    let created = store.create_many(drafts).await?;
    info!(n = created.len(), "Imported students");
    Ok(created)
}

/// Writes every student as CSV, returning how many rows were written.
pub async fn export_students_csv(store: &dyn StudentStore, writer: impl Write) -> RosterResult<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut students = store.list();
    let mut n = 0;

    while let Some(student) = students.try_next().await? {
        wtr.serialize(ExportedStudent::new(&student)?)
            .context(WriteCsvSnafu)?;
        n += 1;
    }
    wtr.flush().map_err(csv::Error::from).context(WriteCsvSnafu)?;

    info!(n, "Exported students");
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStudentStore;
    use time::macros::date;

    const GOOD: &str = "\
name,city,address,birth_date,is_active
Ana,Lisbon,Rua 1,2000-01-01,
Bea,Porto,\"Rua 2, 3o\",1999-12-31,false
";

    #[test]
    fn reads_drafts_with_defaults() {
        let drafts = draft_students_from_csv(GOOD.as_bytes()).expect("valid csv");

        assert_eq!(
            drafts,
            [
                NewStudent::new("Ana", "Lisbon", "Rua 1", date!(2000 - 01 - 01)),
                NewStudent::new("Bea", "Porto", "Rua 2, 3o", date!(1999 - 12 - 31)).inactive(),
            ]
        );
    }

    #[test]
    fn is_active_column_is_optional() {
        let csv = "name,city,address,birth_date\nAna,Lisbon,Rua 1,2000-01-01\n";
        let drafts = draft_students_from_csv(csv.as_bytes()).expect("valid csv");
        assert!(drafts[0].is_active);
    }

    #[test]
    fn reports_every_bad_row() {
        let csv = format!(
            "name,city,address,birth_date\n\
             Ana,Lisbon,Rua 1,2000-01-01\n\
             Bea,Porto,Rua 2,01/01/2000\n\
             Caz,{},Rua 3,2000-01-01\n\
             Dee,Faro,Rua 4,2000-01-01\n\
             ,Faro,Rua 5,2000-01-01\n",
            "x".repeat(101)
        );

        let Err(RosterError::ImportRejected { problems }) = draft_students_from_csv(csv.as_bytes())
        else {
            panic!("import should have been rejected");
        };

        let lines: Vec<_> = problems.iter().map(|p| p.line).collect();
        assert_eq!(lines, [Some(3), Some(4), Some(6)]);
        assert!(problems.iter().all(|p| p.error.is_validation()));
        assert!(problems[0].to_string().starts_with("line 3: "));
    }

    #[test]
    fn missing_columns_are_csv_problems() {
        let csv = "name,city\nAna,Lisbon\n";
        let Err(RosterError::ImportRejected { problems }) = draft_students_from_csv(csv.as_bytes())
        else {
            panic!("import should have been rejected");
        };
        assert!(matches!(problems[0].error, RosterError::Csv { .. }));
    }

    #[test]
    fn reads_drafts_from_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("students.csv");
        std::fs::write(&path, GOOD).expect("write csv");

        let drafts = draft_students_from_path(&path).expect("valid file");
        assert_eq!(drafts.len(), 2);

        let missing = draft_students_from_path(&dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(RosterError::Io { path, .. }) if path.ends_with("nope.csv")));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[tokio::test]
    async fn failed_writes_are_not_input_problems() {
        let store = MemoryStudentStore::new();
        let drafts = draft_students_from_csv(GOOD.as_bytes()).expect("valid csv");
        import_students(&store, drafts).await.expect("import");

        let err = export_students_csv(&store, ClosedPipe)
            .await
            .expect_err("nowhere to write");
        assert!(matches!(err, RosterError::WriteCsv { .. }));
        assert_eq!(err.exit_status(), 1);
    }

    #[tokio::test]
    async fn exports_reimport_to_the_same_students() {
        let source = MemoryStudentStore::new();
        let drafts = draft_students_from_csv(GOOD.as_bytes()).expect("valid csv");
        let originals = import_students(&source, drafts).await.expect("import");

        let mut exported = vec![];
        let n = export_students_csv(&source, &mut exported)
            .await
            .expect("export");
        assert_eq!(n, 2);

        let exported = String::from_utf8(exported).expect("utf8");
        assert!(exported.starts_with("id,name,city,address,birth_date,is_active\n"));
        assert!(exported.contains("2,Bea,Porto,\"Rua 2, 3o\",1999-12-31,false"));

        let target = MemoryStudentStore::new();
        let drafts = draft_students_from_csv(exported.as_bytes()).expect("exported csv reads");
        let copies = import_students(&target, drafts).await.expect("import");
        assert_eq!(copies, originals);
    }
}

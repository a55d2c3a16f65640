use crate::{
    data::student::{NewStudent, Student, StudentId, StudentPatch},
    error::{MissingStudentSnafu, RosterResult},
    store::StudentStore,
};
use async_trait::async_trait;
use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use snafu::OptionExt;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    last_id: StudentId,
    students: BTreeMap<StudentId, Student>,
}

impl Inner {
    fn insert(&mut self, to_be_added: NewStudent) -> Student {
        self.last_id += 1;
        let student = to_be_added.into_student(self.last_id);
        self.students.insert(student.id, student.clone());
        student
    }
}

/// Keeps students for as long as the process lives.
#[derive(Debug, Default)]
pub struct MemoryStudentStore {
    inner: RwLock<Inner>,
}

impl MemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.students.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StudentStore for MemoryStudentStore {
    async fn create(&self, to_be_added: NewStudent) -> RosterResult<Student> {
        let to_be_added = to_be_added.tidied()?;

        let student = self.inner.write().await.insert(to_be_added);
        info!(id = student.id, %student, "Created student");
        Ok(student)
    }

    async fn create_many(&self, to_be_added: Vec<NewStudent>) -> RosterResult<Vec<Student>> {
        let to_be_added = to_be_added
            .into_iter()
            .map(NewStudent::tidied)
            .collect::<Result<Vec<_>, _>>()?;

        let mut inner = self.inner.write().await;
        let created: Vec<_> = to_be_added.into_iter().map(|s| inner.insert(s)).collect();
        info!(n = created.len(), "Created students");
        Ok(created)
    }

    async fn get(&self, id: StudentId) -> RosterResult<Student> {
        self.inner
            .read()
            .await
            .students
            .get(&id)
            .cloned()
            .context(MissingStudentSnafu { id })
    }

    fn list(&self) -> BoxStream<'_, RosterResult<Student>> {
        //snapshot on first poll, so a long-running consumer doesn't hold the lock
        stream::once(async move {
            self.inner
                .read()
                .await
                .students
                .values()
                .cloned()
                .collect::<Vec<_>>()
        })
        .flat_map(|snapshot| stream::iter(snapshot.into_iter().map(Ok)))
        .boxed()
    }

    async fn update(&self, id: StudentId, patch: StudentPatch) -> RosterResult<Student> {
        let patch = patch.tidied()?;

        let mut inner = self.inner.write().await;
        let student = inner
            .students
            .get_mut(&id)
            .context(MissingStudentSnafu { id })?;
        patch.apply_to(student);

        debug!(id, %student, "Updated student");
        Ok(student.clone())
    }

    async fn delete(&self, id: StudentId) -> RosterResult<()> {
        let removed = self
            .inner
            .write()
            .await
            .students
            .remove(&id)
            .context(MissingStudentSnafu { id })?;

        info!(id, student = %removed, "Deleted student");
        Ok(())
    }
}

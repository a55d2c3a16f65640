use crate::{
    data::student::{NewStudent, Student, StudentId, StudentPatch},
    error::{
        CommitTransactionSnafu, MakeQuerySnafu, MissingStudentSnafu, RollbackTransactionSnafu,
        RosterResult,
    },
    state::RosterState,
    store::StudentStore,
};
use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use snafu::{OptionExt, ResultExt, ensure};
use sqlx::PgConnection;

#[derive(Debug, Clone)]
pub struct PostgresStudentStore {
    state: RosterState,
}

impl PostgresStudentStore {
    pub const fn new(state: RosterState) -> Self {
        Self { state }
    }

    async fn insert(to_be_added: NewStudent, conn: &mut PgConnection) -> RosterResult<Student> {
        let NewStudent {
            name,
            city,
            address,
            birth_date,
            is_active,
        } = to_be_added;

        sqlx::query_as(
            "INSERT INTO public.student (name, city, address, birth_date, is_active) VALUES ($1, $2, $3, $4, $5) RETURNING id, name, city, address, birth_date, is_active",
        )
        .bind(name)
        .bind(city)
        .bind(address)
        .bind(birth_date)
        .bind(is_active)
        .fetch_one(conn)
        .await
        .context(MakeQuerySnafu)
    }
}

#[async_trait]
impl StudentStore for PostgresStudentStore {
    async fn create(&self, to_be_added: NewStudent) -> RosterResult<Student> {
        let to_be_added = to_be_added.tidied()?;

        let mut conn = self.state.get_connection().await?;
        let student = Self::insert(to_be_added, &mut conn).await?;

        info!(id = student.id, %student, "Created student");
        Ok(student)
    }

    async fn create_many(&self, to_be_added: Vec<NewStudent>) -> RosterResult<Vec<Student>> {
        let to_be_added = to_be_added
            .into_iter()
            .map(NewStudent::tidied)
            .collect::<Result<Vec<_>, _>>()?;

        let mut created = Vec::with_capacity(to_be_added.len());
        let mut tx = self.state.get_transaction().await?;
        for student in to_be_added {
            match Self::insert(student, &mut tx).await {
                Ok(student) => created.push(student),
                Err(e) => {
                    tx.rollback().await.context(RollbackTransactionSnafu)?;
                    return Err(e);
                }
            }
        }
        tx.commit().await.context(CommitTransactionSnafu)?;

        info!(n = created.len(), "Created students");
        Ok(created)
    }

    async fn get(&self, id: StudentId) -> RosterResult<Student> {
        let mut conn = self.state.get_connection().await?;

        sqlx::query_as(
            "SELECT id, name, city, address, birth_date, is_active FROM public.student WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context(MakeQuerySnafu)?
        .context(MissingStudentSnafu { id })
    }

    fn list(&self) -> BoxStream<'_, RosterResult<Student>> {
        sqlx::query_as::<_, Student>(
            "SELECT id, name, city, address, birth_date, is_active FROM public.student ORDER BY id",
        )
        .fetch(self.state.pool())
        .map(|result| result.context(MakeQuerySnafu))
        .boxed()
    }

    async fn update(&self, id: StudentId, patch: StudentPatch) -> RosterResult<Student> {
        let patch = patch.tidied()?;

        let StudentPatch {
            name,
            city,
            address,
            birth_date,
            is_active,
        } = patch;

        let mut conn = self.state.get_connection().await?;
        //NULL binds keep the stored value
        let student: Student = sqlx::query_as(
            "UPDATE public.student SET name = COALESCE($2, name), city = COALESCE($3, city), address = COALESCE($4, address), birth_date = COALESCE($5, birth_date), is_active = COALESCE($6, is_active) WHERE id = $1 RETURNING id, name, city, address, birth_date, is_active",
        )
        .bind(id)
        .bind(name)
        .bind(city)
        .bind(address)
        .bind(birth_date)
        .bind(is_active)
        .fetch_optional(&mut *conn)
        .await
        .context(MakeQuerySnafu)?
        .context(MissingStudentSnafu { id })?;

        debug!(id, %student, "Updated student");
        Ok(student)
    }

    async fn delete(&self, id: StudentId) -> RosterResult<()> {
        let mut conn = self.state.get_connection().await?;

        let deleted = sqlx::query("DELETE FROM public.student WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .context(MakeQuerySnafu)?
            .rows_affected();
        ensure!(deleted > 0, MissingStudentSnafu { id });

        info!(id, "Deleted student");
        Ok(())
    }
}

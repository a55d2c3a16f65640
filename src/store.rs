use crate::{
    data::student::{NewStudent, Student, StudentId, StudentPatch},
    error::RosterResult,
};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub mod memory;
pub mod postgres;

/// CRUD over student records.
///
/// Writes are validated before they touch storage, so a rejected write leaves the store exactly as
/// it was. Ids come from the store and are never handed out twice, even after a delete.
#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn create(&self, to_be_added: NewStudent) -> RosterResult<Student>;

    /// Creates every student or none of them.
    async fn create_many(&self, to_be_added: Vec<NewStudent>) -> RosterResult<Vec<Student>>;

    async fn get(&self, id: StudentId) -> RosterResult<Student>;

    /// Every student in ascending id order. Each call starts a fresh stream.
    fn list(&self) -> BoxStream<'_, RosterResult<Student>>;

    async fn update(&self, id: StudentId, patch: StudentPatch) -> RosterResult<Student>;

    async fn delete(&self, id: StudentId) -> RosterResult<()>;
}

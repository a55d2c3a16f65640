use futures::TryStreamExt;
use roster::{
    config::RuntimeConfiguration,
    data::student::{NewStudent, Student, StudentPatch},
    error::{RosterError, ValidationError},
    state::RosterState,
    store::{StudentStore, memory::MemoryStudentStore, postgres::PostgresStudentStore},
};
use time::macros::date;

fn ana() -> NewStudent {
    NewStudent::new("Ana", "Lisbon", "Rua 1", date!(2000 - 01 - 01))
}

async fn name_length_boundary(store: &dyn StudentStore) {
    let mut exactly_100 = ana();
    exactly_100.name = "n".repeat(100);
    let created = store.create(exactly_100).await.expect("100 chars is fine");
    assert_eq!(created.name.chars().count(), 100);

    let mut too_long = ana();
    too_long.name = "n".repeat(101);
    let err = store.create(too_long).await.expect_err("101 chars is too long");
    assert!(matches!(
        err,
        RosterError::Invalid {
            source: ValidationError::TooLong { field: "name", .. }
        }
    ));
}

async fn create_defaults_to_active_and_get_round_trips(store: &dyn StudentStore) -> Student {
    let created = store.create(ana()).await.expect("create");
    assert!(created.is_active);
    assert_eq!(created.name, "Ana");
    assert_eq!(created.city, "Lisbon");
    assert_eq!(created.address, "Rua 1");
    assert_eq!(created.birth_date, date!(2000 - 01 - 01));

    assert_eq!(store.get(created.id).await.expect("get"), created);
    created
}

async fn update_changes_only_supplied_fields(store: &dyn StudentStore, original: &Student) {
    let updated = store
        .update(
            original.id,
            StudentPatch {
                city: Some("Porto".into()),
                ..StudentPatch::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(
        updated,
        Student {
            city: "Porto".into(),
            ..original.clone()
        }
    );
    assert_eq!(store.get(original.id).await.expect("get"), updated);
}

async fn delete_then_get_is_not_found(store: &dyn StudentStore, student: &Student) {
    store.delete(student.id).await.expect("delete");

    let err = store.get(student.id).await.expect_err("deleted");
    assert!(matches!(err, RosterError::MissingStudent { id } if id == student.id));
    assert!(store.delete(student.id).await.is_err_and(|e| e.is_not_found()));
}

async fn exercise(store: &dyn StudentStore) {
    name_length_boundary(store).await;
    let ana = create_defaults_to_active_and_get_round_trips(store).await;
    update_changes_only_supplied_fields(store, &ana).await;
    delete_then_get_is_not_found(store, &ana).await;

    let ids: Vec<_> = store
        .list()
        .map_ok(|student| student.id)
        .try_collect()
        .await
        .expect("list");
    assert!(!ids.contains(&ana.id));
    assert!(ids.is_sorted());
}

#[tokio::test]
async fn get_on_empty_store_is_not_found() {
    let store = MemoryStudentStore::new();
    let err = store.get(999_999).await.expect_err("empty store");
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Unable to find student with ID: 999999");
}

#[tokio::test]
async fn memory_store_contract() {
    exercise(&MemoryStudentStore::new()).await;
}

#[tokio::test]
#[ignore = "needs Postgres, configured through the DB_* env vars"]
async fn postgres_store_contract() {
    let _ = dotenvy::dotenv();
    let config = RuntimeConfiguration::new().expect("DB_* vars set");
    let state = RosterState::new(&config).await.expect("connect");
    let store = PostgresStudentStore::new(state.clone());

    exercise(&store).await;

    let mut bad = ana();
    bad.city = String::new();
    let before: Vec<_> = store.list().try_collect().await.expect("list");
    assert!(store.create_many(vec![ana(), bad]).await.is_err());
    let after: Vec<_> = store.list().try_collect().await.expect("list");
    assert_eq!(before, after);

    state.sensible_shutdown().await;
}

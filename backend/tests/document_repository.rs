//! Repository contract checks for `DocumentRepository` over the in-memory collection.

use std::time::Duration;

use datastore::domain::ports::StoreError;
use datastore::domain::{ErrorType, Repository, StatusCode, Write};
use datastore::outbound::memory::{InMemoryCollection, Predicate};
use datastore::repository::DocumentRepository;
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;

mod support;

use support::{Note, fresh_note, properties, stored_note, stored_notes};

type NoteRepository = DocumentRepository<Note, InMemoryCollection<Note>>;

#[fixture]
fn stored() -> Note {
    stored_note("seeded")
}

fn repository_with(documents: impl IntoIterator<Item = Note>) -> NoteRepository {
    DocumentRepository::new(InMemoryCollection::with_documents(documents))
}

#[rstest]
#[tokio::test]
async fn get_returns_stored_record(stored: Note) {
    let repository = repository_with([stored.clone()]);
    properties::get_returns_stored_record(&repository, &stored).await;
}

#[rstest]
#[tokio::test]
async fn zero_ids_are_rejected(stored: Note) {
    properties::zero_ids_are_rejected(&repository_with([stored])).await;
}

#[rstest]
#[tokio::test]
async fn nil_ids_are_never_stored(stored: Note) {
    properties::nil_ids_are_never_stored(&repository_with([stored])).await;
}

#[rstest]
#[tokio::test]
async fn unknown_ids_are_not_found(stored: Note) {
    properties::unknown_ids_are_not_found(&repository_with([stored])).await;
}

#[tokio::test]
async fn create_then_get_round_trips() {
    properties::create_then_get_round_trips(&repository_with([])).await;
}

#[tokio::test]
async fn absent_entity_is_rejected() {
    properties::absent_entity_is_rejected(&repository_with([])).await;
}

#[rstest]
#[tokio::test]
async fn update_replaces_existing_record(stored: Note) {
    let repository = repository_with([stored.clone()]);
    properties::update_replaces_existing_record(&repository, &stored).await;
}

#[rstest]
#[tokio::test]
async fn delete_removes_record(stored: Note) {
    let repository = repository_with([stored.clone()]);
    properties::delete_removes_record(&repository, &stored).await;
}

#[tokio::test]
async fn repeated_get_all_is_stable() {
    properties::repeated_get_all_is_stable(&repository_with(stored_notes(3))).await;
}

#[tokio::test]
async fn filters_are_applied() {
    let mut notes = stored_notes(4);
    notes[1].pinned = true;
    let expected = notes[1].clone();
    let repository = repository_with(notes);

    properties::filters_are_applied(
        &repository,
        Predicate::new(|note: &Note| note.pinned),
        Predicate::new(|note: &Note| note.title == "absent"),
        &expected,
    )
    .await;
}

#[tokio::test]
async fn empty_store_lists_no_content() {
    properties::empty_store_lists_no_content(&repository_with([])).await;
}

#[rstest]
#[tokio::test]
async fn upsert_routes_by_marker(stored: Note) {
    let repository = repository_with([stored.clone()]);
    properties::upsert_routes_by_marker(&repository, &stored).await;
}

#[tokio::test]
async fn pages_over_twenty_five_records() {
    properties::pages_over_twenty_five_records(&repository_with(stored_notes(25))).await;
}

#[rstest]
#[tokio::test]
async fn concurrent_deletes_resolve_once(stored: Note) {
    let collection = InMemoryCollection::with_documents([stored.clone()]);
    let first = DocumentRepository::new(collection.clone());
    let second = DocumentRepository::new(collection.clone());

    let loser = properties::concurrent_deletes_resolve_once(&first, &second, stored.id).await;

    assert_eq!(loser, ErrorType::NotFound);
    assert!(collection.snapshot().is_empty());
}

#[rstest]
#[tokio::test]
async fn upsert_commits_only_effective_writes(stored: Note) {
    let collection = InMemoryCollection::with_documents([stored.clone()]);
    let repository = DocumentRepository::new(collection.clone());

    let inserted = repository
        .apply_changes(Write::from_marked(fresh_note("new")))
        .await;
    let missed = repository
        .apply_changes(Write::Replace(stored_note("ghost")))
        .await;

    assert_eq!(inserted.status_code(), StatusCode::Created);
    assert_eq!(missed.status_code(), StatusCode::NotFound);
    assert_eq!(collection.commits(), 1);
    assert_eq!(collection.aborts(), 1);
    assert_eq!(collection.snapshot().len(), 2);
}

#[rstest]
#[tokio::test]
async fn duplicate_upsert_insert_aborts_and_reports(stored: Note) {
    let collection = InMemoryCollection::with_documents([stored.clone()]);
    let repository = DocumentRepository::new(collection.clone());

    let envelope = repository.apply_changes(Write::Insert(stored)).await;

    assert_eq!(envelope.status_code(), StatusCode::InternalServerError);
    assert_eq!(envelope.error_type(), ErrorType::DatabaseError);
    assert_eq!(collection.commits(), 0);
    assert_eq!(collection.aborts(), 1);
}

#[tokio::test]
async fn cancellation_abandons_the_upsert_transaction() {
    let collection = InMemoryCollection::<Note>::new().with_write_latency(Duration::from_secs(5));
    let token = CancellationToken::new();
    let repository = DocumentRepository::new(collection.clone()).with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let envelope = repository
        .apply_changes(Write::Insert(fresh_note("slow")))
        .await;
    canceller.await.expect("canceller task");

    assert_eq!(envelope.status_code(), StatusCode::InternalServerError);
    assert_eq!(envelope.error_type(), ErrorType::Exception);
    assert_eq!(envelope.message(), Some("operation cancelled"));
    assert_eq!(collection.aborts(), 1);
    assert!(collection.snapshot().is_empty());
}

#[rstest]
#[tokio::test]
async fn store_outage_is_a_database_error(stored: Note) {
    let collection = InMemoryCollection::with_documents([stored.clone()]);
    collection.fail_next(StoreError::connection("server selection timeout"));
    let repository = DocumentRepository::new(collection);

    let envelope = repository.get_all().await;

    assert_eq!(envelope.status_code(), StatusCode::InternalServerError);
    assert_eq!(envelope.error_type(), ErrorType::DatabaseError);
    assert!(envelope.data().is_none());
}

//! Contract properties every `Repository<Note>` must satisfy.

use std::collections::BTreeSet;

use datastore::domain::{EntityId, ErrorType, Repository, StatusCode, Write};
use datastore::PageRequest;

use super::{Note, fresh_note, stored_note};

/// `get` on an existing id returns the stored record with 200.
pub async fn get_returns_stored_record<R: Repository<Note>>(repository: &R, stored: &Note) {
    let envelope = repository.get(stored.id).await;

    assert!(envelope.is_success());
    assert_eq!(envelope.status_code(), StatusCode::Ok);
    assert_eq!(envelope.data(), Some(stored));
}

/// Zero ids never reach the store.
pub async fn zero_ids_are_rejected<R: Repository<Note>>(repository: &R) {
    let fetched = repository.get(EntityId::nil()).await;
    let deleted = repository.delete(EntityId::nil()).await;

    assert!(!fetched.is_success());
    assert_eq!(fetched.status_code(), StatusCode::BadRequest);
    assert_eq!(fetched.error_type(), ErrorType::Validation);
    assert!(!deleted.is_success());
    assert_eq!(deleted.status_code(), StatusCode::BadRequest);
}

/// Nil ids are rejected by every write path and nothing is stored.
pub async fn nil_ids_are_never_stored<R: Repository<Note>>(repository: &R) {
    let nil_note = || Note {
        id: EntityId::nil(),
        ..stored_note("nil")
    };
    let before = ids(repository.get_all().await.into_data());

    let envelopes = [
        repository.create(Some(nil_note())).await,
        repository.update(Some(nil_note())).await,
        repository.apply_changes(Write::Insert(nil_note())).await,
        repository.apply_changes(Write::Replace(nil_note())).await,
    ];

    for envelope in envelopes {
        assert_eq!(envelope.status_code(), StatusCode::BadRequest);
        assert_eq!(envelope.error_type(), ErrorType::Validation);
        assert_eq!(envelope.message(), Some("Entity Id cannot be empty."));
    }
    assert_eq!(ids(repository.get_all().await.into_data()), before);
    assert!(!before.contains(&EntityId::nil()));
}

/// Unknown ids are reported as not found by reads and deletes.
pub async fn unknown_ids_are_not_found<R: Repository<Note>>(repository: &R) {
    let id = EntityId::random();

    assert_eq!(repository.get(id).await.status_code(), StatusCode::NotFound);
    assert_eq!(repository.delete(id).await.status_code(), StatusCode::NotFound);
}

/// A created record reads back equal in every persisted field.
pub async fn create_then_get_round_trips<R: Repository<Note>>(repository: &R) {
    let note = fresh_note("round trip");

    let created = repository.create(Some(note.clone())).await;
    assert_eq!(created.status_code(), StatusCode::Created);
    assert_eq!(created.data(), Some(&note));

    let fetched = repository.get(note.id).await;
    assert_eq!(fetched.into_data(), Some(note));
}

/// An absent entity is a validation failure.
pub async fn absent_entity_is_rejected<R: Repository<Note>>(repository: &R) {
    let created = repository.create(None).await;
    let updated = repository.update(None).await;

    assert_eq!(created.status_code(), StatusCode::BadRequest);
    assert_eq!(updated.status_code(), StatusCode::BadRequest);
}

/// `update` replaces every field of an existing record and 404s otherwise.
pub async fn update_replaces_existing_record<R: Repository<Note>>(repository: &R, stored: &Note) {
    let replacement = Note {
        title: format!("{} (edited)", stored.title),
        pinned: !stored.pinned,
        ..stored.clone()
    };

    let updated = repository.update(Some(replacement.clone())).await;
    assert_eq!(updated.status_code(), StatusCode::Ok);
    assert_eq!(
        repository.get(stored.id).await.into_data(),
        Some(replacement)
    );

    let missing = repository.update(Some(stored_note("ghost"))).await;
    assert_eq!(missing.status_code(), StatusCode::NotFound);
}

/// A successful delete removes the record.
pub async fn delete_removes_record<R: Repository<Note>>(repository: &R, stored: &Note) {
    let deleted = repository.delete(stored.id).await;

    assert_eq!(deleted.status_code(), StatusCode::Ok);
    assert_eq!(
        repository.get(stored.id).await.status_code(),
        StatusCode::NotFound
    );
}

/// Reads without intervening writes return the same items.
pub async fn repeated_get_all_is_stable<R: Repository<Note>>(repository: &R) {
    let first = ids(repository.get_all().await.into_data());
    let second = ids(repository.get_all().await.into_data());

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

/// Filters are applied as supplied, for listings and single lookups.
pub async fn filters_are_applied<R: Repository<Note>>(
    repository: &R,
    pinned: R::Filter,
    nothing: R::Filter,
    expected: &Note,
) {
    let listed = repository.get_all_matching(pinned.clone()).await;
    assert_eq!(listed.status_code(), StatusCode::Ok);
    assert_eq!(listed.into_data(), Some(vec![expected.clone()]));

    let found = repository.find(pinned).await;
    assert_eq!(found.into_data(), Some(expected.clone()));

    let empty = repository.get_all_matching(nothing.clone()).await;
    assert_eq!(empty.status_code(), StatusCode::NoContent);
    assert!(empty.is_success());

    let none = repository.find(nothing).await;
    assert_eq!(none.status_code(), StatusCode::NotFound);
}

/// An empty store lists as 204 with no items.
pub async fn empty_store_lists_no_content<R: Repository<Note>>(repository: &R) {
    let envelope = repository.get_all().await;

    assert!(envelope.is_success());
    assert_eq!(envelope.status_code(), StatusCode::NoContent);
    assert_eq!(envelope.error_type(), ErrorType::EmptyResult);
    assert!(envelope.into_data().unwrap_or_default().is_empty());
}

/// Upserts insert new records, replace existing ones, and 404 on a missing
/// replace target without writing anything.
pub async fn upsert_routes_by_marker<R: Repository<Note>>(repository: &R, stored: &Note) {
    let new_note = fresh_note("upserted");
    let inserted = repository.apply_changes(Write::from_marked(new_note.clone())).await;
    assert_eq!(inserted.status_code(), StatusCode::Created);
    assert_eq!(repository.get(new_note.id).await.into_data(), Some(new_note));

    let replacement = Note {
        title: "replaced".to_owned(),
        ..stored.clone()
    };
    let replaced = repository
        .apply_changes(Write::from_marked(replacement.clone()))
        .await;
    assert_eq!(replaced.status_code(), StatusCode::Ok);
    assert_eq!(repository.get(stored.id).await.into_data(), Some(replacement));

    let ghost = stored_note("ghost");
    let missed = repository.apply_changes(Write::Replace(ghost.clone())).await;
    assert_eq!(missed.status_code(), StatusCode::NotFound);
    assert_eq!(
        repository.get(ghost.id).await.status_code(),
        StatusCode::NotFound
    );
}

/// Paging over 25 records: page 2 and page 3 of size 10.
pub async fn pages_over_twenty_five_records<R: Repository<Note>>(repository: &R) {
    let request = PageRequest::new(2, 10).expect("valid request");
    let page = repository
        .page(None, request)
        .await
        .into_data()
        .expect("page 2");

    assert_eq!(page.items().len(), 10);
    assert_eq!(page.total_count(), 25);
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_previous_page());
    assert!(page.has_next_page());

    let request = PageRequest::new(3, 10).expect("valid request");
    let last = repository
        .page(None, request)
        .await
        .into_data()
        .expect("page 3");

    assert_eq!(last.items().len(), 5);
    assert!(!last.has_next_page());
}

/// Two concurrent deletes of one record: exactly one succeeds, the other
/// reports 404, and neither reports a server error.
///
/// Returns the error type of the losing delete.
pub async fn concurrent_deletes_resolve_once<R: Repository<Note>>(
    first: &R,
    second: &R,
    id: EntityId,
) -> ErrorType {
    let (a, b) = tokio::join!(first.delete(id), second.delete(id));
    let (winner, loser) = if a.is_success() { (a, b) } else { (b, a) };

    assert_eq!(winner.status_code(), StatusCode::Ok);
    assert_eq!(loser.status_code(), StatusCode::NotFound);
    assert!(!loser.is_success());
    loser.error_type()
}

fn ids(rows: Option<Vec<Note>>) -> BTreeSet<EntityId> {
    rows.unwrap_or_default().into_iter().map(|note| note.id).collect()
}

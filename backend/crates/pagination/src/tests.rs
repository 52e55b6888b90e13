//! Unit tests for page requests, page metadata, and the paging driver.

use std::cell::RefCell;

use rstest::rstest;
use serde_json::json;

use super::*;

fn stored(count: u32) -> Vec<u32> {
    (1..=count).collect()
}

async fn page_of(rows: &[u32], request: PageRequest) -> Page<u32> {
    let total = rows.len() as u64;
    let outcome: Result<Page<u32>, std::convert::Infallible> = paginate(
        request,
        || async move { Ok(total) },
        |skip, take| async move {
            Ok(rows
                .iter()
                .copied()
                .skip(usize::try_from(skip).expect("skip fits"))
                .take(usize::try_from(take).expect("take fits"))
                .collect())
        },
    )
    .await;
    outcome.expect("infallible")
}

#[rstest]
#[case(0, 10, PageRequestError::ZeroPageNumber)]
#[case(1, 0, PageRequestError::ZeroPageSize)]
#[case(0, 0, PageRequestError::ZeroPageNumber)]
fn zero_values_are_rejected(
    #[case] page_number: u32,
    #[case] page_size: u32,
    #[case] expected: PageRequestError,
) {
    assert_eq!(PageRequest::new(page_number, page_size), Err(expected));
}

#[rstest]
#[case(1, 10, 0)]
#[case(2, 10, 10)]
#[case(3, 7, 14)]
#[case(u32::MAX, u32::MAX, (u64::from(u32::MAX) - 1) * u64::from(u32::MAX))]
fn skip_is_offset_of_previous_pages(
    #[case] page_number: u32,
    #[case] page_size: u32,
    #[case] expected: u64,
) {
    let request = PageRequest::new(page_number, page_size).expect("valid request");
    assert_eq!(request.skip(), expected);
    assert_eq!(request.take(), u64::from(page_size));
}

#[rstest]
fn default_request_is_first_page_of_twenty() {
    let request = PageRequest::default();
    assert_eq!(request.page_number(), DEFAULT_PAGE_NUMBER);
    assert_eq!(request.page_size(), DEFAULT_PAGE_SIZE);
}

#[rstest]
fn request_deserialises_with_defaults() {
    let request: PageRequest = serde_json::from_value(json!({ "pageSize": 5 })).expect("valid");
    assert_eq!(request.page_number(), 1);
    assert_eq!(request.page_size(), 5);
}

#[rstest]
fn request_deserialisation_rejects_zero_size() {
    let result = serde_json::from_value::<PageRequest>(json!({ "pageNumber": 1, "pageSize": 0 }));
    let err = result.expect_err("zero page size must be rejected");
    assert!(err.to_string().contains("page size"));
}

#[rstest]
#[case(0, 10, 0)]
#[case(25, 10, 3)]
#[case(30, 10, 3)]
#[case(31, 10, 4)]
#[case(1, 20, 1)]
fn total_pages_rounds_up(#[case] total: u64, #[case] size: u32, #[case] expected: u64) {
    let request = PageRequest::new(1, size).expect("valid request");
    let page: Page<u32> = Page::new(Vec::new(), request, total);
    assert_eq!(page.total_pages(), expected);
}

#[tokio::test]
async fn middle_page_of_twenty_five_records() {
    let rows = stored(25);
    let page = page_of(&rows, PageRequest::new(2, 10).expect("valid")).await;

    assert_eq!(page.items().len(), 10);
    assert_eq!(page.items().first(), Some(&11));
    assert_eq!(page.total_count(), 25);
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_previous_page());
    assert!(page.has_next_page());
}

#[tokio::test]
async fn last_partial_page_has_no_next() {
    let rows = stored(25);
    let page = page_of(&rows, PageRequest::new(3, 10).expect("valid")).await;

    assert_eq!(page.items(), &[21, 22, 23, 24, 25]);
    assert!(page.has_previous_page());
    assert!(!page.has_next_page());
}

#[tokio::test]
async fn page_past_the_end_is_empty_but_counted() {
    let rows = stored(25);
    let page = page_of(&rows, PageRequest::new(9, 10).expect("valid")).await;

    assert!(page.is_empty());
    assert_eq!(page.total_count(), 25);
    assert!(!page.has_next_page());
}

#[tokio::test]
async fn count_runs_before_fetch_and_errors_short_circuit() {
    let log = RefCell::new(Vec::new());
    let calls = &log;
    let outcome: Result<Page<u32>, &str> = paginate(
        PageRequest::default(),
        move || async move {
            calls.borrow_mut().push("count");
            Err("count failed")
        },
        move |_, _| async move {
            calls.borrow_mut().push("fetch");
            Ok(Vec::new())
        },
    )
    .await;

    assert_eq!(outcome, Err("count failed"));
    assert_eq!(*log.borrow(), vec!["count"]);
}

#[tokio::test]
async fn oversized_fetch_is_truncated_to_page_size() {
    let outcome: Result<Page<u32>, std::convert::Infallible> = paginate(
        PageRequest::new(1, 3).expect("valid"),
        || async { Ok(10) },
        |_, _| async { Ok(stored(10)) },
    )
    .await;

    assert_eq!(outcome.expect("infallible").items(), &[1, 2, 3]);
}

#[rstest]
fn page_serialises_derived_flags() {
    let page = Page::new(vec!["a", "b"], PageRequest::new(1, 2).expect("valid"), 5);
    let value = serde_json::to_value(&page).expect("serialises");

    assert_eq!(
        value,
        json!({
            "items": ["a", "b"],
            "pageNumber": 1,
            "pageSize": 2,
            "totalCount": 5,
            "totalPages": 3,
            "hasPreviousPage": false,
            "hasNextPage": true,
        })
    );
}

#[rstest]
fn page_deserialisation_ignores_derived_flags() {
    let value = json!({
        "items": [1, 2],
        "pageNumber": 2,
        "pageSize": 2,
        "totalCount": 4,
        "totalPages": 99,
        "hasNextPage": true,
    });
    let page: Page<u32> = serde_json::from_value(value).expect("deserialises");

    assert_eq!(page.total_pages(), 2);
    assert!(!page.has_next_page());
}

#[rstest]
fn map_keeps_metadata() {
    let page = Page::new(vec![1, 2], PageRequest::new(2, 2).expect("valid"), 4);
    let mapped = page.map(|n| n * 10);

    assert_eq!(mapped.items(), &[10, 20]);
    assert_eq!(mapped.page_number(), 2);
    assert_eq!(mapped.total_count(), 4);
}

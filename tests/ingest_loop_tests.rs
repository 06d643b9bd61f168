//! Ingestion loop tests with in-process providers and repositories
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use nomera_ingest_lib::application::{
    FetchCarNumbersUseCase, IngestError, IngestOptions, StopCondition, StopReason,
};
use nomera_ingest_lib::domain::{
    CarNumber, CarNumberRepository, FetchError, ListingBatch, NumberProvider, PageCursor,
    PersistenceError, RecentListingsQuery, SkipReason, SkippedRow, UpsertOutcome,
};
use nomera_ingest_lib::infrastructure::parsing::{
    CarNumberListParser, MalformedDatePolicy, ParseContext, ParsingConfig, ParsingError,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn car(number: &str, price: f32) -> CarNumber {
    CarNumber::new(number, price, date(2024, 3, 5)).unwrap()
}

fn batch(records: Vec<CarNumber>) -> ListingBatch {
    ListingBatch::new(records, Vec::new())
}

fn options() -> IngestOptions {
    IngestOptions {
        poll_interval: Duration::ZERO,
        ..IngestOptions::default()
    }
}

/// Replays scripted responses, then empty pages
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ListingBatch, FetchError>>>,
    cursors: Mutex<Vec<PageCursor>>,
    cancel_on_call: Option<(usize, CancellationToken)>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ListingBatch, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            cursors: Mutex::new(Vec::new()),
            cancel_on_call: None,
        }
    }

    fn cancelling_on(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    fn cursors(&self) -> Vec<PageCursor> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl NumberProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_numbers(&self, cursor: &PageCursor) -> Result<ListingBatch, FetchError> {
        let call = {
            let mut cursors = self.cursors.lock().unwrap();
            cursors.push(*cursor);
            cursors.len()
        };
        if let Some((at, token)) = &self.cancel_on_call {
            if *at == call {
                token.cancel();
            }
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ListingBatch::default()))
    }
}

/// Serves canned HTML pages through the real table parser
struct HtmlPageProvider {
    parser: CarNumberListParser,
    pages: Vec<String>,
}

#[async_trait]
impl NumberProvider for HtmlPageProvider {
    fn name(&self) -> &str {
        "html"
    }

    async fn fetch_numbers(&self, cursor: &PageCursor) -> Result<ListingBatch, FetchError> {
        let index = (cursor.page() - 1) as usize;
        let body = self.pages.get(index).cloned().unwrap_or_default();
        let context = ParseContext::new(*cursor, format!("https://example.test/page/{}", cursor.page()));
        Ok(self.parser.parse_document(&body, &context)?)
    }
}

/// Keeps rows in memory and records every upsert call
#[derive(Default)]
struct RecordingRepository {
    rows: Mutex<HashMap<String, CarNumber>>,
    calls: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingRepository {
    fn failing_on(number: &str) -> Self {
        Self {
            fail_on: Some(number.to_string()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn stored(&self, number: &str) -> Option<CarNumber> {
        self.rows.lock().unwrap().get(number).cloned()
    }
}

#[async_trait]
impl CarNumberRepository for RecordingRepository {
    async fn upsert(&self, car_number: &CarNumber) -> Result<UpsertOutcome, PersistenceError> {
        self.calls.lock().unwrap().push(car_number.number().to_string());
        if self.fail_on.as_deref() == Some(car_number.number()) {
            return Err(PersistenceError::Database(sqlx::Error::PoolTimedOut));
        }
        let previous = self
            .rows
            .lock()
            .unwrap()
            .insert(car_number.number().to_string(), car_number.clone());
        Ok(UpsertOutcome {
            record: car_number.clone(),
            inserted: previous.is_none(),
        })
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<CarNumber>, PersistenceError> {
        Ok(self.stored(number))
    }

    async fn find_recent(
        &self,
        _query: &RecentListingsQuery,
    ) -> Result<Vec<CarNumber>, PersistenceError> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn count(&self) -> Result<i64, PersistenceError> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

#[tokio::test]
async fn page_with_one_good_and_one_bad_row_persists_once_and_continues() {
    let good = r#"<a class="table__tr--td" title="А123ВС777">
        <div class="table-date"><span>05.03.2024</span></div>
        <div class="table-price">150 000 ₽</div></a>"#;
    let bad_price = r#"<a class="table__tr--td" title="В456ОР99">
        <div class="table-date"><span>06.03.2024</span></div>
        <div class="table-price">договорная</div></a>"#;
    let provider = HtmlPageProvider {
        parser: CarNumberListParser::new().unwrap(),
        pages: vec![format!("<div>{good}{bad_price}</div>")],
    };
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(&provider, &repository, options());
    let summary = use_case.handle(&CancellationToken::new()).await.unwrap();

    assert_eq!(repository.calls(), vec!["А123ВС777".to_string()]);
    let stored = repository.stored("А123ВС777").unwrap();
    assert_eq!(stored.price(), 150_000.0);
    assert_eq!(stored.posted_at(), date(2024, 3, 5));

    // the mixed page did not stop the run, the following empty page did
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.records_seen, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyBatch));
}

#[tokio::test]
async fn empty_first_page_stops_cleanly() {
    let provider = ScriptedProvider::new(vec![Ok(ListingBatch::default())]);
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(&provider, &repository, options());
    let summary = use_case.handle(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.iterations, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyBatch));
    assert!(repository.calls().is_empty());
}

#[tokio::test]
async fn page_of_only_skipped_rows_stops_the_loop() {
    let skipped_only = ListingBatch::new(
        Vec::new(),
        vec![SkippedRow {
            index: 0,
            reason: SkipReason::MissingNumber,
        }],
    );
    let provider = ScriptedProvider::new(vec![Ok(skipped_only), Ok(batch(vec![car("А123ВС777", 1.0)]))]);
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(&provider, &repository, options());
    let summary = use_case.handle(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.iterations, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyBatch));
    assert_eq!(summary.skipped, 1);
    assert!(repository.calls().is_empty());
}

#[tokio::test]
async fn repeated_page_of_unpriced_rows_ends_the_run() {
    let unpriced = r#"<a class="table__tr--td" title="А123ВС777">
        <div class="table-date"><span>05.03.2024</span></div>
        <div class="table-price">Договорная</div></a>"#;
    let provider = HtmlPageProvider {
        parser: CarNumberListParser::new().unwrap(),
        pages: vec![format!("<div>{unpriced}</div>"); 5],
    };
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(
        &provider,
        &repository,
        IngestOptions {
            max_iterations: Some(5),
            ..options()
        },
    );
    let summary = use_case.handle(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.iterations, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyBatch));
    assert!(repository.calls().is_empty());
}

#[tokio::test]
async fn malformed_date_under_abort_policy_fails_the_run() {
    let config = ParsingConfig {
        malformed_date_policy: MalformedDatePolicy::Abort,
        ..ParsingConfig::default()
    };
    let first_page = r#"<div><a class="table__tr--td" title="А111АА777">
        <div class="table-date"><span>05.03.2024</span></div>
        <div class="table-price">100 000 ₽</div></a></div>"#;
    let second_page = r#"<div><a class="table__tr--td" title="В222ВВ777">
        <div class="table-date"><span>06.03.2024</span></div>
        <div class="table-price">200 000 ₽</div></a>
        <a class="table__tr--td" title="Е333ЕЕ777">
        <div class="table-date"><span>вчера</span></div>
        <div class="table-price">300 000 ₽</div></a></div>"#;
    let provider = HtmlPageProvider {
        parser: CarNumberListParser::with_config(&config).unwrap(),
        pages: vec![first_page.to_string(), second_page.to_string()],
    };
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(&provider, &repository, options());
    let result = use_case.handle(&CancellationToken::new()).await;

    match result {
        Err(IngestError::Fetch(FetchError::Parse(ParsingError::MalformedDate { index, text, .. }))) => {
            assert_eq!(index, 1);
            assert_eq!(text, "вчера");
        }
        other => panic!("expected a malformed date failure, got {other:?}"),
    }
    // the failing page is dropped as a whole
    assert_eq!(repository.calls(), vec!["А111АА777".to_string()]);
    assert!(repository.stored("В222ВВ777").is_none());
}

#[tokio::test]
async fn persistence_failure_stops_mid_batch() {
    let provider = ScriptedProvider::new(vec![Ok(batch(vec![
        car("А111АА777", 1.0),
        car("В222ВВ777", 2.0),
        car("Е333ЕЕ777", 3.0),
    ]))]);
    let repository = RecordingRepository::failing_on("В222ВВ777");

    let use_case = FetchCarNumbersUseCase::new(&provider, &repository, options());
    let result = use_case.handle(&CancellationToken::new()).await;

    assert!(matches!(result, Err(IngestError::Persistence(_))));
    assert_eq!(
        repository.calls(),
        vec!["А111АА777".to_string(), "В222ВВ777".to_string()]
    );
    assert!(repository.stored("Е333ЕЕ777").is_none());
    assert_eq!(provider.cursors().len(), 1);
}

#[tokio::test]
async fn fetch_failure_is_returned() {
    let provider = ScriptedProvider::new(vec![
        Ok(batch(vec![car("А111АА777", 1.0)])),
        Err(FetchError::Status {
            status: 503,
            url: "https://example.test".to_string(),
        }),
    ]);
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(&provider, &repository, options());
    let result = use_case.handle(&CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(IngestError::Fetch(FetchError::Status { status: 503, .. }))
    ));
    assert_eq!(repository.calls().len(), 1);
}

#[tokio::test]
async fn iteration_limit_bounds_the_run() {
    let pages = (0..10)
        .map(|_| Ok(batch(vec![car("А111АА777", 1.0)])))
        .collect();
    let provider = ScriptedProvider::new(pages);
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(
        &provider,
        &repository,
        IngestOptions {
            max_iterations: Some(3),
            ..options()
        },
    );
    let summary = use_case.handle(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.stop_reason, Some(StopReason::IterationLimit));
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.updated, 2);
}

#[tokio::test]
async fn no_new_rows_stops_once_a_page_only_updates() {
    let provider = ScriptedProvider::new(vec![
        Ok(batch(vec![car("А111АА777", 1.0), car("В222ВВ777", 2.0)])),
        Ok(batch(vec![car("А111АА777", 5.0)])),
        Ok(batch(vec![car("Е333ЕЕ777", 3.0)])),
    ]);
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(
        &provider,
        &repository,
        IngestOptions {
            stop_condition: StopCondition::NoNewRows,
            ..options()
        },
    );
    let summary = use_case.handle(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.stop_reason, Some(StopReason::NoNewRows));
    assert_eq!(repository.stored("А111АА777").unwrap().price(), 5.0);
    assert!(repository.stored("Е333ЕЕ777").is_none());
}

#[tokio::test]
async fn cancelled_token_prevents_any_fetch() {
    let provider = ScriptedProvider::new(vec![Ok(batch(vec![car("А111АА777", 1.0)]))]);
    let repository = RecordingRepository::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let use_case = FetchCarNumbersUseCase::new(&provider, &repository, options());
    let summary = use_case.handle(&cancel).await.unwrap();

    assert_eq!(summary.iterations, 0);
    assert_eq!(summary.stop_reason, Some(StopReason::Cancelled));
    assert!(provider.cursors().is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_the_poll_pause() {
    let cancel = CancellationToken::new();
    let pages = (0..5)
        .map(|_| Ok(batch(vec![car("А111АА777", 1.0)])))
        .collect();
    let provider = ScriptedProvider::new(pages).cancelling_on(2, cancel.clone());
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(
        &provider,
        &repository,
        IngestOptions {
            poll_interval: Duration::from_millis(10),
            ..options()
        },
    );
    let summary = tokio::time::timeout(Duration::from_secs(5), use_case.handle(&cancel))
        .await
        .expect("loop should stop promptly once cancelled")
        .unwrap();

    // the batch fetched before cancellation is still persisted
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.stop_reason, Some(StopReason::Cancelled));
    assert_eq!(repository.calls().len(), 2);
}

#[tokio::test]
async fn long_pause_does_not_delay_cancellation() {
    let cancel = CancellationToken::new();
    let provider = ScriptedProvider::new(vec![Ok(batch(vec![car("А111АА777", 1.0)]))])
        .cancelling_on(1, cancel.clone());
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(
        &provider,
        &repository,
        IngestOptions {
            poll_interval: Duration::from_secs(3600),
            ..options()
        },
    );
    let summary = tokio::time::timeout(Duration::from_secs(5), use_case.handle(&cancel))
        .await
        .expect("pause should be interruptible")
        .unwrap();

    assert_eq!(summary.iterations, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::Cancelled));
}

#[tokio::test]
async fn cursor_advances_one_page_per_poll() {
    let provider = ScriptedProvider::new(vec![
        Ok(batch(vec![car("А111АА777", 1.0)])),
        Ok(batch(vec![car("В222ВВ777", 2.0)])),
    ]);
    let repository = RecordingRepository::default();

    let use_case = FetchCarNumbersUseCase::new(&provider, &repository, options());
    use_case.handle(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        provider.cursors(),
        vec![PageCursor::at(1), PageCursor::at(2), PageCursor::at(3)]
    );
    assert_eq!(repository.count().await.unwrap(), 2);
}

//! Canonical dashboard state for one signed-in user.
//!
//! The server is the only source of truth: every mutation is followed by a
//! full reload of meals and stats. Meals and stats each carry a request
//! sequence, so a fetch that has been superseded is aborted, and a
//! response that arrives late is dropped instead of overwriting newer data.

use crate::api::MealApi;
use crate::entry::{EntryMode, MealEntry};
use crate::errors::ClientError;
use crate::meal_list::MealList;
use crate::models::{DateFilter, Meal, MealEntryForm, TodayStats};
use crate::notices::{ErrorReporter, Notice, NoticeBoard, Operation};
use crate::session::Session;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{AbortHandle, JoinError};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
struct DashboardState {
    meals: Vec<Meal>,
    stats: Option<TodayStats>,
    date_filter: DateFilter,
    loading: bool,
}

/// Everything the page needs, taken under one lock.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub username: String,
    pub entry_mode: EntryMode,
    pub meals: Vec<Meal>,
    pub stats: Option<TodayStats>,
    pub date_filter: DateFilter,
    pub loading: bool,
    pub submitting: bool,
    pub retained_entry: Option<MealEntryForm>,
    pub confirming: Option<i64>,
    pub deleting: Vec<i64>,
    pub notice: Option<Notice>,
}

/// Monotonic tokens plus the abort handle of the fetch currently in flight.
/// Once closed, every fetch issued afterwards is aborted on the spot.
#[derive(Debug, Default)]
struct Sequence {
    issued: AtomicU64,
    in_flight: Mutex<InFlight>,
}

#[derive(Debug, Default)]
struct InFlight {
    handle: Option<AbortHandle>,
    closed: bool,
}

impl Sequence {
    fn issue(&self, handle: AbortHandle) -> u64 {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.closed {
            handle.abort();
        } else if let Some(previous) = in_flight.handle.replace(handle) {
            previous.abort();
        }
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, token: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == token
    }

    fn close(&self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.closed = true;
        if let Some(handle) = in_flight.handle.take() {
            handle.abort();
        }
    }
}

enum Fetched<T> {
    Ready(T),
    Failed(ClientError),
    Superseded,
}

fn settle<T>(joined: Result<Result<T, ClientError>, JoinError>) -> Fetched<T> {
    match joined {
        Ok(Ok(value)) => Fetched::Ready(value),
        Ok(Err(err)) => Fetched::Failed(err),
        Err(err) if err.is_cancelled() => Fetched::Superseded,
        Err(err) => std::panic::resume_unwind(err.into_panic()),
    }
}

pub struct DashboardController {
    session: Session,
    mode: EntryMode,
    api: Arc<dyn MealApi>,
    reporter: Arc<dyn ErrorReporter>,
    state: Mutex<DashboardState>,
    entered: AtomicBool,
    loads: AtomicU64,
    meals_seq: Sequence,
    stats_seq: Sequence,
    entry: MealEntry,
    list: MealList,
}

impl DashboardController {
    pub fn new(session: Session, mode: EntryMode, api: Arc<dyn MealApi>) -> Self {
        let reporter = Arc::new(NoticeBoard::new(session.username()));
        Self::with_reporter(session, mode, api, reporter)
    }

    pub fn with_reporter(
        session: Session,
        mode: EntryMode,
        api: Arc<dyn MealApi>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            session,
            mode,
            api,
            reporter,
            state: Mutex::new(DashboardState::default()),
            entered: AtomicBool::new(false),
            loads: AtomicU64::new(0),
            meals_seq: Sequence::default(),
            stats_seq: Sequence::default(),
            entry: MealEntry::default(),
            list: MealList::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let state = self.state().clone();
        DashboardSnapshot {
            username: self.session.username().to_owned(),
            entry_mode: self.mode,
            meals: state.meals,
            stats: state.stats,
            date_filter: state.date_filter,
            loading: state.loading,
            submitting: self.entry.is_submitting(),
            retained_entry: self.entry.retained(),
            confirming: self.list.confirming(),
            deleting: self.list.deleting(),
            notice: self.reporter.latest(),
        }
    }

    /// Loads once per controller; later visits render what is held.
    pub async fn ensure_loaded(&self) {
        if !self.entered.swap(true, Ordering::SeqCst) {
            self.load_data().await;
        }
    }

    /// Fetches the meal list for the active filter and today's stats
    /// concurrently and applies whichever halves are still current. A
    /// failure of either fetch leaves the held state untouched.
    pub async fn load_data(&self) {
        let _loading = Loading::start(self);
        let filter = self.state().date_filter;
        let username = self.session.username().to_owned();

        let meals_task = tokio::spawn({
            let api = Arc::clone(&self.api);
            let username = username.clone();
            async move { api.list_meals(&username, filter).await }
        });
        let stats_task = tokio::spawn({
            let api = Arc::clone(&self.api);
            async move { api.today_stats(&username).await }
        });
        let meals_token = self.meals_seq.issue(meals_task.abort_handle());
        let stats_token = self.stats_seq.issue(stats_task.abort_handle());

        let (meals, stats) = tokio::join!(meals_task, stats_task);
        let (meals, stats) = (settle(meals), settle(stats));

        if let (Fetched::Failed(err), _) | (_, Fetched::Failed(err)) = (&meals, &stats) {
            self.reporter.report(Operation::Load, err);
            return;
        }
        if let (Fetched::Superseded, Fetched::Superseded) = (&meals, &stats) {
            debug!(username = %self.session.username(), "load superseded");
            return;
        }

        let mut state = self.state();
        match meals {
            Fetched::Ready(meals) if self.meals_seq.is_latest(meals_token) => state.meals = meals,
            _ => debug!(username = %self.session.username(), "discarding superseded meal list"),
        }
        match stats {
            Fetched::Ready(stats) if self.stats_seq.is_latest(stats_token) => state.stats = Some(stats),
            _ => debug!(username = %self.session.username(), "discarding superseded stats"),
        }
        drop(state);

        self.reporter.clear(Operation::Load);
        info!(username = %self.session.username(), ?filter, "dashboard loaded");
    }

    pub async fn on_meal_added(&self) {
        self.load_data().await;
    }

    pub async fn on_meal_deleted(&self) {
        self.load_data().await;
    }

    /// Switches the filter and refetches the meal list only; stats are
    /// not filter-scoped.
    pub async fn on_date_filter_change(&self, filter: DateFilter) {
        self.state().date_filter = filter;

        let task = tokio::spawn({
            let api = Arc::clone(&self.api);
            let username = self.session.username().to_owned();
            async move { api.list_meals(&username, filter).await }
        });
        let token = self.meals_seq.issue(task.abort_handle());

        match settle(task.await) {
            Fetched::Ready(meals) if self.meals_seq.is_latest(token) => {
                self.state().meals = meals;
                self.reporter.clear(Operation::FilterChange);
                info!(username = %self.session.username(), ?filter, "date filter applied");
            }
            Fetched::Ready(_) | Fetched::Superseded => {
                debug!(username = %self.session.username(), ?filter, "discarding superseded meal list");
            }
            Fetched::Failed(err) => self.reporter.report(Operation::FilterChange, &err),
        }
    }

    pub async fn add_meal(&self, form: MealEntryForm) -> Result<Meal, ClientError> {
        match self
            .entry
            .submit(self.api.as_ref(), &self.session, self.mode, form)
            .await
        {
            Ok(meal) => {
                info!(username = %self.session.username(), id = meal.id, title = %meal.title, "meal created");
                self.reporter.clear(Operation::Create);
                self.on_meal_added().await;
                Ok(meal)
            }
            Err(err) => {
                self.reporter.report(Operation::Create, &err);
                Err(err)
            }
        }
    }

    pub fn request_delete(&self, id: i64) {
        self.list.request_delete(id);
    }

    pub fn cancel_delete(&self) {
        self.list.cancel_delete();
    }

    pub async fn confirm_delete(&self, id: i64) -> Result<(), ClientError> {
        match self.list.confirm_delete(self.api.as_ref(), id).await {
            Ok(()) => {
                self.reporter.clear(Operation::Delete);
                self.on_meal_deleted().await;
                Ok(())
            }
            Err(err) => {
                self.reporter.report(Operation::Delete, &err);
                Err(err)
            }
        }
    }

    pub fn dismiss_notice(&self) {
        self.reporter.dismiss();
    }

    /// Aborts whatever is in flight and refuses further fetches. Handlers
    /// still awaiting this controller see their loads end as superseded.
    pub fn cancel(&self) {
        self.meals_seq.close();
        self.stats_seq.close();
        debug!(username = %self.session.username(), "dashboard fetches cancelled");
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Raises `loading` for one `load_data` call and lowers it however the
/// call ends, unless a newer load has taken over the flag.
struct Loading<'a> {
    controller: &'a DashboardController,
    token: u64,
}

impl<'a> Loading<'a> {
    fn start(controller: &'a DashboardController) -> Self {
        let token = controller.loads.fetch_add(1, Ordering::SeqCst) + 1;
        controller.state().loading = true;
        Self { controller, token }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        if self.controller.loads.load(Ordering::SeqCst) == self.token {
            self.controller.state().loading = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealCreate;
    use crate::testing::{Endpoint, FakeApi};

    fn controller(api: &Arc<FakeApi>, mode: EntryMode) -> Arc<DashboardController> {
        Arc::new(DashboardController::new(
            Session::new("ana").unwrap(),
            mode,
            Arc::clone(api) as Arc<dyn MealApi>,
        ))
    }

    fn lunch() -> MealEntryForm {
        MealEntryForm {
            title: "Test Meal".into(),
            carbs: "50.5".into(),
            proteins: "25.3".into(),
            fats: "15.7".into(),
            calories: "425".into(),
            ..MealEntryForm::default()
        }
    }

    #[tokio::test]
    async fn load_fetches_meals_and_stats_once_each() {
        let api = Arc::new(FakeApi::new());
        let dashboard = controller(&api, EntryMode::Manual);

        dashboard.ensure_loaded().await;
        dashboard.ensure_loaded().await;

        assert_eq!(api.calls(Endpoint::List), 1);
        assert_eq!(api.calls(Endpoint::TodayStats), 1);
        let snapshot = dashboard.snapshot();
        assert!(snapshot.meals.is_empty());
        assert_eq!(snapshot.stats.unwrap().totals.meal_count, 0);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn create_then_delete_reloads_after_each_mutation() {
        let api = Arc::new(FakeApi::new());
        let dashboard = controller(&api, EntryMode::Manual);
        dashboard.ensure_loaded().await;

        let meal = dashboard.add_meal(lunch()).await.unwrap();
        assert_eq!(api.calls(Endpoint::List), 2);
        assert_eq!(api.calls(Endpoint::TodayStats), 2);

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.meals.len(), 1);
        let stats = snapshot.stats.unwrap();
        assert_eq!(stats.totals.total_calories, 425.0);
        assert_eq!(stats.totals.meal_count, 1);

        dashboard.request_delete(meal.id);
        dashboard.confirm_delete(meal.id).await.unwrap();
        assert_eq!(api.calls(Endpoint::List), 3);
        assert_eq!(api.calls(Endpoint::TodayStats), 3);

        let snapshot = dashboard.snapshot();
        assert!(snapshot.meals.is_empty());
        assert_eq!(snapshot.stats.unwrap().totals.meal_count, 0);
        assert_eq!(snapshot.confirming, None);
    }

    #[tokio::test]
    async fn repeated_loads_without_mutation_are_identical() {
        let api = Arc::new(FakeApi::new());
        let dashboard = controller(&api, EntryMode::Manual);
        dashboard.add_meal(lunch()).await.unwrap();

        let first = dashboard.snapshot();
        dashboard.load_data().await;
        let second = dashboard.snapshot();
        assert_eq!(first.meals, second.meals);
        assert_eq!(first.stats, second.stats);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_state_and_reports() {
        let api = Arc::new(FakeApi::new());
        let dashboard = controller(&api, EntryMode::Manual);
        dashboard.add_meal(lunch()).await.unwrap();

        api.fail(Endpoint::TodayStats);
        dashboard.load_data().await;

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.meals.len(), 1);
        assert_eq!(snapshot.stats.unwrap().totals.meal_count, 1);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.notice.unwrap().operation, Operation::Load);

        api.recover(Endpoint::TodayStats);
        dashboard.load_data().await;
        assert!(dashboard.snapshot().notice.is_none());
    }

    #[tokio::test]
    async fn filter_change_fetches_meals_only() {
        let api = Arc::new(FakeApi::new());
        api.seed_older("ana", "Last month");
        let dashboard = controller(&api, EntryMode::Manual);
        dashboard.ensure_loaded().await;
        assert!(dashboard.snapshot().meals.is_empty());

        dashboard.on_date_filter_change(DateFilter::AllTime).await;
        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.date_filter, DateFilter::AllTime);
        assert_eq!(snapshot.meals.len(), 1);

        dashboard.on_date_filter_change(DateFilter::Today).await;
        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.date_filter, DateFilter::Today);
        assert!(snapshot.meals.is_empty());

        assert_eq!(api.calls(Endpoint::List), 3);
        assert_eq!(api.calls(Endpoint::TodayStats), 1);
    }

    #[tokio::test]
    async fn newer_filter_change_supersedes_stalled_one() {
        let api = Arc::new(FakeApi::new());
        api.seed_older("ana", "Last month");
        api.stall(DateFilter::Today);
        let dashboard = controller(&api, EntryMode::Manual);

        let stalled = tokio::spawn({
            let dashboard = Arc::clone(&dashboard);
            async move { dashboard.on_date_filter_change(DateFilter::Today).await }
        });
        while api.calls(Endpoint::List) < 1 {
            tokio::task::yield_now().await;
        }

        dashboard.on_date_filter_change(DateFilter::AllTime).await;
        stalled.await.unwrap();

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.date_filter, DateFilter::AllTime);
        assert_eq!(snapshot.meals.len(), 1);
        assert!(snapshot.notice.is_none());
    }

    async fn wait_for(api: &FakeApi, endpoint: Endpoint, calls: usize) {
        while api.calls(endpoint) < calls {
            tokio::task::yield_now().await;
        }
    }

    fn today_meal(title: &str) -> MealCreate {
        MealCreate {
            username: "ana".into(),
            title: title.into(),
            carbs: 1.0,
            proteins: 1.0,
            fats: 1.0,
            total_calories: 17.0,
        }
    }

    #[tokio::test]
    async fn last_issued_load_wins() {
        let api = Arc::new(FakeApi::new());
        api.stall_next();
        let dashboard = controller(&api, EntryMode::Manual);

        let stalled = tokio::spawn({
            let dashboard = Arc::clone(&dashboard);
            async move { dashboard.load_data().await }
        });
        wait_for(&api, Endpoint::List, 1).await;
        wait_for(&api, Endpoint::TodayStats, 1).await;

        api.create_meal(&today_meal("Soup")).await.unwrap();
        dashboard.load_data().await;
        stalled.await.unwrap();

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.meals.len(), 1);
        assert_eq!(snapshot.stats.unwrap().totals.meal_count, 1);
        assert!(!snapshot.loading);
        assert!(snapshot.notice.is_none());
    }

    #[tokio::test]
    async fn dropped_load_lowers_loading_flag() {
        let api = Arc::new(FakeApi::new());
        api.stall_next();
        let dashboard = controller(&api, EntryMode::Manual);

        let load = tokio::spawn({
            let dashboard = Arc::clone(&dashboard);
            async move { dashboard.load_data().await }
        });
        wait_for(&api, Endpoint::List, 1).await;
        assert!(dashboard.snapshot().loading);

        load.abort();
        assert!(load.await.unwrap_err().is_cancelled());
        assert!(!dashboard.snapshot().loading);
    }

    #[tokio::test]
    async fn superseded_meals_half_is_dropped_while_stats_land() {
        let api = Arc::new(FakeApi::new());
        api.seed_older("ana", "Last month");
        api.create_meal(&today_meal("Soup")).await.unwrap();
        api.stall_next();
        let dashboard = controller(&api, EntryMode::Manual);

        let load = tokio::spawn({
            let dashboard = Arc::clone(&dashboard);
            async move { dashboard.load_data().await }
        });
        wait_for(&api, Endpoint::List, 1).await;
        wait_for(&api, Endpoint::TodayStats, 1).await;

        dashboard.on_date_filter_change(DateFilter::AllTime).await;
        load.await.unwrap();

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.meals.len(), 2);
        assert_eq!(snapshot.stats.unwrap().totals.meal_count, 1);
        assert!(!snapshot.loading);
        assert!(snapshot.notice.is_none());
    }

    #[tokio::test]
    async fn cancelled_controller_aborts_and_refuses_fetches() {
        let api = Arc::new(FakeApi::new());
        api.stall(DateFilter::Today);
        let dashboard = controller(&api, EntryMode::Manual);

        let load = tokio::spawn({
            let dashboard = Arc::clone(&dashboard);
            async move { dashboard.load_data().await }
        });
        wait_for(&api, Endpoint::List, 1).await;

        dashboard.cancel();
        load.await.unwrap();
        dashboard.load_data().await;

        assert_eq!(api.calls(Endpoint::List), 1);
        assert_eq!(api.calls(Endpoint::TodayStats), 1);
        assert!(!dashboard.snapshot().loading);
    }

    #[tokio::test]
    async fn validation_failure_is_reported_without_reload() {
        let api = Arc::new(FakeApi::new());
        let dashboard = controller(&api, EntryMode::Manual);

        let err = dashboard.add_meal(MealEntryForm::default()).await.unwrap_err();

        assert_eq!(err, ClientError::Validation("title"));
        assert_eq!(api.total_calls(), 0);
        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.notice.unwrap().operation, Operation::Create);
        assert!(snapshot.retained_entry.is_some());
    }

    #[tokio::test]
    async fn failed_delete_reports_and_skips_reload() {
        let api = Arc::new(FakeApi::new());
        let meal = api
            .create_meal(&MealCreate {
                username: "ana".into(),
                title: "Soup".into(),
                carbs: 1.0,
                proteins: 1.0,
                fats: 1.0,
                total_calories: 17.0,
            })
            .await
            .unwrap();
        let dashboard = controller(&api, EntryMode::Ai);
        dashboard.ensure_loaded().await;
        api.fail(Endpoint::Delete);

        dashboard.request_delete(meal.id);
        assert!(dashboard.confirm_delete(meal.id).await.is_err());

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.meals.len(), 1);
        assert_eq!(snapshot.confirming, Some(meal.id));
        assert_eq!(snapshot.notice.unwrap().operation, Operation::Delete);
        assert_eq!(api.calls(Endpoint::List), 1);

        dashboard.dismiss_notice();
        assert!(dashboard.snapshot().notice.is_none());
    }

    #[tokio::test]
    async fn ai_mode_creates_inferred_meal() {
        let api = Arc::new(FakeApi::new());
        let dashboard = controller(&api, EntryMode::Ai);
        let form = MealEntryForm {
            description: "grilled salmon".into(),
            ..MealEntryForm::default()
        };

        let meal = dashboard.add_meal(form).await.unwrap();

        assert_eq!(meal.title, "Inferred: grilled salmon");
        assert_eq!(dashboard.snapshot().meals.len(), 1);
    }
}

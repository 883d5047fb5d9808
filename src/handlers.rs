use crate::dashboard::DashboardSnapshot;
use crate::errors::AppError;
use crate::models::{FilterForm, LoginForm, MealEntryForm, Stats};
use crate::session::{expired_cookie, session_cookie, Session};
use crate::state::AppState;
use crate::ui::{render_dashboard, render_login};
use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use tracing::{debug, info};

pub async fn index(session: Option<Session>) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Html(render_login(None)).into_response()
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let Some(session) = Session::new(&form.username) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(render_login(Some("Please enter a username."))),
        )
            .into_response();
    };

    state.start_session(&session).await;
    (
        [(SET_COOKIE, session_cookie(&session))],
        Redirect::to("/dashboard"),
    )
        .into_response()
}

pub async fn logout(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    state.end_session(&session).await;
    ([(SET_COOKIE, expired_cookie())], Redirect::to("/"))
}

pub async fn dashboard(State(state): State<AppState>, session: Session) -> Html<String> {
    let snapshot = entered_snapshot(&state, &session).await;
    Html(render_dashboard(&snapshot))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Json<DashboardSnapshot> {
    Json(entered_snapshot(&state, &session).await)
}

pub async fn get_stats(State(state): State<AppState>, session: Session) -> Result<Json<Stats>, AppError> {
    let stats = state.api.all_time_stats(session.username()).await?;
    Ok(Json(stats))
}

pub async fn refresh(State(state): State<AppState>, session: Session) -> Redirect {
    state.dashboard(&session).await.load_data().await;
    Redirect::to("/dashboard")
}

pub async fn change_filter(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<FilterForm>,
) -> Redirect {
    state
        .dashboard(&session)
        .await
        .on_date_filter_change(form.date_filter)
        .await;
    Redirect::to("/dashboard")
}

/// Failures are already on the dashboard's notice board; the redirect
/// shows them.
pub async fn add_meal(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<MealEntryForm>,
) -> Redirect {
    let dashboard = state.dashboard(&session).await;
    if let Ok(meal) = dashboard.add_meal(form).await {
        info!(username = %session.username(), id = meal.id, "meal added from form");
    }
    Redirect::to("/dashboard")
}

pub async fn request_delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Redirect {
    state.dashboard(&session).await.request_delete(id);
    Redirect::to("/dashboard")
}

pub async fn cancel_delete(
    State(state): State<AppState>,
    session: Session,
    Path(_id): Path<i64>,
) -> Redirect {
    state.dashboard(&session).await.cancel_delete();
    Redirect::to("/dashboard")
}

pub async fn confirm_delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Redirect {
    match state.dashboard(&session).await.confirm_delete(id).await {
        Ok(()) => info!(username = %session.username(), id, "meal deleted from dialog"),
        Err(err) => debug!(username = %session.username(), id, %err, "delete left on the notice board"),
    }
    Redirect::to("/dashboard")
}

pub async fn dismiss_notice(State(state): State<AppState>, session: Session) -> Redirect {
    state.dashboard(&session).await.dismiss_notice();
    Redirect::to("/dashboard")
}

async fn entered_snapshot(state: &AppState, session: &Session) -> DashboardSnapshot {
    let dashboard = state.dashboard(session).await;
    dashboard.ensure_loaded().await;
    dashboard.snapshot()
}

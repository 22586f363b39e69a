use crate::error::AppError;
use crate::middleware::auth::{removal_cookie, Session};
use crate::models::auth::LoginForm;
use crate::AppState;
use axum::{
    extract::Extension,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use std::sync::Arc;

pub fn auth_routes() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

async fn root(session: Option<Session>) -> Redirect {
    match session {
        Some(_) => Redirect::to("/chat"),
        None => Redirect::to("/login"),
    }
}

async fn login_page(
    session: Option<Session>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, AppError> {
    if session.is_some() {
        return Ok(Redirect::to("/chat").into_response());
    }
    let page: Html<String> = state
        .templates
        .render("login.html", context! { username => "" })?;
    Ok(page.into_response())
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    if username.is_empty() {
        let page = state.templates.render(
            "login.html",
            context! { username => "", error => "Please enter a valid username" },
        )?;
        return Ok(page.into_response());
    }

    let user_id = state.store.create_user(username).await?;
    let session = Session { user_id, username: username.to_string() };
    let token = state.sessions.issue(&session)?;

    tracing::info!("User {} logged in ({})", session.username, session.user_id);
    Ok((jar.add(state.sessions.cookie(&token)), Redirect::to("/chat")).into_response())
}

async fn logout(session: Option<Session>, jar: CookieJar) -> impl IntoResponse {
    if let Some(session) = session {
        tracing::info!("User {} logged out", session.username);
    }
    (jar.remove(removal_cookie()), Redirect::to("/login"))
}

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Form,
};
use minijinja::context;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::web::state::AppState;
use crate::web::templates::render_template;

#[derive(Debug, Deserialize)]
pub struct IndexForm {
    pub user_input: Option<String>,
}

// Main UI entry point
pub async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(render_template(
        &state.template_env,
        "index.html",
        context! { model => state.config.llm.model },
    ))
}

/// Runs the full pipeline for the submitted question and renders the
/// narration into the page.
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<IndexForm>,
) -> impl IntoResponse {
    let Some(question) = form.user_input.filter(|q| !q.trim().is_empty()) else {
        let page = render_template(
            &state.template_env,
            "index.html",
            context! { error => "No query provided" },
        );
        return (StatusCode::BAD_REQUEST, Html(page));
    };

    match state.pipeline.answer(&question).await {
        Ok(answer) => {
            let page = render_template(
                &state.template_env,
                "index.html",
                context! {
                    question => question,
                    sql => answer.sql,
                    result => format!("Processed result for input: {}", answer.response),
                },
            );
            (StatusCode::OK, Html(page))
        }
        Err(e) => {
            error!("Error processing form query: {}", e);
            let page = render_template(
                &state.template_env,
                "index.html",
                context! { question => question, error => e.to_string() },
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Html(page))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::llm::tests::ScriptedCompleter;
    use crate::web::tests::test_app;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form_post(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn index_renders_form() {
        let response = test_app(&ScriptedCompleter::default())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("name=\"user_input\""));
        assert!(!html.contains("Processed result"));
    }

    #[tokio::test]
    async fn form_submission_renders_narration() {
        let fake = ScriptedCompleter::replying(&[
            "SELECT COUNT(*) AS total FROM svcr_startups",
            "There are 3 startups in the database.",
        ]);
        let response = test_app(&fake)
            .oneshot(form_post("user_input=How+many+startups+are+there%3F"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Processed result for input: There are 3 startups in the database."));
        assert!(fake.prompts()[0].contains("question: How many startups are there?"));
    }

    #[tokio::test]
    async fn form_failure_renders_error_message() {
        let fake = ScriptedCompleter::replying(&["DROP TABLE"]);
        let response = test_app(&fake)
            .oneshot(form_post("user_input=break+it"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_text(response).await;
        assert!(html.contains("class=\"error\""));
    }

    #[tokio::test]
    async fn empty_form_is_bad_request() {
        let fake = ScriptedCompleter::default();
        let response = test_app(&fake).oneshot(form_post("user_input=")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(fake.prompts().is_empty());
    }
}

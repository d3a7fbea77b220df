use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};
use snippetbox_web::{RequestContext, WebError, redirect};
use tracing::debug;

use crate::app::{Application, FLASH_KEY, SnippetCreateForm};

type HandlerResult = Result<Response<Bytes>, WebError>;

pub async fn home(app: Arc<Application>, req: RequestContext) -> HandlerResult {
    let snippets = app.snippets().latest().await?;

    let mut data = app.template_data(&req);
    data.snippets = snippets;
    app.render(StatusCode::OK, "home", &data)
}

pub async fn snippet_view(app: Arc<Application>, req: RequestContext) -> HandlerResult {
    let id = req
        .path_params()
        .get("id")
        .and_then(|id| id.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or(WebError::NotFound)?;

    let snippet = app.snippets().get(id).await?;

    let mut data = app.template_data(&req);
    data.snippet = Some(snippet);
    app.render(StatusCode::OK, "view", &data)
}

pub async fn snippet_create(app: Arc<Application>, req: RequestContext) -> HandlerResult {
    let mut data = app.template_data(&req);
    data.form = Some(SnippetCreateForm { expires: 365, ..SnippetCreateForm::default() });
    app.render(StatusCode::OK, "create", &data)
}

pub async fn snippet_create_post(app: Arc<Application>, req: RequestContext) -> HandlerResult {
    let form = req.form(app.create_form())?;

    let errors = app.create_form().validate(&form);
    if !errors.is_empty() {
        debug!(errors = errors.len(), "snippet form rejected");
        let mut data = app.template_data(&req);
        data.form = Some(form);
        data.errors = errors;
        return app.render(StatusCode::UNPROCESSABLE_ENTITY, "create", &data);
    }

    let id = app.snippets().insert(form.title, form.content, form.expires).await?;

    if let Some(session) = req.session() {
        session.put(FLASH_KEY, "Snippet successfully created!");
    }

    Ok(redirect(&format!("/snippet/view/{id}")))
}

pub async fn user_signup(app: Arc<Application>, req: RequestContext) -> HandlerResult {
    app.render(StatusCode::OK, "signup", &app.template_data(&req))
}

pub async fn user_signup_post(_app: Arc<Application>, _req: RequestContext) -> &'static str {
    "Create a new user..."
}

pub async fn user_login(app: Arc<Application>, req: RequestContext) -> HandlerResult {
    app.render(StatusCode::OK, "login", &app.template_data(&req))
}

pub async fn user_login_post(_app: Arc<Application>, _req: RequestContext) -> &'static str {
    "Authenticate and login the user..."
}

pub async fn user_logout_post(_app: Arc<Application>, _req: RequestContext) -> &'static str {
    "Logout the user..."
}

/// Serves a file below the static directory.
pub async fn static_file(app: Arc<Application>, req: RequestContext) -> HandlerResult {
    let filepath = req.path_params().get("filepath").unwrap_or_default();
    let path = resolve(app.static_dir(), filepath).ok_or(WebError::NotFound)?;

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Err(WebError::NotFound),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(WebError::NotFound),
        Err(e) => return Err(WebError::server(e)),
    }

    let content = tokio::fs::read(&path).await.map_err(WebError::server)?;
    let content_type = HeaderValue::from_str(content_type(&path).as_ref()).map_err(WebError::server)?;

    let mut response = Response::new(Bytes::from(content));
    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    Ok(response)
}

/// Joins `filepath` onto `root`, refusing anything that could leave it.
fn resolve(root: &Path, filepath: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();

    for segment in filepath.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            segment if segment.contains(['\\', ':', '\0']) => return None,
            segment => path.push(segment),
        }
    }

    (path != root).then_some(path)
}

fn content_type(path: &Path) -> mime::Mime {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("css") => mime::TEXT_CSS_UTF_8,
        Some("js") => mime::APPLICATION_JAVASCRIPT_UTF_8,
        Some("html") => mime::TEXT_HTML_UTF_8,
        Some("txt") => mime::TEXT_PLAIN_UTF_8,
        Some("svg") => mime::IMAGE_SVG,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("woff") => mime::FONT_WOFF,
        Some("woff2") => mime::FONT_WOFF2,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{Datelike, Utc};
use http::{Response, StatusCode};
use snippetbox_web::form::{Field, FormSpec, MaxChars, NotBlank, PermittedValue, ValidationErrors};
use snippetbox_web::template::{BuildError, TemplateSet};
use snippetbox_web::{RequestContext, Responder, WebError, html};

use crate::store::{Snippet, SnippetStore};
use crate::ui;

/// Session key of the one-shot message shown on the next rendered page.
pub const FLASH_KEY: &str = "flash";

/// Fields of the snippet creation form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    pub expires: i32,
}

impl SnippetCreateForm {
    pub fn spec() -> FormSpec<Self> {
        FormSpec::new()
            .field(
                Field::new("title", |f: &Self| &f.title, |f: &mut Self| &mut f.title).rule(NotBlank).rule(MaxChars(100)),
            )
            .field(Field::new("content", |f: &Self| &f.content, |f: &mut Self| &mut f.content).rule(NotBlank))
            .field(
                Field::new("expires", |f: &Self| &f.expires, |f: &mut Self| &mut f.expires)
                    .rule(PermittedValue::new([1, 7, 365])),
            )
    }
}

/// View model handed to every page.
#[derive(Debug, Default)]
pub struct TemplateData {
    pub current_year: i32,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
    pub form: Option<SnippetCreateForm>,
    pub errors: ValidationErrors,
    pub flash: Option<String>,
}

/// Everything the handlers share, built once at startup.
pub struct Application {
    snippets: Arc<dyn SnippetStore>,
    templates: TemplateSet<TemplateData>,
    create_form: FormSpec<SnippetCreateForm>,
    static_dir: PathBuf,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("templates", &self.templates)
            .field("static_dir", &self.static_dir)
            .finish_non_exhaustive()
    }
}

impl Application {
    pub fn new(snippets: Arc<dyn SnippetStore>, static_dir: impl Into<PathBuf>) -> Result<Self, BuildError> {
        Ok(Self {
            snippets,
            templates: ui::templates()?,
            create_form: SnippetCreateForm::spec(),
            static_dir: static_dir.into(),
        })
    }

    pub fn snippets(&self) -> &dyn SnippetStore {
        self.snippets.as_ref()
    }

    pub fn create_form(&self) -> &FormSpec<SnippetCreateForm> {
        &self.create_form
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    /// Default view model for `req`; takes the pending flash message out of
    /// the session.
    pub fn template_data(&self, req: &RequestContext) -> TemplateData {
        TemplateData {
            current_year: Utc::now().year(),
            flash: req.session().and_then(|session| session.pop(FLASH_KEY)),
            ..TemplateData::default()
        }
    }

    pub fn render(&self, status: StatusCode, page: &str, data: &TemplateData) -> Result<Response<Bytes>, WebError> {
        let body = self.templates.render(page, data)?;
        Ok((status, html(body)).into_response())
    }
}

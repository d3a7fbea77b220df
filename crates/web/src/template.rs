//! Compiled page templates.
//!
//! Pages are built from `maud` functions: one base layout, shared partials the
//! layout pulls in by name, and one content fragment per page. A
//! [`TemplateSet`] is composed once at startup from a list of page names and
//! refuses to build if any piece is missing, so a running server can only fail
//! to render when the view model lacks data a page needs.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use maud::Markup;
use thiserror::Error;

pub type PageFn<D> = fn(&D) -> Result<Markup, RenderError>;
pub type PartialFn<D> = fn(&D) -> Result<Markup, RenderError>;
pub type BaseFn<D> = fn(&Layout<'_, D>) -> Result<Markup, RenderError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no base layout registered")]
    MissingBase,

    #[error("page {name} has no content fragment")]
    MissingPage { name: String },

    #[error("base layout requires partial {name}, which is not registered")]
    MissingPartial { name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("page {name} is not part of the template set")]
    UnknownPage { name: String },

    #[error("partial {name} is not registered")]
    UnknownPartial { name: String },

    #[error("view model is missing {what}")]
    MissingData { what: &'static str },
}

impl RenderError {
    pub fn missing_data(what: &'static str) -> Self {
        Self::MissingData { what }
    }
}

/// What the base layout sees while wrapping one page.
pub struct Layout<'a, D> {
    title: &'static str,
    content: Markup,
    data: &'a D,
    partials: &'a HashMap<&'static str, PartialFn<D>>,
}

impl<D> Layout<'_, D> {
    pub fn title(&self) -> &'static str {
        self.title
    }

    /// The rendered page fragment.
    pub fn content(&self) -> &Markup {
        &self.content
    }

    pub fn data(&self) -> &D {
        self.data
    }

    pub fn partial(&self, name: &str) -> Result<Markup, RenderError> {
        let partial = self.partials.get(name).ok_or_else(|| RenderError::UnknownPartial { name: name.to_owned() })?;
        partial(self.data)
    }
}

struct Page<D> {
    title: &'static str,
    content: PageFn<D>,
}

/// Page name to composed template, read-only after [`TemplateSetBuilder::build`].
pub struct TemplateSet<D> {
    base: BaseFn<D>,
    partials: HashMap<&'static str, PartialFn<D>>,
    pages: HashMap<String, Page<D>>,
}

impl<D> fmt::Debug for TemplateSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSet")
            .field("pages", &self.pages.keys().collect::<Vec<_>>())
            .field("partials", &self.partials.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<D> TemplateSet<D> {
    pub fn builder() -> TemplateSetBuilder<D> {
        TemplateSetBuilder::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pages.contains_key(name)
    }

    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Renders page `name` inside the base layout.
    ///
    /// Nothing is returned unless the whole page rendered: the fragment first,
    /// then the layout around it.
    pub fn render(&self, name: &str, data: &D) -> Result<Bytes, RenderError> {
        let page = self.pages.get(name).ok_or_else(|| RenderError::UnknownPage { name: name.to_owned() })?;

        let content = (page.content)(data)?;
        let layout = Layout { title: page.title, content, data, partials: &self.partials };
        let markup = (self.base)(&layout)?;

        Ok(Bytes::from(markup.into_string()))
    }
}

pub struct TemplateSetBuilder<D> {
    base: Option<(BaseFn<D>, Vec<&'static str>)>,
    partials: HashMap<&'static str, PartialFn<D>>,
    pages: HashMap<&'static str, Page<D>>,
}

impl<D> Default for TemplateSetBuilder<D> {
    fn default() -> Self {
        Self { base: None, partials: HashMap::new(), pages: HashMap::new() }
    }
}

impl<D> fmt::Debug for TemplateSetBuilder<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSetBuilder")
            .field("pages", &self.pages.keys().collect::<Vec<_>>())
            .field("partials", &self.partials.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<D> TemplateSetBuilder<D> {
    /// Sets the layout every page is wrapped in, with the partials it pulls in.
    #[must_use]
    pub fn base(mut self, base: BaseFn<D>, requires: &[&'static str]) -> Self {
        self.base = Some((base, requires.to_vec()));
        self
    }

    #[must_use]
    pub fn partial(mut self, name: &'static str, partial: PartialFn<D>) -> Self {
        self.partials.insert(name, partial);
        self
    }

    #[must_use]
    pub fn page(mut self, name: &'static str, title: &'static str, content: PageFn<D>) -> Self {
        self.pages.insert(name, Page { title, content });
        self
    }

    /// Composes the set for exactly `page_names`.
    pub fn build(mut self, page_names: &[&str]) -> Result<TemplateSet<D>, BuildError> {
        let (base, requires) = self.base.ok_or(BuildError::MissingBase)?;

        if let Some(missing) = requires.iter().find(|name| !self.partials.contains_key(**name)) {
            return Err(BuildError::MissingPartial { name: (*missing).to_owned() });
        }

        let mut pages = HashMap::with_capacity(page_names.len());
        for name in page_names {
            let page = self.pages.remove(*name).ok_or_else(|| BuildError::MissingPage { name: (*name).to_owned() })?;
            pages.insert((*name).to_owned(), page);
        }

        Ok(TemplateSet { base, partials: self.partials, pages })
    }
}

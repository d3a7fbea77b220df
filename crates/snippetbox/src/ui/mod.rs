//! Page markup.
//!
//! Every page is the base layout around one page fragment. The layout pulls
//! in the `nav` partial.

mod layout;
mod pages;

use chrono::{DateTime, Utc};
use snippetbox_web::template::{BuildError, TemplateSet};

use crate::app::TemplateData;

/// Page names served by the site.
pub const PAGES: &[&str] = &["home", "view", "create", "signup", "login"];

pub fn templates() -> Result<TemplateSet<TemplateData>, BuildError> {
    TemplateSet::builder()
        .base(layout::base, &["nav"])
        .partial("nav", layout::nav)
        .page("home", "Home", pages::home)
        .page("view", "Snippet", pages::view)
        .page("create", "Create a New Snippet", pages::create)
        .page("signup", "Signup", pages::signup)
        .page("login", "Login", pages::login)
        .build(PAGES)
}

fn human_date(time: &DateTime<Utc>) -> String {
    time.format("%d %b %Y at %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SnippetCreateForm;
    use crate::store::Snippet;
    use chrono::TimeZone;
    use snippetbox_web::template::RenderError;

    fn snippet() -> Snippet {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        Snippet {
            id: 3,
            title: "An old silent pond".into(),
            content: "An old silent pond...\nA frog jumps into the pond,\nsplash! Silence again.".into(),
            created,
            expires: created + chrono::TimeDelta::days(365),
        }
    }

    fn render(page: &str, data: &TemplateData) -> String {
        let body = templates().unwrap().render(page, data).unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test]
    fn builds_every_page() {
        let set = templates().unwrap();

        let mut names = set.page_names().collect::<Vec<_>>();
        names.sort_unstable();
        assert_eq!(names, vec!["create", "home", "login", "signup", "view"]);
    }

    #[test]
    fn home_without_snippets() {
        let html = render("home", &TemplateData { current_year: 2026, ..TemplateData::default() });

        assert!(html.contains("<title>Home - Snippetbox</title>"));
        assert!(html.contains("There's nothing to see here... yet!"));
        assert!(html.contains("Powered by Rust in 2026"));
    }

    #[test]
    fn home_links_latest_snippets() {
        let html = render("home", &TemplateData { snippets: vec![snippet()], ..TemplateData::default() });

        assert!(html.contains(r#"<a href="/snippet/view/3">An old silent pond</a>"#));
        assert!(html.contains("01 Mar 2026 at 09:30"));
    }

    #[test]
    fn view_shows_flash_and_snippet() {
        let data = TemplateData {
            snippet: Some(snippet()),
            flash: Some("Snippet successfully created!".into()),
            ..TemplateData::default()
        };
        let html = render("view", &data);

        assert!(html.contains(r#"<div class="flash">Snippet successfully created!</div>"#));
        assert!(html.contains("#3"));
        assert!(html.contains("splash! Silence again."));
    }

    #[test]
    fn view_needs_a_snippet() {
        let error = templates().unwrap().render("view", &TemplateData::default()).unwrap_err();
        assert_eq!(error, RenderError::MissingData { what: "snippet" });
    }

    #[test]
    fn create_marks_field_errors_and_keeps_input() {
        let mut data = TemplateData {
            form: Some(SnippetCreateForm { title: String::new(), content: "<b>kept</b>".into(), expires: 7 }),
            ..TemplateData::default()
        };
        data.errors.add("title", "This field cannot be blank");
        let html = render("create", &data);

        assert!(html.contains(r#"<label class="error">This field cannot be blank</label>"#));
        assert!(html.contains("&lt;b&gt;kept&lt;/b&gt;"));
        assert!(html.contains(r#"<input type="radio" name="expires" value="7" checked>"#));
    }
}

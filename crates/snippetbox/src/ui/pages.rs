use maud::{Markup, html};
use snippetbox_web::template::RenderError;

use super::human_date;
use crate::app::TemplateData;

const EXPIRY_CHOICES: [(i32, &str); 3] = [(365, "One Year"), (7, "One Week"), (1, "One Day")];

pub(super) fn home(data: &TemplateData) -> Result<Markup, RenderError> {
    Ok(html! {
        h2 { "Latest Snippets" }
        @if data.snippets.is_empty() {
            p { "There's nothing to see here... yet!" }
        } @else {
            table {
                tr {
                    th { "Title" }
                    th { "Created" }
                    th { "ID" }
                }
                @for snippet in &data.snippets {
                    tr {
                        td { a href={ "/snippet/view/" (snippet.id) } { (snippet.title) } }
                        td { (human_date(&snippet.created)) }
                        td { "#" (snippet.id) }
                    }
                }
            }
        }
    })
}

pub(super) fn view(data: &TemplateData) -> Result<Markup, RenderError> {
    let snippet = data.snippet.as_ref().ok_or(RenderError::missing_data("snippet"))?;

    Ok(html! {
        div class="snippet" {
            div class="metadata" {
                strong { (snippet.title) }
                span { "#" (snippet.id) }
            }
            pre { code { (snippet.content) } }
            div class="metadata" {
                time { "Created: " (human_date(&snippet.created)) }
                time { "Expires: " (human_date(&snippet.expires)) }
            }
        }
    })
}

pub(super) fn create(data: &TemplateData) -> Result<Markup, RenderError> {
    let form = data.form.as_ref().ok_or(RenderError::missing_data("form"))?;
    let errors = &data.errors;

    Ok(html! {
        form action="/snippet/create" method="POST" {
            div {
                label { "Title:" }
                @if let Some(error) = errors.get("title") {
                    label class="error" { (error) }
                }
                input type="text" name="title" value=(form.title);
            }
            div {
                label { "Content:" }
                @if let Some(error) = errors.get("content") {
                    label class="error" { (error) }
                }
                textarea name="content" { (form.content) }
            }
            div {
                label { "Delete in:" }
                @if let Some(error) = errors.get("expires") {
                    label class="error" { (error) }
                }
                @for (days, label) in EXPIRY_CHOICES {
                    input type="radio" name="expires" value=(days) checked[form.expires == days];
                    " " (label) " "
                }
            }
            div {
                input type="submit" value="Publish snippet";
            }
        }
    })
}

pub(super) fn signup(_data: &TemplateData) -> Result<Markup, RenderError> {
    Ok(html! {
        form action="/user/signup" method="POST" novalidate {
            div {
                label { "Name:" }
                input type="text" name="name";
            }
            div {
                label { "Email:" }
                input type="email" name="email";
            }
            div {
                label { "Password:" }
                input type="password" name="password";
            }
            div {
                input type="submit" value="Signup";
            }
        }
    })
}

pub(super) fn login(_data: &TemplateData) -> Result<Markup, RenderError> {
    Ok(html! {
        form action="/user/login" method="POST" novalidate {
            div {
                label { "Email:" }
                input type="email" name="email";
            }
            div {
                label { "Password:" }
                input type="password" name="password";
            }
            div {
                input type="submit" value="Login";
            }
        }
    })
}

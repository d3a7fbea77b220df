use maud::{DOCTYPE, Markup, html};
use snippetbox_web::template::{Layout, RenderError};

use crate::app::TemplateData;

pub(super) fn base(layout: &Layout<'_, TemplateData>) -> Result<Markup, RenderError> {
    let nav = layout.partial("nav")?;
    let data = layout.data();

    Ok(html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (layout.title()) " - Snippetbox" }
                link rel="stylesheet" href="/static/css/main.css";
                link rel="shortcut icon" href="/static/img/favicon.ico" type="image/x-icon";
                link rel="stylesheet" href="https://fonts.googleapis.com/css?family=Ubuntu+Mono:400,700";
            }
            body {
                header {
                    h1 { a href="/" { "Snippetbox" } }
                }
                (nav)
                main {
                    @if let Some(flash) = &data.flash {
                        div class="flash" { (flash) }
                    }
                    (layout.content())
                }
                footer { "Powered by Rust in " (data.current_year) }
            }
        }
    })
}

pub(super) fn nav(_data: &TemplateData) -> Result<Markup, RenderError> {
    Ok(html! {
        nav {
            div {
                a href="/" { "Home" }
                a href="/snippet/create" { "Create snippet" }
            }
            div {
                a href="/user/signup" { "Signup" }
                a href="/user/login" { "Login" }
                form action="/user/logout" method="POST" {
                    button { "Logout" }
                }
            }
        }
    })
}

//! Server-rendered pages.
//!
//! Every piece of user-provided text passes through [`escape_html`] before it
//! reaches the markup.

use std::fmt::Write;
use crate::models::{session::FlashMessages, user::{UserDetail, UserSummary}};

/// Escapes the characters that are significant in HTML text and attributes.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; }}
.flash {{ padding: .5rem 1rem; border-radius: 4px; }}
.flash-warning {{ background: #fff3cd; color: #664d03; }}
.flash-success {{ background: #d1e7dd; color: #0f5132; }}
label {{ display: block; margin-top: .5rem; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        body = body,
    )
}

/// Renders the home page: pending flash messages, the registration form and
/// the list of users.
pub fn render_home(flash: &FlashMessages, users: &[UserSummary]) -> String {
    let mut body = String::from("<h1>Users</h1>\n");

    if let Some(warning) = &flash.warning {
        let _ = writeln!(body, r#"<p class="flash flash-warning">{}</p>"#, escape_html(warning));
    }
    if let Some(success) = &flash.success {
        let _ = writeln!(body, r#"<p class="flash flash-success">{}</p>"#, escape_html(success));
    }

    body.push_str(
        r#"<h2>Register</h2>
<form method="post" action="/register-user">
<label>Username <input type="text" name="username"></label>
<label>Email <input type="email" name="email"></label>
<label>Password <input type="password" name="password"></label>
<label>Verify password <input type="password" name="verifyPassword"></label>
<button type="submit">Register</button>
</form>
<h2>Registered users</h2>
"#,
    );

    if users.is_empty() {
        body.push_str("<p>No users yet.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for user in users {
            let _ = writeln!(
                body,
                r#"<li><a href="/user-detail/{}">{}</a></li>"#,
                user.id,
                escape_html(&user.name)
            );
        }
        body.push_str("</ul>\n");
    }

    layout("Users", &body)
}

/// Renders a user's detail page with a delete button.
pub fn render_user_detail(user: &UserDetail) -> String {
    let body = format!(
        r#"<h1>{name}</h1>
<dl>
<dt>ID</dt><dd>{id}</dd>
<dt>Name</dt><dd>{name}</dd>
<dt>Email</dt><dd>{email}</dd>
</dl>
<form method="post" action="/delete-user/{id}">
<button type="submit">Delete user</button>
</form>
<p><a href="/">Back</a></p>
"#,
        id = user.id,
        name = escape_html(&user.name),
        email = escape_html(&user.email),
    );

    layout(&user.name, &body)
}

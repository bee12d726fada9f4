use super::conversation_state::Role;
use super::format::{format_message, format_sources};

fn avatar_icon(role: Role) -> &'static str {
    match role {
        Role::User => "fa-user",
        Role::Assistant => "fa-robot",
    }
}

/// Wraps formatted message content in the transcript's message container.
pub fn render_message(role: Role, content: &str, sources: &[String]) -> String {
    let mut html = format!(
        "<div class=\"message {}\"><div class=\"avatar\"><i class=\"fas {}\"></i></div><div class=\"content\">",
        role.as_str(),
        avatar_icon(role)
    );
    html.push_str(&format_message(content));

    if let Some(sources) = format_sources(sources) {
        html.push_str(&format!("<div class=\"sources\">{}</div>", sources));
    }

    html.push_str("</div></div>");
    html
}

use crate::types::{AppError, Result};
use chrono::Local;

/// Render a system prompt template for one user.
///
/// Supported placeholders: `{user_id}`, `{user_name}` (with `{user_nickname}`
/// as an alias), and `{now}` as local time `YYYY-MM-DD HH:MM:SS`. Literal
/// braces are written `{{` and `}}`. Unknown placeholders and unbalanced
/// braces fail with [`AppError::PromptFormat`] so a broken template in the
/// settings store is caught before any model call.
pub fn format_prompt(template: &str, user_id: &str, user_name: &str) -> Result<String> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }

                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(k) => key.push(k),
                        None => {
                            return Err(AppError::PromptFormat(
                                "Unclosed '{' in prompt template".to_string(),
                            ))
                        }
                    }
                }

                match key.as_str() {
                    "user_id" => out.push_str(user_id),
                    "user_name" | "user_nickname" => out.push_str(user_name),
                    "now" => out.push_str(&now),
                    other => {
                        return Err(AppError::PromptFormat(format!(
                            "Unknown placeholder '{{{}}}' in prompt template",
                            other
                        )))
                    }
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(AppError::PromptFormat(
                        "Unmatched '}' in prompt template".to_string(),
                    ));
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

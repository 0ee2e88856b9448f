//! src/template.rs
//!
//! Reply templates. Handlers build reply text with `format!`, escaping any
//! chat-supplied piece with [`esc`]; the engine then renders that text once
//! more against the triggering message (`{user}`, `{channel}`, `{msg}`).

use twitchbot_common::error::Error;

use crate::message::ChatMessage;

/// Escapes braces so the text survives the render pass verbatim.
pub fn esc(s: &str) -> String {
    s.replace('{', "{{").replace('}', "}}")
}

/// Renders `{name}` fields from `params`. `{{` and `}}` are literal braces.
/// Unknown fields and unbalanced braces are errors.
pub fn render(template: &str, params: &[(&str, &str)]) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len());
    let mut iter = template.char_indices().peekable();

    while let Some((i, ch)) = iter.next() {
        match ch {
            '{' => {
                if let Some((_, '{')) = iter.peek() {
                    iter.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in iter.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(Error::Template(format!(
                        "unbalanced '{{' starting at: {}",
                        i
                    )));
                }
                let value = params
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| Error::Template(format!("unknown field '{}'", name)))?;
                out.push_str(value);
            }
            '}' => {
                if let Some((_, '}')) = iter.peek() {
                    iter.next();
                    out.push('}');
                } else {
                    return Err(Error::Template(format!("single '}}' at: {}", i)));
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Renders handler text against the message that triggered it.
pub fn format_msg(msg: &ChatMessage, text: &str) -> Result<String, Error> {
    render(
        text,
        &[
            ("user", msg.display_name()),
            ("channel", &msg.channel),
            ("msg", &msg.text),
        ],
    )
}

/// The outbound wire line for a chat reply.
pub fn privmsg(channel: &str, text: &str) -> String {
    format!("PRIVMSG #{} :{}\r\n", channel, text)
}

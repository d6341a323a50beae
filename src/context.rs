//! Request context assembly
//!
//! Turns a course's knowledge text plus the dialogue so far into the ordered
//! message list sent to the completion backend. The whole course content is
//! injected verbatim on every request; nothing is truncated or summarized.

use crate::db::Course;
use crate::llm::ChatMessage;
use crate::turn::Turn;

/// Role statement opening every system prompt; `{title}` is the course title
const ROLE_PREAMBLE: &str = r#"You are an AI teaching assistant for the course "{title}". Use the following course content as your knowledge base to answer student questions. Be helpful, clear, and educational."#;

/// Scope instruction closing every system prompt
const SCOPE_INSTRUCTION: &str = "Only answer questions related to this course content. If a question is outside the scope, politely redirect the student to the course material.";

/// Build the system prompt for a course
pub fn build_system_prompt(course: &Course) -> String {
    format!(
        "{}\n\nCourse Content:\n{}\n\n{}",
        ROLE_PREAMBLE.replace("{title}", &course.title),
        course.content,
        SCOPE_INSTRUCTION
    )
}

/// Assemble the full message list for one request
///
/// One system entry, then every history turn in order with its role, then
/// the new user input.
pub fn assemble(course: &Course, history: &[Turn], input: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(build_system_prompt(course)));
    messages.extend(history.iter().map(Turn::to_chat_message));
    messages.push(ChatMessage::user(input));
    messages
}

//! Promoting assistant replies to saved content

use crate::db::SavedContent;
use crate::runtime::{SavedContentStore, SessionSnapshot};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromoteError {
    #[error("No course selected")]
    NoCourse,
    #[error("Turn not found: {0}")]
    TurnNotFound(String),
    #[error("Only assistant turns can be saved")]
    NotAssistant,
    #[error("Failed to save content: {0}")]
    Storage(String),
}

/// Default title for content saved while studying a course
pub fn saved_title(course_title: &str) -> String {
    format!("Saved from {course_title}")
}

/// Save one assistant turn of the snapshot
///
/// The stored content is the turn's content byte for byte. The session is
/// never touched.
pub async fn promote<S>(
    store: &S,
    snapshot: &SessionSnapshot,
    turn_id: &str,
) -> Result<SavedContent, PromoteError>
where
    S: SavedContentStore + ?Sized,
{
    let course = snapshot.course.as_ref().ok_or(PromoteError::NoCourse)?;
    let turn = snapshot
        .find_turn(turn_id)
        .ok_or_else(|| PromoteError::TurnNotFound(turn_id.to_string()))?;
    if !turn.is_assistant() {
        return Err(PromoteError::NotAssistant);
    }

    let saved = store
        .save_content(
            &snapshot.user_id,
            &course.id,
            &turn.content,
            &saved_title(&course.title),
        )
        .await
        .map_err(PromoteError::Storage)?;

    tracing::info!(
        user_id = %snapshot.user_id,
        course_id = %course.id,
        saved_id = %saved.id,
        "Promoted assistant turn"
    );
    Ok(saved)
}

//! History reconstruction
//!
//! Rebuilds a session's turn list from the stored pairs of one (user, course).

use crate::db::ConversationPair;
use crate::runtime::PairStore;
use crate::turn::{expand_pair, Turn};

/// Expand pairs, already in creation order, into the ordered turn list
///
/// Pure: the same pairs always yield the same turns, two per pair, with
/// no interleaving across pairs.
pub fn reconstruct(pairs: &[ConversationPair]) -> Vec<Turn> {
    pairs.iter().flat_map(expand_pair).collect()
}

/// Load and reconstruct the history for one (user, course)
pub async fn load<S>(store: &S, user_id: &str, course_id: &str) -> Result<Vec<Turn>, String>
where
    S: PairStore + ?Sized,
{
    let pairs = store.list_pairs(user_id, course_id).await?;
    tracing::debug!(
        user_id = %user_id,
        course_id = %course_id,
        pairs = pairs.len(),
        "Reconstructed conversation history"
    );
    Ok(reconstruct(&pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::runtime::DatabaseStorage;
    use crate::turn::TurnRole;

    #[test]
    fn test_reconstruct_empty() {
        assert!(reconstruct(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_load_expands_in_creation_order() {
        let db = Database::open_in_memory().unwrap();
        let course = db.create_course("EMC Basics", "Ohm's law states V=IR.", None).unwrap();
        db.insert_pair("u1", &course.id, "q1", "a1").unwrap();
        db.insert_pair("u1", &course.id, "q2", "a2").unwrap();

        let storage = DatabaseStorage::new(db);
        let turns = load(&storage, "u1", &course.id).await.unwrap();

        let flat: Vec<(TurnRole, &str)> =
            turns.iter().map(|t| (t.role, t.content.as_str())).collect();
        assert_eq!(
            flat,
            vec![
                (TurnRole::User, "q1"),
                (TurnRole::Assistant, "a1"),
                (TurnRole::User, "q2"),
                (TurnRole::Assistant, "a2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let course = db.create_course("EMC Basics", "V=IR", None).unwrap();
        for i in 0..5 {
            db.insert_pair("u1", &course.id, &format!("q{i}"), &format!("a{i}"))
                .unwrap();
        }

        let storage = DatabaseStorage::new(db);
        let first = load(&storage, "u1", &course.id).await.unwrap();
        let second = load(&storage, "u1", &course.id).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_load_unknown_pairing_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let storage = DatabaseStorage::new(db);
        assert!(load(&storage, "nobody", "nothing").await.unwrap().is_empty());
    }
}

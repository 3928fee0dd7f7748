//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible registry states during
//! development. These checks are compiled out in release builds.

use std::collections::{HashMap, HashSet};

use crate::session::SessionId;
use crate::state::{Binding, Queues};

/// Validate queue membership against the session registry. Callers hold
/// both locks.
pub(crate) fn assert_registry_invariants(queues: &Queues, sessions: &HashMap<SessionId, Binding>) {
    if !cfg!(debug_assertions) {
        return;
    }

    let mut queued = 0;
    for (name, queue) in &queues.waiting {
        // Empty queues are removed, never kept around
        debug_assert!(!queue.is_empty(), "Queue {name} is empty but registered");

        for session in queue {
            queued += 1;
            debug_assert_eq!(
                queues.membership.get(&session.id()),
                Some(name),
                "Session {} waits in {name} without matching membership",
                session.id()
            );

            // Waiting and playing are exclusive
            let bound = sessions
                .get(&session.id())
                .is_some_and(|b| b.game.is_some());
            debug_assert!(
                !bound,
                "Session {} is queued in {name} while in a game",
                session.id()
            );
        }
    }
    debug_assert_eq!(
        queued,
        queues.membership.len(),
        "Queue membership does not match queue contents"
    );

    let mut names = HashSet::new();
    for (id, binding) in sessions {
        debug_assert_eq!(*id, binding.session.id(), "Session registered under wrong id");

        if let Some(game) = &binding.game {
            debug_assert!(
                game.contains(*id),
                "Session {id} bound to game {} it is not part of",
                game.id()
            );
        }

        if let Some(name) = binding.session.username() {
            debug_assert!(names.insert(name), "Username {name} bound twice");
        }
    }
}

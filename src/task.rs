//! Task definition.

use serde::{Deserialize, Serialize};

/// Identifier of a task.
pub type TaskId = i32;

/// A unit of work carried through the queue.
///
/// The queue never looks inside a task: it only stores it and hands it back
/// to whichever consumer dequeues it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Human readable name
    pub name: String,
    /// Whether the consumer finished the work
    pub completed: bool,
}

impl Task {
    /// Create a new, not yet completed task.
    pub fn new(id: TaskId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            completed: false,
        }
    }

    /// Mark the task as completed.
    pub fn complete(mut self) -> Self {
        self.completed = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new(7, "Task_7");
        assert_eq!(task.id, 7);
        assert_eq!(task.name, "Task_7");
        assert!(!task.completed);
        assert!(task.complete().completed);
    }

    #[test]
    fn test_task_json_shape() {
        let task = Task::new(1, "a");
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": 1, "name": "a", "completed": false})
        );
    }
}

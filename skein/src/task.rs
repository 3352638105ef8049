use std::fmt;

/// Opaque 64-bit payload carried by every task argument slot.
///
/// The task manager never looks inside a `Word`. Callers are responsible for
/// whatever the value refers to outliving the execution of the task.
pub type Word = u64;

/// Entry point of a task: a plain function taking the three argument slots.
pub type TaskFn = fn(Word, Word, Word);

/// Represents work to be done: an entry point and three 64-bit arguments.
///
/// Tasks are `Copy`. Copying a task duplicates the opaque payloads, it never
/// deep-copies anything they might refer to. The fixed shape means creating,
/// queueing and stealing a task never allocates.
#[derive(Clone, Copy, Default)]
pub struct Task {
    entry: Option<TaskFn>,
    args: [Word; 3],
}

impl Task {
    /// New task creation.
    pub fn new(entry: TaskFn, arg0: Word, arg1: Word, arg2: Word) -> Self {
        Self {
            entry: Some(entry),
            args: [arg0, arg1, arg2],
        }
    }

    /// Placeholder value, only meant to make space for a task that will be
    /// copied in later. Must never be executed.
    pub const fn empty() -> Self {
        Self {
            entry: None,
            args: [0; 3],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn entry(&self) -> Option<TaskFn> {
        self.entry
    }

    pub fn args(&self) -> [Word; 3] {
        self.args
    }

    /// Execute the task by calling the entry point on the three arguments.
    ///
    /// # Panics
    ///
    /// Executing an empty task is a logic error upstream and is treated as a
    /// fatal precondition violation.
    #[track_caller]
    pub fn execute(&self) {
        let Some(entry) = self.entry else {
            Self::null_entry(self);
        };

        let [a0, a1, a2] = self.args;
        entry(a0, a1, a2);
    }

    /// Hook invoked when the task is relocated to another node or queue.
    /// Purely diagnostic.
    pub fn on_stolen(&self) {
        tracing::trace!(task = %self, "stolen");
    }

    #[cold]
    #[track_caller]
    fn null_entry(task: &Task) -> ! {
        panic!("precondition violated: null entry point; {}", task)
    }
}

// Entry points compare by address; the same function can show up under
// different addresses across codegen units, so equality is only reliable for
// copies of one task.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        let same_entry = match (self.entry, other.entry) {
            (Some(a), Some(b)) => std::ptr::fn_addr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_entry && self.args == other.args
    }
}

impl Eq for Task {}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.entry.map_or(0, |e| e as *const () as usize);
        write!(
            f,
            "Task{{ entry={:#x}, arg0={}, arg1={}, arg2={} }}",
            entry, self.args[0], self.args[1], self.args[2]
        )
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Recorder;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Task: Send, Sync, Copy, Default);

    static CALLS: Recorder = Recorder::new();

    fn record(a0: Word, a1: Word, a2: Word) {
        CALLS.record(a0, a1, a2);
    }

    #[test]
    fn test_execute_passes_arguments_in_order() {
        let task = Task::new(record, 7, 8, 9);
        task.execute();

        assert_eq!(CALLS.calls(), vec![(7, 8, 9)]);
    }

    #[test]
    fn test_copies_share_payload() {
        let task = Task::new(record, 1, 2, 3);
        let copy = task;

        assert_eq!(task, copy);
        assert_eq!(copy.args(), [1, 2, 3]);
        assert!(copy.entry().is_some_and(|e| std::ptr::fn_addr_eq(e, record as TaskFn)));
    }

    #[test]
    fn test_equality_covers_entry_and_args() {
        let task = Task::new(record, 1, 2, 3);

        assert_eq!(task, Task::new(record, 1, 2, 3));
        assert_ne!(task, Task::new(record, 1, 2, 4));
        assert_ne!(task, Task::empty());
        assert_eq!(Task::empty(), Task::default());
    }

    #[test]
    #[should_panic(expected = "precondition violated: null entry point")]
    fn test_execute_empty_task_panics() {
        Task::default().execute();
    }

    #[test]
    fn test_empty_and_default_match() {
        assert!(Task::empty().is_empty());
        assert_eq!(Task::empty(), Task::default());
        assert!(!Task::new(record, 0, 0, 0).is_empty());
    }

    #[test]
    fn test_display_dump() {
        let dump = Task::new(record, 1, 22, 333).to_string();

        assert!(dump.starts_with("Task{ entry=0x"));
        assert!(dump.ends_with("arg0=1, arg1=22, arg2=333 }"));
        assert_eq!(
            Task::empty().to_string(),
            "Task{ entry=0x0, arg0=0, arg1=0, arg2=0 }"
        );
    }

    #[test]
    fn test_on_stolen_leaves_task_untouched() {
        let task = Task::new(record, 4, 5, 6);
        task.on_stolen();

        assert_eq!(task.args(), [4, 5, 6]);
    }
}

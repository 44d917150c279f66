//! Property-based tests for the task wire format and local validation.
//!
//! Uses proptest to verify:
//! 1. Any task survives JSON encode → decode unchanged.
//! 2. Random bytes never cause a panic in `decode`.
//! 3. Patches never mention absent fields on the wire.
//! 4. Applying a patch never changes a task's id or creation time.
//! 5. Title validation agrees with the blank/length rules.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use taskboard_proto::api;
use taskboard_proto::task::{
    MAX_TASK_TITLE_LENGTH, NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus,
    ValidationError,
};

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ]
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
        DateTime::from_timestamp(secs, nanos).unwrap_or_default()
    })
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        "[a-z0-9-]{1,36}",
        "[^\x00]{1,64}",
        ".{0,128}",
        arb_priority(),
        arb_status(),
        arb_timestamp(),
    )
        .prop_map(|(id, title, description, priority, status, created_at)| Task {
            id: TaskId::from(id),
            title,
            description,
            priority,
            status,
            created_at,
        })
}

fn arb_patch() -> impl Strategy<Value = TaskPatch> {
    (
        proptest::option::of(".{0,32}"),
        proptest::option::of(".{0,32}"),
        proptest::option::of(arb_priority()),
        proptest::option::of(arb_status()),
    )
        .prop_map(|(title, description, priority, status)| TaskPatch {
            title,
            description,
            priority,
            status,
        })
}

proptest! {
    /// Any task survives a JSON encode → decode cycle.
    #[test]
    fn task_json_survives(task in arb_task()) {
        let bytes = api::encode(&task).expect("encode should succeed");
        let decoded: Task = api::decode(&bytes).expect("decode should succeed");
        prop_assert_eq!(task, decoded);
    }

    /// Random bytes never cause a panic when decoded.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = api::decode::<Vec<Task>>(&bytes);
        let _ = api::error_message(&bytes);
    }

    /// Only present patch fields appear in the JSON body.
    #[test]
    fn patch_wire_mentions_only_present_fields(patch in arb_patch()) {
        let json = serde_json::to_value(&patch).expect("encode should succeed");
        let obj = json.as_object().expect("patch encodes as an object");
        prop_assert_eq!(obj.contains_key("title"), patch.title.is_some());
        prop_assert_eq!(obj.contains_key("description"), patch.description.is_some());
        prop_assert_eq!(obj.contains_key("priority"), patch.priority.is_some());
        prop_assert_eq!(obj.contains_key("status"), patch.status.is_some());
    }

    /// Applying any patch keeps id and creation time.
    #[test]
    fn patch_apply_preserves_identity(task in arb_task(), patch in arb_patch()) {
        let mut patched = task.clone();
        patch.apply_to(&mut patched);
        prop_assert_eq!(&patched.id, &task.id);
        prop_assert_eq!(patched.created_at, task.created_at);
        if let Some(status) = patch.status {
            prop_assert_eq!(patched.status, status);
        } else {
            prop_assert_eq!(patched.status, task.status);
        }
    }

    /// Blank titles are always rejected, whatever the whitespace.
    #[test]
    fn blank_titles_rejected(title in "[ \t\n]{0,16}") {
        prop_assert_eq!(NewTask::titled(title).validate(), Err(ValidationError::TitleEmpty));
    }

    /// Non-blank titles within the length limit are accepted.
    #[test]
    fn short_titles_accepted(title in "[a-zA-Z][a-zA-Z ]{0,200}") {
        prop_assume!(title.chars().count() <= MAX_TASK_TITLE_LENGTH);
        prop_assert!(NewTask::titled(title).validate().is_ok());
    }
}

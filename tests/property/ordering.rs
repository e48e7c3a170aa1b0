//! Property-based tests for task ordering, id generation and list decoding.
//!
//! Uses proptest to verify:
//! 1. Sorting a collection with unique ids yields strictly increasing ids
//!    ascending and strictly decreasing ids descending, for any input order.
//! 2. `TaskId::after_max` is one past the highest id, 1 when empty, and
//!    `None` only when the highest id is `u64::MAX`.
//! 3. Any id survives the string encoding used on the wire.
//! 4. Random bytes never cause a panic in `decode_task_list`.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use tasklist_proto::codec;
use tasklist_proto::task::{SortOrder, Task, TaskId, sort_tasks};

// --- Strategies ---

fn arb_task_id() -> impl Strategy<Value = TaskId> {
    (1..=u64::MAX / 2).prop_map(|n| TaskId::new(n).unwrap())
}

/// A collection with unique ids, in arbitrary order.
fn arb_unique_tasks() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::btree_set(1..100_000u64, 0..40)
        .prop_flat_map(|ids| {
            let tasks: Vec<Task> = ids
                .into_iter()
                .map(|n| Task {
                    id: TaskId::new(n).unwrap(),
                    title: format!("task {n}"),
                    completed: n % 3 == 0,
                })
                .collect();
            Just(tasks).prop_shuffle()
        })
}

fn ids(tasks: &[Task]) -> Vec<u64> {
    tasks.iter().map(|t| t.id.get()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn ascending_sort_is_strictly_increasing(mut tasks in arb_unique_tasks()) {
        let before: BTreeSet<u64> = ids(&tasks).into_iter().collect();
        sort_tasks(&mut tasks, SortOrder::Ascending);
        let after = ids(&tasks);
        prop_assert!(after.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(after.into_iter().collect::<BTreeSet<_>>(), before);
    }

    #[test]
    fn descending_sort_is_strictly_decreasing(mut tasks in arb_unique_tasks()) {
        sort_tasks(&mut tasks, SortOrder::Descending);
        let after = ids(&tasks);
        prop_assert!(after.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn sort_ignores_input_order(tasks in arb_unique_tasks()) {
        let mut shuffled = tasks.clone();
        shuffled.reverse();
        let mut original = tasks;
        sort_tasks(&mut original, SortOrder::Ascending);
        sort_tasks(&mut shuffled, SortOrder::Ascending);
        prop_assert_eq!(original, shuffled);
    }

    #[test]
    fn after_max_is_one_past_highest(tasks in arb_unique_tasks()) {
        let next = TaskId::after_max(tasks.iter().map(|t| t.id)).unwrap();
        let expected = ids(&tasks).into_iter().max().map_or(1, |m| m + 1);
        prop_assert_eq!(next.get(), expected);
        prop_assert!(tasks.iter().all(|t| t.id < next));
    }

    #[test]
    fn after_max_is_none_only_past_largest_id(n in any::<u64>().prop_filter("positive", |n| *n > 0)) {
        let id = TaskId::new(n).unwrap();
        prop_assert_eq!(TaskId::after_max([id]).is_none(), n == u64::MAX);
    }

    #[test]
    fn id_string_form_round_trips(id in arb_task_id()) {
        let text = id.to_string();
        prop_assert_eq!(text.parse::<TaskId>().unwrap(), id);
        let json = serde_json::to_string(&id).unwrap();
        prop_assert_eq!(json, format!("\"{text}\""));
    }

    #[test]
    fn decode_task_list_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode_task_list(&data);
    }
}

/*!
 * Waiting Queue Tests
 * FIFO order and full-scan retries
 */

use partsim::process::{ProcessTemplate, WaitingEntry, WaitingQueue};
use pretty_assertions::assert_eq;

fn entry(name: &str, size: usize) -> WaitingEntry {
    WaitingEntry::new(
        ProcessTemplate::new(name)
            .with_segment(".text", size)
            .with_segment(".stack_heap", 64),
    )
}

fn names(queue: &WaitingQueue) -> Vec<String> {
    queue.iter().map(|e| e.template.name.clone()).collect()
}

#[test]
fn test_push_reports_position() {
    let mut queue = WaitingQueue::new();
    assert_eq!(queue.push(entry("a", 10)), 0);
    assert_eq!(queue.push(entry("b", 10)), 1);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.iter().next().unwrap().requested_size, 74);
}

#[test]
fn test_retry_visits_in_fifo_order() {
    let mut queue = WaitingQueue::new();
    for name in ["a", "b", "c", "d"] {
        queue.push(entry(name, 100));
    }

    let mut visited = Vec::new();
    let admitted = queue.retry_all(|entry| {
        visited.push(entry.template.name.clone());
        entry.template.name == "b" || entry.template.name == "d"
    });

    assert_eq!(visited, vec!["a", "b", "c", "d"]);
    assert_eq!(admitted, 2);
    assert_eq!(names(&queue), vec!["a", "c"]);
}

#[test]
fn test_budget_shrinks_as_entries_are_admitted() {
    let mut queue = WaitingQueue::new();
    queue.push(entry("large", 900));
    queue.push(entry("medium", 400));
    queue.push(entry("small", 200));

    let mut budget = 800;
    queue.retry_all(|entry| {
        if entry.requested_size <= budget {
            budget -= entry.requested_size;
            true
        } else {
            false
        }
    });

    assert_eq!(names(&queue), vec!["large"]);
    assert_eq!(budget, 800 - 464 - 264);
}

#[test]
fn test_clear_empties_queue() {
    let mut queue = WaitingQueue::new();
    queue.push(entry("a", 1));
    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.retry_all(|_| true), 0);
}

use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::rc::Rc;
use tasktrack::storage::TASKS_KEY;
use tasktrack::{MemoryStorage, Priority, SnapshotStorage, Task, TaskId, TaskStore};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

fn task(title: &str) -> Task {
    Task::new(title.to_string(), at(20, 23), Priority::Medium, at(15, 9))
}

fn tagged(title: &str, tags: &[&str]) -> Task {
    let mut task = task(title);
    task.tags = tags.iter().map(|t| t.to_string()).collect();
    task
}

/// Store backed by a shared fake, plus a log of every notification's task count
fn observed_store() -> (TaskStore, Rc<MemoryStorage>, Rc<RefCell<Vec<usize>>>) {
    let storage = Rc::new(MemoryStorage::new());
    let mut store = TaskStore::new(storage.clone());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    store.subscribe(move |tasks: &[Task]| log.borrow_mut().push(tasks.len()));
    (store, storage, seen)
}

#[test]
fn add_appends_persists_and_notifies() {
    let (mut store, storage, seen) = observed_store();

    assert!(store.add(task("first")));
    assert!(store.add(task("second")));

    let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second"]);
    assert_eq!(storage.write_count(), 2);
    assert_eq!(*seen.borrow(), vec![1, 2]);

    let raw = storage.get(TASKS_KEY).unwrap();
    assert!(raw.starts_with("{\"version\":0,\"state\":["));
    assert!(raw.contains("\"dueDate\""));
    assert!(raw.contains("\"createdAt\""));
}

#[test]
fn duplicate_id_is_rejected_without_side_effects() {
    let (mut store, storage, seen) = observed_store();
    let original = task("original");
    let mut copy = task("impostor");
    copy.id = original.id;

    assert!(store.add(original));
    assert!(!store.add(copy));

    assert_eq!(store.len(), 1);
    assert_eq!(store.tasks()[0].title, "original");
    assert_eq!(storage.write_count(), 1);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn unknown_id_is_a_silent_no_op() {
    let (mut store, storage, seen) = observed_store();
    store.add(task("only"));
    let before = store.snapshot();
    let missing = TaskId::new();

    assert!(!store.remove(missing));
    assert!(!store.toggle_completed(missing));
    let mut ghost = task("ghost");
    ghost.id = missing;
    assert!(!store.update(ghost));

    assert_eq!(store.snapshot(), before);
    assert_eq!(storage.write_count(), 1);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn remove_keeps_order_of_the_rest() {
    let (mut store, _, seen) = observed_store();
    let a = task("a");
    let b = task("b");
    let c = task("c");
    let b_id = b.id;
    store.add(a);
    store.add(b);
    store.add(c);

    assert!(store.remove(b_id));

    let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "c"]);
    assert!(store.get(b_id).is_none());
    assert_eq!(seen.borrow().last(), Some(&2));
}

#[test]
fn remove_twice_equals_once() {
    let (mut store, storage, seen) = observed_store();
    let keep = task("keep");
    let gone = task("gone");
    let gone_id = gone.id;
    store.add(keep);
    store.add(gone);

    assert!(store.remove(gone_id));
    let after_first = store.snapshot();
    let writes = storage.write_count();
    let notifications = seen.borrow().len();

    assert!(!store.remove(gone_id));
    assert_eq!(store.snapshot(), after_first);
    assert_eq!(storage.write_count(), writes);
    assert_eq!(seen.borrow().len(), notifications);
}

#[test]
fn toggle_twice_restores_completion() {
    let (mut store, storage, _) = observed_store();
    let t = task("toggle me");
    let id = t.id;
    store.add(t);

    assert!(store.toggle_completed(id));
    assert!(store.get(id).unwrap().completed);
    assert!(store.toggle_completed(id));
    assert!(!store.get(id).unwrap().completed);
    assert_eq!(storage.write_count(), 3);
}

#[test]
fn update_replaces_fields_but_keeps_identity() {
    let (mut store, _, _) = observed_store();
    let original = task("draft");
    let id = original.id;
    let created_at = original.created_at;
    store.add(original);

    let mut edited = tagged("final", &["work"]);
    edited.id = id;
    edited.priority = Priority::High;
    edited.completed = true;
    edited.created_at = at(1, 0);
    assert!(store.update(edited));

    let stored = store.get(id).unwrap();
    assert_eq!(stored.title, "final");
    assert_eq!(stored.priority, Priority::High);
    assert!(stored.completed);
    assert_eq!(stored.tags, vec!["work".to_string()]);
    assert_eq!(stored.created_at, created_at);
    assert_eq!(store.len(), 1);
}

#[test]
fn all_tags_are_distinct_in_first_seen_order() {
    let (mut store, _, _) = observed_store();
    store.add(tagged("one", &["work", "urgent"]));
    store.add(tagged("two", &["home", "work"]));
    store.add(task("three"));

    assert_eq!(store.all_tags(), vec!["work", "urgent", "home"]);
}

#[test]
fn restore_replaces_everything_in_one_notification() {
    let (mut store, storage, seen) = observed_store();
    store.add(task("old"));

    let first = task("new one");
    let mut dup = task("dup");
    dup.id = first.id;
    store.restore(vec![first, task("new two"), dup]);

    let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["new one", "new two"]);
    assert_eq!(storage.write_count(), 2);
    assert_eq!(*seen.borrow(), vec![1, 2]);
}

#[test]
fn unsubscribed_listener_stops_hearing() {
    let storage = Rc::new(MemoryStorage::new());
    let mut store = TaskStore::new(storage);
    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    let id = store.subscribe(move |_: &[Task]| *counter.borrow_mut() += 1);

    store.add(task("heard"));
    assert!(store.unsubscribe(id));
    store.add(task("unheard"));

    assert_eq!(*count.borrow(), 1);
}

#[test]
fn load_rehydrates_the_last_snapshot() {
    let storage = Rc::new(MemoryStorage::new());
    let mut store = TaskStore::new(storage.clone());
    let t = tagged("persisted", &["work"]);
    let id = t.id;
    store.add(t);
    store.add(task("second"));
    store.toggle_completed(id);
    let expected = store.snapshot();
    drop(store);

    let reloaded = TaskStore::load(storage);
    assert_eq!(reloaded.snapshot(), expected);
    assert!(reloaded.get(id).unwrap().completed);
}

#[test]
fn load_from_empty_storage_is_empty() {
    let store = TaskStore::load(Rc::new(MemoryStorage::new()));
    assert!(store.is_empty());
}

#[test]
fn corrupt_snapshot_falls_back_to_empty() {
    let storage = Rc::new(MemoryStorage::new());
    storage.save(TASKS_KEY, "{not json").unwrap();

    let store = TaskStore::load(storage.clone());
    assert!(store.is_empty());
}

#[test]
fn unknown_snapshot_version_falls_back_to_empty() {
    let storage = Rc::new(MemoryStorage::new());
    storage.save(TASKS_KEY, "{\"version\":7,\"state\":[]}").unwrap();

    assert!(TaskStore::load(storage).is_empty());
}

#[test]
fn load_drops_repeated_ids() {
    let storage = Rc::new(MemoryStorage::new());
    let id = "5f0c1b9e-8a4e-4d52-9a57-0f3c2d1e6b7a";
    let json = format!(
        "{{\"version\":0,\"state\":[\
         {{\"id\":\"{id}\",\"title\":\"kept\",\"completed\":false,\"dueDate\":\"2024-05-20T23:59:59Z\",\"priority\":\"low\",\"tags\":[],\"createdAt\":\"2024-05-15T09:00:00Z\"}},\
         {{\"id\":\"{id}\",\"title\":\"dropped\",\"completed\":true,\"dueDate\":\"2024-05-21T23:59:59Z\",\"priority\":\"high\",\"tags\":[],\"createdAt\":\"2024-05-15T09:00:00Z\"}}\
         ]}}"
    );
    storage.save(TASKS_KEY, &json).unwrap();

    let store = TaskStore::load(storage);
    assert_eq!(store.len(), 1);
    assert_eq!(store.tasks()[0].title, "kept");
    assert_eq!(store.tasks()[0].priority, Priority::Low);
}

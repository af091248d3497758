//! Crash interception tests
//!
//! Panic hooks are process-global, so these run in their own test binary and
//! take a shared lock to run one at a time.

use parking_lot::{const_mutex, Mutex as SerialLock};
use rust_monitor_system::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};

static SERIAL: SerialLock<()> = const_mutex(());

fn manager(config: MonitorConfig) -> (MonitorManager, Arc<Mutex<Vec<i32>>>) {
    let exits = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&exits);
    let mut manager = MonitorManager::new("taskcluster-testing-service")
        .with_exit_handler(move |status| recorded.lock().unwrap().push(status));
    manager.setup(config).expect("setup failed");
    (manager, exits)
}

fn intercepting(allow_exit: bool, bail: bool) -> MonitorConfig {
    MonitorConfig::default()
        .with_patch_global(true)
        .with_bail_on_unhandled_rejection(bail)
        .with_mock(MockConfig { allow_exit })
}

fn panic_in_thread(message: &'static str) {
    let result = std::thread::spawn(move || panic!("{}", message)).join();
    assert!(result.is_err());
}

#[test]
fn test_thrown_with_interception() {
    let _serial = SERIAL.lock();
    let (mut manager, exits) = manager(intercepting(true, false));

    panic_in_thread("exploding");

    assert_eq!(*exits.lock().unwrap(), vec![1]);
    let messages = manager.messages();
    assert_eq!(messages.len(), 1);
    let record = &messages[0];
    assert_eq!(record.type_tag, "monitor.error");
    assert_eq!(record.severity, LogLevel::Err);
    assert_eq!(record.field("name"), Some(&json!("Panic")));
    assert_eq!(record.field("message"), Some(&json!("exploding")));
    assert_eq!(record.field("reason"), Some(&json!("uncaughtException")));
    assert!(record.field("location").is_some());
    manager.terminate();
}

#[test]
fn test_thrown_without_interception() {
    let _serial = SERIAL.lock();
    let (manager, exits) = manager(MonitorConfig::default().with_mock(MockConfig { allow_exit: true }));

    panic_in_thread("exploding");

    assert!(exits.lock().unwrap().is_empty());
    assert!(manager.messages().is_empty());
}

#[test]
fn test_thrown_in_plain_mock_does_not_exit() {
    let _serial = SERIAL.lock();
    let (manager, exits) = manager(intercepting(false, false));

    panic_in_thread("exploding");

    assert!(exits.lock().unwrap().is_empty());
    assert_eq!(manager.messages().len(), 1);
}

#[test]
fn test_terminate_restores_previous_hook() {
    let _serial = SERIAL.lock();
    let (mut manager, exits) = manager(intercepting(true, false));
    manager.terminate();

    panic_in_thread("after terminate");

    assert!(exits.lock().unwrap().is_empty());
    assert!(!manager.is_set_up());
}

#[tokio::test]
async fn test_unhandled_with_interception_and_bail() {
    let _serial = SERIAL.lock();
    let (manager, exits) = manager(intercepting(true, true));
    let monitor = manager.root_monitor().unwrap();

    monitor
        .spawn_detached(async { Err::<(), String>("rejected".to_string()) })
        .unwrap()
        .await
        .unwrap();

    assert_eq!(*exits.lock().unwrap(), vec![1]);
    let messages = manager.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].field("reason"), Some(&json!("unhandledRejection")));
    assert_eq!(messages[0].field("message"), Some(&json!("rejected")));
}

#[tokio::test]
async fn test_unhandled_with_interception_continues() {
    let _serial = SERIAL.lock();
    let (manager, exits) = manager(intercepting(true, false));
    let monitor = manager.root_monitor().unwrap();

    monitor
        .spawn_detached(async { Err::<(), String>("rejected".to_string()) })
        .unwrap()
        .await
        .unwrap();

    assert!(exits.lock().unwrap().is_empty());
    assert_eq!(manager.messages().len(), 1);
}

#[tokio::test]
async fn test_unhandled_without_interception() {
    let _serial = SERIAL.lock();
    let (manager, exits) = manager(MonitorConfig::default().with_mock(MockConfig { allow_exit: true }));
    let monitor = manager.root_monitor().unwrap();

    monitor
        .spawn_detached(async { Err::<(), String>("rejected".to_string()) })
        .unwrap()
        .await
        .unwrap();
    monitor
        .spawn_detached(async { Ok::<u32, String>(5) })
        .unwrap()
        .await
        .unwrap();

    assert!(exits.lock().unwrap().is_empty());
    assert!(manager.messages().is_empty());
}

#[test]
fn test_panic_through_timer_is_left_to_caller() {
    let _serial = SERIAL.lock();
    let (manager, exits) = manager(intercepting(true, false));
    let monitor = manager.root_monitor().unwrap();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        monitor.timer("work", || -> u32 { panic!("inside timer") })
    }));

    assert!(result.is_err());
    assert!(exits.lock().unwrap().is_empty());
    let tags: Vec<String> = manager.messages().into_iter().map(|m| m.type_tag).collect();
    assert_eq!(tags, vec!["monitor.timer"]);
}

#[tokio::test]
async fn test_panic_through_timed_handler_is_left_to_caller() {
    let _serial = SERIAL.lock();
    let (manager, exits) = manager(intercepting(true, false));
    let monitor = manager.root_monitor().unwrap();
    let handler = monitor.timed_handler("explode", |_: ()| async {
        if true {
            panic!("inside handler");
        }
        Ok::<(), String>(())
    });

    let result = tokio::spawn(handler(())).await;

    assert!(result.unwrap_err().is_panic());
    assert!(exits.lock().unwrap().is_empty());
    let messages = manager.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].type_tag, "monitor.handlerTimer");
    assert_eq!(messages[0].field("status"), Some(&json!("error")));
}

#[test]
fn test_panic_after_timer_is_still_reported() {
    let _serial = SERIAL.lock();
    let (manager, exits) = manager(intercepting(true, false));
    let monitor = manager.root_monitor().unwrap();
    assert_eq!(monitor.timer("work", || 3), 3);

    panic_in_thread("later");

    assert_eq!(*exits.lock().unwrap(), vec![1]);
    let messages = manager.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].field("reason"), Some(&json!("uncaughtException")));
}

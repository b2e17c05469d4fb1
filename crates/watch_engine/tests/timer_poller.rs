use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use watch_engine::{
    ApiError, EngineEvent, EventSink, Poller, RetryTimer, StatusSource,
};

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
struct CountingSource {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl StatusSource for CountingSource {
    async fn job_status(&self, job_id: &str) -> Result<String, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(r#"{{"id":"{job_id}","n":{n}}}"#))
    }
}

#[tokio::test]
async fn rescheduling_replaces_the_armed_timer() {
    let sink = Arc::new(TestSink::default());
    let mut timer = RetryTimer::new();

    timer.schedule(1, Duration::from_millis(50), sink.clone());
    timer.schedule(2, Duration::from_millis(80), sink.clone());
    assert_eq!(timer.pending_generation(), Some(2));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sink.take(), vec![EngineEvent::RetryDue { generation: 2 }]);
    assert_eq!(timer.pending_generation(), None);
}

#[tokio::test]
async fn cancelled_timer_never_fires() {
    let sink = Arc::new(TestSink::default());
    let mut timer = RetryTimer::new();

    timer.schedule(5, Duration::from_millis(50), sink.clone());
    timer.cancel();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn poller_reports_bodies_for_its_job() {
    let sink = Arc::new(TestSink::default());
    let source = Arc::new(CountingSource::default());
    let mut poller = Poller::new();

    poller.start(
        "J1".to_string(),
        Duration::from_millis(30),
        source.clone(),
        sink.clone(),
    );
    assert_eq!(poller.active_job(), Some("J1"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    poller.stop();

    let events = sink.take();
    assert!(!events.is_empty());
    assert!(events.iter().all(|event| matches!(
        event,
        EngineEvent::PollBody { job_id, .. } if job_id == "J1"
    )));
}

#[tokio::test]
async fn stopped_poller_goes_quiet() {
    let sink = Arc::new(TestSink::default());
    let source = Arc::new(CountingSource::default());
    let mut poller = Poller::new();

    poller.start(
        "J1".to_string(),
        Duration::from_millis(30),
        source.clone(),
        sink.clone(),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    poller.stop();
    assert_eq!(poller.active_job(), None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    sink.take();

    let calls = source.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn restarting_switches_to_the_new_job() {
    let sink = Arc::new(TestSink::default());
    let source = Arc::new(CountingSource::default());
    let mut poller = Poller::new();

    poller.start("J_old".to_string(), Duration::from_millis(30), source.clone(), sink.clone());
    tokio::time::sleep(Duration::from_millis(80)).await;
    poller.start("J_new".to_string(), Duration::from_millis(30), source.clone(), sink.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;
    sink.take();

    tokio::time::sleep(Duration::from_millis(150)).await;
    poller.stop();
    let events = sink.take();
    assert!(!events.is_empty());
    assert!(events.iter().all(|event| matches!(
        event,
        EngineEvent::PollBody { job_id, .. } if job_id == "J_new"
    )));
}

//! Concurrent tests for the print object list engine.
//!
//! These exercise the producer/consumer contract with a real background
//! thread: a gated conversation hands out reply packets only when the test
//! releases them, so close/wait races are driven deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use hostlink_core::{Codepoint, Error};
use hostlink_print::{
    Conversation, ListKind, ListReply, ListRequest, PrintObject, PrintObjectList,
    PrintObjectListListener, CP_ATTRIBUTES, CP_IDENTITY, CP_MESSAGE_ID, CP_MESSAGE_TEXT,
    RC_ESCAPE_MESSAGE, RC_OK,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// Test conversations
// ============================================================================

/// Hands each scripted reply out only after `release` grants a permit.
struct GatedConversation {
    replies: Mutex<VecDeque<ListReply>>,
    permits: Mutex<usize>,
    permit_granted: Condvar,
    correlation: AtomicU32,
}

impl GatedConversation {
    fn new(replies: Vec<ListReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            permits: Mutex::new(0),
            permit_granted: Condvar::new(),
            correlation: AtomicU32::new(1),
        })
    }

    fn release(&self, count: usize) {
        let mut permits = self.permits.lock();
        *permits += count;
        self.permit_granted.notify_all();
    }

    fn release_all(&self) {
        self.release(usize::MAX / 2);
    }
}

impl Conversation for GatedConversation {
    fn new_correlation(&self) -> u32 {
        self.correlation.fetch_add(1, Ordering::Relaxed)
    }
    fn send(&self, _request: &ListRequest, _correlation: u32) -> hostlink_core::Result<()> {
        Ok(())
    }
    fn receive(&self, _correlation: u32) -> hostlink_core::Result<Option<ListReply>> {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.permit_granted.wait(&mut permits);
        }
        *permits -= 1;
        drop(permits);
        Ok(self.replies.lock().pop_front())
    }
}

fn object_reply(tag: &str, last: bool) -> ListReply {
    ListReply::new(
        RC_OK,
        last,
        vec![
            Codepoint::new(CP_IDENTITY, tag.as_bytes().to_vec()),
            Codepoint::new(CP_ATTRIBUTES, vec![0u8, 1]),
        ],
    )
}

fn object_stream(count: usize) -> Vec<ListReply> {
    (0..count)
        .map(|i| object_reply(&format!("obj{:03}", i), i + 1 == count))
        .collect()
}

// ============================================================================
// Event recording
// ============================================================================

#[derive(Debug, PartialEq, Eq, Clone)]
enum Event {
    Opened,
    Added(String),
    Errored(String),
    Completed,
    Closed,
}

struct Recorder {
    tx: Mutex<mpsc::Sender<Event>>,
}

impl Recorder {
    fn channel() -> (Arc<Self>, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel();
        (
            Arc::new(Self {
                tx: Mutex::new(tx),
            }),
            rx,
        )
    }
}

impl PrintObjectListListener for Recorder {
    fn opened(&self) {
        let _ = self.tx.lock().send(Event::Opened);
    }
    fn object_added(&self, object: &PrintObject) {
        let _ = self.tx.lock().send(Event::Added(object.identity_text()));
    }
    fn error_occurred(&self, error: &Error) {
        let _ = self.tx.lock().send(Event::Errored(error.to_string()));
    }
    fn completed(&self) {
        let _ = self.tx.lock().send(Event::Completed);
    }
    fn closed(&self) {
        let _ = self.tx.lock().send(Event::Closed);
    }
}

fn wait_for(rx: &mpsc::Receiver<Event>, expected: &Event) {
    loop {
        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap_or_else(|_| panic!("timed out waiting for {:?}", expected));
        if &event == expected {
            return;
        }
    }
}

// ============================================================================
// SECTION 1: Ordering and progress
// ============================================================================

/// Objects come back in host packet order, and the size visible at each
/// object-added event is never behind the event itself.
#[test]
fn test_async_ordering_and_size_progress() {
    init_tracing();
    const N: usize = 50;
    let conversation = GatedConversation::new(object_stream(N));
    conversation.release_all();
    let list = Arc::new(PrintObjectList::new(
        conversation.clone() as Arc<dyn Conversation>,
        ListKind::SpooledFiles,
    ));

    struct SizeWatcher {
        list: Mutex<Option<Arc<PrintObjectList>>>,
        events_seen: AtomicUsize,
        violations: AtomicUsize,
    }
    impl PrintObjectListListener for SizeWatcher {
        fn object_added(&self, _object: &PrintObject) {
            let seen = self.events_seen.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(list) = self.list.lock().as_ref() {
                if list.size() < seen {
                    self.violations.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }

    let watcher = Arc::new(SizeWatcher {
        list: Mutex::new(Some(list.clone())),
        events_seen: AtomicUsize::new(0),
        violations: AtomicUsize::new(0),
    });
    list.add_listener(watcher.clone());

    list.open_asynchronously().unwrap();
    list.wait_for_list_to_complete().unwrap();

    assert_eq!(list.size(), N);
    assert_eq!(watcher.events_seen.load(Ordering::SeqCst), N);
    assert_eq!(watcher.violations.load(Ordering::SeqCst), 0);

    let names: Vec<String> = list
        .get_objects()
        .unwrap()
        .iter()
        .map(PrintObject::identity_text)
        .collect();
    let expected: Vec<String> = (0..N).map(|i| format!("obj{:03}", i)).collect();
    assert_eq!(names, expected);
}

/// `wait_for_item` returns as soon as enough objects arrived, while the
/// build is still streaming.
#[test]
fn test_wait_for_item_partial_progress() {
    let conversation = GatedConversation::new(object_stream(10));
    let list = PrintObjectList::new(
        conversation.clone() as Arc<dyn Conversation>,
        ListKind::SpooledFiles,
    );
    list.open_asynchronously().unwrap();

    conversation.release(3);
    list.wait_for_item(3).unwrap();
    assert!(list.size() >= 3);
    assert!(!list.is_completed().unwrap());
    assert_eq!(list.get_object(2).unwrap().identity_text(), "obj002");

    conversation.release_all();
    list.wait_for_list_to_complete().unwrap();
    assert_eq!(list.size(), 10);
    assert!(list.is_completed().unwrap());
}

/// Multiple threads blocked in `wait_for_item` all wake as objects arrive.
#[test]
fn test_concurrent_waiters_all_wake() {
    const WAITERS: usize = 4;
    let conversation = GatedConversation::new(object_stream(8));
    let list = Arc::new(PrintObjectList::new(
        conversation.clone() as Arc<dyn Conversation>,
        ListKind::SpooledFiles,
    ));
    list.open_asynchronously().unwrap();

    let barrier = Arc::new(Barrier::new(WAITERS + 1));
    let woken = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for i in 0..WAITERS {
        let list = Arc::clone(&list);
        let barrier = Arc::clone(&barrier);
        let woken = Arc::clone(&woken);
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            // each waiter demands a different amount of progress
            list.wait_for_item(i + 2).unwrap();
            woken.fetch_add(1, Ordering::SeqCst);
        }));
    }

    barrier.wait();
    conversation.release_all();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(woken.load(Ordering::SeqCst), WAITERS);
}

// ============================================================================
// SECTION 2: Close discards
// ============================================================================

/// Closing mid-build empties the cache, makes getters report must-be-open,
/// and the still-running build tosses late packets instead of appending.
#[test]
fn test_close_mid_build_discards() {
    init_tracing();
    const N: usize = 12;
    const BEFORE_CLOSE: usize = 5;
    let conversation = GatedConversation::new(object_stream(N));
    let list = PrintObjectList::new(
        conversation.clone() as Arc<dyn Conversation>,
        ListKind::SpooledFiles,
    );
    let (recorder, events) = Recorder::channel();
    list.add_listener(recorder);

    list.open_asynchronously().unwrap();
    conversation.release(BEFORE_CLOSE);
    list.wait_for_item(BEFORE_CLOSE).unwrap();
    assert_eq!(list.size(), BEFORE_CLOSE);

    list.close();
    assert_eq!(list.size(), 0);
    assert!(matches!(list.get_objects(), Err(Error::InvalidState(_))));
    assert!(matches!(list.get_object(0), Err(Error::InvalidState(_))));
    wait_for(&events, &Event::Closed);

    // let the background thread drain the remaining packets
    conversation.release_all();
    wait_for(&events, &Event::Completed);
    // tossed packets never became visible
    assert_eq!(list.size(), 0);
}

/// Close is idempotent and never blocks on the build.
#[test]
fn test_close_idempotent() {
    let conversation = GatedConversation::new(object_stream(3));
    let list = PrintObjectList::new(
        conversation.clone() as Arc<dyn Conversation>,
        ListKind::SpooledFiles,
    );
    list.open_asynchronously().unwrap();
    list.close();
    list.close();
    assert_eq!(list.size(), 0);
    conversation.release_all();
    // waiters see the closed list as terminal
    list.wait_for_list_to_complete().unwrap();
}

// ============================================================================
// SECTION 3: Error propagation
// ============================================================================

fn escape_reply(id: &str, text: &str) -> ListReply {
    ListReply::new(
        RC_ESCAPE_MESSAGE,
        true,
        vec![
            Codepoint::new(CP_MESSAGE_ID, id.as_bytes().to_vec()),
            Codepoint::new(CP_MESSAGE_TEXT, text.as_bytes().to_vec()),
        ],
    )
}

/// A mid-stream escape message reaches every waiter with the decoded
/// fields, and no objects past the failure point appear.
#[test]
fn test_escape_message_reaches_all_waiters() {
    const BEFORE_ERROR: usize = 4;
    // one more OK packet than we keep, so none of the kept packets carries
    // the last-reply flag; the escape packet ends the stream instead
    let mut replies = object_stream(BEFORE_ERROR + 1);
    replies.truncate(BEFORE_ERROR);
    replies.push(escape_reply("CPF3330", "Necessary resource not available"));

    let conversation = GatedConversation::new(replies);
    conversation.release_all();
    let list = Arc::new(PrintObjectList::new(
        conversation as Arc<dyn Conversation>,
        ListKind::SpooledFiles,
    ));
    let (recorder, events) = Recorder::channel();
    list.add_listener(recorder);
    list.open_asynchronously().unwrap();

    let waiter = {
        let list = Arc::clone(&list);
        std::thread::spawn(move || list.wait_for_list_to_complete())
    };

    let err = waiter.join().unwrap().unwrap_err();
    match &err {
        Error::ServerMessage { id, text, .. } => {
            assert_eq!(id, "CPF3330");
            assert_eq!(text, "Necessary resource not available");
        }
        other => panic!("expected server message, got {:?}", other),
    }

    // stored error re-raised from every observation surface
    assert!(matches!(
        list.is_completed(),
        Err(Error::ServerMessage { .. })
    ));
    assert!(matches!(
        list.wait_for_item(100),
        Err(Error::ServerMessage { .. })
    ));
    assert_eq!(list.size(), BEFORE_ERROR);

    wait_for(&events, &Event::Completed);
}

/// Error and completed events both fire, in that order, on a failed build.
#[test]
fn test_error_event_precedes_completed() {
    let conversation = GatedConversation::new(vec![escape_reply("CPF9999", "boom")]);
    conversation.release_all();
    let list = PrintObjectList::new(
        conversation as Arc<dyn Conversation>,
        ListKind::SpooledFiles,
    );
    let (recorder, events) = Recorder::channel();
    list.add_listener(recorder);
    list.open_asynchronously().unwrap();
    let _ = list.wait_for_list_to_complete();

    let mut seen = Vec::new();
    while let Ok(event) = events.recv_timeout(Duration::from_secs(5)) {
        let done = event == Event::Completed;
        seen.push(event);
        if done {
            break;
        }
    }
    let error_pos = seen
        .iter()
        .position(|e| matches!(e, Event::Errored(_)))
        .expect("error event fired");
    let completed_pos = seen
        .iter()
        .position(|e| *e == Event::Completed)
        .expect("completed event fired");
    assert!(error_pos < completed_pos);
    assert_eq!(seen[0], Event::Opened);
}

// ============================================================================
// SECTION 4: Event order on success
// ============================================================================

#[test]
fn test_event_order_on_success() {
    let conversation = GatedConversation::new(object_stream(2));
    conversation.release_all();
    let list = PrintObjectList::new(
        conversation as Arc<dyn Conversation>,
        ListKind::OutputQueues,
    );
    let (recorder, events) = Recorder::channel();
    list.add_listener(recorder);
    list.open_synchronously().unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            Event::Opened,
            Event::Added("obj000".to_string()),
            Event::Added("obj001".to_string()),
            Event::Completed,
        ]
    );
}

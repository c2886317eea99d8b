//! Test utilities for libcoqtop integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use libcoqtop::config::FramingStrategy;
use libcoqtop::observer::{SessionObserver, SyncState};
use libcoqtop::protocol::{Element, Message, QUERY_NAG};
use libcoqtop::stream::{spawn_reader, Frame};
use libcoqtop::{Error, Received, Result, Transport};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What the fake prover does in answer to one call.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit one top-level element.
    Frame(String),
    /// Exit; no more output after the frames already emitted.
    Die,
}

/// Builders for prover replies.
pub mod reply {
    use libcoqtop::protocol::Element;

    pub fn good() -> String {
        r#"<value val="good"><string></string></value>"#.to_string()
    }

    pub fn unsafe_value() -> String {
        r#"<value val="unsafe"><string></string></value>"#.to_string()
    }

    pub fn fail(location: Option<(usize, usize)>, reason: &str) -> String {
        let mut value = Element::new("value").with_attr("val", "fail");
        if let Some((start, stop)) = location {
            value = value
                .with_attr("loc_s", start.to_string())
                .with_attr("loc_e", stop.to_string());
        }
        value.with_text(reason).to_xml()
    }

    pub fn message(level: &str, text: &str) -> String {
        Element::new("message")
            .with_child(Element::new("message_level").with_attr("val", level))
            .with_child(Element::new("string").with_text(text))
            .to_xml()
    }

    pub fn rewound(extra: usize) -> String {
        format!(r#"<value val="good"><int>{extra}</int></value>"#)
    }

    pub fn not_in_proof() -> String {
        r#"<value val="good"><option val="none"></option></value>"#.to_string()
    }

    /// A goals reply; each goal is `(identifier, hypotheses, conclusion)`.
    pub fn goals(goals: Vec<(&str, Vec<&str>, &str)>) -> String {
        let mut foreground = Element::new("list");
        for (id, hyps, conclusion) in goals {
            let mut list = Element::new("list");
            for hyp in hyps {
                list = list.with_child(Element::new("string").with_text(hyp));
            }
            foreground = foreground.with_child(
                Element::new("goal")
                    .with_child(Element::new("string").with_text(id))
                    .with_child(list)
                    .with_child(Element::new("string").with_text(conclusion)),
            );
        }
        wrap_goals(vec![foreground, Element::new("list")])
    }

    /// A goals reply missing the background list.
    pub fn single_list_goals() -> String {
        wrap_goals(vec![Element::new("list")])
    }

    fn wrap_goals(lists: Vec<Element>) -> String {
        let mut goals = Element::new("goals");
        for list in lists {
            goals = goals.with_child(list);
        }
        Element::new("value")
            .with_attr("val", "good")
            .with_child(
                Element::new("option")
                    .with_attr("val", "some")
                    .with_child(goals),
            )
            .to_xml()
    }
}

/// Every call the fake prover received.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<Element>>>);

impl RequestLog {
    pub fn push(&self, call: Element) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Element> {
        self.0.lock().unwrap().clone()
    }

    /// Text of the synchronized `interp` calls, in order.
    pub fn interps(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.attr("val") == Some("interp") && c.attr("raw").is_none())
            .map(|c| c.text)
            .collect()
    }

    /// Text of the raw `interp` calls, in order.
    pub fn queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.attr("val") == Some("interp") && c.attr("raw") == Some("true"))
            .map(|c| c.text)
            .collect()
    }

    /// Step counts of the `rewind` calls, in order.
    pub fn rewinds(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter(|c| c.attr("val") == Some("rewind"))
            .map(|c| c.attr("steps").unwrap().parse().unwrap())
            .collect()
    }
}

/// A scripted stand-in for coqtop.
///
/// Sentences are judged by their text:
/// - containing `FAIL`: rejected, located on the word
/// - containing `HANG`: never answered
/// - containing `DIE`: the prover exits
/// - containing `Admitted`: accepted as unsafe
/// - starting with `Check`: accepted with an info message
/// - anything else: accepted
///
/// Raw queries get the query nag plus an info message.
#[derive(Debug, Clone)]
pub struct FakeCoqtop {
    rewind_extra: usize,
    goals: String,
    log: RequestLog,
}

impl Default for FakeCoqtop {
    fn default() -> Self {
        Self {
            rewind_extra: 0,
            goals: reply::not_in_proof(),
            log: RequestLog::default(),
        }
    }
}

impl FakeCoqtop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra steps reported on every rewind.
    pub fn rewind_extra(mut self, extra: usize) -> Self {
        self.rewind_extra = extra;
        self
    }

    /// Reply to every goals call.
    pub fn goals_reply(mut self, xml: String) -> Self {
        self.goals = xml;
        self
    }

    pub fn log(&self) -> RequestLog {
        self.log.clone()
    }

    pub fn respond(&mut self, call: &Element) -> Vec<Step> {
        self.log.push(call.clone());
        match call.attr("val") {
            Some("interp") if call.attr("raw") == Some("true") => vec![
                Step::Frame(reply::message("warning", QUERY_NAG)),
                Step::Frame(reply::message("info", &format!("result: {}", call.text.trim()))),
                Step::Frame(reply::good()),
            ],
            Some("interp") => interp(&call.text),
            Some("rewind") => vec![Step::Frame(reply::rewound(self.rewind_extra))],
            Some("goal") => vec![Step::Frame(self.goals.clone())],
            _ => vec![Step::Frame(reply::fail(None, "unknown call"))],
        }
    }
}

fn interp(text: &str) -> Vec<Step> {
    if text.contains("DIE") {
        return vec![Step::Die];
    }
    if text.contains("HANG") {
        return Vec::new();
    }
    if let Some(byte) = text.find("FAIL") {
        let start = text[..byte].chars().count();
        return vec![Step::Frame(reply::fail(
            Some((start, start + 4)),
            "The reference FAIL was not found.",
        ))];
    }
    if text.contains("Admitted") {
        return vec![Step::Frame(reply::unsafe_value())];
    }
    if text.trim_start().starts_with("Check") {
        return vec![
            Step::Frame(reply::message("info", &format!("checked: {}", text.trim()))),
            Step::Frame(reply::good()),
        ];
    }
    vec![Step::Frame(reply::good())]
}

type Responder = Box<dyn FnMut(&Element) -> Vec<Step> + Send>;

/// Transport that hands each call straight to a responder.
///
/// Replies are queued as parsed elements; an empty queue answers
/// [`Received::Empty`] at once, so a silent responder looks like a timeout.
pub struct MockTransport {
    responder: Responder,
    queued: VecDeque<Element>,
    dead: bool,
    closes: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new(responder: impl FnMut(&Element) -> Vec<Step> + Send + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            queued: VecDeque::new(),
            dead: false,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fake(mut prover: FakeCoqtop) -> Self {
        Self::new(move |call| prover.respond(call))
    }

    /// Counter of `close` calls, shared with the test.
    pub fn closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

impl Transport for MockTransport {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.dead {
            return Err(Error::session_lost("the Coq process died"));
        }
        let request = std::str::from_utf8(bytes).expect("calls are utf-8");
        let call = Element::parse(request.trim_end()).expect("client wrote a well-formed call");
        for step in (self.responder)(&call) {
            match step {
                Step::Frame(xml) => self
                    .queued
                    .push_back(Element::parse(&xml).expect("well-formed reply")),
                Step::Die => self.dead = true,
            }
        }
        Ok(())
    }

    async fn try_receive(&mut self, _timeout: Duration) -> Received {
        match self.queued.pop_front() {
            Some(element) => Received::Frame(Frame::Element(element)),
            None if self.dead => Received::Closed,
            None => Received::Empty,
        }
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.dead = true;
    }
}

/// Transport that runs replies through the real framing pipeline.
///
/// Replies are written into an in-memory pipe in 7-byte pieces and framed
/// by the background reader with the chosen strategy.
pub struct FramedTransport {
    prover: FakeCoqtop,
    output: Option<DuplexStream>,
    frames: mpsc::UnboundedReceiver<Frame>,
    reader: JoinHandle<()>,
}

impl FramedTransport {
    pub fn spawn(prover: FakeCoqtop, framing: FramingStrategy) -> Self {
        let (output, input) = tokio::io::duplex(64);
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = spawn_reader(input, framing, tx);
        Self {
            prover,
            output: Some(output),
            frames: rx,
            reader,
        }
    }
}

impl Transport for FramedTransport {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let request = std::str::from_utf8(bytes).expect("calls are utf-8");
        let call = Element::parse(request.trim_end()).expect("client wrote a well-formed call");

        let mut die = false;
        let mut out = String::new();
        for step in self.prover.respond(&call) {
            match step {
                Step::Frame(xml) => out.push_str(&xml),
                Step::Die => die = true,
            }
        }
        out.push('\n');

        let Some(output) = self.output.as_mut() else {
            return Err(Error::session_lost("the Coq process died"));
        };
        for piece in out.as_bytes().chunks(7) {
            output.write_all(piece).await.map_err(Error::io)?;
        }
        if die {
            self.output = None;
        }
        Ok(())
    }

    async fn try_receive(&mut self, timeout: Duration) -> Received {
        match tokio::time::timeout(timeout, self.frames.recv()).await {
            Ok(Some(frame)) => Received::Frame(frame),
            Ok(None) => Received::Closed,
            Err(_) => Received::Empty,
        }
    }

    async fn close(&mut self) {
        self.output = None;
        self.reader.abort();
    }
}

/// Observer that records every notification.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<SyncState>>,
    pub batches: Mutex<Vec<Vec<Message>>>,
    pub fatals: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn state_count(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    pub fn last_state(&self) -> Option<SyncState> {
        self.states.lock().unwrap().last().copied()
    }

    pub fn batches(&self) -> Vec<Vec<Message>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn fatals(&self) -> Vec<String> {
        self.fatals.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_state_changed(&self, state: &SyncState) {
        self.states.lock().unwrap().push(*state);
    }

    fn on_messages(&self, messages: &[Message]) {
        self.batches.lock().unwrap().push(messages.to_vec());
    }

    fn on_fatal(&self, reason: &str) {
        self.fatals.lock().unwrap().push(reason.to_string());
    }
}

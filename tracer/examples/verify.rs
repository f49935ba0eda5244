//! Verifies a request/response property over a scripted trace.
//!
//! The property: once the worker consumes a request, it must send a
//! reply; consuming a stop message first violates it. The proof
//! derivation for the verdict is printed newest entry first.

use std::sync::Arc;

use argus_analyzer::VerdictHook;
use argus_tracer::{start, InMemorySource, Instrument, TracerConfig};
use argus_types::{EntryPoint, Env, Event, Monitor, Pid};
use serde_json::json;

fn property() -> Monitor {
    Monitor::act(
        Env::with_text("recv(req)").var("req"),
        |event| matches!(event, Event::Recv { msg, .. } if *msg == json!("req")),
        |_| {
            Monitor::chs(
                Env::new(),
                Monitor::act(
                    Env::with_text("send(reply).yes"),
                    |event| matches!(event, Event::Send { .. }),
                    |_| Monitor::yes(Env::new()),
                ),
                Monitor::act(
                    Env::with_text("recv(stop).no"),
                    |event| matches!(event, Event::Recv { msg, .. } if *msg == json!("stop")),
                    |_| Monitor::no(Env::new()),
                ),
            )
        },
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let source = Arc::new(InMemorySource::new());
    let predicate =
        Arc::new(|entry: &EntryPoint| (entry.function == "worker").then(property))
            as Arc<dyn Instrument>;
    let hook: VerdictHook = Arc::new(|verdict, log| {
        println!("verdict: {verdict}");
        for entry in log {
            print!("{entry}");
        }
    });

    let mut system = start(
        Pid(1),
        predicate,
        TracerConfig::default(),
        source.clone(),
        Some(hook),
    );

    let (main, worker, client) = (Pid(1), Pid(2), Pid(3));
    source.emit(Event::Spawn {
        src: main,
        tgt: worker,
        entry: EntryPoint::new("demo", "worker", vec![]),
    });
    source.emit(Event::Recv { dst: worker, msg: json!("req") });
    source.emit(Event::Send { src: worker, dst: client, msg: json!("reply") });
    source.emit(Event::Exit { src: worker, reason: json!("normal") });
    source.emit(Event::Exit { src: main, reason: json!("normal") });

    if let Some(notice) = system.wait_root().await {
        println!("root tracer done: {}", notice.stats);
    }
    system.stop();
}

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use dynconf::config::DynconfConfig;
use dynconf::defaults::{CallbacksConfig, DefaultEntry};
use dynconf::{CallbackFn, Dynconf, ListenerDescriptor, ListenerKinds, Registry};
use dynconf_listeners::{MemorySource, PushListener, register_builtin};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

type Body = Arc<Mutex<(StatusCode, String)>>;

async fn serve(body: Body) -> String {
    async fn current(State(body): State<Body>) -> (StatusCode, String) {
        body.lock().unwrap().clone()
    }

    let app = Router::new().route("/degrade", get(current)).with_state(body);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/degrade")
}

fn config(listener: Value) -> DynconfConfig {
    DynconfConfig {
        callbacks: CallbacksConfig {
            defaults: vec![DefaultEntry {
                keys: vec!["g:d".into()],
                default: json!({ "name": "degrade", "value": false }),
            }],
        },
        listeners: vec![serde_json::from_value::<ListenerDescriptor>(listener).unwrap()],
    }
}

async fn eventually(registry: &Registry, expected: bool) {
    for _ in 0..250 {
        if registry.get::<bool>("degrade").unwrap() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("degrade never became {expected}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_listener_applies_changed_bodies() {
    let body: Body = Arc::new(Mutex::new((
        StatusCode::OK,
        r#"{"name":"degrade","value":true}"#.to_owned(),
    )));
    let url = serve(Arc::clone(&body)).await;

    let mut kinds = ListenerKinds::new();
    register_builtin(&mut kinds);
    let registry = Registry::new();
    let dynconf = Dynconf::new(
        registry.clone(),
        kinds,
        config(json!({
            "listener": "http",
            "url": url,
            "interval": "50ms",
            "datas": [{ "group": "g", "data_id": "d", "callbacks": ["g:d"] }],
        })),
    );
    dynconf.callbacks().bind_slot::<bool>("g:d", "degrade").unwrap();

    let running = dynconf.start().await.unwrap();
    eventually(&registry, true).await;

    // Failing polls and rejected payloads leave the slot alone.
    *body.lock().unwrap() = (StatusCode::SERVICE_UNAVAILABLE, String::new());
    tokio::time::sleep(Duration::from_millis(150)).await;
    *body.lock().unwrap() = (StatusCode::OK, r#"{"name":"degrade","value":"off"}"#.to_owned());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(registry.get::<bool>("degrade").unwrap());

    *body.lock().unwrap() = (StatusCode::OK, r#"{"name":"degrade","value":false}"#.to_owned());
    eventually(&registry, false).await;

    running.shutdown().await;
}

#[tokio::test]
async fn push_listener_applies_published_content() {
    let source = Arc::new(MemorySource::new());
    let mut kinds = ListenerKinds::new();
    kinds.register_typed("nacos", PushListener::factory("nacos", source.clone()));

    let registry = Registry::new();
    let dynconf = Dynconf::new(
        registry.clone(),
        kinds,
        config(json!({
            "listener": "nacos",
            "server_config": "127.0.0.1:8848",
            "datas": [{ "group": "g", "data_id": "d", "callbacks": ["g:d"] }],
        })),
    );
    dynconf.callbacks().bind_slot::<bool>("g:d", "degrade").unwrap();

    let running = dynconf.start().await.unwrap();
    assert!(!registry.get::<bool>("degrade").unwrap());

    source.publish("g", "d", br#"{"name":"degrade","value":true}"#.as_slice());
    eventually(&registry, true).await;

    source.publish("g", "other", br#"{"name":"degrade","value":false}"#.as_slice());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(registry.get::<bool>("degrade").unwrap(), "unsubscribed entries are ignored");

    running.shutdown().await;
}

#[tokio::test]
async fn slow_callback_does_not_delay_other_subscriptions() {
    let source = Arc::new(MemorySource::new());
    let mut kinds = ListenerKinds::new();
    kinds.register_typed("nacos", PushListener::factory("nacos", source.clone()));

    let registry = Registry::new();
    let dynconf = Dynconf::new(
        registry.clone(),
        kinds,
        config(json!({
            "listener": "nacos",
            "datas": [
                { "group": "g", "data_id": "audit", "callbacks": ["audit"] },
                { "group": "g", "data_id": "d", "callbacks": ["g:d"] },
            ],
        })),
    );
    let started = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&started);
    dynconf
        .callbacks()
        .bind(
            "audit",
            CallbackFn::new("audit", move |_: &str, _: &[u8]| {
                flag.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(800));
                Ok(())
            }),
        )
        .unwrap();
    dynconf.callbacks().bind_slot::<bool>("g:d", "degrade").unwrap();

    let running = dynconf.start().await.unwrap();
    source.publish("g", "audit", b"{}".as_slice());
    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let timer = Instant::now();
    source.publish("g", "d", br#"{"name":"degrade","value":true}"#.as_slice());
    eventually(&registry, true).await;
    assert!(timer.elapsed() < Duration::from_millis(400), "applied after {:?}", timer.elapsed());

    running.shutdown().await;
}

#[tokio::test]
async fn http_listener_config_errors_abort_start() {
    let mut kinds = ListenerKinds::new();
    register_builtin(&mut kinds);
    let dynconf = Dynconf::new(
        Registry::new(),
        kinds,
        config(json!({ "listener": "http", "interval": 0, "url": "http://127.0.0.1:1/" })),
    );
    dynconf.callbacks().bind_slot::<bool>("g:d", "degrade").unwrap();

    let err = dynconf.start().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Listener error (load listeners failed): interval must be greater than zero"
    );
}

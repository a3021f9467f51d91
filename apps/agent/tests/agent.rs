use dynconf::config::load_config;
use dynconf_agent::{Agent, AgentConfig, SlotBinding};
use serde_json::{Value, json};
use std::io::Write;

const CONFIG: &str = r#"
log_keys = ["log:g:limits"]

[log]
level = "debug"
console = false

[[slots]]
key = "g:limits"
name = "limits"

[[dynconf.callbacks.defaults]]
keys = ["g:limits", "log:g:limits"]
default = { name = "limits", value = { burst = 5 } }
"#;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn config_file_is_parsed() {
    let file = write_config(CONFIG);
    let cfg: AgentConfig = load_config(Some(file.path())).unwrap();

    assert_eq!(cfg.slots, vec![SlotBinding { key: "g:limits".into(), name: "limits".into() }]);
    assert_eq!(cfg.log_keys, vec!["log:g:limits".to_owned()]);
    assert!(!cfg.log.console);
    assert_eq!(cfg.dynconf.callbacks.defaults.len(), 1);
    assert!(cfg.dynconf.listeners.is_empty());
}

#[tokio::test]
async fn run_seeds_json_slot_and_stops() {
    let file = write_config(CONFIG);
    let cfg: AgentConfig = load_config(Some(file.path())).unwrap();

    let agent = Agent::new(cfg).unwrap();
    let registry = agent.registry().clone();
    agent.run(async {}).await.unwrap();

    assert_eq!(registry.get::<Value>("limits").unwrap(), json!({ "burst": 5 }));
}

#[test]
fn duplicate_slot_key_is_rejected() {
    let slot = SlotBinding { key: "g:d".into(), name: "degrade".into() };
    let cfg = AgentConfig { slots: vec![slot.clone(), slot], ..AgentConfig::default() };

    let err = Agent::new(cfg).unwrap_err();
    assert!(err.to_string().contains("g:d"), "{err:#}");
}

#[tokio::test]
async fn failing_default_stops_startup() {
    let cfg: AgentConfig = serde_json::from_value(json!({
        "slots": [{ "key": "g:d", "name": "degrade" }],
        "dynconf": { "callbacks": { "defaults": [
            { "keys": ["g:d"], "default": { "name": "other", "value": true } }
        ] } }
    }))
    .unwrap();

    let err = Agent::new(cfg).unwrap().run(async {}).await.unwrap_err();
    assert!(format!("{err:#}").contains("Slot name mismatch"), "{err:#}");
}

//! Global-host behavior: static registration, late install rejection, and
//! concurrent first use.

use std::thread;

use polytag::derive::Contract;
use polytag::{BridgeConfig, ContractError, Poly};

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Event;

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(extends = Event, default)]
pub struct Ping {
    pub seq: u32,
}

#[test]
fn auto_registration_feeds_the_global_host() {
    // Concurrent first use: every thread must observe the same registry,
    // fully auto-registered.
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let ping: Poly<Event> = Poly::new(Ping { seq: i });
                serde_json::to_string(&ping).unwrap()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let json = handle.join().unwrap();
        assert_eq!(
            json,
            format!(r#"{{"$type":"global_host::Ping","seq":{i}}}"#)
        );
    }

    let registry = polytag::global();
    assert!(registry.get_by_name("Ping").is_some());
    assert!(registry.get_by_path("global_host::Event").is_some());

    // The host is already built; a late install must fail loudly.
    assert_eq!(
        polytag::install(BridgeConfig::new()),
        Err(ContractError::AlreadyInstalled),
    );
}

//! Concurrency tests: lookups racing with source chain and override updates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use appenv_config::{MapSource, Resolver, SharedSource};

const LOOKUPS: usize = 1000;
const READERS: usize = 8;

fn map(description: &str, value: &str) -> SharedSource {
    Arc::new(
        MapSource::new(description)
            .with("Key", value)
            .with("Nested", "%Key%!"),
    )
}

#[test]
fn lookups_during_chain_mutation() {
    let resolver = Resolver::new();
    let base = map("base", "base");
    let extra = map("extra", "extra");
    let late = map("late", "late");
    resolver.register_source(base.clone());

    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let writer = scope.spawn(|| {
            let mut rounds = 0usize;
            while !done.load(Ordering::Acquire) || rounds < 10 {
                resolver.register_source_before(extra.clone(), &base);
                resolver.register_source(late.clone());
                resolver.register_source_at(late.clone(), 0);
                resolver.unregister_source(&extra);
                resolver.unregister_source(&late);
                rounds += 1;
            }
            resolver.register_source_before(extra.clone(), &base);
            rounds
        });

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                scope.spawn(|| {
                    for _ in 0..LOOKUPS / READERS {
                        let value = resolver.get_string("Key", "default");
                        assert!(
                            ["base", "extra", "late"].contains(&value.as_str()),
                            "unexpected value {value}"
                        );
                        let nested = resolver.get_string("Nested", "default");
                        assert!(nested.ends_with('!'), "unexpected nested {nested}");

                        let chain = resolver.sources();
                        assert!(chain.contains(&base));
                        assert!(chain.len() <= 3);
                    }
                })
            })
            .collect();

        for reader in readers {
            reader.join().unwrap();
        }
        done.store(true, Ordering::Release);
        assert!(writer.join().unwrap() >= 10);
    });

    let chain = resolver.sources();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.position(&extra), Some(0));
    assert_eq!(chain.position(&base), Some(1));
    assert_eq!(resolver.get_string("Key", "default"), "extra");
    assert_eq!(resolver.description(), "appenv: extra, base");
}

#[test]
fn overrides_and_provenance_under_contention() {
    let resolver = Resolver::new();
    resolver.register_source(map("base", "base"));

    thread::scope(|scope| {
        for worker in 0..READERS {
            let resolver = &resolver;
            scope.spawn(move || {
                for i in 0..LOOKUPS / READERS {
                    let key = format!("K{}", i % 16);
                    if worker % 2 == 0 {
                        resolver.register_key_value(&key, format!("w{worker}-{i}"));
                    } else {
                        resolver.get_string(&key, "d");
                        resolver.get_string("Key", "d");
                    }
                    let _ = resolver.parameters_sources();
                }
            });
        }
    });

    let log = resolver.parameters_sources();
    assert_eq!(log["Key"].value, "base");
    for i in 0..16 {
        let key = format!("K{i}");
        let record = &log[key.as_str()];
        assert!(record.value.starts_with('w') || record.value == "d");
    }
}

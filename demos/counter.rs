//! Counter Store
//!
//! This example demonstrates the basic store lifecycle.
//!
//! Key concepts:
//! - Updates compute a new state from the current one
//! - Subscribers are notified only when their selected slice changes
//! - Returning the current state is a silent no-op
//! - Effects clean up before every re-run and on disposal
//!
//! Run with: cargo run --example counter

use chrono::{DateTime, Utc};
use mindstore::{Cleanup, StoreBuilder};
use std::rc::Rc;

#[derive(Clone, Debug)]
struct CounterState {
    count: i32,
    last_updated: DateTime<Utc>,
}

fn main() {
    println!("=== Counter Store Example ===\n");

    let store = StoreBuilder::new()
        .initial(CounterState {
            count: 0,
            last_updated: Utc::now(),
        })
        .name("counter")
        .build()
        .unwrap();

    let reader = store.downgrade();
    let count_view = store.subscribe(
        |s: &CounterState| s.count,
        move || {
            if let Some(store) = reader.upgrade() {
                println!("  [view] count is now {}", store.state().count);
            }
        },
    );

    let parity = store.effect(
        |s: &CounterState| s.count % 2 == 0,
        |state: &CounterState, previous: &CounterState| {
            println!(
                "  [effect] parity changed: {} -> {}",
                previous.count, state.count
            );
            Cleanup::new(|| println!("  [effect] cleanup"))
        },
    );

    println!("\nIncrement twice:");
    for _ in 0..2 {
        store
            .modify(|s| CounterState {
                count: s.count + 1,
                last_updated: Utc::now(),
            })
            .unwrap();
    }

    println!("\nNo-op update:");
    let outcome = store.update(|s| Rc::clone(s)).unwrap();
    println!("  outcome: {:?}", outcome);

    println!("\nDispose the effect, then decrement:");
    parity.unsubscribe();
    store
        .modify(|s| CounterState {
            count: s.count - 1,
            last_updated: Utc::now(),
        })
        .unwrap();

    count_view.unsubscribe();

    let meta = store.metadata();
    println!(
        "\nUpdates: {}, skipped: {}, notifications: {}",
        meta.updates, meta.skipped_updates, meta.notifications
    );
    println!("Last updated at {}", store.state().last_updated);

    println!("\n=== Example Complete ===");
}

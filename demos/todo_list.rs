//! Todo List Store
//!
//! This example demonstrates derived selectors and snapshot reads.
//!
//! Key concepts:
//! - Shared items (`Rc`) keep list comparisons shallow
//! - Records opt into shallow comparison with `shallow_record!`
//! - `ExternalSource` serves referentially stable snapshots to a host
//! - Actions are plain functions over an injected store
//!
//! Run with: cargo run --example todo_list

use mindstore::{shallow_atom, shallow_record, Store, StoreContext};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Filter {
    All,
    Active,
    Completed,
}

shallow_atom!(Filter);

#[derive(Debug)]
struct Todo {
    id: u32,
    text: String,
    completed: bool,
}

#[derive(Clone)]
struct TodoState {
    todos: Vec<Rc<Todo>>,
    filter: Filter,
    search_query: String,
    next_id: u32,
}

shallow_record! {
    #[derive(Debug)]
    struct FilterBar {
        filter: Filter,
        search_query: String,
    }
}

struct TodoActions {
    store: Store<TodoState>,
}

impl TodoActions {
    fn add(&self, text: &str) {
        self.store
            .modify(|s| {
                let mut todos = s.todos.clone();
                todos.push(Rc::new(Todo {
                    id: s.next_id,
                    text: text.to_string(),
                    completed: false,
                }));
                TodoState {
                    todos,
                    next_id: s.next_id + 1,
                    ..s.clone()
                }
            })
            .unwrap();
    }

    fn toggle(&self, id: u32) {
        self.store
            .modify(|s| TodoState {
                todos: s
                    .todos
                    .iter()
                    .map(|todo| {
                        if todo.id == id {
                            Rc::new(Todo {
                                id: todo.id,
                                text: todo.text.clone(),
                                completed: !todo.completed,
                            })
                        } else {
                            Rc::clone(todo)
                        }
                    })
                    .collect(),
                ..s.clone()
            })
            .unwrap();
    }

    fn set_filter(&self, filter: Filter) {
        self.store
            .modify(|s| TodoState {
                filter,
                ..s.clone()
            })
            .unwrap();
    }

    fn set_search(&self, query: &str) {
        self.store
            .modify(|s| TodoState {
                search_query: query.to_string(),
                ..s.clone()
            })
            .unwrap();
    }
}

fn visible_todos(state: &TodoState) -> Vec<Rc<Todo>> {
    let query = state.search_query.to_lowercase();
    state
        .todos
        .iter()
        .filter(|todo| match state.filter {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        })
        .filter(|todo| query.is_empty() || todo.text.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

fn main() {
    println!("=== Todo List Store Example ===\n");

    let context = StoreContext::new().with(Store::new(TodoState {
        todos: Vec::new(),
        filter: Filter::All,
        search_query: String::new(),
        next_id: 1,
    }));
    let store = context.require::<TodoState>().unwrap();
    let actions = TodoActions {
        store: store.clone(),
    };

    let visible = store.selector(visible_todos);
    let list = store.external(&visible);
    let list_renders = list.subscribe(|| println!("  [list] re-render"));

    let filter_bar = store.subscribe(
        |s: &TodoState| FilterBar {
            filter: s.filter,
            search_query: s.search_query.clone(),
        },
        || println!("  [filter bar] re-render"),
    );

    println!("Add three todos:");
    actions.add("Write the store");
    actions.add("Write the tests");
    actions.add("Ship it");

    println!("\nComplete #1:");
    actions.toggle(1);

    println!("\nShow active only:");
    let before = list.snapshot();
    actions.set_filter(Filter::Active);
    let after = list.snapshot();
    println!("  snapshot replaced: {}", !Rc::ptr_eq(&before, &after));
    for todo in after.iter() {
        println!("  - #{} {}", todo.id, todo.text);
    }

    println!("\nSearch for \"tests\":");
    actions.set_search("tests");
    for todo in list.snapshot().iter() {
        println!("  - #{} {}", todo.id, todo.text);
    }

    println!("\nRe-reading without changes keeps the same snapshot:");
    let again = list.snapshot();
    println!("  same reference: {}", Rc::ptr_eq(&again, &list.server_snapshot()));

    list_renders.unsubscribe();
    filter_bar.unsubscribe();
    store.destroy();

    println!("\n=== Example Complete ===");
}

use std::cell::Cell;
use std::rc::Rc;
use wbi_map::Store;

#[derive(Debug, Default, Clone, PartialEq)]
struct MapState {
    indicator: String,
    year: Option<String>,
}

#[test]
fn listeners_see_updated_state() {
    let mut store = Store::<MapState>::default();
    let seen = Rc::new(Cell::new(0));
    let seen_in = seen.clone();
    store.add_change_listener(move |s: &MapState| {
        assert_eq!(s.indicator, "literacy");
        seen_in.set(seen_in.get() + 1);
    });

    store.update(|s| {
        s.indicator = "literacy".into();
        s.year = Some("2015".into());
    });
    assert_eq!(seen.get(), 1);
    assert_eq!(store.state().year.as_deref(), Some("2015"));

    store.emit_change();
    assert_eq!(seen.get(), 2);
}

#[test]
fn no_listener_limit() {
    let mut store = Store::new(0u8);
    let calls = Rc::new(Cell::new(0usize));
    let ids: Vec<_> = (0..500)
        .map(|_| {
            let calls = calls.clone();
            store.add_change_listener(move |_| calls.set(calls.get() + 1))
        })
        .collect();
    assert_eq!(store.listener_count(), 500);

    store.emit_change();
    assert_eq!(calls.get(), 500);

    for id in &ids[..250] {
        assert!(store.remove_change_listener(*id));
    }
    store.emit_change();
    assert_eq!(calls.get(), 750);
}

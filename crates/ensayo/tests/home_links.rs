//! Home page smoke checks against the simulated site.

use ensayo::{HomePage, Locator, Proxy, SimElement, SimulatedSession, WaitPolicy};

const BASE_URL: &str = "https://the-internet.herokuapp.com";

fn home_site() -> SimulatedSession {
    let mut session = SimulatedSession::new();
    let model = session.model_mut();
    model.insert(
        &Locator::tag("h1"),
        SimElement::new("h1").with_text("Welcome to the-internet"),
    );
    for href in HomePage::<SimulatedSession>::EXAMPLE_LINKS {
        model.insert(
            &Locator::attribute("href", href),
            SimElement::new("a").with_attribute("href", href),
        );
    }
    session
}

fn fast_proxy(session: SimulatedSession) -> Proxy<SimulatedSession> {
    Proxy::new(session).with_policy(WaitPolicy::new().with_timeout(500).with_poll_interval(10))
}

#[test]
fn test_every_example_link_is_visible() {
    let proxy = fast_proxy(home_site());
    let home = HomePage::new(&proxy, BASE_URL);

    home.open().unwrap();
    assert_eq!(proxy.current_url().unwrap(), BASE_URL);
    assert!(home.all_links_visible());
}

#[test]
fn test_removed_link_is_detected() {
    let mut session = home_site();
    session
        .model_mut()
        .remove(&Locator::attribute("href", "/drag_and_drop"));
    let proxy = fast_proxy(session);
    let home = HomePage::new(&proxy, BASE_URL);

    home.open().unwrap();
    assert!(!home.all_links_visible());
    let visible = home.visible_links();
    assert_eq!(visible.len(), 9);
    assert!(!visible.contains(&"/drag_and_drop"));
}

#[test]
fn test_navigating_into_an_example() {
    let proxy = fast_proxy(home_site());
    let home = HomePage::new(&proxy, BASE_URL);

    home.open().unwrap();
    home.open_example("/checkboxes").unwrap();
    assert!(proxy.session().was_called("click:attr[href=/checkboxes]"));
}

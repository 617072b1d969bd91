//! Login scenarios against the simulated site.
//!
//! The simulated session models the `/login` form and wires the submit
//! button to the site's real behavior: valid credentials move to the secure
//! area, anything else flashes an error and keeps the form on screen.

use ensayo::{
    Credentials, EnsayoError, Locator, LoginPage, MediaKind, MemorySink, Proxy, SecureAreaPage,
    SimElement, SimulatedSession, UserProfiles, WaitPolicy,
};
use std::cell::RefCell;
use std::rc::Rc;

const BASE_URL: &str = "https://the-internet.herokuapp.com";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn username_field() -> Locator {
    Locator::id("username")
}

fn password_field() -> Locator {
    Locator::id("password")
}

fn submit_button() -> Locator {
    Locator::css("button[type='submit']")
}

fn flash() -> Locator {
    Locator::id("flash")
}

/// Simulated `/login` page whose submit button behaves like the real site.
fn login_site() -> SimulatedSession {
    let mut session = SimulatedSession::new();
    let model = session.model_mut();
    model.insert(&Locator::id("login"), SimElement::new("form"));
    model.insert(&username_field(), SimElement::new("input"));
    model.insert(&password_field(), SimElement::new("input"));
    model.insert(&submit_button(), SimElement::new("button"));
    model.insert(
        &Locator::tag("h2"),
        SimElement::new("h2").with_text("Login Page"),
    );

    session.on_click(&submit_button(), |model| {
        let value_of = |model: &ensayo::PageModel, locator: &Locator| {
            model
                .element(locator)
                .and_then(|el| el.attributes.get("value"))
                .cloned()
                .unwrap_or_default()
        };
        let username = value_of(model, &username_field());
        let password = value_of(model, &password_field());

        if username == "tomsmith" && password == "SuperSecretPassword!" {
            model.url = format!("{BASE_URL}/secure");
            model.remove(&Locator::id("login"));
            model.insert(
                &flash(),
                SimElement::new("div").with_text("You logged into a secure area!"),
            );
            model.insert(
                &Locator::css("a[href='/logout']"),
                SimElement::new("a").with_text("Logout"),
            );
            model.insert(
                &Locator::tag("h2"),
                SimElement::new("h2").with_text("Secure Area"),
            );
        } else if username.is_empty() {
            model.insert(
                &flash(),
                SimElement::new("div").with_text("Your username is invalid!"),
            );
        } else {
            let message = if username == "tomsmith" {
                "Your password is invalid!"
            } else {
                "Your username is invalid!"
            };
            model.insert(&flash(), SimElement::new("div").with_text(message));
        }
    });
    session
}

fn fast_proxy(session: SimulatedSession) -> Proxy<SimulatedSession> {
    Proxy::new(session).with_policy(WaitPolicy::new().with_timeout(500).with_poll_interval(10))
}

#[test]
fn test_valid_login_reaches_secure_area() {
    init_tracing();
    let proxy = fast_proxy(login_site());
    let login = LoginPage::new(&proxy, BASE_URL);
    let users = UserProfiles::builtin();

    login.open().unwrap();
    login.login(users.get("valid_user").unwrap()).unwrap();

    assert!(login.is_login_successful());
    assert_eq!(proxy.current_url().unwrap(), format!("{BASE_URL}/secure"));

    let secure = SecureAreaPage::new(&proxy);
    assert!(secure.is_success_message_displayed());
    assert!(secure.is_logout_displayed());
    assert_eq!(secure.heading_text().unwrap(), "Secure Area");
}

#[test]
fn test_invalid_credentials_show_error_and_keep_form() {
    init_tracing();
    let proxy = fast_proxy(login_site());
    let login = LoginPage::new(&proxy, BASE_URL);
    let users = UserProfiles::builtin();

    login.open().unwrap();
    login.login(users.get("invalid_user").unwrap()).unwrap();

    assert!(!login.is_login_successful());
    assert!(login.is_invalid_credentials_displayed());
    assert!(login
        .error_message()
        .unwrap()
        .contains("Your username is invalid!"));
    assert!(login.is_login_form_displayed());
}

#[test]
fn test_wrong_password_flashes_password_error() {
    init_tracing();
    let proxy = fast_proxy(login_site());
    let login = LoginPage::new(&proxy, BASE_URL);

    login.open().unwrap();
    login
        .login(&Credentials::new("tomsmith", "not-the-password"))
        .unwrap();

    assert!(login
        .flash_text()
        .unwrap()
        .contains("Your password is invalid!"));
    assert!(login.is_login_form_displayed());
}

#[test]
fn test_empty_submit_stays_on_form_without_success() {
    init_tracing();
    let proxy = fast_proxy(login_site());
    let login = LoginPage::new(&proxy, BASE_URL);

    login.open().unwrap();
    assert!(login.is_username_field_empty().unwrap());
    assert!(login.is_password_field_empty().unwrap());

    proxy.click_when_ready(&submit_button()).unwrap();

    assert!(!login.is_login_successful());
    assert!(login.is_login_form_displayed());
}

#[test]
fn test_missing_element_times_out_with_evidence() {
    init_tracing();
    let sink = Rc::new(RefCell::new(MemorySink::new()));
    let proxy = fast_proxy(login_site()).with_sink(Box::new(Rc::clone(&sink)));
    let login = LoginPage::new(&proxy, BASE_URL);

    login.open().unwrap();
    // No flash exists before any submit, so reading it must time out.
    let err = login.flash_text().unwrap_err();
    assert!(matches!(err, EnsayoError::NotFoundWithinTimeout { .. }));

    let sink = sink.borrow();
    assert!(sink.attachments().iter().any(|a| a.kind == MediaKind::Png));
    assert!(sink.attachments().iter().any(|a| a.kind == MediaKind::Html));
}

#[test]
fn test_session_released_when_scenario_panics() {
    init_tracing();
    let session = login_site();
    let closed = session.closed_handle();
    let proxy = fast_proxy(session);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        let login = LoginPage::new(&proxy, BASE_URL);
        login.open().unwrap();
        assert!(login.is_login_successful(), "login should have succeeded");
    }));

    assert!(outcome.is_err());
    assert!(closed.get());
}

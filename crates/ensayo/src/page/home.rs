//! Home page: the example index and its navigation links.

use crate::locator::Locator;
use crate::proxy::Proxy;
use crate::result::EnsayoResult;
use crate::session::Session;

/// The site index page listing every example.
#[derive(Debug)]
pub struct HomePage<'a, S: Session> {
    proxy: &'a Proxy<S>,
    base_url: String,
}

impl<'a, S: Session> HomePage<'a, S> {
    /// Example links checked by the smoke suite, as href paths.
    pub const EXAMPLE_LINKS: [&'static str; 10] = [
        "/abtest",
        "/add_remove_elements/",
        "/basic_auth",
        "/broken_images",
        "/challenging_dom",
        "/checkboxes",
        "/context_menu",
        "/digest_auth",
        "/disappearing_elements",
        "/drag_and_drop",
    ];

    /// Create the page around a proxy.
    pub fn new(proxy: &'a Proxy<S>, base_url: impl Into<String>) -> Self {
        Self {
            proxy,
            base_url: base_url.into(),
        }
    }

    fn heading() -> Locator {
        Locator::tag("h1")
    }

    fn link(href: &str) -> Locator {
        Locator::attribute("href", href)
    }

    /// Navigate to the index page.
    ///
    /// # Errors
    ///
    /// Propagates navigation failures.
    pub fn open(&self) -> EnsayoResult<()> {
        self.proxy.navigate(&self.base_url)
    }

    /// Page heading text.
    ///
    /// # Errors
    ///
    /// Times out when the heading never appears.
    pub fn heading_text(&self) -> EnsayoResult<String> {
        self.proxy.read_text(&Self::heading())
    }

    /// Whether the link for the given href path is visible.
    pub fn is_link_visible(&self, href: &str) -> bool {
        self.proxy.is_visible(&Self::link(href))
    }

    /// The subset of [`Self::EXAMPLE_LINKS`] currently visible.
    pub fn visible_links(&self) -> Vec<&'static str> {
        Self::EXAMPLE_LINKS
            .iter()
            .copied()
            .filter(|href| self.is_link_visible(href))
            .collect()
    }

    /// Whether every example link is visible.
    pub fn all_links_visible(&self) -> bool {
        self.visible_links().len() == Self::EXAMPLE_LINKS.len()
    }

    /// Click through to an example page.
    ///
    /// # Errors
    ///
    /// Times out when the link never becomes clickable.
    pub fn open_example(&self, href: &str) -> EnsayoResult<()> {
        self.proxy.click_when_ready(&Self::link(href))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SimElement, SimulatedSession};
    use crate::wait::WaitPolicy;

    fn home_session() -> SimulatedSession {
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
        Proxy::new(session).with_policy(WaitPolicy::new().with_timeout(300).with_poll_interval(10))
    }

    #[test]
    fn test_all_links_visible() {
        let proxy = fast_proxy(home_session());
        let page = HomePage::new(&proxy, "https://example.com");
        assert!(page.all_links_visible());
        assert_eq!(page.visible_links().len(), 10);
    }

    #[test]
    fn test_missing_link_reported() {
        let mut session = home_session();
        session
            .model_mut()
            .remove(&Locator::attribute("href", "/checkboxes"));
        let proxy = fast_proxy(session);
        let page = HomePage::new(&proxy, "https://example.com");

        assert!(!page.is_link_visible("/checkboxes"));
        assert!(!page.all_links_visible());
        assert_eq!(page.visible_links().len(), 9);
    }

    #[test]
    fn test_open_example_clicks_link() {
        let proxy = fast_proxy(home_session());
        let page = HomePage::new(&proxy, "https://example.com");
        page.open_example("/abtest").unwrap();
        assert!(proxy.session().was_called("click:attr[href=/abtest]"));
    }

    #[test]
    fn test_heading() {
        let proxy = fast_proxy(home_session());
        let page = HomePage::new(&proxy, "https://example.com");
        assert_eq!(page.heading_text().unwrap(), "Welcome to the-internet");
    }
}

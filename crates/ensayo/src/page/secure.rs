//! Secure area page, reached after a successful login.

use crate::locator::Locator;
use crate::proxy::Proxy;
use crate::result::EnsayoResult;
use crate::session::Session;

/// The `/secure` page behind the login form.
#[derive(Debug)]
pub struct SecureAreaPage<'a, S: Session> {
    proxy: &'a Proxy<S>,
}

impl<'a, S: Session> SecureAreaPage<'a, S> {
    /// Path below the base URL.
    pub const PATH: &'static str = "/secure";

    /// Flash text shown after a successful login.
    pub const SUCCESS_MESSAGE: &'static str = "You logged into a secure area!";
    /// Flash text shown after logging out.
    pub const LOGOUT_MESSAGE: &'static str = "You logged out of the secure area!";

    /// Create the page around a proxy.
    pub fn new(proxy: &'a Proxy<S>) -> Self {
        Self { proxy }
    }

    fn flash() -> Locator {
        Locator::id("flash")
    }

    fn logout_button() -> Locator {
        Locator::css("a[href='/logout']")
    }

    fn heading() -> Locator {
        Locator::tag("h2")
    }

    /// Current flash message text.
    ///
    /// # Errors
    ///
    /// Times out when no flash message appears.
    pub fn flash_text(&self) -> EnsayoResult<String> {
        self.proxy.read_text(&Self::flash())
    }

    /// Page heading text.
    ///
    /// # Errors
    ///
    /// Times out when the heading never appears.
    pub fn heading_text(&self) -> EnsayoResult<String> {
        self.proxy.read_text(&Self::heading())
    }

    /// Whether the successful-login flash is showing.
    pub fn is_success_message_displayed(&self) -> bool {
        self.proxy.is_visible(&Self::flash())
            && self
                .flash_text()
                .is_ok_and(|text| text.contains(Self::SUCCESS_MESSAGE))
    }

    /// Whether the logout button is on screen, i.e. the session is inside
    /// the secure area.
    pub fn is_logout_displayed(&self) -> bool {
        self.proxy.is_visible(&Self::logout_button())
    }

    /// Click the logout button.
    ///
    /// # Errors
    ///
    /// Times out when the button never becomes clickable.
    pub fn logout(&self) -> EnsayoResult<()> {
        tracing::info!("logging out of secure area");
        self.proxy.click_when_ready(&Self::logout_button())
    }
}

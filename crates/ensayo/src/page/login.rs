//! Login page: form interaction and outcome queries.

use crate::fixture::Credentials;
use crate::locator::Locator;
use crate::proxy::Proxy;
use crate::result::EnsayoResult;
use crate::session::Session;

/// The `/login` form page.
#[derive(Debug)]
pub struct LoginPage<'a, S: Session> {
    proxy: &'a Proxy<S>,
    base_url: String,
}

impl<'a, S: Session> LoginPage<'a, S> {
    /// Path below the base URL.
    pub const PATH: &'static str = "/login";

    /// Flash text shown after a successful login.
    pub const SUCCESS_MESSAGE: &'static str = "You logged into a secure area!";
    /// Flash text shown for an unknown username.
    pub const INVALID_USERNAME_MESSAGE: &'static str = "Your username is invalid!";
    /// Flash text shown for a wrong password.
    pub const INVALID_PASSWORD_MESSAGE: &'static str = "Your password is invalid!";

    /// Create the page around a proxy.
    pub fn new(proxy: &'a Proxy<S>, base_url: impl Into<String>) -> Self {
        Self {
            proxy,
            base_url: base_url.into(),
        }
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

    fn login_form() -> Locator {
        Locator::id("login")
    }

    fn heading() -> Locator {
        Locator::tag("h2")
    }

    /// Navigate to the login page and wait for the form to be on screen.
    ///
    /// # Errors
    ///
    /// Propagates navigation failures; times out when the form never
    /// appears.
    pub fn open(&self) -> EnsayoResult<()> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), Self::PATH);
        self.proxy.navigate(&url)?;
        let _ = self.proxy.locate(&Self::login_form())?;
        Ok(())
    }

    /// Fill both fields (clearing prior contents) and submit the form.
    ///
    /// # Errors
    ///
    /// Propagates timeouts on the form fields or the submit button.
    pub fn login(&self, credentials: &Credentials) -> EnsayoResult<()> {
        tracing::info!(username = %credentials.username, "submitting login form");
        self.proxy
            .set_text(&Self::username_field(), &credentials.username, true)?;
        self.proxy
            .set_text(&Self::password_field(), &credentials.password, true)?;
        self.proxy.click_when_ready(&Self::submit_button())
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

    /// Error flash text after a rejected login. Same element as
    /// [`Self::flash_text`], named for call sites asserting failures.
    ///
    /// # Errors
    ///
    /// Times out when no flash message appears.
    pub fn error_message(&self) -> EnsayoResult<String> {
        self.flash_text()
    }

    /// Whether the success flash is showing.
    pub fn is_login_successful(&self) -> bool {
        self.proxy.is_visible(&Self::flash())
            && self
                .flash_text()
                .is_ok_and(|text| text.contains(Self::SUCCESS_MESSAGE))
    }

    /// Whether an invalid-credentials flash is showing.
    pub fn is_invalid_credentials_displayed(&self) -> bool {
        self.proxy.is_visible(&Self::flash())
            && self.flash_text().is_ok_and(|text| {
                text.contains(Self::INVALID_USERNAME_MESSAGE)
                    || text.contains(Self::INVALID_PASSWORD_MESSAGE)
            })
    }

    /// Whether the login form is still on screen.
    pub fn is_login_form_displayed(&self) -> bool {
        self.proxy.is_visible(&Self::login_form())
    }

    /// Whether any flash message is showing at all.
    pub fn is_flash_displayed(&self) -> bool {
        self.proxy.is_visible(&Self::flash())
    }

    /// Whether the username field holds no value.
    ///
    /// # Errors
    ///
    /// Times out when the field never appears.
    pub fn is_username_field_empty(&self) -> EnsayoResult<bool> {
        let value = self
            .proxy
            .read_attribute(&Self::username_field(), "value")?;
        Ok(value.as_deref().unwrap_or_default().is_empty())
    }

    /// Whether the password field holds no value.
    ///
    /// # Errors
    ///
    /// Times out when the field never appears.
    pub fn is_password_field_empty(&self) -> EnsayoResult<bool> {
        let value = self
            .proxy
            .read_attribute(&Self::password_field(), "value")?;
        Ok(value.as_deref().unwrap_or_default().is_empty())
    }
}

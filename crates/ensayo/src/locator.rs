//! Element references: declarative descriptions of where a UI element lives.
//!
//! A [`Locator`] pairs a selection strategy with a selector string and never
//! changes after construction. Pages define their locators once; the proxy in
//! [`crate::proxy`] turns them into bounded-wait browser operations.
//!
//! Locators also render the JavaScript snippets a CDP-backed session needs,
//! so a session that only exposes script execution can serve every operation.

use std::fmt;

/// Selection strategy for locating an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Match by element id attribute
    Id(String),
    /// CSS selector (e.g. `button[type='submit']`)
    Css(String),
    /// XPath expression
    XPath(String),
    /// Match the first element whose text content contains the string
    Text(String),
    /// Match the first element with the given tag name
    Tag(String),
    /// Match by an arbitrary attribute name/value pair
    Attribute {
        /// Attribute name
        name: String,
        /// Expected attribute value
        value: String,
    },
}

/// A declarative element reference. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
}

impl Locator {
    /// Locate by element id.
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            selector: Selector::Id(id.into()),
        }
    }

    /// Locate by CSS selector.
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: Selector::Css(selector.into()),
        }
    }

    /// Locate by XPath expression.
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self {
            selector: Selector::XPath(expr.into()),
        }
    }

    /// Locate the first element whose text content contains `text`.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            selector: Selector::Text(text.into()),
        }
    }

    /// Locate the first element with the given tag name.
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            selector: Selector::Tag(tag.into()),
        }
    }

    /// Locate by attribute name/value match.
    #[must_use]
    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            selector: Selector::Attribute {
                name: name.into(),
                value: value.into(),
            },
        }
    }

    /// The selection strategy.
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// JavaScript expression evaluating to the matched element or `null`.
    #[must_use]
    pub fn lookup_js(&self) -> String {
        match &self.selector {
            Selector::Id(id) => format!("document.getElementById({id:?})"),
            Selector::Css(css) => format!("document.querySelector({css:?})"),
            Selector::XPath(expr) => format!(
                "document.evaluate({expr:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
            ),
            Selector::Text(text) => format!(
                "Array.from(document.querySelectorAll('*')).find(el => el.textContent.includes({text:?})) || null"
            ),
            Selector::Tag(tag) => format!("document.getElementsByTagName({tag:?})[0] || null"),
            Selector::Attribute { name, value } => {
                format!("document.querySelector('[' + {name:?} + '=' + JSON.stringify({value:?}) + ']')")
            }
        }
    }

    /// JSON probe: `{{found, tag, text, visible}}` for the matched element.
    #[must_use]
    pub fn probe_js(&self) -> String {
        format!(
            "(() => {{ const el = {lookup}; if (!el) return {{ found: false }}; \
             const r = el.getBoundingClientRect(); \
             const visible = r.width > 0 && r.height > 0 && getComputedStyle(el).visibility !== 'hidden'; \
             return {{ found: true, tag: el.tagName.toLowerCase(), text: el.textContent, visible }}; }})()",
            lookup = self.lookup_js()
        )
    }

    /// Boolean probe: element exists and is visible.
    #[must_use]
    pub fn visibility_js(&self) -> String {
        format!(
            "(() => {{ const el = {lookup}; if (!el) return false; \
             const r = el.getBoundingClientRect(); \
             return r.width > 0 && r.height > 0 && getComputedStyle(el).visibility !== 'hidden'; }})()",
            lookup = self.lookup_js()
        )
    }

    /// Boolean probe: element is visible and not disabled.
    #[must_use]
    pub fn clickable_js(&self) -> String {
        format!(
            "(() => {{ const el = {lookup}; if (!el || el.disabled) return false; \
             const r = el.getBoundingClientRect(); \
             return r.width > 0 && r.height > 0 && getComputedStyle(el).pointerEvents !== 'none'; }})()",
            lookup = self.lookup_js()
        )
    }

    /// String-or-null probe: trimmed text content.
    #[must_use]
    pub fn text_js(&self) -> String {
        format!(
            "(() => {{ const el = {lookup}; return el ? el.textContent.trim() : null; }})()",
            lookup = self.lookup_js()
        )
    }

    /// String-or-null probe: attribute value, with `value` falling back to the
    /// live property so freshly typed input is observable.
    #[must_use]
    pub fn attribute_js(&self, name: &str) -> String {
        format!(
            "(() => {{ const el = {lookup}; if (!el) return null; \
             if ({name:?} === 'value' && 'value' in el) return el.value; \
             return el.getAttribute({name:?}); }})()",
            lookup = self.lookup_js()
        )
    }

    /// Click action script.
    #[must_use]
    pub fn click_js(&self) -> String {
        format!(
            "(() => {{ const el = {lookup}; if (!el) return false; el.click(); return true; }})()",
            lookup = self.lookup_js()
        )
    }

    /// Set-value action script: optionally clears, then types, then fires
    /// `input` and `change` events.
    #[must_use]
    pub fn set_value_js(&self, text: &str, clear_first: bool) -> String {
        let assign = if clear_first {
            format!("el.value = {text:?};")
        } else {
            format!("el.value = el.value + {text:?};")
        };
        format!(
            "(() => {{ const el = {lookup}; if (!el) return false; {assign} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            lookup = self.lookup_js()
        )
    }

    /// Select a `<select>` option by its visible text.
    #[must_use]
    pub fn select_by_text_js(&self, option_text: &str) -> String {
        format!(
            "(() => {{ const el = {lookup}; if (!el || !el.options) return false; \
             const idx = Array.from(el.options).findIndex(o => o.textContent.trim() === {option_text:?}); \
             if (idx < 0) return false; el.selectedIndex = idx; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            lookup = self.lookup_js()
        )
    }

    /// Select a `<select>` option by index.
    #[must_use]
    pub fn select_by_index_js(&self, index: usize) -> String {
        format!(
            "(() => {{ const el = {lookup}; if (!el || !el.options || el.options.length <= {index}) return false; \
             el.selectedIndex = {index}; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            lookup = self.lookup_js()
        )
    }

    /// Scroll the matched element into view.
    #[must_use]
    pub fn scroll_js(&self) -> String {
        format!(
            "(() => {{ const el = {lookup}; if (el) el.scrollIntoView(); return !!el; }})()",
            lookup = self.lookup_js()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Selector::Id(id) => write!(f, "id={id}"),
            Selector::Css(css) => write!(f, "css={css}"),
            Selector::XPath(expr) => write!(f, "xpath={expr}"),
            Selector::Text(text) => write!(f, "text={text}"),
            Selector::Tag(tag) => write!(f, "tag={tag}"),
            Selector::Attribute { name, value } => write!(f, "attr[{name}={value}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_id_lookup() {
            let js = Locator::id("username").lookup_js();
            assert!(js.contains("getElementById"));
            assert!(js.contains("username"));
        }

        #[test]
        fn test_css_lookup() {
            let js = Locator::css("button[type='submit']").lookup_js();
            assert!(js.contains("querySelector"));
        }

        #[test]
        fn test_xpath_lookup() {
            let js = Locator::xpath("//a[@href='/login']").lookup_js();
            assert!(js.contains("document.evaluate"));
            assert!(js.contains("XPathResult"));
        }

        #[test]
        fn test_text_lookup() {
            let js = Locator::text("Login Page").lookup_js();
            assert!(js.contains("textContent.includes"));
        }

        #[test]
        fn test_attribute_lookup() {
            let js = Locator::attribute("href", "/abtest").lookup_js();
            assert!(js.contains("href"));
            assert!(js.contains("/abtest"));
        }
    }

    mod probe_tests {
        use super::*;

        #[test]
        fn test_probe_reports_visibility() {
            let js = Locator::id("flash").probe_js();
            assert!(js.contains("getBoundingClientRect"));
            assert!(js.contains("found"));
        }

        #[test]
        fn test_clickable_checks_disabled() {
            let js = Locator::css("button").clickable_js();
            assert!(js.contains("el.disabled"));
        }

        #[test]
        fn test_attribute_value_falls_back_to_property() {
            let js = Locator::id("username").attribute_js("value");
            assert!(js.contains("el.value"));
        }

        #[test]
        fn test_set_value_clear_first() {
            let js = Locator::id("username").set_value_js("tomsmith", true);
            assert!(js.contains("el.value = \"tomsmith\""));
            assert!(js.contains("dispatchEvent"));
        }

        #[test]
        fn test_set_value_append() {
            let js = Locator::id("username").set_value_js("x", false);
            assert!(js.contains("el.value + \"x\""));
        }

        #[test]
        fn test_select_by_index_bounds_checked() {
            let js = Locator::id("dropdown").select_by_index_js(2);
            assert!(js.contains("el.options.length <= 2"));
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_display_forms() {
            assert_eq!(Locator::id("username").to_string(), "id=username");
            assert_eq!(Locator::css("#flash").to_string(), "css=#flash");
            assert_eq!(Locator::tag("h2").to_string(), "tag=h2");
            assert_eq!(
                Locator::attribute("href", "/checkboxes").to_string(),
                "attr[href=/checkboxes]"
            );
        }
    }
}

//! WebDriver-backed implementation of the renderable-page capability.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use thirtyfour::prelude::*;
use tracing::{debug, info};

use super::config::BrowserConfig;
use super::page::{Locator, NavigationError, PageElement, RenderablePage, TransientReadError};

const READY_STATE_TIMEOUT: Duration = Duration::from_secs(30);
const READY_STATE_POLL: Duration = Duration::from_millis(250);

fn to_by(locator: &Locator) -> By {
    match locator {
        Locator::Css(selector) => By::Css(selector.as_str()),
        Locator::XPath(expression) => By::XPath(expression.as_str()),
    }
}

/// A live WebDriver session presented as a [`RenderablePage`].
pub struct WebDriverPage {
    driver: WebDriver,
}

impl WebDriverPage {
    /// Connect to a running WebDriver endpoint and open a fresh session.
    pub async fn connect(config: &BrowserConfig) -> Result<Self, NavigationError> {
        let mut caps = DesiredCapabilities::chrome();

        let mut args: Vec<String> = config.chrome_args.clone();
        if config.headless {
            args.push("--headless=new".to_string());
        }
        args.push(format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ));
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        caps.add_chrome_option("args", arg_refs)
            .map_err(|e| NavigationError::action("configure browser capabilities", e))?;

        let driver = WebDriver::new(&config.webdriver_url, caps)
            .await
            .map_err(|e| {
                NavigationError::action(
                    format!("connect to WebDriver at {}", config.webdriver_url),
                    e,
                )
            })?;

        info!("browser session established via {}", config.webdriver_url);
        Ok(Self { driver })
    }
}

#[async_trait]
impl RenderablePage for WebDriverPage {
    async fn goto(&self, url: &str) -> Result<(), NavigationError> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| NavigationError::action(format!("navigate to {url}"), e))
    }

    async fn wait_for_load(&self) -> Result<(), NavigationError> {
        let start = Instant::now();
        loop {
            let state = self
                .driver
                .execute("return document.readyState", Vec::new())
                .await
                .map_err(|e| NavigationError::ScriptFailed {
                    reason: e.to_string(),
                })?;
            if state.json().as_str() == Some("complete") {
                return Ok(());
            }
            if start.elapsed() >= READY_STATE_TIMEOUT {
                return Err(NavigationError::Timeout {
                    what: "document load".to_string(),
                    waited_ms: READY_STATE_TIMEOUT.as_millis() as u64,
                });
            }
            tokio::time::sleep(READY_STATE_POLL).await;
        }
    }

    async fn locate(&self, locator: &Locator) -> Result<Vec<Box<dyn PageElement>>, NavigationError> {
        let elements = self
            .driver
            .find_all(to_by(locator))
            .await
            .map_err(|e| NavigationError::action(format!("locate {locator}"), e))?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(WebDriverElement { element }) as Box<dyn PageElement>)
            .collect())
    }

    async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value, NavigationError> {
        let ret = self
            .driver
            .execute(script, Vec::new())
            .await
            .map_err(|e| NavigationError::ScriptFailed {
                reason: e.to_string(),
            })?;
        Ok(ret.json().clone())
    }

    async fn wait(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn close(&self) -> Result<(), NavigationError> {
        debug!("closing browser session");
        self.driver
            .clone()
            .quit()
            .await
            .map_err(|e| NavigationError::action("close browser session", e))
    }
}

struct WebDriverElement {
    element: WebElement,
}

#[async_trait]
impl PageElement for WebDriverElement {
    async fn text(&self) -> Result<String, TransientReadError> {
        self.element
            .text()
            .await
            .map_err(|e| TransientReadError(e.to_string()))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, TransientReadError> {
        self.element
            .attr(name)
            .await
            .map_err(|e| TransientReadError(e.to_string()))
    }

    async fn inner_html(&self) -> Result<String, TransientReadError> {
        self.element
            .inner_html()
            .await
            .map_err(|e| TransientReadError(e.to_string()))
    }

    async fn locate(&self, locator: &Locator) -> Result<Vec<Box<dyn PageElement>>, TransientReadError> {
        let elements = self
            .element
            .find_all(to_by(locator))
            .await
            .map_err(|e| TransientReadError(e.to_string()))?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(WebDriverElement { element }) as Box<dyn PageElement>)
            .collect())
    }

    async fn click(&self) -> Result<(), NavigationError> {
        self.element
            .click()
            .await
            .map_err(|e| NavigationError::action("click element", e))
    }

    async fn wait_visible(&self, timeout: Duration) -> Result<(), NavigationError> {
        self.element
            .wait_until()
            .wait(timeout, READY_STATE_POLL)
            .displayed()
            .await
            .map_err(|e| NavigationError::Timeout {
                what: format!("element visibility ({e})"),
                waited_ms: timeout.as_millis() as u64,
            })
    }
}

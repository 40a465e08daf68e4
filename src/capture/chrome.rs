use anyhow::{Result, anyhow};
use headless_chrome::protocol::cdp::Network::GetResponseBodyReturnObject;
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::{Browser as ChromeBrowser, LaunchOptions as ChromeLaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capture::browser::{
    Browser, BrowsingContext, LaunchOptions, RequestInfo, ResponseBody, ResponseInfo,
};
use crate::capture::recorder::{EventRecorder, header_map};
use crate::models::errors::NavigationError;

const RESPONSE_HANDLER: &str = "etherseek-capture";

/// Chromium over the DevTools protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

pub struct ChromeContext {
    // Kept alive for the lifetime of the tab; dropping it kills the process
    _browser: ChromeBrowser,
    tab: Arc<Tab>,
}

impl Browser for ChromeLauncher {
    type Context = ChromeContext;

    fn launch(&self, options: &LaunchOptions, recorder: EventRecorder) -> Result<ChromeContext> {
        let args: Vec<&OsStr> = options.startup_flags.iter().map(OsStr::new).collect();
        let launch_options = ChromeLaunchOptions::default_builder()
            .headless(options.headless)
            .user_data_dir(Some(options.profile_dir.clone()))
            .args(args)
            // Idle time between pages can exceed a single page load
            .idle_browser_timeout(options.page_timeout * 4)
            .build()
            .map_err(|e| anyhow!("invalid browser launch options: {}", e))?;

        let browser = ChromeBrowser::new(launch_options)?;
        let tab = browser.new_tab()?;
        tab.set_default_timeout(options.page_timeout);

        let request_recorder = recorder.clone();
        tab.add_event_listener(Arc::new(move |event: &Event| {
            if let Event::NetworkRequestWillBeSent(sent) = event {
                let request = &sent.params.request;
                request_recorder.record_request(RequestInfo {
                    request_id: sent.params.request_id.clone(),
                    method: request.method.clone(),
                    url: request.url.clone(),
                    headers: header_map(serde_json::to_value(&request.headers).unwrap_or_default()),
                    body: request.post_data.clone(),
                });
            }
        }))?;

        let response_recorder = recorder;
        tab.register_response_handling(
            RESPONSE_HANDLER,
            Box::new(
                move |params: ResponseReceivedEventParams,
                      fetch_body: &dyn Fn() -> Result<GetResponseBodyReturnObject>| {
                    let body = match fetch_body() {
                        Ok(body) if !body.base_64_encoded => ResponseBody::Text(body.body),
                        Ok(_) => ResponseBody::Unavailable,
                        Err(e) => {
                            debug!("Body unavailable for {}: {}", params.response.url, e);
                            ResponseBody::Unavailable
                        }
                    };

                    response_recorder.record_response(ResponseInfo {
                        request_id: params.request_id.clone(),
                        status: u16::try_from(params.response.status).unwrap_or_default(),
                        url: params.response.url.clone(),
                        headers: header_map(
                            serde_json::to_value(&params.response.headers).unwrap_or_default(),
                        ),
                        body,
                        request_method: None,
                    });
                },
            ),
        )?;

        Ok(ChromeContext {
            _browser: browser,
            tab,
        })
    }
}

impl BrowsingContext for ChromeContext {
    fn navigate(&mut self, url: &str) -> Result<(), NavigationError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| {
                let reason = e.to_string();
                if reason.to_lowercase().contains("timeout") || reason.contains("timed out") {
                    NavigationError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    NavigationError::Failed {
                        url: url.to_string(),
                        reason,
                    }
                }
            })
    }

    fn close(self) -> Result<()> {
        if let Err(e) = self.tab.close(true) {
            warn!("Tab did not close cleanly: {}", e);
        }
        Ok(())
    }
}

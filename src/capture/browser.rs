//! Seam between the capture session and the browser engine driving it.
//!
//! A [`Browser`] launches one isolated, persistent browsing context per session.
//! The context reports every outbound request and inbound response to the
//! [`EventRecorder`] it was launched with, from whatever thread the engine
//! delivers events on.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::recorder::EventRecorder;
use crate::models::errors::NavigationError;

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub startup_flags: Vec<String>,
    pub page_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    pub request_id: String,
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    // Binary payloads or bodies the engine could not hand over
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    pub request_id: String,
    pub status: u16,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
    // Engines that do not report it get it filled from the matching request
    pub request_method: Option<String>,
}

pub trait Browser: Send + Sync + 'static {
    type Context: BrowsingContext;

    fn launch(&self, options: &LaunchOptions, recorder: EventRecorder) -> Result<Self::Context>;
}

pub trait BrowsingContext {
    /// Load `url` in the session's single page. Returns once the load settles.
    fn navigate(&mut self, url: &str) -> Result<(), NavigationError>;

    fn close(self) -> Result<()>;
}

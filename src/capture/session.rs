use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::capture::browser::{Browser, BrowsingContext, LaunchOptions};
use crate::capture::profile::ProfileDir;
use crate::capture::recorder::EventRecorder;
use crate::metrics::Metrics;
use crate::models::common::Config;
use crate::models::datasets::captures::{CaptureMap, group_events};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub profiles_root: PathBuf,
    pub headless: bool,
    pub startup_flags: Vec<String>,
    pub page_timeout: Duration,
    pub verbose: bool,
}

impl SessionSettings {
    pub fn from_config(config: &Config, verbose: bool) -> Self {
        Self {
            profiles_root: PathBuf::from(&config.temp_profiles_path),
            headless: config.headless,
            startup_flags: config.chromium_flags.clone(),
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            verbose,
        }
    }
}

/// Visit `urls` one after another in a single isolated browser identity.
///
/// A page that fails to load is logged and skipped. The browser context is
/// closed and the profile directory removed before returning, whatever happened.
pub fn run_session<B: Browser>(
    browser: &B,
    urls: &[String],
    settings: &SessionSettings,
    metrics: Option<&Metrics>,
) -> Result<CaptureMap> {
    let profile = ProfileDir::create(&settings.profiles_root)?;
    let recorder = EventRecorder::new(settings.verbose);

    let options = LaunchOptions {
        profile_dir: profile.path().to_path_buf(),
        headless: settings.headless,
        startup_flags: settings.startup_flags.clone(),
        page_timeout: settings.page_timeout,
    };
    let mut context = browser
        .launch(&options, recorder.clone())
        .context("failed to launch browser context")?;

    for url in urls {
        recorder.begin_page(url);

        match context.navigate(url) {
            Ok(()) => {
                info!("Loaded {}", url);
                if let Some(metrics) = metrics {
                    metrics
                        .pages_visited
                        .add(1, &[KeyValue::new("outcome", "loaded")]);
                }
            }
            Err(e) => {
                warn!("Error when loading {}: {}", url, e);
                if let Some(metrics) = metrics {
                    metrics
                        .pages_visited
                        .add(1, &[KeyValue::new("outcome", "failed")]);
                }
            }
        }
    }

    if let Err(e) = context.close() {
        warn!("Failed to close browser context cleanly: {}", e);
    }

    let captures = group_events(recorder.take_log());
    if let Some(metrics) = metrics {
        metrics.events_captured.add(captures.event_count() as u64, &[]);
    }
    info!(
        "Session finished: {} URLs, {} pages with traffic, {} events",
        urls.len(),
        captures.page_count(),
        captures.event_count()
    );

    drop(profile);
    Ok(captures)
}

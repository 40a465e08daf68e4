pub mod browser;
pub mod chrome;
pub mod domain;
pub mod profile;
pub mod recorder;
pub mod session;

pub use browser::{Browser, BrowsingContext, LaunchOptions, RequestInfo, ResponseBody, ResponseInfo};
pub use recorder::EventRecorder;
pub use session::{SessionSettings, run_session};

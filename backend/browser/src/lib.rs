pub mod cdp_client;
pub mod element_query;
pub mod launcher;
pub mod network_monitor;
pub mod page_control;
pub mod session;

pub use cdp_client::{CdpClient, CdpError, CdpEvent};
pub use element_query::ElementQuery;
pub use launcher::{BrowserLauncher, BrowserProcess, LaunchOptions};
pub use network_monitor::NetworkMonitor;
pub use page_control::PageControl;
pub use session::ChromeSession;

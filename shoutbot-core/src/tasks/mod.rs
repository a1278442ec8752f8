// Background loops. Each one stops when its cancellation token fires.

pub mod auto_shoutout;
pub mod live_status;
pub mod token_refresh;

pub use auto_shoutout::AutoShoutoutScheduler;
pub use live_status::LiveStatusMonitor;
pub use token_refresh::{TokenRefreshed, TokenRefresher};

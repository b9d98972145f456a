pub mod db;
pub mod notifications;
pub mod watchlist;

pub use db::WatchlistDb;
pub use notifications::NotificationLogger;
pub use watchlist::WatchlistManager;

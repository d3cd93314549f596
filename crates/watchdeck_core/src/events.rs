pub const EVENT_PROFILES_CHANGED: &str = "profile://changed";
pub const EVENT_WATCHLIST_CHANGED: &str = "watchlist://changed";
pub const EVENT_CONTINUE_WATCHING_CHANGED: &str = "continue-watching://changed";

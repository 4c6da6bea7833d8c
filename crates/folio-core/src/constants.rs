/// Route component constants shared across crates
pub const USERS_ROUTE_COMPONENT: &str = "users";
pub const USERS_ROUTE_PREFIX: &str = const_str::concat!("/", USERS_ROUTE_COMPONENT);

pub const ARTICLES_ROUTE_COMPONENT: &str = "articles";
pub const ARTICLES_ROUTE_PREFIX: &str = const_str::concat!("/", ARTICLES_ROUTE_COMPONENT);

pub const LOGIN_ROUTE_COMPONENT: &str = "login";
pub const LOGOUT_ROUTE_COMPONENT: &str = "logout";
pub const WHOAMI_ROUTE_COMPONENT: &str = "whoami";

pub const CURSOR_ROUTE_COMPONENT: &str = "cursor/list";
pub const STATS_ROUTE_COMPONENT: &str = "stats/summary";

/// Document collection names
pub const USERS_COLLECTION: &str = "users";
pub const ARTICLES_COLLECTION: &str = "articles";

/// Session defaults: one hour, sliding.
pub const DEFAULT_SESSION_COOKIE: &str = "folio.sid";
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 3600;

//! Platform constants

/// Resource that exchanges an authorization code for an access token
pub const TOKEN_EXCHANGE_PATH: &str = "/users/current/applications/current/access-tokens";

/// Posted form field carrying the signed context
pub const CONTEXT_FIELD: &str = "tuenti_context";

/// Storage key (before client scoping) of the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Env var holding the client secret
pub const CLIENT_SECRET_ENV: &str = "TUENTI_CLIENT_SECRET";

/// Env var pointing at the config file
pub const CONFIG_PATH_ENV: &str = "TUENTI_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "tuenti.toml";

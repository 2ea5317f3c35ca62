//! Connection details from the environment.
//!
//! Variables are only consulted when no connection is passed in code. The
//! fallback base address is independent of that and is read once when the
//! consumer is built.

use crate::config::schema::ConnectionOptions;
use crate::config::validation::validate_connection;
use crate::error::Result;

pub const ENV_SAILOR_URL: &str = "SAILOR_URL";
pub const ENV_SAILOR_NS: &str = "SAILOR_NS";
pub const ENV_SAILOR_APP: &str = "SAILOR_APP";
pub const ENV_SAILOR_ACCESS_KEY: &str = "SAILOR_ACCESS_KEY";
pub const ENV_SAILOR_SECRET_KEY: &str = "SAILOR_SECRET_KEY";
pub const ENV_SAILOR_SOCKET_TIMEOUT: &str = "SAILOR_SOCKET_TIMEOUT_SECS";
pub const ENV_SAILOR_FALLBACK_BASE_URL: &str = "SAILOR_FALLBACK_BASE_URL";

/// Build connection options from `SAILOR_*` variables.
pub fn connection_from_env() -> Result<ConnectionOptions> {
    connection_from_lookup(|key| std::env::var(key).ok())
}

/// Build connection options from an arbitrary variable lookup.
///
/// Missing fields are reported in the same precedence as
/// [`validate_connection`].
pub fn connection_from_lookup<F>(lookup: F) -> Result<ConnectionOptions>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).unwrap_or_default();

    let conn = ConnectionOptions {
        addr: var(ENV_SAILOR_URL),
        namespace: var(ENV_SAILOR_NS),
        app: var(ENV_SAILOR_APP),
        access_key: var(ENV_SAILOR_ACCESS_KEY),
        secret_key: var(ENV_SAILOR_SECRET_KEY),
        socket_timeout_secs: lookup(ENV_SAILOR_SOCKET_TIMEOUT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
    };

    validate_connection(&conn)?;
    Ok(conn)
}

/// Fallback base address, if one is configured.
pub fn fallback_base_from_env() -> Option<String> {
    std::env::var(ENV_SAILOR_FALLBACK_BASE_URL)
        .ok()
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SailorError;
    use std::collections::HashMap;

    fn lookup_from<'a>(vars: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| vars.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_env_precedence() {
        let mut vars = HashMap::new();
        assert!(matches!(
            connection_from_lookup(lookup_from(&vars)),
            Err(SailorError::MissingAddress)
        ));

        vars.insert(ENV_SAILOR_URL, "http://sailor:7766");
        assert!(matches!(
            connection_from_lookup(lookup_from(&vars)),
            Err(SailorError::MissingNamespace)
        ));

        vars.insert(ENV_SAILOR_NS, "prod");
        assert!(matches!(
            connection_from_lookup(lookup_from(&vars)),
            Err(SailorError::MissingApp)
        ));

        vars.insert(ENV_SAILOR_APP, "billing");
        assert!(matches!(
            connection_from_lookup(lookup_from(&vars)),
            Err(SailorError::MissingAccessKey)
        ));

        vars.insert(ENV_SAILOR_ACCESS_KEY, "ak");
        assert!(matches!(
            connection_from_lookup(lookup_from(&vars)),
            Err(SailorError::MissingSecretKey)
        ));

        vars.insert(ENV_SAILOR_SECRET_KEY, "sk");
        vars.insert(ENV_SAILOR_SOCKET_TIMEOUT, "7");
        let conn = connection_from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(conn.app, "billing");
        assert_eq!(conn.socket_timeout_secs, 7);
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let vars: HashMap<&str, &str> = [(ENV_SAILOR_URL, "")].into_iter().collect();
        assert!(matches!(
            connection_from_lookup(lookup_from(&vars)),
            Err(SailorError::MissingAddress)
        ));
    }
}

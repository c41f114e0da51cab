//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an action, checking the signing secret and
//! bootstrap settings before anything touches the network.

use crate::auth::SigningSecret;
use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let signing_secret =
        SigningSecret::new(auth_opts.token_secret).context("invalid NEWSDESK_TOKEN_SECRET")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        signing_secret,
        token_issuer: auth_opts.token_issuer,
        token_audience: auth_opts.token_audience,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        login_rate_per_minute: auth_opts.login_rate_per_minute,
        login_rate_burst: auth_opts.login_rate_burst,
        trust_proxy_headers: auth_opts.trust_proxy_headers,
        frontend_base_url: auth_opts.frontend_base_url,
        bootstrap: auth_opts.bootstrap,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DSN: &str = "postgres://newsdesk@localhost:5432/newsdesk";
    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn with_env<F: FnOnce()>(vars: [(&str, Option<&str>); 5], f: F) {
        temp_env::with_vars(vars, f);
    }

    fn run(args: &[&str]) -> Result<Action> {
        let matches = crate::cli::commands::new().try_get_matches_from(args)?;
        handler(&matches)
    }

    #[test]
    fn builds_server_action() {
        with_env(
            [
                ("NEWSDESK_DSN", Some(DSN)),
                ("NEWSDESK_TOKEN_SECRET", Some(SECRET)),
                ("NEWSDESK_BOOTSTRAP_ADMIN_USERNAME", None),
                ("NEWSDESK_BOOTSTRAP_ADMIN_EMAIL", None),
                ("NEWSDESK_BOOTSTRAP_ADMIN_PASSWORD", None),
            ],
            || {
                let result = run(&["newsdesk", "--token-ttl-seconds", "120"]);
                let Ok(Action::Server(args)) = result else {
                    panic!("expected server action");
                };
                assert_eq!(args.dsn, DSN);
                assert_eq!(args.token_ttl_seconds, 120);
                assert!(args.bootstrap.is_none());
                // The secret never shows up in debug output.
                assert!(!format!("{args:?}").contains(SECRET));
            },
        );
    }

    #[test]
    fn short_secret_is_rejected() {
        with_env(
            [
                ("NEWSDESK_DSN", Some(DSN)),
                ("NEWSDESK_TOKEN_SECRET", Some("too-short")),
                ("NEWSDESK_BOOTSTRAP_ADMIN_USERNAME", None),
                ("NEWSDESK_BOOTSTRAP_ADMIN_EMAIL", None),
                ("NEWSDESK_BOOTSTRAP_ADMIN_PASSWORD", None),
            ],
            || {
                let result = run(&["newsdesk"]);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("NEWSDESK_TOKEN_SECRET"));
                }
            },
        );
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        with_env(
            [
                ("NEWSDESK_DSN", Some(DSN)),
                ("NEWSDESK_TOKEN_SECRET", Some(SECRET)),
                ("NEWSDESK_BOOTSTRAP_ADMIN_USERNAME", None),
                ("NEWSDESK_BOOTSTRAP_ADMIN_EMAIL", None),
                ("NEWSDESK_BOOTSTRAP_ADMIN_PASSWORD", None),
            ],
            || {
                assert!(run(&["newsdesk", "--token-ttl-seconds", "0"]).is_err());
            },
        );
    }

    #[test]
    fn bootstrap_admin_needs_all_parts() {
        with_env(
            [
                ("NEWSDESK_DSN", Some(DSN)),
                ("NEWSDESK_TOKEN_SECRET", Some(SECRET)),
                ("NEWSDESK_BOOTSTRAP_ADMIN_USERNAME", Some("root")),
                ("NEWSDESK_BOOTSTRAP_ADMIN_EMAIL", Some("root@newsdesk.dev")),
                ("NEWSDESK_BOOTSTRAP_ADMIN_PASSWORD", None),
            ],
            || {
                assert!(run(&["newsdesk"]).is_err());
            },
        );
    }

    #[test]
    fn bootstrap_admin_from_env() {
        with_env(
            [
                ("NEWSDESK_DSN", Some(DSN)),
                ("NEWSDESK_TOKEN_SECRET", Some(SECRET)),
                ("NEWSDESK_BOOTSTRAP_ADMIN_USERNAME", Some("root")),
                ("NEWSDESK_BOOTSTRAP_ADMIN_EMAIL", Some("root@newsdesk.dev")),
                ("NEWSDESK_BOOTSTRAP_ADMIN_PASSWORD", Some("admin-pass-1")),
            ],
            || {
                let Ok(Action::Server(args)) = run(&["newsdesk"]) else {
                    panic!("expected server action");
                };
                assert_eq!(
                    args.bootstrap.map(|admin| admin.username),
                    Some("root".to_string())
                );
            },
        );
    }
}

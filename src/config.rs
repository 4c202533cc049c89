//! Server configuration from command line arguments and environment variables.

use std::path::PathBuf;

use clap::Parser;

/// The web server for HighRidge Forms.
///
/// Every option can also be set with an environment variable, either exported or written to a
/// `.env` file in the working directory.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    pub db_path: String,

    /// The port to serve the app from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The secret the identity provider signs session tokens with.
    #[arg(long, env = "AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: String,

    /// Where to send users that are not signed in.
    #[arg(long, env = "SIGN_IN_URL", default_value = "/sign-in")]
    pub sign_in_url: String,

    /// The canonical timezone to display timestamps in, e.g. "Pacific/Auckland".
    #[arg(long, env = "LOCAL_TIMEZONE", default_value = "Etc/UTC")]
    pub local_timezone: String,

    /// Directory containing an SSL certificate `cert.pem` and key `key.pem`.
    ///
    /// The server uses plain HTTP when this is not set.
    #[arg(long, env = "CERT_PATH")]
    pub cert_path: Option<PathBuf>,
}

impl Config {
    /// Load `.env` if there is one, then parse the command line.
    pub fn load() -> Self {
        if let Err(error) = dotenvy::dotenv()
            && !error.not_found()
        {
            eprintln!("Warning: could not load .env file: {error}");
        }

        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Config;

    #[test]
    fn uses_defaults_for_optional_settings() {
        let config =
            Config::try_parse_from(["server", "--db-path", "forms.db", "--auth-secret", "shh"])
                .unwrap();

        assert_eq!(config.db_path, "forms.db");
        assert_eq!(config.auth_secret, "shh");
        assert_eq!(config.port, 3000);
        assert_eq!(config.sign_in_url, "/sign-in");
        assert_eq!(config.cert_path, None);
    }

    #[test]
    fn auth_secret_is_required() {
        // Only meaningful when the variable is not set in the test environment.
        if std::env::var_os("AUTH_SECRET").is_some() {
            return;
        }

        assert!(Config::try_parse_from(["server", "--db-path", "forms.db"]).is_err());
    }
}

use anyhow::{anyhow, Context, Result};
use std::env;

use crate::payments::providers::vnpay::VnpayConfig;
use crate::payments::providers::zalopay::ZalopayConfig;

/// Process configuration, resolved once at startup and injected by
/// reference. Missing merchant ids or secrets fail here, never later as an
/// unsigned request.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub vnpay: VnpayConfig,
    pub zalopay: ZalopayConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

impl ServerConfig {
    /// Address the listener binds to, `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .context("PORT not set")?
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
        };

        let vnpay = VnpayConfig {
            tmn_code: env::var("VNPAY_TMN_CODE").context("VNPAY_TMN_CODE not set")?,
            hash_secret: env::var("VNPAY_HASH_SECRET").context("VNPAY_HASH_SECRET not set")?,
            pay_url: env::var("VNPAY_PAY_URL").context("VNPAY_PAY_URL not set")?,
            api_url: env::var("VNPAY_API_URL").context("VNPAY_API_URL not set")?,
            timeout_secs: env::var("VNPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        };

        let zalopay = ZalopayConfig {
            app_id: env::var("ZALOPAY_APP_ID").context("ZALOPAY_APP_ID not set")?,
            key1: env::var("ZALOPAY_KEY1").context("ZALOPAY_KEY1 not set")?,
            key2: env::var("ZALOPAY_KEY2").context("ZALOPAY_KEY2 not set")?,
            endpoint: env::var("ZALOPAY_ENDPOINT").context("ZALOPAY_ENDPOINT not set")?,
            callback_url: env::var("ZALOPAY_CALLBACK_URL")
                .context("ZALOPAY_CALLBACK_URL not set")?,
            timeout_secs: env::var("ZALOPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        };

        let config = Config {
            server,
            database,
            vnpay,
            zalopay,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
        }

        // Payment credentials: an empty secret must never degrade to
        // unsigned requests.
        if self.vnpay.tmn_code.trim().is_empty() {
            return Err(anyhow!("VNPAY_TMN_CODE cannot be empty"));
        }
        if self.vnpay.hash_secret.trim().is_empty() {
            return Err(anyhow!("VNPAY_HASH_SECRET cannot be empty"));
        }
        if self.vnpay.pay_url.trim().is_empty() || self.vnpay.api_url.trim().is_empty() {
            return Err(anyhow!("VNPay URLs cannot be empty"));
        }

        if self.zalopay.app_id.trim().is_empty() {
            return Err(anyhow!("ZALOPAY_APP_ID cannot be empty"));
        }
        if self.zalopay.key1.trim().is_empty() || self.zalopay.key2.trim().is_empty() {
            return Err(anyhow!("ZaloPay keys cannot be empty"));
        }
        if self.zalopay.endpoint.trim().is_empty() || self.zalopay.callback_url.trim().is_empty() {
            return Err(anyhow!("ZaloPay URLs cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                environment: "development".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/evdealer".to_string(),
                max_connections: 20,
            },
            vnpay: VnpayConfig {
                tmn_code: "EVDEMO01".to_string(),
                hash_secret: "secret".to_string(),
                pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string(),
                api_url: "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction"
                    .to_string(),
                timeout_secs: 30,
            },
            zalopay: ZalopayConfig {
                app_id: "2554".to_string(),
                key1: "key1".to_string(),
                key2: "key2".to_string(),
                endpoint: "https://sb-openapi.zalopay.vn/v2".to_string(),
                callback_url: "https://dealer.example.vn/api/payments/zalopay/callback"
                    .to_string(),
                timeout_secs: 30,
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn bind_addr_uses_configured_host_and_port() {
        let mut config = valid_config();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9090;
        assert_eq!(config.server.bind_addr(), "127.0.0.1:9090");
    }

    #[test]
    fn empty_hash_secret_is_rejected() {
        let mut config = valid_config();
        config.vnpay.hash_secret = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_zalopay_key_is_rejected() {
        let mut config = valid_config();
        config.zalopay.key2 = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn privileged_port_is_rejected() {
        let mut config = valid_config();
        config.server.port = 80;
        assert!(config.validate().is_err());
    }
}

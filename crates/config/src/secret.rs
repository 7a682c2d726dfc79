use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Database connection details stored as a JSON secret.
///
/// Extra keys in the secret (`engine`, `dbInstanceIdentifier`, ...) are
/// ignored. `port` is accepted either as a number or as a numeric string,
/// since rotation tooling writes it both ways.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DbCredentials {
    pub host: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
}

impl DbCredentials {
    /// Parse the JSON secret string.
    ///
    /// The error never includes the secret itself.
    pub fn from_secret(secret: &str) -> Result<Self> {
        serde_json::from_str(secret).or_raise(|| ErrorKind::MalformedSecret("expected database credentials".to_string()))
    }
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("dbname", &self.dbname)
            .finish()
    }
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }
    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Source of named secrets.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetch the string value of the secret called `name`.
    async fn secret_string(&self, name: &str) -> Result<String>;
}

/// Fetch the secret called `name` and parse it as [`DbCredentials`].
#[tracing::instrument(skip(provider))]
pub async fn load_credentials(provider: &dyn SecretProvider, name: &str) -> Result<DbCredentials> {
    let secret = provider.secret_string(name).await?;
    let credentials = DbCredentials::from_secret(&secret)?;
    tracing::debug!(host = %credentials.host, port = credentials.port, dbname = %credentials.dbname, "Loaded database credentials");
    Ok(credentials)
}

/// Secrets held in memory; for tests and local runs against a scratch
/// database.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretProvider {
    secrets: HashMap<String, String>,
}
impl StaticSecretProvider {
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn secret_string(&self, name: &str) -> Result<String> {
        match self.secrets.get(name) {
            Some(value) => Ok(value.clone()),
            None => exn::bail!(ErrorKind::SecretNotFound(name.to_string())),
        }
    }
}

#[cfg(feature = "aws")]
mod aws {
    use super::SecretProvider;
    use crate::error::{ErrorKind, Result};
    use async_trait::async_trait;
    use aws_sdk_secretsmanager::Client;
    use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
    use exn::{OptionExt, ResultExt};

    /// AWS Secrets Manager.
    #[derive(Debug, Clone)]
    pub struct AwsSecretsManager {
        client: Client,
    }
    impl AwsSecretsManager {
        pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
            Self { client: Client::new(sdk_config) }
        }

        pub fn from_client(client: Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl SecretProvider for AwsSecretsManager {
        async fn secret_string(&self, name: &str) -> Result<String> {
            let output = match self.client.get_secret_value().secret_id(name).send().await {
                Ok(output) => output,
                Err(err) => {
                    let kind = match err.as_service_error() {
                        Some(GetSecretValueError::ResourceNotFoundException(_)) => {
                            ErrorKind::SecretNotFound(name.to_string())
                        },
                        _ => ErrorKind::SecretAccess(name.to_string()),
                    };
                    return Err(err).or_raise(|| kind);
                },
            };
            // Binary secrets have no string value.
            output
                .secret_string()
                .map(str::to_string)
                .ok_or_raise(|| ErrorKind::MalformedSecret(format!("{name} has no string value")))
        }
    }
}
#[cfg(feature = "aws")]
pub use self::aws::AwsSecretsManager;

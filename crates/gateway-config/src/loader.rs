use std::path::Path;

use anyhow::Context;
use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).context("failed to parse config")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server()?;
        self.validate_auth()?;
        self.validate_bedrock()?;
        self.validate_llm()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_server(&self) -> anyhow::Result<()> {
        if self.server.request_timeout.is_zero() {
            anyhow::bail!("server.request_timeout must be greater than 0");
        }

        if self.server.health.enabled && !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        Ok(())
    }

    fn validate_auth(&self) -> anyhow::Result<()> {
        let auth = &self.auth;

        if auth.api_key.is_some() && auth.api_key_env.is_some() {
            anyhow::bail!("auth.api_key and auth.api_key_env are mutually exclusive");
        }

        if auth.api_key.as_ref().is_some_and(|key| key.expose_secret().is_empty()) {
            anyhow::bail!("auth.api_key must not be empty");
        }

        if auth.api_key_env.as_ref().is_some_and(|name| name.trim().is_empty()) {
            anyhow::bail!("auth.api_key_env must name an environment variable");
        }

        if auth.cache_ttl.is_zero() {
            anyhow::bail!("auth.cache_ttl must be greater than 0");
        }

        Ok(())
    }

    fn validate_bedrock(&self) -> anyhow::Result<()> {
        let bedrock = &self.bedrock;

        if bedrock.region.trim().is_empty() {
            anyhow::bail!("bedrock.region must not be empty");
        }

        if bedrock.access_key_id.is_some() != bedrock.secret_access_key.is_some() {
            anyhow::bail!("bedrock.access_key_id and bedrock.secret_access_key must be set together");
        }

        Ok(())
    }

    fn validate_llm(&self) -> anyhow::Result<()> {
        let llm = &self.llm;

        if llm.default_model.trim().is_empty() {
            anyhow::bail!("llm.default_model must not be empty");
        }

        if llm.default_embedding_model.trim().is_empty() {
            anyhow::bail!("llm.default_embedding_model must not be empty");
        }

        if llm.retry.max_attempts == 0 {
            anyhow::bail!("llm.retry.max_attempts must be at least 1");
        }

        for (id, entry) in &llm.models {
            if id.trim().is_empty() {
                anyhow::bail!("llm.models keys must not be empty");
            }

            if let Some(geo) = entry.cross_region.iter().find(|geo| geo.is_empty() || geo.contains('.')) {
                anyhow::bail!("model '{id}' lists an invalid cross-region geo '{geo}'");
            }
        }

        Ok(())
    }

    fn validate_telemetry(&self) -> anyhow::Result<()> {
        let Some(telemetry) = &self.telemetry else {
            return Ok(());
        };

        let (rate, _) = telemetry.sampling();
        if !(0.0..=1.0).contains(&rate) {
            anyhow::bail!("telemetry.tracing.sampling_rate must be between 0.0 and 1.0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use indoc::indoc;

    use crate::{Config, OtlpProtocol, ParameterPolicy, ProviderFamily};

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.server.listen_address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.request_timeout, Duration::from_secs(600));
        assert!(config.server.health.enabled);
        assert_eq!(config.bedrock.region, "us-west-2");
        assert!(!config.bedrock.cross_region_inference);
        assert_eq!(config.llm.default_model, "anthropic.claude-3-sonnet-20240229-v1:0");
        assert_eq!(config.llm.default_embedding_model, "cohere.embed-multilingual-v3");
        assert_eq!(config.llm.unsupported_parameters, ParameterPolicy::Drop);
        assert_eq!(config.llm.retry.max_attempts, 3);
        assert_eq!(config.auth.cache_ttl, Duration::from_secs(300));
        assert!(config.telemetry.is_none());
    }

    #[test]
    fn full_configuration_parses() {
        let config = Config::from_toml(indoc! {r#"
            [server]
            listen_address = "127.0.0.1:9000"
            request_timeout = "90s"

            [server.health]
            path = "/ping"

            [auth]
            api_key_env = "GATEWAY_KEY"
            cache_ttl = "1m"

            [bedrock]
            region = "eu-central-1"
            endpoint_url = "http://localhost:4566"
            cross_region_inference = true

            [llm]
            default_model = "meta.llama3-8b-instruct-v1:0"
            unsupported_parameters = "reject"
            fetch_remote_images = false

            [llm.retry]
            max_attempts = 5
            backoff = "50ms"
            throttle_retry_after = "3s"

            [llm.models."anthropic.claude-3-5-sonnet-20240620-v1:0"]
            provider = "claude3"
            name = "Claude 3.5 Sonnet"
            cross_region = ["eu", "us"]

            [telemetry]
            service_name = "gateway-eu"
            debug = true

            [telemetry.tracing]
            sampling_rate = 0.25

            [telemetry.tracing.exporter]
            endpoint = "http://collector:4318"
            protocol = "http_proto"
        "#})
        .unwrap();

        assert_eq!(config.server.request_timeout, Duration::from_secs(90));
        assert_eq!(config.server.health.path, "/ping");
        assert_eq!(config.auth.api_key_env.as_deref(), Some("GATEWAY_KEY"));
        assert_eq!(config.auth.cache_ttl, Duration::from_secs(60));
        assert_eq!(
            config.bedrock.endpoint_url.as_ref().map(url::Url::as_str),
            Some("http://localhost:4566/")
        );
        assert_eq!(config.llm.unsupported_parameters, ParameterPolicy::Reject);
        assert_eq!(config.llm.retry.backoff, Duration::from_millis(50));

        let entry = &config.llm.models["anthropic.claude-3-5-sonnet-20240620-v1:0"];
        assert_eq!(entry.provider, ProviderFamily::Claude3);
        assert_eq!(entry.cross_region, ["eu", "us"]);

        let telemetry = config.telemetry.unwrap();
        assert!(telemetry.debug);
        assert_eq!(telemetry.sampling(), (0.25, true));
        let exporter = telemetry.span_exporter().unwrap();
        assert_eq!(exporter.protocol, OtlpProtocol::HttpProto);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_toml("[bedrock]\nregoin = \"us-east-1\"").unwrap_err();
        assert!(format!("{err:#}").contains("unknown field `regoin`"));
    }

    #[test]
    fn unknown_provider_family_is_rejected() {
        let result = Config::from_toml(indoc! {r#"
            [llm.models."acme.model-v1"]
            provider = "acme"
        "#});
        assert!(result.is_err());
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let err = Config::from_toml("[server]\nrequest_timeout = \"soon\"").unwrap_err();
        assert!(format!("{err:#}").contains("invalid duration 'soon'"));
    }

    #[test]
    fn key_sources_are_mutually_exclusive() {
        let err = Config::from_toml(indoc! {r#"
            [auth]
            api_key = "sk-1"
            api_key_env = "GATEWAY_KEY"
        "#})
        .unwrap_err();
        assert_eq!(err.to_string(), "auth.api_key and auth.api_key_env are mutually exclusive");
    }

    #[test]
    fn static_credentials_must_be_complete() {
        let err = Config::from_toml("[bedrock]\naccess_key_id = \"AKIA\"").unwrap_err();
        assert_eq!(
            err.to_string(),
            "bedrock.access_key_id and bedrock.secret_access_key must be set together"
        );
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = Config::from_toml("[llm.retry]\nmax_attempts = 0").unwrap_err();
        assert_eq!(err.to_string(), "llm.retry.max_attempts must be at least 1");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::from_toml("[server]\nrequest_timeout = \"0s\"").unwrap_err();
        assert_eq!(err.to_string(), "server.request_timeout must be greater than 0");
    }

    #[test]
    fn sampling_rate_out_of_range_is_rejected() {
        let err = Config::from_toml("[telemetry.tracing]\nsampling_rate = 1.5").unwrap_err();
        assert_eq!(
            err.to_string(),
            "telemetry.tracing.sampling_rate must be between 0.0 and 1.0"
        );
    }

    #[test]
    fn load_expands_environment_placeholders() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\napi_key = \"{{{{ env.GATEWAY_TEST_KEY }}}}\"").unwrap();

        temp_env::with_var("GATEWAY_TEST_KEY", Some("sk-from-env"), || {
            use secrecy::ExposeSecret;

            let config = Config::load(file.path()).unwrap();
            assert_eq!(config.auth.api_key.unwrap().expose_secret(), "sk-from-env");
        });
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(std::path::Path::new("/nonexistent/bedrock-gateway.toml")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read config file"));
    }
}

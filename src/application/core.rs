use crate::config::Configuration;
use crate::domain::order::{Order, PayeeInfo, PlatformUrls};
use crate::domain::ports::{
    LogLevel, PlatformAdapter, PlatformAdapterBox, SleeperBox, TransportBox,
};
use crate::error::Result;
use crate::infrastructure::sleeper::TokioSleeper;
use serde_json::Value;

const CLIENT_NAME: &str = concat!("payorch/", env!("CARGO_PKG_VERSION"));

/// The payment orchestration core.
///
/// `Core` owns the platform adapter, the transport to the remote processor and
/// the merchant configuration. Its operations are spread over the sibling
/// modules of `application`, one `impl Core` block per concern.
pub struct Core {
    pub(crate) adapter: PlatformAdapterBox,
    pub(crate) transport: TransportBox,
    pub(crate) configuration: Configuration,
    pub(crate) sleeper: SleeperBox,
    pub(crate) user_agent: String,
}

impl Core {
    /// Creates a new `Core`.
    ///
    /// # Arguments
    ///
    /// * `configuration` - Merchant configuration, immutable from here on.
    /// * `adapter` - The hosting platform.
    /// * `transport` - Wire access to the remote processor.
    pub fn new(
        configuration: Configuration,
        adapter: PlatformAdapterBox,
        transport: TransportBox,
    ) -> Self {
        let mut user_agent = CLIENT_NAME.to_string();
        if let Some(system) = adapter.initiating_system_user_agent() {
            user_agent.push(' ');
            user_agent.push_str(&system);
        }

        Self {
            adapter,
            transport,
            configuration,
            sleeper: Box::new(TokioSleeper),
            user_agent,
        }
    }

    /// Appends the user agent of the end user's browser, when known.
    pub fn with_client_user_agent(mut self, user_agent: impl AsRef<str>) -> Self {
        let user_agent = user_agent.as_ref().trim();
        if !user_agent.is_empty() {
            self.user_agent.push(' ');
            self.user_agent.push_str(user_agent);
        }
        self
    }

    /// Replaces the sleeper used between reconciliation attempts.
    pub fn with_sleeper(mut self, sleeper: SleeperBox) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn adapter(&self) -> &dyn PlatformAdapter {
        self.adapter.as_ref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub(crate) async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.adapter.get_order_data(order_id).await
    }

    pub async fn platform_urls(&self, order_id: &str) -> Result<PlatformUrls> {
        self.adapter.get_platform_urls(order_id).await
    }

    /// Payee info of an order: adapter values over configuration defaults.
    pub async fn payee_info(&self, order_id: &str) -> Result<PayeeInfo> {
        let defaults = PayeeInfo {
            payee_id: Some(self.configuration.payee_id.clone()),
            payee_name: Some(self.configuration.payee_name.clone()),
            payee_reference: Some(self.generate_payee_reference(order_id).await?),
            order_reference: Some(order_id.to_string()),
            subsite: self.configuration.subsite.clone().filter(|s| !s.is_empty()),
        };

        let overrides = self.adapter.get_payee_info(order_id).await?;
        Ok(overrides.merged_over(defaults))
    }

    pub async fn generate_payee_reference(&self, order_id: &str) -> Result<String> {
        self.adapter.generate_payee_reference(order_id).await
    }

    /// Emits a tracing event and, in debug mode, forwards to the adapter's sink.
    pub fn log(&self, level: LogLevel, message: &str, context: Value) {
        match level {
            LogLevel::Debug => tracing::debug!(%context, "{message}"),
            LogLevel::Info => tracing::info!(%context, "{message}"),
            LogLevel::Warning => tracing::warn!(%context, "{message}"),
            LogLevel::Error => tracing::error!(%context, "{message}"),
        }

        if self.configuration.debug {
            self.adapter.log(level, message, &context);
        }
    }
}

use super::core::Core;
use crate::domain::order::PaymentReference;
use crate::domain::payment::{ApiResponse, PaymentResource};
use crate::domain::ports::{LogLevel, Method};
use crate::domain::transaction::{Authorization, FinancialTransaction, Verification};
use crate::error::{PaymentError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

fn with_expand(url: &str, expand: Option<&str>) -> String {
    match expand.filter(|e| !e.is_empty()) {
        Some(expand) => format!("{url}?$expand={expand}"),
        None => url.to_string(),
    }
}

impl Core {
    /// Fetches a payment or payment order, optionally expanding sub-resources.
    pub async fn fetch_payment_info(&self, url: &str, expand: Option<&str>) -> Result<ApiResponse> {
        let url = with_expand(url, expand);
        match self.request(Method::Get, &url, None).await {
            Ok(response) => Ok(response),
            Err(error @ PaymentError::RemoteError { .. }) => {
                self.log(
                    LogLevel::Debug,
                    &format!("Unable to fetch {url}: {error}"),
                    Value::Null,
                );
                Err(error)
            }
            Err(error) => Err(PaymentError::remote(error.to_string())),
        }
    }

    /// Fetches the resource an order is attached to.
    pub async fn fetch_payment_resource(&self, reference: &PaymentReference) -> Result<PaymentResource> {
        self.fetch_payment_info(reference.url(), None)
            .await?
            .extract(reference.resource_key())
    }

    /// Financial transactions of a payment order, oldest first.
    ///
    /// Never fails: fetch or decode errors are logged and yield an empty list.
    pub async fn fetch_financial_transactions_list(
        &self,
        payment_order_url: &str,
        expand: Option<&str>,
    ) -> Vec<FinancialTransaction> {
        let url = format!("{payment_order_url}/financialtransactions");
        let response = match self.fetch_payment_info(&url, expand).await {
            Ok(response) => response,
            Err(error) => {
                self.log(
                    LogLevel::Debug,
                    &format!("Unable to fetch financial transactions: {error}"),
                    json!({ "paymentOrder": payment_order_url }),
                );
                return Vec::new();
            }
        };

        let mut transactions: Vec<FinancialTransaction> =
            match response.extract("financialTransactions/financialTransactionsList") {
                Ok(list) => list,
                Err(error) => {
                    self.log(
                        LogLevel::Debug,
                        &format!("Unable to read financial transactions: {error}"),
                        json!({ "paymentOrder": payment_order_url }),
                    );
                    return Vec::new();
                }
            };

        transactions.sort_by_key(|tx| tx.created);
        transactions
    }

    /// Transactions of a legacy payment.
    pub async fn fetch_transactions_list(
        &self,
        payment_url: &str,
        expand: Option<&str>,
    ) -> Result<Vec<FinancialTransaction>> {
        self.fetch_list(
            &format!("{payment_url}/transactions"),
            expand,
            "transactions/transactionList",
        )
        .await
    }

    pub async fn fetch_verification_list(
        &self,
        payment_url: &str,
        expand: Option<&str>,
    ) -> Result<Vec<Verification>> {
        self.fetch_list(
            &format!("{payment_url}/verifications"),
            expand,
            "verifications/verificationList",
        )
        .await
    }

    pub async fn fetch_authorization_list(
        &self,
        payment_url: &str,
        expand: Option<&str>,
    ) -> Result<Vec<Authorization>> {
        self.fetch_list(
            &format!("{payment_url}/authorizations"),
            expand,
            "authorizations/authorizationList",
        )
        .await
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        url: &str,
        expand: Option<&str>,
        path: &str,
    ) -> Result<Vec<T>> {
        let response = self.fetch_payment_info(url, expand).await?;
        if response.pointer(path).is_none_or(Value::is_null) {
            return Ok(Vec::new());
        }
        response.extract(path)
    }

    /// Id of the payment currently active inside a payment order, if any.
    pub async fn get_payment_id_by_payment_order(
        &self,
        payment_order_url: &str,
    ) -> Result<Option<String>> {
        let resource = self
            .fetch_payment_resource(&PaymentReference::PaymentOrder(payment_order_url.to_string()))
            .await?;
        let Some(current) = resource.current_payment.filter(|c| !c.id.is_empty()) else {
            return Ok(None);
        };

        let response = self.fetch_payment_info(&current.id, None).await?;
        Ok(response
            .pointer("payment/id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// The payment currently active inside a payment order, if any.
    pub async fn get_checkout_current_payment(
        &self,
        payment_order_url: &str,
    ) -> Result<Option<PaymentResource>> {
        let response = self
            .fetch_payment_info(&format!("{payment_order_url}/currentpayment"), None)
            .await?;
        match response.pointer("payment") {
            Some(Value::Null) | None => Ok(None),
            Some(_) => Ok(Some(response.extract("payment")?)),
        }
    }
}

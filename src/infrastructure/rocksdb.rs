use crate::domain::money::MinorUnits;
use crate::domain::ports::TransactionLedger;
use crate::domain::transaction::{CreditMemo, FinancialTransaction, TransactionField};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for financial transactions, keyed by `order_id \0 number`.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for credit memos, keyed by transaction id.
pub const CF_CREDIT_MEMOS: &str = "credit_memos";

/// A persistent ledger using RocksDB.
///
/// Transactions and credit memos live in separate Column Families. `Clone`
/// shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbLedger {
    db: Arc<DB>,
    memo_lock: Arc<Mutex<()>>,
}

impl RocksDbLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let cf_memos = ColumnFamilyDescriptor::new(CF_CREDIT_MEMOS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions, cf_memos])?;

        Ok(Self {
            db: Arc::new(db),
            memo_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::Storage(format!("{name} column family not found")))
    }

    fn transaction_key(order_id: &str, number: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(order_id.len() + number.len() + 1);
        key.extend_from_slice(order_id.as_bytes());
        key.push(0);
        key.extend_from_slice(number.as_bytes());
        key
    }

    fn memos(&self) -> Result<Vec<CreditMemo>> {
        let cf = self.cf(CF_CREDIT_MEMOS)?;
        let mut memos = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            memos.push(serde_json::from_slice(&value)?);
        }
        Ok(memos)
    }
}

#[async_trait]
impl TransactionLedger for RocksDbLedger {
    async fn save(&self, order_id: &str, transaction: &FinancialTransaction) -> Result<()> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let value = serde_json::to_vec(transaction)?;
        self.db
            .put_cf(cf, Self::transaction_key(order_id, &transaction.number), value)?;
        Ok(())
    }

    async fn find(
        &self,
        field: TransactionField,
        value: &str,
    ) -> Result<Option<(String, FinancialTransaction)>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, bytes) = item?;
            let transaction: FinancialTransaction = serde_json::from_slice(&bytes)?;
            if field.value_of(&transaction) == Some(value) {
                let order_id = key
                    .split(|b| *b == 0)
                    .next()
                    .map(|id| String::from_utf8_lossy(id).into_owned())
                    .unwrap_or_default();
                return Ok(Some((order_id, transaction)));
            }
        }
        Ok(None)
    }

    async fn credit_memo_exists(&self, transaction_id: &str) -> Result<bool> {
        let cf = self.cf(CF_CREDIT_MEMOS)?;
        Ok(self.db.get_pinned_cf(cf, transaction_id.as_bytes())?.is_some())
    }

    async fn record_credit_memo(&self, memo: CreditMemo) -> Result<bool> {
        let _guard = self.memo_lock.lock().await;
        if self.credit_memo_exists(&memo.transaction_id).await? {
            return Ok(false);
        }

        let cf = self.cf(CF_CREDIT_MEMOS)?;
        self.db
            .put_cf(cf, memo.transaction_id.as_bytes(), serde_json::to_vec(&memo)?)?;
        Ok(true)
    }

    async fn credited_total(&self, order_id: &str) -> Result<MinorUnits> {
        Ok(self
            .memos()?
            .iter()
            .filter(|memo| memo.order_id == order_id)
            .map(|memo| MinorUnits::from_major(memo.amount))
            .sum())
    }
}

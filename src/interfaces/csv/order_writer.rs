use crate::domain::money::MinorUnits;
use crate::domain::order::{Order, OrderStatus};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Final state of one order after a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub order: Order,
    pub credited: MinorUnits,
    pub notes: Vec<String>,
}

#[derive(Serialize)]
struct OrderRecord<'a> {
    order: &'a str,
    status: OrderStatus,
    transaction: &'a str,
    credited: String,
    notes: String,
}

/// Writes order summaries as CSV: `order,status,transaction,credited,notes`.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders<'a>(&mut self, summaries: impl IntoIterator<Item = &'a OrderSummary>) -> Result<()> {
        for summary in summaries {
            self.writer.serialize(OrderRecord {
                order: &summary.order.order_id,
                status: summary.order.status,
                transaction: summary.order.transaction_id.as_deref().unwrap_or_default(),
                credited: summary.credited.to_string(),
                notes: summary.notes.join(" | "),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

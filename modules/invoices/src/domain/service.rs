use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, Order, Set};
use tenantkit_db::secure::{DataKeyContext, DataKeyResolver, ScopeError, TenantModel};
use tracing::{debug, instrument};

use crate::domain::error::DomainError;
use crate::infra::storage::entity::{company, invoice, line_item};

#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub item_name: String,
    pub num_items: i32,
    pub total_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_name: String,
    pub line_items: Vec<NewLineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceWithLines {
    pub invoice: invoice::Model,
    pub line_items: Vec<line_item::Model>,
}

/// Invoice use cases. Every call opens a [`DataKeyContext`] for the caller, so
/// all reads and writes stay inside the caller's data partition.
#[derive(Clone)]
pub struct InvoicesService {
    conn: DatabaseConnection,
    model: Arc<TenantModel>,
}

impl InvoicesService {
    #[must_use]
    pub fn new(conn: DatabaseConnection, model: Arc<TenantModel>) -> Self {
        Self { conn, model }
    }

    fn context(&self, caller: &dyn DataKeyResolver) -> DataKeyContext {
        DataKeyContext::new(self.conn.clone(), Arc::clone(&self.model), caller)
    }

    /// Create an invoice and its line items in one flush.
    ///
    /// # Errors
    /// - `DomainError::Validation` for a blank name or an invalid line item
    /// - `DomainError::Scope` when the caller has no data key
    #[instrument(skip(self, caller, new), fields(lines = new.line_items.len()))]
    pub async fn create_invoice(
        &self,
        caller: &dyn DataKeyResolver,
        new: NewInvoice,
    ) -> Result<InvoiceWithLines, DomainError> {
        if new.invoice_name.trim().is_empty() {
            return Err(DomainError::validation("invoice name must not be empty"));
        }
        for item in &new.line_items {
            if item.item_name.trim().is_empty() {
                return Err(DomainError::validation("line item name must not be empty"));
            }
            if item.num_items <= 0 {
                return Err(DomainError::validation(format!(
                    "line item '{}' must have at least one item",
                    item.item_name
                )));
            }
        }

        let mut ctx = self.context(caller);
        let saved_invoice = ctx.add::<invoice::Entity>(invoice::ActiveModel {
            invoice_name: Set(new.invoice_name),
            date_created: Set(Utc::now()),
            ..Default::default()
        })?;

        let mut saved_lines = Vec::with_capacity(new.line_items.len());
        for item in new.line_items {
            let tracked = ctx.add_child::<invoice::Entity, line_item::Entity, _>(
                &saved_invoice,
                move |inv| line_item::ActiveModel {
                    invoice_id: Set(inv.invoice_id),
                    item_name: Set(item.item_name),
                    num_items: Set(item.num_items),
                    total_price: Set(item.total_price),
                    ..Default::default()
                },
            )?;
            saved_lines.push(tracked);
        }

        ctx.save_changes().await?;

        let invoice = saved_invoice
            .get()
            .cloned()
            .ok_or(ScopeError::Invalid("invoice missing after save"))?;
        let line_items = saved_lines
            .iter()
            .filter_map(|t| t.get().cloned())
            .collect();
        debug!(invoice_id = invoice.invoice_id, "invoice created");

        Ok(InvoiceWithLines {
            invoice,
            line_items,
        })
    }

    /// Invoices of the caller's partition, newest first.
    ///
    /// # Errors
    /// Returns `DomainError` if the query fails.
    #[instrument(skip(self, caller))]
    pub async fn list_invoices(
        &self,
        caller: &dyn DataKeyResolver,
    ) -> Result<Vec<invoice::Model>, DomainError> {
        let ctx = self.context(caller);
        let invoices = ctx
            .find::<invoice::Entity>()?
            .order_by(invoice::Column::DateCreated, Order::Desc)
            .order_by(invoice::Column::InvoiceId, Order::Desc)
            .all(&ctx)
            .await?;
        debug!(count = invoices.len(), "listed invoices");
        Ok(invoices)
    }

    /// # Errors
    /// Returns `DomainError::NotFound` when the invoice is not in the caller's
    /// partition.
    #[instrument(skip(self, caller))]
    pub async fn get_invoice(
        &self,
        caller: &dyn DataKeyResolver,
        invoice_id: i32,
    ) -> Result<InvoiceWithLines, DomainError> {
        let ctx = self.context(caller);
        let invoice = ctx
            .find_by_id::<invoice::Entity, _>(invoice_id)?
            .one(&ctx)
            .await?
            .ok_or_else(|| DomainError::not_found("Invoice", invoice_id))?;

        let line_items = ctx
            .find::<line_item::Entity>()?
            .filter(line_item::Column::InvoiceId.eq(invoice_id))
            .order_by(line_item::Column::LineItemId, Order::Asc)
            .all(&ctx)
            .await?;

        Ok(InvoiceWithLines {
            invoice,
            line_items,
        })
    }

    /// The company of the caller's partition, if the tenant has been set up.
    ///
    /// # Errors
    /// Returns `DomainError` if the query fails.
    pub async fn company(
        &self,
        caller: &dyn DataKeyResolver,
    ) -> Result<Option<company::Model>, DomainError> {
        let ctx = self.context(caller);
        Ok(ctx.find::<company::Entity>()?.one(&ctx).await?)
    }
}

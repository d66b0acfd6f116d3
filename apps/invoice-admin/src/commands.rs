use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use invoices::{
    InvoiceTenantChangeService, InvoicesService, SeaOrmTenantAdmin, Status, TenantAdminService,
    TenantChangeService, invoices_model, migrate,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tenantkit_security::StaticDataKey;

#[derive(Subcommand)]
pub enum Commands {
    /// Create or upgrade the database schema
    Migrate,
    /// Manage the tenant registry
    #[command(subcommand)]
    Tenants(TenantsCommand),
    /// Show the invoices of one data partition
    Invoices(InvoicesArgs),
}

#[derive(Subcommand)]
pub enum TenantsCommand {
    /// List every tenant
    List,
    /// Add a tenant and set up its partition
    Create { name: String },
    /// Rename a tenant and its company
    Rename { id: i32, name: String },
    /// Delete a tenant together with all of its data
    Delete { id: i32 },
}

#[derive(Args)]
pub struct InvoicesArgs {
    /// Data key of the partition, e.g. `3.`
    #[arg(long)]
    data_key: String,
    /// Show one invoice with its line items
    #[arg(long)]
    id: Option<i32>,
}

/// Services wired over one connection pool.
pub struct App {
    admin: SeaOrmTenantAdmin,
    invoices: InvoicesService,
}

impl App {
    /// # Errors
    /// Fails when the tenant model cannot be built.
    pub fn new(conn: &DatabaseConnection) -> Result<Self> {
        let model = Arc::new(invoices_model().context("invalid invoice model")?);
        let changes: Arc<dyn TenantChangeService> = Arc::new(InvoiceTenantChangeService::new(
            conn.clone(),
            Arc::clone(&model),
        ));
        Ok(Self {
            admin: SeaOrmTenantAdmin::new(conn.clone(), changes),
            invoices: InvoicesService::new(conn.clone(), model),
        })
    }
}

/// Print the success message, or turn the collected errors into an error so the
/// process exits non-zero.
fn report<T>(status: &Status<T>) -> Result<()> {
    for error in status.errors() {
        tracing::debug!(%error, "admin operation reported an error");
    }
    if status.has_errors() {
        anyhow::bail!("{}", status.get_all_errors("\n"));
    }
    println!("{}", status.message());
    Ok(())
}

impl Commands {
    /// # Errors
    /// Fails on database errors and on admin operations that report errors.
    pub async fn run(self, conn: &DatabaseConnection) -> Result<()> {
        migrate(conn).await.context("migration failed")?;
        match self {
            Self::Migrate => {
                println!("Database schema is up to date.");
                Ok(())
            }
            Self::Tenants(cmd) => cmd.run(&App::new(conn)?).await,
            Self::Invoices(args) => args.run(&App::new(conn)?).await,
        }
    }
}

impl TenantsCommand {
    async fn run(self, app: &App) -> Result<()> {
        match self {
            Self::List => {
                let status = app.admin.query_tenants().await;
                if status.has_errors() {
                    return report(&status);
                }
                let tenants = status.into_result().unwrap_or_default();
                if tenants.is_empty() {
                    println!("No tenants.");
                }
                for tenant in tenants {
                    println!(
                        "{:>5}  {:<8}  {}",
                        tenant.tenant_id, tenant.data_key, tenant.tenant_full_name
                    );
                }
                Ok(())
            }
            Self::Create { name } => report(&app.admin.add_single_tenant(&name).await),
            Self::Rename { id, name } => report(&app.admin.update_tenant_name(id, &name).await),
            Self::Delete { id } => report(&app.admin.delete_tenant(id).await),
        }
    }
}

impl InvoicesArgs {
    async fn run(self, app: &App) -> Result<()> {
        let caller = StaticDataKey::new(self.data_key);

        if let Some(id) = self.id {
            let found = app.invoices.get_invoice(&caller, id).await?;
            println!(
                "{}  {}  {}",
                found.invoice.invoice_id,
                found.invoice.date_created.format("%Y-%m-%d %H:%M"),
                found.invoice.invoice_name
            );
            let mut total = Decimal::ZERO;
            for line in &found.line_items {
                total += line.total_price;
                println!(
                    "    {:>4} x {:<24} {:>10}",
                    line.num_items, line.item_name, line.total_price
                );
            }
            println!("    {:<31} {total:>10}", "total");
            return Ok(());
        }

        if let Some(company) = app.invoices.company(&caller).await? {
            println!("Company: {}", company.company_name);
        }
        let invoices = app.invoices.list_invoices(&caller).await?;
        if invoices.is_empty() {
            println!("No invoices.");
        }
        for invoice in invoices {
            println!(
                "{:>5}  {}  {}",
                invoice.invoice_id,
                invoice.date_created.format("%Y-%m-%d %H:%M"),
                invoice.invoice_name
            );
        }
        Ok(())
    }
}

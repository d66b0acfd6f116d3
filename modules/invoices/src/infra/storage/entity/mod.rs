//! `SeaORM` entities of the invoice schema plus the admin `tenants` table.

pub mod company;
pub mod invoice;
pub mod line_item;
pub mod tenant;

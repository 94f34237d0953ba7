//! Household domain models and the pure projection/decay computations over them.

pub mod common;
#[allow(clippy::module_inception)]
pub mod household;
pub mod member;
pub mod product;
pub mod recurring;
pub mod stock;
pub mod transaction;

pub use common::{new_record_id, Displayable, Identifiable, NamedEntity};
pub use household::Household;
pub use member::{Member, MemberRole};
pub use product::{ConsumptionPeriod, Product, Unit};
pub use recurring::{month_end, parse_projection_id, project, projection_id};
pub use stock::{decay, periods_passed};
pub use transaction::{
    ExpenseCategory, IncomeCategory, Transaction, TransactionCategory, TransactionKind,
    TransactionStatus,
};

pub mod alert_service;
pub mod member_service;
pub mod product_service;
pub mod summary_service;
pub mod transaction_service;

pub use alert_service::{AlertReport, AlertService, DueAlert, DueStatus, StockAlert};
pub use member_service::MemberService;
pub use product_service::ProductService;
pub use summary_service::{BudgetStatus, KindTotals, MonthlySummary, SummaryService};
pub use transaction_service::TransactionService;

use crate::errors::HouseholdError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Household(#[from] HouseholdError),
    #[error("{0}")]
    Invalid(String),
}

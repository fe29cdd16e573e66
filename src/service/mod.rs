pub mod export;
pub mod matcher;
pub mod provider;
pub mod session;
pub mod view;

pub use matcher::{auto_match, compute_initial_matches, repair_after_swap, AutoMatch, MatchPolicy};
pub use provider::{PgSourceLineProvider, ProviderError, SourceLineProvider};
pub use session::SessionStore;
pub use view::{FetchTicket, ReconciliationTotals, ReconciliationView, ViewError, ViewSnapshot, ViewStatus};

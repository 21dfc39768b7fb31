pub mod interaction;
pub mod listing;
pub mod session;

pub use listing::ListingService;
pub use session::{ContractSession, Outcome};

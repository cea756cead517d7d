//! # Repository Layer
//!
//! SeaORM-backed storage for registered websites and recorded bot visits.

pub mod visit;
pub mod website;

pub use visit::{NewVisit, Pagination, VisitFilter, VisitRepository};
pub use website::{RegisteredWebsite, WebsiteRepository, WebsiteSummary};

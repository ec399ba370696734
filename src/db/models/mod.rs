// Sub-modules organized by functional domain
pub mod api;
pub mod cycle;
pub mod participant;
pub mod question;
pub mod respondent;
pub mod response;
pub mod user;

// API response structures
pub use api::*;

// Assessment models
pub use cycle::*;
pub use participant::*;
pub use question::*;
pub use respondent::*;
pub use response::*;

// Users (read-only collaborator rows)
pub use user::*;

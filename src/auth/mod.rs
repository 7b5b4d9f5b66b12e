pub mod claims;
pub mod extractors;
pub mod jwt;
pub mod password;

pub use claims::{Identity, Viewer};
pub use extractors::RequestViewer;
pub use jwt::{Clock, FixedClock, SystemClock, TokenService};

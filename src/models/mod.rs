pub mod diagnosis;
pub mod findings;
pub mod request;
pub mod response;

pub use diagnosis::*;
pub use findings::*;
pub use request::*;
pub use response::*;

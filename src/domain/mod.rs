pub mod content;
pub mod error;
pub mod issue;
pub mod provider;
pub mod task;
pub mod youtrack;

pub use content::*;
pub use error::*;
pub use issue::*;
pub use provider::*;
pub use task::*;
pub use youtrack::*;

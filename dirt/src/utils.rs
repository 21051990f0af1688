mod metrics;
mod rows;

pub use self::metrics::*;
pub use self::rows::*;

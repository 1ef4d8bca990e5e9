pub mod fanout;
pub mod sinks;

pub use fanout::{AllExternal, ExternalCom};
pub use sinks::{Console, FileLogger, TtlPort};

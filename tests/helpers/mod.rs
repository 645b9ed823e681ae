pub mod builders;
pub mod db;

pub use builders::{ClientAppBuilder, DeviceFlowBuilder};
pub use db::TestDb;

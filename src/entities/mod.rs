pub mod client_app;
pub mod device_flow;

pub use client_app::Entity as ClientApp;
pub use device_flow::Entity as DeviceFlow;

mod service;

pub use service::ServiceHost;

pub mod docker;
pub mod http_client;
pub mod notifier;
pub mod s3;

mod handle;
mod image;
mod request;
mod secret;
mod sku;

pub use handle::{ProvisioningHandle, VmStatus};
pub use image::Image;
pub use request::ProvisioningRequest;
pub use secret::Secret;
pub use sku::Sku;

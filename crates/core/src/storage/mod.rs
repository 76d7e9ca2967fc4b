pub mod bucket;
pub mod encryption;
pub mod format;
pub mod manager;
pub mod seed;

#[cfg(not(target_arch = "wasm32"))]
pub mod encrypted_bucket;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_bucket;

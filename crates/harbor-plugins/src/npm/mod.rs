//! npm package specifiers and the registry fetcher.
//!
//! [`NpmSpec`] is always available because the registry-spec installer
//! validates its input before calling any fetcher. The HTTP fetcher and its
//! supporting modules live behind the `http` feature.

#[cfg(feature = "http")]
pub mod fetcher;
#[cfg(feature = "http")]
pub mod integrity;
pub mod spec;
#[cfg(feature = "http")]
pub mod types;

#[cfg(feature = "http")]
pub use fetcher::NpmFetcher;
pub use spec::NpmSpec;

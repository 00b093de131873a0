//! Plugin installation pipeline and status registry for the Harbor plugin host.
//!
//! Turns a raw install request (a directory, a packed `.tgz` archive or an
//! npm package specifier) into a validated, uniquely-identified extension
//! under the extensions directory, and reports which extensions exist across
//! all origins and whether the loader managed to load them.
//!
//! - [`InstallSpec`]: classifies a raw install argument
//! - [`Installer`]: drives archive and registry installs into the extensions directory
//! - [`PluginManifest`]: the `package.json` fields the host cares about
//! - [`PluginId`]: filesystem-safe id derived from the declared package name
//! - [`InstallLedger`]: `.installs.toml`, where each installed id came from
//! - [`StatusRegistry`]: merges on-disk discovery with loader outcomes
//! - [`DoctorSummary`]: error-level view over a [`StatusReport`]
//!
//! # Installation flow
//!
//! ```text
//! raw argument ──► InstallSpec ──► archive ─┐
//!                              └─► registry ─┴─► staging ─► manifest ─► id ─► placement ─► ledger
//! ```
//!
//! Every failure is reported as [`InstallOutcome::Failed`] with an
//! [`InstallErrorKind`]; nothing is ever overwritten in the extensions
//! directory.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod archive;
pub mod doctor;
pub mod error;
pub mod install;
pub mod ledger;
pub mod manifest;
pub mod npm;
pub mod placement;
pub mod plugin;
pub mod spec;
pub mod status;

pub use doctor::DoctorSummary;
pub use error::{InstallErrorKind, PluginError, PluginResult};
pub use install::{InstallOutcome, Installer, PackageFetcher};
pub use ledger::{InstallLedger, InstallRecord, InstallSource};
pub use manifest::{MANIFEST_FILE, PluginManifest, read_manifest};
pub use npm::NpmSpec;
#[cfg(feature = "http")]
pub use npm::NpmFetcher;
pub use plugin::PluginId;
pub use spec::InstallSpec;
pub use status::{
    BuiltinPlugin, Diagnostic, DiagnosticLevel, LoadOutcome, LoadOutcomes, LoadSnapshot,
    PluginCapabilities, PluginRecord, PluginSettings, PluginSource, PluginStatus, StatusRegistry,
    StatusReport,
};

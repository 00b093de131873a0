//! Plugin management commands - list, inspect, toggle, install and diagnose plugins.

pub(crate) mod doctor;
pub(crate) mod helpers;
pub(crate) mod info;
pub(crate) mod install;
pub(crate) mod list;
pub(crate) mod toggle;

pub(crate) use doctor::plugins_doctor;
pub(crate) use info::plugin_info;
pub(crate) use install::install_plugin;
pub(crate) use list::{ListOptions, list_plugins};
pub(crate) use toggle::set_plugin_enabled;

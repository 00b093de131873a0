pub(crate) mod plugins;

pub mod app;
pub mod domain;
pub mod infra;

/// Install logging for the binary; `verbosity` counts `-v` flags.
pub fn init(verbosity: u8) {
    infra::logging::init(verbosity);
}

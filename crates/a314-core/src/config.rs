use std::path::PathBuf;

use a314_support::directories::shmem_dir_data;

/// Default application name used to locate the mailbox under the local
/// share directory, matching `a314_support::directories` conventions.
const DEFAULT_APP_NAME: &str = "a314";

/// Default number of main-loop iterations a freed stream id waits out
/// before being handed back to the allocator.
const DEFAULT_STREAM_ID_GRACE_ITERATIONS: u64 = 64;

/// Runtime configuration for one side of a mailbox.
#[derive(Debug, Clone)]
pub struct Config {
    app_name: String,
    mailbox_name: String,
    stream_id_grace_iterations: u64,
}

impl Config {
    pub fn new(mailbox_name: impl Into<String>) -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            mailbox_name: mailbox_name.into(),
            stream_id_grace_iterations: DEFAULT_STREAM_ID_GRACE_ITERATIONS,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_stream_id_grace_iterations(mut self, iterations: u64) -> Self {
        self.stream_id_grace_iterations = iterations;
        self
    }

    pub fn mailbox_name(&self) -> &str {
        &self.mailbox_name
    }

    pub fn stream_id_grace_iterations(&self) -> u64 {
        self.stream_id_grace_iterations
    }

    /// Path to the shared-memory file backing this mailbox.
    pub fn shmem_path(&self) -> PathBuf {
        shmem_dir_data(&self.app_name).join(&self.mailbox_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shmem_path_is_namespaced_by_mailbox_name() {
        let config = Config::new("demo-mailbox");
        assert!(config.shmem_path().ends_with("demo-mailbox"));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::new("m").with_stream_id_grace_iterations(8);
        assert_eq!(config.stream_id_grace_iterations(), 8);
    }
}

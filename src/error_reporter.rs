use crate::cli::VerbosityLevel;
use crate::config::ConfigError;
use crate::error::CheckError;

/// Fatal error reporter with configurable verbosity
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
    show_timestamps: bool,
    show_error_codes: bool,
}

impl ErrorReporter {
    /// Create a new error reporter with specified verbosity
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_timestamps: false,
            show_error_codes: false,
        }
    }

    /// Create a new error reporter with additional options
    pub fn with_options(
        verbosity: VerbosityLevel,
        show_timestamps: bool,
        show_error_codes: bool,
    ) -> Self {
        Self {
            verbosity,
            show_timestamps,
            show_error_codes,
        }
    }

    /// Report a check error with appropriate verbosity
    pub fn report_check_error(&self, error: &CheckError) {
        if let Some(formatted) = self.format_check_error(error) {
            eprintln!("{}", formatted);
        }
    }

    /// Report a configuration error
    pub fn report_config_error(&self, error: &ConfigError) {
        eprintln!("{}", self.format_config_error(error));
    }

    /// Formatted error, or `None` when the verbosity hides it.
    pub fn format_check_error(&self, error: &CheckError) -> Option<String> {
        match self.verbosity {
            VerbosityLevel::Quiet => self
                .is_critical_error(error)
                .then(|| self.format_error_brief(error)),
            VerbosityLevel::Normal => Some(self.format_error_normal(error)),
            VerbosityLevel::Verbose => Some(self.format_error_verbose(error)),
            VerbosityLevel::Debug => Some(self.format_error_debug(error)),
        }
    }

    pub fn format_config_error(&self, error: &ConfigError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => format!("Config error: {}", error),
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                format!(
                    "Configuration Error: {}\n{}",
                    error,
                    self.get_config_help(error)
                )
            }
            VerbosityLevel::Debug => {
                format!(
                    "Configuration Error: {}\nDebug: {:?}\n{}",
                    error,
                    error,
                    self.get_config_help(error)
                )
            }
        }
    }

    /// Errors that abort a run even in quiet mode
    fn is_critical_error(&self, error: &CheckError) -> bool {
        matches!(
            error,
            CheckError::Config(_)
                | CheckError::MissingInput { .. }
                | CheckError::MissingResults { .. }
                | CheckError::Yaml { .. }
                | CheckError::Json { .. }
        )
    }

    /// Format error for brief output (quiet mode)
    fn format_error_brief(&self, error: &CheckError) -> String {
        match error {
            CheckError::MissingInput { path } => format!("MISSING: {}", path.display()),
            CheckError::MissingResults { key, hub } => {
                format!("NO RESULTS: {} for {}", key, hub)
            }
            _ => format!("ERROR: {}", error),
        }
    }

    /// Format error for normal output
    fn format_error_normal(&self, error: &CheckError) -> String {
        let timestamp = if self.show_timestamps {
            format!("[{}] ", chrono::Utc::now().format("%H:%M:%S"))
        } else {
            String::new()
        };

        format!("{}{}", timestamp, error)
    }

    /// Format error for verbose output
    fn format_error_verbose(&self, error: &CheckError) -> String {
        let mut output = self.format_error_normal(error);

        match error {
            CheckError::Http(http_err) => {
                output.push_str("\nSuggestion: Check network connectivity, or provide the emoji names file locally");
                if self.show_error_codes {
                    output.push_str(&format!("\nHTTP Error Details: {:?}", http_err));
                }
            }
            CheckError::HttpStatus { url, .. } | CheckError::Timeout { url, .. } => {
                output.push_str(&format!(
                    "\nSuggestion: Verify the URL is reachable or set network.emoji_url: {}",
                    url
                ));
            }
            CheckError::MissingInput { path } => {
                output.push_str(&format!(
                    "\nSuggestion: Create {} or point the configuration at the right file",
                    path.display()
                ));
            }
            CheckError::MissingResults { key, .. } => {
                output.push_str(&format!(
                    "\nSuggestion: Run the {} check first, or together with this one",
                    key
                ));
            }
            CheckError::WriteFile { path, .. } => {
                output.push_str(&format!(
                    "\nSuggestion: Check that {} is writable, or set paths.results_dir",
                    path.display()
                ));
            }
            CheckError::Yaml { path, .. } | CheckError::Json { path, .. } => {
                output.push_str(&format!("\nFile: {}", path.display()));
                output.push_str("\nSuggestion: Check the file syntax");
            }
            CheckError::UnknownTag { tag, .. } => {
                output.push_str(&format!(
                    "\nSuggestion: Only <a>, <img>, <iframe>, <source> and <script> references are supported, found <{}>",
                    tag
                ));
            }
            _ => {}
        }

        output
    }

    /// Format error for debug output
    fn format_error_debug(&self, error: &CheckError) -> String {
        let mut output = self.format_error_verbose(error);
        output.push_str(&format!("\nDebug Info: {:?}", error));

        output.push_str("\nError Chain:");
        let mut current_error: &dyn std::error::Error = error;
        let mut level = 0;
        while let Some(source) = current_error.source() {
            output.push_str(&format!("\n  {}: {}", level + 1, source));
            current_error = source;
            level += 1;
        }

        output
    }

    /// Get helpful suggestions for configuration errors
    fn get_config_help(&self, error: &ConfigError) -> String {
        match error {
            ConfigError::Io(_) => "Check that the configuration file exists and is readable".to_string(),
            ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
                "Check the configuration file syntax (TOML/JSON format expected)".to_string()
            }
            ConfigError::Validation(_) => {
                "Resolve conflicting values between file, environment, and CLI".to_string()
            }
            ConfigError::Environment(_) => {
                "Fix or unset the DOCS_CHECK_* environment variable".to_string()
            }
            ConfigError::UnsupportedFormat(_) => {
                "Use a .toml or .json configuration file".to_string()
            }
        }
    }
}

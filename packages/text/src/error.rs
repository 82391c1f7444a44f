//! Error type for the text layer.

/// Errors raised while reading or writing configuration files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A configuration file could not be opened or created.
    #[error("cannot access configuration file '{path}'")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file's content violates the format. Lines are 1-based.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The graph itself rejected an operation.
    #[error(transparent)]
    Model(#[from] gridconf_model::Error),

    /// Plain I/O failure mid-stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_reports_the_line() {
        let e = Error::Parse {
            line: 17,
            message: "closing </daemon> does not match open <service>".to_string(),
        };
        let display = format!("{}", e);
        assert!(display.contains("line 17"));
        assert!(display.contains("daemon"));
    }

    #[test]
    fn model_errors_pass_through() {
        let e = Error::from(gridconf_model::Error::MissingKey {
            key: "worker".to_string(),
        });
        assert!(format!("{}", e).contains("worker"));
    }
}

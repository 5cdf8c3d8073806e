use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("bemed component name \"{name}\" already defined in {file} line {line}")]
    DuplicateName {
        name: String,
        file: String,
        line: usize,
    },

    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    #[error("failed to emit transformed module: {0}")]
    Emit(#[from] std::io::Error),
}

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("vfs error: {0}")]
    Vfs(#[from] vfs::VfsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Values(#[from] helmchk_values::DocumentError),

    #[error("{0}")]
    TemplateParse(#[from] helmchk_template::ParseError),

    #[error("{0}")]
    Resolution(#[from] helmchk_ir::ResolutionError),

    #[error("{0}")]
    Exceptions(#[from] helmchk_diff::ExceptionsError),

    #[error("invalid path: {}", path.display())]
    InvalidChartDir { path: PathBuf },

    #[error("the Helm chart does not contain a values.yaml file: {}", path.display())]
    MissingValuesFile { path: PathBuf },

    #[error("the Helm chart does not contain a templates directory: {}", path.display())]
    MissingTemplatesDir { path: PathBuf },

    #[error("values.yaml and templates are not in sync")]
    NotInSync,
}

pub type CliResult<T> = std::result::Result<T, CliError>;

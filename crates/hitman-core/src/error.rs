use thiserror::Error;

#[derive(Debug, Error)]
pub enum HitmanError {
    #[error("cannot find `config.txt` in {0}")]
    ConfigNotFound(String),

    #[error("no experiment title: pass --title or set `title` in config.txt")]
    TitleMissing,

    #[error("missing credential: set the {0} environment variable")]
    MissingCredential(&'static str),

    #[error("invalid amount '{0}': expected a positive USD value like 1.50")]
    InvalidAmount(String),

    #[error("invalid batch parameter: {0}")]
    InvalidBatch(String),

    #[error("could not find HIT ID `{0}`")]
    HitNotFound(String),

    #[error("could not find a HIT with {key} `{value}`")]
    NoMatchingHit { key: &'static str, value: String },

    #[error("worker `{worker}` has no assignment on HIT `{hit}`")]
    WorkerNotFound { worker: String, hit: String },

    #[error("marketplace error {kind}: {message}")]
    Remote {
        kind: String,
        code: Option<String>,
        message: String,
    },

    #[error("unexpected marketplace response: {0}")]
    Protocol(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HitmanError {
    /// True for errors that name a target which does not exist remotely.
    pub fn is_missing_target(&self) -> bool {
        matches!(
            self,
            HitmanError::HitNotFound(_)
                | HitmanError::NoMatchingHit { .. }
                | HitmanError::WorkerNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HitmanError>;

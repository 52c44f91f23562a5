use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::ConfigError;
use crate::naming::pascal_case;

/// Where a service's OpenAPI document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    /// Fetched over HTTP(S).
    Http(Url),
    /// Read from the local filesystem (bare path or `file://` URL).
    File(PathBuf),
}

impl SpecSource {
    /// Interpret a document address.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| ConfigError::InvalidSource {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty address"));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|err| invalid(&err.to_string()))?;
            return Ok(Self::Http(url));
        }

        if trimmed.starts_with("file://") {
            let url = Url::parse(trimmed).map_err(|err| invalid(&err.to_string()))?;
            let path = url
                .to_file_path()
                .map_err(|()| invalid("not a local file URL"))?;
            return Ok(Self::File(path));
        }

        Ok(Self::File(PathBuf::from(trimmed)))
    }
}

impl fmt::Display for SpecSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One backend service taking part in the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSource {
    /// Lowercase id, used as the output directory name.
    pub id: String,
    /// Where its OpenAPI document is read from.
    pub source: SpecSource,
}

impl ServiceSource {
    /// Validate `id` and pair it with its document source.
    pub fn new(id: &str, source: SpecSource) -> Result<Self, ConfigError> {
        if !is_valid_id(id) {
            return Err(ConfigError::InvalidServiceId(id.to_string()));
        }
        Ok(Self {
            id: id.to_string(),
            source,
        })
    }

    /// PascalCase form used as the collision prefix (`booking` -> `Booking`).
    pub fn display_name(&self) -> String {
        pascal_case(&self.id)
    }
}

/// Environment variable holding the document address of a service.
pub fn env_var_for(id: &str) -> String {
    format!("{}_OPENAPI_URL", id.to_ascii_uppercase().replace('-', "_"))
}

/// Build the service list from ids, looking addresses up through `lookup`.
///
/// An entry may also carry its address inline as `id=source`, in which case
/// no lookup happens for it.
pub fn resolve_services<F>(ids: &[String], lookup: F) -> Result<Vec<ServiceSource>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut seen = HashSet::new();
    let mut services = Vec::with_capacity(ids.len());

    for raw in ids {
        let (id, inline) = match raw.split_once('=') {
            Some((id, source)) => (id.trim(), Some(source.to_string())),
            None => (raw.trim(), None),
        };

        if !seen.insert(id.to_string()) {
            return Err(ConfigError::DuplicateService(id.to_string()));
        }

        let address = match inline {
            Some(address) => address,
            None => {
                let var = env_var_for(id);
                lookup(&var).ok_or_else(|| ConfigError::MissingEnv {
                    service: id.to_string(),
                    var,
                })?
            }
        };

        services.push(ServiceSource::new(id, SpecSource::parse(&address)?)?);
    }

    if services.len() < 2 {
        return Err(ConfigError::TooFewServices(services.len()));
    }

    Ok(services)
}

fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

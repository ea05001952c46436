use std::fmt::{Display, Formatter};

use serde::Serialize;

const TAG_DELIMITER: char = ':';
const REGISTRY_REPOSITORY_DELIMITER: char = '/';
const DEFAULT_TAG: &str = "latest";

/// Registry-qualified address of a container image, as understood by the scan backends.
///
/// Built with [`ImageIdentity::parse`], which never fails. A reference that cannot be split into a
/// registry host and a repository path yields an empty repository; use [`ImageIdentity::is_valid`]
/// before handing the identity to a backend.
#[derive(PartialEq, Eq, Hash, Clone, Debug, Serialize)]
pub struct ImageIdentity {
    reference: String,
    registry_host: Option<String>,
    repository: String,
    tag: String,
}

impl ImageIdentity {
    /// Splits `[registry-host/]repository[:tag]` into its parts.
    ///
    /// The last `:`-separated segment is the tag only if it has no `/` in it, so a registry port
    /// (`host:5000/repo`) is not mistaken for a tag. The first `/`-separated segment is taken as the
    /// registry host only when it contains a `.` or a `:`.
    pub fn parse(image_name: &str) -> Self {
        let (base, tag) = match image_name.rsplit_once(TAG_DELIMITER) {
            Some((base, tag)) if !tag.contains(REGISTRY_REPOSITORY_DELIMITER) => (base, tag),
            _ => (image_name, DEFAULT_TAG),
        };

        let (registry_host, repository) = match base.split_once(REGISTRY_REPOSITORY_DELIMITER) {
            Some((host, repository)) if host.contains('.') || host.contains(':') => {
                (Some(host.to_string()), repository.to_string())
            }
            _ => (None, String::new()),
        };

        Self {
            reference: image_name.to_string(),
            registry_host,
            repository,
            tag: tag.to_string(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn registry_host(&self) -> Option<&str> {
        self.registry_host.as_deref()
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_valid(&self) -> bool {
        !self.repository.is_empty() && !self.tag.is_empty()
    }
}

impl Display for ImageIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

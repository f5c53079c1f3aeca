use std::collections::BTreeSet;

use vfs::VfsPath;

#[derive(Debug, thiserror::Error)]
pub enum ExceptionsError {
    #[error("failed to read exceptions file {path}")]
    Read {
        path: String,
        #[source]
        source: vfs::VfsError,
    },
}

/// Accepted mismatch lines.
///
/// An exception suppresses a mismatch whose rendered message is exactly equal
/// to it; there is no path matching. The usual way to create the file is to
/// redirect the output of a failing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exceptions {
    lines: BTreeSet<String>,
}

impl Exceptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One exception per line. Trailing whitespace (including `\r`) is
    /// ignored and so are blank lines.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        text.lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Read and parse the exceptions file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExceptionsError::Read`] if the file cannot be read.
    pub fn load(path: &VfsPath) -> Result<Self, ExceptionsError> {
        let text = path.read_to_string().map_err(|source| ExceptionsError::Read {
            path: path.as_str().to_string(),
            source,
        })?;
        let exceptions = Self::parse(&text);
        tracing::debug!(path = path.as_str(), count = exceptions.len(), "loaded exceptions");
        Ok(exceptions)
    }

    #[must_use]
    pub fn contains(&self, line: &str) -> bool {
        self.lines.contains(line)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines.iter().map(String::as_str)
    }
}

impl FromIterator<String> for Exceptions {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for Exceptions {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

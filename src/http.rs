use std::collections::HashMap;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::{MAX_REQUEST_HEAD, error::UpgradeError};

type Result<T> = std::result::Result<T, UpgradeError>;

/// Request header fields, keyed by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Insert a field. Repeated fields are joined with `", "`.
    pub fn insert(&mut self, name: &str, value: &str) {
        self.0
            .entry(name.trim().to_ascii_lowercase())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(value.trim());
            })
            .or_insert_with(|| value.trim().to_string());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// True if the comma separated field `name` contains `token`, ignoring case.
    #[must_use]
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get(name)
            .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Parsed HTTP/1.1 request line and headers.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Headers,
}

impl RequestHead {
    /// Read a request head, stopping right after the blank line.
    ///
    /// Bytes after the head stay in `reader`'s buffer.
    pub async fn read<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncBufRead + Unpin + ?Sized,
    {
        let mut total = 0;
        let mut line = String::new();

        read_head_line(reader, &mut line, &mut total).await?;
        let mut parts = line.split_whitespace();
        let (Some(method), Some(path), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(UpgradeError::MalformedRequest(line.trim_end().to_string()));
        };
        if !version.starts_with("HTTP/") {
            return Err(UpgradeError::MalformedRequest(line.trim_end().to_string()));
        }
        let (method, path, version) = (method.to_string(), path.to_string(), version.to_string());

        let mut headers = Headers::new();
        loop {
            read_head_line(reader, &mut line, &mut total).await?;
            let field = line.trim_end();
            if field.is_empty() {
                break;
            }
            let Some((name, value)) = field.split_once(':') else {
                return Err(UpgradeError::MalformedRequest(field.to_string()));
            };
            headers.insert(name, value);
        }

        Ok(Self { method, path, version, headers })
    }

    /// Path without any query string.
    #[must_use]
    pub fn route(&self) -> &str { self.path.split('?').next().unwrap_or_default() }
}

async fn read_head_line<R>(reader: &mut R, line: &mut String, total: &mut usize) -> Result<()>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    line.clear();
    // one byte past the budget is enough to tell the head is too large
    let budget = u64::try_from(MAX_REQUEST_HEAD - *total + 1).unwrap_or(u64::MAX);
    let n = (&mut *reader)
        .take(budget)
        .read_line(line)
        .await
        .map_err(UpgradeError::Read)?;
    if n == 0 {
        return Err(UpgradeError::Read(std::io::ErrorKind::UnexpectedEof.into()));
    }
    *total += n;
    if *total > MAX_REQUEST_HEAD {
        return Err(UpgradeError::HeadTooLarge);
    }
    if !line.ends_with('\n') {
        return Err(UpgradeError::Read(std::io::ErrorKind::UnexpectedEof.into()));
    }
    Ok(())
}

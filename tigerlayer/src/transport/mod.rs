//! Remote source transports.
//!
//! A [`Transport`] fetches one file from `<base_path>/<directory>/<filename>`
//! on a remote host. The FTP transport is the primary source and also
//! implements [`Catalog`] for listing layers and their archives; HTTPS is the
//! single-shot fallback.
//!
//! Both traits return boxed futures so the downloader and pipeline can hold
//! them as trait objects and tests can substitute mocks.

mod error;
mod ftp;
mod https;

pub use error::TransportError;
pub use ftp::FtpTransport;
pub use https::HttpsTransport;

use futures::future::BoxFuture;

/// Fetches remote source files over one protocol.
pub trait Transport: Send + Sync {
    /// Protocol name recorded in the ledger (`ftp`, `https`).
    fn protocol(&self) -> &str;

    /// Fetch the complete contents of `<directory>/<filename>`.
    fn fetch<'a>(
        &'a self,
        directory: &'a str,
        filename: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, TransportError>>;
}

/// Lists the remote dataset.
pub trait Catalog: Send + Sync {
    /// Layer directories under the base path.
    fn list_layers(&self) -> BoxFuture<'_, Result<Vec<String>, TransportError>>;

    /// Archive names inside one layer directory.
    fn list_files<'a>(&'a self, layer: &'a str) -> BoxFuture<'a, Result<Vec<String>, TransportError>>;
}

/// Last path component of a listing entry; some servers return full paths.
pub(crate) fn entry_name(entry: &str) -> &str {
    let trimmed = entry.trim().trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Layer directories: entries without an extension.
pub fn layer_entries<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut layers: Vec<String> = entries
        .into_iter()
        .map(|e| entry_name(e.as_ref()).to_string())
        .filter(|name| !name.is_empty() && !name.contains('.'))
        .collect();
    layers.sort();
    layers.dedup();
    layers
}

/// Archive entries: names ending in `.zip`.
pub fn zip_entries<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut files: Vec<String> = entries
        .into_iter()
        .map(|e| entry_name(e.as_ref()).to_string())
        .filter(|name| name.to_lowercase().ends_with(".zip"))
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Join the dataset base path with a relative component.
pub(crate) fn remote_path(base_path: &str, component: &str) -> String {
    format!("{}/{}", base_path.trim_end_matches('/'), component)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_entries() {
        let listing = ["ROADS", "COUNTY/", "README.txt", "/geo/tiger/TIGER2023/STATE", "ROADS"];
        assert_eq!(layer_entries(listing), vec!["COUNTY", "ROADS", "STATE"]);
    }

    #[test]
    fn test_zip_entries() {
        let listing = [
            "tl_2023_01_state.zip",
            "tl_2023_01_state.shp.xml",
            "/geo/tiger/TIGER2023/STATE/tl_2023_02_state.ZIP",
            "notes.txt",
        ];
        assert_eq!(
            zip_entries(listing),
            vec!["tl_2023_01_state.zip", "tl_2023_02_state.ZIP"]
        );
    }

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path("/geo/tiger/", "ROADS"), "/geo/tiger/ROADS");
        assert_eq!(remote_path("/geo", "ROADS"), "/geo/ROADS");
    }
}

//! Anonymous FTP transport.
//!
//! Each call opens its own passive-mode session with `suppaftp`, logs in
//! anonymously, switches to binary, changes into the target directory and
//! runs one `RETR` or `NLST`. The client is blocking, so sessions run on the
//! blocking pool.

use futures::future::BoxFuture;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, trace};

use super::{layer_entries, remote_path, zip_entries, Catalog, Transport, TransportError};

const PROTOCOL: &str = "ftp";
const DEFAULT_PORT: u16 = 21;
const ANONYMOUS: &str = "anonymous";

/// Primary transport: anonymous FTP against the dataset host.
#[derive(Debug, Clone)]
pub struct FtpTransport {
    host: String,
    port: u16,
    base_path: String,
}

impl FtpTransport {
    pub fn new(host: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            base_path: base_path.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn retrieve(&self, directory: &str, filename: &str) -> Result<Vec<u8>, TransportError> {
        let dir = remote_path(&self.base_path, directory);
        let path = format!("{}/{}", dir, filename);
        let host = self.host.clone();
        let port = self.port;
        let name = filename.to_string();

        let data = run_blocking(move || {
            let mut ftp = open_session(&host, port, &dir)?;
            let data = ftp
                .retr_as_buffer(&name)
                .map(|cursor| cursor.into_inner())
                .map_err(|e| transfer_err(&format!("{}/{}", dir, name), e))?;
            close_session(ftp);
            Ok(data)
        })
        .await?;

        debug!(host = %self.host, path = %path, bytes = data.len(), "FTP download complete");
        Ok(data)
    }

    async fn list(&self, dir: String) -> Result<Vec<String>, TransportError> {
        let host = self.host.clone();
        let port = self.port;

        run_blocking(move || {
            let mut ftp = open_session(&host, port, &dir)?;
            let names = ftp.nlst(None).map_err(|e| transfer_err(&dir, e))?;
            close_session(ftp);
            Ok(names)
        })
        .await
    }
}

/// Logged-in binary session positioned in `dir`.
fn open_session(host: &str, port: u16, dir: &str) -> Result<FtpStream, TransportError> {
    let connect_err = |e: FtpError| TransportError::Connect {
        host: host.to_string(),
        message: e.to_string(),
    };

    let mut ftp = FtpStream::connect((host, port)).map_err(connect_err)?;
    // Data connections go to the control peer; advertised PASV addresses are
    // often private.
    ftp.set_passive_nat_workaround(true);
    ftp.login(ANONYMOUS, ANONYMOUS).map_err(connect_err)?;
    ftp.transfer_type(FileType::Binary).map_err(connect_err)?;
    ftp.cwd(dir).map_err(|e| transfer_err(dir, e))?;

    trace!(host, dir, "FTP session ready");
    Ok(ftp)
}

fn close_session(mut ftp: FtpStream) {
    // The transfer already completed; a failed goodbye changes nothing.
    let _ = ftp.quit();
}

fn transfer_err(path: &str, error: FtpError) -> TransportError {
    TransportError::Transfer {
        protocol: PROTOCOL,
        path: path.to_string(),
        message: error.to_string(),
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, TransportError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TransportError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransportError::Task(e.to_string()))?
}

impl Transport for FtpTransport {
    fn protocol(&self) -> &str {
        PROTOCOL
    }

    fn fetch<'a>(
        &'a self,
        directory: &'a str,
        filename: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, TransportError>> {
        Box::pin(self.retrieve(directory, filename))
    }
}

impl Catalog for FtpTransport {
    fn list_layers(&self) -> BoxFuture<'_, Result<Vec<String>, TransportError>> {
        Box::pin(async move { Ok(layer_entries(self.list(self.base_path.clone()).await?)) })
    }

    fn list_files<'a>(&'a self, layer: &'a str) -> BoxFuture<'a, Result<Vec<String>, TransportError>> {
        Box::pin(async move {
            let dir = remote_path(&self.base_path, layer);
            Ok(zip_entries(self.list(dir).await?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Scripted single-session FTP server serving one file and one listing.
    async fn serve_once(listener: TcpListener, file: &'static [u8], listing: &'static str) {
        let (control, _) = listener.accept().await.unwrap();
        let (read, mut write) = control.into_split();
        let mut lines = BufReader::new(read).lines();
        write.write_all(b"220 Ready\r\n").await.unwrap();

        let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let data_port = data_listener.local_addr().unwrap().port();

        while let Some(line) = lines.next_line().await.unwrap() {
            let (verb, _) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            match verb {
                "USER" => write.write_all(b"331 Send password\r\n").await.unwrap(),
                "PASS" => write.write_all(b"230 Logged in\r\n").await.unwrap(),
                "TYPE" => write.write_all(b"200 Binary\r\n").await.unwrap(),
                "CWD" => write.write_all(b"250 Okay\r\n").await.unwrap(),
                "PASV" => {
                    let reply = format!(
                        "227 Entering Passive Mode (10,0,0,1,{},{})\r\n",
                        data_port / 256,
                        data_port % 256
                    );
                    write.write_all(reply.as_bytes()).await.unwrap();
                }
                "RETR" | "NLST" => {
                    let payload: &[u8] = if verb == "RETR" { file } else { listing.as_bytes() };
                    let (mut data, _) = data_listener.accept().await.unwrap();
                    write.write_all(b"150 Opening\r\n").await.unwrap();
                    data.write_all(payload).await.unwrap();
                    drop(data);
                    write.write_all(b"226 Done\r\n").await.unwrap();
                }
                "QUIT" => {
                    write.write_all(b"221 Bye\r\n").await.unwrap();
                    break;
                }
                _ => write.write_all(b"502 Not implemented\r\n").await.unwrap(),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_from_scripted_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_once(listener, b"PK-archive", ""));

        let ftp = FtpTransport::new("127.0.0.1", "/geo/tiger").with_port(port);
        let data = ftp.fetch("COUNTY", "tl_2023_us_county.zip").await.unwrap();

        assert_eq!(data, b"PK-archive");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_list_files_filters_archives() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_once(
            listener,
            b"",
            "b.zip\r\nreadme.txt\r\na.zip\r\n",
        ));

        let ftp = FtpTransport::new("127.0.0.1", "/geo/tiger").with_port(port);
        let files = ftp.list_files("COUNTY").await.unwrap();

        assert_eq!(files, vec!["a.zip", "b.zip"]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connect_error() {
        let ftp = FtpTransport::new("127.0.0.1", "/geo").with_port(1);

        let err = ftp.fetch("ROADS", "a.zip").await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }), "{err}");
    }
}

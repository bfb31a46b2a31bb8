//! The contract every upload backend implements.

use async_trait::async_trait;
use droplift_common::{Error, ErrorList, ResponseInfo, Result, UploadResult};
use reqwest::multipart::Part;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

/// A remote storage service.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Display name, used for the error list title.
    fn service_name(&self) -> &str;

    /// Upload `source`.
    ///
    /// Problems the service reports go into `errors`; an `Err` means the
    /// request could not be made or the configuration is unusable.
    async fn upload(&self, source: UploadSource, errors: &mut ErrorList) -> Result<UploadResult>;
}

/// An opened file on its way to a backend.
///
/// Owns the file handle; dropping it on any path closes the file.
#[derive(Debug)]
pub struct UploadSource {
    pub file: tokio::fs::File,
    pub len: u64,
    /// Sanitized outgoing name.
    pub file_name: String,
    pub mime: String,
    /// Read chunk size in bytes.
    pub buffer_size: usize,
}

impl UploadSource {
    /// Open `path` for upload under `file_name`.
    pub async fn open(path: &Path, file_name: String, buffer_size: usize) -> Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let mime = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file,
            len,
            file_name,
            mime,
            buffer_size,
        })
    }

    /// Stream the file as a request body.
    pub fn into_body(self) -> reqwest::Body {
        let stream = ReaderStream::with_capacity(self.file, self.buffer_size.max(1));
        reqwest::Body::wrap_stream(stream)
    }

    /// Read the whole file in `buffer_size` chunks.
    pub async fn read_all(mut self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.len as usize);
        let mut chunk = vec![0u8; self.buffer_size.max(1)];
        loop {
            let read = self.file.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
        }
        Ok(data)
    }

    /// Stream the file as a multipart part carrying its name and type.
    pub fn into_part(self) -> Result<Part> {
        let file_name = self.file_name.clone();
        let mime = self.mime.clone();
        let len = self.len;
        Part::stream_with_length(self.into_body(), len)
            .file_name(file_name)
            .mime_str(&mime)
            .map_err(transport)
    }
}

/// Map a client error to [`Error::Transport`].
pub fn transport(e: reqwest::Error) -> Error {
    Error::transport(e.to_string())
}

/// Read status, final URL, headers and body.
pub async fn read_response(response: reqwest::Response) -> Result<ResponseInfo> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = response.text().await.map_err(transport)?;
    Ok(ResponseInfo {
        status,
        url,
        headers,
        body,
    })
}

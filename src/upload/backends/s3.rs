//! S3-compatible object storage through `object_store`.

use crate::config::AmazonS3Config;
use crate::upload::backend::{UploadSource, Uploader};
use crate::upload::registry::BackendContext;
use async_trait::async_trait;
use droplift_common::{Error, ErrorList, Result, UploadResult};
use droplift_custom::urls::fix_prefix;
use droplift_naming::{Clock, Counters, NameContext, NameTemplate};
use http::{HeaderMap, HeaderValue};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, AttributeValue, Attributes, ClientOptions, ObjectStore, PutOptions, PutPayload,
};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

pub const SERVICE_NAME: &str = "Amazon S3";

pub struct AmazonS3Uploader {
    store: AmazonS3,
    config: AmazonS3Config,
    /// Base URL of the bucket; object URLs are this plus the key.
    bucket_url: Url,
    clock: Arc<dyn Clock>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for AmazonS3Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmazonS3Uploader")
            .field("bucket_url", &self.bucket_url.as_str())
            .field("bucket", &self.config.bucket)
            .finish_non_exhaustive()
    }
}

impl AmazonS3Uploader {
    pub fn from_context(ctx: &BackendContext) -> Result<Self> {
        let config = ctx.config.uploaders.amazon_s3.clone();
        if !config.has_secret() || config.access_key_id.trim().is_empty() {
            return Err(Error::config("Amazon S3 credentials are not configured"));
        }
        if config.bucket.trim().is_empty() {
            return Err(Error::config("Amazon S3 bucket is not configured"));
        }

        let endpoint = match &config.endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => fix_prefix(endpoint),
            _ => format!("https://s3.{}.amazonaws.com", config.region),
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("Invalid Amazon S3 endpoint '{}': {}", endpoint, e)))?;
        let bucket_url = bucket_url(&endpoint, &config.bucket, config.use_path_style)?;

        // Virtual-hosted requests go straight to the bucket host.
        let store_endpoint = if config.use_path_style {
            endpoint.as_str().trim_end_matches('/').to_string()
        } else {
            bucket_url.as_str().trim_end_matches('/').to_string()
        };

        let mut options = ClientOptions::new();
        if config.public_acl {
            let mut headers = HeaderMap::new();
            headers.insert("x-amz-acl", HeaderValue::from_static("public-read"));
            options = options.with_default_headers(headers);
        }

        let store = AmazonS3Builder::new()
            .with_access_key_id(config.access_key_id.clone())
            .with_secret_access_key(config.secret_access_key.clone())
            .with_region(config.region.clone())
            .with_bucket_name(config.bucket.clone())
            .with_endpoint(store_endpoint)
            .with_virtual_hosted_style_request(!config.use_path_style)
            .with_allow_http(endpoint.scheme() == "http")
            .with_client_options(options)
            .build()
            .map_err(|e| Error::config(format!("Invalid Amazon S3 settings: {}", e)))?;

        Ok(Self {
            store,
            config,
            bucket_url,
            clock: ctx.clock.clone(),
            counters: ctx.counters.clone(),
        })
    }

    /// Object key: rendered prefix followed by the file name.
    fn object_key(&self, file_name: &str) -> String {
        let mut ctx = NameContext::from_clock(self.clock.as_ref(), self.counters.clone());
        let prefix = NameTemplate::compile(&self.config.object_prefix).render(&mut ctx);
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", prefix, file_name)
        }
    }

    /// Public URL of `key`, on the custom domain when one is set.
    fn public_url(&self, key: &str) -> String {
        let key = encode_key(key);
        match &self.config.custom_domain {
            Some(domain) if !domain.trim().is_empty() => {
                format!("{}/{}", fix_prefix(domain.trim_end_matches('/')), key)
            }
            _ => format!("{}/{}", self.bucket_url.as_str().trim_end_matches('/'), key),
        }
    }
}

/// Bucket base URL: `endpoint/bucket` for path-style, `bucket.host` otherwise.
/// A non-default port is kept.
fn bucket_url(endpoint: &Url, bucket: &str, path_style: bool) -> Result<Url> {
    let host = endpoint
        .host_str()
        .ok_or_else(|| Error::config("Amazon S3 endpoint has no host"))?;
    let host = match endpoint.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let base = if path_style {
        format!(
            "{}://{}/{}",
            endpoint.scheme(),
            host,
            urlencoding::encode(bucket)
        )
    } else {
        format!("{}://{}.{}", endpoint.scheme(), bucket, host)
    };
    Url::parse(&base).map_err(|e| Error::config(format!("Invalid Amazon S3 bucket URL: {}", e)))
}

/// Percent-encode each segment of `key`, keeping the separators.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn store_error(e: object_store::Error) -> Error {
    Error::backend(SERVICE_NAME, e.to_string())
}

#[async_trait]
impl Uploader for AmazonS3Uploader {
    fn service_name(&self) -> &str {
        SERVICE_NAME
    }

    async fn upload(&self, source: UploadSource, _errors: &mut ErrorList) -> Result<UploadResult> {
        let key = self.object_key(&source.file_name);
        let location = ObjectPath::from(key.as_str());

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(source.mime.clone()),
        );
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let size = source.len;
        let payload = PutPayload::from(source.read_all().await?);
        let started = Instant::now();

        tracing::debug!(key = %key, bucket = %self.config.bucket, "Uploading object");

        let put = self
            .store
            .put_opts(&location, payload, options)
            .await
            .map_err(|e| {
                tracing::debug!(
                    error = %e,
                    key = %key,
                    size_bytes = size,
                    duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                store_error(e)
            })?;

        tracing::debug!(
            key = %key,
            e_tag = put.e_tag.as_deref().unwrap_or(""),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(UploadResult::from_url(self.public_url(&key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use droplift_naming::FixedClock;
    use reqwest::Client;

    fn context(s3: AmazonS3Config) -> BackendContext {
        let mut config = Config::default();
        config.uploaders.amazon_s3 = s3;
        let now = chrono::DateTime::parse_from_rfc3339("2024-03-05T13:04:05+00:00").unwrap();
        BackendContext {
            config: Arc::new(config),
            client: Client::new(),
            counters: Arc::new(Counters::new()),
            clock: Arc::new(FixedClock(now)),
            word_list: None,
        }
    }

    fn uploader(s3: AmazonS3Config) -> AmazonS3Uploader {
        AmazonS3Uploader::from_context(&context(s3)).unwrap()
    }

    fn s3() -> AmazonS3Config {
        AmazonS3Config {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            bucket: "shots".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_key_keeps_separators() {
        assert_eq!(encode_key("a b/c+d.png"), "a%20b/c%2Bd.png");
        assert_eq!(encode_key("é.png"), "%C3%A9.png");
    }

    #[test]
    fn test_virtual_host_url() {
        let uploader = uploader(s3());
        assert_eq!(
            uploader.public_url("2024/a b.png"),
            "https://shots.s3.us-east-1.amazonaws.com/2024/a%20b.png"
        );
    }

    #[test]
    fn test_path_style_url_keeps_port() {
        let uploader = uploader(AmazonS3Config {
            endpoint: Some("http://127.0.0.1:9000".into()),
            use_path_style: true,
            ..s3()
        });
        assert_eq!(uploader.public_url("a.png"), "http://127.0.0.1:9000/shots/a.png");
    }

    #[test]
    fn test_object_key_renders_prefix() {
        let prefixed = uploader(AmazonS3Config {
            object_prefix: "/uploads/%y/%mo/".into(),
            ..s3()
        });
        assert_eq!(prefixed.object_key("a.png"), "uploads/2024/03/a.png");
        assert_eq!(uploader(s3()).object_key("a.png"), "a.png");
    }

    #[test]
    fn test_custom_domain_url() {
        let uploader = uploader(AmazonS3Config {
            custom_domain: Some("cdn.example.com/".into()),
            ..s3()
        });
        assert_eq!(
            uploader.public_url("a b.png"),
            "https://cdn.example.com/a%20b.png"
        );
    }

    #[test]
    fn test_store_error_is_attributed_to_service() {
        let err = store_error(object_store::Error::Generic {
            store: "S3",
            source: "connection reset".into(),
        });
        assert!(matches!(err, Error::Backend { ref service, .. } if service == SERVICE_NAME));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_bucket_is_config_error() {
        let result = AmazonS3Uploader::from_context(&context(AmazonS3Config {
            bucket: String::new(),
            ..s3()
        }));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let result = AmazonS3Uploader::from_context(&context(AmazonS3Config {
            secret_access_key: String::new(),
            ..s3()
        }));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

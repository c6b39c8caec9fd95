use crate::config::{Config, Credentials};
use crate::error::{Result, SyncError};
use crate::registry::{ModRegistry, ModResult, Payload};
use reqwest::blocking::{Client, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("modsync/", env!("CARGO_PKG_VERSION"));

/// Blocking client for the Factorio mod portal.
pub struct ModPortalClient {
    client: Client,
    api_url: Url,
    download_url: Url,
    credentials: Credentials,
}

impl ModPortalClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Self::build_client(config.timeout)?,
            api_url: config.registry_url.clone(),
            download_url: config.download_url.clone(),
            credentials: config.credentials.clone(),
        })
    }

    fn build_client(timeout: Option<Duration>) -> Result<Client> {
        Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(SyncError::Http)
    }

    /// `<api>?namelist=a&namelist=b...`
    fn metadata_url(&self, names: &[String]) -> Url {
        let mut url = self.api_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for name in names {
                query.append_pair("namelist", name);
            }
        }
        url
    }

    /// `<base>/<download_path>?username=..&token=..`
    ///
    /// Relative paths are appended to the base path, so a mirror living under
    /// a prefix keeps it. Absolute URLs must share the base's origin.
    fn release_url(&self, download_path: &str) -> Result<Url> {
        let invalid = |e: url::ParseError| {
            SyncError::Registry(format!("Invalid download path '{download_path}': {e}"))
        };

        let mut url = match Url::parse(download_path) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let mut base = self.download_url.clone();
                base.set_query(None);
                base.set_fragment(None);
                let joined = format!(
                    "{}/{}",
                    base.as_str().trim_end_matches('/'),
                    download_path.trim_start_matches('/')
                );
                Url::parse(&joined).map_err(invalid)?
            }
            Err(e) => return Err(invalid(e)),
        };

        if url.origin() != self.download_url.origin() {
            return Err(SyncError::Registry(format!(
                "Download path '{download_path}' points outside the registry origin"
            )));
        }

        url.query_pairs_mut()
            .append_pair("username", &self.credentials.username)
            .append_pair("token", &self.credentials.token);
        Ok(url)
    }

    fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(SyncError::Registry(format!(
            "HTTP {} from {}",
            status,
            redact(response.url())
        )))
    }
}

impl ModRegistry for ModPortalClient {
    fn fetch_metadata(&self, names: &[String]) -> Result<ModResult> {
        let url = self.metadata_url(names);
        debug!(url = %url, "Fetching mod metadata");

        let response = Self::ensure_success(self.client.get(url).send()?)?;
        let body = response.bytes()?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn download(&self, download_path: &str) -> Result<Payload> {
        let url = self.release_url(download_path)?;
        debug!(url = %redact(&url), "Downloading release");

        let response = Self::ensure_success(self.client.get(url).send()?)?;
        let len = response.content_length();
        Ok(Payload {
            reader: Box::new(response),
            len,
        })
    }
}

/// Render a URL with the `token` query parameter masked.
fn redact(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == "token" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), value)
        })
        .collect();

    if pairs.is_empty() {
        return masked.to_string();
    }

    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::FileConfig;
    use crate::utils::test_server::StubServer;

    fn client_with(registry_url: Option<&str>, download_url: Option<&str>) -> ModPortalClient {
        let cli = Cli {
            username: Some("alice".into()),
            token: Some("s3cr3t".into()),
            registry_url: registry_url.map(String::from),
            download_url: download_url.map(String::from),
            timeout: Some(5),
            ..Cli::default()
        };
        let config = Config::merge(&cli, FileConfig::default()).unwrap();
        ModPortalClient::new(&config).unwrap()
    }

    fn client() -> ModPortalClient {
        client_with(None, None)
    }

    fn stub_client(server: &StubServer) -> ModPortalClient {
        let api = format!("{}/api/mods", server.url);
        client_with(Some(&api), Some(&server.url))
    }

    #[test]
    fn metadata_url_repeats_namelist() {
        let url = client().metadata_url(&["alien-biomes".into(), "Krastorio2".into()]);
        assert_eq!(
            url.as_str(),
            "https://mods.factorio.com/api/mods?namelist=alien-biomes&namelist=Krastorio2"
        );
    }

    #[test]
    fn release_url_carries_credentials() {
        let url = client()
            .release_url("/download/alien-biomes/5e0b")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://mods.factorio.com/download/alien-biomes/5e0b?username=alice&token=s3cr3t"
        );
    }

    #[test]
    fn release_url_rejects_foreign_host() {
        let err = client()
            .release_url("https://evil.example.com/payload")
            .unwrap_err();
        assert!(matches!(err, SyncError::Registry(_)));
    }

    #[test]
    fn release_url_keeps_mirror_prefix() {
        for base in [
            "https://mirror.example.com/factorio",
            "https://mirror.example.com/factorio/",
        ] {
            let url = client_with(None, Some(base))
                .release_url("/download/alien-biomes/5e0b")
                .unwrap();
            assert_eq!(
                url.as_str(),
                "https://mirror.example.com/factorio/download/alien-biomes/5e0b?username=alice&token=s3cr3t"
            );
        }
    }

    #[test]
    fn release_url_accepts_absolute_url_on_same_origin() {
        let url = client()
            .release_url("https://mods.factorio.com/download/alien-biomes/5e0b")
            .unwrap();
        assert_eq!(url.path(), "/download/alien-biomes/5e0b");
    }

    #[test]
    fn release_url_rejects_other_scheme_or_port() {
        for path in [
            "http://mods.factorio.com/download/alien-biomes/5e0b",
            "https://mods.factorio.com:8443/download/alien-biomes/5e0b",
        ] {
            let err = client().release_url(path).unwrap_err();
            assert!(matches!(err, SyncError::Registry(_)), "{path}");
        }
    }

    #[test]
    fn fetch_metadata_decodes_results() {
        let server = StubServer::respond(
            "200 OK",
            r#"{"results":[{"name":"alien-biomes","title":"Alien Biomes","releases":[
                {"download_url":"/download/alien-biomes/1","file_name":"alien-biomes_0.6.8.zip",
                 "version":"0.6.8","sha1":"abc"}]}]}"#,
        );
        let result = stub_client(&server)
            .fetch_metadata(&["alien-biomes".into()])
            .unwrap();

        assert!(server.request().starts_with("GET /api/mods?namelist=alien-biomes HTTP/1.1"));
        assert_eq!(result.results[0].releases[0].version, "0.6.8");
    }

    #[test]
    fn registry_error_status_is_reported() {
        let server = StubServer::respond("503 Service Unavailable", "");
        let err = stub_client(&server)
            .fetch_metadata(&["alien-biomes".into()])
            .unwrap_err();
        server.request();

        match err {
            SyncError::Registry(msg) => assert!(msg.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_metadata_is_a_json_error() {
        let server = StubServer::respond("200 OK", "<html>maintenance</html>");
        let err = stub_client(&server)
            .fetch_metadata(&["alien-biomes".into()])
            .unwrap_err();
        server.request();

        assert!(matches!(err, SyncError::Json(_)));
    }

    #[test]
    fn download_error_status_hides_token() {
        let server = StubServer::respond("404 Not Found", "");
        let err = match stub_client(&server).download("/download/alien-biomes/1") {
            Ok(_) => panic!("download should fail"),
            Err(e) => e,
        };

        let request = server.request();
        assert!(request.contains("token=s3cr3t"));
        match err {
            SyncError::Registry(msg) => {
                assert!(msg.contains("404"));
                assert!(!msg.contains("s3cr3t"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn redact_masks_token() {
        let url = Url::parse("https://mods.factorio.com/d/x?username=alice&token=s3cr3t").unwrap();
        let shown = redact(&url);
        assert!(shown.contains("username=alice"));
        assert!(!shown.contains("s3cr3t"));
    }

    #[test]
    #[ignore] // Requires network access
    fn fetches_live_metadata() {
        let result = client().fetch_metadata(&["alien-biomes".into()]).unwrap();
        assert!(result.results.iter().any(|m| m.name == "alien-biomes"));
    }
}

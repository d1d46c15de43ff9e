//! HTTP environment: `PUT` / `DELETE {url}/{type}/{name}`.
//!
//! The import body is JSON:
//! `{ "meta": {...}, "files": { "<path>": "<text>" }, "params": {...} }`,
//! with `params` present only when the project has deployment params.
//! Non-2xx responses become [`RemoteError::Rejected`], except a 404 which is
//! reported as [`RemoteError::NotFound`].

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use url::Url;

use apivcs_core::{EnvironmentName, ProjectType};
use apivcs_detector::{ProjectFiles, ProjectMeta};
use apivcs_sync::{CallContext, ManagementApi, ProjectPayload, RemoteError};

#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: Url,
}

#[derive(Serialize)]
struct ImportBody<'a> {
    meta: &'a ProjectMeta,
    files: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<&'a str, &'a str>,
}

impl HttpApi {
    /// Fails unless `base_url` is an absolute URL that can carry a path.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid environment url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            bail!("environment url '{base_url}' cannot carry a path");
        }
        Ok(Self { base_url })
    }

    pub fn project_url(&self, project_type: ProjectType, name: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(project_type.slug()).push(name);
        }
        url
    }

    fn request(&self, method: &str, ctx: &CallContext, url: &Url) -> ureq::Request {
        let request = ureq::request_url(method, url);
        match ctx.remaining() {
            Some(left) => request.timeout(left),
            None => request,
        }
    }
}

impl ManagementApi for HttpApi {
    fn import_project(
        &self,
        ctx: &CallContext,
        _environment: &EnvironmentName,
        payload: &ProjectPayload,
    ) -> Result<(), RemoteError> {
        ctx.check()?;
        let body = import_body(payload)?;
        let url = self.project_url(payload.project_type, &payload.name);
        into_outcome(self.request("PUT", ctx, &url).send_json(body))
    }

    fn delete_project(
        &self,
        ctx: &CallContext,
        _environment: &EnvironmentName,
        project_type: ProjectType,
        name: &str,
    ) -> Result<(), RemoteError> {
        ctx.check()?;
        let url = self.project_url(project_type, name);
        into_outcome(self.request("DELETE", ctx, &url).call())
    }
}

fn import_body(payload: &ProjectPayload) -> Result<ImportBody<'_>, RemoteError> {
    Ok(ImportBody {
        meta: &payload.meta,
        files: as_text(&payload.files)?,
        params: as_text(&payload.params)?,
    })
}

fn as_text(files: &ProjectFiles) -> Result<BTreeMap<&str, &str>, RemoteError> {
    let mut text = BTreeMap::new();
    for (path, content) in files {
        let content = std::str::from_utf8(content)
            .map_err(|_| RemoteError::Transport(format!("{path} is not UTF-8 text")))?;
        text.insert(path.as_str(), content);
    }
    Ok(text)
}

fn into_outcome(result: Result<ureq::Response, ureq::Error>) -> Result<(), RemoteError> {
    match result {
        Ok(_) => Ok(()),
        Err(ureq::Error::Status(404, _)) => Err(RemoteError::NotFound),
        Err(ureq::Error::Status(status, response)) => Err(RemoteError::Rejected {
            status,
            message: response.into_string().unwrap_or_default().trim().to_string(),
        }),
        Err(ureq::Error::Transport(transport)) => {
            Err(RemoteError::Transport(transport.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    use apivcs_sync::CancelToken;

    fn ctx() -> CallContext {
        CallContext::new(Some(std::time::Duration::from_secs(5)), CancelToken::new())
    }

    fn env() -> EnvironmentName {
        EnvironmentName::from("dev")
    }

    fn files(entries: &[(&str, &[u8])]) -> ProjectFiles {
        entries
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_vec()))
            .collect()
    }

    fn payload(files: ProjectFiles) -> ProjectPayload {
        ProjectPayload {
            project_type: ProjectType::Api,
            name: "Foo".to_string(),
            relative_path: "apis/Foo".to_string(),
            fingerprint: "ff".to_string(),
            meta: ProjectMeta {
                version: Some("1.0.0".to_string()),
                ..ProjectMeta::default()
            },
            files,
            params_fingerprint: None,
            params: ProjectFiles::new(),
        }
    }

    #[test]
    fn project_url_encodes_names() {
        let api = HttpApi::new("https://apim.example.com/vcs/").unwrap();
        assert_eq!(
            api.project_url(ProjectType::ApiProduct, "Pizza Shack").as_str(),
            "https://apim.example.com/vcs/api_product/Pizza%20Shack"
        );
        assert_eq!(
            api.project_url(ProjectType::Api, "a/b").as_str(),
            "https://apim.example.com/vcs/api/a%2Fb"
        );
    }

    #[test]
    fn malformed_base_url_is_refused() {
        assert!(HttpApi::new("not a url").is_err());
        assert!(HttpApi::new("mailto:ops@example.com").is_err());
    }

    #[test]
    fn import_body_carries_meta_and_text_files() {
        let payload = payload(files(&[("api.yaml", b"name: Foo")]));
        let json = serde_json::to_value(import_body(&payload).unwrap()).unwrap();
        assert_eq!(json["files"]["api.yaml"], "name: Foo");
        assert_eq!(json["meta"]["version"], "1.0.0");
        assert!(json.get("params").is_none());
    }

    #[test]
    fn binary_content_is_refused() {
        let payload = payload(files(&[("icon.png", &[0xff, 0xfe, 0x00])]));
        assert!(matches!(
            import_body(&payload),
            Err(RemoteError::Transport(msg)) if msg.contains("icon.png")
        ));
    }

    #[test]
    fn import_puts_files_and_params() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("PUT", "/vcs/api/Foo")
            .match_body(Matcher::PartialJson(json!({
                "files": { "api.yaml": "name: Foo" },
                "params": { "params.yaml": "endpoint: qa" },
            })))
            .with_status(200)
            .create();

        let api = HttpApi::new(&format!("{}/vcs", server.url())).unwrap();
        let mut with_params = payload(files(&[("api.yaml", b"name: Foo")]));
        with_params.params = files(&[("params.yaml", b"endpoint: qa")]);
        with_params.params_fingerprint = Some("pp".to_string());

        assert_eq!(api.import_project(&ctx(), &env(), &with_params), Ok(()));
        mock.assert();
    }

    #[test]
    fn delete_maps_404_to_not_found() {
        let mut server = mockito::Server::new();
        let mock = server.mock("DELETE", "/vcs/api/Foo").with_status(404).create();

        let api = HttpApi::new(&format!("{}/vcs", server.url())).unwrap();
        let result = api.delete_project(&ctx(), &env(), ProjectType::Api, "Foo");
        assert_eq!(result, Err(RemoteError::NotFound));
        mock.assert();
    }

    #[test]
    fn delete_maps_server_error_to_rejected() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("DELETE", "/vcs/api/Foo")
            .with_status(500)
            .with_body("boom\n")
            .create();

        let api = HttpApi::new(&format!("{}/vcs", server.url())).unwrap();
        let result = api.delete_project(&ctx(), &env(), ProjectType::Api, "Foo");
        assert_eq!(
            result,
            Err(RemoteError::Rejected {
                status: 500,
                message: "boom".to_string()
            })
        );
        mock.assert();
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        let api = HttpApi::new("http://127.0.0.1:1/vcs").unwrap();
        let result = api.delete_project(&ctx(), &env(), ProjectType::Api, "Foo");
        assert!(matches!(result, Err(RemoteError::Transport(_))), "got: {result:?}");
    }
}

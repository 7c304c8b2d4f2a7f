//! Stateless request builder and response parser for web-client calls.
//!
//! # Design
//! `WebClient` holds only its configuration and carries no mutable state
//! between calls. `build` turns a descriptor and its parameter object into an
//! `HttpRequest`; `parse` runs an `HttpResponse` through the response
//! pipeline. The caller executes the round-trip in between, or hands a
//! `Transport` to `call`/`pages` to have it done for them.

use serde_json::Value;

use crate::calls::{GetLibrarySongs, GET_LIBRARY_SONGS};
use crate::config::ClientConfig;
use crate::descriptor::CallDescriptor;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::paging::{PageArgs, Pages};
use crate::processor;

/// Synchronous, stateless client for the music web service.
#[derive(Debug, Clone)]
pub struct WebClient {
    config: ClientConfig,
}

impl WebClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the request for one invocation of `call`.
    pub fn build<A>(&self, call: &CallDescriptor<A>, args: &A) -> Result<HttpRequest, ApiError> {
        let mut url = self
            .config
            .base_url()
            .join(call.path())
            .map_err(|e| ApiError::Serialization(format!("endpoint {}: {e}", call.path())))?;
        if !call.static_params().is_empty() {
            url.query_pairs_mut().extend_pairs(call.static_params());
        }

        let (content_type, body) = call.build_body(args).encode()?;
        tracing::debug!(
            call = call.name(),
            method = call.method().as_str(),
            url = %url,
            "built request"
        );

        Ok(HttpRequest {
            method: call.method(),
            url: url.into(),
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: Some(body),
            auth: call.auth(),
        })
    }

    /// Check the status and run the body through `call`'s response pipeline.
    pub fn parse<A>(&self, call: &CallDescriptor<A>, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response, 200)?;
        Ok(processor::process(call, &response.body)?)
    }

    /// Build, execute and parse one invocation.
    pub fn call<A, T>(&self, transport: &T, call: &CallDescriptor<A>, args: &A) -> Result<Value, ApiError>
    where
        T: Transport + ?Sized,
    {
        let request = self.build(call, args)?;
        let response = transport.execute(&request)?;
        self.parse(call, response)
    }

    /// Lazily walk every page of a paginated call.
    pub fn pages<'a, A, T>(
        &'a self,
        transport: &'a T,
        call: &'a CallDescriptor<A>,
        page_args: PageArgs<A>,
    ) -> Pages<'a, A, T>
    where
        T: Transport + ?Sized,
    {
        Pages::new(self, transport, call, page_args)
    }

    /// Every song in the library, concatenated across all chunks.
    pub fn load_all_songs<T>(&self, transport: &T) -> Result<Vec<Value>, ApiError>
    where
        T: Transport + ?Sized,
    {
        let mut songs = Vec::new();
        for page in self.pages(transport, &GET_LIBRARY_SONGS, GetLibrarySongs::page) {
            let mut page = page?;
            if let Some(Value::Array(chunk)) = page.get_mut("playlist").map(Value::take) {
                songs.extend(chunk);
            }
        }
        Ok(songs)
    }
}

/// Map unexpected status codes to `ApiError::Http`.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::{
        AddPlaylist, ReportBadSongMatch, ADD_PLAYLIST, REPORT_BAD_SONG_MATCH,
    };
    use crate::error::CallError;
    use crate::http::{AuthRequirements, HttpMethod};

    fn client() -> WebClient {
        WebClient::new(ClientConfig::new("http://localhost:3000/music").unwrap())
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_add_playlist_produces_form_request() {
        let req = client()
            .build(
                &ADD_PLAYLIST,
                &AddPlaylist {
                    title: "Road trip".to_string(),
                },
            )
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/music/services/addplaylist");
        assert_eq!(
            req.headers,
            vec![(
                "content-type".to_string(),
                "application/x-www-form-urlencoded".to_string()
            )]
        );
        assert_eq!(
            req.body.as_deref(),
            Some("json=%7B%22title%22%3A%22Road+trip%22%7D")
        );
        assert_eq!(req.auth, AuthRequirements::WEB_CLIENT);
    }

    #[test]
    fn requests_are_built_against_configured_base() {
        let c = client();
        assert_eq!(c.config().base_url().as_str(), "http://localhost:3000/music/");
        let req = c
            .build(&GET_LIBRARY_SONGS, &GetLibrarySongs::default())
            .unwrap();
        assert!(req.url.starts_with(c.config().base_url().as_str()));
    }

    #[test]
    fn build_appends_static_params() {
        let req = client()
            .build(
                &REPORT_BAD_SONG_MATCH,
                &ReportBadSongMatch {
                    song_ids: vec!["s1".to_string()],
                },
            )
            .unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/music/services/fixsongmatch?format=jsarray"
        );
        assert_eq!(req.body.as_deref(), Some(r#"[["",1],[["s1"]]]"#));
    }

    #[test]
    fn parse_accepts_valid_response() {
        let value = client()
            .parse(&ADD_PLAYLIST, ok(r#"{"id":"p1","title":"Mix","success":true}"#))
            .unwrap();
        assert_eq!(value["id"], "p1");
    }

    #[test]
    fn parse_rejects_unexpected_status() {
        let response = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: "internal error".to_string(),
        };
        let err = client().parse(&ADD_PLAYLIST, response).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
    }

    #[test]
    fn parse_bad_json() {
        let err = client().parse(&ADD_PLAYLIST, ok("not json")).unwrap_err();
        assert!(matches!(err, ApiError::Call(CallError::Parse(_))));
    }

    #[test]
    fn parse_service_failure() {
        let err = client()
            .parse(&ADD_PLAYLIST, ok(r#"{"success":false}"#))
            .unwrap_err();
        match err {
            ApiError::Call(CallError::Call(failure)) => assert_eq!(failure.call_name, "AddPlaylist"),
            other => panic!("expected call failure, got {other:?}"),
        }
    }

    #[test]
    fn parse_literal_mismatch() {
        let err = client()
            .parse(&REPORT_BAD_SONG_MATCH, ok("[[0],[1]]"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Call(CallError::Validation(_))));
    }
}

//! Verify request building and response parsing against the JSON vectors in
//! `test-vectors/`.
//!
//! Each vector file describes call inputs, the expected request, a simulated
//! response and either the expected value or the expected failure kind.
//! Payloads are compared as parsed JSON so field order does not matter.

use serde_json::Value;
use webcall_core::calls::{
    AddPlaylist, ChangePlaylistOrder, DeleteSongs, GetLibrarySongs, ReportBadSongMatch,
    ADD_PLAYLIST, CHANGE_PLAYLIST_ORDER, DELETE_SONGS, GET_LIBRARY_SONGS, REPORT_BAD_SONG_MATCH,
};
use webcall_core::{
    ApiError, CallDescriptor, CallError, ClientConfig, HttpMethod, HttpRequest, HttpResponse,
    WebClient,
};

const BASE_URL: &str = "http://localhost:3000/music/";

fn client() -> WebClient {
    WebClient::new(ClientConfig::new(BASE_URL).unwrap())
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

/// The JSON payload carried by a built request, whatever its encoding.
fn request_payload(req: &HttpRequest) -> Value {
    let body = req.body.as_deref().unwrap();
    let (_, content_type) = req.headers.iter().find(|(k, _)| k == "content-type").unwrap();
    if content_type == "application/x-www-form-urlencoded" {
        let (_, json) = url::form_urlencoded::parse(body.as_bytes())
            .find(|(k, _)| k == "json")
            .unwrap();
        serde_json::from_str(&json).unwrap()
    } else {
        serde_json::from_str(body).unwrap()
    }
}

/// Run every case in `raw` through `call`, building arguments with `args`.
fn check_vectors<A>(raw: &str, call: &CallDescriptor<A>, args: fn(&Value) -> A) {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    assert_eq!(vectors["call"], call.name());

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build(call, &args(&case["input"])).unwrap();
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        let mut expected_url = format!(
            "http://localhost:3000{}",
            expected_req["path"].as_str().unwrap()
        );
        if let Some(query) = expected_req.get("query").and_then(Value::as_str) {
            expected_url = format!("{expected_url}?{query}");
        }
        assert_eq!(req.url, expected_url, "{name}: url");
        assert_eq!(
            req.headers,
            vec![(
                "content-type".to_string(),
                expected_req["content_type"].as_str().unwrap().to_string()
            )],
            "{name}: headers"
        );
        assert_eq!(request_payload(&req), expected_req["payload"], "{name}: payload");
        assert!(req.auth.xsrf_token && req.auth.session_cookie, "{name}: auth");

        // Verify parse
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let result = c.parse(call, response);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            let matched = match expected_error.as_str().unwrap() {
                "ParseFailure" => matches!(err, ApiError::Call(CallError::Parse(_))),
                "CallFailure" => {
                    matches!(err, ApiError::Call(CallError::Call(ref f)) if f.call_name == call.name())
                }
                "ValidationFailure" => matches!(err, ApiError::Call(CallError::Validation(_))),
                "Http" => matches!(err, ApiError::Http { .. }),
                other => panic!("{name}: unknown expected_error: {other}"),
            };
            assert!(matched, "{name}: expected {expected_error}, got {err:?}");
        } else {
            assert_eq!(result.unwrap(), case["expected_result"], "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// AddPlaylist
// ---------------------------------------------------------------------------

#[test]
fn add_playlist_test_vectors() {
    check_vectors(
        include_str!("../../test-vectors/add_playlist.json"),
        &ADD_PLAYLIST,
        |input| AddPlaylist {
            title: input["title"].as_str().unwrap().to_string(),
        },
    );
}

// ---------------------------------------------------------------------------
// ChangePlaylistOrder
// ---------------------------------------------------------------------------

#[test]
fn change_playlist_order_test_vectors() {
    check_vectors(
        include_str!("../../test-vectors/change_playlist_order.json"),
        &CHANGE_PLAYLIST_ORDER,
        |input| ChangePlaylistOrder {
            playlist_id: input["playlistId"].as_str().unwrap().to_string(),
            song_ids_moving: strings(&input["songIds"]),
            entry_ids_moving: strings(&input["entryIds"]),
            after_entry_id: input.get("after").and_then(Value::as_str).map(str::to_string),
            before_entry_id: input.get("before").and_then(Value::as_str).map(str::to_string),
        },
    );
}

// ---------------------------------------------------------------------------
// DeleteSongs
// ---------------------------------------------------------------------------

#[test]
fn delete_songs_test_vectors() {
    check_vectors(
        include_str!("../../test-vectors/delete_songs.json"),
        &DELETE_SONGS,
        |input| match input.get("playlistId").and_then(Value::as_str) {
            Some(playlist_id) => DeleteSongs::from_playlist(
                playlist_id,
                strings(&input["songIds"]),
                strings(&input["entryIds"]),
            ),
            None => DeleteSongs::from_library(strings(&input["songIds"])),
        },
    );
}

// ---------------------------------------------------------------------------
// GetLibrarySongs
// ---------------------------------------------------------------------------

#[test]
fn get_library_songs_test_vectors() {
    check_vectors(
        include_str!("../../test-vectors/get_library_songs.json"),
        &GET_LIBRARY_SONGS,
        |input| {
            GetLibrarySongs::page(
                input
                    .get("continuationToken")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            )
        },
    );
}

// ---------------------------------------------------------------------------
// ReportBadSongMatch
// ---------------------------------------------------------------------------

#[test]
fn report_bad_song_match_test_vectors() {
    check_vectors(
        include_str!("../../test-vectors/report_bad_song_match.json"),
        &REPORT_BAD_SONG_MATCH,
        |input| ReportBadSongMatch {
            song_ids: strings(&input["songIds"]),
        },
    );
}

//! Calls made by the music web client.
//!
//! Each endpoint is a `static` descriptor plus a parameter object stating
//! every optional argument and its default. Adding an endpoint means adding
//! one of each here; the client and pipeline stay untouched.

use std::sync::LazyLock;

use serde_json::{json, Value};

use crate::descriptor::{
    truncate_array, BodyBuilder, CallDescriptor, CallDescriptorBuilder, RequestBody,
    ResponseContract,
};
use crate::http::{AuthRequirements, HttpMethod};
use crate::schema::{ObjectSchema, Schema};

/// Playlist id that addresses the whole library in `DeleteSongs`.
pub const LIBRARY_LIST_ID: &str = "all";

/// Response of `ReportBadSongMatch`. The service always answers this.
pub static BAD_MATCH_ACK: LazyLock<Value> = LazyLock::new(|| json!([[0], []]));

/// Start a web-client call: `POST` with both session credentials attached.
pub fn web_client_call<A>(
    name: &'static str,
    path: &'static str,
    build_body: BodyBuilder<A>,
) -> CallDescriptorBuilder<A> {
    CallDescriptor::builder(name, path, build_body)
        .method(HttpMethod::Post)
        .auth(AuthRequirements::WEB_CLIENT)
}

// ---------------------------------------------------------------------------
// Shared schemas
// ---------------------------------------------------------------------------

/// Metadata of one library track. Undeclared metadata is rejected so that
/// service-side additions show up as validation failures.
pub fn song_schema() -> Schema {
    ObjectSchema::closed()
        .field("id", Schema::string())
        .field("title", Schema::blank_string())
        .field("artist", Schema::blank_string())
        .field("album", Schema::blank_string())
        .field("albumArtist", Schema::blank_string())
        .field("composer", Schema::blank_string())
        .field("genre", Schema::blank_string())
        .field("durationMillis", Schema::Integer)
        .field("track", Schema::Integer)
        .field("disc", Schema::Integer)
        .field("year", Schema::Integer)
        .field("playCount", Schema::Integer)
        .field("rating", Schema::Integer)
        .field("type", Schema::Integer)
        .field("deleted", Schema::Boolean)
        .optional_field("totalTracks", Schema::Integer)
        .optional_field("totalDiscs", Schema::Integer)
        .optional_field("bitrate", Schema::Integer)
        .optional_field("creationDate", Schema::Integer)
        .optional_field("lastPlayed", Schema::Integer)
        .optional_field("comment", Schema::blank_string())
        .optional_field("albumArtUrl", Schema::string())
        .optional_field("matchedId", Schema::string())
        .optional_field("playlistEntryId", Schema::string())
        .optional_field("subjectToCuration", Schema::Boolean)
        .into()
}

pub fn song_array() -> Schema {
    Schema::array(song_schema())
}

fn string_array() -> Schema {
    Schema::array(Schema::string())
}

// ---------------------------------------------------------------------------
// AddPlaylist
// ---------------------------------------------------------------------------

/// Create a new playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPlaylist {
    pub title: String,
}

pub static ADD_PLAYLIST: LazyLock<CallDescriptor<AddPlaylist>> = LazyLock::new(|| {
    web_client_call("AddPlaylist", "services/addplaylist", |args: &AddPlaylist| {
        RequestBody::Form(json!({ "title": args.title }))
    })
    .schema(
        ObjectSchema::closed()
            .field("id", Schema::string())
            .field("title", Schema::string())
            .field("success", Schema::Boolean),
    )
    .build()
});

// ---------------------------------------------------------------------------
// AddToPlaylist
// ---------------------------------------------------------------------------

/// Append songs to a playlist, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToPlaylist {
    pub playlist_id: String,
    /// Must not be empty.
    pub song_ids: Vec<String>,
}

/// `type` of a song reference. The service accepts 1 for library tracks.
const SONG_REF_TYPE: u8 = 1;

pub static ADD_TO_PLAYLIST: LazyLock<CallDescriptor<AddToPlaylist>> = LazyLock::new(|| {
    web_client_call("AddToPlaylist", "services/addtoplaylist", |args: &AddToPlaylist| {
        let song_refs: Vec<Value> = args
            .song_ids
            .iter()
            .map(|id| json!({ "id": id, "type": SONG_REF_TYPE }))
            .collect();
        RequestBody::Form(json!({ "playlistId": args.playlist_id, "songRefs": song_refs }))
    })
    .schema(
        ObjectSchema::closed()
            .field("playlistId", Schema::string())
            .field(
                "songIds",
                Schema::array(
                    ObjectSchema::open()
                        .field("songId", Schema::string())
                        .field("playlistEntryId", Schema::string()),
                ),
            ),
    )
    .build()
});

// ---------------------------------------------------------------------------
// ChangePlaylistName
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePlaylistName {
    pub playlist_id: String,
    pub new_name: String,
}

pub static CHANGE_PLAYLIST_NAME: LazyLock<CallDescriptor<ChangePlaylistName>> =
    LazyLock::new(|| {
        web_client_call(
            "ChangePlaylistName",
            "services/modifyplaylist",
            |args: &ChangePlaylistName| {
                RequestBody::Form(json!({
                    "playlistId": args.playlist_id,
                    "playlistName": args.new_name,
                }))
            },
        )
        .schema(ObjectSchema::closed())
        .build()
    });

// ---------------------------------------------------------------------------
// ChangePlaylistOrder
// ---------------------------------------------------------------------------

/// Move a consecutive run of playlist entries.
///
/// `song_ids_moving` and `entry_ids_moving` must correspond one to one.
/// The anchors default to the boundary sentinel `""`: an absent
/// `after_entry_id` means the start of the playlist and an absent
/// `before_entry_id` means the end. `None` and `Some("")` are sent the same
/// way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePlaylistOrder {
    pub playlist_id: String,
    pub song_ids_moving: Vec<String>,
    pub entry_ids_moving: Vec<String>,
    pub after_entry_id: Option<String>,
    pub before_entry_id: Option<String>,
}

impl ChangePlaylistOrder {
    /// Reorder without explicit anchors; the service picks the position.
    pub fn new(playlist_id: &str, song_ids_moving: Vec<String>, entry_ids_moving: Vec<String>) -> Self {
        Self {
            playlist_id: playlist_id.to_string(),
            song_ids_moving,
            entry_ids_moving,
            after_entry_id: None,
            before_entry_id: None,
        }
    }

    pub fn after(mut self, entry_id: &str) -> Self {
        self.after_entry_id = Some(entry_id.to_string());
        self
    }

    pub fn before(mut self, entry_id: &str) -> Self {
        self.before_entry_id = Some(entry_id.to_string());
        self
    }
}

fn anchor(entry_id: &Option<String>) -> &str {
    entry_id.as_deref().unwrap_or("")
}

pub static CHANGE_PLAYLIST_ORDER: LazyLock<CallDescriptor<ChangePlaylistOrder>> =
    LazyLock::new(|| {
        web_client_call(
            "ChangePlaylistOrder",
            "services/changeplaylistorder",
            |args: &ChangePlaylistOrder| {
                RequestBody::Form(json!({
                    "playlistId": args.playlist_id,
                    "movedSongIds": args.song_ids_moving,
                    "movedEntryIds": args.entry_ids_moving,
                    "afterEntryId": anchor(&args.after_entry_id),
                    "beforeEntryId": anchor(&args.before_entry_id),
                }))
            },
        )
        .schema(
            ObjectSchema::closed()
                .field("afterEntryId", Schema::blank_string())
                .field("playlistId", Schema::string())
                .field("movedSongIds", string_array()),
        )
        .build()
    });

// ---------------------------------------------------------------------------
// DeletePlaylist
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlaylist {
    pub playlist_id: String,
}

pub static DELETE_PLAYLIST: LazyLock<CallDescriptor<DeletePlaylist>> = LazyLock::new(|| {
    web_client_call("DeletePlaylist", "services/deleteplaylist", |args: &DeletePlaylist| {
        RequestBody::Form(json!({ "id": args.playlist_id }))
    })
    .schema(ObjectSchema::closed().field("deleteId", Schema::string()))
    .build()
});

// ---------------------------------------------------------------------------
// DeleteSongs
// ---------------------------------------------------------------------------

/// Delete songs from the whole library or from a single playlist.
///
/// `playlist_id` defaults to `LIBRARY_LIST_ID`. `entry_ids` is only used for
/// playlists and is sent as `null` when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSongs {
    pub song_ids: Vec<String>,
    pub playlist_id: String,
    pub entry_ids: Option<Vec<String>>,
}

impl DeleteSongs {
    pub fn from_library(song_ids: Vec<String>) -> Self {
        Self {
            song_ids,
            playlist_id: LIBRARY_LIST_ID.to_string(),
            entry_ids: None,
        }
    }

    pub fn from_playlist(playlist_id: &str, song_ids: Vec<String>, entry_ids: Vec<String>) -> Self {
        Self {
            song_ids,
            playlist_id: playlist_id.to_string(),
            entry_ids: Some(entry_ids),
        }
    }
}

pub static DELETE_SONGS: LazyLock<CallDescriptor<DeleteSongs>> = LazyLock::new(|| {
    web_client_call("DeleteSongs", "services/deletesong", |args: &DeleteSongs| {
        RequestBody::Form(json!({
            "songIds": args.song_ids,
            "entryIds": args.entry_ids,
            "listId": args.playlist_id,
        }))
    })
    .schema(
        ObjectSchema::closed()
            .field("listId", Schema::string())
            .field("deleteIds", string_array()),
    )
    .build()
});

// ---------------------------------------------------------------------------
// GetLibrarySongs
// ---------------------------------------------------------------------------

/// Load one chunk of the library.
///
/// The first request carries no token. Every chunk but the last answers with
/// a `continuationToken` for the next one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetLibrarySongs {
    pub continuation_token: Option<String>,
}

impl GetLibrarySongs {
    pub fn page(continuation_token: Option<String>) -> Self {
        Self { continuation_token }
    }
}

/// Songs kept per chunk in log records.
const LOGGED_SONGS: usize = 2;

fn truncate_playlist(response: &Value) -> Value {
    let mut filtered = response.clone();
    if let Some(songs) = response.get("playlist") {
        filtered["playlist"] = truncate_array(songs, LOGGED_SONGS);
    }
    filtered
}

pub static GET_LIBRARY_SONGS: LazyLock<CallDescriptor<GetLibrarySongs>> = LazyLock::new(|| {
    web_client_call("GetLibrarySongs", "services/loadalltracks", |args: &GetLibrarySongs| {
        match args.continuation_token.as_deref() {
            Some(token) if !token.is_empty() => {
                RequestBody::Form(json!({ "continuationToken": token }))
            }
            _ => RequestBody::Form(json!({})),
        }
    })
    .schema(
        ObjectSchema::closed()
            .field("continuation", Schema::Boolean)
            .field("differentialUpdate", Schema::Boolean)
            .field("playlistId", Schema::string())
            .field("requestTime", Schema::Integer)
            .field("playlist", song_array())
            .optional_field("continuationToken", Schema::string()),
    )
    .log_filter(truncate_playlist)
    .build()
});

// ---------------------------------------------------------------------------
// ReportBadSongMatch
// ---------------------------------------------------------------------------

/// Ask the uploader to re-upload tracks that were matched incorrectly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBadSongMatch {
    pub song_ids: Vec<String>,
}

pub static REPORT_BAD_SONG_MATCH: LazyLock<CallDescriptor<ReportBadSongMatch>> =
    LazyLock::new(|| {
        web_client_call(
            "ReportBadSongMatch",
            "services/fixsongmatch",
            |args: &ReportBadSongMatch| RequestBody::Raw(json!([["", 1], [args.song_ids]])),
        )
        .static_param("format", "jsarray")
        .expect_literal(BAD_MATCH_ACK.clone())
        .build()
    });

/// Every web-client call, by response contract.
pub fn registry() -> [&'static dyn ResponseContract; 8] {
    [
        &*ADD_PLAYLIST,
        &*ADD_TO_PLAYLIST,
        &*CHANGE_PLAYLIST_NAME,
        &*CHANGE_PLAYLIST_ORDER,
        &*DELETE_PLAYLIST,
        &*DELETE_SONGS,
        &*GET_LIBRARY_SONGS,
        &*REPORT_BAD_SONG_MATCH,
    ]
}

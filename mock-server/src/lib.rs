use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Form, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::post,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Songs returned per `loadalltracks` chunk unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Body literal `fixsongmatch` always answers with.
pub const BAD_MATCH_ACK: &str = "[[0],[]]";

const LIBRARY_LIST_ID: &str = "all";
const TOKEN_PREFIX: &str = "ct-";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub composer: String,
    pub genre: String,
    pub duration_millis: u64,
    pub track: u32,
    pub disc: u32,
    pub year: u32,
    pub play_count: u32,
    pub rating: u8,
    #[serde(rename = "type")]
    pub kind: u8,
    pub deleted: bool,
}

impl Song {
    /// A deterministic library track numbered `n`.
    pub fn sample(n: usize) -> Self {
        Self {
            id: format!("song-{n}"),
            title: format!("Track {n}"),
            artist: "The Examples".to_string(),
            album: "Fixtures".to_string(),
            album_artist: String::new(),
            composer: String::new(),
            genre: "Test".to_string(),
            duration_millis: 180_000 + n as u64,
            track: n as u32 + 1,
            disc: 1,
            year: 2012,
            play_count: 0,
            rating: 0,
            kind: 2,
            deleted: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub entry_id: String,
    pub song_id: String,
}

#[derive(Clone, Debug, Default)]
pub struct Playlist {
    pub title: String,
    pub entries: Vec<Entry>,
}

impl Playlist {
    pub fn song_order(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.song_id.as_str()).collect()
    }
}

#[derive(Debug)]
pub struct Library {
    pub songs: Vec<Song>,
    pub playlists: HashMap<String, Playlist>,
    pub page_size: usize,
}

impl Library {
    pub fn new(songs: Vec<Song>, page_size: usize) -> Self {
        Self {
            songs,
            playlists: HashMap::new(),
            page_size: page_size.max(1),
        }
    }

    /// `count` sample songs served `page_size` at a time.
    pub fn sample(count: usize, page_size: usize) -> Self {
        Self::new((0..count).map(Song::sample).collect(), page_size)
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_PAGE_SIZE)
    }
}

pub type Db = Arc<RwLock<Library>>;

pub fn app() -> Router {
    app_with(Library::default())
}

pub fn app_with(library: Library) -> Router {
    router(Arc::new(RwLock::new(library)))
}

/// Router over shared state, for callers that want to inspect the library.
pub fn router(db: Db) -> Router {
    Router::new()
        .route("/music/services/addplaylist", post(add_playlist))
        .route("/music/services/addtoplaylist", post(add_to_playlist))
        .route("/music/services/modifyplaylist", post(modify_playlist))
        .route("/music/services/changeplaylistorder", post(change_playlist_order))
        .route("/music/services/deleteplaylist", post(delete_playlist))
        .route("/music/services/deletesong", post(delete_song))
        .route("/music/services/loadalltracks", post(load_all_tracks))
        .route("/music/services/fixsongmatch", post(fix_song_match))
        .layer(middleware::from_fn(require_xt))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, router(db)).await
}

/// Every call must carry a non-empty `xt` query parameter.
async fn require_xt(
    Query(params): Query<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !params.get("xt").is_some_and(|token| !token.is_empty()) {
        tracing::warn!(uri = %request.uri(), "rejected call without xt token");
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(request).await)
}

/// Web-client calls post their arguments as JSON in a `json` form field.
#[derive(Deserialize)]
pub struct JsonField {
    pub json: String,
}

fn decode<T: DeserializeOwned>(field: &JsonField) -> Result<T, StatusCode> {
    serde_json::from_str(&field.json).map_err(|e| {
        tracing::debug!(error = %e, "malformed call arguments");
        StatusCode::BAD_REQUEST
    })
}

fn failure() -> Json<Value> {
    Json(json!({ "success": false }))
}

#[derive(Deserialize)]
struct AddPlaylist {
    title: String,
}

async fn add_playlist(State(db): State<Db>, Form(field): Form<JsonField>) -> Result<Json<Value>, StatusCode> {
    let input: AddPlaylist = decode(&field)?;
    let id = Uuid::new_v4().to_string();
    db.write().await.playlists.insert(
        id.clone(),
        Playlist {
            title: input.title.clone(),
            entries: Vec::new(),
        },
    );
    tracing::info!(playlist = %id, "playlist created");
    Ok(Json(json!({ "id": id, "title": input.title, "success": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddToPlaylist {
    playlist_id: String,
    song_refs: Vec<SongRef>,
}

#[derive(Deserialize)]
struct SongRef {
    id: String,
}

async fn add_to_playlist(
    State(db): State<Db>,
    Form(field): Form<JsonField>,
) -> Result<Json<Value>, StatusCode> {
    let input: AddToPlaylist = decode(&field)?;
    let mut library = db.write().await;
    let Some(playlist) = library.playlists.get_mut(&input.playlist_id) else {
        return Ok(failure());
    };
    let added: Vec<Value> = input
        .song_refs
        .into_iter()
        .map(|song| {
            let entry = Entry {
                entry_id: Uuid::new_v4().to_string(),
                song_id: song.id,
            };
            let added = json!({ "songId": entry.song_id, "playlistEntryId": entry.entry_id });
            playlist.entries.push(entry);
            added
        })
        .collect();
    Ok(Json(json!({ "playlistId": input.playlist_id, "songIds": added })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModifyPlaylist {
    playlist_id: String,
    playlist_name: String,
}

async fn modify_playlist(
    State(db): State<Db>,
    Form(field): Form<JsonField>,
) -> Result<Json<Value>, StatusCode> {
    let input: ModifyPlaylist = decode(&field)?;
    let mut library = db.write().await;
    match library.playlists.get_mut(&input.playlist_id) {
        Some(playlist) => {
            playlist.title = input.playlist_name;
            Ok(Json(json!({})))
        }
        None => Ok(failure()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePlaylistOrder {
    playlist_id: String,
    moved_song_ids: Vec<String>,
    moved_entry_ids: Vec<String>,
    after_entry_id: String,
    before_entry_id: String,
}

async fn change_playlist_order(
    State(db): State<Db>,
    Form(field): Form<JsonField>,
) -> Result<Json<Value>, StatusCode> {
    let input: ChangePlaylistOrder = decode(&field)?;
    let mut library = db.write().await;
    let Some(playlist) = library.playlists.get_mut(&input.playlist_id) else {
        return Ok(failure());
    };

    let (moved, mut kept): (Vec<Entry>, Vec<Entry>) = playlist
        .entries
        .iter()
        .cloned()
        .partition(|entry| input.moved_entry_ids.contains(&entry.entry_id));
    let position_of = |id: &str, entries: &[Entry]| entries.iter().position(|e| e.entry_id == id);
    // "" anchors are the playlist boundaries; with neither set, moves go to the start.
    let at = if !input.after_entry_id.is_empty() {
        position_of(&input.after_entry_id, &kept).map(|i| i + 1)
    } else if !input.before_entry_id.is_empty() {
        position_of(&input.before_entry_id, &kept)
    } else {
        Some(0)
    };
    let Some(at) = at else {
        return Ok(failure());
    };
    let tail = kept.split_off(at);
    kept.extend(moved);
    kept.extend(tail);
    playlist.entries = kept;

    Ok(Json(json!({
        "afterEntryId": input.after_entry_id,
        "playlistId": input.playlist_id,
        "movedSongIds": input.moved_song_ids,
    })))
}

#[derive(Deserialize)]
struct DeletePlaylist {
    id: String,
}

async fn delete_playlist(
    State(db): State<Db>,
    Form(field): Form<JsonField>,
) -> Result<Json<Value>, StatusCode> {
    let input: DeletePlaylist = decode(&field)?;
    match db.write().await.playlists.remove(&input.id) {
        Some(_) => Ok(Json(json!({ "deleteId": input.id }))),
        None => Ok(failure()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteSong {
    song_ids: Vec<String>,
    entry_ids: Option<Vec<String>>,
    list_id: String,
}

async fn delete_song(State(db): State<Db>, Form(field): Form<JsonField>) -> Result<Json<Value>, StatusCode> {
    let input: DeleteSong = decode(&field)?;
    let mut library = db.write().await;
    if input.list_id == LIBRARY_LIST_ID {
        library.songs.retain(|song| !input.song_ids.contains(&song.id));
        for playlist in library.playlists.values_mut() {
            playlist.entries.retain(|e| !input.song_ids.contains(&e.song_id));
        }
    } else {
        let Some(playlist) = library.playlists.get_mut(&input.list_id) else {
            return Ok(failure());
        };
        let entry_ids = input.entry_ids.unwrap_or_default();
        playlist.entries.retain(|e| !entry_ids.contains(&e.entry_id));
    }
    Ok(Json(json!({ "listId": input.list_id, "deleteIds": input.song_ids })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadAllTracks {
    continuation_token: Option<String>,
}

async fn load_all_tracks(
    State(db): State<Db>,
    Form(field): Form<JsonField>,
) -> Result<Json<Value>, StatusCode> {
    let input: LoadAllTracks = decode(&field)?;
    let start = match input.continuation_token.as_deref() {
        None => 0,
        Some(token) => token
            .strip_prefix(TOKEN_PREFIX)
            .and_then(|offset| offset.parse::<usize>().ok())
            .ok_or(StatusCode::BAD_REQUEST)?,
    };

    let library = db.read().await;
    if start > library.songs.len() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let end = start.saturating_add(library.page_size).min(library.songs.len());
    let chunk = &library.songs[start..end];
    let mut page = json!({
        "continuation": input.continuation_token.is_some(),
        "differentialUpdate": false,
        "playlistId": LIBRARY_LIST_ID,
        "requestTime": request_time(),
        "playlist": chunk,
    });
    if end < library.songs.len() {
        page["continuationToken"] = json!(format!("{TOKEN_PREFIX}{end}"));
    }
    tracing::debug!(start, end, "served library chunk");
    Ok(Json(page))
}

fn request_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as u64)
        .unwrap_or_default()
}

/// `fixsongmatch` takes a raw `[["", 1], [song_ids]]` body.
async fn fix_song_match(body: String) -> Result<String, StatusCode> {
    let request: (Value, Vec<Vec<String>>) =
        serde_json::from_str(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let reported = request.1.first().map(Vec::len).unwrap_or_default();
    tracing::info!(reported, "bad matches reported");
    Ok(BAD_MATCH_ACK.to_string())
}

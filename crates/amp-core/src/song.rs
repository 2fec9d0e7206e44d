//! Typed song metadata and its mapping to and from `.moggsong` trees.
//!
//! [`SongRecord::from_tree`] is a tolerant projection: missing or mistyped
//! fields read as `None` or empty. [`SongRecord::to_tree`] merges the record
//! back into the tree it was read from, so fields this module does not know
//! about survive a round trip.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use amp_dta::{DataList, DtaDocument, Node, read_dta};
use amp_model::{UnlockRequirement, is_base_song, is_special_song};

use crate::error::Result;

/// One instrument track of a song.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub channels: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

/// Decoded song metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SongRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mogg_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_path: Option<String>,
    /// Song length in bars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countin: Option<i32>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub pans: Vec<f32>,
    #[serde(default)]
    pub vols: Vec<f32>,
    /// Per-track attenuation in dB.
    #[serde(default)]
    pub active_track_db: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arena_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_scale: Option<f32>,
    #[serde(default)]
    pub enable_order: Vec<i32>,
    #[serde(default)]
    pub section_start_bars: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Raw unlock symbol; see [`SongRecord::unlock`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_requirement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_start_ms: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_length_ms: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boss_level: Option<i32>,

    /// Token that references the song in the config trees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// File the record was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moggsong_path: Option<PathBuf>,
    #[serde(default)]
    pub base_song: bool,
    #[serde(default)]
    pub in_game: bool,
    #[serde(default)]
    pub special: bool,

    /// Tree the record was decoded from.
    #[serde(skip)]
    source: Option<DataList>,
}

impl SongRecord {
    /// Project a `.moggsong` tree.
    #[must_use]
    pub fn from_tree(root: &DataList) -> Self {
        let song_info = root.find("song_info");
        Self {
            mogg_path: string_field(root, "mogg_path"),
            midi_path: string_field(root, "midi_path"),
            length: song_info
                .and_then(|info| info.find("length"))
                .and_then(|node| node.child_text(1))
                .and_then(|text| text.split(':').next().and_then(|bars| bars.parse().ok())),
            countin: song_info
                .and_then(|info| info.find("countin"))
                .and_then(|node| int_at(node, 1)),
            tracks: root
                .find("tracks")
                .and_then(|node| node.child::<&DataList>(1))
                .map(|list| {
                    list.children
                        .iter()
                        .filter_map(Node::as_list)
                        .map(read_track)
                        .collect()
                })
                .unwrap_or_default(),
            pans: nested_values(root, "pans", float_node),
            vols: nested_values(root, "vols", float_node),
            active_track_db: trailing_values(root, "active_track_db", float_node),
            arena_path: string_field(root, "arena_path"),
            tunnel_scale: root.find("tunnel_scale").and_then(|node| node.child(1)),
            enable_order: nested_values(root, "enable_order", int_node),
            section_start_bars: trailing_values(root, "section_start_bars", int_node),
            title: string_field(root, "title"),
            title_short: string_field(root, "title_short"),
            artist: string_field(root, "artist"),
            artist_short: string_field(root, "artist_short"),
            desc: string_field(root, "desc"),
            unlock_requirement: string_field(root, "unlock_requirement"),
            bpm: root.find("bpm").and_then(|node| node.child(1)),
            charter: string_field(root, "charter").map(|s| s.trim().to_string()),
            demo_video: string_field(root, "demo_video").map(|s| s.trim().to_string()),
            preview_start_ms: root.find("preview_start_ms").and_then(|node| int_at(node, 1)),
            preview_length_ms: root.find("preview_length_ms").and_then(|node| int_at(node, 1)),
            boss_level: root.find("boss_level").and_then(|node| int_at(node, 1)),
            source: Some(root.clone()),
            ..Self::default()
        }
    }

    /// Read a `.moggsong` file in either encoding and fill in bookkeeping.
    pub fn read(path: &Path) -> Result<Self> {
        let document = read_dta(path)?;
        let mut record = Self::from_tree(&document.root);
        record.moggsong_path = Some(path.to_path_buf());
        if let Some(id) = record.id() {
            record.base_song = is_base_song(&id);
            record.special = is_special_song(&id);
        }
        Ok(record)
    }

    /// Song folder name, taken from the first known asset path.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        let path = match (&self.moggsong_path, &self.mogg_path, &self.midi_path) {
            (Some(path), _, _) => path.clone(),
            (None, Some(path), _) | (None, None, Some(path)) => PathBuf::from(path),
            (None, None, None) => return None,
        };
        path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
    }

    /// Typed view of [`unlock_requirement`](Self::unlock_requirement).
    #[must_use]
    pub fn unlock(&self) -> UnlockRequirement {
        UnlockRequirement::from_symbol(self.unlock_requirement.as_deref())
    }

    /// Set the unlock requirement from its typed form.
    pub fn set_unlock(&mut self, requirement: UnlockRequirement) {
        self.unlock_requirement = requirement.as_symbol().map(str::to_string);
    }

    /// Tree the record was decoded from, if any.
    #[must_use]
    pub fn source_tree(&self) -> Option<&DataList> {
        self.source.as_ref()
    }

    /// Encode the record as a tree.
    ///
    /// Fields are merged into a copy of the source tree when there is one:
    /// `None` or empty fields delete their node, others replace it in place
    /// or are appended. Without a source tree a fresh tree is built and a
    /// default `score_goal` is added.
    #[must_use]
    pub fn to_tree(&self) -> DataList {
        let fresh = self.source.is_none();
        let mut root = self.source.clone().unwrap_or_default();
        let floats = |x: &f32| Node::float(*x);
        let ints = |x: &i32| Node::int(*x);

        splice(&mut root, "mogg_path", string_record("mogg_path", &self.mogg_path));
        splice(&mut root, "midi_path", string_record("midi_path", &self.midi_path));
        self.merge_song_info(&mut root);
        splice(
            &mut root,
            "tracks",
            non_empty(&self.tracks).map(|tracks| {
                let list = tracks.iter().map(|t| Node::List(write_track(t))).collect();
                field("tracks", Node::List(DataList::from_children(list)))
            }),
        );
        splice(&mut root, "pans", non_empty(&self.pans).map(|v| nested("pans", v, floats)));
        splice(&mut root, "vols", non_empty(&self.vols).map(|v| nested("vols", v, floats)));
        splice(
            &mut root,
            "active_track_db",
            non_empty(&self.active_track_db).map(|v| trailing("active_track_db", v, floats)),
        );
        splice(&mut root, "arena_path", symbol_record("arena_path", &self.arena_path));
        if fresh {
            splice(&mut root, "score_goal", Some(default_score_goal()));
        }
        splice(
            &mut root,
            "tunnel_scale",
            self.tunnel_scale.map(|s| field("tunnel_scale", Node::float(s))),
        );
        splice(
            &mut root,
            "enable_order",
            non_empty(&self.enable_order).map(|v| nested("enable_order", v, ints)),
        );
        splice(
            &mut root,
            "section_start_bars",
            non_empty(&self.section_start_bars).map(|v| trailing("section_start_bars", v, ints)),
        );
        for (name, value) in [
            ("title", &self.title),
            ("title_short", &self.title_short),
            ("artist", &self.artist),
            ("artist_short", &self.artist_short),
        ] {
            splice(&mut root, name, string_record(name, value));
        }
        splice(&mut root, "desc", symbol_record("desc", &self.desc));
        splice(
            &mut root,
            "unlock_requirement",
            symbol_record("unlock_requirement", &self.unlock_requirement),
        );
        // The game reads tempo as an integer.
        splice(&mut root, "bpm", self.bpm.map(|bpm| field("bpm", Node::int(bpm as i32))));
        for (name, value) in [
            ("preview_start_ms", self.preview_start_ms),
            ("preview_length_ms", self.preview_length_ms),
            ("boss_level", self.boss_level),
        ] {
            splice(&mut root, name, value.map(|v| field(name, Node::int(v))));
        }
        splice(&mut root, "charter", string_record("charter", &self.charter));
        splice(&mut root, "demo_video", string_record("demo_video", &self.demo_video));
        root
    }

    /// Encode as a document ready for serialization.
    #[must_use]
    pub fn to_document(&self) -> DtaDocument {
        DtaDocument::new(self.to_tree())
    }

    fn merge_song_info(&self, root: &mut DataList) {
        if self.length.is_none() && self.countin.is_none() {
            splice(root, "song_info", None);
            return;
        }
        let mut info = root
            .find("song_info")
            .cloned()
            .unwrap_or_else(|| DataList::named("song_info"));
        splice(
            &mut info,
            "length",
            self.length.map(|bars| field("length", Node::symbol(format!("{bars}:0:0")))),
        );
        splice(&mut info, "countin", self.countin.map(|c| field("countin", Node::int(c))));
        splice(root, "song_info", Some(info));
    }
}

/// Replace the first record named `name` with `replacement`, keep its
/// bracket kind, append when absent, or delete it when `replacement` is
/// `None`.
fn splice(root: &mut DataList, name: &str, replacement: Option<DataList>) {
    let position = root
        .children
        .iter()
        .position(|node| node.as_list().and_then(DataList::name).is_some_and(|n| n == name));
    match (position, replacement) {
        (Some(index), Some(mut list)) => {
            if let Node::List(existing) = &root.children[index] {
                list.kind = existing.kind;
            }
            root.children[index] = Node::List(list);
        }
        (None, Some(list)) => root.push(list),
        (Some(index), None) => {
            root.children.remove(index);
        }
        (None, None) => {}
    }
}

fn field(name: &str, value: Node) -> DataList {
    DataList::named(name).with(value)
}

fn string_record(name: &str, value: &Option<String>) -> Option<DataList> {
    value.as_deref().map(|v| field(name, Node::string(v)))
}

fn symbol_record(name: &str, value: &Option<String>) -> Option<DataList> {
    value.as_deref().map(|v| field(name, Node::symbol(v)))
}

fn nested<T>(name: &str, values: &[T], node: impl Fn(&T) -> Node) -> DataList {
    DataList::named(name).with(DataList::from_children(values.iter().map(node).collect()))
}

fn trailing<T>(name: &str, values: &[T], node: impl Fn(&T) -> Node) -> DataList {
    let mut list = DataList::named(name);
    list.children.extend(values.iter().map(node));
    list
}

fn non_empty<T>(values: &[T]) -> Option<&[T]> {
    (!values.is_empty()).then_some(values)
}

fn default_score_goal() -> DataList {
    let mut goal = DataList::named("score_goal");
    for row in 1..=4 {
        goal.push(DataList::from_children((row..row + 3).map(Node::int).collect()));
    }
    goal
}

fn string_field(root: &DataList, name: &str) -> Option<String> {
    root.find(name).and_then(|node| node.child::<String>(1))
}

/// Integer child, accepting any node whose text parses as one.
fn int_at(list: &DataList, index: usize) -> Option<i32> {
    list.child::<i32>(index)
        .or_else(|| list.child_text(index).and_then(|text| text.parse().ok()))
}

fn int_node(node: &Node) -> Option<i32> {
    match node {
        Node::List(_) => None,
        other => other.text().parse().ok(),
    }
}

fn float_node(node: &Node) -> Option<f32> {
    match node {
        Node::List(_) => None,
        other => other.text().parse().ok(),
    }
}

/// Values of `(name (v v v))`.
fn nested_values<T>(root: &DataList, name: &str, read: fn(&Node) -> Option<T>) -> Vec<T> {
    root.find(name)
        .and_then(|node| node.child::<&DataList>(1))
        .map(|list| list.children.iter().filter_map(read).collect())
        .unwrap_or_default()
}

/// Values of `(name v v v)`.
fn trailing_values<T>(root: &DataList, name: &str, read: fn(&Node) -> Option<T>) -> Vec<T> {
    root.find(name)
        .map(|node| node.children.iter().skip(1).filter_map(read).collect())
        .unwrap_or_default()
}

fn read_track(list: &DataList) -> Track {
    Track {
        name: list.child::<String>(0).unwrap_or_default(),
        channels: list
            .child::<&DataList>(1)
            .map(|channels| channels.children.iter().filter_map(int_node).collect())
            .unwrap_or_default(),
        event: list.child::<String>(2),
    }
}

fn write_track(track: &Track) -> DataList {
    let mut list = DataList::new().with(Node::symbol(&track.name)).with(
        DataList::from_children(track.channels.iter().copied().map(Node::int).collect()),
    );
    if let Some(event) = &track.event {
        list.push(Node::symbol(event));
    }
    list
}

//! Registry operations against a generated game directory.

use std::fs;
use std::path::Path;

use amp_core::{RemoveOptions, SongError, SongRegistry};
use amp_dta::{DataList, DtaDocument, DtbVersion, DtbWriteOptions, Node, read_dta};
use amp_model::{GamePaths, Platform, no_progress};

const CONFIG: &str = "(db \
    (unlock_tokens (DREAMER Dreamer unlock_extra unlock_extra_desc ui/textures/black_square.png CAMPVO_song_extra)) \
    (campaign (beat_num 0 kUnlockArena DREAMER)))";

const SONGS_CONFIG: &str = "(World1 \
    (TUT0 #include ../Songs/tut0/tut0.moggsong) \
    (DREAMER #include ../Songs/dreamer/dreamer.moggsong)) \
    (World2 (TUT0 #include ../Songs/tut0/tut0.moggsong))";

fn write(path: &Path, data: &[u8]) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, data).expect("write");
}

fn write_config(path: &Path, text: &str) {
    let doc = DtaDocument::parse_text(text).expect("parse");
    let options = DtbWriteOptions::new()
        .with_version(DtbVersion::V2)
        .with_obfuscation(true);
    write(path, &doc.to_binary(options).expect("binary"));
}

fn moggsong(id: &str, title: &str, bpm: i32) -> String {
    format!(
        "(mogg_path \"{id}.mogg\")\n(midi_path \"{id}.mid\")\n\
         (song_info (length 4:0:0) (countin 4))\n\
         (title \"{title}\")\n(artist \"Spoken Word\")\n(desc song_desc)\n(bpm {bpm})\n"
    )
}

/// Compiled track with a terminator 64 bytes before the end.
fn compiled_midi(platform: Platform) -> Vec<u8> {
    let mut data = vec![0u8; 256];
    data[192..200].copy_from_slice(&platform.midi_terminator().to_le_bytes());
    data
}

fn add_song_folder(paths: &GamePaths, id: &str, title: &str) {
    write(&paths.song_file(id, "mogg"), b"OggS");
    write(&paths.song_file(id, "mid"), b"MThd");
    write(&paths.song_file(id, "moggsong"), moggsong(id, title, 120).as_bytes());
}

fn game() -> (tempfile::TempDir, SongRegistry) {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = GamePaths::new(dir.path(), Platform::Ps3);
    write_config(&paths.config, CONFIG);
    write_config(&paths.songs_config, SONGS_CONFIG);

    add_song_folder(&paths, "tut0", "Tutorial");
    write(&paths.song_file("tut0", "mid_ps3"), &compiled_midi(Platform::Ps3));
    write(&paths.song_file("tut0", "png.dta_dta_ps3"), b"png meta");
    write(&paths.song_file("tut0", "png_ps3"), b"png");
    add_song_folder(&paths, "dreamer", "Dreamer");
    add_song_folder(&paths, "neon", "Neon");

    let registry = SongRegistry::open(dir.path(), None).expect("open");
    (dir, registry)
}

fn config_tree(path: &Path) -> DataList {
    read_dta(path).expect("read config").root
}

fn count_token(list: &DataList, index: usize, token: &str) -> usize {
    list.find_by_child(token, index).count()
}

#[test]
fn open_detects_platform() {
    let (dir, registry) = game();
    assert_eq!(registry.platform(), Platform::Ps3);

    let empty = tempfile::tempdir().expect("tempdir");
    assert!(matches!(
        SongRegistry::open(empty.path(), None),
        Err(SongError::UnsupportedPlatform { .. })
    ));
    assert!(matches!(
        SongRegistry::open(&dir.path().join("missing"), None),
        Err(SongError::NotFound { .. })
    ));
}

#[test]
fn list_merges_registered_and_loose_songs() {
    let (_dir, registry) = game();
    let songs = registry.list().expect("list");
    let summary: Vec<_> = songs
        .iter()
        .map(|song| (song.id().expect("id"), song.in_game, song.node_id.clone()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("dreamer".to_string(), true, Some("DREAMER".to_string())),
            ("neon".to_string(), false, None),
            ("tut0".to_string(), true, Some("TUT0".to_string())),
        ]
    );
    let tut0 = &songs[2];
    assert!(tut0.special && tut0.base_song);
}

#[test]
fn song_record_json() {
    let (_dir, registry) = game();
    let mut dreamer = registry
        .list()
        .expect("list")
        .into_iter()
        .find(|song| song.id().as_deref() == Some("dreamer"))
        .expect("dreamer");
    dreamer.moggsong_path = None;
    insta::assert_json_snapshot!(dreamer, @r###"
    {
      "mogg_path": "dreamer.mogg",
      "midi_path": "dreamer.mid",
      "length": 4,
      "countin": 4,
      "tracks": [],
      "pans": [],
      "vols": [],
      "active_track_db": [],
      "enable_order": [],
      "section_start_bars": [],
      "title": "Dreamer",
      "artist": "Spoken Word",
      "desc": "song_desc",
      "bpm": 120.0,
      "node_id": "DREAMER",
      "base_song": true,
      "in_game": true,
      "special": false
    }
    "###);
}

#[test]
fn add_registers_song_once() {
    let (_dir, registry) = game();
    let paths = registry.paths().clone();
    registry.add(&["neon"], &mut no_progress).expect("add");
    registry.add(&["neon"], &mut no_progress).expect("add again");

    let config = config_tree(&paths.config);
    let tokens = config.find_path(&["db", "unlock_tokens"]).expect("tokens");
    let campaign = config.find_path(&["db", "campaign"]).expect("campaign");
    assert_eq!(count_token(tokens, 0, "NEON"), 1);
    assert_eq!(count_token(campaign, 3, "NEON"), 1);
    let unlock = tokens.find_by_child("NEON", 0).next().expect("unlock");
    assert_eq!(unlock.child_text(1).as_deref(), Some("Neon"));

    // World2 had fewer entries, so the song lands there.
    let songs_config = config_tree(&paths.songs_config);
    let world2 = songs_config.find("World2").expect("World2");
    let entry = world2.find_by_child("NEON", 0).next().expect("entry");
    assert_eq!(
        entry.get(1),
        Some(&Node::include("../Songs/neon/neon.moggsong"))
    );
    assert_eq!(count_token(songs_config.find("World1").expect("World1"), 0, "NEON"), 0);

    let songs = registry.list().expect("list");
    let neon = songs
        .iter()
        .find(|song| song.id().as_deref() == Some("neon"))
        .expect("neon");
    assert!(neon.in_game);
    assert_eq!(neon.node_id.as_deref(), Some("NEON"));
}

#[test]
fn add_keeps_config_encoding_and_writes_platform_files() {
    let (_dir, registry) = game();
    let paths = registry.paths().clone();
    registry.add(&["neon"], &mut no_progress).expect("add");

    let config = read_dta(&paths.config).expect("config");
    assert_eq!(config.version, DtbVersion::V2);
    assert!(config.obfuscated);

    let compiled = read_dta(&paths.song_file("neon", "moggsong_dta_ps3")).expect("compiled");
    assert_eq!(compiled.version, DtbVersion::V3);
    assert!(!compiled.obfuscated);
    let mogg = compiled.root.find("mogg_path").expect("mogg_path");
    assert_eq!(mogg.child_text(1).as_deref(), Some("neon.mogg"));

    for ext in ["png.dta_dta_ps3", "png_ps3"] {
        assert_eq!(
            fs::read(paths.song_file("neon", ext)).expect("donor copy"),
            fs::read(paths.song_file("tut0", ext)).expect("donor"),
        );
    }
    let midi = fs::read(paths.song_file("neon", "mid_ps3")).expect("midi");
    assert_eq!(&midi[192 + 21..192 + 24], &[0x07, 0xA1, 0x20]);
}

#[test]
fn add_reports_progress() {
    let (_dir, registry) = game();
    let mut messages = Vec::new();
    registry
        .add(&["neon"], &mut |message: &str, current, total| {
            messages.push((message.to_string(), current, total));
        })
        .expect("add");
    assert_eq!(
        messages,
        vec![
            ("Added neon".to_string(), 1, 1),
            ("Rebuilt config files".to_string(), 1, 1),
        ]
    );
}

#[test]
fn remove_with_delete_drops_registration_and_folder() {
    let (_dir, registry) = game();
    let paths = registry.paths().clone();
    registry.add(&["neon"], &mut no_progress).expect("add");
    registry
        .remove(&["neon"], RemoveOptions::new().with_delete(true), &mut no_progress)
        .expect("remove");

    assert!(!paths.song_dir("neon").exists());
    let config = config_tree(&paths.config);
    let tokens = config.find_path(&["db", "unlock_tokens"]).expect("tokens");
    assert_eq!(count_token(tokens, 0, "NEON"), 0);
    assert_eq!(count_token(tokens, 0, "DREAMER"), 1);
    assert!(
        registry
            .list()
            .expect("list")
            .iter()
            .all(|song| song.id().as_deref() != Some("neon"))
    );
}

#[test]
fn remove_rejects_builtin_song_before_touching_files() {
    let (_dir, registry) = game();
    let paths = registry.paths().clone();
    let before = (
        fs::read(&paths.config).expect("config"),
        fs::read(&paths.songs_config).expect("songs config"),
    );

    let err = registry
        .remove(&["credits"], RemoveOptions::new(), &mut no_progress)
        .expect_err("protected");
    assert!(matches!(err, SongError::ProtectedSong { ref song } if song == "credits"));

    let after = (
        fs::read(&paths.config).expect("config"),
        fs::read(&paths.songs_config).expect("songs config"),
    );
    assert_eq!(before, after);

    registry
        .remove(&["dreamer"], RemoveOptions::new().with_force(true), &mut no_progress)
        .expect("forced");
    assert!(paths.song_dir("dreamer").is_dir());
}

#[test]
fn validation_names_every_missing_file() {
    let (_dir, registry) = game();
    let paths = registry.paths().clone();
    write(&paths.song_file("broken", "moggsong"), moggsong("broken", "Broken", 90).as_bytes());
    let before = fs::read(&paths.config).expect("config");

    let err = registry
        .add(&["broken"], &mut no_progress)
        .expect_err("validation");
    match err {
        SongError::Validation { song, missing } => {
            assert_eq!(song, "broken");
            assert_eq!(
                missing,
                vec![paths.song_file("broken", "mogg"), paths.song_file("broken", "mid")]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read(&paths.config).expect("config"), before);
}

#[test]
fn missing_config_node_is_named() {
    let (_dir, registry) = game();
    let paths = registry.paths().clone();
    write_config(&paths.config, "(db (campaign))");

    let err = registry.list().expect_err("malformed");
    match err {
        SongError::MalformedConfig { file, node } => {
            assert_eq!(file, paths.config);
            assert_eq!(node, "db/unlock_tokens");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        registry.add(&["neon"], &mut no_progress),
        Err(SongError::MalformedConfig { .. })
    ));
}

#[test]
fn add_all_and_remove_customs() {
    let (_dir, registry) = game();
    let paths = registry.paths().clone();
    add_song_folder(&paths, "pulse", "Pulse");

    let added = registry.add_all(&mut no_progress).expect("add all");
    assert_eq!(added, vec!["neon".to_string(), "pulse".to_string()]);
    assert!(registry.list().expect("list").iter().all(|song| song.in_game));

    let removed = registry.remove_customs(&mut no_progress).expect("remove customs");
    assert_eq!(removed, vec!["neon".to_string(), "pulse".to_string()]);
    assert!(paths.song_dir("pulse").is_dir());
    let in_game: Vec<_> = registry
        .list()
        .expect("list")
        .iter()
        .filter(|song| song.in_game)
        .filter_map(|song| song.id())
        .collect();
    assert_eq!(in_game, vec!["dreamer".to_string(), "tut0".to_string()]);
}

#[test]
fn import_copies_and_registers() {
    let (dir, registry) = game();
    let paths = registry.paths().clone();
    let incoming = dir.path().join("incoming/pulse");
    for (ext, data) in [
        ("mogg", b"OggS".as_slice()),
        ("mid", b"MThd".as_slice()),
        ("moggsong", moggsong("pulse", "Pulse", 128).as_bytes()),
    ] {
        write(&incoming.join(format!("pulse.{ext}")), data);
    }

    let id = registry
        .import(&incoming, false, &mut no_progress)
        .expect("import");
    assert_eq!(id, "pulse");
    assert!(paths.song_file("pulse", "mogg").is_file());
    let midi = fs::read(paths.song_file("pulse", "mid_ps3")).expect("midi");
    assert_eq!(&midi[192 + 21..192 + 24], &[0x07, 0x27, 0x0E]);

    assert!(matches!(
        registry.import(&incoming, false, &mut no_progress),
        Err(SongError::AlreadyExists { .. })
    ));
    let id = registry
        .import(&incoming.join("pulse.moggsong"), true, &mut no_progress)
        .expect("replace");
    assert_eq!(id, "pulse");
    let config = config_tree(&paths.config);
    let campaign = config.find_path(&["db", "campaign"]).expect("campaign");
    assert_eq!(count_token(campaign, 3, "PULSE"), 1);

    // Importing from the song's own folder only registers it.
    registry
        .import(&paths.song_dir("pulse"), false, &mut no_progress)
        .expect("in place");
}

#[test]
fn import_rejects_bad_sources() {
    let (dir, registry) = game();
    let readme = dir.path().join("readme.txt");
    write(&readme, b"hello");
    assert!(matches!(
        registry.import(&readme, false, &mut no_progress),
        Err(SongError::InvalidFormat { .. })
    ));
    assert!(matches!(
        registry.import(&dir.path().join("nothing"), false, &mut no_progress),
        Err(SongError::NotFound { .. })
    ));

    let partial = dir.path().join("partial");
    write(&partial.join("partial.moggsong"), moggsong("partial", "P", 100).as_bytes());
    assert!(matches!(
        registry.import(&partial, false, &mut no_progress),
        Err(SongError::Validation { .. })
    ));
}

//! Argument parsing.

use anyhow::Context;
use clap::Parser;

use amp_cli::cli::{
    ArchiveCommand, Cli, Command, DtaCommand, DtbVersionArg, PlatformArg, SongCommand,
    TweakAction,
};
use amp_cli::report::write_error;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("parse")
}

#[test]
fn test_archive_pack_arguments() {
    let cli = parse(&[
        "amp", "archive", "pack", "game", "out/main_ps3.hdr", "--part-size", "4096",
    ]);
    let Command::Archive(ArchiveCommand::Pack(args)) = cli.command else {
        panic!("expected archive pack");
    };
    assert_eq!(args.source.to_str(), Some("game"));
    assert_eq!(args.part_size, Some(4096));
    assert_eq!(args.platform, None);
    assert_eq!(args.dtb_version, DtbVersionArg::V3);
}

#[test]
fn test_keep_binary_requires_conversion() {
    let rejected =
        Cli::try_parse_from(["amp", "archive", "unpack", "main.hdr", "out", "--keep-binary"]);
    assert!(rejected.is_err());
    let cli = parse(&[
        "amp", "archive", "unpack", "main.hdr", "out", "--dtb-to-text", "--keep-binary",
    ]);
    let Command::Archive(ArchiveCommand::Unpack(args)) = cli.command else {
        panic!("expected archive unpack");
    };
    assert!(args.dtb_to_text && args.keep_binary);
}

#[test]
fn test_song_remove_flags() {
    let cli = parse(&[
        "amp", "song", "remove", "game", "neon", "pulse", "--force", "--delete", "--platform",
        "ps4",
    ]);
    let Command::Song(SongCommand::Remove {
        game,
        names,
        force,
        delete,
    }) = cli.command
    else {
        panic!("expected song remove");
    };
    assert_eq!(names, vec!["neon".to_string(), "pulse".to_string()]);
    assert!(force && delete);
    assert_eq!(game.platform, Some(PlatformArg::Ps4));
}

#[test]
fn test_song_add_needs_a_name() {
    assert!(Cli::try_parse_from(["amp", "song", "add", "game"]).is_err());
    assert!(Cli::try_parse_from(["amp", "song", "list", "game", "--pretty"]).is_err());
}

#[test]
fn test_dta_to_binary_options() {
    let cli = parse(&[
        "amp", "dta", "to-binary", "in.dta", "out.dtb", "--version", "v1", "--obfuscate",
    ]);
    let Command::Dta(DtaCommand::ToBinary {
        version, obfuscate, ..
    }) = cli.command
    else {
        panic!("expected dta to-binary");
    };
    assert_eq!(version, DtbVersionArg::V1);
    assert!(obfuscate);
}

#[test]
fn test_tweak_arguments_are_optional() {
    let cli = parse(&["amp", "tweak"]);
    let Command::Tweak(args) = cli.command else {
        panic!("expected tweak");
    };
    assert!(args.verb.is_none());

    let cli = parse(&["amp", "tweak", "unlock-fps", "status", "game"]);
    let Command::Tweak(args) = cli.command else {
        panic!("expected tweak");
    };
    assert_eq!(args.verb.as_deref(), Some("unlock-fps"));
    assert_eq!(args.action, Some(TweakAction::Status));

    assert!(Cli::try_parse_from(["amp", "tweak", "unlock-fps", "toggle", "game"]).is_err());
}

#[test]
fn test_global_log_flags() {
    let cli = parse(&["amp", "song", "list", "game", "--log-format", "json", "-v"]);
    assert!(cli.verbosity.is_present());
    assert!(matches!(cli.log_format, amp_cli::cli::LogFormatArg::Json));
}

#[test]
fn test_error_summary_is_one_line() {
    let error = Err::<(), _>(std::io::Error::from(std::io::ErrorKind::NotFound))
        .context("failed to read header main_ps3.hdr")
        .expect_err("error");
    let mut out = Vec::new();
    write_error(&mut out, &error).expect("write");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.starts_with("error: failed to read header main_ps3.hdr: "));
    assert_eq!(text.lines().count(), 1);
}

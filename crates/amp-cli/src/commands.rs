use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, info_span};

use amp_ark::{PackOptions, UnpackOptions, pack, read_header, unpack};
use amp_core::{RemoveOptions, SongRegistry, TWEAKS, find_tweak};
use amp_dta::{DtbWriteOptions, read_dta};
use amp_model::{GamePaths, Platform, ProgressFn};

use amp_cli::cli::{
    ArchiveCommand, DtaCommand, GameArgs, PackArgs, SongCommand, TweakAction, TweakArgs,
    UnpackArgs,
};
use amp_cli::progress::Progress;

use crate::summary::{print_archive, print_songs, print_tweaks, print_unpack_report};

const TWEAK_USAGE: &str = "Usage:\n  tweak <tweak> (status|enable|disable) <path to game files>";

pub fn run_archive(command: &ArchiveCommand) -> Result<()> {
    match command {
        ArchiveCommand::Pack(args) => run_pack(args),
        ArchiveCommand::Unpack(args) => run_unpack(args),
        ArchiveCommand::List(args) => {
            let archive = read_header(&args.header)
                .with_context(|| format!("read {}", args.header.display()))?;
            print_archive(&archive);
            Ok(())
        }
    }
}

fn run_pack(args: &PackArgs) -> Result<()> {
    let platform = match args.platform {
        Some(platform) => platform.into(),
        None => pack_platform(&args.source, &args.header).ok_or_else(|| {
            anyhow!(
                "cannot tell the platform of {}; pass --platform",
                args.source.display()
            )
        })?,
    };
    let mut options = PackOptions::new().with_dtb_version(args.dtb_version.into());
    if let Some(limit) = args.part_size {
        options = options.with_part_size_limit(limit);
    }

    let mut progress = Progress::new();
    let archive = pack(
        &args.source,
        &args.header,
        platform,
        &options,
        &mut |message: &str, current, total| progress.report(message, current, total),
    )
    .with_context(|| format!("pack {}", args.source.display()))?;
    progress.finish();
    println!(
        "Packed {} files into {} part(s): {}",
        archive.entries.len(),
        archive.parts.len(),
        args.header.display()
    );
    Ok(())
}

/// Platform from a `ps3/`/`ps4/` directory in the source, else from a
/// `_ps3`/`_ps4` suffix on the header name.
fn pack_platform(source: &Path, header: &Path) -> Option<Platform> {
    GamePaths::detect_platform(source).or_else(|| {
        let stem = header.file_stem()?.to_string_lossy().to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|platform| stem.ends_with(&format!("_{}", platform.as_str())))
    })
}

fn run_unpack(args: &UnpackArgs) -> Result<()> {
    let options = UnpackOptions::new()
        .with_conversion(args.dtb_to_text)
        .with_keep_binary(args.keep_binary);
    let mut progress = Progress::new();
    let report = unpack(
        &args.header,
        &args.output,
        &options,
        &mut |message: &str, current, total| progress.report(message, current, total),
    )
    .with_context(|| format!("unpack {}", args.header.display()))?;
    progress.finish();
    print_unpack_report(&report);
    Ok(())
}

fn open_registry(game: &GameArgs) -> Result<SongRegistry> {
    SongRegistry::open(&game.dir, game.platform.map(Platform::from))
        .with_context(|| format!("open game directory {}", game.dir.display()))
}

/// Run a registry operation with a progress display.
fn with_progress<T>(
    run: impl FnOnce(&mut ProgressFn<'_>) -> amp_core::Result<T>,
) -> Result<T> {
    let mut progress = Progress::new();
    let result = run(&mut |message: &str, current, total| progress.report(message, current, total));
    progress.finish();
    Ok(result?)
}

pub fn run_song(command: &SongCommand) -> Result<()> {
    match command {
        SongCommand::List { game, json, pretty } => {
            let songs = open_registry(game)?.list()?;
            if *json {
                let text = if *pretty {
                    serde_json::to_string_pretty(&songs)?
                } else {
                    serde_json::to_string(&songs)?
                };
                println!("{text}");
            } else {
                print_songs(&songs);
            }
        }
        SongCommand::Add { game, names } => {
            let registry = open_registry(game)?;
            let span = info_span!("song_add", count = names.len());
            let _guard = span.enter();
            with_progress(|progress| registry.add(names, progress))?;
            println!("Added {}", names.join(", "));
        }
        SongCommand::AddAll { game } => {
            let registry = open_registry(game)?;
            let added = with_progress(|progress| registry.add_all(progress))?;
            if added.is_empty() {
                println!("No songs to add");
            } else {
                println!("Added {}", added.join(", "));
            }
        }
        SongCommand::Remove {
            game,
            names,
            force,
            delete,
        } => {
            let registry = open_registry(game)?;
            let options = RemoveOptions::new()
                .with_force(*force)
                .with_delete(*delete);
            with_progress(|progress| registry.remove(names, options, progress))?;
            println!("Removed {}", names.join(", "));
        }
        SongCommand::RemoveCustoms { game } => {
            let registry = open_registry(game)?;
            let removed = with_progress(|progress| registry.remove_customs(progress))?;
            info!(count = removed.len(), "removed custom songs");
            println!("Removed {} custom songs", removed.len());
        }
        SongCommand::Import {
            game,
            source,
            replace,
        } => {
            let registry = open_registry(game)?;
            let id = with_progress(|progress| registry.import(source, *replace, progress))
                .with_context(|| format!("import {}", source.display()))?;
            println!("Imported {id}");
        }
    }
    Ok(())
}

pub fn run_dta(command: &DtaCommand) -> Result<()> {
    match command {
        DtaCommand::ToText { input, output } => {
            let document = read_dta(input).with_context(|| format!("read {}", input.display()))?;
            fs::write(output, document.to_text())
                .with_context(|| format!("write {}", output.display()))?;
        }
        DtaCommand::ToBinary {
            input,
            output,
            version,
            obfuscate,
        } => {
            let document = read_dta(input).with_context(|| format!("read {}", input.display()))?;
            let options = DtbWriteOptions::new()
                .with_version((*version).into())
                .with_obfuscation(*obfuscate);
            let bytes = document.to_binary(options)?;
            fs::write(output, bytes).with_context(|| format!("write {}", output.display()))?;
        }
    }
    Ok(())
}

/// Returns the process exit code: `status` exits 1 when the tweak is off.
pub fn run_tweak(args: &TweakArgs) -> Result<i32> {
    let Some(verb) = &args.verb else {
        print_tweaks(TWEAKS);
        return Ok(0);
    };
    let info = find_tweak(verb)?;
    let (Some(action), Some(dir)) = (args.action, &args.dir) else {
        println!("{}\n", info.name);
        println!("{}", info.description);
        println!("\n{TWEAK_USAGE}");
        return Ok(1);
    };
    if !dir.is_dir() {
        bail!("game directory not found: {}", dir.display());
    }
    let registry = SongRegistry::open(dir, args.platform.map(Platform::from))?;
    let tweak = info
        .create(registry.paths())
        .with_context(|| format!("load {}", info.verb))?;

    let code = match action {
        TweakAction::Status => {
            if tweak.is_enabled()? {
                println!("{}", info.enabled_text);
                0
            } else {
                println!("{}", info.disabled_text);
                1
            }
        }
        TweakAction::Enable => {
            tweak.enable()?;
            println!("{}", info.enable_text);
            0
        }
        TweakAction::Disable => {
            tweak.disable()?;
            println!("{}", info.disable_text);
            0
        }
    };
    Ok(code)
}

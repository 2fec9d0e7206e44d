//! Table output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use amp_ark::{Archive, UnpackReport};
use amp_core::{SongRecord, TweakInfo};

pub fn print_songs(songs: &[SongRecord]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Song"),
        header_cell("Title"),
        header_cell("Artist"),
        header_cell("BPM"),
        header_cell("Charter"),
        header_cell("Kind"),
        header_cell("In game"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 6, CellAlignment::Center);
    for song in songs {
        table.add_row(vec![
            Cell::new(song.id().unwrap_or_default()).add_attribute(Attribute::Bold),
            optional_cell(song.title.as_deref()),
            optional_cell(song.artist.as_deref()),
            song.bpm.map_or_else(|| dim_cell("-"), Cell::new),
            optional_cell(song.charter.as_deref()),
            kind_cell(song),
            if song.in_game {
                Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                dim_cell("-")
            },
        ]);
    }
    println!("{table}");
    let in_game = songs.iter().filter(|song| song.in_game).count();
    println!("{} songs, {in_game} in game", songs.len());
}

fn kind_cell(song: &SongRecord) -> Cell {
    if song.special {
        dim_cell("special")
    } else if song.base_song {
        Cell::new("base")
    } else {
        Cell::new("custom").fg(Color::Cyan)
    }
}

pub fn print_archive(archive: &Archive) {
    println!(
        "Platform: {}  Version: {}  Parts: {}",
        archive.platform,
        archive.version,
        archive.parts.len()
    );
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Path"),
        header_cell("Part"),
        header_cell("Offset"),
        header_cell("Size"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for entry in &archive.entries {
        let part = archive
            .parts
            .get(entry.part as usize)
            .map_or_else(|| entry.part.to_string(), |part| part.file_name.clone());
        table.add_row(vec![
            Cell::new(entry.full_path()),
            Cell::new(part),
            Cell::new(entry.offset),
            Cell::new(entry.size),
        ]);
    }
    println!("{table}");
}

pub fn print_unpack_report(report: &UnpackReport) {
    println!(
        "Extracted {} files, converted {} data trees",
        report.extracted, report.converted
    );
    if !report.unconvertible.is_empty() {
        eprintln!("Kept in binary form:");
        for path in &report.unconvertible {
            eprintln!("- {path}");
        }
    }
}

pub fn print_tweaks(tweaks: &[TweakInfo]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Tweak"),
        header_cell("Name"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    for info in tweaks {
        table.add_row(vec![
            Cell::new(info.verb).add_attribute(Attribute::Bold),
            Cell::new(info.name),
            Cell::new(info.description),
        ]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn optional_cell(value: Option<&str>) -> Cell {
    value.map_or_else(|| dim_cell("-"), Cell::new)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

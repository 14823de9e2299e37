//! Company of Heroes 2 replay (.rec) decoder CLI
//!
//! A command-line interface for decoding, validating, and summarizing CoH2 replay files.
//!
//! ## Commands
//!
//! - `info` - Display quick replay metadata
//! - `parse` - Decode a replay with output format options
//! - `validate` - Validate a replay (exit codes for scripting)
//! - `batch` - Process multiple replays from a directory

use clap::{Parser, Subcommand, ValueEnum};
use coh2_replay::{
    DecodeOptions, DecodeReport, IdentityTable, ParserError, Player, Replay, ReplayDecoder,
    Schema,
};
use log::LevelFilter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Company of Heroes 2 replay (.rec) decoder
#[derive(Parser)]
#[command(name = "coh2-replay")]
#[command(about = "Company of Heroes 2 replay (.rec) decoder", long_about = None)]
#[command(version)]
struct Cli {
    /// Schema revision to decode with (detected when omitted)
    #[arg(long, global = true)]
    schema: Option<SchemaArg>,
    /// JSON table mapping map name and start position to player id
    #[arg(long, global = true)]
    id_table: Option<PathBuf>,
    /// Maximum chunk nesting depth
    #[arg(long, global = true, default_value_t = coh2_replay::chunky::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbosity: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display replay information
    Info {
        /// Path to the replay file
        file: PathBuf,
    },
    /// Decode a replay file
    Parse {
        /// Path to the replay file
        file: PathBuf,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
        /// Include player details
        #[arg(long)]
        players: bool,
        /// Include chat messages
        #[arg(long)]
        chat: bool,
    },
    /// Validate a replay file
    Validate {
        /// Path to the replay file
        file: PathBuf,
        /// Detailed report
        #[arg(short, long)]
        detailed: bool,
    },
    /// Decode multiple replay files
    Batch {
        /// Directory containing replay files
        directory: PathBuf,
        /// Output directory for JSON files
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Generate summary report
        #[arg(long)]
        summary: bool,
        /// Continue on errors
        #[arg(long)]
        continue_on_error: bool,
    },
}

/// Output format options
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

/// Schema revision names accepted on the command line
#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemaArg {
    Legacy,
    Steam,
}

impl From<SchemaArg> for Schema {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Legacy => Schema::Legacy,
            SchemaArg::Steam => Schema::Steam,
        }
    }
}

/// Decoder settings shared by every command.
struct Settings {
    options: DecodeOptions,
    table: Option<IdentityTable>,
}

impl Settings {
    fn decoder(&self, file: &Path) -> Result<ReplayDecoder, ParserError> {
        let decoder = ReplayDecoder::open(file)?.with_options(self.options);
        Ok(match &self.table {
            Some(table) => decoder.with_identity_lookup(table.clone()),
            None => decoder,
        })
    }

    fn decode(&self, file: &Path) -> Result<(Replay, DecodeReport), ParserError> {
        self.decoder(file)?.decode_with_report()
    }
}

// ============================================================================
// Serializable Output Structures
// ============================================================================

#[derive(Serialize)]
struct ParseOutput {
    header: HeaderInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    players: Option<Vec<Player>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat: Option<Vec<ChatInfo>>,
}

#[derive(Serialize)]
struct HeaderInfo {
    schema: Schema,
    version: u32,
    gametype: String,
    recorded_at: String,
    file_size: u64,
    mod_name: String,
    map_file: String,
    map_name: String,
    map_description: String,
    map_width: u32,
    map_height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    season: Option<String>,
    win_condition: String,
    player_count: usize,
    game_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ticks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game_ticks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
}

#[derive(Serialize)]
struct ChatInfo {
    tick: u32,
    time: String,
    sender: String,
    text: String,
}

#[derive(Serialize)]
struct BatchSummary {
    total_files: usize,
    successful: usize,
    failed: usize,
    total_players: usize,
    schema_distribution: BTreeMap<String, usize>,
    map_distribution: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_duration_seconds: Option<u32>,
}

// ============================================================================
// Validation Result Structure
// ============================================================================

struct ValidationResult {
    read_valid: bool,
    decode_valid: bool,
    report: Option<DecodeReport>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn is_valid(&self) -> bool {
        self.read_valid && self.decode_valid
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let table = match &cli.id_table {
        Some(path) => match IdentityTable::from_file(path) {
            Ok(t) => Some(t),
            Err(e) => {
                eprintln!("Error loading id table {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let settings = Settings {
        options: DecodeOptions {
            schema: cli.schema.map(Schema::from),
            max_depth: cli.max_depth,
            collect_chat: true,
        },
        table,
    };

    match cli.command {
        Commands::Info { file } => cmd_info(&settings, &file),
        Commands::Parse {
            file,
            output,
            players,
            chat,
        } => cmd_parse(&settings, &file, &output, players, chat),
        Commands::Validate { file, detailed } => cmd_validate(&settings, &file, detailed),
        Commands::Batch {
            directory,
            output,
            summary,
            continue_on_error,
        } => cmd_batch(&settings, &directory, output.as_deref(), summary, continue_on_error),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

// ============================================================================
// Info Command Implementation
// ============================================================================

fn cmd_info(settings: &Settings, file: &Path) -> ExitCode {
    let (replay, report) = match settings.decode(file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error decoding replay: {}", e);
            return ExitCode::FAILURE;
        }
    };

    print_info(&replay, &report, file_size(file));

    ExitCode::SUCCESS
}

#[allow(clippy::cast_precision_loss)]
fn print_info(replay: &Replay, report: &DecodeReport, file_size: u64) {
    println!("=== Replay Information ===\n");

    println!("File:");
    println!(
        "  Size: {} bytes ({:.2} KB)",
        file_size,
        file_size as f64 / 1024.0
    );
    println!("  Schema: {}", replay.schema());
    println!("  Version: {}", replay.version());
    println!("  Game Type: {}", replay.gametype());
    println!("  Recorded: {}", replay.recorded_at());
    if let Some(duration) = replay.duration_string() {
        println!("  Duration: {}", duration);
    }

    println!();

    println!("Match:");
    println!("  Map: {} ({})", replay.map_name(), replay.map_file());
    println!("  Size: {}x{}", replay.map_width(), replay.map_height());
    if let Some(season) = replay.season() {
        println!("  Season: {}", season);
    }
    println!("  Mod: {}", replay.mod_name());
    println!("  Win Condition: {}", replay.win_condition());

    println!();

    println!("Players:");
    for player in replay.players() {
        println!(
            "  - {} (team {}, {})",
            player.name(),
            player.team(),
            player.faction()
        );
    }

    println!();

    println!("Technical:");
    for summary in &report.containers {
        println!(
            "  Container @ 0x{:X}: {} chunks ({} decoded, {} skipped)",
            summary.offset, summary.chunk_count, summary.decoded, summary.skipped
        );
    }
    if let Some(offset) = report.tick_offset {
        println!("  Tick Stream: 0x{:X}", offset);
    }
}

fn file_size(file: &Path) -> u64 {
    std::fs::metadata(file).map(|m| m.len()).unwrap_or(0)
}

// ============================================================================
// Parse Command Implementation
// ============================================================================

fn cmd_parse(
    settings: &Settings,
    file: &Path,
    output: &OutputFormat,
    include_players: bool,
    include_chat: bool,
) -> ExitCode {
    let (replay, _) = match settings.decode(file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let output_data = build_output(&replay, file_size(file), include_players, include_chat);

    match output {
        OutputFormat::Json => print_json(&output_data),
        OutputFormat::Pretty => print_pretty(&output_data),
    }

    ExitCode::SUCCESS
}

fn build_output(
    replay: &Replay,
    file_size: u64,
    include_players: bool,
    include_chat: bool,
) -> ParseOutput {
    let players = if include_players {
        Some(replay.players().to_vec())
    } else {
        None
    };

    let chat = if include_chat {
        Some(
            replay
                .chat()
                .iter()
                .map(|m| ChatInfo {
                    tick: m.tick,
                    time: m.timestamp(),
                    sender: m.sender.clone(),
                    text: m.text.clone(),
                })
                .collect(),
        )
    } else {
        None
    };

    ParseOutput {
        header: build_header_info(replay, file_size),
        players,
        chat,
    }
}

fn build_header_info(replay: &Replay, file_size: u64) -> HeaderInfo {
    HeaderInfo {
        schema: replay.schema(),
        version: replay.version(),
        gametype: replay.gametype().to_string(),
        recorded_at: replay.recorded_at().to_string(),
        file_size,
        mod_name: replay.mod_name().to_string(),
        map_file: replay.map_file().to_string(),
        map_name: replay.map_name().to_string(),
        map_description: replay.map_description().to_string(),
        map_width: replay.map_width(),
        map_height: replay.map_height(),
        season: replay.season().map(str::to_string),
        win_condition: replay.win_condition().to_string(),
        player_count: replay.players().len(),
        game_mode: infer_game_mode(replay.players().len()),
        duration_ticks: replay.duration_ticks(),
        game_ticks: replay.game_ticks(),
        duration_seconds: replay.duration_seconds(),
        duration: replay.duration_string(),
    }
}

/// Infers game mode from player count.
fn infer_game_mode(player_count: usize) -> String {
    match player_count {
        0 | 1 => "Solo".to_string(),
        2 => "1v1".to_string(),
        4 => "2v2".to_string(),
        6 => "3v3".to_string(),
        8 => "4v4".to_string(),
        n => format!("{}p", n),
    }
}

fn print_json(output: &ParseOutput) {
    match serde_json::to_string_pretty(output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing to JSON: {}", e),
    }
}

fn print_pretty(output: &ParseOutput) {
    let header = &output.header;
    println!("=== Header ===");
    println!("Schema: {}", header.schema);
    println!("Version: {}", header.version);
    println!("Game Type: {}", header.gametype);
    println!("Recorded: {}", header.recorded_at);
    println!("Map: {} ({}x{})", header.map_name, header.map_width, header.map_height);
    println!("Mod: {}", header.mod_name);
    println!("Win Condition: {}", header.win_condition);
    println!("Mode: {}", header.game_mode);
    if let Some(duration) = &header.duration {
        println!("Duration: {}", duration);
    }
    println!();

    if let Some(players) = &output.players {
        println!("=== Players ({}) ===", players.len());
        for player in players {
            println!(
                "  Team {}: {} ({})",
                player.team(),
                player.name(),
                player.faction()
            );
            if let Some(id) = player.identity().steam_id() {
                println!("    Steam ID: {}", id);
            }
            if let Some(position) = player.identity().start_position() {
                match player.identity().resolved_id() {
                    Some(id) => println!("    Start position: {} (id {})", position, id),
                    None => println!("    Start position: {}", position),
                }
            }
            let [c1, c2, c3] = player.commander_ids();
            println!("    Commanders: {} {} {}", c1, c2, c3);
            for (id, name) in player.bulletin_pairs() {
                println!("    Bulletin {}: {}", id, name);
            }
        }
        println!();
    }

    if let Some(chat) = &output.chat {
        println!("=== Chat Messages ({}) ===", chat.len());
        for msg in chat {
            println!("  [{}] {}: {}", msg.time, msg.sender, msg.text);
        }
        println!();
    }
}

// ============================================================================
// Validate Command Implementation
// ============================================================================

fn cmd_validate(settings: &Settings, file: &Path, detailed: bool) -> ExitCode {
    let result = validate_replay(settings, file);

    if detailed {
        print_validation_details(&result, file);
    } else {
        print_validation_summary(&result, file);
    }

    if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn validate_replay(settings: &Settings, file: &Path) -> ValidationResult {
    let mut result = ValidationResult {
        read_valid: false,
        decode_valid: false,
        report: None,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    // Step 1: Read file
    let decoder = match settings.decoder(file) {
        Ok(d) => {
            result.read_valid = true;
            d
        }
        Err(e) => {
            result.errors.push(format!("Failed to read file: {}", e));
            return result;
        }
    };

    // Step 2: Decode
    match decoder.decode_with_report() {
        Ok((replay, report)) => {
            result.decode_valid = true;

            if report.containers.len() < coh2_replay::decoder::CONTAINER_COUNT {
                result.warnings.push(format!(
                    "Only {} of {} containers present",
                    report.containers.len(),
                    coh2_replay::decoder::CONTAINER_COUNT
                ));
            }
            if replay.players().is_empty() {
                result
                    .warnings
                    .push("No players found in replay".to_string());
            }
            if replay.duration_ticks() == Some(0) {
                result.warnings.push("Tick stream is empty".to_string());
            }
            result.report = Some(report);
        }
        Err(e) => {
            result.errors.push(format!("Decoding failed: {}", e));
        }
    }

    result
}

fn print_validation_summary(result: &ValidationResult, file: &Path) {
    let status = if result.is_valid() { "VALID" } else { "INVALID" };
    println!("{}: {}", file.display(), status);
}

fn print_validation_details(result: &ValidationResult, file: &Path) {
    println!("Validating: {}\n", file.display());

    println!("Checks:");
    println!("  File read:         {}", status_icon(result.read_valid));
    println!("  Decoding:          {}", status_icon(result.decode_valid));

    if let Some(report) = &result.report {
        println!("\nStructure:");
        for summary in &report.containers {
            println!(
                "  Container @ 0x{:X}: {} chunks, depth {}, {} decoded, {} skipped",
                summary.offset,
                summary.chunk_count,
                summary.max_depth_seen,
                summary.decoded,
                summary.skipped
            );
        }
        if let Some(end) = report.tick_end {
            println!("  Tick scan ended: {:?} ({} chat ticks)", end, report.chat_ticks);
        }
    }

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in &result.errors {
            println!("  - {}", error);
        }
    }

    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }

    println!(
        "\nResult: {}",
        if result.is_valid() { "VALID" } else { "INVALID" }
    );
}

fn status_icon(valid: bool) -> &'static str {
    if valid {
        "[OK]"
    } else {
        "[FAIL]"
    }
}

// ============================================================================
// Batch Command Implementation
// ============================================================================

fn cmd_batch(
    settings: &Settings,
    directory: &Path,
    output_dir: Option<&Path>,
    summary: bool,
    continue_on_error: bool,
) -> ExitCode {
    let replays = find_replays(directory);

    if replays.is_empty() {
        eprintln!("No .rec files found in {}", directory.display());
        return ExitCode::FAILURE;
    }

    eprintln!("Found {} replay files", replays.len());

    if let Some(dir) = output_dir {
        if !dir.exists() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Failed to create output directory: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let mut error_count = 0;
    let mut results: Vec<ParseOutput> = Vec::new();

    for replay in &replays {
        eprint!(
            "Processing {}... ",
            replay.file_name().unwrap_or_default().to_string_lossy()
        );

        match process_replay(settings, replay, output_dir) {
            Ok(output) => {
                eprintln!("OK");
                results.push(output);
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                error_count += 1;
                if !continue_on_error {
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    eprintln!(
        "\nProcessed: {} success, {} errors",
        results.len(),
        error_count
    );

    if summary {
        generate_summary(&results, error_count, output_dir);
    }

    ExitCode::SUCCESS
}

fn find_replays(directory: &Path) -> Vec<PathBuf> {
    let mut replays = Vec::new();

    if let Ok(entries) = std::fs::read_dir(directory) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "rec") {
                replays.push(path);
            }
        }
    }

    replays.sort();
    replays
}

fn process_replay(
    settings: &Settings,
    replay: &Path,
    output_dir: Option<&Path>,
) -> Result<ParseOutput, String> {
    let (decoded, _) = settings.decode(replay).map_err(|e| e.to_string())?;

    let output = build_output(&decoded, file_size(replay), true, true);

    if let Some(dir) = output_dir {
        let output_file = dir
            .join(replay.file_stem().unwrap_or_default())
            .with_extension("json");

        let content = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
        std::fs::write(&output_file, content).map_err(|e| e.to_string())?;
    }

    Ok(output)
}

fn generate_summary(results: &[ParseOutput], failed: usize, output_dir: Option<&Path>) {
    let mut schema_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut map_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut durations: Vec<u32> = Vec::new();

    for output in results {
        *schema_distribution
            .entry(output.header.schema.to_string())
            .or_insert(0) += 1;
        *map_distribution
            .entry(output.header.map_name.clone())
            .or_insert(0) += 1;
        if let Some(seconds) = output.header.duration_seconds {
            durations.push(seconds);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let average_duration_seconds = if durations.is_empty() {
        None
    } else {
        Some((durations.iter().map(|&d| u64::from(d)).sum::<u64>() / durations.len() as u64) as u32)
    };

    let summary = BatchSummary {
        total_files: results.len() + failed,
        successful: results.len(),
        failed,
        total_players: results.iter().map(|o| o.header.player_count).sum(),
        schema_distribution,
        map_distribution,
        average_duration_seconds,
    };

    println!("\n=== Batch Summary ===");
    println!("Files processed: {}", summary.total_files);
    println!("Successful: {}", summary.successful);
    println!("Failed: {}", summary.failed);
    println!("Total players: {}", summary.total_players);

    println!("\nSchema distribution:");
    for (schema, count) in &summary.schema_distribution {
        println!("  {}: {}", schema, count);
    }

    println!("\nMaps:");
    for (map, count) in &summary.map_distribution {
        println!("  {}: {}", map, count);
    }

    if let Some(avg) = summary.average_duration_seconds {
        println!("\nAverage duration: {}:{:02}", avg / 60, avg % 60);
    }

    if let Some(dir) = output_dir {
        let summary_file = dir.join("summary.json");
        if let Ok(json) = serde_json::to_string_pretty(&summary) {
            if std::fs::write(&summary_file, json).is_ok() {
                println!("\nSummary written to: {}", summary_file.display());
            }
        }
    }
}
